//! SQL dialect rules.
//!
//! Result files are SQLite databases, so [`Sqlite`] is the only dialect the
//! engine emits. The trait keeps quoting and pagination rules out of the
//! token and expression code so that both can be tested in isolation.

pub mod helpers;

use super::token::TokenStream;

/// SQL dialect trait - defines how SQL constructs are rendered.
pub trait SqlDialect: std::fmt::Debug {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    // =========================================================================
    // Identifier Quoting
    // =========================================================================

    /// Quote an identifier (table, column, alias, schema).
    fn quote_identifier(&self, ident: &str) -> String;

    // =========================================================================
    // Pagination
    // =========================================================================

    /// Emit LIMIT/OFFSET or equivalent pagination clause.
    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        helpers::emit_limit_offset_standard(limit, offset)
    }
}

/// SQLite dialect.
///
/// - ANSI identifier quoting (`"`)
/// - `OFFSET` is only valid after a `LIMIT`, so a bare offset is emitted as
///   `LIMIT -1 OFFSET n`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sqlite;

impl SqlDialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        helpers::emit_limit_offset_unbounded(limit, offset)
    }
}
