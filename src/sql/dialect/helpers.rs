//! Shared helper functions for SQL dialect implementations.

use super::super::token::{Token, TokenStream};

// =============================================================================
// Quoting
// =============================================================================

/// Quote identifier with double quotes (ANSI style).
pub fn quote_double(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

// =============================================================================
// Pagination
// =============================================================================

/// Emit LIMIT ... OFFSET ... (standard SQL).
pub fn emit_limit_offset_standard(limit: Option<u64>, offset: Option<u64>) -> TokenStream {
    let mut ts = TokenStream::new();

    if let Some(lim) = limit {
        ts.push(Token::Limit)
            .space()
            .push(Token::LitInt(lim as i64));
    }

    if let Some(off) = offset {
        if limit.is_some() {
            ts.space();
        }
        ts.push(Token::Offset)
            .space()
            .push(Token::LitInt(off as i64));
    }

    ts
}

/// Emit LIMIT ... OFFSET ..., using `LIMIT -1` when only an offset is given.
pub fn emit_limit_offset_unbounded(limit: Option<u64>, offset: Option<u64>) -> TokenStream {
    match (limit, offset) {
        (None, Some(_)) => {
            let mut ts = TokenStream::new();
            ts.push(Token::Limit).space().push(Token::LitInt(-1)).space();
            ts.append(&emit_limit_offset_standard(None, offset));
            ts
        }
        _ => emit_limit_offset_standard(limit, offset),
    }
}
