//! Data Manipulation Language (DML) statements.
//!
//! Entity tables are only ever updated. INSERT is used for view store rows
//! that do not exist yet.

use super::dialect::SqlDialect;
use super::expr::Expr;
use super::token::{Token, TokenStream};

// =============================================================================
// UPDATE Statement
// =============================================================================

/// UPDATE statement builder.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "Update has no effect until converted to SQL with to_sql()"]
pub struct Update {
    pub schema: Option<String>,
    pub table: String,
    pub set: Vec<(String, Expr)>,
    pub filter: Option<Expr>,
}

impl Update {
    /// Create a new UPDATE statement.
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            schema: None,
            table: table.into(),
            set: Vec::new(),
            filter: None,
        }
    }

    /// Set the schema.
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Set a column to a value.
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Expr>) -> Self {
        self.set.push((column.into(), value.into()));
        self
    }

    /// Add WHERE clause.
    pub fn filter(mut self, expr: Expr) -> Self {
        self.filter = Some(match self.filter {
            Some(existing) => Expr::BinaryOp {
                left: Box::new(existing),
                op: crate::sql::expr::BinaryOperator::And,
                right: Box::new(expr),
            },
            None => expr,
        });
        self
    }

    /// Convert to SQL for the given dialect.
    pub fn to_sql(&self, dialect: &dyn SqlDialect) -> String {
        self.to_tokens().serialize(dialect)
    }

    /// Convert to token stream.
    pub fn to_tokens(&self) -> TokenStream {
        let mut ts = TokenStream::new();

        // UPDATE table
        ts.push(Token::Update).space();
        ts.push(Token::QualifiedIdent {
            schema: self.schema.clone(),
            name: self.table.clone(),
        });

        // SET clause
        ts.space().push(Token::Set).space();
        for (i, (col, expr)) in self.set.iter().enumerate() {
            if i > 0 {
                ts.comma().space();
            }
            ts.push(Token::Ident(col.clone()))
                .space()
                .push(Token::Eq)
                .space()
                .append(&expr.to_tokens());
        }

        // WHERE clause
        if let Some(ref filter) = self.filter {
            ts.space().push(Token::Where).space();
            ts.append(&filter.to_tokens());
        }

        ts
    }
}

// =============================================================================
// INSERT Statement
// =============================================================================

/// Single-row INSERT statement builder.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "Insert has no effect until converted to SQL with to_sql()"]
pub struct Insert {
    pub schema: Option<String>,
    pub table: String,
    pub columns: Vec<String>,
    pub values: Vec<Expr>,
}

impl Insert {
    /// Create a new INSERT statement.
    pub fn into(table: impl Into<String>) -> Self {
        Self {
            schema: None,
            table: table.into(),
            columns: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Set the schema.
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Add a column and the value it receives.
    pub fn value(mut self, column: impl Into<String>, value: impl Into<Expr>) -> Self {
        self.columns.push(column.into());
        self.values.push(value.into());
        self
    }

    /// Convert to SQL for the given dialect.
    pub fn to_sql(&self, dialect: &dyn SqlDialect) -> String {
        self.to_tokens().serialize(dialect)
    }

    /// Convert to token stream.
    pub fn to_tokens(&self) -> TokenStream {
        let mut ts = TokenStream::new();

        ts.push(Token::Insert).space().push(Token::Into).space();
        ts.push(Token::QualifiedIdent {
            schema: self.schema.clone(),
            name: self.table.clone(),
        });

        ts.space().lparen();
        for (i, col) in self.columns.iter().enumerate() {
            if i > 0 {
                ts.comma().space();
            }
            ts.push(Token::Ident(col.clone()));
        }
        ts.rparen();

        ts.space().push(Token::Values).space().lparen();
        for (i, val) in self.values.iter().enumerate() {
            if i > 0 {
                ts.comma().space();
            }
            ts.append(&val.to_tokens());
        }
        ts.rparen();

        ts
    }
}
