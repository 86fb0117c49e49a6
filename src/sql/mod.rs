//! SQL generation module.
//!
//! A small type-safe builder for the statements the engine executes:
//!
//! - [`query`] - SELECT query builder
//! - [`expr`] - Expression AST and builder DSL
//! - [`dml`] - UPDATE and INSERT statements
//! - [`token`] - Token types for SQL generation
//! - [`dialect`] - SQLite dialect rules

pub mod dialect;
pub mod dml;
pub mod expr;
pub mod query;
pub mod token;

// Re-export commonly used types at the sql module level
pub use dialect::{Sqlite, SqlDialect};
pub use dml::{Insert, Update};
pub use expr::{
    col, conjunction, count_star, placeholder, table_col, BinaryOperator, Expr, ExprExt,
};
pub use query::{Join, JoinType, LimitOffset, OrderByExpr, Query, SelectExpr, SortDir, TableRef};
pub use token::{Token, TokenStream};
