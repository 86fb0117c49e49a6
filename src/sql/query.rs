//! Query builder - construct SELECT statements with a fluent API.

use super::dialect::SqlDialect;
use super::expr::Expr;
use super::token::{Token, TokenStream};

// =============================================================================
// Select Expression (column with optional alias)
// =============================================================================

/// A SELECT list item: expression with optional alias.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "builders have no effect until used"]
pub struct SelectExpr {
    pub expr: Expr,
    pub alias: Option<String>,
}

impl SelectExpr {
    pub fn new(expr: Expr) -> Self {
        Self { expr, alias: None }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn to_tokens(&self) -> TokenStream {
        let mut ts = self.expr.to_tokens();
        if let Some(alias) = &self.alias {
            ts.space()
                .push(Token::As)
                .space()
                .push(Token::Ident(alias.clone()));
        }
        ts
    }
}

impl From<Expr> for SelectExpr {
    fn from(expr: Expr) -> Self {
        SelectExpr::new(expr)
    }
}

// =============================================================================
// Table Reference
// =============================================================================

/// A table reference with optional schema and alias.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "builders have no effect until used"]
pub struct TableRef {
    pub schema: Option<String>,
    pub table: String,
    pub alias: Option<String>,
}

impl TableRef {
    pub fn new(table: &str) -> Self {
        Self {
            schema: None,
            table: table.into(),
            alias: None,
        }
    }

    pub fn with_schema(mut self, schema: &str) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn to_tokens(&self) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.push(Token::QualifiedIdent {
            schema: self.schema.clone(),
            name: self.table.clone(),
        });
        if let Some(alias) = &self.alias {
            ts.space()
                .push(Token::As)
                .space()
                .push(Token::Ident(alias.clone()));
        }
        ts
    }
}

// =============================================================================
// Joins
// =============================================================================

/// Type of join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
}

/// A JOIN clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub join_type: JoinType,
    pub table: TableRef,
    pub on: Expr,
}

impl Join {
    pub fn to_tokens(&self) -> TokenStream {
        let mut ts = TokenStream::new();

        match self.join_type {
            JoinType::Inner => ts.push(Token::Inner),
            JoinType::Left => ts.push(Token::Left),
        };

        ts.space().push(Token::Join).space();
        ts.append(&self.table.to_tokens());
        ts.space().push(Token::On).space();
        ts.append(&self.on.to_tokens());

        ts
    }
}

// =============================================================================
// ORDER BY
// =============================================================================

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

/// An ORDER BY expression.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "builders have no effect until used"]
pub struct OrderByExpr {
    pub expr: Expr,
    pub dir: Option<SortDir>,
}

impl OrderByExpr {
    pub fn new(expr: Expr) -> Self {
        Self { expr, dir: None }
    }

    pub fn asc(expr: Expr) -> Self {
        Self {
            expr,
            dir: Some(SortDir::Asc),
        }
    }

    pub fn desc(expr: Expr) -> Self {
        Self {
            expr,
            dir: Some(SortDir::Desc),
        }
    }

    pub fn to_tokens(&self) -> TokenStream {
        let mut ts = self.expr.to_tokens();

        if let Some(dir) = &self.dir {
            ts.space().push(match dir {
                SortDir::Asc => Token::Asc,
                SortDir::Desc => Token::Desc,
            });
        }

        ts
    }
}

/// Render a comma separated ORDER BY list (without the keyword).
pub fn order_list_tokens(items: &[OrderByExpr]) -> TokenStream {
    let mut ts = TokenStream::new();
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            ts.comma().space();
        }
        ts.append(&item.to_tokens());
    }
    ts
}

// =============================================================================
// LIMIT / OFFSET
// =============================================================================

/// LIMIT and OFFSET clause.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LimitOffset {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl LimitOffset {
    pub fn is_empty(&self) -> bool {
        self.limit.is_none() && self.offset.is_none()
    }

    /// Convert to token stream using dialect-specific pagination.
    pub fn to_tokens(&self, dialect: &dyn SqlDialect) -> TokenStream {
        dialect.emit_limit_offset(self.limit, self.offset)
    }
}

// =============================================================================
// Query
// =============================================================================

/// A SELECT query.
///
/// Conditions added through [`Query::filter`] are ANDed; compound
/// conditions are parenthesized so that an embedded `OR` keeps its scope.
#[derive(Debug, Clone, Default, PartialEq)]
#[must_use = "Query has no effect until converted to SQL with to_sql()"]
pub struct Query {
    pub select: Vec<SelectExpr>,
    pub from: Option<TableRef>,
    pub joins: Vec<Join>,
    pub filters: Vec<Expr>,
    pub order_by: Vec<OrderByExpr>,
    pub limit_offset: LimitOffset,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, exprs: impl IntoIterator<Item = impl Into<SelectExpr>>) -> Self {
        self.select.extend(exprs.into_iter().map(Into::into));
        self
    }

    pub fn from(mut self, table: TableRef) -> Self {
        self.from = Some(table);
        self
    }

    pub fn inner_join(mut self, table: TableRef, on: Expr) -> Self {
        self.joins.push(Join {
            join_type: JoinType::Inner,
            table,
            on,
        });
        self
    }

    pub fn left_join(mut self, table: TableRef, on: Expr) -> Self {
        self.joins.push(Join {
            join_type: JoinType::Left,
            table,
            on,
        });
        self
    }

    pub fn filter(mut self, expr: Expr) -> Self {
        self.filters.push(expr);
        self
    }

    pub fn order_by(mut self, items: impl IntoIterator<Item = OrderByExpr>) -> Self {
        self.order_by.extend(items);
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.limit_offset.limit = Some(n);
        self
    }

    pub fn offset(mut self, n: u64) -> Self {
        self.limit_offset.offset = Some(n);
        self
    }

    /// Build the token stream for a specific dialect.
    pub fn to_tokens(&self, dialect: &dyn SqlDialect) -> TokenStream {
        let mut ts = TokenStream::new();

        // SELECT
        ts.push(Token::Select).space();
        if self.select.is_empty() {
            ts.push(Token::Star);
        }
        for (i, select_expr) in self.select.iter().enumerate() {
            if i > 0 {
                ts.comma().space();
            }
            ts.append(&select_expr.to_tokens());
        }

        // FROM
        if let Some(from) = &self.from {
            ts.space().push(Token::From).space();
            ts.append(&from.to_tokens());
        }

        // JOINs
        for join in &self.joins {
            ts.space();
            ts.append(&join.to_tokens());
        }

        // WHERE
        if !self.filters.is_empty() {
            ts.space().push(Token::Where).space();
            let wrap = self.filters.len() > 1;
            for (i, cond) in self.filters.iter().enumerate() {
                if i > 0 {
                    ts.space().push(Token::And).space();
                }
                if wrap {
                    ts.append(&cond.clone().parenthesized().to_tokens());
                } else {
                    ts.append(&cond.to_tokens());
                }
            }
        }

        // ORDER BY
        if !self.order_by.is_empty() {
            ts.space().push(Token::OrderBy).space();
            ts.append(&order_list_tokens(&self.order_by));
        }

        // LIMIT / OFFSET
        if !self.limit_offset.is_empty() {
            ts.space();
            ts.append(&self.limit_offset.to_tokens(dialect));
        }

        ts
    }

    /// Generate SQL string for a specific dialect.
    pub fn to_sql(&self, dialect: &dyn SqlDialect) -> String {
        self.to_tokens(dialect).serialize(dialect)
    }
}
