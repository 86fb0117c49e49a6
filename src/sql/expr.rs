//! Expression AST for the SQL the engine emits.
//!
//! Comparison values are never inlined: every value position holds an
//! [`Expr::Placeholder`] and the caller binds parameters positionally.

use super::token::{Token, TokenStream};

// =============================================================================
// Expression AST
// =============================================================================

/// A SQL expression.
///
/// Rendered by `to_tokens()`.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column reference: optional_table.column
    Column {
        table: Option<String>,
        column: String,
    },

    /// Positional parameter marker.
    Placeholder,

    /// Binary operation: left op right
    BinaryOp {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },

    /// Function call: name(args...)
    Function { name: String, args: Vec<Expr> },

    /// IN: expr IN (values...)
    In {
        expr: Box<Expr>,
        values: Vec<Expr>,
        negated: bool,
    },

    /// IS NULL / IS NOT NULL
    IsNull { expr: Box<Expr>, negated: bool },

    /// LIKE / NOT LIKE
    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        negated: bool,
    },

    /// Wildcard `*`
    Star,

    /// Parenthesized expression
    Paren(Box<Expr>),
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Comparison
    Eq,
    Ne,
    Lt,
    Gt,
    Lte,
    Gte,
    // Logical
    And,
    Or,
}

// =============================================================================
// Expression to Tokens
// =============================================================================

impl Expr {
    /// Convert this expression to a token stream.
    pub fn to_tokens(&self) -> TokenStream {
        let mut ts = TokenStream::new();

        match self {
            Expr::Column { table, column } => {
                if let Some(t) = table {
                    ts.push(Token::Ident(t.clone()));
                    ts.push(Token::Dot);
                }
                ts.push(Token::Ident(column.clone()));
            }

            Expr::Placeholder => {
                ts.push(Token::Placeholder);
            }

            Expr::BinaryOp { left, op, right } => {
                ts.append(&left.to_tokens());
                ts.space();
                ts.push(binary_op_to_token(*op));
                ts.space();
                ts.append(&right.to_tokens());
            }

            Expr::Function { name, args } => {
                ts.push(Token::FunctionName(name.clone()));
                ts.lparen();
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        ts.comma().space();
                    }
                    ts.append(&arg.to_tokens());
                }
                ts.rparen();
            }

            Expr::In {
                expr,
                values,
                negated,
            } => {
                ts.append(&expr.to_tokens());
                if *negated {
                    ts.space().push(Token::Not);
                }
                ts.space().push(Token::In).space().lparen();
                for (i, val) in values.iter().enumerate() {
                    if i > 0 {
                        ts.comma().space();
                    }
                    ts.append(&val.to_tokens());
                }
                ts.rparen();
            }

            Expr::IsNull { expr, negated } => {
                ts.append(&expr.to_tokens());
                ts.space();
                ts.push(if *negated {
                    Token::IsNotNull
                } else {
                    Token::IsNull
                });
            }

            Expr::Like {
                expr,
                pattern,
                negated,
            } => {
                ts.append(&expr.to_tokens());
                if *negated {
                    ts.space().push(Token::Not);
                }
                ts.space()
                    .push(Token::Like)
                    .space()
                    .append(&pattern.to_tokens());
            }

            Expr::Star => {
                ts.push(Token::Star);
            }

            Expr::Paren(inner) => {
                ts.lparen();
                ts.append(&inner.to_tokens());
                ts.rparen();
            }
        }

        ts
    }

    /// Wrap in parentheses unless this is already a leaf or a group.
    pub fn parenthesized(self) -> Expr {
        match self {
            Expr::BinaryOp {
                op: BinaryOperator::And | BinaryOperator::Or,
                ..
            } => Expr::Paren(Box::new(self)),
            other => other,
        }
    }
}

fn binary_op_to_token(op: BinaryOperator) -> Token {
    match op {
        BinaryOperator::Eq => Token::Eq,
        BinaryOperator::Ne => Token::Ne,
        BinaryOperator::Lt => Token::Lt,
        BinaryOperator::Gt => Token::Gt,
        BinaryOperator::Lte => Token::Lte,
        BinaryOperator::Gte => Token::Gte,
        BinaryOperator::And => Token::And,
        BinaryOperator::Or => Token::Or,
    }
}

// =============================================================================
// Expression Constructors
// =============================================================================

/// Create a column reference.
pub fn col(name: &str) -> Expr {
    Expr::Column {
        table: None,
        column: name.into(),
    }
}

/// Create a qualified column reference (table.column).
pub fn table_col(table: &str, column: &str) -> Expr {
    Expr::Column {
        table: Some(table.into()),
        column: column.into(),
    }
}

/// Create a `?` parameter marker.
pub fn placeholder() -> Expr {
    Expr::Placeholder
}

/// COUNT(*)
pub fn count_star() -> Expr {
    Expr::Function {
        name: "COUNT".into(),
        args: vec![Expr::Star],
    }
}

/// AND together a list of conditions; `None` for an empty list.
pub fn conjunction(exprs: impl IntoIterator<Item = Expr>) -> Option<Expr> {
    exprs.into_iter().reduce(|acc, e| acc.and(e))
}

// =============================================================================
// Fluent Builder
// =============================================================================

/// Fluent operators on expressions.
pub trait ExprExt: Sized {
    fn into_expr(self) -> Expr;

    fn eq(self, other: impl Into<Expr>) -> Expr {
        binary(self.into_expr(), BinaryOperator::Eq, other.into())
    }

    fn ne(self, other: impl Into<Expr>) -> Expr {
        binary(self.into_expr(), BinaryOperator::Ne, other.into())
    }

    fn gt(self, other: impl Into<Expr>) -> Expr {
        binary(self.into_expr(), BinaryOperator::Gt, other.into())
    }

    fn gte(self, other: impl Into<Expr>) -> Expr {
        binary(self.into_expr(), BinaryOperator::Gte, other.into())
    }

    fn lt(self, other: impl Into<Expr>) -> Expr {
        binary(self.into_expr(), BinaryOperator::Lt, other.into())
    }

    fn lte(self, other: impl Into<Expr>) -> Expr {
        binary(self.into_expr(), BinaryOperator::Lte, other.into())
    }

    fn and(self, other: impl Into<Expr>) -> Expr {
        binary(self.into_expr(), BinaryOperator::And, other.into())
    }

    fn or(self, other: impl Into<Expr>) -> Expr {
        binary(self.into_expr(), BinaryOperator::Or, other.into())
    }

    fn like(self, pattern: impl Into<Expr>, negated: bool) -> Expr {
        Expr::Like {
            expr: Box::new(self.into_expr()),
            pattern: Box::new(pattern.into()),
            negated,
        }
    }

    fn is_null(self, negated: bool) -> Expr {
        Expr::IsNull {
            expr: Box::new(self.into_expr()),
            negated,
        }
    }

    fn in_list(self, values: Vec<Expr>, negated: bool) -> Expr {
        Expr::In {
            expr: Box::new(self.into_expr()),
            values,
            negated,
        }
    }
}

impl ExprExt for Expr {
    fn into_expr(self) -> Expr {
        self
    }
}

fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Expr {
    Expr::BinaryOp {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}
