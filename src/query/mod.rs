//! Filter query language.
//!
//! The language covers what callers need to select entities without writing
//! SQL:
//!
//! ```text
//! Mass > 300.1 AND (Name LIKE 'Caff%' OR "Formula" IN ('C8 H10 N4 O2',))
//!     ORDER BY Area DESC, Name LIMIT 10 OFFSET 20
//! ```
//!
//! Text is parsed with a [`Grammar`] and compiled to a SQL condition with
//! `?` markers, the literal values in marker order, an ORDER BY list and
//! LIMIT/OFFSET. Column names are resolved through a [`NameMap`]; compiling
//! never touches storage.

mod names;

pub use names::{ColumnRef, NameMap, QueryParam, ValueKind};

use tracing::debug;

use crate::error::{EdsError, EdsResult};
use crate::grammar::{Grammar, GrammarResult, ParseNode};
use crate::sql::{
    placeholder, BinaryOperator, Expr, ExprExt, LimitOffset, OrderByExpr, Sqlite,
};

// =============================================================================
// Grammar
// =============================================================================

const RULES: &[(&str, &str)] = &[
    // keywords
    ("log", r"AND\b | OR\b"),
    ("op", r"<= | >= | != | = | < | > | LIKE\b | NOT\b LIKE\b"),
    ("null", r"IS\b NULL\b | IS\b NOT\b NULL\b"),
    ("desc", r"DESC\b | ASC\b"),
    // columns and values
    ("column", r#"[A-Za-z0-9_]+ | '[^']+' | "[^"]+""#),
    ("value", r#"[A-Za-z0-9_%.+\-]+ | '[^']*' | "[^"]*""#),
    ("sequence", "value , sequence | value , | value"),
    // IN
    ("inside", r"IN\b \( sequence \) | NOT\b IN\b \( sequence \)"),
    // constraints
    ("statement", "column op value | column inside | column null"),
    ("group", r"\( constraint \)"),
    (
        "constraint",
        "group log constraint | statement log constraint | group | statement",
    ),
    // ORDER BY
    ("order", "column desc | column"),
    ("orders", "order , orders | order , | order"),
    ("orderby", r"ORDER\b BY\b orders"),
    // LIMIT / OFFSET
    (
        "limit",
        r"LIMIT\b [0-9]+ OFFSET\b [0-9]+ | OFFSET\b [0-9]+ LIMIT\b [0-9]+ | LIMIT\b [0-9]+ | OFFSET\b [0-9]+",
    ),
    // full expression
    (
        "expression",
        "constraint orderby limit | constraint orderby | constraint limit | orderby limit | orderby | limit | constraint",
    ),
];

const START: &str = "expression";

// =============================================================================
// Compiled Query
// =============================================================================

/// Result of compiling filter text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledQuery {
    /// Boolean condition with `?` markers.
    pub condition: Option<Expr>,
    /// Literal values in marker order.
    pub params: Vec<QueryParam>,
    pub order_by: Vec<OrderByExpr>,
    /// LIMIT/OFFSET given in the text.
    pub limit_offset: LimitOffset,
}

impl CompiledQuery {
    pub fn is_empty(&self) -> bool {
        self.condition.is_none() && self.order_by.is_empty() && self.limit_offset.is_empty()
    }

    pub fn has_order(&self) -> bool {
        !self.order_by.is_empty()
    }

    /// SQL of the condition, e.g. `"Mass" > ? AND "Mass" < ?`.
    pub fn condition_sql(&self) -> Option<String> {
        self.condition
            .as_ref()
            .map(|c| c.to_tokens().serialize(&Sqlite))
    }

    /// SQL of the ordering, e.g. `ORDER BY "Area" DESC`.
    pub fn order_sql(&self) -> Option<String> {
        if self.order_by.is_empty() {
            return None;
        }
        let list = crate::sql::query::order_list_tokens(&self.order_by).serialize(&Sqlite);
        Some(format!("ORDER BY {list}"))
    }

    /// SQL of the paging clause, e.g. `LIMIT 2 OFFSET 3`.
    pub fn limit_sql(&self) -> Option<String> {
        if self.limit_offset.is_empty() {
            return None;
        }
        Some(self.limit_offset.to_tokens(&Sqlite).serialize(&Sqlite))
    }

    /// Raw literal texts in marker order.
    pub fn param_texts(&self) -> Vec<&str> {
        self.params.iter().map(|p| p.text.as_str()).collect()
    }
}

// =============================================================================
// Compiler
// =============================================================================

/// Compiles filter text against a [`NameMap`].
#[derive(Debug)]
pub struct FilterCompiler {
    grammar: Grammar,
}

impl FilterCompiler {
    pub fn new(memoize: bool) -> GrammarResult<Self> {
        let grammar = RULES
            .iter()
            .fold(Grammar::builder(), |b, (name, def)| b.rule(name, def))
            .memoize(memoize)
            .build()?;
        Ok(Self { grammar })
    }

    /// Parse `text` without compiling it.
    pub fn parse(&self, text: &str) -> EdsResult<Option<ParseNode>> {
        Ok(self.grammar.parse(text.trim(), START)?)
    }

    /// Compile `text`. Blank text compiles to an empty query.
    pub fn compile(&self, text: &str, names: &NameMap) -> EdsResult<CompiledQuery> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(CompiledQuery::default());
        }

        let tree = self
            .grammar
            .parse(text, START)?
            .ok_or_else(|| syntax_error(text))?;

        let mut compiled = CompiledQuery::default();
        for part in tree.children() {
            match part.name() {
                Some("constraint") => {
                    compiled.condition =
                        Some(compile_constraint(part, names, &mut compiled.params, text)?);
                }
                Some("orderby") => compiled.order_by = compile_orderby(part, names, text)?,
                Some("limit") => compiled.limit_offset = compile_limit(part, text)?,
                _ => return Err(syntax_error(text)),
            }
        }

        let condition = compiled.condition_sql().unwrap_or_default();
        debug!(
            query = text,
            condition = %condition,
            params = compiled.params.len(),
            "compiled filter"
        );

        Ok(compiled)
    }
}

fn syntax_error(text: &str) -> EdsError {
    EdsError::QuerySyntax {
        query: text.to_string(),
    }
}

/// Strip surrounding quotes from a quoted token.
fn unquote(token: &str) -> &str {
    let quoted = token.len() >= 2
        && ((token.starts_with('\'') && token.ends_with('\''))
            || (token.starts_with('"') && token.ends_with('"')));
    if quoted {
        &token[1..token.len() - 1]
    } else {
        token
    }
}

fn leaf_text(node: &ParseNode) -> &str {
    node.children()
        .first()
        .and_then(ParseNode::text)
        .map(unquote)
        .unwrap_or_default()
}

fn compile_constraint(
    node: &ParseNode,
    names: &NameMap,
    params: &mut Vec<QueryParam>,
    text: &str,
) -> EdsResult<Expr> {
    // constraints are right-recursive; flatten into terms and connectives
    let mut terms = Vec::new();
    let mut connectives = Vec::new();
    let mut current = Some(node);

    while let Some(constraint) = current.take() {
        for child in constraint.children() {
            match child.name() {
                Some("statement") => terms.push(compile_statement(child, names, params, text)?),
                Some("group") => {
                    let inner = child.child("constraint").ok_or_else(|| syntax_error(text))?;
                    let expr = compile_constraint(inner, names, params, text)?;
                    terms.push(Expr::Paren(Box::new(expr)));
                }
                Some("log") => connectives.push(match leaf_text(child) {
                    "AND" => BinaryOperator::And,
                    _ => BinaryOperator::Or,
                }),
                Some("constraint") => current = Some(child),
                _ => {}
            }
        }
    }

    // AND binds tighter than OR, as in SQL
    let mut terms = terms.into_iter();
    let Some(first) = terms.next() else {
        return Err(syntax_error(text));
    };
    let mut disjuncts = Vec::new();
    let mut conjunction = first;
    for (op, term) in connectives.into_iter().zip(terms) {
        match op {
            BinaryOperator::And => conjunction = conjunction.and(term),
            _ => {
                disjuncts.push(conjunction);
                conjunction = term;
            }
        }
    }
    disjuncts.push(conjunction);

    disjuncts
        .into_iter()
        .reduce(|acc, e| acc.or(e))
        .ok_or_else(|| syntax_error(text))
}

fn compile_statement(
    node: &ParseNode,
    names: &NameMap,
    params: &mut Vec<QueryParam>,
    text: &str,
) -> EdsResult<Expr> {
    let column_node = node.child("column").ok_or_else(|| syntax_error(text))?;
    let column = names.resolve(leaf_text(column_node))?;
    let target = column.to_expr();

    if let Some(op) = node.child("op") {
        let value = node.child("value").map(leaf_text).unwrap_or_default();
        let ops = op.leaf_texts();
        let expr = match ops.as_slice() {
            ["LIKE"] | ["NOT", "LIKE"] => {
                params.push(QueryParam {
                    text: value.to_string(),
                    kind: ValueKind::Text,
                });
                return Ok(target.like(placeholder(), ops.len() == 2));
            }
            ["<="] => target.lte(placeholder()),
            [">="] => target.gte(placeholder()),
            ["!="] => target.ne(placeholder()),
            ["<"] => target.lt(placeholder()),
            [">"] => target.gt(placeholder()),
            _ => target.eq(placeholder()),
        };
        params.push(QueryParam {
            text: value.to_string(),
            kind: column.kind,
        });
        return Ok(expr);
    }

    if let Some(inside) = node.child("inside") {
        let negated = inside.leaf_texts().first() == Some(&"NOT");
        let values: Vec<&str> = inside.extract("value").into_iter().map(leaf_text).collect();
        let markers = values.iter().map(|_| placeholder()).collect();
        params.extend(values.into_iter().map(|v| QueryParam {
            text: v.to_string(),
            kind: column.kind,
        }));
        return Ok(target.in_list(markers, negated));
    }

    let negated = node
        .child("null")
        .map(|n| n.leaf_texts().contains(&"NOT"))
        .unwrap_or(false);
    Ok(target.is_null(negated))
}

fn compile_orderby(node: &ParseNode, names: &NameMap, text: &str) -> EdsResult<Vec<OrderByExpr>> {
    node.extract("order")
        .into_iter()
        .map(|order| {
            let column = order.child("column").ok_or_else(|| syntax_error(text))?;
            let target = names.resolve(leaf_text(column))?.to_expr();
            Ok(match order.child("desc").map(leaf_text) {
                Some("DESC") => OrderByExpr::desc(target),
                Some(_) => OrderByExpr::asc(target),
                None => OrderByExpr::new(target),
            })
        })
        .collect()
}

fn compile_limit(node: &ParseNode, text: &str) -> EdsResult<LimitOffset> {
    let leaves = node.leaf_texts();
    let mut result = LimitOffset::default();
    for pair in leaves.chunks(2) {
        let [keyword, number] = pair else {
            return Err(syntax_error(text));
        };
        let n = number.parse::<u64>().map_err(|_| syntax_error(text))?;
        match *keyword {
            "LIMIT" => result.limit = Some(n),
            _ => result.offset = Some(n),
        }
    }
    Ok(result)
}
