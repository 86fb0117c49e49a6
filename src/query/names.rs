//! Name resolution for filter text.

use std::collections::HashMap;

use rusqlite::types::Value as SqlValue;

use crate::error::{EdsError, EdsResult};
use crate::sql::{table_col, Expr};

/// Storage class a filter literal is bound as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueKind {
    Integer,
    Real,
    Boolean,
    Text,
    #[default]
    Any,
}

/// Physical column a filter name resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    /// Table alias the column is qualified with.
    pub table: Option<String>,
    pub column: String,
    pub kind: ValueKind,
}

impl ColumnRef {
    pub fn new(table: Option<&str>, column: &str, kind: ValueKind) -> Self {
        Self {
            table: table.map(str::to_string),
            column: column.to_string(),
            kind,
        }
    }

    pub fn to_expr(&self) -> Expr {
        match &self.table {
            Some(table) => table_col(table, &self.column),
            None => crate::sql::col(&self.column),
        }
    }

    fn label(&self) -> String {
        match &self.table {
            Some(table) => format!("{}.{}", table, self.column),
            None => self.column.clone(),
        }
    }
}

/// Maps physical and display names to columns.
///
/// A name claimed by two different columns is ambiguous: it is removed
/// from resolution and reported as [`EdsError::AmbiguousName`] instead of
/// picking one of the candidates.
#[derive(Debug, Clone, Default)]
pub struct NameMap {
    entries: HashMap<String, ColumnRef>,
    ambiguous: HashMap<String, Vec<String>>,
    passthrough: bool,
}

impl NameMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// A map that resolves every name to an unqualified column of the
    /// same name.
    pub fn passthrough() -> Self {
        Self {
            passthrough: true,
            ..Self::default()
        }
    }

    /// Register `name` for `target`.
    pub fn insert(&mut self, name: &str, target: ColumnRef) {
        if let Some(candidates) = self.ambiguous.get_mut(name) {
            let label = target.label();
            if !candidates.contains(&label) {
                candidates.push(label);
            }
            return;
        }

        match self.entries.get(name) {
            None => {
                self.entries.insert(name.to_string(), target);
            }
            Some(existing) if *existing == target => {}
            Some(_) => {
                if let Some(existing) = self.entries.remove(name) {
                    self.ambiguous
                        .insert(name.to_string(), vec![existing.label(), target.label()]);
                }
            }
        }
    }

    /// Register a column under its physical name and optional display name.
    pub fn insert_column(&mut self, column_name: &str, display_name: Option<&str>, target: ColumnRef) {
        self.insert(column_name, target.clone());
        if let Some(display) = display_name {
            if !display.is_empty() {
                self.insert(display, target);
            }
        }
    }

    pub fn is_ambiguous(&self, name: &str) -> bool {
        self.ambiguous.contains_key(name)
    }

    pub fn has_ambiguities(&self) -> bool {
        !self.ambiguous.is_empty()
    }

    pub fn resolve(&self, name: &str) -> EdsResult<ColumnRef> {
        if let Some(candidates) = self.ambiguous.get(name) {
            return Err(EdsError::AmbiguousName {
                name: name.to_string(),
                candidates: candidates.clone(),
            });
        }
        match self.entries.get(name) {
            Some(target) => Ok(target.clone()),
            None if self.passthrough => Ok(ColumnRef::new(None, name, ValueKind::Any)),
            None => Err(EdsError::unknown("column", name)),
        }
    }
}

/// A literal from filter text, bound positionally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParam {
    pub text: String,
    pub kind: ValueKind,
}

impl QueryParam {
    /// Coerce the literal to the storage class of its column, keeping the
    /// text when it does not parse.
    pub fn to_sql_value(&self) -> SqlValue {
        let text = self.text.as_str();
        match self.kind {
            ValueKind::Integer => text
                .parse::<i64>()
                .map(SqlValue::Integer)
                .or_else(|_| text.parse::<f64>().map(SqlValue::Real))
                .unwrap_or_else(|_| SqlValue::Text(self.text.clone())),
            ValueKind::Real => text
                .parse::<f64>()
                .map(SqlValue::Real)
                .unwrap_or_else(|_| SqlValue::Text(self.text.clone())),
            ValueKind::Boolean => match text.to_ascii_lowercase().as_str() {
                "1" | "true" => SqlValue::Integer(1),
                "0" | "false" => SqlValue::Integer(0),
                _ => SqlValue::Text(self.text.clone()),
            },
            ValueKind::Text | ValueKind::Any => SqlValue::Text(self.text.clone()),
        }
    }
}
