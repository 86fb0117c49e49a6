//! Entity types and the connections between them.

use std::sync::Arc;

use super::column::{Column, ColumnSet};
use crate::error::{EdsError, EdsResult};

/// A logical row kind backed by one physical table.
#[derive(Debug, Clone)]
pub struct EntityType {
    pub id: i64,
    /// Unique logical name, e.g. `ConsolidatedUnknownCompoundItem`.
    pub name: String,
    pub table_name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub columns: ColumnSet,
}

impl EntityType {
    pub fn new(id: i64, name: &str, table_name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            table_name: table_name.to_string(),
            display_name: None,
            description: None,
            columns: ColumnSet::new(),
        }
    }

    pub fn with_display_name(mut self, display_name: &str) -> Self {
        self.display_name = Some(display_name.to_string());
        self
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// ID columns ordered by rank.
    pub fn id_columns(&self) -> Vec<&Arc<Column>> {
        self.columns.id_columns()
    }

    /// Column by physical or display name.
    pub fn column(&self, name: &str) -> EdsResult<&Arc<Column>> {
        self.columns.find(name)?.ok_or_else(|| {
            EdsError::Schema(format!("'{}' doesn't contain column '{name}'", self.name))
        })
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains(name)
    }

    pub fn has_view_columns(&self) -> bool {
        self.columns.iter().any(|c| c.is_in_view_file())
    }

    /// Name shown to people.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

/// A relationship between two entity types backed by a junction table.
///
/// The junction table names each side's ID columns as
/// `<TableName><IdColumn>`, e.g. `ConsolidatedUnknownCompoundItemsID`.
#[derive(Debug, Clone)]
pub struct Connection {
    pub type1_id: i64,
    pub type2_id: i64,
    /// Logical names of the two endpoints.
    pub type1: String,
    pub type2: String,
    pub table_name: String,
    pub columns: ColumnSet,
}

impl Connection {
    pub fn new(type1: &EntityType, type2: &EntityType, table_name: &str) -> Self {
        Self {
            type1_id: type1.id,
            type2_id: type2.id,
            type1: type1.name.clone(),
            type2: type2.name.clone(),
            table_name: table_name.to_string(),
            columns: ColumnSet::new(),
        }
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Order-independent identity of the endpoint pair.
    pub fn key(&self) -> (i64, i64) {
        connection_key(self.type1_id, self.type2_id)
    }

    /// The endpoint opposite to `type_name`.
    pub fn other(&self, type_name: &str) -> Option<&str> {
        if self.type1 == type_name {
            Some(&self.type2)
        } else if self.type2 == type_name {
            Some(&self.type1)
        } else {
            None
        }
    }

    pub fn id_columns(&self) -> Vec<&Arc<Column>> {
        self.columns.id_columns()
    }

    /// Junction column holding `id_column` of the side stored in `table_name`.
    pub fn link_column(table_name: &str, id_column: &str) -> String {
        format!("{table_name}{id_column}")
    }
}

pub(crate) fn connection_key(a: i64, b: i64) -> (i64, i64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
