//! Writing changed properties back.

use std::sync::Arc;

use chrono::Utc;
use rusqlite::params_from_iter;
use rusqlite::types::Value as SqlValue;
use tracing::debug;

use super::database::VIEW_SCHEMA;
use super::select::view_table;
use super::Eds;
use crate::catalog::{Column, EntityType};
use crate::entity::EntityItem;
use crate::error::{EdsError, EdsResult};
use crate::sql::{col, conjunction, placeholder, ExprExt, Insert, Sqlite, Update};

/// Metadata table holding the entity type columns.
const COLUMNS_TABLE: &str = "DataTypesColumns";

/// Values of one item in statement order.
struct Row {
    values: Vec<SqlValue>,
    ids: Vec<SqlValue>,
}

impl Eds {
    /// Store properties of `items`, all of one entity type.
    ///
    /// With `properties` set to `None` every dirty property of any item is
    /// stored. ID, connection and added properties are rejected, as are view
    /// properties when no view store is available. All rows are written in
    /// one transaction together with the `LastChange` stamp of every written
    /// column; on success the stored properties are marked clean.
    /// Returns the number of items written.
    pub fn update(&self, items: &mut [EntityItem], properties: Option<&[&str]>) -> EdsResult<usize> {
        let Some(first) = items.first() else {
            return Ok(0);
        };
        let ty = first.entity_type().clone();
        if items.iter().any(|item| item.entity_type().id != ty.id) {
            return Err(EdsError::Validation(
                "all items must be of the same entity type".to_string(),
            ));
        }

        let names: Vec<String> = match properties {
            Some(names) => names.iter().map(|n| n.to_string()).collect(),
            None => {
                let mut names: Vec<String> = Vec::new();
                for property in items.iter().flat_map(|item| item.properties()) {
                    let name = property.name();
                    if property.is_dirty() && !property.is_virtual() && !names.iter().any(|n| n == name) {
                        names.push(name.to_string());
                    }
                }
                names
            }
        };

        let mut columns: Vec<Arc<Column>> = Vec::new();
        for name in &names {
            let column = self.updatable_column(&ty, first, name)?;
            if !columns.iter().any(|c| c.column_name == column.column_name) {
                columns.push(column);
            }
        }
        if columns.is_empty() {
            return Ok(0);
        }

        let (view_columns, table_columns): (Vec<_>, Vec<_>) =
            columns.iter().cloned().partition(|c| c.is_in_view_file());

        let rows = items
            .iter()
            .map(|item| -> EdsResult<Row> {
                Ok(Row {
                    values: columns
                        .iter()
                        .map(|c| item.property(&c.column_name).map(|p| p.raw_value().clone()))
                        .collect::<EdsResult<_>>()?,
                    ids: item.raw_ids()?,
                })
            })
            .collect::<EdsResult<Vec<_>>>()?;

        self.write(&ty, &table_columns, &view_columns, &columns, &rows)?;

        let updated: Vec<&str> = columns.iter().map(|c| c.column_name.as_str()).collect();
        for item in items.iter_mut() {
            item.mark_clean(&updated);
        }
        Ok(rows.len())
    }

    fn updatable_column(
        &self,
        ty: &EntityType,
        item: &EntityItem,
        name: &str,
    ) -> EdsResult<Arc<Column>> {
        let Some(column) = ty.columns.find(name)? else {
            return Err(match item.property(name) {
                Ok(p) if p.is_from_connection() => EdsError::Validation(format!(
                    "connection property '{name}' cannot be updated"
                )),
                Ok(p) if p.is_virtual() => {
                    EdsError::Validation(format!("added property '{name}' cannot be updated"))
                }
                _ => EdsError::Schema(format!("'{}' doesn't contain column '{name}'", ty.name)),
            });
        };
        if column.is_id() {
            return Err(EdsError::Validation(format!(
                "ID property '{}' cannot be updated",
                column.column_name
            )));
        }
        if column.is_in_view_file() && !self.database().has_view_store() {
            return Err(EdsError::Validation(format!(
                "view file property '{}' cannot be updated without the view store",
                column.column_name
            )));
        }
        Ok(column.clone())
    }

    fn write(
        &self,
        ty: &EntityType,
        table_columns: &[Arc<Column>],
        view_columns: &[Arc<Column>],
        columns: &[Arc<Column>],
        rows: &[Row],
    ) -> EdsResult<()> {
        let conn = self.database().connection()?;
        let id_columns: Vec<String> = ty.id_columns().iter().map(|c| c.column_name.clone()).collect();
        let id_filter = || conjunction(id_columns.iter().map(|id| col(id).eq(placeholder())));
        let value_of = |row: &Row, column: &Column| {
            columns
                .iter()
                .position(|c| c.column_name == column.column_name)
                .map(|i| row.values[i].clone())
                .unwrap_or(SqlValue::Null)
        };

        // ATTACH is not allowed inside a transaction
        let _view = if view_columns.is_empty() {
            None
        } else {
            Some(self.database().attach_view()?)
        };
        let tx = conn.unchecked_transaction()?;

        if !table_columns.is_empty() {
            let mut update = Update::table(&ty.table_name);
            for column in table_columns {
                update = update.set(&column.column_name, placeholder());
            }
            if let Some(filter) = id_filter() {
                update = update.filter(filter);
            }
            let sql = update.to_sql(&Sqlite);
            debug!(sql = %sql, rows = rows.len(), "updating items");

            let mut stmt = tx.prepare(&sql)?;
            for row in rows {
                let values = table_columns.iter().map(|c| value_of(row, &**c));
                stmt.execute(params_from_iter(values.chain(row.ids.iter().cloned())))?;
            }
        }

        for column in view_columns {
            let table = view_table(ty, column);
            let mut update = Update::table(&table)
                .schema(VIEW_SCHEMA)
                .set(&column.column_name, placeholder());
            if let Some(filter) = id_filter() {
                update = update.filter(filter);
            }
            let mut insert = Insert::into(&table).schema(VIEW_SCHEMA);
            for id in &id_columns {
                insert = insert.value(id, placeholder());
            }
            insert = insert.value(&column.column_name, placeholder());

            let update_sql = update.to_sql(&Sqlite);
            let insert_sql = insert.to_sql(&Sqlite);
            debug!(sql = %update_sql, rows = rows.len(), "updating view column");

            let mut update = tx.prepare(&update_sql)?;
            let mut insert = tx.prepare(&insert_sql)?;
            for row in rows {
                let value = value_of(row, &**column);
                let changed = update.execute(params_from_iter(
                    std::iter::once(value.clone()).chain(row.ids.iter().cloned()),
                ))?;
                // a missing row already reads as null
                if changed == 0 && !matches!(value, SqlValue::Null) {
                    insert.execute(params_from_iter(
                        row.ids.iter().cloned().chain(std::iter::once(value)),
                    ))?;
                }
            }
        }

        let stamp = Utc::now().format("%Y-%m-%d %H:%M:%S%.6fZ").to_string();
        let sql = Update::table(COLUMNS_TABLE)
            .set("LastChange", placeholder())
            .filter(col("ColumnID").eq(placeholder()))
            .to_sql(&Sqlite);
        debug!(sql = %sql, columns = columns.len(), "stamping changed columns");
        let mut stmt = tx.prepare(&sql)?;
        for column in columns {
            stmt.execute((&stamp, column.id))?;
        }
        drop(stmt);

        tx.commit()?;
        for column in columns {
            column.last_change.set(&stamp);
        }
        Ok(())
    }
}
