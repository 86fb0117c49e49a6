//! SELECT construction for entity reads.
//!
//! Every read goes through a [`Scope`]: the columns one statement can reach
//! (the entity table as `T1`, the junction table of a connected read as
//! `C1`, one `V<n>` per view column) and a [`NameMap`] resolving physical
//! and display names to them. A [`SelectPlan`] is the finished statement
//! plus the columns in SELECT order, which is what rows are turned back
//! into items with.

use std::sync::Arc;

use rusqlite::types::Value as SqlValue;
use rusqlite::Row;

use super::database::VIEW_SCHEMA;
use super::ReadOptions;
use crate::catalog::{Column, Connection, EntityType};
use crate::entity::{EntityItem, PropertyValue};
use crate::error::{EdsError, EdsResult};
use crate::query::{ColumnRef, CompiledQuery, NameMap};
use crate::sql::{
    conjunction, placeholder, table_col, Expr, ExprExt, OrderByExpr, Query, Sqlite, TableRef,
};

pub(crate) const ENTITY_ALIAS: &str = "T1";
pub(crate) const CONNECTION_ALIAS: &str = "C1";

/// Where a selectable column lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Source {
    Entity,
    Connection,
    /// View table joined as `V<n>`.
    View(usize),
}

#[derive(Debug, Clone)]
pub(crate) struct Selectable {
    pub column: Arc<Column>,
    pub source: Source,
}

impl Selectable {
    fn alias(&self) -> String {
        match self.source {
            Source::Entity => ENTITY_ALIAS.to_string(),
            Source::Connection => CONNECTION_ALIAS.to_string(),
            Source::View(n) => format!("V{n}"),
        }
    }

    fn column_ref(&self) -> ColumnRef {
        ColumnRef::new(
            Some(&self.alias()),
            &self.column.column_name,
            self.column.value_kind(),
        )
    }

    fn expr(&self) -> Expr {
        table_col(&self.alias(), &self.column.column_name)
    }
}

/// Physical table holding one view column.
pub(crate) fn view_table(ty: &EntityType, column: &Column) -> String {
    format!("{}_{}", ty.table_name, column.column_name)
}

/// Columns reachable from one read.
#[derive(Debug)]
pub(crate) struct Scope {
    pub ty: Arc<EntityType>,
    pub connection: Option<Arc<Connection>>,
    columns: Vec<Selectable>,
    names: NameMap,
    with_view: bool,
}

impl Scope {
    /// `with_view` makes view columns selectable; without it they are left
    /// out entirely.
    pub fn new(ty: Arc<EntityType>, connection: Option<Arc<Connection>>, with_view: bool) -> Self {
        let mut columns = Vec::new();
        let mut views = 0;
        for column in ty.columns.iter() {
            let source = if column.is_in_view_file() {
                if !with_view {
                    continue;
                }
                views += 1;
                Source::View(views)
            } else {
                Source::Entity
            };
            columns.push(Selectable {
                column: column.clone(),
                source,
            });
        }

        if let Some(connection) = &connection {
            // entity columns win name collisions
            for column in connection.columns.iter() {
                if ty.columns.iter().any(|c| c.column_name == column.column_name) {
                    continue;
                }
                columns.push(Selectable {
                    column: column.clone(),
                    source: Source::Connection,
                });
            }
        }

        let mut names = NameMap::new();
        for selectable in &columns {
            names.insert_column(
                &selectable.column.column_name,
                selectable.column.display_name.as_deref(),
                selectable.column_ref(),
            );
        }

        Self {
            ty,
            connection,
            columns,
            names,
            with_view: views > 0,
        }
    }

    pub fn names(&self) -> &NameMap {
        &self.names
    }

    /// Whether statements over this scope need the view store attached.
    pub fn uses_view(&self) -> bool {
        self.with_view
    }

    fn position(&self, name: &str) -> EdsResult<usize> {
        let target = match self.names.resolve(name) {
            Ok(target) => target,
            Err(EdsError::Schema(_)) => return Err(self.unknown(name)),
            Err(err) => return Err(err),
        };
        self.columns
            .iter()
            .position(|s| s.column_ref() == target)
            .ok_or_else(|| self.unknown(name))
    }

    fn unknown(&self, name: &str) -> EdsError {
        match self.ty.columns.find(name) {
            Ok(Some(column)) if column.is_in_view_file() => EdsError::Schema(format!(
                "'{}' is stored in the view file which is not available",
                column.column_name
            )),
            _ => EdsError::Schema(format!(
                "'{}' doesn't contain property '{name}'",
                self.ty.name
            )),
        }
    }

    /// Indices of the columns to select, in scope order. ID columns of the
    /// type and of the connection are always part of the result.
    fn selection(&self, properties: Option<&[String]>, exclude: &[String]) -> EdsResult<Vec<usize>> {
        let mut selected = vec![properties.is_none(); self.columns.len()];
        for name in properties.unwrap_or_default() {
            selected[self.position(name)?] = true;
        }
        for name in exclude {
            selected[self.position(name)?] = false;
        }
        for (i, selectable) in self.columns.iter().enumerate() {
            if selectable.column.is_id() {
                selected[i] = true;
            }
        }
        Ok(selected
            .into_iter()
            .enumerate()
            .filter_map(|(i, s)| s.then_some(i))
            .collect())
    }

    /// `FROM` with the junction and view joins.
    fn base_query(&self) -> Query {
        let mut query = Query::new().from(TableRef::new(&self.ty.table_name).with_alias(ENTITY_ALIAS));

        if let Some(connection) = &self.connection {
            let on = conjunction(self.ty.id_columns().into_iter().map(|id| {
                table_col(
                    CONNECTION_ALIAS,
                    &Connection::link_column(&self.ty.table_name, &id.column_name),
                )
                .eq(table_col(ENTITY_ALIAS, &id.column_name))
            }));
            if let Some(on) = on {
                query = query.inner_join(
                    TableRef::new(&connection.table_name).with_alias(CONNECTION_ALIAS),
                    on,
                );
            }
        }

        for selectable in &self.columns {
            if !matches!(selectable.source, Source::View(_)) {
                continue;
            }
            let alias = selectable.alias();
            let on = conjunction(self.ty.id_columns().into_iter().map(|id| {
                table_col(&alias, &id.column_name).eq(table_col(ENTITY_ALIAS, &id.column_name))
            }));
            if let Some(on) = on {
                query = query.left_join(
                    TableRef::new(&view_table(&self.ty, &selectable.column))
                        .with_schema(VIEW_SCHEMA)
                        .with_alias(&alias),
                    on,
                );
            }
        }

        query
    }

    /// Condition restricting a connected read to the children of `parent`.
    fn parent_filter(&self, parent: &EntityItem) -> EdsResult<Option<(Expr, Vec<SqlValue>)>> {
        if self.connection.is_none() {
            return Ok(None);
        }
        let parent_type = parent.entity_type();
        let condition = conjunction(parent_type.id_columns().into_iter().map(|id| {
            table_col(
                CONNECTION_ALIAS,
                &Connection::link_column(&parent_type.table_name, &id.column_name),
            )
            .eq(placeholder())
        }));
        match condition {
            Some(condition) => Ok(Some((condition, parent.raw_ids()?))),
            None => Ok(None),
        }
    }

    /// Build the SELECT for a read.
    pub fn select(
        &self,
        options: &ReadOptions,
        compiled: &CompiledQuery,
        parent: Option<&EntityItem>,
    ) -> EdsResult<SelectPlan> {
        let selection = self.selection(options.properties.as_deref(), &options.exclude)?;
        let columns: Vec<Selectable> = selection.iter().map(|&i| self.columns[i].clone()).collect();

        let mut query = self
            .base_query()
            .select(columns.iter().map(Selectable::expr));
        let mut params = Vec::new();

        if let Some(parent) = parent {
            if let Some((condition, values)) = self.parent_filter(parent)? {
                query = query.filter(condition);
                params.extend(values);
            }
        }

        let query = self.finish(query, &mut params, options, compiled)?;

        Ok(SelectPlan {
            sql: query.to_sql(&Sqlite),
            params,
            columns,
            ty: self.ty.clone(),
            connection: self.connection.clone(),
        })
    }

    /// Build the SELECT for one ID tuple; the ID values are bound per
    /// execution, in rank order.
    pub fn select_by_ids(&self, options: &ReadOptions) -> EdsResult<SelectPlan> {
        let selection = self.selection(options.properties.as_deref(), &options.exclude)?;
        let columns: Vec<Selectable> = selection.iter().map(|&i| self.columns[i].clone()).collect();

        let mut query = self
            .base_query()
            .select(columns.iter().map(Selectable::expr));
        let condition = conjunction(
            self.ty
                .id_columns()
                .into_iter()
                .map(|id| table_col(ENTITY_ALIAS, &id.column_name).eq(placeholder())),
        );
        if let Some(condition) = condition {
            query = query.filter(condition);
        }

        Ok(SelectPlan {
            sql: query.to_sql(&Sqlite),
            params: Vec::new(),
            columns,
            ty: self.ty.clone(),
            connection: None,
        })
    }

    /// Build `SELECT COUNT(*)` over the scope.
    pub fn count(&self, compiled: &CompiledQuery) -> EdsResult<(String, Vec<SqlValue>)> {
        let mut params = Vec::new();
        let query = self.base_query().select(vec![crate::sql::count_star()]);
        let query = self.finish(query, &mut params, &ReadOptions::default(), compiled)?;
        Ok((query.to_sql(&Sqlite), params))
    }

    /// Append the compiled filter, then the caller's clauses for whatever
    /// the filter text did not specify.
    fn finish(
        &self,
        mut query: Query,
        params: &mut Vec<SqlValue>,
        options: &ReadOptions,
        compiled: &CompiledQuery,
    ) -> EdsResult<Query> {
        if let Some(condition) = &compiled.condition {
            query = query.filter(condition.clone());
            params.extend(compiled.params.iter().map(|p| p.to_sql_value()));
        }

        if compiled.has_order() {
            query = query.order_by(compiled.order_by.iter().cloned());
        } else if let Some(order) = &options.order {
            let target = self.columns[self.position(order)?].expr();
            query = query.order_by([if options.desc {
                OrderByExpr::desc(target)
            } else {
                OrderByExpr::asc(target)
            }]);
        }

        query.limit_offset = compiled.limit_offset;
        if query.limit_offset.limit.is_none() {
            query.limit_offset.limit = options.limit;
        }
        if query.limit_offset.offset.is_none() {
            query.limit_offset.offset = options.offset;
        }

        Ok(query)
    }
}

/// A finished SELECT and the columns of its result rows.
#[derive(Debug)]
pub(crate) struct SelectPlan {
    pub sql: String,
    pub params: Vec<SqlValue>,
    columns: Vec<Selectable>,
    ty: Arc<EntityType>,
    connection: Option<Arc<Connection>>,
}

impl SelectPlan {
    pub fn entity_type(&self) -> &Arc<EntityType> {
        &self.ty
    }

    /// Turn one result row into an item.
    pub fn build_item(&self, row: &Row<'_>) -> EdsResult<EntityItem> {
        let mut builder = EntityItem::builder(self.ty.clone());
        if let Some(connection) = &self.connection {
            builder = builder.connection(connection.clone());
        }
        for (i, selectable) in self.columns.iter().enumerate() {
            let raw: SqlValue = row.get(i)?;
            let property = match selectable.source {
                Source::Connection => PropertyValue::from_connection(selectable.column.clone(), raw),
                Source::Entity | Source::View(_) => {
                    PropertyValue::new(selectable.column.clone(), raw)
                }
            };
            builder.push(property);
        }
        builder.build()
    }
}
