//! Entity access over an open result file.
//!
//! [`Eds`] ties the pieces together: it opens the [`Database`], loads the
//! [`Catalog`] once, compiles filter text and turns rows into
//! [`EntityItem`]s.
//!
//! ```no_run
//! use eds::config::Settings;
//! use eds::convert::ConverterRegistry;
//! use eds::engine::{Eds, ReadOptions};
//!
//! let eds = Eds::open("study.cdResult", Settings::default(), &ConverterRegistry::new())?;
//! let mut read = eds.read(
//!     "ConsolidatedUnknownCompoundItem",
//!     &ReadOptions::new().filter("MolecularWeight > 300 ORDER BY Area DESC LIMIT 5"),
//! )?;
//! for item in read.items()? {
//!     let item = item?;
//!     println!("{} {}", item, item.value("Name")?);
//! }
//! # Ok::<(), eds::EdsError>(())
//! ```

mod database;
mod hierarchy;
mod read;
mod select;
mod update;

pub use database::{Database, ViewGuard, VIEW_SCHEMA};
pub use hierarchy::HierarchyRequest;
pub use read::{EntityIter, Read, ReadMany, ReadOptions};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rusqlite::params_from_iter;
use tracing::debug;

use crate::catalog::{Catalog, Connection, EntityType};
use crate::config::Settings;
use crate::convert::{ConverterRegistry, Value};
use crate::entity::EntityItem;
use crate::error::{EdsError, EdsResult};
use crate::query::{CompiledQuery, FilterCompiler};
use select::Scope;

/// Typed entity access to one result file.
#[derive(Debug)]
pub struct Eds {
    db: Database,
    catalog: Catalog,
    compiler: FilterCompiler,
    settings: Settings,
}

impl Eds {
    /// Open `path` and load its catalog.
    ///
    /// Domain converters are looked up in `registry` while the catalog is
    /// loaded.
    pub fn open(
        path: impl AsRef<Path>,
        settings: Settings,
        registry: &ConverterRegistry,
    ) -> EdsResult<Self> {
        let mut db = Database::new(path, settings.storage.clone())?;
        db.open()?;
        let catalog = Catalog::load(db.connection()?, registry)?;
        let compiler = FilterCompiler::new(settings.query.memoize)?;
        Ok(Self {
            db,
            catalog,
            compiler,
            settings,
        })
    }

    /// Open the storage connection again after [`Eds::close`]; nested calls
    /// are reference counted.
    pub fn reopen(&mut self) -> EdsResult<bool> {
        self.db.open()
    }

    /// Release one reference to the storage connection.
    pub fn close(&mut self) {
        self.db.close();
    }

    pub fn is_open(&self) -> bool {
        self.db.is_open()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Copy the result file next to itself; see [`Database::backup`].
    pub fn backup(&self) -> EdsResult<PathBuf> {
        self.db.backup()
    }

    /// Shortest chain of connected types from `from` to `to` through every
    /// type in `via`. Empty when there is none.
    pub fn get_path(&self, from: &str, to: &str, via: &[&str]) -> EdsResult<Vec<String>> {
        self.catalog.find_path(from, to, via)
    }

    fn compile(&self, filter: Option<&str>, scope: &Scope) -> EdsResult<CompiledQuery> {
        match filter {
            Some(text) => self.compiler.compile(text, scope.names()),
            None => Ok(CompiledQuery::default()),
        }
    }

    fn scope(&self, ty: Arc<EntityType>, connection: Option<Arc<Connection>>) -> Scope {
        Scope::new(ty, connection, self.db.has_view_store())
    }

    fn view_guard(&self, scope: &Scope) -> EdsResult<Option<ViewGuard<'_>>> {
        if scope.uses_view() {
            self.db.attach_view().map(Some)
        } else {
            Ok(None)
        }
    }

    fn count_scope(&self, scope: &Scope, filter: Option<&str>) -> EdsResult<u64> {
        let conn = self.db.connection()?;
        let compiled = self.compile(filter, scope)?;
        let (sql, params) = scope.count(&compiled)?;
        let _view = self.view_guard(scope)?;

        debug!(sql = %sql, params = params.len(), "counting");
        let count: i64 = conn.query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// Number of items of `entity` matching `filter`.
    pub fn count(&self, entity: &str, filter: Option<&str>) -> EdsResult<u64> {
        let ty = self.catalog.get_type(entity)?.clone();
        self.count_scope(&self.scope(ty, None), filter)
    }

    /// Number of links between two types. The filter addresses the
    /// connection's own properties.
    pub fn count_connections(&self, entity1: &str, entity2: &str, filter: Option<&str>) -> EdsResult<u64> {
        let conn = self.db.connection()?;
        let connection = self.catalog.get_connection(entity1, entity2)?.clone();

        // the junction table is counted on its own, as if it were a type
        let mut junction = EntityType::new(0, &connection.table_name, &connection.table_name);
        junction.columns = connection.columns.clone();
        let scope = self.scope(Arc::new(junction), None);

        let compiled = self.compile(filter, &scope)?;
        let (sql, params) = scope.count(&compiled)?;
        debug!(sql = %sql, params = params.len(), "counting connections");
        let count: i64 = conn.query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    fn prepare_read(
        &self,
        scope: Scope,
        options: &ReadOptions,
        parent: Option<&EntityItem>,
    ) -> EdsResult<Read<'_>> {
        let conn = self.db.connection()?;
        let compiled = self.compile(options.filter.as_deref(), &scope)?;
        let plan = scope.select(options, &compiled, parent)?;
        let view = self.view_guard(&scope)?;
        let stmt = conn.prepare(&plan.sql)?;
        Ok(Read::new(stmt, plan, view))
    }

    /// Items of `entity`.
    pub fn read(&self, entity: &str, options: &ReadOptions) -> EdsResult<Read<'_>> {
        let ty = self.catalog.get_type(entity)?.clone();
        self.prepare_read(self.scope(ty, None), options, None)
    }

    /// Items of `entity` directly connected to `parent`. Each item carries
    /// the connection's properties next to its own.
    pub fn read_connected(
        &self,
        entity: &str,
        parent: &EntityItem,
        options: &ReadOptions,
    ) -> EdsResult<Read<'_>> {
        let ty = self.catalog.get_type(entity)?.clone();
        let connection = self
            .catalog
            .get_connection(&parent.entity_type().name, &ty.name)?
            .clone();
        self.prepare_read(self.scope(ty, Some(connection)), options, Some(parent))
    }

    /// Items of `entity` for each ID tuple, in input order. Tuples hold the
    /// converted ID values in rank order, as in [`EntityItem::ids`].
    ///
    /// Only `properties` and `exclude` of `options` apply.
    pub fn read_many(
        &self,
        entity: &str,
        ids: impl IntoIterator<Item = Vec<Value>>,
        options: &ReadOptions,
    ) -> EdsResult<ReadMany<'_>> {
        let conn = self.db.connection()?;
        let ty = self.catalog.get_type(entity)?.clone();
        let id_columns = ty.id_columns();

        let raw_ids = ids
            .into_iter()
            .map(|tuple| {
                if tuple.len() != id_columns.len() {
                    return Err(EdsError::Validation(format!(
                        "'{}' has {} ID columns, got {} values",
                        ty.name,
                        id_columns.len(),
                        tuple.len()
                    )));
                }
                id_columns
                    .iter()
                    .zip(tuple)
                    .map(|(column, value)| column.revert(value))
                    .collect::<EdsResult<Vec<_>>>()
            })
            .collect::<EdsResult<Vec<_>>>()?;

        let scope = self.scope(ty.clone(), None);
        let plan = scope.select_by_ids(options)?;
        let view = self.view_guard(&scope)?;
        let stmt = conn.prepare(&plan.sql)?;
        Ok(ReadMany::new(stmt, plan, raw_ids, view))
    }
}
