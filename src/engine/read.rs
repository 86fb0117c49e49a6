//! Lazy reads.
//!
//! A [`Read`] owns a prepared statement. Rows are fetched and converted
//! only as [`EntityIter`] is advanced, so a caller can stop early without
//! materializing the rest. Calling [`Read::items`] again re-executes the
//! statement from the start.

use std::collections::VecDeque;
use std::fmt;

use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Rows, Statement};
use tracing::debug;

use super::database::ViewGuard;
use super::select::SelectPlan;
use crate::entity::EntityItem;
use crate::error::EdsResult;

/// Per-read options.
///
/// Ordering, limit and offset apply only where the filter text leaves
/// them out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use = "options have no effect until passed to a read"]
pub struct ReadOptions {
    /// Filter text, e.g. `Area > 1000 ORDER BY Name LIMIT 5`.
    pub filter: Option<String>,
    /// Properties to read; `None` reads all. ID properties are always read.
    pub properties: Option<Vec<String>>,
    /// Properties to leave out.
    pub exclude: Vec<String>,
    pub order: Option<String>,
    pub desc: bool,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn properties(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.properties = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn exclude(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.exclude = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn order(mut self, name: impl Into<String>) -> Self {
        self.order = Some(name.into());
        self
    }

    pub fn desc(mut self, desc: bool) -> Self {
        self.desc = desc;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// A prepared read.
pub struct Read<'a> {
    // declared before the guard: the statement must be finalized before
    // the view store is detached
    stmt: Statement<'a>,
    plan: SelectPlan,
    _view: Option<ViewGuard<'a>>,
}

impl<'a> Read<'a> {
    pub(crate) fn new(stmt: Statement<'a>, plan: SelectPlan, view: Option<ViewGuard<'a>>) -> Self {
        Self {
            stmt,
            plan,
            _view: view,
        }
    }

    /// The SQL being executed.
    pub fn sql(&self) -> &str {
        &self.plan.sql
    }

    /// Values bound to the `?` markers, in order.
    pub fn params(&self) -> &[SqlValue] {
        &self.plan.params
    }

    /// Execute and iterate over the resulting items.
    pub fn items(&mut self) -> EdsResult<EntityIter<'_>> {
        debug!(sql = %self.plan.sql, params = self.plan.params.len(), "executing read");
        let rows = self.stmt.query(params_from_iter(self.plan.params.iter()))?;
        Ok(EntityIter {
            rows,
            plan: &self.plan,
        })
    }

    /// Execute and collect every item.
    pub fn to_vec(&mut self) -> EdsResult<Vec<EntityItem>> {
        self.items()?.collect()
    }
}

impl fmt::Debug for Read<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Read")
            .field("sql", &self.plan.sql)
            .field("params", &self.plan.params)
            .finish()
    }
}

/// Forward-only iterator over the items of one execution.
pub struct EntityIter<'r> {
    rows: Rows<'r>,
    plan: &'r SelectPlan,
}

impl Iterator for EntityIter<'_> {
    type Item = EdsResult<EntityItem>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.rows.next() {
            Ok(Some(row)) => Some(self.plan.build_item(row)),
            Ok(None) => None,
            Err(err) => Some(Err(err.into())),
        }
    }
}

/// Items for a list of ID tuples, one execution per tuple in input order.
pub struct ReadMany<'a> {
    stmt: Statement<'a>,
    plan: SelectPlan,
    ids: std::vec::IntoIter<Vec<SqlValue>>,
    pending: VecDeque<EntityItem>,
    _view: Option<ViewGuard<'a>>,
}

impl<'a> ReadMany<'a> {
    pub(crate) fn new(
        stmt: Statement<'a>,
        plan: SelectPlan,
        ids: Vec<Vec<SqlValue>>,
        view: Option<ViewGuard<'a>>,
    ) -> Self {
        Self {
            stmt,
            plan,
            ids: ids.into_iter(),
            pending: VecDeque::new(),
            _view: view,
        }
    }

    pub fn sql(&self) -> &str {
        &self.plan.sql
    }

    fn fetch(&mut self, ids: Vec<SqlValue>) -> EdsResult<()> {
        debug!(sql = %self.plan.sql, params = ids.len(), "executing read by ID");
        let mut rows = self.stmt.query(params_from_iter(ids.iter()))?;
        while let Some(row) = rows.next()? {
            self.pending.push_back(self.plan.build_item(row)?);
        }
        Ok(())
    }
}

impl Iterator for ReadMany<'_> {
    type Item = EdsResult<EntityItem>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Some(Ok(item));
            }
            let ids = self.ids.next()?;
            if let Err(err) = self.fetch(ids) {
                return Some(Err(err));
            }
        }
    }
}

impl fmt::Debug for ReadMany<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadMany")
            .field("sql", &self.plan.sql)
            .field("remaining", &self.ids.len())
            .finish()
    }
}
