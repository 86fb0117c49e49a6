//! Property values.

use std::sync::Arc;

use once_cell::unsync::OnceCell;
use rusqlite::types::Value as SqlValue;

use crate::catalog::Column;
use crate::convert::{RawValue, Value};
use crate::error::{EdsError, EdsResult};

/// One value of an [`EntityItem`](super::EntityItem).
///
/// Holds the value as stored; the converted value is computed on first
/// access and cached.
#[derive(Debug, Clone)]
pub struct PropertyValue {
    column: Arc<Column>,
    raw: RawValue,
    value: OnceCell<Value>,
    dirty: bool,
    from_connection: bool,
}

impl PropertyValue {
    pub fn new(column: Arc<Column>, raw: RawValue) -> Self {
        Self {
            column,
            raw,
            value: OnceCell::new(),
            dirty: false,
            from_connection: false,
        }
    }

    /// Property read from a connection table.
    pub(crate) fn from_connection(column: Arc<Column>, raw: RawValue) -> Self {
        Self {
            from_connection: true,
            ..Self::new(column, raw)
        }
    }

    /// Property holding an already converted value.
    pub(crate) fn with_value(column: Arc<Column>, value: Value) -> Self {
        let raw = value.to_raw().unwrap_or(SqlValue::Null);
        Self {
            column,
            raw,
            value: OnceCell::with_value(value),
            dirty: false,
            from_connection: false,
        }
    }

    pub fn column(&self) -> &Arc<Column> {
        &self.column
    }

    /// Physical column name.
    pub fn name(&self) -> &str {
        &self.column.column_name
    }

    pub fn raw_value(&self) -> &RawValue {
        &self.raw
    }

    /// Converted value.
    pub fn value(&self) -> EdsResult<&Value> {
        self.value.get_or_try_init(|| self.column.convert(&self.raw))
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_virtual(&self) -> bool {
        self.column.is_virtual
    }

    pub fn is_from_connection(&self) -> bool {
        self.from_connection
    }

    pub fn is_editable(&self) -> bool {
        self.column.allow_edit
    }

    /// Replace the value from naive input. Returns whether anything
    /// changed; an equal value leaves the property clean.
    pub(crate) fn set_value(&mut self, value: Value) -> EdsResult<bool> {
        let value = self.column.create(value)?;
        if self.value()? == &value {
            return Ok(false);
        }

        let raw = self.column.revert(value.clone())?;
        if matches!(raw, SqlValue::Null) && !self.column.nullable {
            return Err(EdsError::Validation(format!(
                "'{}' is not nullable",
                self.column.column_name
            )));
        }

        self.raw = raw;
        self.value = OnceCell::with_value(value);
        self.dirty = true;
        Ok(true)
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }
}
