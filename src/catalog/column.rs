//! Property columns and ordered column sets.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::convert::{
    BasicType, ConversionStage, ConvertError, CustomDataType, RawValue, SpecialType, Value,
    ValueConverter,
};
use crate::error::{EdsError, EdsResult};
use crate::query::ValueKind;

/// Extended data key marking a column stored in the view file.
pub const STORAGE_FILE_OPTION: &str = "StorageFileOption_StorageFile";

/// Time stamp of the last write to a column, as stored in `LastChange`.
///
/// Clones share the stamp, so items holding a column see a new stamp as
/// soon as an update commits.
#[derive(Debug, Clone, Default)]
pub struct LastChange(Arc<RwLock<Option<String>>>);

impl LastChange {
    pub fn new(stamp: Option<String>) -> Self {
        Self(Arc::new(RwLock::new(stamp)))
    }

    pub fn get(&self) -> Option<String> {
        self.0.read().clone()
    }

    pub(crate) fn set(&self, stamp: &str) {
        *self.0.write() = Some(stamp.to_string());
    }
}

/// A property column of an entity type or connection.
#[derive(Debug, Clone, Default)]
pub struct Column {
    pub id: i64,
    /// Physical column name.
    pub column_name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub format_string: Option<String>,
    /// Semantic description, e.g. `MolecularWeight`.
    pub data_purpose: Option<String>,
    pub guid: Option<String>,
    /// GUID of the value type, used to pick a domain converter.
    pub value_type_guid: Option<String>,
    pub nullable: bool,
    pub default_value: Option<String>,
    /// 1-based rank among the ID columns; `None` for ordinary columns.
    pub id_order: Option<i64>,
    pub visible_position: Option<i64>,
    pub allow_edit: bool,
    /// Added by the caller, never persisted.
    pub is_virtual: bool,
    pub extended_data: HashMap<String, String>,
    pub data_type: Option<CustomDataType>,
    pub special: Option<SpecialType>,
    pub converter: Option<Arc<dyn ValueConverter>>,
    pub last_change: LastChange,
}

impl Column {
    pub fn new(id: i64, column_name: &str) -> Self {
        Self {
            id,
            column_name: column_name.to_string(),
            nullable: true,
            ..Self::default()
        }
    }

    /// Column backing a value added with `EntityItem::add_value`.
    pub fn virtual_column(name: &str, visible_position: i64) -> Self {
        Self {
            column_name: name.to_string(),
            display_name: Some(name.to_string()),
            visible_position: Some(visible_position),
            nullable: true,
            is_virtual: true,
            ..Self::default()
        }
    }

    pub fn is_id(&self) -> bool {
        self.id_order.is_some()
    }

    pub fn is_in_view_file(&self) -> bool {
        self.extended_data
            .get(STORAGE_FILE_OPTION)
            .is_some_and(|v| v == "View")
    }

    /// Display name if set, else the physical name.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or(&self.column_name)
    }

    /// Storage class filter literals are bound as.
    pub fn value_kind(&self) -> ValueKind {
        match self.data_type.as_ref().and_then(|t| t.kind) {
            Some(BasicType::Int | BasicType::Int64) => ValueKind::Integer,
            Some(BasicType::Double) => ValueKind::Real,
            Some(BasicType::Boolean) => ValueKind::Boolean,
            Some(BasicType::String) => ValueKind::Text,
            _ => ValueKind::Any,
        }
    }

    fn stage_error(&self, stage: ConversionStage) -> impl Fn(ConvertError) -> EdsError + '_ {
        move |err| EdsError::Conversion {
            column: self.column_name.clone(),
            stage,
            message: err.message().to_string(),
        }
    }

    /// Run the stages forward: basic, special, domain.
    pub fn convert(&self, raw: &RawValue) -> EdsResult<Value> {
        let mut value = match &self.data_type {
            Some(data_type) => data_type
                .convert(raw)
                .map_err(self.stage_error(ConversionStage::Basic))?,
            None => Value::from_raw(raw),
        };
        if let Some(special) = &self.special {
            value = special
                .convert(value)
                .map_err(self.stage_error(ConversionStage::Special))?;
        }
        if let Some(converter) = &self.converter {
            value = converter
                .convert(value)
                .map_err(self.stage_error(ConversionStage::Domain))?;
        }
        Ok(value)
    }

    /// Run the stages backwards: domain, special, basic.
    pub fn revert(&self, value: Value) -> EdsResult<RawValue> {
        let mut value = value;
        if let Some(converter) = &self.converter {
            value = converter
                .revert(value)
                .map_err(self.stage_error(ConversionStage::Domain))?;
        }
        if let Some(special) = &self.special {
            value = special
                .revert(value)
                .map_err(self.stage_error(ConversionStage::Special))?;
        }
        match &self.data_type {
            Some(data_type) => data_type
                .revert(&value)
                .map_err(self.stage_error(ConversionStage::Basic)),
            None => value
                .to_raw()
                .map_err(self.stage_error(ConversionStage::Basic)),
        }
    }

    /// Build a value from naive input with the outermost stage.
    pub fn create(&self, value: Value) -> EdsResult<Value> {
        if let Some(converter) = &self.converter {
            return converter
                .create(value)
                .map_err(self.stage_error(ConversionStage::Domain));
        }
        if let Some(special) = &self.special {
            return special
                .create(value)
                .map_err(self.stage_error(ConversionStage::Special));
        }
        match &self.data_type {
            Some(data_type) => data_type
                .create(value)
                .map_err(self.stage_error(ConversionStage::Basic)),
            None => Ok(value),
        }
    }
}

/// Columns of one owner, unique by physical name, in load order.
///
/// Display names are not unique; looking up a display name shared by
/// several columns is an [`EdsError::AmbiguousName`].
#[derive(Debug, Clone, Default)]
pub struct ColumnSet {
    columns: Vec<Arc<Column>>,
    by_name: HashMap<String, usize>,
    by_display: HashMap<String, Vec<usize>>,
}

impl ColumnSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column, replacing an earlier one with the same physical name.
    pub fn push(&mut self, column: Column) {
        if let Some(&index) = self.by_name.get(&column.column_name) {
            self.by_display.values_mut().for_each(|v| v.retain(|&i| i != index));
            self.columns[index] = Arc::new(column);
            self.index_display(index);
            return;
        }
        let index = self.columns.len();
        self.by_name.insert(column.column_name.clone(), index);
        self.columns.push(Arc::new(column));
        self.index_display(index);
    }

    fn index_display(&mut self, index: usize) {
        if let Some(display) = self.columns[index].display_name.clone() {
            if !display.is_empty() {
                self.by_display.entry(display).or_default().push(index);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Column>> {
        self.columns.iter()
    }

    /// Look up by physical name, then by display name.
    pub fn find(&self, name: &str) -> EdsResult<Option<&Arc<Column>>> {
        if let Some(&index) = self.by_name.get(name) {
            return Ok(Some(&self.columns[index]));
        }
        match self.by_display.get(name).map(Vec::as_slice) {
            Some([index]) => Ok(Some(&self.columns[*index])),
            Some(indices) if indices.len() > 1 => Err(EdsError::AmbiguousName {
                name: name.to_string(),
                candidates: indices
                    .iter()
                    .map(|&i| self.columns[i].column_name.clone())
                    .collect(),
            }),
            _ => Ok(None),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        matches!(self.find(name), Ok(Some(_)))
    }

    /// ID columns ordered by rank.
    pub fn id_columns(&self) -> Vec<&Arc<Column>> {
        let mut ids: Vec<_> = self.columns.iter().filter(|c| c.is_id()).collect();
        ids.sort_by_key(|c| c.id_order);
        ids
    }

    pub fn with_purpose<'a>(&'a self, data_purpose: &'a str) -> impl Iterator<Item = &'a Arc<Column>> {
        self.columns
            .iter()
            .filter(move |c| c.data_purpose.as_deref() == Some(data_purpose))
    }
}
