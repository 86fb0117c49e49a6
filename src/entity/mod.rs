//! Entity items produced by reads.
//!
//! An [`EntityItem`] is built once per row through [`EntityItemBuilder`] and
//! is read-only afterwards except through validated setters
//! ([`EntityItem::set_value`], [`EntityItem::check`], [`EntityItem::tag`]).

mod property;

pub use property::PropertyValue;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::catalog::{Column, Connection, EntityType};
use crate::convert::{RawValue, SpecialType, Value};
use crate::error::{EdsError, EdsResult};

/// Property toggled by [`EntityItem::check`].
pub const CHECKED_PROPERTY: &str = "Checked";
/// Distribution map property used by [`EntityItem::tag`].
pub const TAGS_PROPERTY: &str = "Tags";

/// Builder for [`EntityItem`].
#[derive(Debug)]
#[must_use = "builders have no effect until built"]
pub struct EntityItemBuilder {
    ty: Arc<EntityType>,
    connection: Option<Arc<Connection>>,
    properties: Vec<PropertyValue>,
}

impl EntityItemBuilder {
    pub fn new(ty: Arc<EntityType>) -> Self {
        Self {
            ty,
            connection: None,
            properties: Vec::new(),
        }
    }

    pub fn connection(mut self, connection: Arc<Connection>) -> Self {
        self.connection = Some(connection);
        self
    }

    pub fn property(mut self, property: PropertyValue) -> Self {
        self.properties.push(property);
        self
    }

    pub fn push(&mut self, property: PropertyValue) {
        self.properties.push(property);
    }

    /// Index the properties and compute the IDs.
    pub fn build(self) -> EdsResult<EntityItem> {
        let mut item = EntityItem {
            ty: self.ty,
            connection: self.connection,
            properties: Vec::new(),
            names: HashMap::new(),
            ambiguous: HashMap::new(),
            ids: Vec::new(),
            children: Vec::new(),
        };
        for property in self.properties {
            item.insert(property);
        }

        let ids = item
            .ty
            .id_columns()
            .iter()
            .map(|column| {
                let property = item.names.get(&column.column_name).ok_or_else(|| {
                    EdsError::Schema(format!(
                        "'{}' item is missing ID column '{}'",
                        item.ty.name, column.column_name
                    ))
                })?;
                item.properties[*property].value().cloned()
            })
            .collect::<EdsResult<Vec<_>>>()?;
        item.ids = ids;

        Ok(item)
    }
}

/// One read result.
#[derive(Debug, Clone)]
pub struct EntityItem {
    ty: Arc<EntityType>,
    connection: Option<Arc<Connection>>,
    properties: Vec<PropertyValue>,
    /// Physical names, then display names not shadowed by a physical name.
    names: HashMap<String, usize>,
    /// Display names claimed by more than one property.
    ambiguous: HashMap<String, Vec<String>>,
    ids: Vec<Value>,
    children: Vec<EntityItem>,
}

impl EntityItem {
    pub fn builder(ty: Arc<EntityType>) -> EntityItemBuilder {
        EntityItemBuilder::new(ty)
    }

    fn insert(&mut self, property: PropertyValue) {
        let index = self.properties.len();
        let column_name = property.name().to_string();
        let display = property
            .column()
            .display_name
            .clone()
            .filter(|d| !d.is_empty() && *d != column_name);

        // a physical name always wins over a display name
        if let Some(previous) = self.names.insert(column_name.clone(), index) {
            if self.properties[previous].name() == column_name {
                self.names.insert(column_name.clone(), previous);
                return;
            }
        }
        self.ambiguous.remove(&column_name);
        self.properties.push(property);

        let Some(display) = display else {
            return;
        };
        if let Some(candidates) = self.ambiguous.get_mut(&display) {
            candidates.push(column_name);
            return;
        }
        match self.names.get(&display) {
            None => {
                self.names.insert(display, index);
            }
            Some(&other) if self.properties[other].name() == display => {}
            Some(&other) => {
                let first = self.properties[other].name().to_string();
                self.names.remove(&display);
                self.ambiguous.insert(display, vec![first, column_name]);
            }
        }
    }

    pub fn entity_type(&self) -> &Arc<EntityType> {
        &self.ty
    }

    /// Connection the item was read through, for connected reads.
    pub fn connection(&self) -> Option<&Arc<Connection>> {
        self.connection.as_ref()
    }

    pub fn properties(&self) -> &[PropertyValue] {
        &self.properties
    }

    /// Converted values of the ID columns in rank order.
    pub fn ids(&self) -> &[Value] {
        &self.ids
    }

    /// Stored values of the ID columns in rank order.
    pub fn raw_ids(&self) -> EdsResult<Vec<RawValue>> {
        self.ty
            .id_columns()
            .iter()
            .map(|c| self.property(&c.column_name).map(|p| p.raw_value().clone()))
            .collect()
    }

    pub fn children(&self) -> &[EntityItem] {
        &self.children
    }

    pub(crate) fn add_children(&mut self, children: Vec<EntityItem>) {
        self.children.extend(children);
    }

    /// Descendants `level` generations down, depth first.
    pub fn flat_children(&self, level: usize) -> Vec<&EntityItem> {
        match level {
            0 => vec![self],
            1 => self.children.iter().collect(),
            _ => self
                .children
                .iter()
                .flat_map(|c| c.flat_children(level - 1))
                .collect(),
        }
    }

    fn index_of(&self, name: &str) -> EdsResult<usize> {
        if let Some(&index) = self.names.get(name) {
            return Ok(index);
        }
        if let Some(candidates) = self.ambiguous.get(name) {
            return Err(EdsError::AmbiguousName {
                name: name.to_string(),
                candidates: candidates.clone(),
            });
        }
        Err(EdsError::Schema(format!(
            "'{}' doesn't contain property '{name}'",
            self.ty.name
        )))
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Property by physical or display name.
    pub fn property(&self, name: &str) -> EdsResult<&PropertyValue> {
        self.index_of(name).map(|i| &self.properties[i])
    }

    /// Converted value by physical or display name.
    pub fn value(&self, name: &str) -> EdsResult<&Value> {
        self.property(name)?.value()
    }

    /// Properties whose column has the given semantic description.
    pub fn properties_with_purpose(&self, data_purpose: &str) -> Vec<&PropertyValue> {
        self.properties
            .iter()
            .filter(|p| p.column().data_purpose.as_deref() == Some(data_purpose))
            .collect()
    }

    /// Set a property from naive input.
    ///
    /// ID columns and added values cannot be changed.
    pub fn set_value(&mut self, name: &str, value: impl Into<Value>) -> EdsResult<()> {
        let index = self.index_of(name)?;
        let property = &mut self.properties[index];
        if property.column().is_id() {
            return Err(EdsError::Validation(format!(
                "ID property '{}' cannot be changed",
                property.name()
            )));
        }
        if property.is_virtual() {
            return Err(EdsError::Validation(format!(
                "added property '{}' cannot be changed",
                property.name()
            )));
        }
        property.set_value(value.into())?;
        Ok(())
    }

    pub(crate) fn mark_clean(&mut self, column_names: &[&str]) {
        for property in &mut self.properties {
            if column_names.contains(&property.name()) {
                property.mark_clean();
            }
        }
    }

    /// Attach a value that is not stored in the result file.
    pub fn add_value(&mut self, name: &str, value: impl Into<Value>) -> EdsResult<()> {
        if self.names.contains_key(name) || self.ambiguous.contains_key(name) {
            return Err(EdsError::Validation(format!(
                "the '{name}' property already exists in '{}'",
                self.ty.name
            )));
        }
        let position = 1 + self
            .properties
            .iter()
            .filter_map(|p| p.column().visible_position)
            .max()
            .unwrap_or(0);
        let column = Arc::new(Column::virtual_column(name, position));
        self.insert(PropertyValue::with_value(column, value.into()));
        Ok(())
    }

    fn require(&self, name: &str, what: &str) -> EdsResult<usize> {
        self.names.get(name).copied().ok_or_else(|| {
            EdsError::Validation(format!("'{}' is not {what}", self.ty.name))
        })
    }

    /// Set the checked state.
    pub fn check(&mut self, checked: bool) -> EdsResult<()> {
        self.require(CHECKED_PROPERTY, "checkable")?;
        self.set_value(CHECKED_PROPERTY, checked)
    }

    /// Set or clear one tag. Clearing stores the tag as unset.
    pub fn tag(&mut self, index: usize, tagged: bool) -> EdsResult<()> {
        let property = &self.properties[self.require(TAGS_PROPERTY, "taggable")?];
        let mut tags = match property.value()? {
            Value::Distribution(d) => d.values().to_vec(),
            _ => {
                let boxes = match &property.column().special {
                    Some(SpecialType::Distribution(map)) => map.len(),
                    _ => 0,
                };
                vec![Value::Null; boxes]
            }
        };
        let slot = tags.get_mut(index).ok_or_else(|| {
            EdsError::Validation(format!("tag index {index} is out of range"))
        })?;
        *slot = if tagged { Value::Bool(true) } else { Value::Null };
        self.set_value(TAGS_PROPERTY, Value::List(tags))
    }

    /// Whether the tag at `index` is set.
    pub fn tagged(&self, index: usize) -> EdsResult<bool> {
        let property = &self.properties[self.require(TAGS_PROPERTY, "taggable")?];
        Ok(match property.value()? {
            Value::Distribution(d) => d.get(index) == Some(&Value::Bool(true)),
            _ => false,
        })
    }

    pub fn clear_tags(&mut self) -> EdsResult<()> {
        self.require(TAGS_PROPERTY, "taggable")?;
        self.set_value(TAGS_PROPERTY, Value::Null)
    }
}

impl fmt::Display for EntityItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<String> = self.ids.iter().map(|v| v.to_string()).collect();
        write!(f, "{}({})", self.ty.name, ids.join(", "))
    }
}
