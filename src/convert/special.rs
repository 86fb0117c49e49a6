//! Special stage: enums and distribution maps.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::{BasicType, ConvertError, CustomDataType, Value};

// =============================================================================
// Enums
// =============================================================================

/// One named value of an enum type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumElement {
    pub value: i64,
    pub display_name: String,
    pub abbreviation: Option<String>,
}

/// An enum type loaded from the metadata tables.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumType {
    pub id: i64,
    /// Full type name as stored, e.g. `Thermo.Magellan.Status, Thermo.Core`.
    pub type_name: String,
    pub is_flags: bool,
    elements: Vec<EnumElement>,
    by_value: HashMap<i64, usize>,
    by_name: HashMap<String, usize>,
}

impl EnumType {
    pub fn new(id: i64, type_name: &str, is_flags: bool) -> Self {
        Self {
            id,
            type_name: type_name.to_string(),
            is_flags,
            elements: Vec::new(),
            by_value: HashMap::new(),
            by_name: HashMap::new(),
        }
    }

    /// Short name: the last dotted segment of the type before any assembly
    /// qualifier.
    pub fn name(&self) -> &str {
        let qualified = self.type_name.split(',').next().unwrap_or_default();
        qualified.rsplit('.').next().unwrap_or(qualified).trim()
    }

    pub fn add_element(&mut self, element: EnumElement) {
        let index = self.elements.len();
        self.by_value.insert(element.value, index);
        self.by_name.insert(element.display_name.clone(), index);
        self.elements.push(element);
    }

    pub fn elements(&self) -> &[EnumElement] {
        &self.elements
    }

    pub fn element(&self, value: i64) -> Option<&EnumElement> {
        self.by_value.get(&value).map(|&i| &self.elements[i])
    }

    pub fn element_by_name(&self, display_name: &str) -> Option<&EnumElement> {
        self.by_name.get(display_name).map(|&i| &self.elements[i])
    }

    /// Elements making up `value`: the exact element when there is one,
    /// otherwise (flags enums only) every non-zero element whose bits are
    /// all set in `value`.
    pub fn elements_of(&self, value: i64) -> Vec<&EnumElement> {
        if let Some(element) = self.element(value) {
            return vec![element];
        }
        if value == 0 || !self.is_flags {
            return Vec::new();
        }
        self.elements
            .iter()
            .filter(|e| e.value != 0 && value & e.value == e.value)
            .collect()
    }
}

/// A value of an enum type.
#[derive(Clone)]
pub struct EnumValue {
    ty: Arc<EnumType>,
    value: i64,
}

impl EnumValue {
    pub fn new(ty: Arc<EnumType>, value: i64) -> Self {
        Self { ty, value }
    }

    pub fn enum_type(&self) -> &EnumType {
        &self.ty
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn is_flags(&self) -> bool {
        self.ty.is_flags
    }

    pub fn elements(&self) -> Vec<&EnumElement> {
        self.ty.elements_of(self.value)
    }

    /// Element names joined with `|`.
    pub fn display_name(&self) -> String {
        self.elements()
            .iter()
            .map(|e| e.display_name.as_str())
            .collect::<Vec<_>>()
            .join("|")
    }

    /// True when this value equals `value` or, for flags enums, includes
    /// all of its bits.
    pub fn contains(&self, value: i64) -> bool {
        if self.value == value {
            return true;
        }
        if !self.ty.is_flags || self.value == 0 || value == 0 {
            return false;
        }
        self.value & value == value
    }
}

impl PartialEq for EnumValue {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.ty.id == other.ty.id
    }
}

impl fmt::Debug for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({} {:?})", self.ty.name(), self.value, self.display_name())
    }
}

// =============================================================================
// Distribution maps
// =============================================================================

/// One box (cell) of a distribution map.
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionBox {
    pub id: i64,
    pub name: String,
    /// 1-based position inside the map.
    pub position: i64,
    pub description: Option<String>,
    pub semantic_terms: Option<String>,
    pub color: Option<String>,
    pub is_first_in_group: bool,
    pub extended_data: HashMap<String, String>,
}

impl DistributionBox {
    pub fn index(&self) -> usize {
        usize::try_from(self.position - 1).unwrap_or_default()
    }
}

/// A threshold level of a distribution map.
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionLevel {
    pub id: i64,
    pub name: String,
    pub position: i64,
    pub description: Option<String>,
    pub semantic_terms: Option<String>,
    pub color: Option<String>,
    pub threshold: f64,
}

/// Fixed-width packed multi-value cell.
///
/// Stored as little-endian boxes, each the value followed by one presence
/// byte; an absent box reads as null.
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionMap {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub semantic_terms: Option<String>,
    pub data_type: CustomDataType,
    pub minimum_value: Option<f64>,
    pub maximum_value: Option<f64>,
    boxes: Vec<DistributionBox>,
    levels: Vec<DistributionLevel>,
}

impl DistributionMap {
    pub fn new(id: i64, name: &str, data_type: CustomDataType) -> Self {
        Self {
            id,
            name: name.to_string(),
            description: None,
            semantic_terms: None,
            data_type,
            minimum_value: None,
            maximum_value: None,
            boxes: Vec::new(),
            levels: Vec::new(),
        }
    }

    pub fn set_boxes(&mut self, mut boxes: Vec<DistributionBox>) {
        boxes.sort_by_key(|b| b.position);
        self.boxes = boxes;
    }

    pub fn set_levels(&mut self, mut levels: Vec<DistributionLevel>) {
        levels.sort_by_key(|l| l.position);
        self.levels = levels;
    }

    pub fn boxes(&self) -> &[DistributionBox] {
        &self.boxes
    }

    pub fn levels(&self) -> &[DistributionLevel] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn boxes_with_terms(&self, semantic_terms: &str) -> Vec<&DistributionBox> {
        self.boxes
            .iter()
            .filter(|b| b.semantic_terms.as_deref() == Some(semantic_terms))
            .collect()
    }

    /// First level whose threshold is above `value`, else the last level.
    pub fn level_for(&self, value: f64) -> Option<&DistributionLevel> {
        self.levels
            .iter()
            .find(|l| value < l.threshold)
            .or_else(|| self.levels.last())
    }

    fn box_type(&self) -> Result<BasicType, ConvertError> {
        match self.data_type.kind {
            Some(kind @ (BasicType::Int | BasicType::Int64 | BasicType::Double | BasicType::Boolean)) => {
                Ok(kind)
            }
            _ => Err(ConvertError::new(format!(
                "'{}' cannot be stored in distribution map '{}'",
                self.data_type.name, self.name
            ))),
        }
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<Value>, ConvertError> {
        let kind = self.box_type()?;
        let width = box_width(kind);
        let needed = (width + 1) * self.boxes.len();
        if bytes.len() < needed {
            return Err(ConvertError::new(format!(
                "distribution map '{}' needs {needed} bytes, got {}",
                self.name,
                bytes.len()
            )));
        }

        Ok(bytes
            .chunks_exact(width + 1)
            .take(self.boxes.len())
            .map(|chunk| {
                let (data, flag) = chunk.split_at(width);
                if flag[0] == 0 {
                    return Value::Null;
                }
                match kind {
                    BasicType::Int => Value::Int(i64::from(i32::from_le_bytes(le_array(data)))),
                    BasicType::Int64 => Value::Int(i64::from_le_bytes(le_array(data))),
                    BasicType::Double => Value::Float(f64::from_le_bytes(le_array(data))),
                    _ => Value::Bool(data[0] != 0),
                }
            })
            .collect())
    }

    fn encode(&self, values: &[Value]) -> Result<Vec<u8>, ConvertError> {
        let kind = self.box_type()?;
        let mut buffer = Vec::with_capacity((box_width(kind) + 1) * values.len());
        for value in values {
            match (kind, value) {
                (_, Value::Null) => {
                    buffer.extend(std::iter::repeat(0u8).take(box_width(kind) + 1));
                    continue;
                }
                (BasicType::Int, Value::Int(i)) => {
                    let narrow = i32::try_from(*i)
                        .map_err(|_| ConvertError::new(format!("{i} does not fit a 32-bit box")))?;
                    buffer.extend_from_slice(&narrow.to_le_bytes());
                }
                (BasicType::Int64, Value::Int(i)) => buffer.extend_from_slice(&i.to_le_bytes()),
                (BasicType::Double, Value::Float(f)) => buffer.extend_from_slice(&f.to_le_bytes()),
                (BasicType::Boolean, Value::Bool(b)) => buffer.push(u8::from(*b)),
                (kind, other) => return Err(ConvertError::unexpected(kind.name(), other)),
            }
            buffer.push(1);
        }
        Ok(buffer)
    }

    fn check_values(&self, values: &[Value]) -> Result<(), ConvertError> {
        if values.len() != self.boxes.len() {
            return Err(ConvertError::new(format!(
                "distribution map '{}' has {} boxes, got {} values",
                self.name,
                self.boxes.len(),
                values.len()
            )));
        }
        let kind = self.box_type()?;
        for value in values {
            let fits = match (kind, value) {
                (_, Value::Null) => true,
                (BasicType::Int | BasicType::Int64, Value::Int(_)) => true,
                (BasicType::Double, Value::Float(_)) => true,
                (BasicType::Boolean, Value::Bool(_)) => true,
                _ => false,
            };
            if !fits {
                return Err(ConvertError::unexpected(kind.name(), value));
            }
        }
        Ok(())
    }
}

fn box_width(kind: BasicType) -> usize {
    match kind {
        BasicType::Int => 4,
        BasicType::Int64 | BasicType::Double => 8,
        _ => 1,
    }
}

fn le_array<const N: usize>(data: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&data[..N]);
    out
}

/// Values of a distribution map cell, one per box.
#[derive(Clone)]
pub struct DistributionValue {
    map: Arc<DistributionMap>,
    values: Vec<Value>,
}

impl DistributionValue {
    pub fn map(&self) -> &DistributionMap {
        &self.map
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Level of the value at `index`, if set and numeric.
    pub fn level(&self, index: usize) -> Option<&DistributionLevel> {
        let value = self.values.get(index)?.as_f64()?;
        self.map.level_for(value)
    }

    /// Copy of the values with `index` replaced, checked against the map.
    pub fn with_value(&self, index: usize, value: Value) -> Result<Self, ConvertError> {
        let mut values = self.values.clone();
        let slot = values
            .get_mut(index)
            .ok_or_else(|| ConvertError::new(format!("box index {index} is out of range")))?;
        *slot = value;
        self.map.check_values(&values)?;
        Ok(Self {
            map: self.map.clone(),
            values,
        })
    }
}

impl PartialEq for DistributionValue {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl fmt::Debug for DistributionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.values).finish()
    }
}

// =============================================================================
// Special stage
// =============================================================================

/// The special stage attached to a column.
#[derive(Debug, Clone)]
pub enum SpecialType {
    Enum(Arc<EnumType>),
    Distribution(Arc<DistributionMap>),
}

impl SpecialType {
    pub fn name(&self) -> &str {
        match self {
            SpecialType::Enum(e) => e.name(),
            SpecialType::Distribution(d) => &d.name,
        }
    }

    /// Basic value to special value.
    pub fn convert(&self, value: Value) -> Result<Value, ConvertError> {
        match (self, value) {
            (_, Value::Null) => Ok(Value::Null),
            (SpecialType::Enum(ty), Value::Int(i)) => Ok(EnumValue::new(ty.clone(), i).into()),
            (SpecialType::Distribution(map), Value::Binary(bytes)) => {
                let values = map.decode(&bytes)?;
                Ok(DistributionValue {
                    map: map.clone(),
                    values,
                }
                .into())
            }
            (SpecialType::Enum(_), other) => Err(ConvertError::unexpected("int", &other)),
            (SpecialType::Distribution(_), other) => {
                Err(ConvertError::unexpected("binary", &other))
            }
        }
    }

    /// Special value back to the basic value.
    pub fn revert(&self, value: Value) -> Result<Value, ConvertError> {
        match (self, value) {
            (_, Value::Null) => Ok(Value::Null),
            (SpecialType::Enum(_), Value::Enum(e)) => Ok(Value::Int(e.value())),
            (SpecialType::Distribution(map), Value::Distribution(d)) => {
                Ok(Value::Binary(map.encode(d.values())?))
            }
            (SpecialType::Enum(_), other) => Err(ConvertError::unexpected("enum", &other)),
            (SpecialType::Distribution(_), other) => {
                Err(ConvertError::unexpected("distribution", &other))
            }
        }
    }

    /// Special value from naive caller input.
    pub fn create(&self, value: Value) -> Result<Value, ConvertError> {
        match (self, value) {
            (_, Value::Null) => Ok(Value::Null),
            (SpecialType::Enum(ty), value @ (Value::Int(_) | Value::Enum(_))) => {
                let raw = value.as_i64().unwrap_or_default();
                if raw != 0 && ty.elements_of(raw).is_empty() {
                    return Err(ConvertError::new(format!(
                        "value {raw} is out of range of enum '{}'",
                        ty.name()
                    )));
                }
                Ok(EnumValue::new(ty.clone(), raw).into())
            }
            (SpecialType::Distribution(map), Value::Distribution(d)) => {
                map.check_values(d.values())?;
                Ok(DistributionValue {
                    map: map.clone(),
                    values: d.values,
                }
                .into())
            }
            (SpecialType::Distribution(map), Value::List(values)) => {
                map.check_values(&values)?;
                Ok(DistributionValue {
                    map: map.clone(),
                    values,
                }
                .into())
            }
            (SpecialType::Enum(_), other) => Err(ConvertError::unexpected("enum or int", &other)),
            (SpecialType::Distribution(_), other) => {
                Err(ConvertError::unexpected("distribution or list", &other))
            }
        }
    }
}
