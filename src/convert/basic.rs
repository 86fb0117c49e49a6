//! Basic stage: stored scalars to typed values.

use std::fmt;

use rusqlite::types::Value as SqlValue;

use super::{ConvertError, RawValue, Value};

/// Storage type named by a custom data type row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicType {
    Int,
    Int64,
    Double,
    String,
    Boolean,
    Binary,
    Object,
}

impl BasicType {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "Int" => BasicType::Int,
            "Int64" => BasicType::Int64,
            "Double" => BasicType::Double,
            "String" => BasicType::String,
            "Boolean" => BasicType::Boolean,
            "Binary" => BasicType::Binary,
            "Object" => BasicType::Object,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            BasicType::Int => "Int",
            BasicType::Int64 => "Int64",
            BasicType::Double => "Double",
            BasicType::String => "String",
            BasicType::Boolean => "Boolean",
            BasicType::Binary => "Binary",
            BasicType::Object => "Object",
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, BasicType::Int | BasicType::Int64)
    }
}

impl fmt::Display for BasicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A custom data type row: the first stage of every column.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomDataType {
    pub id: i64,
    pub name: String,
    pub system_type: Option<String>,
    /// `None` when the name is not a known storage type; conversion then
    /// fails instead of guessing.
    pub kind: Option<BasicType>,
}

impl CustomDataType {
    pub fn new(id: i64, name: &str, system_type: Option<&str>) -> Self {
        Self {
            id,
            name: name.to_string(),
            system_type: system_type.map(str::to_string),
            kind: BasicType::from_name(name),
        }
    }

    fn kind(&self) -> Result<BasicType, ConvertError> {
        self.kind.ok_or_else(|| {
            ConvertError::new(format!("'{}' is not a known custom data type", self.name))
        })
    }

    /// Raw stored value to basic value.
    pub fn convert(&self, raw: &RawValue) -> Result<Value, ConvertError> {
        if let SqlValue::Null = raw {
            return Ok(Value::Null);
        }
        let kind = self.kind()?;
        let mismatch = || {
            ConvertError::new(format!(
                "cannot read {} as {}",
                raw.data_type(),
                kind.name()
            ))
        };

        Ok(match (kind, raw) {
            (BasicType::Int | BasicType::Int64, SqlValue::Integer(i)) => Value::Int(*i),
            (BasicType::Int | BasicType::Int64, SqlValue::Real(f)) => {
                // only whole numbers inside the i64 range
                if f.fract() != 0.0 || *f < i64::MIN as f64 || *f >= i64::MAX as f64 {
                    return Err(ConvertError::new(format!(
                        "cannot read REAL {f} as {} without losing precision",
                        kind.name()
                    )));
                }
                Value::Int(*f as i64)
            }
            (BasicType::Int | BasicType::Int64, SqlValue::Text(s)) => {
                Value::Int(s.trim().parse().map_err(|_| mismatch())?)
            }
            (BasicType::Double, SqlValue::Real(f)) => Value::Float(*f),
            (BasicType::Double, SqlValue::Integer(i)) => Value::Float(*i as f64),
            (BasicType::Double, SqlValue::Text(s)) => {
                Value::Float(s.trim().parse().map_err(|_| mismatch())?)
            }
            (BasicType::String, SqlValue::Text(s)) => Value::Text(s.clone()),
            (BasicType::String, SqlValue::Integer(i)) => Value::Text(i.to_string()),
            (BasicType::String, SqlValue::Real(f)) => Value::Text(f.to_string()),
            (BasicType::Boolean, SqlValue::Integer(i)) => Value::Bool(*i != 0),
            (BasicType::Boolean, SqlValue::Real(f)) => Value::Bool(*f != 0.0),
            (BasicType::Binary, SqlValue::Blob(b)) => Value::Binary(b.clone()),
            (BasicType::Binary, SqlValue::Text(s)) => Value::Binary(s.clone().into_bytes()),
            (BasicType::Object, raw) => Value::from_raw(raw),
            _ => return Err(mismatch()),
        })
    }

    /// Basic value back to its stored form.
    pub fn revert(&self, value: &Value) -> Result<RawValue, ConvertError> {
        if value.is_null() {
            return Ok(SqlValue::Null);
        }
        let kind = self.kind()?;
        Ok(match (kind, value) {
            (BasicType::Int | BasicType::Int64, Value::Int(i)) => SqlValue::Integer(*i),
            (BasicType::Int | BasicType::Int64, Value::Bool(b)) => SqlValue::Integer(i64::from(*b)),
            (BasicType::Int | BasicType::Int64, Value::Enum(e)) => SqlValue::Integer(e.value()),
            (BasicType::Double, Value::Float(f)) => SqlValue::Real(*f),
            (BasicType::Double, Value::Int(i)) => SqlValue::Real(*i as f64),
            (BasicType::String, Value::Text(s)) => SqlValue::Text(s.clone()),
            (BasicType::Boolean, Value::Bool(b)) => SqlValue::Integer(i64::from(*b)),
            (BasicType::Binary, Value::Binary(b)) => SqlValue::Blob(b.clone()),
            (BasicType::Object, other) => other.to_raw()?,
            (kind, other) => return Err(ConvertError::unexpected(kind.name(), other)),
        })
    }

    /// Validate naive caller input for this type.
    pub fn create(&self, value: Value) -> Result<Value, ConvertError> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        let kind = self.kind()?;
        Ok(match (kind, value) {
            (BasicType::Int | BasicType::Int64, v @ Value::Int(_)) => v,
            (BasicType::Double, v @ Value::Float(_)) => v,
            (BasicType::Double, Value::Int(i)) => Value::Float(i as f64),
            (BasicType::String, v @ Value::Text(_)) => v,
            (BasicType::Boolean, v @ Value::Bool(_)) => v,
            (BasicType::Binary, v @ Value::Binary(_)) => v,
            (BasicType::Object, v) => v,
            (kind, other) => return Err(ConvertError::unexpected(kind.name(), &other)),
        })
    }
}

impl fmt::Display for CustomDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
