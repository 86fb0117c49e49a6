//! Converted property values.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue};
use serde::ser::{Serialize, SerializeSeq, Serializer};

use super::special::{DistributionValue, EnumValue};
use super::ConvertError;

/// Value exactly as stored in the result file.
pub type RawValue = SqlValue;

/// A converted (or caller supplied) property value.
#[derive(Clone)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Binary(Vec<u8>),
    Enum(EnumValue),
    Distribution(DistributionValue),
    /// Naive sequence, e.g. new distribution map contents.
    List(Vec<Value>),
    /// Output of a domain converter.
    Object(Arc<dyn Any + Send + Sync>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Enum(e) => Some(e.value()),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumValue> {
        match self {
            Value::Enum(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_distribution(&self) -> Option<&DistributionValue> {
        match self {
            Value::Distribution(d) => Some(d),
            _ => None,
        }
    }

    /// Downcast the output of a domain converter.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Object(obj) => obj.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Text(_) => "text",
            Value::Binary(_) => "binary",
            Value::Enum(_) => "enum",
            Value::Distribution(_) => "distribution",
            Value::List(_) => "list",
            Value::Object(_) => "object",
        }
    }

    /// Wrap a raw value without any type information.
    pub fn from_raw(raw: &RawValue) -> Value {
        match raw {
            SqlValue::Null => Value::Null,
            SqlValue::Integer(i) => Value::Int(*i),
            SqlValue::Real(f) => Value::Float(*f),
            SqlValue::Text(s) => Value::Text(s.clone()),
            SqlValue::Blob(b) => Value::Binary(b.clone()),
        }
    }

    /// Storage representation of a scalar value.
    pub fn to_raw(&self) -> Result<RawValue, ConvertError> {
        Ok(match self {
            Value::Null => SqlValue::Null,
            Value::Int(i) => SqlValue::Integer(*i),
            Value::Float(f) => SqlValue::Real(*f),
            Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
            Value::Text(s) => SqlValue::Text(s.clone()),
            Value::Binary(b) => SqlValue::Blob(b.clone()),
            Value::Enum(e) => SqlValue::Integer(e.value()),
            other => {
                return Err(ConvertError::new(format!(
                    "{} value has no storage representation",
                    other.kind()
                )))
            }
        })
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Binary(a), Value::Binary(b)) => a == b,
            (Value::Enum(a), Value::Enum(b)) => a == b,
            (Value::Distribution(a), Value::Distribution(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Float(v) => write!(f, "Float({v})"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Text(s) => write!(f, "Text({s:?})"),
            Value::Binary(b) => write!(f, "Binary({} bytes)", b.len()),
            Value::Enum(e) => write!(f, "Enum({e:?})"),
            Value::Distribution(d) => write!(f, "Distribution({d:?})"),
            Value::List(items) => f.debug_tuple("List").field(items).finish(),
            Value::Object(_) => write!(f, "Object(..)"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Binary(b) => write!(f, "<{} bytes>", b.len()),
            Value::Enum(e) => write!(f, "{}", e.display_name()),
            Value::Distribution(d) => {
                let parts: Vec<String> = d.values().iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Value::Object(_) => write!(f, "<object>"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Binary(b) => serializer.serialize_str(&format!("<{} bytes>", b.len())),
            Value::Enum(e) => serializer.serialize_str(&e.display_name()),
            Value::Distribution(d) => serialize_list(d.values(), serializer),
            Value::List(items) => serialize_list(items, serializer),
            Value::Object(_) => serializer.serialize_str("<object>"),
        }
    }
}

fn serialize_list<S: Serializer>(items: &[Value], serializer: S) -> Result<S::Ok, S::Error> {
    let mut seq = serializer.serialize_seq(Some(items.len()))?;
    for item in items {
        seq.serialize_element(item)?;
    }
    seq.end()
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let raw = self
            .to_raw()
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
        Ok(ToSqlOutput::Owned(raw))
    }
}

// =============================================================================
// Conversions from Rust values
// =============================================================================

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Binary(v)
    }
}

impl From<EnumValue> for Value {
    fn from(v: EnumValue) -> Self {
        Value::Enum(v)
    }
}

impl From<DistributionValue> for Value {
    fn from(v: DistributionValue) -> Self {
        Value::Distribution(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}
