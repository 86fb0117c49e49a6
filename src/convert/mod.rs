//! Value conversion pipeline.
//!
//! Every column carries up to three ordered stages:
//!
//! 1. *basic*: the raw stored scalar to int/float/bool/text/binary
//!    ([`CustomDataType`]),
//! 2. *special*: the basic value to an [`EnumValue`] or a
//!    [`DistributionValue`] ([`SpecialType`]),
//! 3. *domain*: anything else, supplied through a [`ValueConverter`]
//!    registered in a [`ConverterRegistry`].
//!
//! `convert` runs the stages forward; `revert` runs them backwards to get a
//! storable raw value. The registry is an explicit value handed to the
//! catalog when it is loaded, so two engines can use different converters.

mod basic;
mod special;
mod value;

pub use basic::{BasicType, CustomDataType};
pub use special::{
    DistributionBox, DistributionLevel, DistributionMap, DistributionValue, EnumElement, EnumType,
    EnumValue, SpecialType,
};
pub use value::{RawValue, Value};

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Stage of the pipeline a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversionStage {
    Basic,
    Special,
    Domain,
}

impl fmt::Display for ConversionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionStage::Basic => write!(f, "basic"),
            ConversionStage::Special => write!(f, "special"),
            ConversionStage::Domain => write!(f, "domain"),
        }
    }
}

/// Failure reported by a single stage. The column wraps it into
/// [`crate::EdsError::Conversion`] together with its name and the stage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ConvertError {
    message: String,
}

impl ConvertError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub(crate) fn unexpected(expected: &str, got: &Value) -> Self {
        Self::new(format!("expected {expected} value, got {}", got.kind()))
    }
}

/// A pluggable domain converter.
///
/// `convert` receives the output of the previous stage. `create` builds a
/// value from naive caller input and `revert` turns a value back into what
/// the previous stage understands; both default to passing the value
/// through.
pub trait ValueConverter: Send + Sync + fmt::Debug {
    fn convert(&self, value: Value) -> Result<Value, ConvertError>;

    fn revert(&self, value: Value) -> Result<Value, ConvertError> {
        Ok(value)
    }

    fn create(&self, value: Value) -> Result<Value, ConvertError> {
        Ok(value)
    }
}

/// Domain converters keyed by value type GUID or semantic tag.
///
/// Keys are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct ConverterRegistry {
    converters: HashMap<String, Arc<dyn ValueConverter>>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `converter` under `key`, replacing any previous entry.
    pub fn register(&mut self, key: &str, converter: Arc<dyn ValueConverter>) {
        self.converters.insert(key.to_lowercase(), converter);
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, key: &str, converter: impl ValueConverter + 'static) -> Self {
        self.register(key, Arc::new(converter));
        self
    }

    pub fn get(&self, key: &str) -> Option<Arc<dyn ValueConverter>> {
        self.converters.get(&key.to_lowercase()).cloned()
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }
}
