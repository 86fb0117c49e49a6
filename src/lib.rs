//! # eds
//!
//! Schema-driven access to entity result files.
//!
//! A result file is a SQLite database whose metadata tables describe entity
//! types, their property columns and the connections between types. This
//! crate loads that description once and uses it to read and update items
//! without hand-written SQL.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │          Result file (entity tables + metadata)          │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [catalog loader]
//! ┌─────────────────────────────────────────────────────────┐
//! │   Catalog: types, columns, connections, converters       │
//! │            + type graph (path finder)                    │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!   filter text ──▶ [grammar + query compiler] ──▶ condition, params
//!                          │
//!                          ▼ [engine]
//! ┌─────────────────────────────────────────────────────────┐
//! │       SELECT / UPDATE via the sql builder (rusqlite)     │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [convert]
//! ┌─────────────────────────────────────────────────────────┐
//! │         EntityItem with typed property values            │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod catalog;
pub mod config;
pub mod convert;
pub mod engine;
pub mod entity;
pub mod error;
pub mod grammar;
pub mod query;
pub mod sql;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::catalog::{Catalog, Column, Connection, EntityType};
    pub use crate::config::Settings;
    pub use crate::convert::{ConverterRegistry, Value, ValueConverter};
    pub use crate::engine::{Eds, HierarchyRequest, ReadOptions};
    pub use crate::entity::{EntityItem, PropertyValue};
    pub use crate::error::{EdsError, EdsResult};
}

pub use config::Settings;
pub use convert::{ConverterRegistry, Value};
pub use engine::{Eds, HierarchyRequest, ReadOptions};
pub use entity::EntityItem;
pub use error::{EdsError, EdsResult};
