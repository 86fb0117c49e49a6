//! Schema catalog.
//!
//! The result file describes its own layout in metadata tables: entity
//! types and their columns, the connections between types, and the custom,
//! enum and distribution map types the columns are stored as, and the
//! processing workflows that produced the file. [`Catalog`] loads all of it
//! once and is immutable afterwards. Types and connections
//! are also kept as an undirected graph (types are nodes, connections are
//! edges) which [`Catalog::find_path`] searches.

mod column;
mod loader;
pub mod path;
mod types;
mod workflow;

pub use column::{Column, ColumnSet, LastChange, STORAGE_FILE_OPTION};
pub use types::{Connection, EntityType};
pub use workflow::{Workflow, WorkflowMessage};

use std::collections::HashMap;
use std::sync::Arc;

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use rusqlite::Connection as SqliteConnection;

use crate::convert::{ConverterRegistry, CustomDataType, DistributionMap, EnumType};
use crate::error::{EdsError, EdsResult};
use types::connection_key;

/// Immutable entity-relationship schema of one result file.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    types: Vec<Arc<EntityType>>,
    by_name: HashMap<String, usize>,
    by_display: HashMap<String, Vec<usize>>,
    connections: Vec<Arc<Connection>>,
    by_pair: HashMap<(i64, i64), usize>,
    /// Node weight is the type index, edge weight the connection index.
    graph: UnGraph<usize, usize>,
    nodes: Vec<NodeIndex>,
    custom_types: HashMap<i64, CustomDataType>,
    enums: HashMap<i64, Arc<EnumType>>,
    distribution_maps: HashMap<i64, Arc<DistributionMap>>,
    workflows: Vec<Arc<Workflow>>,
}

impl Catalog {
    /// Load the catalog from the metadata tables of `conn`.
    pub fn load(conn: &SqliteConnection, registry: &ConverterRegistry) -> EdsResult<Self> {
        loader::load(conn, registry)
    }

    /// Assemble a catalog from already built types and connections.
    ///
    /// Connections must reference types by logical name.
    pub fn from_parts(types: Vec<EntityType>, connections: Vec<Connection>) -> EdsResult<Self> {
        let mut catalog = Catalog::default();

        for ty in types {
            let index = catalog.types.len();
            if catalog.by_name.insert(ty.name.clone(), index).is_some() {
                return Err(EdsError::Schema(format!("duplicate entity type '{}'", ty.name)));
            }
            if let Some(display) = ty.display_name.as_ref().filter(|d| !d.is_empty()) {
                catalog.by_display.entry(display.clone()).or_default().push(index);
            }
            catalog.nodes.push(catalog.graph.add_node(index));
            catalog.types.push(Arc::new(ty));
        }

        for conn in connections {
            let a = catalog.index_of(&conn.type1)?;
            let b = catalog.index_of(&conn.type2)?;
            let index = catalog.connections.len();
            catalog.by_pair.insert(conn.key(), index);
            catalog
                .graph
                .add_edge(catalog.nodes[a], catalog.nodes[b], index);
            catalog.connections.push(Arc::new(conn));
        }

        Ok(catalog)
    }

    pub(crate) fn with_special_types(
        mut self,
        custom_types: HashMap<i64, CustomDataType>,
        enums: HashMap<i64, Arc<EnumType>>,
        distribution_maps: HashMap<i64, Arc<DistributionMap>>,
    ) -> Self {
        self.custom_types = custom_types;
        self.enums = enums;
        self.distribution_maps = distribution_maps;
        self
    }

    pub(crate) fn with_workflows(mut self, workflows: Vec<Workflow>) -> Self {
        self.workflows = workflows.into_iter().map(Arc::new).collect();
        self
    }

    fn index_of(&self, name: &str) -> EdsResult<usize> {
        if let Some(&index) = self.by_name.get(name) {
            return Ok(index);
        }
        match self.by_display.get(name).map(Vec::as_slice) {
            Some([index]) => Ok(*index),
            Some(indices) if indices.len() > 1 => Err(EdsError::AmbiguousName {
                name: name.to_string(),
                candidates: indices.iter().map(|&i| self.types[i].name.clone()).collect(),
            }),
            _ => Err(EdsError::unknown("entity type", name)),
        }
    }

    /// Entity type by logical or display name.
    pub fn get_type(&self, name: &str) -> EdsResult<&Arc<EntityType>> {
        self.index_of(name).map(|i| &self.types[i])
    }

    pub fn has_type(&self, name: &str) -> bool {
        self.index_of(name).is_ok()
    }

    pub fn types(&self) -> impl Iterator<Item = &Arc<EntityType>> {
        self.types.iter()
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn connections(&self) -> impl Iterator<Item = &Arc<Connection>> {
        self.connections.iter()
    }

    /// Connection between two types, each given by logical or display name.
    pub fn get_connection(&self, type1: &str, type2: &str) -> EdsResult<&Arc<Connection>> {
        let a = self.get_type(type1)?;
        let b = self.get_type(type2)?;
        self.by_pair
            .get(&connection_key(a.id, b.id))
            .map(|&i| &self.connections[i])
            .ok_or_else(|| {
                EdsError::Schema(format!(
                    "'{}' doesn't contain direct connection to '{}'",
                    a.name, b.name
                ))
            })
    }

    pub fn has_connection(&self, type1: &str, type2: &str) -> bool {
        self.get_connection(type1, type2).is_ok()
    }

    /// Types directly connected to `name`, with the connecting edge.
    pub fn neighbours(&self, name: &str) -> EdsResult<Vec<(&Arc<EntityType>, &Arc<Connection>)>> {
        let index = self.index_of(name)?;
        let mut found: Vec<_> = self
            .graph
            .edges(self.nodes[index])
            .map(|edge| {
                let other = if edge.source() == self.nodes[index] {
                    edge.target()
                } else {
                    edge.source()
                };
                (self.graph[other], *edge.weight())
            })
            .collect();
        found.sort_unstable();
        Ok(found
            .into_iter()
            .map(|(t, c)| (&self.types[t], &self.connections[c]))
            .collect())
    }

    pub fn custom_type(&self, id: i64) -> Option<&CustomDataType> {
        self.custom_types.get(&id)
    }

    pub fn enum_type(&self, id: i64) -> Option<&Arc<EnumType>> {
        self.enums.get(&id)
    }

    pub fn distribution_map(&self, id: i64) -> Option<&Arc<DistributionMap>> {
        self.distribution_maps.get(&id)
    }

    pub fn enum_types(&self) -> impl Iterator<Item = &Arc<EnumType>> {
        self.enums.values()
    }

    pub fn distribution_maps(&self) -> impl Iterator<Item = &Arc<DistributionMap>> {
        self.distribution_maps.values()
    }

    /// Workflows ordered by ID.
    pub fn workflows(&self) -> impl Iterator<Item = &Arc<Workflow>> {
        self.workflows.iter()
    }

    pub fn workflow(&self, id: i64) -> Option<&Arc<Workflow>> {
        self.workflows.iter().find(|w| w.id == id)
    }
}
