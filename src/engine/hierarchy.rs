//! Multi-level reads along a chain of connected types.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use super::{Eds, ReadOptions};
use crate::catalog::EntityType;
use crate::entity::EntityItem;
use crate::error::EdsResult;

/// What to read along a hierarchy path.
///
/// Items of a type in `keep` get their descendants attached as children;
/// other levels are flattened out of the result. Without a `keep` set every
/// type of the path is kept, so the result is the full tree. The last type
/// of the path is always returned.
#[derive(Debug, Clone, Default)]
#[must_use = "requests have no effect until passed to read_hierarchy"]
pub struct HierarchyRequest {
    pub path: Vec<String>,
    pub keep: Option<Vec<String>>,
    /// Per-type read options, keyed by type name.
    pub options: HashMap<String, ReadOptions>,
}

impl HierarchyRequest {
    pub fn new(path: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            path: path.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn keep(mut self, types: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.keep = Some(types.into_iter().map(Into::into).collect());
        self
    }

    pub fn options(mut self, type_name: impl Into<String>, options: ReadOptions) -> Self {
        self.options.insert(type_name.into(), options);
        self
    }
}

/// Request with every name resolved to a logical type name.
struct Resolved {
    path: Vec<Arc<EntityType>>,
    keep: HashSet<String>,
    options: HashMap<String, ReadOptions>,
}

impl Eds {
    /// Read along `request.path`, depth first.
    ///
    /// With a `parent`, the first level is read as its connected children;
    /// a path that starts at the parent's own type skips that type.
    pub fn read_hierarchy(
        &self,
        request: &HierarchyRequest,
        parent: Option<&EntityItem>,
    ) -> EdsResult<Vec<EntityItem>> {
        let catalog = self.catalog();

        let mut path = request
            .path
            .iter()
            .map(|name| catalog.get_type(name).cloned())
            .collect::<EdsResult<Vec<_>>>()?;
        if let (Some(parent), Some(first)) = (parent, path.first()) {
            if first.name == parent.entity_type().name {
                path.remove(0);
            }
        }

        // every step must be a direct connection
        let mut previous = parent.map(|p| p.entity_type().name.clone());
        for ty in &path {
            if let Some(previous) = &previous {
                catalog.get_connection(previous, &ty.name)?;
            }
            previous = Some(ty.name.clone());
        }

        let keep = match &request.keep {
            Some(keep) => keep
                .iter()
                .map(|name| catalog.get_type(name).map(|t| t.name.clone()))
                .collect::<EdsResult<HashSet<_>>>()?,
            None => path.iter().map(|t| t.name.clone()).collect(),
        };
        let options = request
            .options
            .iter()
            .map(|(name, options)| Ok((catalog.get_type(name)?.name.clone(), options.clone())))
            .collect::<EdsResult<HashMap<_, _>>>()?;

        let resolved = Resolved {
            path,
            keep,
            options,
        };
        debug!(
            path = ?resolved.path.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            "reading hierarchy"
        );

        let mut out = Vec::new();
        self.read_level(&resolved, 0, parent, &mut out)?;
        Ok(out)
    }

    fn read_level(
        &self,
        request: &Resolved,
        level: usize,
        parent: Option<&EntityItem>,
        out: &mut Vec<EntityItem>,
    ) -> EdsResult<()> {
        let Some(ty) = request.path.get(level) else {
            return Ok(());
        };
        let last = level + 1 == request.path.len();
        let kept = request.keep.contains(&ty.name);

        let mut options = request.options.get(&ty.name).cloned().unwrap_or_default();
        // a pass-through level only needs its IDs
        if !kept && !last && options.properties.is_none() {
            options.properties = Some(Vec::new());
        }

        let mut read = match parent {
            Some(parent) => self.read_connected(&ty.name, parent, &options)?,
            None => self.read(&ty.name, &options)?,
        };

        for item in read.items()? {
            let mut item = item?;
            if last {
                out.push(item);
            } else if kept {
                let mut children = Vec::new();
                self.read_level(request, level + 1, Some(&item), &mut children)?;
                item.add_children(children);
                out.push(item);
            } else {
                self.read_level(request, level + 1, Some(&item), out)?;
            }
        }

        Ok(())
    }
}
