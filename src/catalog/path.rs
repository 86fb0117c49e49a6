//! Shortest paths over the connection graph.
//!
//! Hierarchical reads need a chain of directly connected types. The search
//! is a depth-first enumeration of simple paths bounded by the best length
//! found so far: the bound starts at one more than the number of types and
//! shrinks whenever a shorter qualifying path turns up. A path qualifies
//! when it passes through every type in `via`.
//!
//! Among qualifying paths of equal length the first one enumerated wins.
//! Neighbours are enumerated in catalog load order, so the choice is stable
//! for one file but carries no other meaning; callers that care pass `via`.

use std::collections::HashSet;

use petgraph::graph::NodeIndex;

use super::Catalog;
use crate::error::EdsResult;

struct Search<'a> {
    catalog: &'a Catalog,
    target: NodeIndex,
    via: HashSet<NodeIndex>,
    /// Paths must be strictly shorter than this.
    bound: usize,
    best: Option<Vec<NodeIndex>>,
}

impl Search<'_> {
    fn walk(&mut self, path: &mut Vec<NodeIndex>) {
        let Some(&current) = path.last() else {
            return;
        };

        if current == self.target {
            if path.len() < self.bound && self.via.iter().all(|v| path.contains(v)) {
                self.bound = path.len();
                self.best = Some(path.clone());
            }
            return;
        }

        if path.len() + 1 >= self.bound {
            return;
        }

        let mut next: Vec<NodeIndex> = self
            .catalog
            .graph
            .neighbors(current)
            .filter(|n| !path.contains(n))
            .collect();
        next.sort_unstable();
        next.dedup();

        for node in next {
            path.push(node);
            self.walk(path);
            path.pop();
        }
    }
}

impl Catalog {
    /// Shortest chain of connected types from `from` to `to` passing
    /// through every type in `via`, as logical names.
    ///
    /// Names may be logical or display names. An empty result means no
    /// such path exists. `find_path(a, a)` is `[a]`.
    pub fn find_path(&self, from: &str, to: &str, via: &[&str]) -> EdsResult<Vec<String>> {
        let start = self.nodes[self.index_of(from)?];
        let target = self.nodes[self.index_of(to)?];
        let via = via
            .iter()
            .map(|name| self.index_of(name).map(|i| self.nodes[i]))
            .collect::<EdsResult<HashSet<_>>>()?;

        let mut search = Search {
            catalog: self,
            target,
            via,
            bound: self.types.len() + 1,
            best: None,
        };
        search.walk(&mut vec![start]);

        Ok(search
            .best
            .unwrap_or_default()
            .into_iter()
            .map(|node| self.types[self.graph[node]].name.clone())
            .collect())
    }
}
