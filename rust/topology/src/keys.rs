// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Key types for the planar network.
//!
//! Edges live in a `slotmap::SlotMap` so that pruning dangling edges leaves the
//! keys of every other edge valid (generational indices). Nodes are never removed
//! and are addressed by plain indices.

use slotmap::new_key_type;

new_key_type! {
    /// Key for an undirected edge between two network nodes.
    pub struct EdgeKey;
}

/// A directed traversal of an edge, from node `from` to node `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HalfEdge {
    pub from: usize,
    pub to: usize,
}

impl HalfEdge {
    pub fn new(from: usize, to: usize) -> Self {
        Self { from, to }
    }

    /// The same edge traversed the other way.
    pub fn twin(self) -> Self {
        Self {
            from: self.to,
            to: self.from,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn half_edge_twin_round_trips() {
        let h = HalfEdge::new(3, 7);
        assert_eq!(h.twin(), HalfEdge::new(7, 3));
        assert_eq!(h.twin().twin(), h);
    }

    #[test]
    fn edge_keys_survive_removal() {
        let mut edges: SlotMap<EdgeKey, (usize, usize)> = SlotMap::with_key();
        let a = edges.insert((0, 1));
        let b = edges.insert((1, 2));
        edges.remove(a);
        assert_eq!(edges.get(b), Some(&(1, 2)));
        assert!(edges.get(a).is_none());
    }
}
