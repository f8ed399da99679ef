// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Closed-region extraction by half-edge face walking.
//!
//! Every undirected edge contributes two half-edges. Walking from node `u` to
//! node `v`, the walk leaves `v` along the neighbor immediately clockwise of `u`,
//! which keeps the face on the left. Bounded faces therefore come out
//! counter-clockwise and the unbounded face of each connected component comes out
//! clockwise. Each half-edge belongs to exactly one face, so marking half-edges as
//! used guarantees no face is traced twice.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::error::{Error, Result};
use crate::keys::HalfEdge;
use crate::network::PlanarNetwork;

impl PlanarNetwork {
    /// Enumerates the minimal closed faces of the network as node cycles.
    ///
    /// Faces that fail to walk cleanly (non-simple, degenerate, or not closing
    /// within the half-edge count) are skipped. A cycle found once in each
    /// direction (the only face of a simple loop and its unbounded outside) is
    /// reported once, counter-clockwise.
    pub fn find_all_closed_regions(&self) -> Vec<Vec<usize>> {
        let limit = self.edge_count() * 2;
        let mut used: FxHashSet<HalfEdge> = FxHashSet::default();
        let mut regions: Vec<Vec<usize>> = Vec::new();
        let mut seen: FxHashMap<Vec<usize>, usize> = FxHashMap::default();

        let starts = self.edges().flat_map(|(_, edge)| {
            let h = HalfEdge::new(edge.nodes.0, edge.nodes.1);
            [h, h.twin()]
        });

        for start in starts {
            if used.contains(&start) {
                continue;
            }
            let cycle = match self.walk_face(start, &mut used, limit) {
                Ok(cycle) => cycle,
                Err(err) => {
                    debug!(from = start.from, to = start.to, error = %err, "Skipping face walk");
                    continue;
                }
            };

            let key = canonical_cycle(&cycle);
            match seen.get(&key) {
                Some(&existing) => {
                    if self.is_counter_clockwise(&cycle)
                        && !self.is_counter_clockwise(&regions[existing])
                    {
                        regions[existing] = cycle;
                    }
                }
                None => {
                    seen.insert(key, regions.len());
                    regions.push(cycle);
                }
            }
        }

        debug!(regions = regions.len(), "Extracted closed regions");
        regions
    }

    /// Closed regions with counter-clockwise orientation only.
    pub fn find_bounded_regions(&self) -> Vec<Vec<usize>> {
        self.find_all_closed_regions()
            .into_iter()
            .filter(|cycle| self.is_counter_clockwise(cycle))
            .collect()
    }

    /// The half-edge that follows `h` around its face.
    fn next_half_edge(&self, h: HalfEdge) -> Option<HalfEdge> {
        let neighbors = self.sorted_neighbors(h.to);
        let n = neighbors.len();
        let k = neighbors.iter().position(|&(node, _)| node == h.from)?;
        let (next, _) = neighbors[(k + n - 1) % n];
        Some(HalfEdge::new(h.to, next))
    }

    fn walk_face(
        &self,
        start: HalfEdge,
        used: &mut FxHashSet<HalfEdge>,
        limit: usize,
    ) -> Result<Vec<usize>> {
        let mut cycle = Vec::new();
        let mut visited: FxHashSet<usize> = FxHashSet::default();
        let mut simple = true;
        let mut current = start;

        for _ in 0..limit {
            used.insert(current);
            cycle.push(current.from);
            simple &= visited.insert(current.from);

            let next = self.next_half_edge(current).ok_or(Error::DegenerateFace)?;
            if next == start {
                if !simple || cycle.len() < 3 {
                    return Err(Error::DegenerateFace);
                }
                return Ok(cycle);
            }
            current = next;
        }

        Err(Error::WalkExceeded(limit))
    }
}

/// Rotation- and direction-independent key of a node cycle
fn canonical_cycle(cycle: &[usize]) -> Vec<usize> {
    let n = cycle.len();
    let Some(start) = (0..n).min_by_key(|&i| cycle[i]) else {
        return Vec::new();
    };
    let forward: Vec<usize> = (0..n).map(|i| cycle[(start + i) % n]).collect();
    let backward: Vec<usize> = (0..n).map(|i| cycle[(start + n - i) % n]).collect();
    forward.min(backward)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Segment2;
    use approx::assert_relative_eq;
    use nalgebra::Point2;

    fn seg(x0: f64, y0: f64, x1: f64, y1: f64) -> Segment2 {
        Segment2::new(Point2::new(x0, y0), Point2::new(x1, y1))
    }

    fn build(segments: &[Segment2]) -> PlanarNetwork {
        PlanarNetwork::from_segments(segments, |s| Some(*s)).unwrap()
    }

    fn rectangle_walls(w: f64, h: f64) -> Vec<Segment2> {
        vec![
            seg(0.0, 0.0, w, 0.0),
            seg(w, 0.0, w, h),
            seg(w, h, 0.0, h),
            seg(0.0, h, 0.0, 0.0),
        ]
    }

    #[test]
    fn rectangle_yields_one_ccw_region() {
        let network = build(&rectangle_walls(6.0, 4.0));
        let regions = network.find_all_closed_regions();

        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].len(), 4);
        assert!(network.is_counter_clockwise(&regions[0]));
        assert_relative_eq!(network.signed_area(&regions[0]), 24.0, epsilon = 1e-9);

        let polygon = network.region_polygon(&regions[0]).unwrap();
        for corner in [(0.0, 0.0), (6.0, 0.0), (6.0, 4.0), (0.0, 4.0)] {
            assert!(polygon.contains(&Point2::new(corner.0, corner.1)));
        }
        // consecutive vertices are rectangle neighbours
        for i in 0..4 {
            let a = polygon[i];
            let b = polygon[(i + 1) % 4];
            assert!(a.x == b.x || a.y == b.y);
        }
    }

    #[test]
    fn partition_wall_yields_two_rooms() {
        let mut walls = rectangle_walls(10.0, 5.0);
        walls.push(seg(5.0, 0.0, 5.0, 5.0));
        let network = build(&walls);

        let bounded = network.find_bounded_regions();
        assert_eq!(bounded.len(), 2);
        for room in &bounded {
            assert_eq!(room.len(), 4);
            assert_relative_eq!(network.signed_area(room), 25.0, epsilon = 1e-9);
        }
        // plus the clockwise outside
        assert_eq!(network.find_all_closed_regions().len(), 3);
    }

    #[test]
    fn overshooting_walls_still_close() {
        let walls = vec![
            seg(-0.5, 0.0, 4.5, 0.0),
            seg(4.0, -0.5, 4.0, 3.5),
            seg(4.5, 3.0, -0.5, 3.0),
            seg(0.0, 3.5, 0.0, -0.5),
        ];
        let network = build(&walls);
        let regions = network.find_bounded_regions();

        assert_eq!(regions.len(), 1);
        assert_relative_eq!(network.signed_area(&regions[0]), 12.0, epsilon = 1e-9);
    }

    #[test]
    fn dangling_wall_does_not_break_room() {
        let mut walls = rectangle_walls(4.0, 4.0);
        walls.push(seg(2.0, 0.0, 2.0, 1.5));
        let network = build(&walls);

        let regions = network.find_all_closed_regions();
        assert_eq!(regions.len(), 1);
        // the stub's foot stays behind as a collinear node on the bottom wall
        assert_eq!(regions[0].len(), 5);
        assert_relative_eq!(network.signed_area(&regions[0]), 16.0, epsilon = 1e-9);
    }

    #[test]
    fn open_chain_has_no_regions() {
        let network = build(&[seg(0.0, 0.0, 1.0, 0.0), seg(1.0, 0.0, 1.0, 1.0)]);
        assert!(network.find_all_closed_regions().is_empty());
    }

    #[test]
    fn canonical_cycle_ignores_rotation_and_direction() {
        assert_eq!(canonical_cycle(&[2, 3, 0, 1]), vec![0, 1, 2, 3]);
        assert_eq!(canonical_cycle(&[1, 0, 3, 2]), vec![0, 1, 2, 3]);
    }
}
