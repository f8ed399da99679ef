// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Planar network construction.
//!
//! Builds a planar graph from owned line segments (for example wall centerlines):
//!
//! - every pairwise intersection splits both segments, including T-junctions and
//!   collinear overlaps
//! - endpoints and split points within the tolerance merge into one node (the first
//!   position seen wins)
//! - duplicate edges between the same two nodes collapse to one
//! - dangling edges are pruned, since they can never bound an enclosed face
//!
//! The adjacency list of every node is kept sorted by angle, which is what the face
//! walk in [`crate::faces`] relies on.

use nalgebra::{Point2, Vector2};
use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use tracing::debug;

use crate::error::{Error, Result};
use crate::keys::EdgeKey;
use crate::spatial::{find_or_add_node, SpatialIndex};

/// Default node merging tolerance
pub const DEFAULT_TOLERANCE: f64 = 0.01;

/// Parallelism threshold on the normalized cross product
const PARALLEL_EPSILON: f64 = 1e-9;

/// A straight input segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment2 {
    pub start: Point2<f64>,
    pub end: Point2<f64>,
}

impl Segment2 {
    pub fn new(start: Point2<f64>, end: Point2<f64>) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f64 {
        (self.end - self.start).norm()
    }

    pub fn direction(&self) -> Vector2<f64> {
        self.end - self.start
    }

    /// Point at parameter `t` (0 = start, 1 = end)
    pub fn point_at(&self, t: f64) -> Point2<f64> {
        self.start + self.direction() * t
    }

    /// Parameter of the projection of `p` onto the segment's line
    pub fn parameter_of(&self, p: &Point2<f64>) -> f64 {
        let d = self.direction();
        (p - self.start).dot(&d) / d.norm_squared()
    }

    fn is_finite(&self) -> bool {
        [self.start.x, self.start.y, self.end.x, self.end.y]
            .iter()
            .all(|c| c.is_finite())
    }

    fn bounds_overlap(&self, other: &Segment2, tolerance: f64) -> bool {
        let (a_min_x, a_max_x) = minmax(self.start.x, self.end.x);
        let (a_min_y, a_max_y) = minmax(self.start.y, self.end.y);
        let (b_min_x, b_max_x) = minmax(other.start.x, other.end.x);
        let (b_min_y, b_max_y) = minmax(other.start.y, other.end.y);
        a_min_x <= b_max_x + tolerance
            && b_min_x <= a_max_x + tolerance
            && a_min_y <= b_max_y + tolerance
            && b_min_y <= a_max_y + tolerance
    }
}

/// An undirected network edge with the index of the input item it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeData {
    pub nodes: (usize, usize),
    pub owner: usize,
}

/// Planar graph of merged nodes and split, de-duplicated edges.
#[derive(Debug, Clone)]
pub struct PlanarNetwork {
    tolerance: f64,
    positions: Vec<Point2<f64>>,
    edges: SlotMap<EdgeKey, EdgeData>,
    /// node -> (neighbor, edge), sorted by angle ascending
    adjacency: Vec<Vec<(usize, EdgeKey)>>,
}

enum Intersection {
    None,
    /// Parameters on the first and second segment
    Point(f64, f64),
    Collinear,
}

impl PlanarNetwork {
    /// Builds a network with the default tolerance.
    ///
    /// `segment_of` maps each item to its segment; items mapping to `None` are
    /// skipped. Edges remember the index of the item they came from.
    pub fn from_segments<T, F>(items: &[T], segment_of: F) -> Result<Self>
    where
        F: Fn(&T) -> Option<Segment2>,
    {
        Self::from_segments_with_tolerance(items, segment_of, DEFAULT_TOLERANCE)
    }

    pub fn from_segments_with_tolerance<T, F>(
        items: &[T],
        segment_of: F,
        tolerance: f64,
    ) -> Result<Self>
    where
        F: Fn(&T) -> Option<Segment2>,
    {
        let mut segments: Vec<(Segment2, usize)> = Vec::with_capacity(items.len());
        for (owner, item) in items.iter().enumerate() {
            let Some(segment) = segment_of(item) else {
                continue;
            };
            if !segment.is_finite() {
                return Err(Error::NonFiniteCoordinate(owner));
            }
            if segment.length() <= tolerance {
                continue;
            }
            segments.push((segment, owner));
        }

        let splits = split_parameters(&segments, tolerance);

        let mut network = Self {
            tolerance,
            positions: Vec::new(),
            edges: SlotMap::with_key(),
            adjacency: Vec::new(),
        };
        let mut index = SpatialIndex::new(tolerance);
        let mut by_nodes: FxHashMap<(usize, usize), EdgeKey> = FxHashMap::default();

        for ((segment, owner), params) in segments.iter().zip(&splits) {
            let mut prev: Option<usize> = None;
            for &t in params {
                let node = find_or_add_node(
                    &mut network.positions,
                    &mut index,
                    segment.point_at(t),
                    tolerance,
                );
                if let Some(from) = prev.filter(|&from| from != node) {
                    let pair = (from.min(node), from.max(node));
                    by_nodes.entry(pair).or_insert_with(|| {
                        network.edges.insert(EdgeData {
                            nodes: (from, node),
                            owner: *owner,
                        })
                    });
                }
                prev = Some(node);
            }
        }

        network.rebuild_adjacency();
        let pruned = network.prune_dangling();
        debug!(
            segments = segments.len(),
            nodes = network.positions.len(),
            edges = network.edges.len(),
            pruned,
            "Built planar network"
        );
        Ok(network)
    }

    /// Iteratively removes edges with a degree-1 endpoint. Returns how many went.
    pub fn prune_dangling(&mut self) -> usize {
        let mut stack: Vec<usize> = (0..self.adjacency.len())
            .filter(|&n| self.adjacency[n].len() == 1)
            .collect();
        let mut removed = 0;

        while let Some(node) = stack.pop() {
            if self.adjacency[node].len() != 1 {
                continue;
            }
            let (other, key) = self.adjacency[node][0];
            self.edges.remove(key);
            self.adjacency[node].clear();
            self.adjacency[other].retain(|&(_, k)| k != key);
            removed += 1;
            if self.adjacency[other].len() == 1 {
                stack.push(other);
            }
        }

        removed
    }

    fn rebuild_adjacency(&mut self) {
        let mut adjacency: Vec<Vec<(usize, EdgeKey)>> = vec![Vec::new(); self.positions.len()];
        for (key, edge) in &self.edges {
            let (a, b) = edge.nodes;
            adjacency[a].push((b, key));
            adjacency[b].push((a, key));
        }
        for (node, neighbors) in adjacency.iter_mut().enumerate() {
            let origin = self.positions[node];
            neighbors.sort_by(|x, y| {
                angle(&origin, &self.positions[x.0]).total_cmp(&angle(&origin, &self.positions[y.0]))
            });
        }
        self.adjacency = adjacency;
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Number of nodes, including nodes left isolated by pruning.
    pub fn node_count(&self) -> usize {
        self.positions.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node_location(&self, node: usize) -> Option<Point2<f64>> {
        self.positions.get(node).copied()
    }

    pub fn node_locations(&self) -> &[Point2<f64>] {
        &self.positions
    }

    pub fn edges(&self) -> impl Iterator<Item = (EdgeKey, &EdgeData)> {
        self.edges.iter()
    }

    /// Neighbors of `node`, sorted by angle ascending.
    pub fn neighbors(&self, node: usize) -> Vec<usize> {
        self.adjacency
            .get(node)
            .map(|n| n.iter().map(|&(other, _)| other).collect())
            .unwrap_or_default()
    }

    pub fn degree(&self, node: usize) -> usize {
        self.adjacency.get(node).map_or(0, Vec::len)
    }

    pub(crate) fn sorted_neighbors(&self, node: usize) -> &[(usize, EdgeKey)] {
        self.adjacency.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Node positions of a region returned by the face walk.
    pub fn region_polygon(&self, nodes: &[usize]) -> Result<Vec<Point2<f64>>> {
        nodes
            .iter()
            .map(|&n| self.node_location(n).ok_or(Error::NodeNotFound(n)))
            .collect()
    }

    /// Signed shoelace area of a node cycle (positive = counter-clockwise).
    pub fn signed_area(&self, nodes: &[usize]) -> f64 {
        let n = nodes.len();
        if n < 3 {
            return 0.0;
        }
        let mut area = 0.0;
        for i in 0..n {
            let (Some(p), Some(q)) = (
                self.node_location(nodes[i]),
                self.node_location(nodes[(i + 1) % n]),
            ) else {
                return 0.0;
            };
            area += p.x * q.y - q.x * p.y;
        }
        area * 0.5
    }

    pub fn is_counter_clockwise(&self, nodes: &[usize]) -> bool {
        self.signed_area(nodes) > 0.0
    }
}

fn minmax(a: f64, b: f64) -> (f64, f64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn cross(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

fn angle(origin: &Point2<f64>, p: &Point2<f64>) -> f64 {
    (p.y - origin.y).atan2(p.x - origin.x)
}

/// Sorted split parameters (always including 0 and 1) for every segment
fn split_parameters(segments: &[(Segment2, usize)], tolerance: f64) -> Vec<Vec<f64>> {
    let mut params: Vec<Vec<f64>> = vec![vec![0.0, 1.0]; segments.len()];

    for i in 0..segments.len() {
        for j in (i + 1)..segments.len() {
            let (a, b) = (&segments[i].0, &segments[j].0);
            if !a.bounds_overlap(b, tolerance) {
                continue;
            }
            match intersect(a, b, tolerance) {
                Intersection::None => {}
                Intersection::Point(t, u) => {
                    params[i].push(t);
                    params[j].push(u);
                }
                Intersection::Collinear => {
                    params[i].extend(interior_parameters(a, &[b.start, b.end]));
                    params[j].extend(interior_parameters(b, &[a.start, a.end]));
                }
            }
        }
    }

    for p in &mut params {
        p.sort_by(|x, y| x.total_cmp(y));
        p.dedup_by(|x, y| (*x - *y).abs() < 1e-12);
    }
    params
}

fn intersect(a: &Segment2, b: &Segment2, tolerance: f64) -> Intersection {
    let r = a.direction();
    let s = b.direction();
    let (r_len, s_len) = (r.norm(), s.norm());
    let qp = b.start - a.start;
    let denom = cross(&r, &s);

    if denom.abs() <= PARALLEL_EPSILON * r_len * s_len {
        let offset = cross(&qp, &r).abs() / r_len;
        return if offset <= tolerance {
            Intersection::Collinear
        } else {
            Intersection::None
        };
    }

    let t = cross(&qp, &s) / denom;
    let u = cross(&qp, &r) / denom;
    let (t_tol, u_tol) = (tolerance / r_len, tolerance / s_len);
    if t < -t_tol || t > 1.0 + t_tol || u < -u_tol || u > 1.0 + u_tol {
        return Intersection::None;
    }
    Intersection::Point(t.clamp(0.0, 1.0), u.clamp(0.0, 1.0))
}

/// Parameters of `points` that project strictly inside `segment`
fn interior_parameters<'a>(
    segment: &'a Segment2,
    points: &'a [Point2<f64>],
) -> impl Iterator<Item = f64> + 'a {
    points
        .iter()
        .map(|p| segment.parameter_of(p))
        .filter(|t| *t > 0.0 && *t < 1.0)
}
