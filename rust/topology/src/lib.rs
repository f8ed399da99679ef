// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # SpacePlan Topology
//!
//! Planar network over wall centerlines and closed-region extraction.
//!
//! Segments are merged, split at every intersection and stripped of dangling
//! edges; the resulting planar graph is walked face by face to recover the
//! enclosed rooms as node cycles. Edges are stored in a slot map with stable,
//! generational keys so pruning never invalidates the remaining edges.

pub mod error;
pub mod faces;
pub mod keys;
pub mod network;
pub mod spatial;

pub use error::{Error, Result};
pub use keys::{EdgeKey, HalfEdge};
pub use network::{EdgeData, PlanarNetwork, Segment2, DEFAULT_TOLERANCE};
pub use spatial::SpatialIndex;
