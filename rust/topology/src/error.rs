// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for planar network operations.

/// Result type alias for planar network operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or walking a planar network.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// An input segment has a NaN or infinite coordinate.
    #[error("segment {0} has a non-finite coordinate")]
    NonFiniteCoordinate(usize),

    /// A face walk closed with fewer than 3 nodes or revisited a node.
    #[error("face walk produced a degenerate cycle")]
    DegenerateFace,

    /// A face walk did not close within the number of half-edges in the network.
    #[error("face walk exceeded {0} half-edges without closing")]
    WalkExceeded(usize),

    /// A node index outside the network was referenced.
    #[error("node {0} not found")]
    NodeNotFound(usize),
}
