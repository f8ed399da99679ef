// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for region operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during region processing
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid region: {0}")]
    InvalidRegion(String),

    #[error("Non-finite coordinate in {0}")]
    NonFinite(&'static str),

    #[error("Boolean operation resulted in empty geometry")]
    EmptyResult,

    #[error("Offset failed: {0}")]
    OffsetFailed(String),
}

impl Error {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidRegion(msg.into())
    }
}
