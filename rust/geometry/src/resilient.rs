// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Batch-then-item fallback for fallible reductions
//!
//! Numerically degenerate input makes boolean operations fail for whole batches even
//! when only one item is at fault. `resilient_reduce` first applies the operation to
//! the whole batch; on failure it folds the items in one at a time and skips the ones
//! that still fail, so the accumulator is never lost.

use std::fmt::Display;
use tracing::{debug, warn};

/// Reduce `items` into `seed` with `op`, falling back to per-item application.
///
/// `op` receives the accumulator and a slice of items (the whole batch on the first
/// attempt, then single-item slices). `label` names the operation in log output.
pub fn resilient_reduce<A, T, E, F>(seed: A, items: &[T], op: F, label: &str) -> A
where
    F: Fn(&A, &[T]) -> Result<A, E>,
    E: Display,
{
    if items.is_empty() {
        return seed;
    }

    match op(&seed, items) {
        Ok(reduced) => return reduced,
        Err(err) => {
            debug!(operation = label, error = %err, count = items.len(), "Batch failed, retrying item by item");
        }
    }

    let mut acc = seed;
    for (index, item) in items.iter().enumerate() {
        match op(&acc, std::slice::from_ref(item)) {
            Ok(next) => acc = next,
            Err(err) => {
                warn!(operation = label, index, error = %err, "Skipping item after failed operation");
            }
        }
    }
    acc
}
