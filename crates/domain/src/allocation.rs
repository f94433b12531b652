//! Standalone allocation over a plain list of batches.
//!
//! Useful for callers that hold batches outside a [`crate::Product`]
//! aggregate, such as read-model rebuilds or one-off scripts. Unlike the
//! aggregate this helper signals exhaustion with an error rather than a
//! recorded event; there is no surrounding transaction to protect.

use common::BatchRef;

use crate::error::OutOfStockError;
use crate::product::{Batch, OrderLine};

/// Allocates `line` to the most preferable batch in `batches`.
///
/// Preference order matches [`crate::Product::allocate`]: warehouse stock
/// first, then earliest eta. Returns the reference of the chosen batch, or
/// [`OutOfStockError`] when no batch can satisfy the line.
pub fn allocate(line: &OrderLine, batches: &mut [Batch]) -> Result<BatchRef, OutOfStockError> {
    let mut preference: Vec<usize> = (0..batches.len()).collect();
    preference.sort_by_key(|&i| batches[i].eta());

    let chosen = preference
        .into_iter()
        .find(|&i| batches[i].can_allocate(line))
        .ok_or_else(|| OutOfStockError {
            sku: line.sku.clone(),
        })?;

    batches[chosen].allocate(line.clone());
    Ok(batches[chosen].reference().clone())
}
