//! Fixed-size batching of user identifiers.
//!
//! Keeps every `= any($1)` list and every in-memory grouping bounded.
//! The sequence is lazy and can be restarted by calling [`batches`]
//! again; it cannot be resumed mid-stream, but [`Iterator::skip`] over
//! a fresh sequence reaches any batch offset.

use crate::error::{PipelineError, PipelineResult};

/// Split `items` into consecutive, non-overlapping batches of at most `size`.
///
/// Concatenating the batches reproduces `items` exactly. Only the last
/// batch may be shorter than `size`.
pub fn batches<T>(items: &[T], size: usize) -> PipelineResult<std::slice::Chunks<'_, T>> {
    if size == 0 {
        return Err(PipelineError::ZeroBatchSize);
    }
    Ok(items.chunks(size))
}

/// Number of batches [`batches`] yields for `len` items.
pub fn batch_count(len: usize, size: usize) -> usize {
    if size == 0 {
        0
    } else {
        len.div_ceil(size)
    }
}
