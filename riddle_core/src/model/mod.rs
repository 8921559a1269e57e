//! Models that estimate the cumulative distribution of a key set.
//!
//! The filter only needs a narrow capability from its model: train once
//! over the full sorted key set, then map any key to an estimated CDF
//! value in `[0, 1]`. Accuracy within a few percent is enough, since the
//! block partition downstream absorbs residual error.

use crate::{Key, Result};

mod linear;

pub use linear::{Anchor, LinearSplineModel, Segment};

/// A learned estimate of the key distribution.
///
/// `predict` must be monotone non-decreasing over the key domain, with
/// `predict(min_key) <= 1/N` and `predict(max_key) = 1.0` for key sets of
/// at least two keys. Models are built once and immutable afterwards.
pub trait CdfModel<K: Key>: Sized {
    /// Trains a model over `keys`, sampling every `stride`-th key.
    ///
    /// `keys` must be sorted. Training fails if `keys` is empty or if
    /// `stride` is zero or exceeds the number of keys.
    fn train(keys: &[K], stride: usize) -> Result<Self>;

    /// Estimated CDF of `key`, in `[0, 1]`.
    fn predict(&self, key: &K) -> f64;

    /// Bytes of storage owned by the model.
    fn size_bytes(&self) -> usize;
}
