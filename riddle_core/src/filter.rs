//! The filter facade: trains the model, maps keys to virtual bit-array
//! positions, and encodes them as Golomb-coded blocks at build time; maps
//! query intervals to block probes afterwards.

use crate::gcs::{BlockArray, Layout};
use crate::model::{CdfModel, LinearSplineModel};
use crate::{Key, Result};
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::mem;

/// A learned approximate range filter over a static sorted key set.
///
/// `range_query` answers whether any key could lie in a closed interval:
/// `false` is definitive, `true` may be a false positive at roughly the
/// rate the bits-per-key budget targets. The filter is immutable once
/// built; queries are plain reads and safe to run concurrently.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RangeFilter<K: Key, M: CdfModel<K> = LinearSplineModel<K>> {
    model: M,
    blocks: BlockArray,
    num_keys: usize,
    /// Length `N · P` of the virtual bit array.
    virtual_bits: u64,
    _ph: PhantomData<K>,
}

impl<K: Key, M: CdfModel<K>> RangeFilter<K, M> {
    /// Builds a filter over sorted `keys`.
    ///
    /// `bits_per_key` must exceed 3; `block_size` is the nominal key count
    /// per block (at least 1); `stride` samples every `stride`-th key into
    /// the model and must be in `1..=keys.len()`. Any violation is a
    /// configuration error and the filter is not built.
    pub fn build(keys: &[K], bits_per_key: f64, block_size: usize, stride: usize) -> Result<Self> {
        if keys.is_empty() {
            return Err("cannot build a range filter over an empty key set".into());
        }
        debug_assert!(
            keys.windows(2).all(|pair| pair[0] <= pair[1]),
            "input keys must be sorted"
        );

        let model = M::train(keys, stride)?;
        let layout = Layout::new(bits_per_key, block_size)?;

        let num_keys = keys.len();
        let virtual_bits = num_keys as u64 * layout.scale();

        // Every key maps through the model into the virtual bit array.
        let mut positions: Vec<u64> = keys
            .iter()
            .map(|key| scaled_position(&model, virtual_bits, key))
            .collect();

        // The spline is monotone in exact arithmetic, but flooring near a
        // segment boundary can swap adjacent positions by one slot.
        positions.sort_unstable();

        let blocks = BlockArray::build(&positions, layout);

        Ok(Self {
            model,
            blocks,
            num_keys,
            virtual_bits,
            _ph: PhantomData,
        })
    }

    /// Could any key lie in `[lo, hi]`?
    ///
    /// `false` means the key set definitely contains nothing in the
    /// interval. `true` means some encoded position falls in the predicted
    /// position interval, which the caller treats as a possible hit.
    pub fn range_query(&self, lo: &K, hi: &K) -> bool {
        debug_assert!(lo <= hi);

        let pos_lo = scaled_position(&self.model, self.virtual_bits, lo);
        let pos_hi = scaled_position(&self.model, self.virtual_bits, hi).max(pos_lo);

        self.blocks.probe(pos_lo, pos_hi)
    }

    /// Number of keys the filter was built over.
    pub fn len(&self) -> usize {
        self.num_keys
    }

    pub fn is_empty(&self) -> bool {
        self.num_keys == 0
    }

    /// False-positive rate the bits-per-key budget targets.
    pub fn target_fpr(&self) -> f64 {
        self.blocks.layout().target_fpr()
    }

    /// The trained CDF model.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// The encoded block array.
    pub fn blocks(&self) -> &BlockArray {
        &self.blocks
    }

    /// Total bytes of internal storage: the model, the parameters, the
    /// per-block key counts, and every block buffer.
    pub fn size_bytes(&self) -> usize {
        self.model.size_bytes()
            + mem::size_of::<usize>()
            + mem::size_of::<u64>()
            + self.blocks.size_bytes()
    }
}

/// Deterministic key-to-slot mapping: `⌊predict(key) · N · P⌋`, clamped
/// into the virtual bit array. Build and query both go through here, which
/// is what rules out false negatives.
fn scaled_position<K: Key, M: CdfModel<K>>(model: &M, virtual_bits: u64, key: &K) -> u64 {
    let scaled = (model.predict(key) * virtual_bits as f64).floor() as u64;
    scaled.min(virtual_bits - 1)
}
