//! Golomb-coded block storage for the virtual bit array.
//!
//! The virtual bit array of `N · P` slots is never materialized. It is
//! split into fixed position ranges of `B · P` slots each, and every block
//! stores its occupied slots Golomb-coded with the power-of-two divisor
//! `P`. Blocks answer range containment locally; the facade walks the
//! block span a query touches.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::mem;

mod block;

pub use block::GcsBlock;

/// Coding parameters shared by every block of a filter, derived from the
/// bits-per-key budget.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    /// Golomb divisor `P`; always `2^width`.
    scale: u64,
    /// Remainder width `w` in bits.
    width: usize,
    /// Nominal keys per block `B`.
    block_keys: usize,
    /// False-positive rate the budget targets.
    target_fpr: f64,
}

impl Layout {
    /// Derives the coding parameters for a bits-per-key budget.
    ///
    /// Three of the budgeted bits pay for block metadata and the unary
    /// terminators, so the target false-positive rate is
    /// `0.5^(bits_per_key - 3)` and the remainder width is its negated
    /// log: exactly `bits_per_key - 3`, rounded up.
    pub fn new(bits_per_key: f64, block_keys: usize) -> Result<Self> {
        if bits_per_key <= 3.0 {
            return Err("a range filter requires more than 3 bits per key".into());
        }
        if block_keys == 0 {
            return Err("blocks must hold at least one key".into());
        }

        let width = (bits_per_key - 3.0).ceil() as usize;
        if width >= u64::BITS as usize {
            return Err("bits per key budget exceeds 64-bit coding parameters".into());
        }

        Ok(Self {
            scale: 1 << width,
            width,
            block_keys,
            target_fpr: 0.5f64.powf(bits_per_key - 3.0),
        })
    }

    /// Golomb divisor `P`.
    pub fn scale(&self) -> u64 {
        self.scale
    }

    /// Bits per encoded remainder.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Nominal keys per block.
    pub fn block_keys(&self) -> usize {
        self.block_keys
    }

    /// Positions covered by one block: `B · P`.
    pub fn block_span(&self) -> u64 {
        self.block_keys as u64 * self.scale
    }

    /// False-positive rate the bits-per-key budget targets.
    pub fn target_fpr(&self) -> f64 {
        self.target_fpr
    }
}

/// The block-partitioned encoding of the virtual bit array.
///
/// Owns every block, which in turn owns its bit buffer; there are no
/// back-references.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockArray {
    layout: Layout,
    blocks: Vec<GcsBlock>,
}

impl BlockArray {
    /// Partitions sorted `positions` into `⌈n / B⌉` blocks and encodes
    /// each one. Positions must lie in `[0, n · P)`.
    pub fn build(positions: &[u64], layout: Layout) -> Self {
        let total_blocks = positions.len().div_ceil(layout.block_keys());
        let span = layout.block_span();

        let mut blocks = Vec::with_capacity(total_blocks);
        let mut batch = Vec::new();
        let mut index = 0;

        for i in 0..total_blocks {
            let lower = i as u64 * span;
            let upper = lower + span;

            // Collect this block's positions in block-local coordinates.
            batch.clear();
            while index < positions.len() && positions[index] < upper {
                debug_assert!(positions[index] >= lower, "positions must be sorted");
                batch.push(positions[index] - lower);
                index += 1;
            }

            blocks.push(GcsBlock::encode(&batch, &layout));
        }
        debug_assert_eq!(index, positions.len(), "positions must fit the block range");

        Self { layout, blocks }
    }

    /// Does any encoded position fall in `[pos_lo, pos_hi]`?
    ///
    /// Probes every block the interval touches with block-local bounds;
    /// interior blocks are probed with their full range. Short-circuits on
    /// the first hit.
    pub fn probe(&self, pos_lo: u64, pos_hi: u64) -> bool {
        debug_assert!(pos_lo <= pos_hi);

        if self.blocks.is_empty() {
            return false;
        }

        let span = self.layout.block_span();
        let block_lo = ((pos_lo / span) as usize).min(self.blocks.len() - 1);
        let block_hi = ((pos_hi / span) as usize).min(self.blocks.len() - 1);

        for i in block_lo..=block_hi {
            let base = i as u64 * span;
            let lo = if i == block_lo { pos_lo - base } else { 0 };
            let hi = if i == block_hi { pos_hi - base } else { span - 1 };

            if self.blocks[i].probe(lo, hi, &self.layout) {
                return true;
            }
        }

        false
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Keys encoded per block, in block order.
    pub fn key_counts(&self) -> impl Iterator<Item = usize> + '_ {
        self.blocks.iter().map(|block| block.keys())
    }

    /// Bytes of storage owned by the array: the parameters, the per-block
    /// key counts, and every block buffer.
    pub fn size_bytes(&self) -> usize {
        mem::size_of::<Layout>()
            + self
                .blocks
                .iter()
                .map(|block| mem::size_of::<usize>() + block.size_bytes())
                .sum::<usize>()
    }
}
