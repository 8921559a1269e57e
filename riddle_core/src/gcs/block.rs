//! A single Golomb-coded block.

use super::Layout;
use bit_buffer::BitBuffer;
use serde::{Deserialize, Serialize};

/// One encoded block: `n` sorted positions drawn from `[0, B · P)`, each
/// split as `q · P + r`.
///
/// Split layout: the `n` binary remainders (`w` bits each) are packed
/// first, then a single unary run encodes the quotients. For each position
/// in order, the run holds the zero-gap from the previous quotient
/// followed by a terminating one. The buffer is sized `(w + 1) · n + B`
/// bits: `n`
/// remainders, `n` terminators, and at most `B - 1` zeros (quotients
/// cannot exceed `B - 1`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GcsBlock {
    buffer: BitBuffer,
    keys: usize,
}

impl GcsBlock {
    /// Encodes sorted block-local `positions`.
    pub fn encode(positions: &[u64], layout: &Layout) -> Self {
        let width = layout.width();
        let mut buffer = BitBuffer::new((width + 1) * positions.len() + layout.block_keys());

        // Remainders first, packed end to end.
        let mut offset = 0;
        for &position in positions {
            buffer.write_bits(offset, position & (layout.scale() - 1), width);
            offset += width;
        }

        // Then the unary run. The gap zeros are already present in the
        // zero-initialized buffer; only the terminators are written.
        let mut zeros = 0;
        for &position in positions {
            let quotient = position >> width;
            debug_assert!(zeros <= quotient, "positions must be sorted");

            offset += (quotient - zeros) as usize;
            zeros = quotient;

            buffer.write_bits(offset, 1, 1);
            offset += 1;
        }

        Self {
            buffer,
            keys: positions.len(),
        }
    }

    /// Does any encoded position fall in the block-local range `[lo, hi]`?
    ///
    /// Walks the unary run with a running quotient while a second cursor
    /// tracks the matching remainder. The remainder is only read when the
    /// quotient's value range can intersect the query.
    pub fn probe(&self, lo: u64, hi: u64, layout: &Layout) -> bool {
        let width = layout.width();
        let scale = layout.scale();

        let mut offset_binary = 0;
        let mut offset_unary = self.keys * width;
        let mut quotient = 0;

        let mut emitted = 0;
        while emitted < self.keys {
            if self.buffer.read_bit(offset_unary) {
                // A one closes the current position's quotient.
                if (quotient + 1) * scale >= lo && hi >= quotient * scale {
                    let value = quotient * scale + self.buffer.read_bits(offset_binary, width);
                    if value >= lo && value <= hi {
                        return true;
                    }
                }
                offset_binary += width;
                emitted += 1;
            } else {
                quotient += 1;
                // Quotients only grow; past the upper bound nothing matches.
                if quotient * scale > hi {
                    return false;
                }
            }
            offset_unary += 1;
        }

        false
    }

    /// Number of positions encoded in the block.
    pub fn keys(&self) -> usize {
        self.keys
    }

    /// Bytes held by the block's buffer.
    pub fn size_bytes(&self) -> usize {
        self.buffer.size_bytes()
    }
}
