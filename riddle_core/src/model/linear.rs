//! The linear spline model: straight segments joining eCDF anchors
//! sampled from the training keys.

use super::CdfModel;
use crate::search::{HybridSeek, SeekFirst};
use crate::{Key, Result};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::{iter, mem};

/// A sampled `(key, ecdf)` pair; the right endpoint of a spline segment.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Anchor<K> {
    pub key: K,
    pub ecdf: f64,
}

/// Allows anchors to be searched by key
impl<K> Borrow<K> for Anchor<K> {
    fn borrow(&self) -> &K {
        &self.key
    }
}

/// One affine piece of the spline, valid up to its right anchor's key.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub slope: f64,
    pub bias: f64,
}

impl Segment {
    /// Fits the segment between two anchors.
    ///
    /// The key run is taken in the key's native arithmetic and only the
    /// single delta is widened to `f64`; casting both endpoints first would
    /// shed the low bits of keys past 2^53. A degenerate span (no key
    /// delta) falls back to a flat segment at the right anchor, so stored
    /// slopes are always finite.
    fn between<K: Key>(left: &Anchor<K>, right: &Anchor<K>) -> Self {
        if right.key <= left.key {
            return Self {
                slope: 0.0,
                bias: right.ecdf,
            };
        }

        let run = as_f64(right.key.saturating_sub(left.key));
        let slope = (right.ecdf - left.ecdf) / run;
        Self {
            slope,
            bias: right.ecdf - slope * as_f64(right.key),
        }
    }

    fn evaluate(&self, key: f64) -> f64 {
        self.slope * key + self.bias
    }
}

/// Piecewise-linear eCDF approximation over a sorted key set.
///
/// Every `stride`-th key becomes an anchor (the final key always does, at
/// full mass), consecutive anchors are joined by straight segments, and a
/// leading segment runs from the origin to the first anchor. Prediction
/// locates the first anchor at or past the query key and evaluates that
/// anchor's segment, clamped to `[0, 1]`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LinearSplineModel<K> {
    anchors: Vec<Anchor<K>>,
    segments: Vec<Segment>,
    min_key: K,
    max_key: K,
}

impl<K: Key> LinearSplineModel<K> {
    /// The sampled `(key, ecdf)` anchors, in key order.
    pub fn anchors(&self) -> &[Anchor<K>] {
        &self.anchors
    }

    /// The spline segments; segment `j` is evaluated for keys ending at
    /// anchor `j`.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

impl<K: Key> CdfModel<K> for LinearSplineModel<K> {
    fn train(keys: &[K], stride: usize) -> Result<Self> {
        if keys.is_empty() {
            return Err("cannot train a CDF model over an empty key set".into());
        }
        if stride == 0 || stride > keys.len() {
            return Err(format!(
                "sampling stride {} is outside 1..={} training keys",
                stride,
                keys.len()
            )
            .into());
        }
        debug_assert!(
            keys.windows(2).all(|pair| pair[0] <= pair[1]),
            "training keys must be sorted"
        );

        let n = keys.len();
        let samples = n.div_ceil(stride);

        let mut anchors = Vec::with_capacity(samples);
        for j in 0..samples {
            let index = (j + 1) * n / samples - 1;
            anchors.push(Anchor {
                key: keys[index],
                ecdf: (index + 1) as f64 / n as f64,
            });
        }

        // The last anchor is always the final key at full mass.
        anchors[samples - 1] = Anchor {
            key: keys[n - 1],
            ecdf: 1.0,
        };

        let origin = Anchor {
            key: K::zero(),
            ecdf: 0.0,
        };
        let segments = iter::once(origin)
            .chain(anchors.iter().copied())
            .tuple_windows()
            .map(|(left, right)| Segment::between(&left, &right))
            .collect();

        Ok(Self {
            anchors,
            segments,
            min_key: keys[0],
            max_key: keys[n - 1],
        })
    }

    fn predict(&self, key: &K) -> f64 {
        if *key <= self.min_key {
            return 0.0;
        }
        if *key >= self.max_key {
            return 1.0;
        }

        // First anchor at or past the key; its segment covers the key. The
        // last segment absorbs anything beyond the anchors.
        let index = HybridSeek::seek_first(&self.anchors, key)
            .unwrap_or(self.segments.len() - 1);

        self.segments[index].evaluate(as_f64(*key)).clamp(0.0, 1.0)
    }

    fn size_bytes(&self) -> usize {
        self.anchors.len() * mem::size_of::<Anchor<K>>()
            + self.segments.len() * mem::size_of::<Segment>()
            + 2 * mem::size_of::<K>()
    }
}

/// To support generic keys in the affine formulas we pass through `num`
fn as_f64<K: Key>(key: K) -> f64 {
    num::cast::<K, f64>(key).unwrap()
}

#[cfg(test)]
mod linear_spline_tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn anchor(key: u64, ecdf: f64) -> Anchor<u64> {
        Anchor { key, ecdf }
    }

    #[test]
    fn fits_segments_between_anchors() {
        let segment = Segment::between(&anchor(1, 2.0), &anchor(3, 4.0));
        assert!(close(segment.slope, 1.0) && close(segment.bias, 1.0));

        let segment = Segment::between(&anchor(2, 3.0), &anchor(4, 1.0));
        assert!(close(segment.slope, -1.0) && close(segment.bias, 5.0));

        // Degenerate span: flat at the right anchor.
        let segment = Segment::between(&anchor(5, 0.2), &anchor(5, 0.4));
        assert!(close(segment.slope, 0.0) && close(segment.bias, 0.4));
    }

    #[test]
    fn keeps_precision_for_giant_keys() {
        // Both keys collapse to the same f64, so a slope computed from
        // widened endpoints would divide by zero; the native key run keeps
        // the spacing exact.
        let left = anchor(1 << 62, 0.25);
        let right = anchor((1 << 62) + 4, 0.5);
        assert_eq!(as_f64(left.key), as_f64(right.key));

        let segment = Segment::between(&left, &right);
        assert!(segment.slope.is_finite());
        assert!(close(segment.slope, 0.0625));
    }

    #[test]
    fn reproduces_the_paper_spline() {
        let keys: [u64; 12] = [3, 5, 12, 13, 25, 35, 47, 57, 67, 72, 75, 80];
        let model = LinearSplineModel::train(&keys, 3).unwrap();

        let anchor_keys: Vec<u64> = model.anchors().iter().map(|a| a.key).collect();
        assert_eq!(anchor_keys, vec![12, 35, 67, 80]);

        assert!(close(model.predict(&12), 0.25));
        assert!(close(model.predict(&35), 0.5));
        assert!(close(model.predict(&67), 0.75));
        assert_eq!(model.predict(&80), 1.0);
        assert!(close(model.predict(&6), 0.125));
    }

    #[test]
    fn clamps_at_the_key_range_ends() {
        let keys: [u64; 2] = [0, 10];
        let model = LinearSplineModel::train(&keys, 2).unwrap();

        assert_eq!(model.predict(&0), 0.0);
        assert!(close(model.predict(&5), 0.5));
        assert_eq!(model.predict(&10), 1.0);
        assert_eq!(model.predict(&20), 1.0);
    }

    #[test]
    fn samples_one_anchor_per_stride() {
        let keys: Vec<u64> = (0..1000).map(|i| i * 7).collect();

        for stride in [1, 3, 10, 128, 1000] {
            let model = LinearSplineModel::train(&keys, stride).unwrap();
            assert_eq!(model.anchors().len(), keys.len().div_ceil(stride));
            assert_eq!(model.segments().len(), model.anchors().len());

            let last = model.anchors().last().unwrap();
            assert_eq!(last.key, 999 * 7);
            assert_eq!(last.ecdf, 1.0);
        }
    }

    #[test]
    fn prediction_is_monotone() {
        let mut rng = StdRng::seed_from_u64(17);
        let mut keys: Vec<u64> = (0..5000).map(|_| rng.gen_range(0..u64::MAX / 2)).collect();
        keys.sort_unstable();
        keys.dedup();

        let model = LinearSplineModel::train(&keys, 50).unwrap();

        let mut probes: Vec<u64> = (0..20_000).map(|_| rng.gen()).collect();
        probes.sort_unstable();

        let mut previous = 0.0;
        for probe in probes {
            let cdf = model.predict(&probe);
            assert!((0.0..=1.0).contains(&cdf));
            // Evaluating adjacent segments at a shared anchor can differ by
            // a rounding ulp; anything beyond that is a real inversion.
            assert!(cdf >= previous - 1e-9, "cdf regressed at key {}", probe);
            previous = cdf;
        }
    }

    #[test]
    fn respects_the_ecdf_contract() {
        let keys: Vec<u64> = (0..500).map(|i| i * i + 1).collect();
        let model = LinearSplineModel::train(&keys, 25).unwrap();

        assert!(model.predict(&keys[0]) <= 1.0 / keys.len() as f64);
        assert_eq!(model.predict(keys.last().unwrap()), 1.0);
    }

    #[test]
    fn rejects_bad_configurations() {
        let keys: [u64; 4] = [1, 2, 3, 4];

        assert!(LinearSplineModel::train(&keys, 0).is_err());
        assert!(LinearSplineModel::train(&keys, 5).is_err());
        assert!(LinearSplineModel::<u64>::train(&[], 1).is_err());
    }

    #[test]
    fn survives_a_single_key() {
        let keys: [u64; 1] = [42];
        let model = LinearSplineModel::train(&keys, 1).unwrap();

        assert_eq!(model.anchors().len(), 1);
        assert_eq!(model.predict(&0), 0.0);
        assert_eq!(model.predict(&100), 1.0);
    }
}
