//! A learned approximate range filter over sorted integer keys.
//!
//! Given a static sorted key set, [`RangeFilter`] answers "does any key lie
//! in the closed interval `[lo, hi]`?" with zero false negatives and a
//! tunable false-positive rate, spending roughly a configured number of
//! bits per key. A piecewise-linear CDF model spreads the keys across a
//! virtual bit array of `N · P` slots, and the set slots are stored as
//! Golomb-coded blocks; a query probes only the blocks its predicted
//! position interval touches.
//!
//! The structure is built once and immutable afterwards, so queries are
//! plain reads and safe to share across threads.

use num::PrimInt;
use std::fmt::Debug;
use trait_set::trait_set;

mod filter;
pub mod gcs;
pub mod model;
pub mod search;

pub use filter::RangeFilter;
pub use model::{CdfModel, LinearSplineModel};

/// Generic error type (to avoid a dependency on anyhow)
pub type Result<T> = core::result::Result<T, Box<dyn std::error::Error>>;

// Until `trait_alias` is stabilized, we have to use a macro
trait_set! {
    /// General key type: thread-safe primitive integer
    pub trait Key = Send + Sync + Debug + Copy + PrimInt + 'static;
}
