//! Randomness source injected into cell programs.
//!
//! Programs never reach for a global generator; the scheduler hands each
//! invocation a [`RandomSource`]. The default streams are ChaCha12 seeded
//! from the colony seed, the cell id and the tick, so a cell's draws do not
//! depend on how many other cells drew before it.
//!
//! Each component of `(domain, seed, cell, tick)` is mixed on its own and
//! written to its own lane of the 256-bit ChaCha key, so two distinct tuples
//! never share a stream.

use crate::types::{CellId, Tick};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;

/// Domain tag of the streams handed to cell programs.
const CELL_DOMAIN: u64 = 0x6365_6c6c;
/// Domain tag of the streams used when seeding and releasing buds.
const POLICY_DOMAIN: u64 = 0x706f_6c69;

/// A uniform generator over a bounded range.
pub trait RandomSource {
    /// A value drawn uniformly from `[low, high)`.
    ///
    /// An empty or inverted range yields `low`.
    fn uniform(&mut self, low: f64, high: f64) -> f64;

    /// A value drawn uniformly from `[0, 1)`.
    fn unit(&mut self) -> f64 {
        self.uniform(0.0, 1.0)
    }

    /// A value drawn uniformly from `[-amplitude, amplitude)`.
    fn symmetric(&mut self, amplitude: f64) -> f64 {
        let a = amplitude.abs();
        self.uniform(-a, a)
    }
}

impl<R: Rng> RandomSource for R {
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        if !(high > low) {
            return low;
        }
        self.random_range(low..high)
    }
}

/// Create a deterministic RNG from a seed.
pub fn create_rng(seed: u64) -> ChaCha12Rng {
    ChaCha12Rng::seed_from_u64(seed)
}

/// Derive the stream a cell draws from during one tick.
pub fn derive_cell_rng(seed: u64, cell: CellId, tick: Tick) -> ChaCha12Rng {
    derive_stream(CELL_DOMAIN, seed, cell, tick)
}

/// Derive the stream the bud policy draws from when `cell` buds or releases
/// during one tick. Never overlaps a [`derive_cell_rng`] stream.
pub fn derive_policy_rng(seed: u64, cell: CellId, tick: Tick) -> ChaCha12Rng {
    derive_stream(POLICY_DOMAIN, seed, cell, tick)
}

fn derive_stream(domain: u64, seed: u64, cell: CellId, tick: Tick) -> ChaCha12Rng {
    let mut key = [0u8; 32];
    for (lane, word) in key.chunks_exact_mut(8).zip([domain, seed, cell.0, tick]) {
        lane.copy_from_slice(&splitmix64(word).to_le_bytes());
    }
    ChaCha12Rng::from_seed(key)
}

/// SplitMix64 finalizer. A bijection on `u64`.
fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
