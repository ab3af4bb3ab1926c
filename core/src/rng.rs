//! Seeded random streams for data generation and sampling.
//!
//! RULE: Generators and samplers never touch a platform RNG.
//! Every draw comes from a StreamRng handed out by the RngBank of the
//! run, which owns the master seed from Settings.
//!
//! The bank derives one stream per StreamSlot:
//!   users        → country, level, status, registration dates
//!   identity     → names, emails, IPs, user agents, devices
//!   transactions → owner, time, amount, timing and outcome
//!   network      → blockchain network, hash, confirmations
//!   sampling     → the before/after distribution sample
//!
//! Streams are independent, so drawing more from one (say, a larger
//! sample) leaves the generated users and transactions untouched.

use rand::{seq::SliceRandom, Rng, RngCore, SeedableRng};
use rand_distr::{Distribution, Exp, Normal};
use rand_pcg::Pcg64Mcg;

/// SplitMix64 finalizer over (master seed, slot), so neighbouring seeds
/// and slots still land far apart.
fn derive_seed(master_seed: u64, slot: StreamSlot) -> u64 {
    let mut z = master_seed.wrapping_add((slot as u64 + 1).wrapping_mul(0x9e37_79b9_7f4a_7c15));
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// One seeded stream.
pub struct StreamRng {
    slot: StreamSlot,
    inner: Pcg64Mcg,
}

impl StreamRng {
    pub fn new(master_seed: u64, slot: StreamSlot) -> Self {
        Self {
            slot,
            inner: Pcg64Mcg::seed_from_u64(derive_seed(master_seed, slot)),
        }
    }

    pub fn slot(&self) -> StreamSlot {
        self.slot
    }

    /// Uniform in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        self.inner.gen::<f64>()
    }

    pub fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    /// Uniform in [0, n). An empty range (`n == 0`) yields 0.
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        if n == 0 {
            return 0;
        }
        self.inner.gen_range(0..n)
    }

    /// Uniform in [lo, hi]. An inverted range collapses to `lo`.
    pub fn int_inclusive(&mut self, lo: i64, hi: i64) -> i64 {
        if hi <= lo {
            return lo;
        }
        self.inner.gen_range(lo..=hi)
    }

    /// Uniform in [lo, hi).
    pub fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    /// True with probability `p`; values outside [0, 1] saturate.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Uniform element of `items`, `None` when empty.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        items.choose(&mut self.inner)
    }

    /// Index drawn from `weights` by cumulative roll.
    /// Falls back to the last index when the weights sum below 1.0.
    pub fn weighted_index(&mut self, weights: &[f64]) -> usize {
        let roll = self.next_f64();
        let mut cumulative = 0.0;
        for (i, w) in weights.iter().enumerate() {
            cumulative += w;
            if roll < cumulative {
                return i;
            }
        }
        weights.len().saturating_sub(1)
    }

    /// Gaussian draw. A non-finite or negative std collapses to the mean.
    pub fn normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        match Normal::new(mean, std_dev) {
            Ok(dist) => dist.sample(&mut self.inner),
            Err(_) => mean,
        }
    }

    /// Exponential draw with the given mean.
    pub fn exponential(&mut self, mean: f64) -> f64 {
        match Exp::new(1.0 / mean) {
            Ok(dist) => dist.sample(&mut self.inner),
            Err(_) => 0.0,
        }
    }
}

/// Hands out the streams of one run.
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn for_stream(&self, slot: StreamSlot) -> StreamRng {
        log::debug!("{} stream seeded from master seed {}", slot.name(), self.master_seed);
        StreamRng::new(self.master_seed, slot)
    }
}

/// Stream slots. The discriminant feeds the seed derivation, so existing
/// values stay fixed and new slots are appended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum StreamSlot {
    Users = 0,
    Identity = 1,
    Transactions = 2,
    Network = 3,
    Sampling = 4,
}

impl StreamSlot {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Identity => "identity",
            Self::Transactions => "transactions",
            Self::Network => "network",
            Self::Sampling => "sampling",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_slot_same_sequence() {
        let bank = RngBank::new(42);
        let mut a = bank.for_stream(StreamSlot::Users);
        let mut b = bank.for_stream(StreamSlot::Users);
        for _ in 0..100 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn slots_are_independent() {
        let bank = RngBank::new(42);
        let mut a = bank.for_stream(StreamSlot::Users);
        let mut b = bank.for_stream(StreamSlot::Transactions);
        assert_eq!(b.slot(), StreamSlot::Transactions);
        let differs = (0..10).any(|_| a.next_u64() != b.next_u64());
        assert!(differs);
    }

    #[test]
    fn int_inclusive_hits_both_bounds() {
        let mut rng = StreamRng::new(7, StreamSlot::Transactions);
        let draws: Vec<i64> = (0..2000).map(|_| rng.int_inclusive(18, 23)).collect();
        assert!(draws.iter().all(|h| (18..=23).contains(h)));
        assert!(draws.contains(&18));
        assert!(draws.contains(&23));
    }

    #[test]
    fn degenerate_ranges_do_not_panic() {
        let mut rng = StreamRng::new(7, StreamSlot::Network);
        assert_eq!(rng.int_inclusive(5, 5), 5);
        assert_eq!(rng.int_inclusive(9, 3), 9);
        assert_eq!(rng.next_u64_below(0), 0);
        assert_eq!(rng.next_u64_below(1), 0);
        let empty: [u8; 0] = [];
        assert!(rng.pick(&empty).is_none());
        assert_eq!(rng.pick(&[9]), Some(&9));
    }

    #[test]
    fn weighted_index_respects_weights() {
        let mut rng = StreamRng::new(11, StreamSlot::Users);
        let weights = [0.9, 0.1];
        let first = (0..10_000).filter(|_| rng.weighted_index(&weights) == 0).count();
        assert!((8_700..=9_300).contains(&first), "got {first}");
    }

    #[test]
    fn exponential_mean_is_close() {
        let mut rng = StreamRng::new(3, StreamSlot::Users);
        let n = 20_000;
        let mean = (0..n).map(|_| rng.exponential(180.0)).sum::<f64>() / n as f64;
        assert!((170.0..190.0).contains(&mean), "mean {mean}");
    }
}
