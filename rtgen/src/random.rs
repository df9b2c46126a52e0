/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Seeded random source shared by every generation stage.
//!
//! One [`RandomSource`] is created per generation run and passed by `&mut` to
//! each stage.  Nothing in the crate touches a global RNG, so two runs with
//! the same seed and configuration produce the same task set.

use std::ops::RangeInclusive;

use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Attempts made by rejection sampling before the draw is clamped.
const MAX_REJECTIONS: usize = 64;

// ── Distribution ──────────────────────────────────────────────────────────────

/// Distribution used to draw an integer inside an inclusive range `[lo, hi]`.
///
/// Non-uniform distributions are shifted so that a draw of `0` maps to `lo`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Distribution {
    /// Every value in the range is equally likely.
    #[default]
    Uniform,

    /// Poisson with mean `lambda`, rejected until it falls in range.
    Poisson { lambda: f64 },

    /// Binomial with `hi - lo` trials and success probability `p`.  Always in
    /// range, no rejection needed.
    Binomial { p: f64 },

    /// Number of failures before the first success with probability `p`.
    Geometric { p: f64 },
}

impl Distribution {
    /// Returns `true` if the distribution parameters are usable.
    pub fn is_valid(&self) -> bool {
        match *self {
            Distribution::Uniform => true,
            Distribution::Poisson { lambda } => lambda.is_finite() && lambda > 0.0,
            Distribution::Binomial { p } => (0.0..=1.0).contains(&p),
            Distribution::Geometric { p } => p > 0.0 && p <= 1.0,
        }
    }
}

// ── RandomSource ──────────────────────────────────────────────────────────────

/// Explicit, seedable random source.
#[derive(Debug, Clone)]
pub struct RandomSource {
    rng: StdRng,
    seed: u64,
}

impl RandomSource {
    /// Create a source that replays the same sequence for the same `seed`.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// Create a source with a fresh seed.  The seed is kept so it can be
    /// logged and the run replayed.
    pub fn from_entropy() -> Self {
        Self::from_seed(rand::random())
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Fair coin.
    pub fn coin_flip(&mut self) -> bool {
        self.rng.random_bool(0.5)
    }

    /// `true` with probability `p`, clamped into `[0, 1]`.
    pub fn chance(&mut self, p: f64) -> bool {
        self.rng.random_bool(p.clamp(0.0, 1.0))
    }

    /// Count fair-coin heads before the first tail, stopping at `cap`.
    ///
    /// `P(k) = 2^-(k+1)` for `k < cap`; the remaining mass lands on `cap`.
    pub fn geometric_multiple(&mut self, cap: u64) -> u64 {
        let mut k = 0;
        while k < cap && self.coin_flip() {
            k += 1;
        }
        k
    }

    /// Uniform draw from an inclusive range.  `lo > hi` yields `lo`.
    pub fn uniform(&mut self, range: RangeInclusive<i64>) -> i64 {
        if range.start() >= range.end() {
            return *range.start();
        }
        self.rng.random_range(range)
    }

    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        items.choose(&mut self.rng)
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rng);
    }

    /// `amount` distinct elements of `pool`, in random order.
    pub fn sample_distinct<T: Clone>(&mut self, pool: &[T], amount: usize) -> Vec<T> {
        pool.choose_multiple(&mut self.rng, amount)
            .cloned()
            .collect()
    }

    /// Draw from `dist` inside `[lo, hi]`.
    pub fn sample(&mut self, dist: Distribution, lo: i64, hi: i64) -> i64 {
        if lo >= hi {
            return lo;
        }
        match dist {
            Distribution::Uniform => self.uniform(lo..=hi),
            Distribution::Binomial { p } => {
                let trials = hi - lo;
                let successes = (0..trials).filter(|_| self.rng.random_bool(p)).count();
                lo + successes as i64
            }
            Distribution::Poisson { lambda } => {
                let draw = self.rejection(lo, hi, |rng| poisson(rng, lambda));
                draw.clamp(lo, hi)
            }
            Distribution::Geometric { p } => {
                let draw = self.rejection(lo, hi, |rng| geometric(rng, p));
                draw.clamp(lo, hi)
            }
        }
    }

    fn rejection(&mut self, lo: i64, hi: i64, mut draw: impl FnMut(&mut StdRng) -> i64) -> i64 {
        let mut last = lo;
        for _ in 0..MAX_REJECTIONS {
            last = lo + draw(&mut self.rng);
            if last <= hi {
                return last;
            }
        }
        last
    }
}

/// Knuth's multiplication method.  Adequate for the small means used when
/// drawing execution times and subset sizes.
fn poisson(rng: &mut StdRng, lambda: f64) -> i64 {
    let limit = (-lambda).exp();
    let mut k = 0;
    let mut product: f64 = rng.random();
    while product > limit {
        k += 1;
        product *= rng.random::<f64>();
    }
    k
}

fn geometric(rng: &mut StdRng, p: f64) -> i64 {
    let mut failures = 0;
    while !rng.random_bool(p) {
        failures += 1;
    }
    failures
}

// ── Tests ─────────────────────────────────────────────────────────────────────
