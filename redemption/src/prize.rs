//! Weighted prize selection.

use crate::constants::{PAYOUT_TABLE, PAYOUT_WEIGHT_TOTAL};
use rand::Rng;

/// Weighted-random draw over the authoritative payout table.
///
/// Pure: no side effects, no shared state. The draw rolls uniformly in
/// `[0, 100)`, accumulates weights in table order and returns the first
/// value whose cumulative weight exceeds the roll. Floating-point rounding
/// cannot leave a roll unmatched: the lowest-value prize is the fallback,
/// so the draw is total and never panics.
pub struct PrizeSelector;

impl PrizeSelector {
    /// Draw a prize with the thread-local rng.
    #[must_use]
    pub fn draw() -> u32 {
        Self::draw_with(&mut rand::thread_rng())
    }

    /// Draw a prize with a caller-supplied rng (deterministic in tests).
    pub fn draw_with<R: Rng + ?Sized>(rng: &mut R) -> u32 {
        let roll = rng.gen_range(0.0..f64::from(PAYOUT_WEIGHT_TOTAL));
        Self::prize_for_roll(roll)
    }

    /// Map a roll in `[0, 100)` onto the payout table.
    #[must_use]
    pub fn prize_for_roll(roll: f64) -> u32 {
        let mut cumulative = 0u32;
        for &(value, weight) in &PAYOUT_TABLE {
            cumulative += weight;
            if roll < f64::from(cumulative) {
                return value;
            }
        }
        // Unreached unless rounding pushed the roll past the last bucket.
        PAYOUT_TABLE[PAYOUT_TABLE.len() - 1].0
    }
}
