//! Simulated CPU-bound processing.

use std::hint::black_box;

/// Scale dividing `i64::MAX` into a number of loop repetitions.
const SCALE: u64 = 1_000_000_000_000_000;

/// Number of loop repetitions for a complexity multiplier. The default
/// multiplier of 100 yields roughly a million repetitions.
pub fn repetitions(multiplier: u64) -> u64 {
    if multiplier == 0 {
        return 0;
    }
    let divisor = (SCALE / multiplier).max(1);
    i64::MAX as u64 / divisor
}

/// Burn CPU proportionally to `multiplier`. Blocks the calling thread.
pub fn burn(multiplier: u64) {
    let reps = repetitions(multiplier);
    trace!("burning {} repetitions", reps);
    for i in 0..reps {
        black_box(i);
    }
}
