//! C11: one-time platform self-test.
//!
//! Run once, before any [`crate::collector::Collector`] is allocated, to
//! reject a host whose timer cannot drive the noise sources at all. A
//! passing self-test says the timer is usable; it does not replace the
//! per-word continuous health test ([`crate::generator::FipsState`]) that
//! runs for the collector's whole lifetime.

use crate::error::JitterError;
use crate::jitter::stuck;
use crate::noise::lfsr_time;
use crate::platform::PlatformHooks;

const TEST_LOOP_COUNT: u32 = 300;
const CLEAR_CACHE: u32 = 100;
const TOTAL_LOOPS: u32 = TEST_LOOP_COUNT + CLEAR_CACHE;
const MAX_BACKWARDS: u32 = 3;
/// `JENT_STUCK_INIT_THRES(TESTLOOPCOUNT)`: a platform is rejected only once
/// stuck samples are the overwhelming majority, not merely half.
const STUCK_INIT_THRESHOLD: u32 = (TEST_LOOP_COUNT * 9) / 10;
const COARSE_MOD_THRESHOLD: u32 = (TEST_LOOP_COUNT * 9) / 10;

pub(crate) fn run<H: PlatformHooks>(hooks: &H) -> Result<(), JitterError> {
    let mut pool = 0u64;
    let mut last_delta = 0i64;
    let mut last_delta2 = 0i64;

    let mut time_backwards = 0u32;
    let mut count_stuck = 0u32;
    let mut count_mod = 0u32;
    let mut delta_sum: u64 = 0;
    let mut old_delta = 0i64;

    for i in 0..TOTAL_LOOPS {
        // Each pass samples t1, folds t1 itself (not a delta) into the LFSR
        // noise source, then samples t2 — mirroring the original's per-loop
        // structure so a timer that degrades mid-run is still caught, rather
        // than only being checked once before the loop starts.
        let t1 = hooks.read_nstime();
        lfsr_time(hooks, &mut pool, t1, 0);
        let t2 = hooks.read_nstime();

        if t1 == 0 || t2 == 0 {
            return Err(JitterError::NoTime);
        }

        let delta = t2.wrapping_sub(t1) as i64;
        if delta == 0 {
            return Err(JitterError::CoarseTime);
        }

        let is_stuck = stuck(&mut last_delta, &mut last_delta2, delta);

        // The first CLEAR_CACHE passes are a cache-warming run: same work,
        // excluded from the statistics below.
        if i < CLEAR_CACHE {
            continue;
        }

        if is_stuck {
            count_stuck += 1;
        }
        if t2 <= t1 {
            time_backwards += 1;
        }
        if (delta as u32) % 100 == 0 {
            count_mod += 1;
        }
        delta_sum = delta_sum.saturating_add(delta.wrapping_sub(old_delta).unsigned_abs());
        old_delta = delta;
    }

    if time_backwards > MAX_BACKWARDS {
        return Err(JitterError::NoMonotonic);
    }
    if delta_sum <= 1 {
        return Err(JitterError::MinVariation);
    }
    if count_mod > COARSE_MOD_THRESHOLD {
        return Err(JitterError::CoarseTime);
    }
    if count_stuck > STUCK_INIT_THRESHOLD {
        return Err(JitterError::Stuck);
    }

    Ok(())
}
