//! C5 (jitter measurement) and C6 (stuck detector).

use crate::noise::{lfsr_time, memaccess};
use crate::platform::PlatformHooks;

/// C6: flag a sample whose 1st, 2nd, or 3rd time-delta derivative is zero.
///
/// `last_delta`/`last_delta2` are updated in place regardless of the
/// verdict, so the next call sees this sample's derivatives.
pub(crate) fn stuck(last_delta: &mut i64, last_delta2: &mut i64, current_delta: i64) -> bool {
    let delta2 = last_delta.wrapping_sub(current_delta);
    let delta3 = delta2.wrapping_sub(*last_delta2);

    *last_delta = current_delta;
    *last_delta2 = delta2;

    current_delta == 0 || delta2 == 0 || delta3 == 0
}

/// C5: sample the timer, fold the delta into the pool via the LFSR noise
/// source, and tag the sample via the stuck detector. The memory-access
/// noise source runs first, purely to perturb the cache before the timer is
/// read.
///
/// `prev_time` must be primed by a throwaway call before its result is
/// trusted (the first delta is meaningless).
#[allow(clippy::too_many_arguments)]
pub(crate) fn measure_jitter<H: PlatformHooks>(
    hooks: &H,
    pool: &mut u64,
    prev_time: &mut u64,
    last_delta: &mut i64,
    last_delta2: &mut i64,
    mem: Option<&mut [u8]>,
    memlocation: &mut usize,
    memblocksize: usize,
    memblocks: usize,
    memaccessloops: usize,
) -> bool {
    let _ = memaccess(
        hooks,
        Some(*pool),
        mem,
        memlocation,
        memblocksize,
        memblocks,
        memaccessloops,
        0,
    );

    let time = hooks.read_nstime();
    let current_delta = time.wrapping_sub(*prev_time);
    *prev_time = time;

    lfsr_time(hooks, pool, current_delta, 0);

    stuck(last_delta, last_delta2, current_delta as i64)
}
