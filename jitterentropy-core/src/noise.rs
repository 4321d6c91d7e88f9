//! C2 (loop-count shuffler), C3 (LFSR noise source) and C4 (memory-access
//! noise source).
//!
//! C3 is the part of this crate that must never be compiled with
//! optimizations turned all the way up: its execution time *is* the signal
//! being measured, not just a means of producing one. See
//! [`lfsr_time`] for the mitigations used here instead of a per-function
//! "no-optimize" pragma (which Rust has no stable equivalent of).

use crate::platform::PlatformHooks;
use std::hint::black_box;

const MAX_FOLD_LOOP_BIT: u32 = 4;
const MIN_FOLD_LOOP_BIT: u32 = 0;
const MAX_ACC_LOOP_BIT: u32 = 7;
const MIN_ACC_LOOP_BIT: u32 = 0;

/// C2: derive a jitter-dependent, bounded iteration count.
///
/// `data` mixes in the current pool state when a collector is available
/// (it is absent only for the self-test's scratch state, which has no pool
/// worth mixing in yet).
pub(crate) fn loop_shuffle<H: PlatformHooks>(
    hooks: &H,
    data: Option<u64>,
    bits: u32,
    min: u32,
) -> u64 {
    let mut time = hooks.read_nstime();
    if let Some(data) = data {
        time ^= data;
    }

    let mask = (1u64 << bits) - 1;
    let slices = (64 + bits - 1) / bits;
    let mut shuffle: u64 = 0;
    for _ in 0..slices {
        shuffle ^= time & mask;
        time >>= bits;
    }

    shuffle + (1u64 << min)
}

/// C3: fold `time` bit-by-bit into `pool` via a primitive Fibonacci LFSR.
///
/// Realizes `x^64 + x^61 + x^56 + x^31 + x^28 + x^23 + 1` (tap positions
/// expressed as polynomial exponents minus one, since bits are counted from
/// zero). Returns the number of outer (folding) loops actually performed.
///
/// `loop_cnt_override`, when nonzero, replaces the loop count the shuffler
/// would otherwise compute — used only by the self-test and by statistical
/// testing harnesses, never during normal operation.
#[inline(never)]
pub(crate) fn lfsr_time<H: PlatformHooks>(
    hooks: &H,
    pool: &mut u64,
    time: u64,
    loop_cnt_override: u64,
) -> u64 {
    let fold_loop_cnt = if loop_cnt_override != 0 {
        loop_cnt_override
    } else {
        loop_shuffle(hooks, Some(*pool), MAX_FOLD_LOOP_BIT, MIN_FOLD_LOOP_BIT)
    };

    let mut new_pool = *pool;
    for _ in 0..fold_loop_cnt {
        new_pool = black_box(*pool);
        for i in 1..=64u32 {
            let mut tmp = (time << (64 - i)) >> 63;

            tmp ^= (new_pool >> 63) & 1;
            tmp ^= (new_pool >> 60) & 1;
            tmp ^= (new_pool >> 55) & 1;
            tmp ^= (new_pool >> 30) & 1;
            tmp ^= (new_pool >> 27) & 1;
            tmp ^= (new_pool >> 22) & 1;

            new_pool <<= 1;
            new_pool ^= tmp;
            new_pool = black_box(new_pool);
        }
    }
    *pool = new_pool;

    fold_loop_cnt
}

/// C4: touch a large buffer with a stride chosen to miss L1, generating
/// cache-miss jitter. Returns 0 (and touches nothing) when `mem` is absent,
/// i.e. the memory-access source was disabled at allocation.
#[allow(clippy::too_many_arguments)]
pub(crate) fn memaccess<H: PlatformHooks>(
    hooks: &H,
    data: Option<u64>,
    mem: Option<&mut [u8]>,
    memlocation: &mut usize,
    memblocksize: usize,
    memblocks: usize,
    memaccessloops: usize,
    loop_cnt_override: u64,
) -> usize {
    let acc_loop_cnt = if loop_cnt_override != 0 {
        loop_cnt_override
    } else {
        loop_shuffle(hooks, data, MAX_ACC_LOOP_BIT, MIN_ACC_LOOP_BIT)
    };

    let Some(mem) = mem else {
        return 0;
    };

    let wrap = memblocksize * memblocks;
    let iterations = memaccessloops as u64 + acc_loop_cnt;
    let mut i = 0u64;
    while i < iterations {
        let loc = *memlocation;
        mem[loc] = mem[loc].wrapping_add(1);
        *memlocation = (*memlocation + memblocksize - 1) % wrap;
        i += 1;
    }

    i as usize
}
