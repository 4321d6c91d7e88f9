//! C7 (entropy generator) and C8 (continuous health test).

use crate::error::JitterError;
use crate::jitter::measure_jitter;
use crate::platform::PlatformHooks;

/// C7: oversample [`measure_jitter`] to produce one fresh 64-bit pool word.
///
/// Primes `prev_time` with a throwaway measurement, then collects
/// `64 * osr` non-stuck measurements before returning. `pool` holds the
/// freshly generated word on return.
#[allow(clippy::too_many_arguments)]
pub(crate) fn gen_entropy<H: PlatformHooks>(
    hooks: &H,
    pool: &mut u64,
    prev_time: &mut u64,
    last_delta: &mut i64,
    last_delta2: &mut i64,
    mut mem: Option<&mut [u8]>,
    memlocation: &mut usize,
    memblocksize: usize,
    memblocks: usize,
    memaccessloops: usize,
    osr: u32,
) {
    // Priming pass: establishes prev_time. Its stuck/non-stuck verdict is
    // meaningless and intentionally discarded.
    measure_jitter(
        hooks,
        pool,
        prev_time,
        last_delta,
        last_delta2,
        mem.as_deref_mut(),
        memlocation,
        memblocksize,
        memblocks,
        memaccessloops,
    );

    let target = 64u64 * u64::from(osr);
    let mut k: u64 = 0;
    while k < target {
        let stuck = measure_jitter(
            hooks,
            pool,
            prev_time,
            last_delta,
            last_delta2,
            mem.as_deref_mut(),
            memlocation,
            memblocksize,
            memblocks,
            memaccessloops,
        );
        if stuck {
            continue;
        }
        k += 1;
    }
}

/// Tri-state FIPS continuous-test engagement (spec.md §9's Design Notes).
///
/// `Unknown` is the pre-probe state every collector starts in. The first
/// call to [`FipsState::check`] probes the platform and settles into either
/// `Disabled` (continuous testing never runs again for this collector) or
/// `Enabled` (continuous testing is engaged for the collector's lifetime).
/// `Enabled(None)` is the "not yet primed" sub-state that replaces the
/// `old_data == 0` sentinel used by the original C implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FipsState {
    Unknown,
    Disabled,
    Enabled(Option<u64>),
}

/// What the caller must do after a successful [`FipsState::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FipsOutcome {
    /// `current_data` is ready to hand to the caller as-is.
    Pass,
    /// This was the priming call: the caller must run C7 once more before
    /// handing anything out, matching the original's behavior of folding
    /// the priming generation into the very first read. The word passed to
    /// this call is discarded, not a valid reference — the caller must feed
    /// the regenerated word to [`FipsState::set_reference`] once it has it.
    PassNeedsRegen,
}

impl FipsState {
    /// C8: run the continuous health test against `current_data`, the pool
    /// word [`gen_entropy`] just produced.
    pub(crate) fn check<H: PlatformHooks>(
        &mut self,
        hooks: &H,
        current_data: u64,
    ) -> Result<FipsOutcome, JitterError> {
        if matches!(self, Self::Unknown) {
            *self = if hooks.fips_enabled() {
                Self::Enabled(None)
            } else {
                Self::Disabled
            };
        }

        let Self::Enabled(old) = self else {
            return Ok(FipsOutcome::Pass);
        };

        match old {
            // `current_data` here is the word generated *before* the
            // caller's extra priming regen — not what ends up in the
            // caller's hands, so it must not become the reference. The
            // caller records the real reference via `set_reference` once
            // the regenerated word is known.
            None => Ok(FipsOutcome::PassNeedsRegen),
            Some(prev) => {
                if current_data == *prev {
                    Err(JitterError::HealthTestFailure)
                } else {
                    *prev = current_data;
                    Ok(FipsOutcome::Pass)
                }
            }
        }
    }

    /// Record `data` — the word a [`FipsOutcome::PassNeedsRegen`] priming
    /// pass actually returned to the caller — as the continuous test's
    /// reference. A no-op if continuous testing isn't engaged.
    pub(crate) fn set_reference(&mut self, data: u64) {
        if let Self::Enabled(old) = self {
            *old = Some(data);
        }
    }
}
