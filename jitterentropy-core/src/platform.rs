//! Platform hooks the core consumes: a monotonic nanosecond timer and a FIPS
//! mode query. Everything else the original C implementation treats as a
//! platform hook (`jent_zalloc`/`jent_zfree`) is handled by ordinary `Vec<u8>`
//! ownership in this port; see DESIGN.md for the reasoning.

use std::sync::OnceLock;
use std::time::Instant;

/// Host-supplied services the entropy collector needs.
///
/// A production host supplies [`SystemHooks`]; tests substitute a
/// deterministic implementation to drive the self-test's edge cases (a
/// coarse timer, a timer that runs backwards, a forced FIPS flag) without
/// depending on real wall-clock behavior.
pub trait PlatformHooks {
    /// Monotonic timer, in nanoseconds (or any unit of at least nanosecond
    /// resolution). Must never decrease except for de minimis jitter the
    /// self-test is built to tolerate.
    fn read_nstime(&self) -> u64;

    /// Whether the host enforces FIPS-mode continuous testing.
    fn fips_enabled(&self) -> bool;
}

/// Default [`PlatformHooks`] implementation backed by `std::time::Instant`
/// and the Linux `/proc/sys/crypto/fips_enabled` convention.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemHooks;

fn process_epoch() -> Instant {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    *EPOCH.get_or_init(Instant::now)
}

impl PlatformHooks for SystemHooks {
    fn read_nstime(&self) -> u64 {
        let elapsed = Instant::now().duration_since(process_epoch());
        u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX)
    }

    fn fips_enabled(&self) -> bool {
        std::fs::read_to_string("/proc/sys/crypto/fips_enabled")
            .map(|contents| contents.trim() == "1")
            .unwrap_or(false)
    }
}
