//! A non-physical true random number generator that harvests entropy from
//! CPU execution-time jitter: the small, unpredictable variations in how
//! long identical instruction sequences take to run, caused by cache
//! state, memory bus contention, interrupts, and our own operating
//! environment. No hardware RNG, no `/dev/random`, no external entropy
//! source — only the host's own timer and a deliberately cache-unfriendly
//! workload.
//!
//! [`init`] runs a one-time self-test of the host timer; [`Collector`] is
//! the long-lived object that turns timer jitter into output bytes.

mod collector;
mod error;
mod generator;
mod jitter;
mod noise;
mod platform;
mod selftest;

pub use collector::{Collector, DISABLE_MEMORY_ACCESS, DISABLE_STIR, DISABLE_UNBIAS};
pub use error::JitterError;
pub use platform::{PlatformHooks, SystemHooks};

const VERSION_MAJOR: u32 = 1;
const VERSION_MINOR: u32 = 0;
const VERSION_PATCH: u32 = 0;

/// Encodes this crate's version the way the library this was ported from
/// encodes `jent_version()`: `major * 1_000_000 + minor * 10_000 + patch * 100`.
#[must_use]
pub const fn version() -> u32 {
    VERSION_MAJOR * 1_000_000 + VERSION_MINOR * 10_000 + VERSION_PATCH * 100
}

/// C11: run the one-time platform self-test against the system timer.
///
/// Call this once, before allocating any [`Collector`] — an allocated
/// collector does not repeat it. A host that fails this should not be
/// trusted to drive the jitter noise sources at all.
///
/// # Errors
///
/// Returns [`JitterError::NoTime`], [`JitterError::CoarseTime`],
/// [`JitterError::NoMonotonic`], [`JitterError::MinVariation`] or
/// [`JitterError::Stuck`] depending on which timer property the host
/// fails.
pub fn init() -> Result<(), JitterError> {
    init_with_hooks(&SystemHooks)
}

/// As [`init`], but against an explicit [`PlatformHooks`] implementation.
/// Exists so callers (and this crate's own integration tests) can probe the
/// self-test's edge cases without depending on real timer misbehavior.
///
/// # Errors
///
/// See [`init`].
pub fn init_with_hooks<H: PlatformHooks>(hooks: &H) -> Result<(), JitterError> {
    selftest::run(hooks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_encodes_semver() {
        assert_eq!(version(), 1_000_000);
    }

    #[test]
    fn init_passes_on_this_host() {
        assert!(init().is_ok());
    }
}
