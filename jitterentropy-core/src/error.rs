use core::fmt;

/// Errors the core can report to its caller.
///
/// The first four variants are only ever returned from [`crate::init`]: they
/// describe a platform whose timer is unfit to drive the jitter noise
/// sources. The remaining variants come from [`crate::collector::Collector`]
/// operations at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JitterError {
    /// The timer returned zero; no usable clock is available.
    NoTime,
    /// The timer does not offer enough resolution for jitter measurements.
    CoarseTime,
    /// The timer went backwards too often during the self-test.
    NoMonotonic,
    /// The timer showed insufficient variation between samples.
    MinVariation,
    /// Too many stuck samples were observed during the self-test.
    Stuck,
    /// `read` was called with no collector. The safe `Collector::read` API
    /// takes `&mut self`, so ownership rules out a null handle reaching it;
    /// this variant is reserved for a future C-ABI front door over this
    /// core, the way the original library's `jent_read_entropy` reports it.
    NullCollector,
    /// The FIPS continuous health test rejected two identical pool outputs.
    HealthTestFailure,
    /// The collector's memory-access buffer could not be allocated.
    AllocationFailure,
}

impl fmt::Display for JitterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoTime => write!(f, "timer service not available"),
            Self::CoarseTime => write!(f, "timer too coarse for RNG"),
            Self::NoMonotonic => write!(f, "timer is not monotonically increasing"),
            Self::MinVariation => write!(f, "timer variations too small for RNG"),
            Self::Stuck => write!(f, "too many stuck results during self-test"),
            Self::NullCollector => write!(f, "entropy collector is null"),
            Self::HealthTestFailure => write!(f, "continuous health test failed"),
            Self::AllocationFailure => write!(f, "could not allocate entropy collector memory"),
        }
    }
}

impl std::error::Error for JitterError {}
