//! `rand_core` integration for [`jitterentropy_core`], a non-physical true
//! random number generator with no hardware or kernel entropy source: it
//! draws entirely on CPU execution-time jitter.

use jitterentropy_core::Collector;
use rand_core::TryRngCore;
use std::sync::OnceLock;

pub use jitterentropy_core::JitterError;

/// Oversampling rate [`RandJitterEntropy::new`] allocates its collector
/// with. Chosen to match the conservative default the library this crate
/// wraps ships with.
const DEFAULT_OSR: u32 = 3;

fn ensure_selftest() -> Result<(), JitterError> {
    static SELFTEST: OnceLock<Result<(), JitterError>> = OnceLock::new();
    *SELFTEST.get_or_init(jitterentropy_core::init)
}

/// A [`TryRngCore`] source backed by [`jitterentropy_core::Collector`].
pub struct RandJitterEntropy {
    collector: Collector,
}

impl RandJitterEntropy {
    /// Run the process-wide one-time self-test (if it hasn't run yet) and
    /// allocate a collector at the default oversampling rate.
    ///
    /// # Errors
    ///
    /// Returns [`JitterError::NoTime`], [`JitterError::CoarseTime`],
    /// [`JitterError::NoMonotonic`], [`JitterError::MinVariation`] or
    /// [`JitterError::Stuck`] if the host timer fails the self-test;
    /// [`JitterError::AllocationFailure`] if the collector's scratch buffer
    /// could not be allocated.
    pub fn new() -> Result<Self, JitterError> {
        Self::with_osr(DEFAULT_OSR, 0)
    }

    /// As [`RandJitterEntropy::new`], but with a caller-chosen oversampling
    /// rate and `jitterentropy_core::DISABLE_*` flags.
    ///
    /// # Errors
    ///
    /// See [`RandJitterEntropy::new`].
    pub fn with_osr(osr: u32, flags: u32) -> Result<Self, JitterError> {
        ensure_selftest()?;
        Ok(Self {
            collector: Collector::new(osr, flags)?,
        })
    }
}

impl TryRngCore for RandJitterEntropy {
    type Error = JitterError;

    /// Generates a random `u32`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying collector's continuous health
    /// test rejects the generated word; see
    /// [`JitterError::HealthTestFailure`].
    fn try_next_u32(&mut self) -> Result<u32, Self::Error> {
        let mut bytes = [0u8; 4];
        self.try_fill_bytes(&mut bytes)?;
        Ok(u32::from_ne_bytes(bytes))
    }

    /// Generates a random `u64`.
    ///
    /// # Errors
    ///
    /// See [`RandJitterEntropy::try_next_u32`].
    fn try_next_u64(&mut self) -> Result<u64, Self::Error> {
        let mut bytes = [0u8; 8];
        self.try_fill_bytes(&mut bytes)?;
        Ok(u64::from_ne_bytes(bytes))
    }

    /// Fills `dst` with random bytes.
    ///
    /// # Errors
    ///
    /// See [`RandJitterEntropy::try_next_u32`].
    fn try_fill_bytes(&mut self, dst: &mut [u8]) -> Result<(), Self::Error> {
        self.collector.read(dst)
    }
}

impl Default for RandJitterEntropy {
    fn default() -> Self {
        Self::new().expect("jitter entropy self-test failed on this host")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u32() {
        let mut rng = RandJitterEntropy::new().unwrap();
        for _ in 0..128 {
            assert!(rng.try_next_u32().is_ok());
        }
    }

    #[test]
    fn test_u64() {
        let mut rng = RandJitterEntropy::new().unwrap();
        for _ in 0..128 {
            assert!(rng.try_next_u64().is_ok());
        }
    }

    #[test]
    fn test_bytes() {
        let mut rng = RandJitterEntropy::new().unwrap();
        for buffer_size in 0..=256 {
            let mut buffer = vec![0u8; buffer_size];
            assert!(rng.try_fill_bytes(&mut buffer).is_ok());
        }
    }

    #[test]
    fn test_speed() {
        use std::time::Instant;
        let start = Instant::now();
        let mut num_bytes = 0usize;
        let mut rng = RandJitterEntropy::new().unwrap();

        loop {
            let mut b = [0u8; 32];
            rng.try_fill_bytes(&mut b).unwrap();

            let now = Instant::now();
            num_bytes += b.len();

            if (now - start).as_secs() > 2 {
                let datarate = f64::from(u32::try_from(num_bytes).unwrap())
                    / (now - start).as_secs_f64()
                    / 1024.0;
                println!("datarate: {datarate} KiB/s");
                break;
            }
        }
    }

    #[test]
    fn test_multi_instantiation() {
        for _ in 0..32 {
            let mut rng = RandJitterEntropy::new().unwrap();
            let u = rng.try_next_u32().unwrap();
            println!("Got {u}");
        }
    }

    #[test]
    fn test_multi_threading() {
        let mut threads = vec![];
        let mut rng = RandJitterEntropy::new().unwrap();
        let _ = rng.try_next_u64().unwrap();

        for _ in 0..6 {
            threads.push(std::thread::spawn(move || {
                let mut rng = RandJitterEntropy::new().unwrap();
                for _ in 0..32 {
                    let _ = rng.try_next_u64().unwrap();
                }
            }));
        }

        for t in threads {
            let _ = t.join();
        }
    }
}
