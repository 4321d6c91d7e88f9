//! C9 (read) and C10 (collector lifecycle).

use crate::error::JitterError;
use crate::generator::{gen_entropy, FipsOutcome, FipsState};
use crate::platform::{PlatformHooks, SystemHooks};
use zeroize::Zeroize;

/// Skip the LFSR's jitter-derived loop-count shuffling on every fold and use
/// a fixed count instead. Reserved: always a no-op in this port, kept so
/// flag values stay wire-compatible with callers ported from the original
/// library. See DESIGN.md.
pub const DISABLE_STIR: u32 = 1 << 0;
/// Disable output debiasing. Reserved: always a no-op in this port, same
/// rationale as [`DISABLE_STIR`].
pub const DISABLE_UNBIAS: u32 = 1 << 1;
/// Skip allocating the memory-access noise source's scratch buffer.
pub const DISABLE_MEMORY_ACCESS: u32 = 1 << 2;

const DEFAULT_MEMORY_BLOCKSIZE: usize = 32;
const DEFAULT_MEMORY_BLOCKS: usize = 64;
const DEFAULT_MEMORY_ACCESSLOOPS: usize = 128;

/// A live CPU-jitter entropy collector.
///
/// Generic over [`PlatformHooks`] so tests can swap in deterministic timer
/// behavior; production code uses the default, [`SystemHooks`].
pub struct Collector<H: PlatformHooks = SystemHooks> {
    hooks: H,
    pool: u64,
    prev_time: u64,
    last_delta: i64,
    last_delta2: i64,
    mem: Option<Vec<u8>>,
    memlocation: usize,
    memblocksize: usize,
    memblocks: usize,
    memaccessloops: usize,
    osr: u32,
    #[allow(dead_code)]
    stir: bool,
    #[allow(dead_code)]
    disable_unbias: bool,
    fips: FipsState,
}

impl Collector<SystemHooks> {
    /// C10: allocate a collector backed by the system timer and FIPS query.
    ///
    /// `osr` is the oversampling rate (clamped to at least 1); `flags` is an
    /// OR of the `DISABLE_*` constants in this module.
    ///
    /// # Errors
    ///
    /// Returns [`JitterError::AllocationFailure`] if the memory-access
    /// noise source's scratch buffer could not be allocated.
    pub fn new(osr: u32, flags: u32) -> Result<Self, JitterError> {
        Self::with_hooks(SystemHooks, osr, flags)
    }
}

impl<H: PlatformHooks> Collector<H> {
    /// As [`Collector::new`], but with an explicit [`PlatformHooks`]
    /// implementation — used by tests that need a deterministic timer.
    ///
    /// # Errors
    ///
    /// See [`Collector::new`].
    pub fn with_hooks(hooks: H, osr: u32, flags: u32) -> Result<Self, JitterError> {
        let osr = osr.max(1);
        let mem = if flags & DISABLE_MEMORY_ACCESS == 0 {
            let size = DEFAULT_MEMORY_BLOCKSIZE * DEFAULT_MEMORY_BLOCKS;
            let mut buf = Vec::new();
            buf.try_reserve_exact(size)
                .map_err(|_| JitterError::AllocationFailure)?;
            buf.resize(size, 0);
            Some(buf)
        } else {
            None
        };

        let mut collector = Self {
            hooks,
            pool: 0,
            prev_time: 0,
            last_delta: 0,
            last_delta2: 0,
            mem,
            memlocation: 0,
            memblocksize: DEFAULT_MEMORY_BLOCKSIZE,
            memblocks: DEFAULT_MEMORY_BLOCKS,
            memaccessloops: DEFAULT_MEMORY_ACCESSLOOPS,
            osr,
            stir: flags & DISABLE_STIR == 0,
            disable_unbias: flags & DISABLE_UNBIAS != 0,
            fips: FipsState::Unknown,
        };

        // Prime the pool once at allocation time so the first read() is not
        // drawn from all-zero state.
        collector.regenerate();

        Ok(collector)
    }

    /// C9: fill `buf` with fresh entropy, one oversampled word at a time.
    ///
    /// # Errors
    ///
    /// Returns [`JitterError::HealthTestFailure`] if the continuous health
    /// test rejects a generated word.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<(), JitterError> {
        if buf.is_empty() {
            return Ok(());
        }

        for chunk in buf.chunks_mut(8) {
            let word = self.next_word()?;
            let bytes = word.to_ne_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }

        // Post-read scrub: one more discarded generation pass so a
        // post-mortem memory dump doesn't reveal the word just handed out.
        self.regenerate();
        Ok(())
    }

    fn regenerate(&mut self) {
        gen_entropy(
            &self.hooks,
            &mut self.pool,
            &mut self.prev_time,
            &mut self.last_delta,
            &mut self.last_delta2,
            self.mem.as_deref_mut(),
            &mut self.memlocation,
            self.memblocksize,
            self.memblocks,
            self.memaccessloops,
            self.osr,
        );
    }

    fn next_word(&mut self) -> Result<u64, JitterError> {
        self.regenerate();

        match self.fips.check(&self.hooks, self.pool)? {
            FipsOutcome::Pass => Ok(self.pool),
            FipsOutcome::PassNeedsRegen => {
                self.regenerate();
                // The word just checked was discarded; this regenerated
                // word is the one actually handed back, so it — not the
                // discarded word — becomes the continuous test's reference.
                self.fips.set_reference(self.pool);
                Ok(self.pool)
            }
        }
    }
}

impl<H: PlatformHooks> Drop for Collector<H> {
    fn drop(&mut self) {
        self.pool.zeroize();
        self.prev_time.zeroize();
        self.last_delta.zeroize();
        self.last_delta2.zeroize();
        if let Some(mem) = self.mem.as_mut() {
            mem.zeroize();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_collector_primes_a_nonzero_pool() {
        let collector = Collector::new(1, 0).unwrap();
        assert_ne!(collector.pool, 0);
    }

    #[test]
    fn read_fills_the_whole_buffer() {
        let mut collector = Collector::new(1, 0).unwrap();
        let mut buf = [0u8; 37];
        collector.read(&mut buf).unwrap();
        assert!(buf.iter().any(|&b| b != 0));
    }

    #[test]
    fn successive_reads_differ() {
        let mut collector = Collector::new(1, 0).unwrap();
        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        collector.read(&mut a).unwrap();
        collector.read(&mut b).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn disabling_memory_access_still_yields_output() {
        let mut collector = Collector::new(1, DISABLE_MEMORY_ACCESS).unwrap();
        assert!(collector.mem.is_none());
        let mut buf = [0u8; 16];
        collector.read(&mut buf).unwrap();
        assert!(buf.iter().any(|&b| b != 0));
    }

    #[test]
    fn read_scrubs_the_pool_after_copying_the_output_word() {
        let mut collector = Collector::new(1, 0).unwrap();
        let mut buf = [0u8; 8];
        collector.read(&mut buf).unwrap();
        // The pool is regenerated once more after the copy, so a snapshot
        // taken right after read() should not equal the bytes just handed
        // out to the caller.
        assert_ne!(collector.pool.to_ne_bytes(), buf);
    }

    #[test]
    fn zero_length_read_does_not_touch_the_pool() {
        let mut collector = Collector::new(1, 0).unwrap();
        let before = collector.pool;
        let mut buf: [u8; 0] = [];
        collector.read(&mut buf).unwrap();
        assert_eq!(collector.pool, before);
    }

    #[test]
    fn zero_oversampling_rate_is_clamped_to_one() {
        let collector = Collector::new(0, 0).unwrap();
        assert_eq!(collector.osr, 1);
    }
}
