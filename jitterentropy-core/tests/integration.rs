//! End-to-end tests exercising the public API as an external caller would:
//! self-test, collector lifecycle, and the timer edge cases the self-test
//! exists to catch.

use jitterentropy_core::{init, init_with_hooks, Collector, JitterError, PlatformHooks};

#[test]
fn happy_path_self_test_then_collector_reads() {
    init().expect("self-test should pass on a real host timer");

    let mut collector = Collector::new(3, 0).expect("collector allocation should succeed");
    let mut buf = [0u8; 64];
    collector.read(&mut buf).expect("read should succeed");

    assert!(buf.iter().any(|&b| b != 0), "read produced an all-zero buffer");
}

#[test]
fn large_reads_vary_across_oversampled_words() {
    let mut collector = Collector::new(3, 0).unwrap();

    let mut first = vec![0u8; 512];
    let mut second = vec![0u8; 512];
    collector.read(&mut first).unwrap();
    collector.read(&mut second).unwrap();

    assert_ne!(first, second, "two successive large reads were identical");

    let distinct_words = first
        .chunks(8)
        .collect::<std::collections::HashSet<_>>()
        .len();
    assert!(
        distinct_words > 1,
        "a 512-byte read produced only one distinct 8-byte word"
    );
}

#[test]
fn with_hooks_accepts_a_caller_supplied_platform() {
    #[derive(Clone, Copy)]
    struct WallClockFips;
    impl PlatformHooks for WallClockFips {
        fn read_nstime(&self) -> u64 {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
                .unwrap_or(1)
        }
        fn fips_enabled(&self) -> bool {
            true
        }
    }

    let mut collector = Collector::with_hooks(WallClockFips, 2, 0).unwrap();
    let mut a = [0u8; 32];
    let mut b = [0u8; 32];
    collector.read(&mut a).unwrap();
    collector.read(&mut b).unwrap();

    assert_ne!(a, b);
}

#[test]
fn zero_length_read_is_a_no_op_success() {
    let mut collector = Collector::new(1, 0).unwrap();
    let mut buf: [u8; 0] = [];
    assert!(collector.read(&mut buf).is_ok());
}

struct FrozenTime;
impl PlatformHooks for FrozenTime {
    fn read_nstime(&self) -> u64 {
        7
    }
    fn fips_enabled(&self) -> bool {
        false
    }
}

#[test]
fn self_test_rejects_a_timer_too_coarse_to_measure() {
    assert_eq!(
        init_with_hooks(&FrozenTime).unwrap_err(),
        JitterError::CoarseTime
    );
}

struct BackwardsTime {
    counter: std::cell::Cell<u64>,
}
impl PlatformHooks for BackwardsTime {
    fn read_nstime(&self) -> u64 {
        let n = self.counter.get();
        self.counter.set(n.saturating_sub(1));
        n
    }
    fn fips_enabled(&self) -> bool {
        false
    }
}

#[test]
fn self_test_rejects_a_timer_that_runs_backwards() {
    let hooks = BackwardsTime {
        counter: std::cell::Cell::new(10_000_000),
    };
    assert_eq!(init_with_hooks(&hooks).unwrap_err(), JitterError::NoMonotonic);
}

struct ZeroTime;
impl PlatformHooks for ZeroTime {
    fn read_nstime(&self) -> u64 {
        0
    }
    fn fips_enabled(&self) -> bool {
        false
    }
}

#[test]
fn self_test_rejects_a_dead_timer() {
    assert_eq!(init_with_hooks(&ZeroTime).unwrap_err(), JitterError::NoTime);
}

/// Records every value it has returned so it can retroactively make a
/// chosen self-test iteration's `t2` reading regress behind its own `t1`,
/// while every other iteration advances by a varying stride (so the stuck
/// detector doesn't flag a long run of identical deltas).
struct BackwardAtIterations {
    history: std::cell::RefCell<Vec<u64>>,
    target_iterations: Vec<u64>,
}
impl BackwardAtIterations {
    fn new(target_iterations: Vec<u64>) -> Self {
        Self {
            history: std::cell::RefCell::new(Vec::new()),
            target_iterations,
        }
    }
}
impl PlatformHooks for BackwardAtIterations {
    fn read_nstime(&self) -> u64 {
        let mut history = self.history.borrow_mut();
        let call = history.len() as u64;
        // Three reads per self-test iteration: t1, the LFSR's internal
        // loop-shuffle read, then t2.
        let iteration = call / 3;
        let slot = call % 3;

        let value = if slot == 2 && self.target_iterations.contains(&iteration) {
            let t1 = history[(call - 2) as usize];
            t1.saturating_sub(1)
        } else {
            let prev = history.last().copied().unwrap_or(1_000_000);
            prev + 7 + (call % 13) * 3 + 1
        };

        history.push(value);
        value
    }

    fn fips_enabled(&self) -> bool {
        false
    }
}

#[test]
fn self_test_tolerates_exactly_three_backward_observations() {
    let hooks = BackwardAtIterations::new(vec![150, 200, 250]);
    assert!(init_with_hooks(&hooks).is_ok());
}

#[test]
fn self_test_rejects_four_backward_observations() {
    let hooks = BackwardAtIterations::new(vec![150, 200, 250, 300]);
    assert_eq!(
        init_with_hooks(&hooks).unwrap_err(),
        JitterError::NoMonotonic
    );
}
