use parking_lot::Mutex;
use proxybreaker_rs::{CircuitBreaker, ManualClock, MetricSink, State};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

const THREAD_COUNT: usize = 8;
const OPS_PER_THREAD: usize = 1_250;

#[test]
fn test_parallel_reports_are_never_lost() {
    let clock = ManualClock::new();
    let breaker = CircuitBreaker::builder()
        .failure_threshold(u64::MAX)
        .count_window(Duration::from_secs(3600))
        .clock(clock)
        .build()
        .unwrap();

    let failures = Arc::new(AtomicU64::new(0));
    let successes = Arc::new(AtomicU64::new(0));
    let admitted = Arc::new(AtomicU64::new(0));
    let probes = Arc::new(AtomicU64::new(0));
    let barrier = Arc::new(Barrier::new(THREAD_COUNT));

    let handles: Vec<_> = (0..THREAD_COUNT)
        .map(|t| {
            let breaker = breaker.clone();
            let failures = Arc::clone(&failures);
            let successes = Arc::clone(&successes);
            let admitted = Arc::clone(&admitted);
            let probes = Arc::clone(&probes);
            let barrier = Arc::clone(&barrier);

            thread::spawn(move || {
                barrier.wait();
                for i in 0..OPS_PER_THREAD {
                    match (i + t) % 3 {
                        0 => {
                            breaker.on_failure();
                            failures.fetch_add(1, Ordering::Relaxed);
                        }
                        1 => {
                            breaker.on_success();
                            successes.fetch_add(1, Ordering::Relaxed);
                        }
                        _ => {
                            probes.fetch_add(1, Ordering::Relaxed);
                            if breaker.is_allowed() {
                                admitted.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let counts = breaker.counts();
    assert_eq!(
        failures.load(Ordering::Relaxed)
            + successes.load(Ordering::Relaxed)
            + probes.load(Ordering::Relaxed),
        (THREAD_COUNT * OPS_PER_THREAD) as u64
    );
    assert_eq!(counts.failures, failures.load(Ordering::Relaxed));
    assert_eq!(counts.successes, successes.load(Ordering::Relaxed));
    assert_eq!(admitted.load(Ordering::Relaxed), probes.load(Ordering::Relaxed));
    assert_eq!(breaker.current_state(), State::Closed);
}

#[derive(Default)]
struct EdgeSink {
    edges: Mutex<Vec<(String, String)>>,
}

impl MetricSink for EdgeSink {
    fn record_state_transition(&self, _breaker: &str, from: &str, to: &str) {
        self.edges.lock().push((from.to_owned(), to.to_owned()));
    }

    fn record_admission(&self, _breaker: &str, _allowed: bool) {}

    fn record_outcome(&self, _breaker: &str, _success: bool) {}

    fn record_latency(&self, _breaker: &str, _duration: Duration) {}
}

#[test]
fn test_contended_breaker_only_takes_legal_transitions() {
    let clock = ManualClock::new();
    let sink = Arc::new(EdgeSink::default());
    let breaker = CircuitBreaker::builder()
        .failure_threshold(4)
        .success_threshold_ratio(0.5)
        .count_window(Duration::from_secs(60))
        .recovery_timeout(Duration::from_millis(50))
        .clock(clock.clone())
        .shared_metric_sink(sink.clone())
        .build()
        .unwrap();
    let barrier = Arc::new(Barrier::new(THREAD_COUNT + 1));

    let workers: Vec<_> = (0..THREAD_COUNT)
        .map(|t| {
            let breaker = breaker.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..OPS_PER_THREAD {
                    if breaker.is_allowed() {
                        if (i * 7 + t) % 5 < 2 {
                            breaker.on_failure();
                        } else {
                            breaker.on_success();
                        }
                    }
                }
            })
        })
        .collect();

    let ticker = {
        let clock = clock.clone();
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            for _ in 0..200 {
                clock.advance(Duration::from_millis(10));
                thread::yield_now();
            }
        })
    };

    for handle in workers {
        handle.join().unwrap();
    }
    ticker.join().unwrap();

    let legal = [
        ("closed", "open"),
        ("open", "half-open"),
        ("half-open", "closed"),
        ("half-open", "open"),
    ];
    for (from, to) in sink.edges.lock().iter() {
        assert!(
            legal.contains(&(from.as_str(), to.as_str())),
            "illegal transition {from} -> {to}"
        );
    }
}
