use criterion::{black_box, criterion_group, criterion_main, Criterion};
use proxybreaker_rs::{BreakerConfig, BreakerRegistry, CircuitBreaker, ManualClock};
use std::time::Duration;

#[derive(Debug)]
struct BenchError;

impl std::fmt::Display for BenchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "simulated upstream failure")
    }
}

impl std::error::Error for BenchError {}

fn closed_breaker() -> CircuitBreaker {
    CircuitBreaker::builder()
        .failure_threshold(u64::MAX)
        .count_window(Duration::from_secs(30))
        .build()
        .unwrap()
}

fn bench_gate_closed(c: &mut Criterion) {
    let breaker = closed_breaker();

    c.bench_function("gate_closed_allow_and_report", |b| {
        b.iter(|| {
            if black_box(breaker.is_allowed()) {
                breaker.on_success();
            }
        });
    });

    c.bench_function("gate_closed_call", |b| {
        b.iter(|| black_box(breaker.call(|| Ok::<_, BenchError>(()))));
    });
}

fn bench_trip_and_recover(c: &mut Criterion) {
    let clock = ManualClock::new();
    let breaker = CircuitBreaker::builder()
        .failure_threshold(5)
        .success_threshold_ratio(0.5)
        .count_window(Duration::from_secs(60))
        .recovery_timeout(Duration::from_secs(1))
        .clock(clock.clone())
        .build()
        .unwrap();

    c.bench_function("trip_and_recover_cycle", |b| {
        b.iter(|| {
            for _ in 0..5 {
                let _ = black_box(breaker.call(|| Err::<(), _>(BenchError)));
            }
            // One open-circuit rejection
            let _ = black_box(breaker.call(|| Ok::<_, BenchError>(())));

            clock.advance(Duration::from_secs(1));
            let _ = black_box(breaker.call(|| Ok::<_, BenchError>(())));
            black_box(breaker.is_allowed());
        });
    });
}

fn bench_gate_concurrent(c: &mut Criterion) {
    use std::sync::{Arc, Barrier};
    use std::thread;

    let breaker = closed_breaker();

    const THREAD_COUNT: usize = 4;
    const ITERATIONS_PER_THREAD: usize = 1000;

    c.bench_function("gate_concurrent", |b| {
        b.iter(|| {
            let barrier = Arc::new(Barrier::new(THREAD_COUNT + 1));
            let mut handles = Vec::with_capacity(THREAD_COUNT);

            for _ in 0..THREAD_COUNT {
                let thread_breaker = breaker.clone();
                let thread_barrier = Arc::clone(&barrier);

                handles.push(thread::spawn(move || {
                    thread_barrier.wait();
                    for _ in 0..ITERATIONS_PER_THREAD {
                        if thread_breaker.is_allowed() {
                            thread_breaker.on_success();
                        }
                    }
                }));
            }

            // Start all threads simultaneously
            barrier.wait();

            for handle in handles {
                handle.join().unwrap();
            }
        });
    });
}

fn bench_registry_lookup(c: &mut Criterion) {
    let registry = BreakerRegistry::new(BreakerConfig::default()).unwrap();
    let targets: Vec<String> = (0..64).map(|i| format!("backend-{i}")).collect();
    for target in &targets {
        registry.get_or_create(target);
    }

    c.bench_function("registry_get_or_create_hit", |b| {
        let mut i = 0;
        b.iter(|| {
            i = (i + 1) % targets.len();
            black_box(registry.get_or_create(&targets[i]))
        });
    });
}

criterion_group!(
    benches,
    bench_gate_closed,
    bench_trip_and_recover,
    bench_gate_concurrent,
    bench_registry_lookup
);
criterion_main!(benches);
