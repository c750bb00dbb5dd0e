mod common;

use common::TestContext;
use filecache::BoxError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

const THREADS: usize = 8;

#[test]
fn test_same_key_converts_once_under_contention() {
    let ctx = TestContext::new();
    let path = ctx.write("shared.txt", "payload", 1_000);
    let calls = AtomicUsize::new(0);
    let barrier = Barrier::new(THREADS);

    let values: Vec<Arc<String>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    ctx.cache
                        .map(&path, |content: &str| -> Result<String, BoxError> {
                            calls.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(50));
                            Ok(content.to_string())
                        })
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(values.iter().all(|v| Arc::ptr_eq(v, &values[0])));
    let stats = ctx.cache.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, (THREADS - 1) as u64);
}

#[test]
fn test_unrelated_keys_convert_in_parallel() {
    let ctx = TestContext::new();
    let left = ctx.write("left.txt", "l", 1_000);
    let right = ctx.write("right.txt", "r", 1_000);

    // Each converter waits for the other to start; a cache-wide lock would
    // make one of them time out.
    let (left_tx, left_rx) = mpsc::channel::<()>();
    let (right_tx, right_rx) = mpsc::channel::<()>();
    let rendezvous = |tx: mpsc::Sender<()>, rx: mpsc::Receiver<()>| {
        move |content: &str| -> Result<String, BoxError> {
            tx.send(()).map_err(|e| e.to_string())?;
            rx.recv_timeout(Duration::from_secs(5))
                .map_err(|e| format!("peer conversion never started: {e}"))?;
            Ok(content.to_string())
        }
    };
    let left_convert = rendezvous(left_tx, right_rx);
    let right_convert = rendezvous(right_tx, left_rx);

    let (l, r) = thread::scope(|scope| {
        let l = scope.spawn(|| ctx.cache.map(&left, left_convert));
        let r = scope.spawn(|| ctx.cache.map(&right, right_convert));
        (l.join().unwrap(), r.join().unwrap())
    });

    assert_eq!(*l.unwrap(), "l");
    assert_eq!(*r.unwrap(), "r");
}

#[test]
fn test_registered_load_from_many_threads() {
    let ctx = TestContext::new();
    let path = ctx.write("numbers.txt", "1\n2\n3\n", 1_000);
    ctx.cache
        .register(&path, |raw: &str| {
            raw.lines().map(str::parse::<u64>).sum::<Result<u64, _>>()
        })
        .unwrap();

    thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(|| {
                for _ in 0..20 {
                    assert_eq!(*ctx.cache.load::<u64>(&path).unwrap(), 6);
                }
            });
        }
    });

    assert_eq!(ctx.cache.stats().misses, 1);
}
