// tests/work_queue.rs

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use monorun::engine::run_bounded;
use monorun::errors::MonorunError;
use monorun_test_utils::with_timeout;

#[tokio::test]
async fn never_exceeds_the_limit() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let (f, p) = (Arc::clone(&in_flight), Arc::clone(&peak));
    let results = with_timeout(run_bounded((0..12).collect(), 3, move |i: u32| {
        let (f, p) = (Arc::clone(&f), Arc::clone(&p));
        async move {
            let now = f.fetch_add(1, Ordering::SeqCst) + 1;
            p.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            f.fetch_sub(1, Ordering::SeqCst);
            Ok(i)
        }
    }))
    .await
    .unwrap();

    assert_eq!(results.len(), 12);
    assert_eq!(peak.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn limit_is_clamped_to_item_count() {
    let peak = Arc::new(AtomicUsize::new(0));
    let in_flight = Arc::new(AtomicUsize::new(0));

    let (f, p) = (Arc::clone(&in_flight), Arc::clone(&peak));
    with_timeout(run_bounded(vec![1, 2], 50, move |i: u32| {
        let (f, p) = (Arc::clone(&f), Arc::clone(&p));
        async move {
            let now = f.fetch_add(1, Ordering::SeqCst) + 1;
            p.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            f.fetch_sub(1, Ordering::SeqCst);
            Ok(i)
        }
    }))
    .await
    .unwrap();

    assert!(peak.load(Ordering::SeqCst) <= 2);

    // Zero behaves as one.
    let out = with_timeout(run_bounded(vec![1, 2, 3], 0, |i: u32| async move { Ok(i) }))
        .await
        .unwrap();
    assert_eq!(out, vec![1, 2, 3]);
}

#[tokio::test]
async fn results_arrive_in_completion_order() {
    let out = with_timeout(run_bounded(vec![60u64, 30, 0], 3, |ms| async move {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(ms)
    }))
    .await
    .unwrap();
    assert_eq!(out, vec![0, 30, 60]);
}

#[tokio::test]
async fn empty_input_resolves_immediately() {
    let out: Vec<u32> = run_bounded(Vec::<u32>::new(), 4, |i| async move { Ok(i) })
        .await
        .unwrap();
    assert!(out.is_empty());
}

#[tokio::test]
async fn first_error_rejects_the_queue() {
    let finished = Arc::new(AtomicUsize::new(0));
    let done = Arc::clone(&finished);

    let started = std::time::Instant::now();
    let res = with_timeout(run_bounded((0..6).collect(), 2, move |i: u32| {
        let done = Arc::clone(&done);
        async move {
            if i == 0 {
                return Err(MonorunError::FoldersFailed(1));
            }
            tokio::time::sleep(Duration::from_secs(3)).await;
            done.fetch_add(1, Ordering::SeqCst);
            Ok(i)
        }
    }))
    .await;

    assert!(matches!(res, Err(MonorunError::FoldersFailed(1))));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(finished.load(Ordering::SeqCst), 0);
}
