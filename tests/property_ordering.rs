// tests/property_ordering.rs

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use monorun::discover::{folder_depth, is_excluded, sort_folders};
use monorun::engine::run_bounded;
use proptest::prelude::*;

// Relative folder paths such as `a`, `b/c`, `a/b/a`.
fn folder_strategy() -> impl Strategy<Value = PathBuf> {
    proptest::collection::vec("[a-c]{1,2}", 1..4).prop_map(|segs| PathBuf::from(segs.join("/")))
}

proptest! {
    #[test]
    fn sorted_folders_put_parents_first(mut folders in proptest::collection::vec(folder_strategy(), 0..20)) {
        sort_folders(&mut folders);

        for (i, earlier) in folders.iter().enumerate() {
            for later in &folders[i + 1..] {
                prop_assert!(folder_depth(earlier) <= folder_depth(later));
                prop_assert!(!(earlier != later && earlier.starts_with(later)),
                    "{:?} sorted before its parent {:?}", earlier, later);
            }
        }
    }

    #[test]
    fn sort_ignores_input_order(folders in proptest::collection::vec(folder_strategy(), 0..20)) {
        let mut forward = folders.clone();
        let mut backward: Vec<PathBuf> = folders.into_iter().rev().collect();
        sort_folders(&mut forward);
        sort_folders(&mut backward);
        prop_assert_eq!(forward, backward);
    }

    #[test]
    fn exclusion_matches_path_ancestry(folder in folder_strategy(), prefix in folder_strategy()) {
        let excludes = vec![prefix.clone()];
        prop_assert_eq!(is_excluded(&folder, &excludes), folder.starts_with(&prefix));
    }

    #[test]
    fn queue_respects_limit(count in 0usize..24, limit in 0usize..8) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();

        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (f, p) = (Arc::clone(&in_flight), Arc::clone(&peak));

        let mut results = rt.block_on(run_bounded((0..count).collect(), limit, move |i: usize| {
            let (f, p) = (Arc::clone(&f), Arc::clone(&p));
            async move {
                let now = f.fetch_add(1, Ordering::SeqCst) + 1;
                p.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis((i % 3) as u64)).await;
                f.fetch_sub(1, Ordering::SeqCst);
                Ok(i)
            }
        })).unwrap();

        results.sort();
        prop_assert_eq!(results, (0..count).collect::<Vec<_>>());
        prop_assert!(peak.load(Ordering::SeqCst) <= limit.max(1).min(count.max(1)));
    }
}
