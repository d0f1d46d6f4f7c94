//! End-to-end runs of the reconciliation engine against real SQLite
//! files.

use renum_engine::report::{NoLinks, NoProgress};
use renum_engine::store::PostFilter;
use renum_engine::{run, RepairPolicy, Store};
use renum_store::SqliteStore;

fn numbers(store: &SqliteStore, thread: i64) -> Vec<Option<u32>> {
    store
        .posts_of(thread, PostFilter::All)
        .unwrap()
        .iter()
        .map(|p| p.number)
        .collect()
}

fn last_number(store: &SqliteStore, thread: i64) -> u32 {
    store
        .threads_after(Some(thread - 1), 1)
        .unwrap()
        .first()
        .map(|t| t.last_post_number)
        .unwrap()
}

#[test]
fn missing_policy_numbers_a_fresh_thread() {
    let store = SqliteStore::open_in_memory().unwrap();
    store.insert_thread(1, 0).unwrap();
    for (id, at) in [(10, 100), (11, 200), (12, 300), (13, 400)] {
        store.insert_post(id, 1, at, None).unwrap();
    }

    let policy = RepairPolicy {
        missing: true,
        ..RepairPolicy::default()
    };
    let report = run(&store, &policy, &mut NoProgress, &mut NoLinks).unwrap();

    assert_eq!(report.totals.missing, 1);
    assert_eq!(report.posts_updated, 4);
    assert_eq!(numbers(&store, 1), vec![Some(1), Some(2), Some(3), Some(4)]);
    assert_eq!(last_number(&store, 1), 4);
}

#[test]
fn full_pass_survives_reopen_and_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("forum.db");

    {
        let store = SqliteStore::open(&path).unwrap();
        store.insert_thread(1, 9).unwrap();
        store.insert_post(10, 1, 100, Some(9)).unwrap();
        store.insert_post(11, 1, 200, Some(4)).unwrap();
        store.insert_post(12, 1, 300, None).unwrap();

        let policy = RepairPolicy {
            all: true,
            ..RepairPolicy::default()
        };
        let report = run(&store, &policy, &mut NoProgress, &mut NoLinks).unwrap();
        assert_eq!(report.threads_updated, 1);
        assert_eq!(report.posts_updated, 3);
    }

    // Numbers persisted across a reopen; a second pass changes nothing.
    let store = SqliteStore::open(&path).unwrap();
    assert_eq!(numbers(&store, 1), vec![Some(1), Some(2), Some(3)]);
    assert_eq!(last_number(&store, 1), 3);

    let policy = RepairPolicy {
        all: true,
        ..RepairPolicy::default()
    };
    run(&store, &policy, &mut NoProgress, &mut NoLinks).unwrap();
    assert_eq!(numbers(&store, 1), vec![Some(1), Some(2), Some(3)]);
    assert_eq!(last_number(&store, 1), 3);
}

#[test]
fn partial_fill_preserves_existing_numbers() {
    let store = SqliteStore::open_in_memory().unwrap();
    store.insert_thread(1, 5).unwrap();
    store.insert_post(10, 1, 100, Some(2)).unwrap();
    store.insert_post(11, 1, 200, Some(5)).unwrap();
    store.insert_post(12, 1, 300, None).unwrap();

    let policy = RepairPolicy {
        partial: true,
        ..RepairPolicy::default()
    };
    run(&store, &policy, &mut NoProgress, &mut NoLinks).unwrap();

    // Existing numbers untouched, continuation strictly after the max.
    assert_eq!(numbers(&store, 1), vec![Some(2), Some(5), Some(6)]);
    assert_eq!(last_number(&store, 1), 6);
}

#[test]
fn scan_only_reports_without_mutating() {
    let store = SqliteStore::open_in_memory().unwrap();
    store.insert_thread(1, 2).unwrap();
    store.insert_post(10, 1, 100, Some(2)).unwrap();
    store.insert_post(11, 1, 200, Some(2)).unwrap();
    store.insert_thread(2, 0).unwrap();
    store.insert_post(20, 2, 100, None).unwrap();

    let report = run(
        &store,
        &RepairPolicy::default(),
        &mut NoProgress,
        &mut NoLinks,
    )
    .unwrap();

    assert_eq!(report.thread_count, 2);
    assert_eq!(report.totals.good, 1);
    assert_eq!(report.totals.good_with_duplicates, 1);
    assert_eq!(report.totals.missing, 1);
    assert_eq!(report.threads_updated, 0);
    assert_eq!(numbers(&store, 1), vec![Some(2), Some(2)]);
    assert_eq!(numbers(&store, 2), vec![None]);
}

#[test]
fn many_threads_stream_through_the_cursor() {
    let store = SqliteStore::open_in_memory().unwrap();
    // More threads than one cursor page.
    for id in 1..=300 {
        store.insert_thread(id, 0).unwrap();
        store.insert_post(id * 10, id, 100, None).unwrap();
    }

    let policy = RepairPolicy {
        missing: true,
        ..RepairPolicy::default()
    };
    let report = run(&store, &policy, &mut NoProgress, &mut NoLinks).unwrap();

    assert_eq!(report.thread_count, 300);
    assert_eq!(report.totals.missing, 300);
    assert_eq!(report.threads_updated, 300);
    assert_eq!(report.posts_updated, 300);
    assert_eq!(numbers(&store, 300), vec![Some(1)]);
    assert_eq!(last_number(&store, 300), 1);
}
