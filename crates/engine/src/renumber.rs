use crate::error::EngineError;
use crate::model::{Post, Thread};
use crate::store::Store;

/// Assign a gapless ascending sequence to `posts`, then update the
/// thread's cached last number.
///
/// `posts` must already be in the order the final numbering should
/// follow; this function does not re-sort. With `clear_existing` every
/// post under the thread loses its number first, so no stale duplicate
/// can survive a full pass and re-running with the same inputs lands on
/// identical numbers.
///
/// The whole mutation runs inside one repair transaction: a failure on
/// any write rolls the thread back to its prior state.
pub fn renumber(
    store: &dyn Store,
    thread: &Thread,
    posts: &[Post],
    clear_existing: bool,
    start_from: u32,
) -> Result<u32, EngineError> {
    store.begin_repair(thread.id)?;
    match assign(store, thread, posts, clear_existing, start_from) {
        Ok(final_number) => {
            store.commit_repair()?;
            Ok(final_number)
        }
        Err(err) => {
            // Roll back before surfacing the original failure.
            let _ = store.rollback_repair();
            Err(err)
        }
    }
}

fn assign(
    store: &dyn Store,
    thread: &Thread,
    posts: &[Post],
    clear_existing: bool,
    start_from: u32,
) -> Result<u32, EngineError> {
    if clear_existing {
        store.clear_numbers(thread.id)?;
    }

    let mut counter = start_from;
    for post in posts {
        counter = counter.checked_add(1).ok_or_else(|| {
            EngineError::Invariant(format!("post number overflow in thread {}", thread.id))
        })?;
        store.persist_post_number(post.id, counter)?;
    }

    store.persist_last_post_number(thread.id, counter)?;
    Ok(counter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Thread;
    use crate::store::PostFilter;
    use crate::testing::{post, MemStore};

    fn thread(id: i64) -> Thread {
        Thread {
            id,
            last_post_number: 0,
        }
    }

    #[test]
    fn assigns_gapless_sequence_from_offset() {
        let store = MemStore::new();
        store.add_thread(1);
        let posts = vec![post(10, 0, None), post(11, 1, None), post(12, 2, None)];
        for p in &posts {
            store.add_post(1, p.clone());
        }

        let last = renumber(&store, &thread(1), &posts, false, 5).unwrap();
        assert_eq!(last, 8);
        let numbers: Vec<u32> = store
            .posts_of(1, PostFilter::All)
            .unwrap()
            .iter()
            .map(|p| p.number.unwrap())
            .collect();
        assert_eq!(numbers, vec![6, 7, 8]);
        assert_eq!(store.last_post_number(1), 8);
    }

    #[test]
    fn clear_existing_wipes_posts_not_passed_in() {
        let store = MemStore::new();
        store.add_thread(1);
        store.add_post(1, post(10, 0, Some(4)));
        store.add_post(1, post(11, 1, Some(4)));
        // Renumber only the first post; the second must still lose its
        // stale duplicate.
        let only_first = vec![post(10, 0, Some(4))];

        let last = renumber(&store, &thread(1), &only_first, true, 0).unwrap();
        assert_eq!(last, 1);
        let posts = store.posts_of(1, PostFilter::All).unwrap();
        assert_eq!(posts[0].number, Some(1));
        assert_eq!(posts[1].number, None);
    }

    #[test]
    fn full_renumber_is_idempotent() {
        let store = MemStore::new();
        store.add_thread(1);
        let posts = vec![post(10, 0, Some(7)), post(11, 1, Some(2)), post(12, 2, Some(2))];
        for p in &posts {
            store.add_post(1, p.clone());
        }

        let first = renumber(&store, &thread(1), &posts, true, 0).unwrap();
        let after_first: Vec<Option<u32>> = store
            .posts_of(1, PostFilter::All)
            .unwrap()
            .iter()
            .map(|p| p.number)
            .collect();

        let second = renumber(&store, &thread(1), &posts, true, 0).unwrap();
        let after_second: Vec<Option<u32>> = store
            .posts_of(1, PostFilter::All)
            .unwrap()
            .iter()
            .map(|p| p.number)
            .collect();

        assert_eq!(first, second);
        assert_eq!(after_first, after_second);
        assert_eq!(after_first, vec![Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn empty_post_list_still_updates_index() {
        let store = MemStore::new();
        store.add_thread(1);
        let last = renumber(&store, &thread(1), &[], false, 0).unwrap();
        assert_eq!(last, 0);
        assert_eq!(store.last_post_number(1), 0);
    }

    mod properties {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            // Whatever numbering mess a thread starts in, a full
            // renumber yields exactly {1..=count} in canonical order and
            // a second run changes nothing.
            #[test]
            fn full_renumber_is_gapless_and_idempotent(
                priors in prop::collection::vec(prop::option::of(1u32..50), 0..20),
            ) {
                let store = MemStore::new();
                store.add_thread(1);
                for (i, prior) in priors.iter().enumerate() {
                    store.add_post(1, post(i as i64 + 10, i as i64, *prior));
                }

                let posts = store.posts_of(1, PostFilter::All).unwrap();
                let last = renumber(&store, &thread(1), &posts, true, 0).unwrap();
                prop_assert_eq!(last as usize, priors.len());

                let assigned: Vec<Option<u32>> = store
                    .posts_of(1, PostFilter::All)
                    .unwrap()
                    .iter()
                    .map(|p| p.number)
                    .collect();
                let expected: Vec<Option<u32>> =
                    (1..=priors.len() as u32).map(Some).collect();
                prop_assert_eq!(&assigned, &expected);
                prop_assert_eq!(store.last_post_number(1), last);

                let again = renumber(&store, &thread(1), &posts, true, 0).unwrap();
                let reassigned: Vec<Option<u32>> = store
                    .posts_of(1, PostFilter::All)
                    .unwrap()
                    .iter()
                    .map(|p| p.number)
                    .collect();
                prop_assert_eq!(again, last);
                prop_assert_eq!(reassigned, assigned);
            }
        }
    }

    #[test]
    fn write_failure_rolls_back_everything() {
        let store = MemStore::new();
        store.add_thread(1);
        store.add_post(1, post(10, 0, Some(3)));
        store.add_post(1, post(11, 1, Some(1)));
        let posts = store.posts_of(1, PostFilter::All).unwrap();

        // Second persist fails mid-repair.
        store.fail_after_writes(2);
        let err = renumber(&store, &thread(1), &posts, true, 0).unwrap_err();
        assert!(matches!(err, EngineError::Store(_)));

        // Prior numbering survives untouched.
        let numbers: Vec<Option<u32>> = store
            .posts_of(1, PostFilter::All)
            .unwrap()
            .iter()
            .map(|p| p.number)
            .collect();
        assert_eq!(numbers, vec![Some(3), Some(1)]);
    }
}
