//! In-memory store and fixture helpers shared by the engine tests.

use std::cell::RefCell;
use std::collections::BTreeMap;

use chrono::DateTime;

use crate::classify::sort_canonical;
use crate::error::StoreError;
use crate::model::{AnomalyKind, Post, PostId, Thread, ThreadId};
use crate::report::LinkReporter;
use crate::store::{PostFilter, Store};

/// Post with `created_at` = unix epoch + `secs`.
pub fn post_at(id: PostId, secs: i64, number: Option<u32>) -> Post {
    Post {
        id,
        created_at: DateTime::from_timestamp(secs, 0).unwrap(),
        number,
    }
}

/// Post with a distinct timestamp per `order` step.
pub fn post(id: PostId, order: i64, number: Option<u32>) -> Post {
    post_at(id, order * 60, number)
}

#[derive(Default, Clone)]
struct Tables {
    threads: BTreeMap<ThreadId, u32>,
    posts: BTreeMap<PostId, (ThreadId, Post)>,
}

#[derive(Default)]
struct Inner {
    tables: Tables,
    snapshot: Option<Tables>,
    fail_in: Option<u32>,
}

/// Store backed by in-process maps, with snapshot-based transactions and
/// an injectable write failure for rollback tests.
#[derive(Default)]
pub struct MemStore {
    inner: RefCell<Inner>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_thread(&self, id: ThreadId) {
        self.inner.borrow_mut().tables.threads.insert(id, 0);
    }

    pub fn add_post(&self, thread: ThreadId, post: Post) {
        self.inner
            .borrow_mut()
            .tables
            .posts
            .insert(post.id, (thread, post));
    }

    pub fn last_post_number(&self, thread: ThreadId) -> u32 {
        self.inner.borrow().tables.threads[&thread]
    }

    /// Make the n-th write from now fail (1 = the very next write).
    pub fn fail_after_writes(&self, n: u32) {
        self.inner.borrow_mut().fail_in = Some(n);
    }

    fn check_write(inner: &mut Inner) -> Result<(), StoreError> {
        if let Some(n) = inner.fail_in {
            if n <= 1 {
                inner.fail_in = None;
                return Err(StoreError::Mutation("injected failure".into()));
            }
            inner.fail_in = Some(n - 1);
        }
        Ok(())
    }
}

impl Store for MemStore {
    fn count_threads(&self) -> Result<u64, StoreError> {
        Ok(self.inner.borrow().tables.threads.len() as u64)
    }

    fn threads_after(
        &self,
        after: Option<ThreadId>,
        limit: usize,
    ) -> Result<Vec<Thread>, StoreError> {
        let inner = self.inner.borrow();
        Ok(inner
            .tables
            .threads
            .iter()
            .filter(|(id, _)| after.map_or(true, |a| **id > a))
            .take(limit)
            .map(|(id, last)| Thread {
                id: *id,
                last_post_number: *last,
            })
            .collect())
    }

    fn posts_of(&self, thread: ThreadId, filter: PostFilter) -> Result<Vec<Post>, StoreError> {
        let inner = self.inner.borrow();
        let mut posts: Vec<Post> = inner
            .tables
            .posts
            .values()
            .filter(|(t, _)| *t == thread)
            .map(|(_, p)| p.clone())
            .filter(|p| match filter {
                PostFilter::All => true,
                PostFilter::Numbered => p.number.is_some(),
                PostFilter::Unnumbered => p.number.is_none(),
            })
            .collect();
        sort_canonical(&mut posts);
        Ok(posts)
    }

    fn clear_numbers(&self, thread: ThreadId) -> Result<(), StoreError> {
        let mut inner = self.inner.borrow_mut();
        Self::check_write(&mut inner)?;
        for (t, p) in inner.tables.posts.values_mut() {
            if *t == thread {
                p.number = None;
            }
        }
        Ok(())
    }

    fn persist_post_number(&self, post: PostId, number: u32) -> Result<(), StoreError> {
        let mut inner = self.inner.borrow_mut();
        Self::check_write(&mut inner)?;
        match inner.tables.posts.get_mut(&post) {
            Some((_, p)) => {
                p.number = Some(number);
                Ok(())
            }
            None => Err(StoreError::Mutation(format!("no such post: {post}"))),
        }
    }

    fn persist_last_post_number(&self, thread: ThreadId, number: u32) -> Result<(), StoreError> {
        let mut inner = self.inner.borrow_mut();
        Self::check_write(&mut inner)?;
        match inner.tables.threads.get_mut(&thread) {
            Some(last) => {
                *last = number;
                Ok(())
            }
            None => Err(StoreError::Mutation(format!("no such thread: {thread}"))),
        }
    }

    fn begin_repair(&self, _thread: ThreadId) -> Result<(), StoreError> {
        let mut inner = self.inner.borrow_mut();
        inner.snapshot = Some(inner.tables.clone());
        Ok(())
    }

    fn commit_repair(&self) -> Result<(), StoreError> {
        self.inner.borrow_mut().snapshot = None;
        Ok(())
    }

    fn rollback_repair(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.borrow_mut();
        match inner.snapshot.take() {
            Some(tables) => {
                inner.tables = tables;
                Ok(())
            }
            None => Err(StoreError::Txn("rollback without begin".into())),
        }
    }
}

/// Link reporter that records what it was handed.
#[derive(Default)]
pub struct CollectedLinks {
    pub seen: Vec<(AnomalyKind, ThreadId)>,
}

impl LinkReporter for CollectedLinks {
    fn anomaly(&mut self, kind: AnomalyKind, thread: &Thread) {
        self.seen.push((kind, thread.id));
    }
}
