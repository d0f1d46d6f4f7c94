use std::collections::VecDeque;

use crate::error::StoreError;
use crate::model::{Post, PostId, Thread, ThreadId};

/// Which posts of a thread to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFilter {
    All,
    Numbered,
    Unnumbered,
}

/// Persistence seam the engine runs against.
///
/// Reads return posts in canonical order (created_at, id). The three
/// repair methods scope one thread's mutation: everything between
/// `begin_repair` and `commit_repair` lands atomically or not at all.
pub trait Store {
    fn count_threads(&self) -> Result<u64, StoreError>;

    /// One keyset page of threads ordered by id, strictly after `after`.
    /// [`ThreadCursor`] turns this into a forward-only stream.
    fn threads_after(
        &self,
        after: Option<ThreadId>,
        limit: usize,
    ) -> Result<Vec<Thread>, StoreError>;

    fn posts_of(&self, thread: ThreadId, filter: PostFilter) -> Result<Vec<Post>, StoreError>;

    /// Clear the number of every post under `thread`.
    fn clear_numbers(&self, thread: ThreadId) -> Result<(), StoreError>;

    fn persist_post_number(&self, post: PostId, number: u32) -> Result<(), StoreError>;

    fn persist_last_post_number(&self, thread: ThreadId, number: u32) -> Result<(), StoreError>;

    fn begin_repair(&self, thread: ThreadId) -> Result<(), StoreError>;
    fn commit_repair(&self) -> Result<(), StoreError>;
    fn rollback_repair(&self) -> Result<(), StoreError>;
}

/// How many threads one page pulls from the store.
const PAGE_SIZE: usize = 256;

/// Forward-only cursor over all threads. Bounds memory to one page
/// regardless of dataset size; restartable only by constructing a new
/// cursor.
pub struct ThreadCursor<'a> {
    store: &'a dyn Store,
    buf: VecDeque<Thread>,
    after: Option<ThreadId>,
    done: bool,
}

impl<'a> ThreadCursor<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self {
            store,
            buf: VecDeque::new(),
            after: None,
            done: false,
        }
    }

    /// Next thread, or `None` once the store is exhausted.
    pub fn next_thread(&mut self) -> Result<Option<Thread>, StoreError> {
        if self.buf.is_empty() && !self.done {
            let page = self.store.threads_after(self.after, PAGE_SIZE)?;
            if page.len() < PAGE_SIZE {
                self.done = true;
            }
            if let Some(last) = page.last() {
                self.after = Some(last.id);
            }
            self.buf.extend(page);
        }
        Ok(self.buf.pop_front())
    }
}
