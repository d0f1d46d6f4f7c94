use chrono::{DateTime, Utc};
use serde::Serialize;

pub type ThreadId = i64;
pub type PostId = i64;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A thread owning an ordered set of posts.
#[derive(Debug, Clone)]
pub struct Thread {
    pub id: ThreadId,
    /// Cached pointer, expected to equal the max post number once the
    /// thread is fully numbered.
    pub last_post_number: u32,
}

/// A post inside a thread, optionally carrying a sequence number.
#[derive(Debug, Clone)]
pub struct Post {
    pub id: PostId,
    pub created_at: DateTime<Utc>,
    /// `None` = not yet assigned. Assigned numbers are >= 1.
    pub number: Option<u32>,
}

impl Post {
    /// Canonical ordering key: creation time ascending, id as tie-break.
    pub fn canonical_key(&self) -> (DateTime<Utc>, PostId) {
        (self.created_at, self.id)
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Completeness of a thread's numbering. Mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberingState {
    /// Every post carries a number.
    Complete,
    /// Some posts numbered, some not.
    Partial,
    /// No post carries a number (includes empty threads).
    Missing,
}

impl std::fmt::Display for NumberingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Complete => write!(f, "complete"),
            Self::Partial => write!(f, "partial"),
            Self::Missing => write!(f, "missing"),
        }
    }
}

/// One thread's numbering verdict. Both partitions are in canonical order.
#[derive(Debug, Clone)]
pub struct Classification {
    pub state: NumberingState,
    pub has_duplicates: bool,
    pub has_disorder: bool,
    pub numbered: Vec<Post>,
    pub unnumbered: Vec<Post>,
    /// Max assigned number, 0 when nothing is numbered.
    pub max_number: u32,
}

/// Tag attached to enumerate output for an anomalous thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnomalyKind {
    Duplicate,
    Disorder,
    Missing,
    Partial,
}

impl std::fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Duplicate => write!(f, "DUPLICATE"),
            Self::Disorder => write!(f, "DISORDER"),
            Self::Missing => write!(f, "MISSING"),
            Self::Partial => write!(f, "PARTIAL"),
        }
    }
}

// ---------------------------------------------------------------------------
// Repair policy
// ---------------------------------------------------------------------------

/// Which repairs a run is allowed to perform. Independent booleans; any
/// combination is valid and the orchestrator's decision table resolves
/// every one of them.
#[derive(Debug, Clone, Copy, Default)]
pub struct RepairPolicy {
    /// Renumber every thread regardless of classification. Supersedes
    /// the other repair flags.
    pub all: bool,
    /// Assign numbers to threads with no numbers at all.
    pub missing: bool,
    /// Scope the duplicate/disorder fixes to partially numbered threads,
    /// and fill in missing numbers on partially numbered threads.
    pub partial: bool,
    /// Fully renumber threads with duplicate numbers.
    pub fix_duplicates: bool,
    /// Fully renumber threads with out-of-order numbers.
    pub fix_disorder: bool,
    /// Emit locator links for anomalous threads.
    pub enumerate: bool,
}
