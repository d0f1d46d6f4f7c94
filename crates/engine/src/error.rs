use std::fmt;

/// Store adapter failure. Read or write against the backing store did
/// not complete.
#[derive(Debug)]
pub enum StoreError {
    /// Could not open or prepare the backing store.
    Open(String),
    /// A read query failed.
    Query(String),
    /// A write failed (persist, clear).
    Mutation(String),
    /// Transaction begin/commit/rollback failed.
    Txn(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open(msg) => write!(f, "store open error: {msg}"),
            Self::Query(msg) => write!(f, "store query error: {msg}"),
            Self::Mutation(msg) => write!(f, "store write error: {msg}"),
            Self::Txn(msg) => write!(f, "store transaction error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Engine failure.
#[derive(Debug)]
pub enum EngineError {
    /// Data access failed. The in-flight thread's repair has been rolled
    /// back; the pass may continue with the next thread.
    Store(StoreError),
    /// Defensive check failed — a logic bug or corrupt data that would
    /// produce wrong numbers. Fatal; the run must stop.
    Invariant(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::Invariant(msg) => write!(f, "invariant violation: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Invariant(_) => None,
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}
