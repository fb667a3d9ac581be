use thiserror::Error;

/// Infrastructure failure while talking to the seat store.
///
/// Whatever the stage, the seat's prior state is left unchanged: every
/// transaction is rolled back before one of these is returned.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("connect failed: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("begin transaction failed: {0}")]
    Begin(#[source] sqlx::Error),

    #[error("seat lock failed: {0}")]
    Lock(#[source] sqlx::Error),

    #[error("seat read failed: {0}")]
    Read(#[source] sqlx::Error),

    #[error("seat update failed: {0}")]
    Write(#[source] sqlx::Error),

    #[error("commit failed: {0}")]
    Commit(#[source] sqlx::Error),

    #[error("query failed: {0}")]
    Query(#[source] sqlx::Error),

    #[error("corrupt seat row: {0}")]
    Corrupt(String),

    #[error("seat store is closed")]
    Closed,
}

impl StoreError {
    /// Log status naming the stage that failed.
    pub fn stage(&self) -> &'static str {
        match self {
            StoreError::Connect(_) => "connect_fail",
            StoreError::Begin(_) => "tx_begin_fail",
            StoreError::Lock(_) | StoreError::Read(_) => "select_fail",
            StoreError::Write(_) => "update_fail",
            StoreError::Commit(_) => "commit_fail",
            StoreError::Query(_) => "query_fail",
            StoreError::Corrupt(_) => "corrupt_row",
            StoreError::Closed => "store_closed",
        }
    }
}
