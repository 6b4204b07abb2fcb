use logtail_types::{SessionState, TimeWindowError};

/// Synchronous errors from constructing or starting a session
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    InvalidWindow(#[from] TimeWindowError),

    #[error("cannot start a session that is {from}")]
    InvalidTransition { from: SessionState },
}
