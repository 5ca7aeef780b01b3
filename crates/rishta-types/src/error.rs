use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by the lifecycle engines. All variants except `Storage`
/// are business-rule outcomes the caller is expected to render; `Storage`
/// wraps infrastructure failures and is the only fatal class.
#[derive(Debug, Error)]
pub enum RishtaError {
    #[error("not permitted by the receiver's privacy settings")]
    Forbidden,

    #[error("a pending request to this receiver already exists")]
    DuplicateRequest,

    #[error("invalid state transition")]
    InvalidTransition,

    #[error("a chat room already exists for this request")]
    RoomAlreadyExists,

    /// The sender hit the per-room message quota. `retry_after` is how long
    /// until the oldest counted attempt leaves the rolling window.
    #[error("rate limit exceeded, retry in {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("this chat room has expired")]
    RoomExpired,

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, RishtaError>;
