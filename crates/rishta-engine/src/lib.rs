pub mod admin;
pub mod chat;
pub mod config;
pub mod requests;

#[cfg(test)]
pub(crate) mod testutil;

pub use admin::ModerationDesk;
pub use chat::ChatManager;
pub use config::EngineConfig;
pub use requests::{Decision, RequestManager};

use rishta_db::Database;
use rishta_types::{Result, RishtaError};
use rusqlite::Connection;

/// Run `f` under the writer lock while keeping the engine's error type.
/// Storage failures surface as `RishtaError::Storage`; everything the closure
/// returns as `Err` is a business outcome.
pub(crate) fn with_write<T>(db: &Database, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
    db.with_conn_mut(|conn| Ok(f(conn)))
        .map_err(RishtaError::Storage)?
}

pub(crate) fn with_read<T>(db: &Database, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
    db.with_conn(|conn| Ok(f(conn)))
        .map_err(RishtaError::Storage)?
}
