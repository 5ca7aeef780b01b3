//! Human side of the moderation pipeline: the review queue of held messages
//! and the terminal approve/reject actions.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use rishta_db::{Database, queries};
use rishta_types::lifecycle::{Message, MessageStatus};
use rishta_types::{Result, RishtaError};

use crate::{with_read, with_write};

pub struct ModerationDesk {
    db: Arc<Database>,
}

impl ModerationDesk {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Messages held by the pipeline, oldest first.
    pub fn review_queue(&self) -> Result<Vec<Message>> {
        with_read(&self.db, |conn| Ok(queries::query_pending_messages(conn)?))
    }

    /// Release a held message. Idempotent: approving an already-approved
    /// message (held or auto-approved) is a no-op.
    pub fn approve(
        &self,
        message_id: Uuid,
        reviewer_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Message> {
        self.review(message_id, reviewer_id, MessageStatus::Approved, None, now)
    }

    /// Permanently block a held message. Idempotent on repeat rejection.
    pub fn reject(
        &self,
        message_id: Uuid,
        reviewer_id: Uuid,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<Message> {
        self.review(
            message_id,
            reviewer_id,
            MessageStatus::Rejected,
            Some(reason),
            now,
        )
    }

    fn review(
        &self,
        message_id: Uuid,
        reviewer_id: Uuid,
        to: MessageStatus,
        note: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Message> {
        with_write(&self.db, |conn| {
            let message = queries::query_message(conn, message_id)?
                .ok_or(RishtaError::NotFound("message"))?;

            // Repeating the decision that already stands is a no-op.
            if message.status == to {
                return Ok(message);
            }
            // Approve and reject are both terminal; they do not overwrite
            // each other.
            if message.status != MessageStatus::Pending {
                return Err(RishtaError::InvalidTransition);
            }

            let updated = queries::set_message_review(
                conn,
                message_id,
                MessageStatus::Pending,
                to,
                reviewer_id,
                now,
                note,
            )?;
            if updated == 0 {
                return Err(RishtaError::InvalidTransition);
            }

            info!(
                "Message {} {} by reviewer {}",
                message_id,
                to.as_str(),
                reviewer_id
            );
            queries::query_message(conn, message_id)?.ok_or(RishtaError::NotFound("message"))
        })
    }
}
