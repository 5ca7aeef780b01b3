//! Marriage-request state machine. `pending` is the only live state;
//! `accepted`, `rejected` and `expired` are terminal. Acceptance is the one
//! place in the system that opens a chat room, and it does so in the same
//! transaction as the status flip.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use rishta_db::{Database, queries};
use rishta_policy::can_contact;
use rishta_types::lifecycle::{ChatRoom, MarriageRequest, RequestStatus};
use rishta_types::profile::{Profile, ViewerContext};
use rishta_types::{Result, RishtaError};

use crate::config::EngineConfig;
use crate::{chat, with_read, with_write};

const MIN_REQUEST_MESSAGE_CHARS: usize = 10;
const MAX_REQUEST_MESSAGE_CHARS: usize = 500;

/// The receiver's answer to a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Reject,
}

pub struct RequestManager {
    db: Arc<Database>,
    config: EngineConfig,
}

impl RequestManager {
    pub fn new(db: Arc<Database>, config: EngineConfig) -> Self {
        Self { db, config }
    }

    /// Create a pending request from `sender` to `receiver`. Fails with
    /// `Forbidden` when the receiver's `allow_contact_requests` policy
    /// denies the sender, `InvalidMessage` on a bad introduction length, and
    /// `DuplicateRequest` when the sender already has a pending request to
    /// this receiver. The dedupe check and the insert run under the writer
    /// lock, so two concurrent sends cannot both pass.
    pub fn create_request(
        &self,
        sender: &ViewerContext,
        receiver: &Profile,
        message: &str,
        now: DateTime<Utc>,
    ) -> Result<MarriageRequest> {
        if !can_contact(receiver, sender) {
            return Err(RishtaError::Forbidden);
        }

        let chars = message.chars().count();
        if !(MIN_REQUEST_MESSAGE_CHARS..=MAX_REQUEST_MESSAGE_CHARS).contains(&chars) {
            return Err(RishtaError::InvalidMessage(format!(
                "introduction must be {}-{} characters, got {}",
                MIN_REQUEST_MESSAGE_CHARS, MAX_REQUEST_MESSAGE_CHARS, chars
            )));
        }

        let request = MarriageRequest {
            id: Uuid::new_v4(),
            sender_id: sender.id,
            receiver_id: receiver.id,
            message: message.to_string(),
            status: RequestStatus::Pending,
            sent_at: now,
            responded_at: None,
            note: None,
        };

        with_write(&self.db, |conn| {
            if queries::pending_request_exists(conn, sender.id, receiver.id)? {
                return Err(RishtaError::DuplicateRequest);
            }
            queries::insert_request(conn, &request)?;
            Ok(())
        })?;

        info!(
            "Marriage request {} created: {} -> {}",
            request.id, request.sender_id, request.receiver_id
        );
        Ok(request)
    }

    /// Receiver's response. Only the receiver of a pending request may
    /// respond; anything else is `InvalidTransition`. Accepting flips the
    /// status and opens the chat room in one transaction — if the room
    /// insert fails the status flip rolls back, so a request is never left
    /// accepted without a room.
    pub fn respond(
        &self,
        request_id: Uuid,
        responder_id: Uuid,
        decision: Decision,
        note: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(MarriageRequest, Option<ChatRoom>)> {
        let (request, room) = with_write(&self.db, |conn| {
            let mut request = queries::query_request(conn, request_id)?
                .ok_or(RishtaError::NotFound("request"))?;

            if responder_id != request.receiver_id || request.status != RequestStatus::Pending {
                return Err(RishtaError::InvalidTransition);
            }

            let to = match decision {
                Decision::Accept => RequestStatus::Accepted,
                Decision::Reject => RequestStatus::Rejected,
            };

            let tx = conn.unchecked_transaction().map_err(anyhow::Error::from)?;
            let updated =
                queries::update_request_status(&tx, request_id, RequestStatus::Pending, to, Some(now), note)?;
            if updated == 0 {
                return Err(RishtaError::InvalidTransition);
            }

            let room = match decision {
                Decision::Accept => Some(chat::open_room_tx(
                    &tx,
                    request_id,
                    request.sender_id,
                    request.receiver_id,
                    self.config.room_ttl,
                    now,
                )?),
                Decision::Reject => None,
            };
            tx.commit().map_err(anyhow::Error::from)?;

            request.status = to;
            request.responded_at = Some(now);
            request.note = note.map(str::to_string);
            Ok((request, room))
        })?;

        info!(
            "Marriage request {} {} by {}",
            request.id,
            request.status.as_str(),
            responder_id
        );
        Ok((request, room))
    }

    /// Expire pending requests older than the request TTL. Idempotent batch
    /// job; returns how many rows transitioned.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let cutoff = now - self.config.request_ttl;
        let expired = with_write(&self.db, |conn| {
            Ok(queries::expire_requests_before(conn, cutoff)?)
        })?;
        if expired > 0 {
            info!("Expired {} stale marriage requests", expired);
        }
        Ok(expired)
    }

    /// All requests addressed to `receiver_id`, newest first.
    pub fn inbox(&self, receiver_id: Uuid) -> Result<Vec<MarriageRequest>> {
        with_read(&self.db, |conn| {
            Ok(queries::query_requests_for_receiver(conn, receiver_id)?)
        })
    }
}
