//! Chat room lifecycle: `active -> expired` on the clock,
//! `active -> reported -> closed` through moderation. Every outgoing message
//! is rate-limited and classified before it is stored; rejected and held
//! messages stay on record but never reach the other participant.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use tracing::{info, warn};
use uuid::Uuid;

use rishta_db::{Database, queries};
use rishta_moderation::{BannedTermList, moderate};
use rishta_types::lifecycle::{ChatRoom, Message, MessageStatus, RequestStatus, RoomStatus};
use rishta_types::{Result, RishtaError};

use crate::config::EngineConfig;
use crate::{with_read, with_write};

const MAX_MESSAGE_CHARS: usize = 500;

pub struct ChatManager {
    db: Arc<Database>,
    config: EngineConfig,
}

/// Room creation inside an existing write context. Used by
/// `RequestManager::respond` so the request flip and the room insert share
/// one transaction, and by `ChatManager::open_room` for the standalone path.
pub(crate) fn open_room_tx(
    conn: &Connection,
    request_id: Uuid,
    participant_a: Uuid,
    participant_b: Uuid,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<ChatRoom> {
    if queries::query_room_by_request(conn, request_id)?.is_some() {
        return Err(RishtaError::RoomAlreadyExists);
    }

    let room = ChatRoom {
        id: Uuid::new_v4(),
        request_id,
        participant_a,
        participant_b,
        status: RoomStatus::Active,
        created_at: now,
        expires_at: now + ttl,
        reported_by: None,
        report_reason: None,
    };
    queries::insert_room(conn, &room)?;
    info!("Chat room {} opened for request {}", room.id, request_id);
    Ok(room)
}

impl ChatManager {
    pub fn new(db: Arc<Database>, config: EngineConfig) -> Self {
        Self { db, config }
    }

    /// Open the room for an already-accepted request. Guarded against
    /// double-accept races: a second call fails with `RoomAlreadyExists`.
    pub fn open_room(
        &self,
        request_id: Uuid,
        participant_a: Uuid,
        participant_b: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ChatRoom> {
        with_write(&self.db, |conn| {
            let request = queries::query_request(conn, request_id)?
                .ok_or(RishtaError::NotFound("request"))?;
            if request.status != RequestStatus::Accepted {
                return Err(RishtaError::InvalidTransition);
            }
            open_room_tx(
                conn,
                request_id,
                participant_a,
                participant_b,
                self.config.room_ttl,
                now,
            )
        })
    }

    /// Send a message into a room. The room must be active and inside its
    /// TTL, the sender a participant, and the sender under the rolling rate
    /// limits; the limit counts every stored attempt, so rejected messages
    /// spend quota too. The content then passes the keyword pipeline and is
    /// stored with whatever status it came back with.
    pub fn send_message(
        &self,
        room_id: Uuid,
        sender_id: Uuid,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<Message> {
        let chars = content.chars().count();
        if chars == 0 || chars > MAX_MESSAGE_CHARS {
            return Err(RishtaError::InvalidMessage(format!(
                "message must be 1-{} characters, got {}",
                MAX_MESSAGE_CHARS, chars
            )));
        }

        let message = with_write(&self.db, |conn| {
            let room =
                queries::query_room(conn, room_id)?.ok_or(RishtaError::NotFound("chat room"))?;

            match room.status {
                RoomStatus::Active => {}
                RoomStatus::Expired => return Err(RishtaError::RoomExpired),
                RoomStatus::Reported | RoomStatus::Closed => return Err(RishtaError::Forbidden),
            }
            // Wall-clock expiry wins over a sweep that has not run yet.
            if now >= room.expires_at {
                return Err(RishtaError::RoomExpired);
            }
            if !room.is_participant(sender_id) {
                return Err(RishtaError::Forbidden);
            }

            self.check_rate_limit(conn, &room, sender_id, now)?;

            let terms = BannedTermList::from_pairs(queries::load_banned_terms(conn)?);
            let verdict = moderate(content, &terms);

            let message = Message {
                id: Uuid::new_v4(),
                chat_room_id: room.id,
                sender_id,
                content: content.to_string(),
                status: verdict.status,
                flagged_terms: verdict.flagged_terms,
                severity: verdict.severity,
                created_at: now,
                reviewed_by: None,
                reviewed_at: None,
                review_note: None,
            };
            queries::insert_message(conn, &message)?;
            Ok(message)
        })?;

        if message.status == MessageStatus::Pending {
            info!(
                "Message {} held for review ({} flagged, severity {})",
                message.id,
                message.flagged_terms.len(),
                message.severity.as_str()
            );
        }
        Ok(message)
    }

    /// Both windows must have room. Counting and the subsequent insert run
    /// under the same writer lock, so concurrent sends cannot double-spend
    /// a slot.
    fn check_rate_limit(
        &self,
        conn: &Connection,
        room: &ChatRoom,
        sender_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let windows = [
            (Duration::hours(1), self.config.hourly_message_limit),
            (Duration::hours(24), self.config.daily_message_limit),
        ];

        for (window, limit) in windows {
            let since = now - window;
            let count = queries::count_messages_since(conn, room.id, sender_id, since)?;
            if count >= limit {
                // The slot frees when the oldest counted attempt ages out.
                let retry_after = queries::oldest_message_since(conn, room.id, sender_id, since)?
                    .map(|oldest| (oldest + window - now).to_std().unwrap_or_default())
                    .unwrap_or_default();
                return Err(RishtaError::RateLimited { retry_after });
            }
        }
        Ok(())
    }

    /// The transcript a participant may see: approved messages from both
    /// sides plus the requester's own held/rejected ones. The other party
    /// never sees anything that is not approved.
    pub fn transcript(&self, room_id: Uuid, requester_id: Uuid) -> Result<Vec<Message>> {
        with_read(&self.db, |conn| {
            let room =
                queries::query_room(conn, room_id)?.ok_or(RishtaError::NotFound("chat room"))?;
            if !room.is_participant(requester_id) {
                return Err(RishtaError::Forbidden);
            }
            let messages = queries::query_room_messages(conn, room_id)?;
            Ok(messages
                .into_iter()
                .filter(|m| m.status == MessageStatus::Approved || m.sender_id == requester_id)
                .collect())
        })
    }

    /// Full audit listing, all statuses. Administrative use only.
    pub fn all_messages(&self, room_id: Uuid) -> Result<Vec<Message>> {
        with_read(&self.db, |conn| {
            Ok(queries::query_room_messages(conn, room_id)?)
        })
    }

    /// Expire active rooms past their TTL. Idempotent batch job.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let expired = with_write(&self.db, |conn| {
            Ok(queries::expire_rooms_before(conn, now)?)
        })?;
        if expired > 0 {
            info!("Expired {} chat rooms", expired);
        }
        Ok(expired)
    }

    /// A participant reports the room: `active -> reported`. History is
    /// kept; closing is a separate administrative step.
    pub fn report_room(&self, room_id: Uuid, reporter_id: Uuid, reason: &str) -> Result<ChatRoom> {
        let room = with_write(&self.db, |conn| {
            let room =
                queries::query_room(conn, room_id)?.ok_or(RishtaError::NotFound("chat room"))?;
            if !room.is_participant(reporter_id) {
                return Err(RishtaError::Forbidden);
            }
            let updated = queries::mark_room_reported(conn, room_id, reporter_id, reason)?;
            if updated == 0 {
                return Err(RishtaError::InvalidTransition);
            }
            queries::query_room(conn, room_id)?.ok_or(RishtaError::NotFound("chat room"))
        })?;

        warn!("Chat room {} reported by {}: {}", room_id, reporter_id, reason);
        Ok(room)
    }

    /// Administrative close of a reported room: `reported -> closed`.
    pub fn close_room(&self, room_id: Uuid) -> Result<()> {
        with_write(&self.db, |conn| {
            let updated =
                queries::update_room_status(conn, room_id, RoomStatus::Reported, RoomStatus::Closed)?;
            if updated == 0 {
                return Err(RishtaError::InvalidTransition);
            }
            info!("Chat room {} closed", room_id);
            Ok(())
        })
    }
}
