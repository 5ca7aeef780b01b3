use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use crate::Database;
use crate::models::{MessageRow, ProfileRow, RequestRow, RoomRow, parse_time};
use rishta_types::lifecycle::{
    ChatRoom, MarriageRequest, Message, MessageStatus, RequestStatus, RoomStatus, Severity,
};
use rishta_types::profile::Profile;

/// Uniform timestamp encoding: microsecond precision, `Z` suffix, so stored
/// strings compare lexicographically in time order.
pub fn ts(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

// Convenience wrappers for single-statement operations. Multi-statement
// sequences (accept + open room, count + insert) run inside one
// `with_conn_mut` closure in rishta-engine using the free functions below.
impl Database {
    // -- Profiles --

    pub fn upsert_profile(&self, profile: &Profile) -> Result<()> {
        self.with_conn_mut(|conn| upsert_profile(conn, profile))
    }

    pub fn get_profile(&self, id: Uuid) -> Result<Option<Profile>> {
        self.with_conn(|conn| query_profile(conn, id))
    }

    // -- Requests --

    pub fn get_request(&self, id: Uuid) -> Result<Option<MarriageRequest>> {
        self.with_conn(|conn| query_request(conn, id))
    }

    pub fn requests_for_receiver(&self, receiver_id: Uuid) -> Result<Vec<MarriageRequest>> {
        self.with_conn(|conn| query_requests_for_receiver(conn, receiver_id))
    }

    // -- Rooms --

    pub fn get_room(&self, id: Uuid) -> Result<Option<ChatRoom>> {
        self.with_conn(|conn| query_room(conn, id))
    }

    pub fn get_room_by_request(&self, request_id: Uuid) -> Result<Option<ChatRoom>> {
        self.with_conn(|conn| query_room_by_request(conn, request_id))
    }

    // -- Messages --

    pub fn get_message(&self, id: Uuid) -> Result<Option<Message>> {
        self.with_conn(|conn| query_message(conn, id))
    }

    pub fn room_messages(&self, room_id: Uuid) -> Result<Vec<Message>> {
        self.with_conn(|conn| query_room_messages(conn, room_id))
    }

    pub fn pending_messages(&self) -> Result<Vec<Message>> {
        self.with_conn(query_pending_messages)
    }

    // -- Banned terms --

    pub fn load_banned_terms(&self) -> Result<Vec<(String, Severity)>> {
        self.with_conn(load_banned_terms)
    }

    pub fn replace_banned_terms(&self, terms: &[(String, Severity)]) -> Result<()> {
        self.with_conn_mut(|conn| replace_banned_terms(conn, terms))
    }
}

// -- Profiles --

pub fn upsert_profile(conn: &Connection, profile: &Profile) -> Result<()> {
    let extended = profile
        .extended
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    let privacy = profile
        .privacy
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    conn.execute(
        "INSERT INTO profiles
            (id, display_name, gender, kind, city, country, verified, age,
             occupation, photo_url, extended, privacy)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
         ON CONFLICT(id) DO UPDATE SET
            display_name = excluded.display_name,
            gender = excluded.gender,
            kind = excluded.kind,
            city = excluded.city,
            country = excluded.country,
            verified = excluded.verified,
            age = excluded.age,
            occupation = excluded.occupation,
            photo_url = excluded.photo_url,
            extended = excluded.extended,
            privacy = excluded.privacy",
        rusqlite::params![
            profile.id.to_string(),
            profile.display_name,
            profile.gender.as_str(),
            profile.kind.as_str(),
            profile.city,
            profile.country,
            profile.verified,
            profile.age,
            profile.occupation,
            profile.photo_url,
            extended,
            privacy,
        ],
    )?;
    Ok(())
}

pub fn query_profile(conn: &Connection, id: Uuid) -> Result<Option<Profile>> {
    let mut stmt = conn.prepare(
        "SELECT id, display_name, gender, kind, city, country, verified, age,
                occupation, photo_url, extended, privacy
         FROM profiles WHERE id = ?1",
    )?;

    let row = stmt
        .query_row([id.to_string()], |row| {
            Ok(ProfileRow {
                id: row.get(0)?,
                display_name: row.get(1)?,
                gender: row.get(2)?,
                kind: row.get(3)?,
                city: row.get(4)?,
                country: row.get(5)?,
                verified: row.get(6)?,
                age: row.get(7)?,
                occupation: row.get(8)?,
                photo_url: row.get(9)?,
                extended: row.get(10)?,
                privacy: row.get(11)?,
            })
        })
        .optional()?;

    row.map(ProfileRow::into_domain).transpose()
}

// -- Requests --

pub fn insert_request(conn: &Connection, request: &MarriageRequest) -> Result<()> {
    conn.execute(
        "INSERT INTO marriage_requests
            (id, sender_id, receiver_id, message, status, sent_at, responded_at, note)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            request.id.to_string(),
            request.sender_id.to_string(),
            request.receiver_id.to_string(),
            request.message,
            request.status.as_str(),
            ts(request.sent_at),
            request.responded_at.map(ts),
            request.note,
        ],
    )?;
    Ok(())
}

pub fn query_request(conn: &Connection, id: Uuid) -> Result<Option<MarriageRequest>> {
    let mut stmt = conn.prepare(
        "SELECT id, sender_id, receiver_id, message, status, sent_at, responded_at, note
         FROM marriage_requests WHERE id = ?1",
    )?;

    let row = stmt
        .query_row([id.to_string()], request_row)
        .optional()?;

    row.map(RequestRow::into_domain).transpose()
}

pub fn query_requests_for_receiver(
    conn: &Connection,
    receiver_id: Uuid,
) -> Result<Vec<MarriageRequest>> {
    let mut stmt = conn.prepare(
        "SELECT id, sender_id, receiver_id, message, status, sent_at, responded_at, note
         FROM marriage_requests WHERE receiver_id = ?1
         ORDER BY sent_at DESC",
    )?;

    let rows = stmt
        .query_map([receiver_id.to_string()], request_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter().map(RequestRow::into_domain).collect()
}

fn request_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RequestRow> {
    Ok(RequestRow {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        receiver_id: row.get(2)?,
        message: row.get(3)?,
        status: row.get(4)?,
        sent_at: row.get(5)?,
        responded_at: row.get(6)?,
        note: row.get(7)?,
    })
}

pub fn pending_request_exists(conn: &Connection, sender_id: Uuid, receiver_id: Uuid) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM marriage_requests
         WHERE sender_id = ?1 AND receiver_id = ?2 AND status = 'pending'",
        [sender_id.to_string(), receiver_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Guarded status transition. Returns the number of rows updated: zero means
/// the request was not in `from` (lost race or invalid call).
pub fn update_request_status(
    conn: &Connection,
    id: Uuid,
    from: RequestStatus,
    to: RequestStatus,
    responded_at: Option<DateTime<Utc>>,
    note: Option<&str>,
) -> Result<usize> {
    let updated = conn.execute(
        "UPDATE marriage_requests
         SET status = ?1, responded_at = ?2, note = ?3
         WHERE id = ?4 AND status = ?5",
        rusqlite::params![
            to.as_str(),
            responded_at.map(ts),
            note,
            id.to_string(),
            from.as_str(),
        ],
    )?;
    Ok(updated)
}

/// Expire every pending request sent before `cutoff`. Idempotent: already
/// expired rows no longer match the status guard.
pub fn expire_requests_before(conn: &Connection, cutoff: DateTime<Utc>) -> Result<usize> {
    let updated = conn.execute(
        "UPDATE marriage_requests
         SET status = 'expired'
         WHERE status = 'pending' AND sent_at < ?1",
        [ts(cutoff)],
    )?;
    Ok(updated)
}

// -- Rooms --

pub fn insert_room(conn: &Connection, room: &ChatRoom) -> Result<()> {
    conn.execute(
        "INSERT INTO chat_rooms
            (id, request_id, participant_a, participant_b, status, created_at,
             expires_at, reported_by, report_reason)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        rusqlite::params![
            room.id.to_string(),
            room.request_id.to_string(),
            room.participant_a.to_string(),
            room.participant_b.to_string(),
            room.status.as_str(),
            ts(room.created_at),
            ts(room.expires_at),
            room.reported_by.map(|id| id.to_string()),
            room.report_reason,
        ],
    )?;
    Ok(())
}

pub fn query_room(conn: &Connection, id: Uuid) -> Result<Option<ChatRoom>> {
    let mut stmt = conn.prepare(
        "SELECT id, request_id, participant_a, participant_b, status, created_at,
                expires_at, reported_by, report_reason
         FROM chat_rooms WHERE id = ?1",
    )?;

    let row = stmt.query_row([id.to_string()], room_row).optional()?;
    row.map(RoomRow::into_domain).transpose()
}

pub fn query_room_by_request(conn: &Connection, request_id: Uuid) -> Result<Option<ChatRoom>> {
    let mut stmt = conn.prepare(
        "SELECT id, request_id, participant_a, participant_b, status, created_at,
                expires_at, reported_by, report_reason
         FROM chat_rooms WHERE request_id = ?1",
    )?;

    let row = stmt
        .query_row([request_id.to_string()], room_row)
        .optional()?;
    row.map(RoomRow::into_domain).transpose()
}

fn room_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RoomRow> {
    Ok(RoomRow {
        id: row.get(0)?,
        request_id: row.get(1)?,
        participant_a: row.get(2)?,
        participant_b: row.get(3)?,
        status: row.get(4)?,
        created_at: row.get(5)?,
        expires_at: row.get(6)?,
        reported_by: row.get(7)?,
        report_reason: row.get(8)?,
    })
}

/// Report transition: `active -> reported` plus the reporter metadata, in one
/// guarded statement. Returns rows updated.
pub fn mark_room_reported(
    conn: &Connection,
    id: Uuid,
    reporter_id: Uuid,
    reason: &str,
) -> Result<usize> {
    let updated = conn.execute(
        "UPDATE chat_rooms
         SET status = 'reported', reported_by = ?1, report_reason = ?2
         WHERE id = ?3 AND status = 'active'",
        rusqlite::params![reporter_id.to_string(), reason, id.to_string()],
    )?;
    Ok(updated)
}

/// Guarded room transition, same contract as `update_request_status`.
pub fn update_room_status(
    conn: &Connection,
    id: Uuid,
    from: RoomStatus,
    to: RoomStatus,
) -> Result<usize> {
    let updated = conn.execute(
        "UPDATE chat_rooms SET status = ?1 WHERE id = ?2 AND status = ?3",
        rusqlite::params![to.as_str(), id.to_string(), from.as_str()],
    )?;
    Ok(updated)
}

/// Expire every active room whose `expires_at` has passed. Idempotent.
pub fn expire_rooms_before(conn: &Connection, now: DateTime<Utc>) -> Result<usize> {
    let updated = conn.execute(
        "UPDATE chat_rooms
         SET status = 'expired'
         WHERE status = 'active' AND expires_at <= ?1",
        [ts(now)],
    )?;
    Ok(updated)
}

// -- Messages --

pub fn insert_message(conn: &Connection, message: &Message) -> Result<()> {
    conn.execute(
        "INSERT INTO messages
            (id, chat_room_id, sender_id, content, status, flagged_terms,
             severity, created_at, reviewed_by, reviewed_at, review_note)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        rusqlite::params![
            message.id.to_string(),
            message.chat_room_id.to_string(),
            message.sender_id.to_string(),
            message.content,
            message.status.as_str(),
            serde_json::to_string(&message.flagged_terms)?,
            message.severity.as_str(),
            ts(message.created_at),
            message.reviewed_by.map(|id| id.to_string()),
            message.reviewed_at.map(ts),
            message.review_note,
        ],
    )?;
    Ok(())
}

pub fn query_message(conn: &Connection, id: Uuid) -> Result<Option<Message>> {
    let mut stmt = conn.prepare(
        "SELECT id, chat_room_id, sender_id, content, status, flagged_terms,
                severity, created_at, reviewed_by, reviewed_at, review_note
         FROM messages WHERE id = ?1",
    )?;

    let row = stmt.query_row([id.to_string()], message_row).optional()?;
    row.map(MessageRow::into_domain).transpose()
}

pub fn query_room_messages(conn: &Connection, room_id: Uuid) -> Result<Vec<Message>> {
    let mut stmt = conn.prepare(
        "SELECT id, chat_room_id, sender_id, content, status, flagged_terms,
                severity, created_at, reviewed_by, reviewed_at, review_note
         FROM messages WHERE chat_room_id = ?1
         ORDER BY created_at ASC",
    )?;

    let rows = stmt
        .query_map([room_id.to_string()], message_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter().map(MessageRow::into_domain).collect()
}

/// Oldest-first review queue of messages held by the moderation pipeline.
pub fn query_pending_messages(conn: &Connection) -> Result<Vec<Message>> {
    let mut stmt = conn.prepare(
        "SELECT id, chat_room_id, sender_id, content, status, flagged_terms,
                severity, created_at, reviewed_by, reviewed_at, review_note
         FROM messages WHERE status = 'pending'
         ORDER BY created_at ASC",
    )?;

    let rows = stmt
        .query_map([], message_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter().map(MessageRow::into_domain).collect()
}

fn message_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        chat_room_id: row.get(1)?,
        sender_id: row.get(2)?,
        content: row.get(3)?,
        status: row.get(4)?,
        flagged_terms: row.get(5)?,
        severity: row.get(6)?,
        created_at: row.get(7)?,
        reviewed_by: row.get(8)?,
        reviewed_at: row.get(9)?,
        review_note: row.get(10)?,
    })
}

/// Attempts (any status) by `sender_id` in `room_id` since `since`.
pub fn count_messages_since(
    conn: &Connection,
    room_id: Uuid,
    sender_id: Uuid,
    since: DateTime<Utc>,
) -> Result<u32> {
    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM messages
         WHERE chat_room_id = ?1 AND sender_id = ?2 AND created_at > ?3",
        rusqlite::params![room_id.to_string(), sender_id.to_string(), ts(since)],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Timestamp of the oldest attempt in the window, used to compute when the
/// rolling window frees a slot.
pub fn oldest_message_since(
    conn: &Connection,
    room_id: Uuid,
    sender_id: Uuid,
    since: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>> {
    let created: Option<String> = conn
        .query_row(
            "SELECT MIN(created_at) FROM messages
             WHERE chat_room_id = ?1 AND sender_id = ?2 AND created_at > ?3",
            rusqlite::params![room_id.to_string(), sender_id.to_string(), ts(since)],
            |row| row.get(0),
        )
        .optional()?
        .flatten();

    created
        .as_deref()
        .map(|v| parse_time(v, "created_at"))
        .transpose()
}

/// Terminal review write. Guarded on the current status so it composes into
/// idempotent admin actions: returns rows updated.
pub fn set_message_review(
    conn: &Connection,
    id: Uuid,
    from: MessageStatus,
    to: MessageStatus,
    reviewer: Uuid,
    reviewed_at: DateTime<Utc>,
    note: Option<&str>,
) -> Result<usize> {
    let updated = conn.execute(
        "UPDATE messages
         SET status = ?1, reviewed_by = ?2, reviewed_at = ?3, review_note = ?4
         WHERE id = ?5 AND status = ?6",
        rusqlite::params![
            to.as_str(),
            reviewer.to_string(),
            ts(reviewed_at),
            note,
            id.to_string(),
            from.as_str(),
        ],
    )?;
    Ok(updated)
}

// -- Banned terms --

pub fn load_banned_terms(conn: &Connection) -> Result<Vec<(String, Severity)>> {
    let mut stmt = conn.prepare("SELECT term, severity FROM banned_terms ORDER BY term")?;

    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows
        .into_iter()
        .map(|(term, severity)| (term, Severity::parse(&severity)))
        .collect())
}

/// Replace the whole list in one transaction; the list is small and
/// admin-edited as a unit.
pub fn replace_banned_terms(conn: &Connection, terms: &[(String, Severity)]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM banned_terms", [])?;
    for (term, severity) in terms {
        tx.execute(
            "INSERT INTO banned_terms (term, severity) VALUES (?1, ?2)",
            rusqlite::params![term, severity.as_str()],
        )?;
    }
    tx.commit()?;
    Ok(())
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rishta_types::lifecycle::{MarriageRequest, RequestStatus};
    use rishta_types::profile::{
        AccessRule, ExtendedInfo, Gender, PrivacySettings, Profile, ProfileKind,
    };

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn seed_profile(db: &Database) -> Profile {
        let profile = Profile {
            id: Uuid::new_v4(),
            display_name: "Fatima".into(),
            gender: Gender::Female,
            kind: ProfileKind::GuardianGated,
            city: "Dubai".into(),
            country: "AE".into(),
            verified: true,
            age: Some(26),
            occupation: Some("Engineer".into()),
            photo_url: None,
            extended: Some(ExtendedInfo {
                bio: Some("quiet reader".into()),
                education: None,
                guardian_relationship: Some("brother".into()),
                wears_hijab: Some(true),
                wears_niqab: None,
                prayer_location: None,
            }),
            privacy: Some(PrivacySettings {
                allow_contact_requests: Some(AccessRule::GuardianApproved),
                hide_from_local_users: true,
                ..Default::default()
            }),
        };
        db.upsert_profile(&profile).unwrap();
        profile
    }

    fn pending_request(sender: &Profile, receiver: &Profile) -> MarriageRequest {
        MarriageRequest {
            id: Uuid::new_v4(),
            sender_id: sender.id,
            receiver_id: receiver.id,
            message: "I would like an introduction.".into(),
            status: RequestStatus::Pending,
            sent_at: Utc::now(),
            responded_at: None,
            note: None,
        }
    }

    #[test]
    fn profile_round_trips_json_columns() {
        let db = db();
        let profile = seed_profile(&db);

        let loaded = db.get_profile(profile.id).unwrap().unwrap();
        assert_eq!(loaded.kind, ProfileKind::GuardianGated);
        let privacy = loaded.privacy.unwrap();
        assert_eq!(
            privacy.allow_contact_requests,
            Some(AccessRule::GuardianApproved)
        );
        assert!(privacy.hide_from_local_users);
        assert_eq!(
            loaded.extended.unwrap().guardian_relationship.as_deref(),
            Some("brother")
        );
    }

    #[test]
    fn upsert_replaces_existing_profile() {
        let db = db();
        let mut profile = seed_profile(&db);
        profile.city = "Sharjah".into();
        profile.privacy = None;
        db.upsert_profile(&profile).unwrap();

        let loaded = db.get_profile(profile.id).unwrap().unwrap();
        assert_eq!(loaded.city, "Sharjah");
        assert!(loaded.privacy.is_none());
    }

    #[test]
    fn pending_pair_index_is_the_backstop() {
        let db = db();
        let sender = seed_profile(&db);
        let receiver = seed_profile(&db);

        db.with_conn_mut(|conn| insert_request(conn, &pending_request(&sender, &receiver)))
            .unwrap();
        // A second pending row for the same ordered pair violates the
        // partial unique index even if the engine-level check is bypassed.
        let result = db
            .with_conn_mut(|conn| insert_request(conn, &pending_request(&sender, &receiver)));
        assert!(result.is_err());

        // The reverse direction is a different ordered pair.
        db.with_conn_mut(|conn| insert_request(conn, &pending_request(&receiver, &sender)))
            .unwrap();
    }

    #[test]
    fn guarded_request_update_reports_missed_precondition() {
        let db = db();
        let sender = seed_profile(&db);
        let receiver = seed_profile(&db);
        let request = pending_request(&sender, &receiver);
        db.with_conn_mut(|conn| insert_request(conn, &request)).unwrap();

        let updated = db
            .with_conn_mut(|conn| {
                update_request_status(
                    conn,
                    request.id,
                    RequestStatus::Accepted,
                    RequestStatus::Rejected,
                    None,
                    None,
                )
            })
            .unwrap();
        assert_eq!(updated, 0);

        let loaded = db.get_request(request.id).unwrap().unwrap();
        assert_eq!(loaded.status, RequestStatus::Pending);
    }

    #[test]
    fn expire_requests_is_idempotent() {
        let db = db();
        let sender = seed_profile(&db);
        let receiver = seed_profile(&db);
        let mut request = pending_request(&sender, &receiver);
        request.sent_at = Utc::now() - chrono::Duration::days(60);
        db.with_conn_mut(|conn| insert_request(conn, &request)).unwrap();

        let cutoff = Utc::now() - chrono::Duration::days(30);
        assert_eq!(
            db.with_conn_mut(|conn| expire_requests_before(conn, cutoff)).unwrap(),
            1
        );
        assert_eq!(
            db.with_conn_mut(|conn| expire_requests_before(conn, cutoff)).unwrap(),
            0
        );
    }

    #[test]
    fn banned_terms_replace_wholesale() {
        let db = db();
        db.replace_banned_terms(&[
            ("alpha".into(), Severity::Low),
            ("beta".into(), Severity::High),
        ])
        .unwrap();
        db.replace_banned_terms(&[("gamma".into(), Severity::Medium)]).unwrap();

        let terms = db.load_banned_terms().unwrap();
        assert_eq!(terms, vec![("gamma".to_string(), Severity::Medium)]);
    }
}
