//! Database row types — these map directly to SQLite rows and convert into
//! the rishta-types domain structs. Kept separate so the schema can drift
//! without touching the domain model.

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use rishta_types::lifecycle::{
    ChatRoom, MarriageRequest, Message, MessageStatus, RequestStatus, RoomStatus, Severity,
};
use rishta_types::profile::{
    ExtendedInfo, Gender, PrivacySettings, Profile, ProfileKind,
};

pub struct ProfileRow {
    pub id: String,
    pub display_name: String,
    pub gender: String,
    pub kind: String,
    pub city: String,
    pub country: String,
    pub verified: bool,
    pub age: Option<u32>,
    pub occupation: Option<String>,
    pub photo_url: Option<String>,
    pub extended: Option<String>,
    pub privacy: Option<String>,
}

pub struct RequestRow {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub message: String,
    pub status: String,
    pub sent_at: String,
    pub responded_at: Option<String>,
    pub note: Option<String>,
}

pub struct RoomRow {
    pub id: String,
    pub request_id: String,
    pub participant_a: String,
    pub participant_b: String,
    pub status: String,
    pub created_at: String,
    pub expires_at: String,
    pub reported_by: Option<String>,
    pub report_reason: Option<String>,
}

pub struct MessageRow {
    pub id: String,
    pub chat_room_id: String,
    pub sender_id: String,
    pub content: String,
    pub status: String,
    pub flagged_terms: String,
    pub severity: String,
    pub created_at: String,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<String>,
    pub review_note: Option<String>,
}

pub(crate) fn parse_uuid(s: &str, field: &str) -> Result<Uuid> {
    s.parse::<Uuid>()
        .with_context(|| format!("Corrupt {} '{}'", field, s))
}

pub(crate) fn parse_time(s: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .with_context(|| format!("Corrupt {} '{}'", field, s))
}

fn parse_opt_time(s: &Option<String>, field: &str) -> Result<Option<DateTime<Utc>>> {
    s.as_deref().map(|v| parse_time(v, field)).transpose()
}

impl ProfileRow {
    pub fn into_domain(self) -> Result<Profile> {
        let gender = Gender::parse(&self.gender)
            .ok_or_else(|| anyhow!("Corrupt gender '{}'", self.gender))?;
        let kind = ProfileKind::parse(&self.kind)
            .ok_or_else(|| anyhow!("Corrupt profile kind '{}'", self.kind))?;
        let extended: Option<ExtendedInfo> = self
            .extended
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .context("Corrupt extended info JSON")?;
        let privacy: Option<PrivacySettings> = self
            .privacy
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .context("Corrupt privacy settings JSON")?;

        Ok(Profile {
            id: parse_uuid(&self.id, "profile id")?,
            display_name: self.display_name,
            gender,
            kind,
            city: self.city,
            country: self.country,
            verified: self.verified,
            age: self.age,
            occupation: self.occupation,
            photo_url: self.photo_url,
            extended,
            privacy,
        })
    }
}

impl RequestRow {
    pub fn into_domain(self) -> Result<MarriageRequest> {
        let status = RequestStatus::parse(&self.status)
            .ok_or_else(|| anyhow!("Corrupt request status '{}'", self.status))?;
        Ok(MarriageRequest {
            id: parse_uuid(&self.id, "request id")?,
            sender_id: parse_uuid(&self.sender_id, "sender_id")?,
            receiver_id: parse_uuid(&self.receiver_id, "receiver_id")?,
            message: self.message,
            status,
            sent_at: parse_time(&self.sent_at, "sent_at")?,
            responded_at: parse_opt_time(&self.responded_at, "responded_at")?,
            note: self.note,
        })
    }
}

impl RoomRow {
    pub fn into_domain(self) -> Result<ChatRoom> {
        let status = RoomStatus::parse(&self.status)
            .ok_or_else(|| anyhow!("Corrupt room status '{}'", self.status))?;
        Ok(ChatRoom {
            id: parse_uuid(&self.id, "room id")?,
            request_id: parse_uuid(&self.request_id, "request_id")?,
            participant_a: parse_uuid(&self.participant_a, "participant_a")?,
            participant_b: parse_uuid(&self.participant_b, "participant_b")?,
            status,
            created_at: parse_time(&self.created_at, "created_at")?,
            expires_at: parse_time(&self.expires_at, "expires_at")?,
            reported_by: self
                .reported_by
                .as_deref()
                .map(|v| parse_uuid(v, "reported_by"))
                .transpose()?,
            report_reason: self.report_reason,
        })
    }
}

impl MessageRow {
    pub fn into_domain(self) -> Result<Message> {
        let status = MessageStatus::parse(&self.status)
            .ok_or_else(|| anyhow!("Corrupt message status '{}'", self.status))?;
        let flagged_terms: Vec<String> =
            serde_json::from_str(&self.flagged_terms).context("Corrupt flagged_terms JSON")?;
        Ok(Message {
            id: parse_uuid(&self.id, "message id")?,
            chat_room_id: parse_uuid(&self.chat_room_id, "chat_room_id")?,
            sender_id: parse_uuid(&self.sender_id, "sender_id")?,
            content: self.content,
            status,
            flagged_terms,
            severity: Severity::parse(&self.severity),
            created_at: parse_time(&self.created_at, "created_at")?,
            reviewed_by: self
                .reviewed_by
                .as_deref()
                .map(|v| parse_uuid(v, "reviewed_by"))
                .transpose()?,
            reviewed_at: parse_opt_time(&self.reviewed_at, "reviewed_at")?,
            review_note: self.review_note,
        })
    }
}
