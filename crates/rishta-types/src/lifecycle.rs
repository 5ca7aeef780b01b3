use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

// -- Marriage requests --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
    Expired,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Rejected => "rejected",
            RequestStatus::Expired => "expired",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RequestStatus::Pending),
            "accepted" => Some(RequestStatus::Accepted),
            "rejected" => Some(RequestStatus::Rejected),
            "expired" => Some(RequestStatus::Expired),
            _ => None,
        }
    }

    /// Terminal statuses never transition again; only `Pending` does.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}

/// A contact request from one member to another. Created only after the
/// sender clears the receiver's `allow_contact_requests` policy; never
/// deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarriageRequest {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub message: String,
    pub status: RequestStatus,
    pub sent_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
    pub note: Option<String>,
}

// -- Chat rooms --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Active,
    Expired,
    Reported,
    Closed,
}

impl RoomStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomStatus::Active => "active",
            RoomStatus::Expired => "expired",
            RoomStatus::Reported => "reported",
            RoomStatus::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(RoomStatus::Active),
            "expired" => Some(RoomStatus::Expired),
            "reported" => Some(RoomStatus::Reported),
            "closed" => Some(RoomStatus::Closed),
            _ => None,
        }
    }
}

/// A time-boxed channel between the two parties of an accepted request.
/// Exactly one room exists per accepted request; once expired it is never
/// re-opened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRoom {
    pub id: Uuid,
    pub request_id: Uuid,
    pub participant_a: Uuid,
    pub participant_b: Uuid,
    pub status: RoomStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub reported_by: Option<Uuid>,
    pub report_reason: Option<String>,
}

impl ChatRoom {
    pub fn participants(&self) -> [Uuid; 2] {
        [self.participant_a, self.participant_b]
    }

    pub fn is_participant(&self, id: Uuid) -> bool {
        self.participant_a == id || self.participant_b == id
    }
}

// -- Messages --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Held for human review after a banned-term hit.
    Pending,
    Approved,
    Rejected,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Pending => "pending",
            MessageStatus::Approved => "approved",
            MessageStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(MessageStatus::Pending),
            "approved" => Some(MessageStatus::Approved),
            "rejected" => Some(MessageStatus::Rejected),
            _ => None,
        }
    }
}

/// Moderation severity, ordered. A message's severity is the maximum over
/// its matched terms.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::None => "none",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }

    /// Permissive parse for admin-supplied term severities: an unknown
    /// label classifies as `Low` rather than dropping the term.
    pub fn parse(s: &str) -> Self {
        match s {
            "none" => Severity::None,
            "low" => Severity::Low,
            "medium" => Severity::Medium,
            "high" => Severity::High,
            other => {
                warn!("Unknown severity '{}', defaulting to low", other);
                Severity::Low
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub chat_room_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub status: MessageStatus,
    pub flagged_terms: Vec<String>,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_note: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_by_weight() {
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert!(Severity::Low > Severity::None);
        assert_eq!(Severity::parse("weird"), Severity::Low);
    }

    #[test]
    fn statuses_round_trip() {
        assert_eq!(
            RequestStatus::parse(RequestStatus::Accepted.as_str()),
            Some(RequestStatus::Accepted)
        );
        assert_eq!(
            RoomStatus::parse(RoomStatus::Reported.as_str()),
            Some(RoomStatus::Reported)
        );
        assert_eq!(RequestStatus::parse("bogus"), None);
        assert!(RequestStatus::Expired.is_terminal());
        assert!(!RequestStatus::Pending.is_terminal());
    }
}
