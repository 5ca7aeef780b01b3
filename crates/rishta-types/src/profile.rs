use serde::{Deserialize, Serialize, Serializer};
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            _ => None,
        }
    }
}

/// Profile capability tag. `GuardianGated` profiles carry the extended info
/// block and the `show_basic_info`/`show_detailed_info` visibility tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProfileKind {
    Standard,
    GuardianGated,
}

impl ProfileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileKind::Standard => "standard",
            ProfileKind::GuardianGated => "guardian-gated",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "standard" => Some(ProfileKind::Standard),
            "guardian-gated" => Some(ProfileKind::GuardianGated),
            _ => None,
        }
    }
}

/// A single policy dimension value. Tiers are flat attribute checks against
/// the viewer context, not a hierarchy: `premium-only` does not imply
/// `verified-only`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessRule {
    #[default]
    Everyone,
    VerifiedOnly,
    PremiumOnly,
    GuardianApproved,
    MatchesOnly,
    /// Denies every viewer. Used by the contact/message dimensions and the
    /// profile-picture tier.
    Nobody,
}

impl AccessRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessRule::Everyone => "everyone",
            AccessRule::VerifiedOnly => "verified-only",
            AccessRule::PremiumOnly => "premium-only",
            AccessRule::GuardianApproved => "guardian-approved",
            AccessRule::MatchesOnly => "matches-only",
            AccessRule::Nobody => "none",
        }
    }

    /// Permissive parse: an unrecognized rule string falls back to
    /// `Everyone`. Stored settings written by an older or newer schema must
    /// not lock a profile, so the unknown case allows and logs.
    pub fn parse(s: &str) -> Self {
        match s {
            "everyone" => AccessRule::Everyone,
            "verified-only" => AccessRule::VerifiedOnly,
            "premium-only" => AccessRule::PremiumOnly,
            "guardian-approved" => AccessRule::GuardianApproved,
            "matches-only" => AccessRule::MatchesOnly,
            "none" => AccessRule::Nobody,
            other => {
                warn!("Unknown access rule '{}', defaulting to everyone", other);
                AccessRule::Everyone
            }
        }
    }
}

impl Serialize for AccessRule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AccessRule {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(AccessRule::parse(&s))
    }
}

/// Per-profile privacy configuration. Every dimension is optional; an absent
/// dimension means `everyone`/allow, so a freshly created empty record
/// behaves identically to no record at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivacySettings {
    pub profile_visibility: Option<AccessRule>,
    pub allow_profile_views: Option<AccessRule>,
    pub allow_contact_requests: Option<AccessRule>,
    pub allow_messages_from: Option<AccessRule>,

    pub show_age: bool,
    pub show_location: bool,
    pub show_occupation: bool,
    pub show_profile_picture: Option<AccessRule>,

    // Guardian-gated profiles only; ignored on standard profiles.
    pub show_basic_info: Option<AccessRule>,
    pub show_detailed_info: Option<AccessRule>,

    pub hide_from_local_users: bool,
}

impl Default for PrivacySettings {
    fn default() -> Self {
        Self {
            profile_visibility: None,
            allow_profile_views: None,
            allow_contact_requests: None,
            allow_messages_from: None,
            show_age: true,
            show_location: true,
            show_occupation: true,
            show_profile_picture: None,
            show_basic_info: None,
            show_detailed_info: None,
            hide_from_local_users: false,
        }
    }
}

/// Extended fields carried by guardian-gated profiles. All optional; the
/// redactor nulls them wholesale when the viewer fails the tier checks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtendedInfo {
    pub bio: Option<String>,
    pub education: Option<String>,
    pub guardian_relationship: Option<String>,
    pub wears_hijab: Option<bool>,
    pub wears_niqab: Option<bool>,
    pub prayer_location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub display_name: String,
    pub gender: Gender,
    pub kind: ProfileKind,
    pub city: String,
    pub country: String,
    pub verified: bool,
    pub age: Option<u32>,
    pub occupation: Option<String>,
    pub photo_url: Option<String>,
    pub extended: Option<ExtendedInfo>,
    pub privacy: Option<PrivacySettings>,
}

/// The acting identity a policy decision is evaluated against. Built per
/// call from the authenticated session plus the match state with the profile
/// under evaluation; never persisted.
#[derive(Debug, Clone)]
pub struct ViewerContext {
    pub id: Uuid,
    pub gender: Gender,
    pub verified: bool,
    pub premium: bool,
    pub guardian_approved: bool,
    /// True iff this viewer has an accepted match with the profile being
    /// evaluated.
    pub has_matched: bool,
    pub city: String,
    pub country: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_rule_round_trips() {
        for rule in [
            AccessRule::Everyone,
            AccessRule::VerifiedOnly,
            AccessRule::PremiumOnly,
            AccessRule::GuardianApproved,
            AccessRule::MatchesOnly,
            AccessRule::Nobody,
        ] {
            assert_eq!(AccessRule::parse(rule.as_str()), rule);
        }
    }

    #[test]
    fn unknown_rule_defaults_to_everyone() {
        assert_eq!(AccessRule::parse("platinum-only"), AccessRule::Everyone);
    }

    #[test]
    fn privacy_settings_deserialize_with_missing_fields() {
        let settings: PrivacySettings =
            serde_json::from_str(r#"{"allow_contact_requests":"verified-only"}"#).unwrap();
        assert_eq!(
            settings.allow_contact_requests,
            Some(AccessRule::VerifiedOnly)
        );
        assert!(settings.profile_visibility.is_none());
        assert!(settings.show_age);
        assert!(!settings.hide_from_local_users);
    }
}
