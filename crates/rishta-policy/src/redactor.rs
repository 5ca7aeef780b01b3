//! Field-level filtering of a profile for a specific viewer. Every profile
//! must pass through `redact` before it leaves the system (API response,
//! search listing); raw `Profile` values never cross the boundary.

use serde::Serialize;
use uuid::Uuid;

use rishta_types::profile::{AccessRule, Gender, Profile, ProfileKind, ViewerContext};

/// The outward-facing shape of a profile. Everything the owner can hide is
/// optional here, including location, which is mandatory on the underlying
/// record.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub id: Uuid,
    pub display_name: String,
    pub gender: Gender,
    pub kind: ProfileKind,
    pub verified: bool,
    pub age: Option<u32>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub occupation: Option<String>,
    pub photo_url: Option<String>,
    pub bio: Option<String>,
    pub education: Option<String>,
    pub guardian_relationship: Option<String>,
    pub wears_hijab: Option<bool>,
    pub wears_niqab: Option<bool>,
    pub prayer_location: Option<String>,
}

fn tier_allows(rule: Option<AccessRule>, viewer: &ViewerContext) -> bool {
    match rule.unwrap_or_default() {
        AccessRule::Everyone => true,
        AccessRule::VerifiedOnly => viewer.verified,
        AccessRule::PremiumOnly => viewer.premium,
        AccessRule::GuardianApproved => viewer.guardian_approved,
        AccessRule::MatchesOnly => viewer.has_matched,
        AccessRule::Nobody => false,
    }
}

/// Produce the view of `profile` that `viewer` is entitled to. Pure; the
/// input profile is untouched. A profile without privacy settings is shown
/// in full.
pub fn redact(profile: &Profile, viewer: &ViewerContext) -> ProfileView {
    let settings = profile.privacy.clone().unwrap_or_default();

    let mut view = ProfileView {
        id: profile.id,
        display_name: profile.display_name.clone(),
        gender: profile.gender,
        kind: profile.kind,
        verified: profile.verified,
        age: profile.age,
        city: Some(profile.city.clone()),
        country: Some(profile.country.clone()),
        occupation: profile.occupation.clone(),
        photo_url: profile.photo_url.clone(),
        bio: None,
        education: None,
        guardian_relationship: None,
        wears_hijab: None,
        wears_niqab: None,
        prayer_location: None,
    };

    if !settings.show_age {
        view.age = None;
    }
    if !settings.show_location {
        view.city = None;
        view.country = None;
    }
    if !settings.show_occupation {
        view.occupation = None;
    }
    if !tier_allows(settings.show_profile_picture, viewer) {
        view.photo_url = None;
    }

    // Extended fields exist only on guardian-gated profiles and are split
    // across two tiers: basic (bio, education) and detailed (guardian
    // relationship, dress indicators, prayer location).
    if let Some(extended) = &profile.extended {
        if tier_allows(settings.show_basic_info, viewer) {
            view.bio = extended.bio.clone();
            view.education = extended.education.clone();
        }
        if tier_allows(settings.show_detailed_info, viewer) {
            view.guardian_relationship = extended.guardian_relationship.clone();
            view.wears_hijab = extended.wears_hijab;
            view.wears_niqab = extended.wears_niqab;
            view.prayer_location = extended.prayer_location.clone();
        }
    }

    view
}
