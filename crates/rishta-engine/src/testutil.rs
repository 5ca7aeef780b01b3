use std::sync::Arc;

use uuid::Uuid;

use rishta_db::Database;
use rishta_types::profile::{Gender, PrivacySettings, Profile, ProfileKind, ViewerContext};

pub(crate) fn test_db() -> Arc<Database> {
    Arc::new(Database::open_in_memory().unwrap())
}

pub(crate) fn seed_profile(db: &Arc<Database>, privacy: Option<PrivacySettings>) -> Profile {
    let profile = Profile {
        id: Uuid::new_v4(),
        display_name: "Member".into(),
        gender: Gender::Female,
        kind: ProfileKind::Standard,
        city: "Amman".into(),
        country: "JO".into(),
        verified: false,
        age: Some(28),
        occupation: None,
        photo_url: None,
        extended: None,
        privacy,
    };
    db.upsert_profile(&profile).unwrap();
    profile
}

pub(crate) fn viewer_for(profile: &Profile) -> ViewerContext {
    ViewerContext {
        id: profile.id,
        gender: profile.gender,
        verified: profile.verified,
        premium: false,
        guardian_approved: false,
        has_matched: false,
        city: profile.city.clone(),
        country: profile.country.clone(),
    }
}
