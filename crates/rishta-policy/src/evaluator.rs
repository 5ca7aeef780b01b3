//! Pure policy checks. No side effects, no storage access; safe to call
//! concurrently. A profile with no privacy record passes every check.

use rishta_types::profile::{AccessRule, Profile, ViewerContext};

fn rule_allows(rule: AccessRule, viewer: &ViewerContext) -> bool {
    match rule {
        AccessRule::Everyone => true,
        AccessRule::VerifiedOnly => viewer.verified,
        AccessRule::PremiumOnly => viewer.premium,
        AccessRule::GuardianApproved => viewer.guardian_approved,
        AccessRule::MatchesOnly => viewer.has_matched,
        AccessRule::Nobody => false,
    }
}

/// Absent dimension means `everyone`.
fn dimension_allows(rule: Option<AccessRule>, viewer: &ViewerContext) -> bool {
    rule_allows(rule.unwrap_or_default(), viewer)
}

/// Whether `viewer` may open this profile at all. Two independent gates:
/// `profile_visibility` decides whether the profile is listed,
/// `allow_profile_views` whether this particular viewer may open it. Both
/// must pass.
pub fn can_view(profile: &Profile, viewer: &ViewerContext) -> bool {
    let Some(settings) = &profile.privacy else {
        return true;
    };
    dimension_allows(settings.profile_visibility, viewer)
        && dimension_allows(settings.allow_profile_views, viewer)
}

/// Whether `viewer` may send this profile a marriage request.
pub fn can_contact(profile: &Profile, viewer: &ViewerContext) -> bool {
    let Some(settings) = &profile.privacy else {
        return true;
    };
    dimension_allows(settings.allow_contact_requests, viewer)
}

/// Whether `viewer` may message this profile inside an open chat room.
pub fn can_message(profile: &Profile, viewer: &ViewerContext) -> bool {
    let Some(settings) = &profile.privacy else {
        return true;
    };
    dimension_allows(settings.allow_messages_from, viewer)
}

/// Independent veto for members hiding from their own city. Evaluated after
/// visibility, never before: a hidden-from-locals profile stays visible to a
/// matched out-of-town viewer. Returns false only when `hide_from_local_users`
/// is set and the viewer is in the same city.
pub fn check_geographic_privacy(profile: &Profile, viewer: &ViewerContext) -> bool {
    let Some(settings) = &profile.privacy else {
        return true;
    };
    !(settings.hide_from_local_users && viewer.city == profile.city)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rishta_types::profile::{Gender, PrivacySettings, ProfileKind};
    use uuid::Uuid;

    fn profile(privacy: Option<PrivacySettings>) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            display_name: "Amina".into(),
            gender: Gender::Female,
            kind: ProfileKind::Standard,
            city: "Amman".into(),
            country: "JO".into(),
            verified: true,
            age: Some(27),
            occupation: Some("Pharmacist".into()),
            photo_url: None,
            extended: None,
            privacy,
        }
    }

    fn viewer() -> ViewerContext {
        ViewerContext {
            id: Uuid::new_v4(),
            gender: Gender::Male,
            verified: false,
            premium: false,
            guardian_approved: false,
            has_matched: false,
            city: "Irbid".into(),
            country: "JO".into(),
        }
    }

    #[test]
    fn no_settings_allows_everything() {
        let p = profile(None);
        let v = viewer();
        assert!(can_view(&p, &v));
        assert!(can_contact(&p, &v));
        assert!(can_message(&p, &v));
        assert!(check_geographic_privacy(&p, &v));
    }

    #[test]
    fn empty_settings_behave_like_no_settings() {
        let p = profile(Some(PrivacySettings::default()));
        let v = viewer();
        assert!(can_view(&p, &v));
        assert!(can_contact(&p, &v));
    }

    #[test]
    fn can_view_requires_both_gates() {
        let p = profile(Some(PrivacySettings {
            profile_visibility: Some(AccessRule::Everyone),
            allow_profile_views: Some(AccessRule::PremiumOnly),
            ..Default::default()
        }));
        let mut v = viewer();
        assert!(!can_view(&p, &v));
        v.premium = true;
        assert!(can_view(&p, &v));
    }

    #[test]
    fn tiers_check_single_attributes() {
        let mut v = viewer();
        v.verified = true;

        let p = profile(Some(PrivacySettings {
            allow_contact_requests: Some(AccessRule::VerifiedOnly),
            ..Default::default()
        }));
        assert!(can_contact(&p, &v));

        // Verified does not imply guardian-approved.
        let p = profile(Some(PrivacySettings {
            allow_contact_requests: Some(AccessRule::GuardianApproved),
            ..Default::default()
        }));
        assert!(!can_contact(&p, &v));
        v.guardian_approved = true;
        assert!(can_contact(&p, &v));
    }

    #[test]
    fn nobody_denies_every_viewer() {
        let p = profile(Some(PrivacySettings {
            allow_messages_from: Some(AccessRule::Nobody),
            ..Default::default()
        }));
        let mut v = viewer();
        v.verified = true;
        v.premium = true;
        v.guardian_approved = true;
        v.has_matched = true;
        assert!(!can_message(&p, &v));
    }

    #[test]
    fn geographic_privacy_only_vetoes_same_city() {
        let p = profile(Some(PrivacySettings {
            hide_from_local_users: true,
            ..Default::default()
        }));
        let mut v = viewer();
        assert!(check_geographic_privacy(&p, &v));
        v.city = "Amman".into();
        assert!(!check_geographic_privacy(&p, &v));
    }

    #[test]
    fn geographic_privacy_is_independent_of_visibility() {
        // Hidden from locals but visible: the veto does not touch can_view.
        let p = profile(Some(PrivacySettings {
            hide_from_local_users: true,
            ..Default::default()
        }));
        let mut v = viewer();
        v.city = "Amman".into();
        v.has_matched = true;
        assert!(can_view(&p, &v));
        assert!(!check_geographic_privacy(&p, &v));
    }
}
