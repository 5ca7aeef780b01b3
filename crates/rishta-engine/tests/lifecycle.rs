//! End-to-end lifecycle: policy gate -> request -> acceptance -> room ->
//! moderated messaging, plus the racy paths that must stay single-winner.

use std::sync::Arc;
use std::thread;

use chrono::{Duration, Utc};
use uuid::Uuid;

use rishta_db::Database;
use rishta_engine::{ChatManager, Decision, EngineConfig, ModerationDesk, RequestManager};
use rishta_policy::can_contact;
use rishta_types::RishtaError;
use rishta_types::lifecycle::{MessageStatus, RequestStatus, RoomStatus, Severity};
use rishta_types::profile::{
    AccessRule, Gender, PrivacySettings, Profile, ProfileKind, ViewerContext,
};

fn seed_profile(db: &Database, privacy: Option<PrivacySettings>) -> Profile {
    let profile = Profile {
        id: Uuid::new_v4(),
        display_name: "Member".into(),
        gender: Gender::Female,
        kind: ProfileKind::Standard,
        city: "Riyadh".into(),
        country: "SA".into(),
        verified: true,
        age: Some(29),
        occupation: None,
        photo_url: None,
        extended: None,
        privacy,
    };
    db.upsert_profile(&profile).unwrap();
    profile
}

fn viewer_for(profile: &Profile) -> ViewerContext {
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

#[test]
fn verified_sender_to_accepted_chat_with_held_message() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let requests = RequestManager::new(db.clone(), EngineConfig::default());
    let chat = ChatManager::new(db.clone(), EngineConfig::default());
    let desk = ModerationDesk::new(db.clone());
    let now = Utc::now();

    let receiver = seed_profile(
        &db,
        Some(PrivacySettings {
            allow_contact_requests: Some(AccessRule::VerifiedOnly),
            ..Default::default()
        }),
    );
    let sender = viewer_for(&seed_profile(&db, None));
    db.replace_banned_terms(&[("bank transfer".into(), Severity::High)])
        .unwrap();

    // Policy gate passes for a verified, unmatched sender.
    assert!(can_contact(&receiver, &sender));

    let request = requests
        .create_request(&sender, &receiver, "Salaam, I think we could be a match.", now)
        .unwrap();
    assert_eq!(request.status, RequestStatus::Pending);

    let (request, room) = requests
        .respond(request.id, receiver.id, Decision::Accept, None, now)
        .unwrap();
    assert_eq!(request.status, RequestStatus::Accepted);
    let room = room.unwrap();
    assert_eq!(room.status, RoomStatus::Active);
    assert_eq!(room.expires_at, now + Duration::days(7));

    // A message with a high-severity term is stored but held.
    let message = chat
        .send_message(room.id, sender.id, "let us arrange a bank transfer", now)
        .unwrap();
    assert_eq!(message.status, MessageStatus::Pending);
    assert_eq!(message.severity, Severity::High);

    // Invisible to the receiver until a reviewer releases it.
    assert!(chat.transcript(room.id, receiver.id).unwrap().is_empty());
    desk.approve(message.id, Uuid::new_v4(), now).unwrap();
    assert_eq!(chat.transcript(room.id, receiver.id).unwrap().len(), 1);
}

#[test]
fn concurrent_accepts_yield_one_room() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let requests = Arc::new(RequestManager::new(db.clone(), EngineConfig::default()));
    let now = Utc::now();

    let receiver = seed_profile(&db, None);
    let sender = viewer_for(&seed_profile(&db, None));
    let request = requests
        .create_request(&sender, &receiver, "Salaam, shall we talk?", now)
        .unwrap();

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let requests = requests.clone();
            let receiver_id = receiver.id;
            let request_id = request.id;
            thread::spawn(move || {
                requests.respond(request_id, receiver_id, Decision::Accept, None, Utc::now())
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let wins = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1);
    assert!(results.iter().any(|r| matches!(
        r,
        Err(RishtaError::InvalidTransition | RishtaError::RoomAlreadyExists)
    )));

    // Exactly one room keyed to the request.
    assert!(db.get_room_by_request(request.id).unwrap().is_some());
}

#[test]
fn concurrent_sends_cannot_double_spend_the_limit() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let requests = RequestManager::new(db.clone(), EngineConfig::default());
    let chat = Arc::new(ChatManager::new(db.clone(), EngineConfig::default()));
    let now = Utc::now();

    let receiver = seed_profile(&db, None);
    let sender = viewer_for(&seed_profile(&db, None));
    let request = requests
        .create_request(&sender, &receiver, "Salaam, shall we talk?", now)
        .unwrap();
    let (_, room) = requests
        .respond(request.id, receiver.id, Decision::Accept, None, now)
        .unwrap();
    let room_id = room.unwrap().id;

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let chat = chat.clone();
            let sender_id = sender.id;
            thread::spawn(move || {
                chat.send_message(room_id, sender_id, &format!("attempt number {i}"), Utc::now())
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let delivered = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(delivered, 1, "hourly limit of 1 admits exactly one send");
    assert_eq!(chat.all_messages(room_id).unwrap().len(), 1);
    assert!(
        results
            .iter()
            .all(|r| r.is_ok() || matches!(r, Err(RishtaError::RateLimited { .. })))
    );
}

#[test]
fn request_sweep_and_room_sweep_are_independent() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let requests = RequestManager::new(db.clone(), EngineConfig::default());
    let chat = ChatManager::new(db.clone(), EngineConfig::default());
    let now = Utc::now();

    let receiver = seed_profile(&db, None);
    let ignored_sender = viewer_for(&seed_profile(&db, None));
    let matched_sender = viewer_for(&seed_profile(&db, None));

    // One request goes stale; another is accepted and its room ages out.
    requests
        .create_request(&ignored_sender, &receiver, "Salaam, shall we talk?", now - Duration::days(45))
        .unwrap();
    let accepted = requests
        .create_request(&matched_sender, &receiver, "Salaam, shall we talk?", now - Duration::days(10))
        .unwrap();
    requests
        .respond(
            accepted.id,
            receiver.id,
            Decision::Accept,
            None,
            now - Duration::days(10),
        )
        .unwrap();

    assert_eq!(requests.sweep_expired(now).unwrap(), 1);
    assert_eq!(chat.sweep_expired(now).unwrap(), 1);

    // Accepted requests are untouched by the request sweep.
    assert_eq!(
        db.get_request(accepted.id).unwrap().unwrap().status,
        RequestStatus::Accepted
    );
}
