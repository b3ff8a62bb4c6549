//! Inbound push dispatch tests.
//!
//! Covers: chat message insertion with defaulted fields and both identity
//! spellings, required-field drops, update-not-replace semantics for
//! question pushes, the legacy accept/close variants, role gating of the
//! pending feed, ACK retirement, and unknown-type tolerance.

use std::sync::Arc;

use serde_json::{Value, json};

use tutorchat_core::dispatch;
use tutorchat_core::manager::ClientEvent;
use tutorchat_core::model::{
    ChatMessage, MessageKind, Question, QuestionStatus, SendStatus, now_millis,
};
use tutorchat_core::outbox::Outbox;
use tutorchat_core::session::Role;
use tutorchat_core::store::Store;
use tutorchat_sdk::wire::Envelope;

fn env(kind: &str, data: Value) -> Envelope {
    Envelope {
        kind: kind.to_string(),
        data,
        timestamp: Some(now_millis().to_string()),
        message_id: None,
    }
}

fn setup() -> (Arc<Store>, Outbox) {
    let store = Arc::new(Store::open_memory().unwrap());
    let outbox = Outbox::new(store.clone(), 3);
    (store, outbox)
}

fn seed_question(store: &Store, id: i64) -> Question {
    let q = Question {
        id,
        user_id: 2,
        tutor_id: None,
        content: "help".to_string(),
        image_paths: Vec::new(),
        status: QuestionStatus::Pending,
        created_at: 1000,
        updated_at: 1000,
    };
    store.insert_question(&q).unwrap();
    q
}

#[test]
fn chat_message_without_created_at_uses_current_time() {
    let (store, outbox) = setup();
    seed_question(&store, 7);
    let before = now_millis();

    let notifications = dispatch::apply(
        &store,
        &outbox,
        Some(Role::Student),
        &env(
            "CHAT_MESSAGE",
            json!({"id": 42, "questionId": 7, "senderId": 3, "content": "hi"}),
        ),
    )
    .unwrap();

    let msg = store.get_message(42).unwrap().unwrap();
    assert_eq!(msg.question_id, 7);
    assert_eq!(msg.sender_id, 3);
    assert_eq!(msg.content, "hi");
    assert_eq!(msg.kind, MessageKind::Text);
    assert!(!msg.read);
    assert!(msg.created_at >= before);
    assert_eq!(notifications, vec![ClientEvent::NewMessage { question_id: 7 }]);
}

#[test]
fn chat_message_accepts_the_alternate_identity_spelling() {
    let (store, outbox) = setup();
    seed_question(&store, 7);

    dispatch::apply(
        &store,
        &outbox,
        Some(Role::Student),
        &env(
            "CHAT_MESSAGE",
            json!({"messageId": 43, "questionId": 7, "senderId": 3, "content": "relayed"}),
        ),
    )
    .unwrap();

    assert!(store.get_message(43).unwrap().is_some());
}

#[test]
fn chat_message_missing_required_fields_is_dropped() {
    let (store, outbox) = setup();
    seed_question(&store, 7);

    // No senderId: the frame is dropped, nothing is stored, no panic.
    let notifications = dispatch::apply(
        &store,
        &outbox,
        Some(Role::Student),
        &env("CHAT_MESSAGE", json!({"id": 42, "questionId": 7, "content": "hi"})),
    )
    .unwrap();

    assert!(notifications.is_empty());
    assert!(store.get_message(42).unwrap().is_none());
    assert!(store.messages_for_question(7).unwrap().is_empty());
}

#[test]
fn redelivered_chat_message_does_not_duplicate() {
    let (store, outbox) = setup();
    seed_question(&store, 7);
    let frame = env(
        "CHAT_MESSAGE",
        json!({"id": 42, "questionId": 7, "senderId": 3, "content": "hi"}),
    );

    dispatch::apply(&store, &outbox, Some(Role::Student), &frame).unwrap();
    dispatch::apply(&store, &outbox, Some(Role::Student), &frame).unwrap();

    assert_eq!(store.messages_for_question(7).unwrap().len(), 1);
}

#[test]
fn question_update_preserves_chat_history() {
    let (store, outbox) = setup();
    seed_question(&store, 7);
    store
        .insert_message(&ChatMessage {
            id: 1,
            question_id: 7,
            sender_id: 2,
            content: "existing".to_string(),
            kind: MessageKind::Text,
            created_at: 1500,
            read: false,
            send_status: SendStatus::Sent,
        })
        .unwrap();

    dispatch::apply(
        &store,
        &outbox,
        Some(Role::Student),
        &env(
            "QUESTION_UPDATED",
            json!({
                "questionId": 7, "userId": 2, "tutorId": 5,
                "content": "help", "status": "in_progress", "updatedAt": 2000
            }),
        ),
    )
    .unwrap();

    let q = store.get_question(7).unwrap().unwrap();
    assert_eq!(q.status, QuestionStatus::InProgress);
    assert_eq!(q.tutor_id, Some(5));
    assert_eq!(q.updated_at, 2000);
    // The update must not have cascaded through the foreign key.
    assert_eq!(store.messages_for_question(7).unwrap().len(), 1);
}

#[test]
fn question_update_for_unknown_question_is_ignored() {
    let (store, outbox) = setup();

    let notifications = dispatch::apply(
        &store,
        &outbox,
        Some(Role::Student),
        &env(
            "QUESTION_UPDATED",
            json!({"questionId": 99, "userId": 2, "content": "x", "status": "closed"}),
        ),
    )
    .unwrap();

    assert!(notifications.is_empty());
    assert!(store.get_question(99).unwrap().is_none());
}

#[test]
fn legacy_accept_mutates_only_transition_fields() {
    let (store, outbox) = setup();
    seed_question(&store, 7);

    dispatch::apply(
        &store,
        &outbox,
        Some(Role::Student),
        &env("QUESTION_ACCEPTED", json!({"questionId": 7, "tutorId": 5})),
    )
    .unwrap();

    let q = store.get_question(7).unwrap().unwrap();
    assert_eq!(q.status, QuestionStatus::InProgress);
    assert_eq!(q.tutor_id, Some(5));
    // Untouched fields survive.
    assert_eq!(q.content, "help");
    assert_eq!(q.created_at, 1000);
}

#[test]
fn legacy_close_keeps_the_assigned_tutor() {
    let (store, outbox) = setup();
    let mut q = seed_question(&store, 7);
    q.status = QuestionStatus::InProgress;
    q.tutor_id = Some(5);
    store.update_question(&q).unwrap();

    dispatch::apply(
        &store,
        &outbox,
        Some(Role::Student),
        &env("QUESTION_CLOSED", json!({"questionId": 7})),
    )
    .unwrap();

    let q = store.get_question(7).unwrap().unwrap();
    assert_eq!(q.status, QuestionStatus::Closed);
    assert_eq!(q.tutor_id, Some(5));
}

#[test]
fn new_question_reaches_tutors_only() {
    let (store, outbox) = setup();
    let frame = env(
        "NEW_QUESTION",
        json!({
            "questionId": 9, "userId": 2, "content": "fresh",
            "status": "pending", "createdAt": 3000
        }),
    );

    dispatch::apply(&store, &outbox, Some(Role::Student), &frame).unwrap();
    assert!(store.get_question(9).unwrap().is_none());

    dispatch::apply(&store, &outbox, Some(Role::Tutor), &frame).unwrap();
    let q = store.get_question(9).unwrap().unwrap();
    assert_eq!(q.status, QuestionStatus::Pending);
    assert_eq!(q.created_at, 3000);
}

#[test]
fn ack_retires_the_matching_outbox_entry() {
    let (store, outbox) = setup();
    let token = outbox.enqueue("CHAT_MESSAGE", json!({"content": "x"})).unwrap();

    let mut ack = env("ACK", Value::Null);
    ack.message_id = Some(token.clone());
    dispatch::apply(&store, &outbox, Some(Role::Student), &ack).unwrap();
    assert!(outbox.pending().unwrap().is_empty());

    // Duplicate and unknown ACKs are no-ops, not errors.
    dispatch::apply(&store, &outbox, Some(Role::Student), &ack).unwrap();
    let mut unknown = env("ACK", Value::Null);
    unknown.message_id = Some("never-issued".to_string());
    dispatch::apply(&store, &outbox, Some(Role::Student), &unknown).unwrap();
}

#[test]
fn unknown_types_are_ignored() {
    let (store, outbox) = setup();

    let notifications = dispatch::apply(
        &store,
        &outbox,
        Some(Role::Student),
        &env("NEW_ANSWER", json!({"anything": true})),
    )
    .unwrap();

    assert!(notifications.is_empty());
}
