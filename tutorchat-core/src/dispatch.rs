//! Inbound push dispatch.
//!
//! One decoded envelope in, store writes plus observer notifications out.
//! Kept as a free function of (store, outbox, role, envelope) so every
//! handler is exercised in tests without a socket. Malformed frames are
//! dropped and logged; nothing here may take the orchestrator down.

use tutorchat_sdk::wire::{self, Envelope, PushEvent};

use crate::error::CoreError;
use crate::manager::ClientEvent;
use crate::model::{
    ChatMessage, MessageKind, Question, QuestionStatus, SendStatus, now_millis,
};
use crate::outbox::Outbox;
use crate::session::Role;
use crate::store::Store;

/// Apply one inbound envelope. Returns the notifications to publish.
pub fn apply(
    store: &Store,
    outbox: &Outbox,
    role: Option<Role>,
    env: &Envelope,
) -> Result<Vec<ClientEvent>, CoreError> {
    let event = match wire::decode(env) {
        Ok(Some(event)) => event,
        Ok(None) => {
            tracing::debug!(kind = %env.kind, "ignoring unhandled push type");
            return Ok(Vec::new());
        }
        Err(e) => {
            tracing::warn!(kind = %env.kind, error = %e, "dropping malformed push");
            return Ok(Vec::new());
        }
    };

    let mut notifications = Vec::new();
    match event {
        PushEvent::Ack { token } => {
            outbox.acknowledge(&token)?;
        }

        PushEvent::ChatMessage(m) => {
            let message = ChatMessage {
                id: m.id,
                question_id: m.question_id,
                sender_id: m.sender_id,
                content: m.content,
                kind: MessageKind::parse(&m.kind).unwrap_or(MessageKind::Text),
                created_at: m.created_at.unwrap_or_else(now_millis),
                read: m.read,
                send_status: SendStatus::Sent,
            };
            store.save_message(&message)?;
            // Separate from the row write so observers can refresh derived
            // aggregates (unread counts) without re-querying everything.
            notifications.push(ClientEvent::NewMessage { question_id: message.question_id });
            tracing::debug!(id = message.id, question_id = message.question_id, "chat message stored");
        }

        PushEvent::QuestionUpdated(q) => {
            let Some(status) = QuestionStatus::parse(&q.status) else {
                tracing::warn!(question_id = q.question_id, status = %q.status, "unknown status, dropping update");
                return Ok(notifications);
            };
            let now = now_millis();
            let question = Question {
                id: q.question_id,
                user_id: q.user_id,
                tutor_id: q.tutor_id,
                content: q.content,
                image_paths: q.image_path.map(|p| vec![p]).unwrap_or_default(),
                status,
                created_at: q.created_at.unwrap_or(now),
                updated_at: q.updated_at.unwrap_or(now),
            };
            // UPDATE, never INSERT OR REPLACE: a REPLACE is delete+insert
            // and the foreign key cascade would wipe the conversation.
            if store.update_question(&question)? == 0 {
                tracing::warn!(question_id = q.question_id, "update for unknown question, ignoring");
            }
        }

        PushEvent::QuestionAccepted { question_id, tutor_id } => {
            apply_transition(store, question_id, QuestionStatus::InProgress, tutor_id)?;
        }

        PushEvent::QuestionClosed { question_id } => {
            apply_transition(store, question_id, QuestionStatus::Closed, None)?;
        }

        PushEvent::NewQuestion(nq) => {
            // Only tutors see the pending feed.
            if role == Some(Role::Tutor) {
                let question = Question {
                    id: nq.question_id,
                    user_id: nq.user_id,
                    tutor_id: None,
                    content: nq.content,
                    image_paths: nq.image_path.map(|p| vec![p]).unwrap_or_default(),
                    status: QuestionStatus::parse(&nq.status).unwrap_or(QuestionStatus::Pending),
                    created_at: nq.created_at,
                    updated_at: nq.created_at,
                };
                store.save_question(&question)?;
                tracing::debug!(question_id = question.id, "new question stored");
            }
        }
    }
    Ok(notifications)
}

/// Legacy single-purpose transition: mutate only the fields the variant
/// carries, leave the rest of the row alone.
fn apply_transition(
    store: &Store,
    question_id: i64,
    status: QuestionStatus,
    tutor_id: Option<i64>,
) -> Result<(), CoreError> {
    let Some(mut question) = store.get_question(question_id)? else {
        tracing::warn!(question_id, "transition for unknown question, ignoring");
        return Ok(());
    };
    question.status = status;
    question.updated_at = now_millis();
    if let Some(tutor) = tutor_id {
        question.tutor_id = Some(tutor);
    }
    store.update_question(&question)?;
    tracing::debug!(question_id, status = status.as_str(), "question transition applied");
    Ok(())
}
