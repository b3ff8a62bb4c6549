//! Domain entities mirrored in the local store.
//!
//! Identities are server-assigned non-negative integers. Rows created
//! optimistically, before the server has confirmed them, carry ids from a
//! process-local negative counter so the two ranges can never collide.

use serde::{Deserialize, Serialize};

/// Current epoch time in milliseconds (the wire's timestamp unit).
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Lifecycle of a question. Transitions are monotonic:
/// pending → in_progress → closed, never backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionStatus {
    Pending,
    InProgress,
    Closed,
}

impl QuestionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionStatus::Pending => "pending",
            QuestionStatus::InProgress => "in_progress",
            QuestionStatus::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(QuestionStatus::Pending),
            "in_progress" => Some(QuestionStatus::InProgress),
            "closed" => Some(QuestionStatus::Closed),
            _ => None,
        }
    }

    /// Whether `next` is the direct successor in the lifecycle.
    pub fn can_transition_to(self, next: QuestionStatus) -> bool {
        matches!(
            (self, next),
            (QuestionStatus::Pending, QuestionStatus::InProgress)
                | (QuestionStatus::InProgress, QuestionStatus::Closed)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    Image,
}

impl MessageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Image => "image",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(MessageKind::Text),
            "image" => Some(MessageKind::Image),
            _ => None,
        }
    }
}

/// Delivery state of a locally sent message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendStatus {
    /// Placeholder inserted, confirmation outstanding.
    Pending,
    Sent,
    /// Confirmation failed; the row is kept so the user can retry or discard.
    Failed,
}

impl SendStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SendStatus::Pending => "pending",
            SendStatus::Sent => "sent",
            SendStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(SendStatus::Pending),
            "sent" => Some(SendStatus::Sent),
            "failed" => Some(SendStatus::Failed),
            _ => None,
        }
    }
}

/// A question row. `tutor_id` is set exactly once, at the
/// pending→in_progress transition, and never cleared afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub id: i64,
    pub user_id: i64,
    pub tutor_id: Option<i64>,
    pub content: String,
    /// Attached image references; stored as a JSON array column.
    pub image_paths: Vec<String>,
    pub status: QuestionStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A chat message row belonging to one question's conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub id: i64,
    pub question_id: i64,
    pub sender_id: i64,
    pub content: String,
    pub kind: MessageKind,
    pub created_at: i64,
    pub read: bool,
    pub send_status: SendStatus,
}

/// One entry in the durable outbound queue.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingOutbound {
    pub id: i64,
    /// Envelope type tag this payload carries.
    pub kind: String,
    /// Serialized envelope, replayed verbatim on drain.
    pub payload: String,
    /// Client-generated idempotency token; the server's ACK echoes it.
    pub token: String,
    pub retry_count: u32,
    pub enqueued_at: i64,
}
