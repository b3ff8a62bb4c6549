//! Push-message wire protocol.
//!
//! Every frame on the socket, in either direction, is one JSON envelope:
//!
//! ```json
//! {"type": "CHAT_MESSAGE", "data": {...}, "timestamp": "1700000000000", "messageId": "42"}
//! ```
//!
//! Inbound envelopes are decoded exactly once, here, into the closed
//! [`PushEvent`] enum so downstream handlers match exhaustively instead of
//! comparing type strings. Unknown types decode to `Ok(None)` (ignored, not
//! an error); a recognized type with a missing required field is a
//! [`DecodeError`] and the frame is dropped by the caller.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// One frame on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Message type tag (`ACK`, `CHAT_MESSAGE`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Type-specific payload.
    #[serde(default)]
    pub data: Value,
    /// Sender-side epoch-millis, as a string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Idempotency token on outbound frames; echo target for ACKs.
    #[serde(rename = "messageId", default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

impl Envelope {
    /// Build an outbound envelope stamped with the current time and `token`.
    pub fn outbound(kind: &str, data: Value, token: String) -> Self {
        Self {
            kind: kind.to_string(),
            data,
            timestamp: Some(chrono::Utc::now().timestamp_millis().to_string()),
            message_id: Some(token),
        }
    }
}

/// A chat message pushed by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessagePush {
    pub id: i64,
    pub question_id: i64,
    pub sender_id: i64,
    pub content: String,
    /// `text` or `image`; the store layer parses it.
    pub kind: String,
    /// Absent on some server paths; the receiver fills in the current time.
    pub created_at: Option<i64>,
    pub read: bool,
}

/// Full state of a question, pushed on any server-side change.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionUpdatePush {
    pub question_id: i64,
    pub user_id: i64,
    pub tutor_id: Option<i64>,
    pub content: String,
    pub image_path: Option<String>,
    pub status: String,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
}

/// A freshly published question (tutor-side push).
#[derive(Debug, Clone, PartialEq)]
pub struct NewQuestionPush {
    pub question_id: i64,
    pub user_id: i64,
    pub content: String,
    pub image_path: Option<String>,
    pub status: String,
    pub created_at: i64,
}

/// Every push the client understands.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    /// Server acknowledgment of an outbound frame, by token.
    Ack { token: String },
    ChatMessage(ChatMessagePush),
    QuestionUpdated(QuestionUpdatePush),
    /// Legacy single-purpose variant of `QuestionUpdated`.
    QuestionAccepted {
        question_id: i64,
        tutor_id: Option<i64>,
    },
    /// Legacy single-purpose variant of `QuestionUpdated`.
    QuestionClosed { question_id: i64 },
    NewQuestion(NewQuestionPush),
}

/// A recognized envelope failed to decode. The frame is dropped and logged;
/// later frames are unaffected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("missing or null `{0}` field")]
    Missing(&'static str),
    #[error("field `{0}` has the wrong type")]
    WrongType(&'static str),
}

fn req_i64(data: &Value, field: &'static str) -> Result<i64, DecodeError> {
    match data.get(field) {
        None | Some(Value::Null) => Err(DecodeError::Missing(field)),
        Some(v) => v.as_i64().ok_or(DecodeError::WrongType(field)),
    }
}

fn req_str(data: &Value, field: &'static str) -> Result<String, DecodeError> {
    match data.get(field) {
        None | Some(Value::Null) => Err(DecodeError::Missing(field)),
        Some(v) => v
            .as_str()
            .map(|s| s.to_string())
            .ok_or(DecodeError::WrongType(field)),
    }
}

fn opt_i64(data: &Value, field: &str) -> Option<i64> {
    data.get(field).and_then(Value::as_i64)
}

fn opt_str(data: &Value, field: &str) -> Option<String> {
    data.get(field)
        .and_then(Value::as_str)
        .map(|s| s.to_string())
}

fn opt_bool(data: &Value, field: &str) -> Option<bool> {
    data.get(field).and_then(Value::as_bool)
}

/// Decode one inbound envelope. `Ok(None)` means the type is not one the
/// client handles.
pub fn decode(env: &Envelope) -> Result<Option<PushEvent>, DecodeError> {
    let data = &env.data;
    let event = match env.kind.as_str() {
        "ACK" => {
            let token = env
                .message_id
                .clone()
                .ok_or(DecodeError::Missing("messageId"))?;
            PushEvent::Ack { token }
        }
        "CHAT_MESSAGE" => {
            // The backend sends the identity as `id`; client-relayed frames
            // use `messageId`. Both are accepted, `id` wins.
            let id = match req_i64(data, "id") {
                Ok(id) => id,
                Err(DecodeError::Missing(_)) => req_i64(data, "messageId")
                    .map_err(|_| DecodeError::Missing("id/messageId"))?,
                Err(e) => return Err(e),
            };
            PushEvent::ChatMessage(ChatMessagePush {
                id,
                question_id: req_i64(data, "questionId")?,
                sender_id: req_i64(data, "senderId")?,
                content: req_str(data, "content")?,
                kind: opt_str(data, "messageType").unwrap_or_else(|| "text".to_string()),
                created_at: opt_i64(data, "createdAt"),
                read: opt_bool(data, "isRead").unwrap_or(false),
            })
        }
        "QUESTION_UPDATED" => PushEvent::QuestionUpdated(QuestionUpdatePush {
            question_id: req_i64(data, "questionId")?,
            user_id: req_i64(data, "userId")?,
            tutor_id: opt_i64(data, "tutorId"),
            content: req_str(data, "content")?,
            image_path: opt_str(data, "imagePath"),
            status: req_str(data, "status")?,
            created_at: opt_i64(data, "createdAt"),
            updated_at: opt_i64(data, "updatedAt"),
        }),
        "QUESTION_ACCEPTED" => PushEvent::QuestionAccepted {
            question_id: req_i64(data, "questionId")?,
            tutor_id: opt_i64(data, "tutorId"),
        },
        "QUESTION_CLOSED" => PushEvent::QuestionClosed {
            question_id: req_i64(data, "questionId")?,
        },
        "NEW_QUESTION" => PushEvent::NewQuestion(NewQuestionPush {
            question_id: req_i64(data, "questionId")?,
            user_id: req_i64(data, "userId")?,
            content: req_str(data, "content")?,
            image_path: opt_str(data, "imagePath"),
            status: req_str(data, "status")?,
            created_at: req_i64(data, "createdAt")?,
        }),
        _ => return Ok(None),
    };
    Ok(Some(event))
}
