//! Error taxonomy for the client core.
//!
//! Three buckets matter to callers: transport problems (retried or surfaced
//! as connectivity state), confirmation failures (trigger rollback of the
//! optimistic edit), and exhaustion (retry/attempt ceilings). Everything
//! user-facing goes through [`CoreError::user_message`] so no raw error text
//! reaches the screen untranslated.

use thiserror::Error;

use tutorchat_sdk::SdkError;

#[derive(Debug, Error)]
pub enum CoreError {
    /// No signed-in user; the operation needs credentials.
    #[error("not signed in")]
    NotSignedIn,

    /// The server answered with `success: false`.
    #[error("rejected by server: {0}")]
    Rejected(String),

    /// The confirming request timed out.
    #[error("request timed out")]
    Timeout,

    /// The server could not be reached at all.
    #[error("server unreachable: {0}")]
    Unreachable(String),

    /// Any other HTTP-level failure.
    #[error("http error: {0}")]
    Http(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Connection(#[from] SdkError),

    /// The same edit is already in flight (double-tap debounce).
    #[error("{0} already in progress")]
    Busy(&'static str),

    #[error("question {0} not found")]
    QuestionNotFound(i64),

    #[error("message {0} not found")]
    MessageNotFound(i64),

    /// Retry/discard is only offered for rows whose send failed.
    #[error("message {0} is not in a failed state")]
    NotResendable(i64),

    /// A locally requested status change that the lifecycle forbids.
    #[error("cannot move question from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
}

impl CoreError {
    /// Classify a reqwest failure into the taxonomy.
    pub fn from_http(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            CoreError::Timeout
        } else if e.is_connect() {
            CoreError::Unreachable(e.to_string())
        } else {
            CoreError::Http(e.to_string())
        }
    }

    /// Plain string suitable for direct display.
    pub fn user_message(&self) -> String {
        match self {
            CoreError::NotSignedIn => "Please sign in first.".to_string(),
            CoreError::Rejected(msg) => msg.clone(),
            CoreError::Timeout => "The server took too long to respond. Please try again.".to_string(),
            CoreError::Unreachable(_) => "Cannot reach the server. Check your connection.".to_string(),
            CoreError::Http(_) | CoreError::Storage(_) | CoreError::Encode(_) => {
                "Something went wrong. Please try again.".to_string()
            }
            CoreError::Connection(SdkError::NotConnected) => "You are offline.".to_string(),
            CoreError::Connection(_) => "Connection problem. Reconnecting...".to_string(),
            CoreError::Busy(what) => format!("A {what} is already in progress."),
            CoreError::QuestionNotFound(_) => "This question no longer exists.".to_string(),
            CoreError::MessageNotFound(_) => "This message no longer exists.".to_string(),
            CoreError::NotResendable(_) => "This message cannot be resent.".to_string(),
            CoreError::InvalidTransition { .. } => "This question cannot be changed anymore.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages_never_leak_raw_errors() {
        let e = CoreError::Unreachable("tcp connect error: os error 111".to_string());
        assert!(!e.user_message().contains("os error"));

        let e = CoreError::Http("builder error: relative URL without a base".to_string());
        assert!(!e.user_message().contains("builder"));
    }

    #[test]
    fn rejection_message_passes_through() {
        let e = CoreError::Rejected("Question already accepted".to_string());
        assert_eq!(e.user_message(), "Question already accepted");
    }
}
