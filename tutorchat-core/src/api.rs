//! Confirming REST endpoints.
//!
//! Every optimistic edit is confirmed (or rejected) by one of these calls.
//! Responses share one envelope: `{success, message, data}` — except the
//! question endpoints, which put the payload under `question` instead of
//! `data`; the envelope accepts both spellings.
//!
//! The operations are defined as a trait so the edit paths can be exercised
//! against a scripted fake; [`ApiClient`] is the real implementation.

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::CoreConfig;
use crate::error::CoreError;
use crate::session::Credentials;

/// Response envelope every endpoint returns.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, alias = "question")]
    pub data: Option<T>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub question_id: i64,
    pub content: String,
    pub message_type: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageData {
    pub id: i64,
    pub question_id: i64,
    pub sender_id: i64,
    pub content: String,
    pub message_type: String,
    pub created_at: i64,
    #[serde(default)]
    pub is_read: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionRequest {
    pub content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub image_paths: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionData {
    pub id: i64,
    pub user_id: i64,
    #[serde(default)]
    pub tutor_id: Option<i64>,
    pub content: String,
    #[serde(default)]
    pub image_paths: Vec<String>,
    pub status: String,
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct QuestionIdBody {
    question_id: i64,
}

/// The confirming operations the optimistic edit paths depend on.
pub trait QaApi: Send + Sync {
    fn send_message(
        &self,
        req: &SendMessageRequest,
    ) -> impl Future<Output = Result<MessageData, CoreError>> + Send;

    fn create_question(
        &self,
        req: &CreateQuestionRequest,
    ) -> impl Future<Output = Result<QuestionData, CoreError>> + Send;

    fn accept_question(&self, question_id: i64)
    -> impl Future<Output = Result<(), CoreError>> + Send;

    fn close_question(&self, question_id: i64)
    -> impl Future<Output = Result<(), CoreError>> + Send;

    fn mark_read(&self, question_id: i64) -> impl Future<Output = Result<(), CoreError>> + Send;
}

/// reqwest-backed implementation against the configured base URL.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<dyn Credentials>,
}

impl ApiClient {
    pub fn new(config: &CoreConfig, session: Arc<dyn Credentials>) -> Result<Self, CoreError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(CoreError::from_http)?;
        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    fn bearer(&self) -> Result<String, CoreError> {
        self.session
            .token()
            .map(|t| format!("Bearer {t}"))
            .ok_or(CoreError::NotSignedIn)
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<ApiEnvelope<T>, CoreError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let auth = self.bearer()?;
        let response = self
            .http
            .post(format!("{}{path}", self.base_url))
            .header(reqwest::header::AUTHORIZATION, auth)
            .json(body)
            .send()
            .await
            .map_err(CoreError::from_http)?;

        let status = response.status();
        if !status.is_success() {
            // Pull the server's message out of the error body when there is one.
            let message = response
                .json::<ApiEnvelope<serde_json::Value>>()
                .await
                .ok()
                .and_then(|e| e.message)
                .unwrap_or_else(|| format!("server returned {status}"));
            return Err(CoreError::Rejected(message));
        }

        let envelope: ApiEnvelope<T> = response.json().await.map_err(CoreError::from_http)?;
        if !envelope.success {
            return Err(CoreError::Rejected(
                envelope
                    .message
                    .unwrap_or_else(|| "request failed".to_string()),
            ));
        }
        Ok(envelope)
    }

    async fn post_expect_data<B, T>(&self, path: &str, body: &B) -> Result<T, CoreError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        self.post::<B, T>(path, body)
            .await?
            .data
            .ok_or_else(|| CoreError::Http("response missing payload".to_string()))
    }
}

impl QaApi for ApiClient {
    async fn send_message(&self, req: &SendMessageRequest) -> Result<MessageData, CoreError> {
        self.post_expect_data("/api/messages", req).await
    }

    async fn create_question(&self, req: &CreateQuestionRequest) -> Result<QuestionData, CoreError> {
        self.post_expect_data("/api/questions", req).await
    }

    async fn accept_question(&self, question_id: i64) -> Result<(), CoreError> {
        self.post::<_, serde_json::Value>("/api/questions/accept", &QuestionIdBody { question_id })
            .await
            .map(|_| ())
    }

    async fn close_question(&self, question_id: i64) -> Result<(), CoreError> {
        self.post::<_, serde_json::Value>("/api/questions/close", &QuestionIdBody { question_id })
            .await
            .map(|_| ())
    }

    async fn mark_read(&self, question_id: i64) -> Result<(), CoreError> {
        self.post::<_, serde_json::Value>("/api/messages/mark-read", &QuestionIdBody { question_id })
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_accepts_data_and_question_spellings() {
        let with_data: ApiEnvelope<MessageData> = serde_json::from_str(
            r#"{"success": true, "message": "ok", "data": {
                "id": 1, "questionId": 7, "senderId": 3, "content": "hi",
                "messageType": "text", "createdAt": 1000
            }}"#,
        )
        .unwrap();
        assert!(with_data.success);
        assert_eq!(with_data.data.unwrap().id, 1);

        let with_question: ApiEnvelope<QuestionData> = serde_json::from_str(
            r#"{"success": true, "message": "ok", "question": {
                "id": 7, "userId": 3, "content": "help", "status": "pending",
                "createdAt": 1000
            }}"#,
        )
        .unwrap();
        assert_eq!(with_question.data.unwrap().id, 7);
    }

    #[test]
    fn envelope_tolerates_missing_payload() {
        let e: ApiEnvelope<serde_json::Value> =
            serde_json::from_str(r#"{"success": true, "message": "Question accepted"}"#).unwrap();
        assert!(e.success);
        assert!(e.data.is_none());
    }
}
