//! Optimistic edit paths.
//!
//! Every operation here follows the same shape: apply the mutation to the
//! local store immediately, issue the confirming REST call, then either
//! commit the authoritative state or restore the pre-edit snapshot. Nothing
//! is ever left half-applied.
//!
//! Two guards keep concurrent edits sane:
//!
//! - an in-flight map keyed by (edit kind, entity id) — the double-tap
//!   debounce; a duplicate edit bounces with [`CoreError::Busy`] instead of
//!   issuing a second network call;
//! - a per-entity async mutex registry — every placeholder
//!   insert/delete/commit for one conversation runs inside one critical
//!   section, so two interleaved sends cannot produce duplicate or orphaned
//!   rows. Edits to different conversations do not serialize against each
//!   other.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use dashmap::DashMap;
use tokio::sync::Mutex as AsyncMutex;

use crate::api::{CreateQuestionRequest, QaApi, SendMessageRequest};
use crate::error::CoreError;
use crate::model::{
    ChatMessage, MessageKind, Question, QuestionStatus, SendStatus, now_millis,
};
use crate::session::Credentials;
use crate::store::Store;

/// Edits carrying an in-flight debounce guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditKind {
    SendMessage,
    AcceptQuestion,
    CloseQuestion,
    CreateQuestion,
}

/// Releases the in-flight slot when the edit finishes, on every path.
struct FlightGuard<'a> {
    map: &'a DashMap<(EditKind, i64), ()>,
    key: (EditKind, i64),
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.map.remove(&self.key);
    }
}

pub struct ChatService<A> {
    api: A,
    store: Arc<Store>,
    session: Arc<dyn Credentials>,
    /// Placeholder id counter. Negative and decreasing, so placeholder ids
    /// can never collide with server-assigned (non-negative) ids.
    temp_ids: AtomicI64,
    in_flight: DashMap<(EditKind, i64), ()>,
    row_locks: DashMap<i64, Arc<AsyncMutex<()>>>,
}

impl<A: QaApi> ChatService<A> {
    pub fn new(api: A, store: Arc<Store>, session: Arc<dyn Credentials>) -> Self {
        Self {
            api,
            store,
            session,
            temp_ids: AtomicI64::new(-now_millis()),
            in_flight: DashMap::new(),
            row_locks: DashMap::new(),
        }
    }

    fn next_temp_id(&self) -> i64 {
        self.temp_ids.fetch_sub(1, Ordering::Relaxed)
    }

    fn begin(
        &self,
        kind: EditKind,
        id: i64,
        what: &'static str,
    ) -> Result<FlightGuard<'_>, CoreError> {
        use dashmap::mapref::entry::Entry;
        match self.in_flight.entry((kind, id)) {
            Entry::Occupied(_) => Err(CoreError::Busy(what)),
            Entry::Vacant(slot) => {
                slot.insert(());
                Ok(FlightGuard { map: &self.in_flight, key: (kind, id) })
            }
        }
    }

    fn row_lock(&self, id: i64) -> Arc<AsyncMutex<()>> {
        self.row_locks
            .entry(id)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    fn user_id(&self) -> Result<i64, CoreError> {
        self.session.user_id().ok_or(CoreError::NotSignedIn)
    }

    // ── Message send ───────────────────────────────────────────────────

    /// Send a chat message.
    ///
    /// The conversation shows the message immediately (placeholder row,
    /// `pending`). On confirmation the placeholder is atomically replaced by
    /// the server's row; on failure it flips to `failed` in place so the
    /// user can retry or discard it. Returns the server-assigned message id.
    pub async fn send_message(
        &self,
        question_id: i64,
        content: String,
        kind: MessageKind,
    ) -> Result<i64, CoreError> {
        let sender_id = self.user_id()?;
        let _flight = self.begin(EditKind::SendMessage, question_id, "message send")?;

        let temp_id = self.next_temp_id();
        {
            let lock = self.row_lock(question_id);
            let _guard = lock.lock().await;
            self.store.insert_message(&ChatMessage {
                id: temp_id,
                question_id,
                sender_id,
                content: content.clone(),
                kind,
                created_at: now_millis(),
                read: true, // own messages are born read
                send_status: SendStatus::Pending,
            })?;
        }
        tracing::debug!(question_id, temp_id, "placeholder message inserted");

        self.confirm_send(question_id, temp_id, content, kind).await
    }

    /// Re-run a failed send, reusing the placeholder row and its content.
    pub async fn resend_failed(&self, message_id: i64) -> Result<i64, CoreError> {
        let message = self
            .store
            .get_message(message_id)?
            .ok_or(CoreError::MessageNotFound(message_id))?;
        if message.send_status != SendStatus::Failed {
            return Err(CoreError::NotResendable(message_id));
        }
        let _flight = self.begin(EditKind::SendMessage, message.question_id, "message send")?;

        {
            let lock = self.row_lock(message.question_id);
            let _guard = lock.lock().await;
            self.store
                .update_send_status(message.id, message.question_id, SendStatus::Pending)?;
        }
        self.confirm_send(message.question_id, message.id, message.content, message.kind)
            .await
    }

    /// Delete a failed placeholder the user chose not to retry.
    pub async fn discard_failed(&self, message_id: i64) -> Result<(), CoreError> {
        let message = self
            .store
            .get_message(message_id)?
            .ok_or(CoreError::MessageNotFound(message_id))?;
        if message.send_status != SendStatus::Failed {
            return Err(CoreError::NotResendable(message_id));
        }
        let lock = self.row_lock(message.question_id);
        let _guard = lock.lock().await;
        self.store.delete_message(message.id, message.question_id)?;
        Ok(())
    }

    async fn confirm_send(
        &self,
        question_id: i64,
        temp_id: i64,
        content: String,
        kind: MessageKind,
    ) -> Result<i64, CoreError> {
        let request = SendMessageRequest {
            question_id,
            content,
            message_type: kind.as_str().to_string(),
        };
        let lock = self.row_lock(question_id);

        match self.api.send_message(&request).await {
            Ok(data) => {
                let confirmed = ChatMessage {
                    id: data.id,
                    question_id: data.question_id,
                    sender_id: data.sender_id,
                    content: data.content,
                    kind: MessageKind::parse(&data.message_type).unwrap_or(kind),
                    created_at: data.created_at,
                    read: true,
                    send_status: SendStatus::Sent,
                };
                let _guard = lock.lock().await;
                self.store.replace_placeholder(temp_id, &confirmed)?;
                tracing::debug!(question_id, temp_id, real_id = data.id, "message confirmed");
                Ok(data.id)
            }
            Err(e) => {
                let _guard = lock.lock().await;
                self.store
                    .update_send_status(temp_id, question_id, SendStatus::Failed)?;
                tracing::warn!(question_id, temp_id, error = %e, "message send failed");
                Err(e)
            }
        }
    }

    // ── Question lifecycle ─────────────────────────────────────────────

    /// Accept a pending question as the signed-in tutor.
    ///
    /// The local row flips to in_progress immediately. Any confirmation
    /// failure writes the pre-edit (status, tutor) snapshot back verbatim.
    /// On success no further local write happens — the optimistic state
    /// already matches the confirmed state.
    pub async fn accept_question(&self, question_id: i64) -> Result<(), CoreError> {
        let tutor_id = self.user_id()?;
        let _flight = self.begin(EditKind::AcceptQuestion, question_id, "question accept")?;
        let lock = self.row_lock(question_id);

        let snapshot = {
            let _guard = lock.lock().await;
            let mut question = self
                .store
                .get_question(question_id)?
                .ok_or(CoreError::QuestionNotFound(question_id))?;
            if !question.status.can_transition_to(QuestionStatus::InProgress) {
                return Err(CoreError::InvalidTransition {
                    from: question.status.as_str(),
                    to: QuestionStatus::InProgress.as_str(),
                });
            }
            let snapshot = (question.status, question.tutor_id);
            question.status = QuestionStatus::InProgress;
            question.tutor_id = Some(tutor_id);
            question.updated_at = now_millis();
            self.store.update_question(&question)?;
            snapshot
        };
        tracing::debug!(question_id, tutor_id, "question accepted locally");

        match self.api.accept_question(question_id).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.rollback(question_id, snapshot).await?;
                tracing::warn!(question_id, error = %e, "accept rejected, rolled back");
                Err(e)
            }
        }
    }

    /// Close an in-progress question. Same commit/rollback contract as
    /// [`Self::accept_question`].
    pub async fn close_question(&self, question_id: i64) -> Result<(), CoreError> {
        self.user_id()?;
        let _flight = self.begin(EditKind::CloseQuestion, question_id, "question close")?;
        let lock = self.row_lock(question_id);

        let snapshot = {
            let _guard = lock.lock().await;
            let mut question = self
                .store
                .get_question(question_id)?
                .ok_or(CoreError::QuestionNotFound(question_id))?;
            if !question.status.can_transition_to(QuestionStatus::Closed) {
                return Err(CoreError::InvalidTransition {
                    from: question.status.as_str(),
                    to: QuestionStatus::Closed.as_str(),
                });
            }
            let snapshot = (question.status, question.tutor_id);
            question.status = QuestionStatus::Closed;
            question.updated_at = now_millis();
            self.store.update_question(&question)?;
            snapshot
        };
        tracing::debug!(question_id, "question closed locally");

        match self.api.close_question(question_id).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.rollback(question_id, snapshot).await?;
                tracing::warn!(question_id, error = %e, "close rejected, rolled back");
                Err(e)
            }
        }
    }

    /// Restore the (status, tutor) pair exactly as snapshotted.
    async fn rollback(
        &self,
        question_id: i64,
        snapshot: (QuestionStatus, Option<i64>),
    ) -> Result<(), CoreError> {
        let lock = self.row_lock(question_id);
        let _guard = lock.lock().await;
        if let Some(mut question) = self.store.get_question(question_id)? {
            question.status = snapshot.0;
            question.tutor_id = snapshot.1;
            self.store.update_question(&question)?;
        }
        Ok(())
    }

    /// Publish a new question.
    ///
    /// A placeholder row (negative id) appears immediately; the server's row
    /// replaces it atomically on confirmation. On failure the placeholder is
    /// removed — a question the server never saw must not linger as a
    /// phantom conversation. Returns the server-assigned question id.
    pub async fn create_question(
        &self,
        content: String,
        image_paths: Vec<String>,
    ) -> Result<i64, CoreError> {
        let user_id = self.user_id()?;
        let _flight = self.begin(EditKind::CreateQuestion, 0, "question publish")?;

        let temp_id = self.next_temp_id();
        let now = now_millis();
        self.store.insert_question(&Question {
            id: temp_id,
            user_id,
            tutor_id: None,
            content: content.clone(),
            image_paths: image_paths.clone(),
            status: QuestionStatus::Pending,
            created_at: now,
            updated_at: now,
        })?;
        tracing::debug!(temp_id, "placeholder question inserted");

        let request = CreateQuestionRequest { content, image_paths };
        match self.api.create_question(&request).await {
            Ok(data) => {
                let confirmed = Question {
                    id: data.id,
                    user_id: data.user_id,
                    tutor_id: data.tutor_id,
                    content: data.content,
                    image_paths: data.image_paths,
                    status: QuestionStatus::parse(&data.status).unwrap_or(QuestionStatus::Pending),
                    created_at: data.created_at,
                    updated_at: data.updated_at.unwrap_or(data.created_at),
                };
                self.store.replace_placeholder_question(temp_id, &confirmed)?;
                tracing::debug!(temp_id, real_id = data.id, "question confirmed");
                Ok(data.id)
            }
            Err(e) => {
                self.store.delete_question(temp_id)?;
                tracing::warn!(temp_id, error = %e, "question publish failed");
                Err(e)
            }
        }
    }

    // ── Read state ─────────────────────────────────────────────────────

    /// Mark the other party's messages in this conversation as read.
    /// Local state first; the server call is best-effort and the local
    /// write stands even when it fails.
    pub async fn mark_read(&self, question_id: i64) -> Result<(), CoreError> {
        let user_id = self.user_id()?;
        self.store.mark_read(question_id, user_id)?;
        if let Err(e) = self.api.mark_read(question_id).await {
            tracing::warn!(question_id, error = %e, "server mark-read failed, local state kept");
        }
        Ok(())
    }

    /// Unread messages from the other party in this conversation.
    pub fn unread_count(&self, question_id: i64) -> Result<i64, CoreError> {
        let user_id = self.user_id()?;
        Ok(self.store.unread_count(question_id, user_id)?)
    }
}
