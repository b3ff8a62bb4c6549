//! SQLite persistence layer.
//!
//! The local mirror the UI renders from: questions, their chat messages, and
//! the durable outbound queue. Uses WAL mode for concurrent reads during
//! writes; foreign keys are on, so deleting a question cascades to its
//! messages — which is exactly why push-driven question updates must be
//! UPDATEs and never INSERT OR REPLACE (a REPLACE is a delete+insert and
//! would wipe the conversation history).
//!
//! Every committed write publishes a [`StoreChange`] on a broadcast channel
//! so observers can re-query the affected rows.

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Result as SqlResult, params};
use tokio::sync::broadcast;

use crate::model::{ChatMessage, MessageKind, PendingOutbound, Question, QuestionStatus, SendStatus};

/// Emitted after a committed write so observers can refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    /// A question row changed (insert, update, or delete).
    Question(i64),
    /// The message list of one conversation changed.
    Messages { question_id: i64 },
    /// The outbound queue changed.
    Outbox,
}

/// Database handle. All access is serialized on an internal mutex; SQLite
/// operations here are short and index-backed.
pub struct Store {
    conn: Mutex<Connection>,
    changes: broadcast::Sender<StoreChange>,
}

impl Store {
    /// Open (or create) the database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> SqlResult<Self> {
        Self::from_conn(Connection::open(path)?)
    }

    /// Open an in-memory database (tests, ephemeral sessions).
    pub fn open_memory() -> SqlResult<Self> {
        Self::from_conn(Connection::open_in_memory()?)
    }

    fn from_conn(conn: Connection) -> SqlResult<Self> {
        let (changes, _) = broadcast::channel(256);
        let store = Self { conn: Mutex::new(conn), changes };
        store.init()?;
        Ok(store)
    }

    fn init(&self) -> SqlResult<()> {
        let conn = self.conn.lock();
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS questions (
                id          INTEGER PRIMARY KEY,
                user_id     INTEGER NOT NULL,
                tutor_id    INTEGER,
                content     TEXT NOT NULL,
                image_paths TEXT NOT NULL DEFAULT '[]',
                status      TEXT NOT NULL DEFAULT 'pending',
                created_at  INTEGER NOT NULL,
                updated_at  INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_questions_user
                ON questions(user_id);
            CREATE INDEX IF NOT EXISTS idx_questions_tutor_status
                ON questions(tutor_id, status);

            CREATE TABLE IF NOT EXISTS messages (
                id          INTEGER PRIMARY KEY,
                question_id INTEGER NOT NULL REFERENCES questions(id) ON DELETE CASCADE,
                sender_id   INTEGER NOT NULL,
                content     TEXT NOT NULL,
                kind        TEXT NOT NULL DEFAULT 'text',
                created_at  INTEGER NOT NULL,
                is_read     INTEGER NOT NULL DEFAULT 0,
                send_status TEXT NOT NULL DEFAULT 'sent'
            );

            CREATE INDEX IF NOT EXISTS idx_messages_question_ts
                ON messages(question_id, created_at);

            CREATE TABLE IF NOT EXISTS pending_messages (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                kind        TEXT NOT NULL,
                payload     TEXT NOT NULL,
                token       TEXT NOT NULL UNIQUE,
                retry_count INTEGER NOT NULL DEFAULT 0,
                enqueued_at INTEGER NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Subscribe to change notifications. Lagging receivers miss events but
    /// can always recover by re-querying.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }

    fn notify(&self, change: StoreChange) {
        // No receivers is fine.
        let _ = self.changes.send(change);
    }

    // ── Questions ──────────────────────────────────────────────────────

    /// Insert a new question row. Fails on id collision.
    pub fn insert_question(&self, q: &Question) -> SqlResult<()> {
        self.conn.lock().execute(
            "INSERT INTO questions (id, user_id, tutor_id, content, image_paths, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            question_params(q),
        )?;
        self.notify(StoreChange::Question(q.id));
        Ok(())
    }

    /// Insert or update a question without touching its messages.
    /// `ON CONFLICT DO UPDATE` is an in-place update, so the foreign key
    /// cascade never fires.
    pub fn save_question(&self, q: &Question) -> SqlResult<()> {
        self.conn.lock().execute(
            "INSERT INTO questions (id, user_id, tutor_id, content, image_paths, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET
                user_id=excluded.user_id,
                tutor_id=excluded.tutor_id,
                content=excluded.content,
                image_paths=excluded.image_paths,
                status=excluded.status,
                created_at=excluded.created_at,
                updated_at=excluded.updated_at",
            question_params(q),
        )?;
        self.notify(StoreChange::Question(q.id));
        Ok(())
    }

    /// Update all fields of an existing question row. Returns the number of
    /// rows changed (0 when the question is unknown locally).
    pub fn update_question(&self, q: &Question) -> SqlResult<usize> {
        let changed = self.conn.lock().execute(
            "UPDATE questions SET
                user_id=?2, tutor_id=?3, content=?4, image_paths=?5,
                status=?6, created_at=?7, updated_at=?8
             WHERE id=?1",
            question_params(q),
        )?;
        if changed > 0 {
            self.notify(StoreChange::Question(q.id));
        }
        Ok(changed)
    }

    pub fn get_question(&self, id: i64) -> SqlResult<Option<Question>> {
        self.conn
            .lock()
            .query_row(
                "SELECT id, user_id, tutor_id, content, image_paths, status, created_at, updated_at
                 FROM questions WHERE id = ?1",
                params![id],
                map_question,
            )
            .optional()
    }

    pub fn questions_for_user(&self, user_id: i64) -> SqlResult<Vec<Question>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, tutor_id, content, image_paths, status, created_at, updated_at
             FROM questions WHERE user_id = ?1 ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map(params![user_id], map_question)?;
        rows.collect()
    }

    pub fn questions_for_tutor(&self, tutor_id: i64, status: QuestionStatus) -> SqlResult<Vec<Question>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, tutor_id, content, image_paths, status, created_at, updated_at
             FROM questions WHERE tutor_id = ?1 AND status = ?2 ORDER BY updated_at DESC",
        )?;
        let rows = stmt.query_map(params![tutor_id, status.as_str()], map_question)?;
        rows.collect()
    }

    pub fn questions_by_status(&self, status: QuestionStatus) -> SqlResult<Vec<Question>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, tutor_id, content, image_paths, status, created_at, updated_at
             FROM questions WHERE status = ?1 ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map(params![status.as_str()], map_question)?;
        rows.collect()
    }

    pub fn delete_question(&self, id: i64) -> SqlResult<()> {
        self.conn
            .lock()
            .execute("DELETE FROM questions WHERE id = ?1", params![id])?;
        self.notify(StoreChange::Question(id));
        Ok(())
    }

    /// Swap a locally created placeholder question for the server's row in
    /// one transaction. The placeholder has no messages yet, so the cascade
    /// from its deletion is a no-op.
    pub fn replace_placeholder_question(&self, temp_id: i64, real: &Question) -> SqlResult<()> {
        {
            let mut conn = self.conn.lock();
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM questions WHERE id = ?1", params![temp_id])?;
            tx.execute(
                "INSERT INTO questions (id, user_id, tutor_id, content, image_paths, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(id) DO UPDATE SET
                    user_id=excluded.user_id,
                    tutor_id=excluded.tutor_id,
                    content=excluded.content,
                    image_paths=excluded.image_paths,
                    status=excluded.status,
                    created_at=excluded.created_at,
                    updated_at=excluded.updated_at",
                question_params(real),
            )?;
            tx.commit()?;
        }
        self.notify(StoreChange::Question(temp_id));
        self.notify(StoreChange::Question(real.id));
        Ok(())
    }

    // ── Messages ───────────────────────────────────────────────────────

    /// Insert a message row with an explicit id. Fails on id collision.
    pub fn insert_message(&self, m: &ChatMessage) -> SqlResult<()> {
        self.conn.lock().execute(
            "INSERT INTO messages (id, question_id, sender_id, content, kind, created_at, is_read, send_status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            message_params(m),
        )?;
        self.notify(StoreChange::Messages { question_id: m.question_id });
        Ok(())
    }

    /// Insert or update a message row. Used for push-delivered messages,
    /// which may be redelivered after a reconnect.
    pub fn save_message(&self, m: &ChatMessage) -> SqlResult<()> {
        self.conn.lock().execute(
            "INSERT INTO messages (id, question_id, sender_id, content, kind, created_at, is_read, send_status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET
                question_id=excluded.question_id,
                sender_id=excluded.sender_id,
                content=excluded.content,
                kind=excluded.kind,
                created_at=excluded.created_at,
                is_read=excluded.is_read,
                send_status=excluded.send_status",
            message_params(m),
        )?;
        self.notify(StoreChange::Messages { question_id: m.question_id });
        Ok(())
    }

    pub fn get_message(&self, id: i64) -> SqlResult<Option<ChatMessage>> {
        self.conn
            .lock()
            .query_row(
                "SELECT id, question_id, sender_id, content, kind, created_at, is_read, send_status
                 FROM messages WHERE id = ?1",
                params![id],
                map_message,
            )
            .optional()
    }

    /// All messages of one conversation, oldest first.
    pub fn messages_for_question(&self, question_id: i64) -> SqlResult<Vec<ChatMessage>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, question_id, sender_id, content, kind, created_at, is_read, send_status
             FROM messages WHERE question_id = ?1 ORDER BY created_at ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![question_id], map_message)?;
        rows.collect()
    }

    pub fn delete_message(&self, id: i64, question_id: i64) -> SqlResult<()> {
        self.conn
            .lock()
            .execute("DELETE FROM messages WHERE id = ?1", params![id])?;
        self.notify(StoreChange::Messages { question_id });
        Ok(())
    }

    pub fn update_send_status(&self, id: i64, question_id: i64, status: SendStatus) -> SqlResult<usize> {
        let changed = self.conn.lock().execute(
            "UPDATE messages SET send_status = ?2 WHERE id = ?1",
            params![id, status.as_str()],
        )?;
        if changed > 0 {
            self.notify(StoreChange::Messages { question_id });
        }
        Ok(changed)
    }

    /// Delete the placeholder and insert the confirmed row in one
    /// transaction, so no observer can ever see both (or neither).
    pub fn replace_placeholder(&self, temp_id: i64, real: &ChatMessage) -> SqlResult<()> {
        {
            let mut conn = self.conn.lock();
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM messages WHERE id = ?1", params![temp_id])?;
            tx.execute(
                "INSERT INTO messages (id, question_id, sender_id, content, kind, created_at, is_read, send_status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(id) DO UPDATE SET
                    content=excluded.content,
                    kind=excluded.kind,
                    created_at=excluded.created_at,
                    is_read=excluded.is_read,
                    send_status=excluded.send_status",
                message_params(real),
            )?;
            tx.commit()?;
        }
        self.notify(StoreChange::Messages { question_id: real.question_id });
        Ok(())
    }

    /// Unread messages from the other party in one conversation.
    pub fn unread_count(&self, question_id: i64, current_user_id: i64) -> SqlResult<i64> {
        self.conn.lock().query_row(
            "SELECT COUNT(*) FROM messages
             WHERE question_id = ?1 AND is_read = 0 AND sender_id != ?2",
            params![question_id, current_user_id],
            |row| row.get(0),
        )
    }

    /// Mark everything the other party sent in this conversation as read.
    pub fn mark_read(&self, question_id: i64, current_user_id: i64) -> SqlResult<usize> {
        let changed = self.conn.lock().execute(
            "UPDATE messages SET is_read = 1
             WHERE question_id = ?1 AND sender_id != ?2 AND is_read = 0",
            params![question_id, current_user_id],
        )?;
        if changed > 0 {
            self.notify(StoreChange::Messages { question_id });
        }
        Ok(changed)
    }

    // ── Outbound queue ─────────────────────────────────────────────────

    pub fn enqueue_outbound(
        &self,
        kind: &str,
        payload: &str,
        token: &str,
        enqueued_at: i64,
    ) -> SqlResult<i64> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO pending_messages (kind, payload, token, retry_count, enqueued_at)
             VALUES (?1, ?2, ?3, 0, ?4)",
            params![kind, payload, token, enqueued_at],
        )?;
        let id = conn.last_insert_rowid();
        drop(conn);
        self.notify(StoreChange::Outbox);
        Ok(id)
    }

    /// All queued entries in enqueue order.
    pub fn outbound_in_order(&self) -> SqlResult<Vec<PendingOutbound>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, kind, payload, token, retry_count, enqueued_at
             FROM pending_messages ORDER BY enqueued_at ASC, id ASC",
        )?;
        let rows = stmt.query_map([], map_pending)?;
        rows.collect()
    }

    pub fn outbound_by_token(&self, token: &str) -> SqlResult<Option<PendingOutbound>> {
        self.conn
            .lock()
            .query_row(
                "SELECT id, kind, payload, token, retry_count, enqueued_at
                 FROM pending_messages WHERE token = ?1",
                params![token],
                map_pending,
            )
            .optional()
    }

    pub fn bump_outbound_retry(&self, id: i64) -> SqlResult<()> {
        self.conn.lock().execute(
            "UPDATE pending_messages SET retry_count = retry_count + 1 WHERE id = ?1",
            params![id],
        )?;
        Ok(())
    }

    /// Remove by acknowledgment token. Returns the number of rows removed;
    /// 0 means the token was unknown (already acknowledged, or never queued).
    pub fn remove_outbound_by_token(&self, token: &str) -> SqlResult<usize> {
        let changed = self
            .conn
            .lock()
            .execute("DELETE FROM pending_messages WHERE token = ?1", params![token])?;
        if changed > 0 {
            self.notify(StoreChange::Outbox);
        }
        Ok(changed)
    }

    pub fn remove_outbound(&self, id: i64) -> SqlResult<()> {
        self.conn
            .lock()
            .execute("DELETE FROM pending_messages WHERE id = ?1", params![id])?;
        self.notify(StoreChange::Outbox);
        Ok(())
    }
}

// Owned tuples implement `rusqlite::Params` directly.
type QuestionParams = (i64, i64, Option<i64>, String, String, &'static str, i64, i64);
type MessageParams = (i64, i64, i64, String, &'static str, i64, bool, &'static str);

fn question_params(q: &Question) -> QuestionParams {
    let image_paths =
        serde_json::to_string(&q.image_paths).unwrap_or_else(|_| "[]".to_string());
    (
        q.id,
        q.user_id,
        q.tutor_id,
        q.content.clone(),
        image_paths,
        q.status.as_str(),
        q.created_at,
        q.updated_at,
    )
}

fn message_params(m: &ChatMessage) -> MessageParams {
    (
        m.id,
        m.question_id,
        m.sender_id,
        m.content.clone(),
        m.kind.as_str(),
        m.created_at,
        m.read,
        m.send_status.as_str(),
    )
}

fn map_question(row: &rusqlite::Row) -> SqlResult<Question> {
    let image_paths_json: String = row.get(4)?;
    let status_str: String = row.get(5)?;
    Ok(Question {
        id: row.get(0)?,
        user_id: row.get(1)?,
        tutor_id: row.get(2)?,
        content: row.get(3)?,
        image_paths: serde_json::from_str(&image_paths_json).unwrap_or_default(),
        status: QuestionStatus::parse(&status_str).unwrap_or(QuestionStatus::Pending),
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn map_message(row: &rusqlite::Row) -> SqlResult<ChatMessage> {
    let kind_str: String = row.get(4)?;
    let send_status_str: String = row.get(7)?;
    Ok(ChatMessage {
        id: row.get(0)?,
        question_id: row.get(1)?,
        sender_id: row.get(2)?,
        content: row.get(3)?,
        kind: MessageKind::parse(&kind_str).unwrap_or(MessageKind::Text),
        created_at: row.get(5)?,
        read: row.get::<_, i32>(6)? != 0,
        send_status: SendStatus::parse(&send_status_str).unwrap_or(SendStatus::Sent),
    })
}

fn map_pending(row: &rusqlite::Row) -> SqlResult<PendingOutbound> {
    Ok(PendingOutbound {
        id: row.get(0)?,
        kind: row.get(1)?,
        payload: row.get(2)?,
        token: row.get(3)?,
        retry_count: row.get::<_, i64>(4)? as u32,
        enqueued_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: i64) -> Question {
        Question {
            id,
            user_id: 1,
            tutor_id: None,
            content: "help with integrals".to_string(),
            image_paths: Vec::new(),
            status: QuestionStatus::Pending,
            created_at: 1000,
            updated_at: 1000,
        }
    }

    fn message(id: i64, question_id: i64) -> ChatMessage {
        ChatMessage {
            id,
            question_id,
            sender_id: 1,
            content: "hello".to_string(),
            kind: MessageKind::Text,
            created_at: 2000,
            read: false,
            send_status: SendStatus::Sent,
        }
    }

    #[test]
    fn roundtrip_question() {
        let store = Store::open_memory().unwrap();
        let mut q = question(7);
        q.image_paths = vec!["a.jpg".to_string(), "b.jpg".to_string()];
        store.insert_question(&q).unwrap();

        let loaded = store.get_question(7).unwrap().unwrap();
        assert_eq!(loaded, q);
        assert!(store.get_question(8).unwrap().is_none());
    }

    #[test]
    fn update_question_preserves_messages() {
        // The reason push handlers must never use INSERT OR REPLACE.
        let store = Store::open_memory().unwrap();
        store.insert_question(&question(7)).unwrap();
        store.insert_message(&message(1, 7)).unwrap();
        store.insert_message(&message(2, 7)).unwrap();

        let mut q = question(7);
        q.status = QuestionStatus::InProgress;
        q.tutor_id = Some(5);
        assert_eq!(store.update_question(&q).unwrap(), 1);

        assert_eq!(store.messages_for_question(7).unwrap().len(), 2);
        let loaded = store.get_question(7).unwrap().unwrap();
        assert_eq!(loaded.status, QuestionStatus::InProgress);
        assert_eq!(loaded.tutor_id, Some(5));
    }

    #[test]
    fn save_question_upsert_preserves_messages_too() {
        let store = Store::open_memory().unwrap();
        store.insert_question(&question(7)).unwrap();
        store.insert_message(&message(1, 7)).unwrap();

        let mut q = question(7);
        q.content = "updated".to_string();
        store.save_question(&q).unwrap();

        assert_eq!(store.messages_for_question(7).unwrap().len(), 1);
        assert_eq!(store.get_question(7).unwrap().unwrap().content, "updated");
    }

    #[test]
    fn deleting_question_cascades_messages() {
        let store = Store::open_memory().unwrap();
        store.insert_question(&question(7)).unwrap();
        store.insert_message(&message(1, 7)).unwrap();

        store.delete_question(7).unwrap();
        assert!(store.messages_for_question(7).unwrap().is_empty());
    }

    #[test]
    fn update_unknown_question_is_noop() {
        let store = Store::open_memory().unwrap();
        assert_eq!(store.update_question(&question(99)).unwrap(), 0);
    }

    #[test]
    fn replace_placeholder_leaves_exactly_one_row() {
        let store = Store::open_memory().unwrap();
        store.insert_question(&question(7)).unwrap();

        let mut temp = message(-3, 7);
        temp.send_status = SendStatus::Pending;
        store.insert_message(&temp).unwrap();

        let mut real = message(42, 7);
        real.send_status = SendStatus::Sent;
        store.replace_placeholder(-3, &real).unwrap();

        let msgs = store.messages_for_question(7).unwrap();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].id, 42);
        assert_eq!(msgs[0].send_status, SendStatus::Sent);
        assert!(store.get_message(-3).unwrap().is_none());
    }

    #[test]
    fn unread_count_ignores_own_messages() {
        let store = Store::open_memory().unwrap();
        store.insert_question(&question(7)).unwrap();

        let mut mine = message(1, 7);
        mine.sender_id = 1;
        store.insert_message(&mine).unwrap();
        let mut theirs = message(2, 7);
        theirs.sender_id = 5;
        store.insert_message(&theirs).unwrap();
        let mut theirs_read = message(3, 7);
        theirs_read.sender_id = 5;
        theirs_read.read = true;
        store.insert_message(&theirs_read).unwrap();

        assert_eq!(store.unread_count(7, 1).unwrap(), 1);

        store.mark_read(7, 1).unwrap();
        assert_eq!(store.unread_count(7, 1).unwrap(), 0);
        // Own message untouched by mark_read.
        assert!(!store.get_message(1).unwrap().unwrap().read);
    }

    #[test]
    fn outbound_queue_is_fifo() {
        let store = Store::open_memory().unwrap();
        store.enqueue_outbound("CHAT_MESSAGE", "{\"a\":1}", "100", 10).unwrap();
        store.enqueue_outbound("CHAT_MESSAGE", "{\"b\":2}", "101", 20).unwrap();
        store.enqueue_outbound("CHAT_MESSAGE", "{\"c\":3}", "102", 30).unwrap();

        let tokens: Vec<String> = store
            .outbound_in_order()
            .unwrap()
            .into_iter()
            .map(|p| p.token)
            .collect();
        assert_eq!(tokens, vec!["100", "101", "102"]);
    }

    #[test]
    fn outbound_removal_by_token_is_idempotent() {
        let store = Store::open_memory().unwrap();
        store.enqueue_outbound("CHAT_MESSAGE", "{}", "100", 10).unwrap();

        assert_eq!(store.remove_outbound_by_token("100").unwrap(), 1);
        assert_eq!(store.remove_outbound_by_token("100").unwrap(), 0);
        assert_eq!(store.remove_outbound_by_token("999").unwrap(), 0);
    }

    #[test]
    fn outbound_retry_counter() {
        let store = Store::open_memory().unwrap();
        let id = store.enqueue_outbound("CHAT_MESSAGE", "{}", "100", 10).unwrap();
        store.bump_outbound_retry(id).unwrap();
        store.bump_outbound_retry(id).unwrap();

        let entry = store.outbound_by_token("100").unwrap().unwrap();
        assert_eq!(entry.retry_count, 2);
    }

    #[test]
    fn change_stream_reports_writes() {
        let store = Store::open_memory().unwrap();
        let mut rx = store.subscribe();

        store.insert_question(&question(7)).unwrap();
        store.insert_message(&message(1, 7)).unwrap();
        store.enqueue_outbound("CHAT_MESSAGE", "{}", "100", 10).unwrap();

        assert_eq!(rx.try_recv().unwrap(), StoreChange::Question(7));
        assert_eq!(rx.try_recv().unwrap(), StoreChange::Messages { question_id: 7 });
        assert_eq!(rx.try_recv().unwrap(), StoreChange::Outbox);
    }
}
