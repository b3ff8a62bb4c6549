//! Credential/session access.
//!
//! The core reads the signed-in user and bearer token on demand; it never
//! performs login or logout itself. Embedders implement [`Credentials`] over
//! whatever their platform's session storage is; [`MemorySession`] covers
//! tests and simple hosts.

use parking_lot::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Student,
    Tutor,
}

/// Read-only view of the current session.
pub trait Credentials: Send + Sync {
    fn user_id(&self) -> Option<i64>;
    fn token(&self) -> Option<String>;
    fn role(&self) -> Option<Role>;
}

#[derive(Debug, Default)]
struct SessionState {
    user_id: Option<i64>,
    token: Option<String>,
    role: Option<Role>,
}

/// In-memory session holder.
#[derive(Debug, Default)]
pub struct MemorySession {
    inner: RwLock<SessionState>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(user_id: i64, role: Role, token: impl Into<String>) -> Self {
        let session = Self::new();
        session.sign_in(user_id, role, token);
        session
    }

    pub fn sign_in(&self, user_id: i64, role: Role, token: impl Into<String>) {
        let mut state = self.inner.write();
        state.user_id = Some(user_id);
        state.role = Some(role);
        state.token = Some(token.into());
    }

    pub fn sign_out(&self) {
        *self.inner.write() = SessionState::default();
    }
}

impl Credentials for MemorySession {
    fn user_id(&self) -> Option<i64> {
        self.inner.read().user_id
    }

    fn token(&self) -> Option<String> {
        self.inner.read().token.clone()
    }

    fn role(&self) -> Option<Role> {
        self.inner.read().role
    }
}
