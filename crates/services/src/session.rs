use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use pylearn_core::Clock;
use pylearn_core::model::{User, UserId};
use serde::Serialize;
use thiserror::Error;

/// Default lifetime of a login session.
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24;

/// The authenticated caller, resolved once per request and passed explicitly
/// into every service call that needs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionContext {
    pub user_id: UserId,
    pub name: String,
    pub is_admin: bool,
    pub expires_at: DateTime<Utc>,
}

/// Returned when a non-admin session reaches an admin-only operation.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("administrator access required")]
pub struct AdminRequired;

impl SessionContext {
    /// # Errors
    ///
    /// Returns `AdminRequired` unless the session belongs to an administrator.
    pub fn require_admin(&self) -> Result<(), AdminRequired> {
        if self.is_admin { Ok(()) } else { Err(AdminRequired) }
    }
}

/// Opaque bearer tokens mapped to their session.
#[derive(Clone)]
pub struct SessionStore {
    clock: Clock,
    ttl: Duration,
    sessions: Arc<Mutex<HashMap<String, SessionContext>>>,
}

impl SessionStore {
    #[must_use]
    pub fn new(clock: Clock, ttl: Duration) -> Self {
        Self {
            clock,
            ttl,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionContext>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a session for `user` and return its token.
    pub fn open(&self, user: &User) -> (String, SessionContext) {
        let token = uuid::Uuid::new_v4().to_string();
        let context = SessionContext {
            user_id: user.id(),
            name: user.name().to_owned(),
            is_admin: user.is_admin(),
            expires_at: self.clock.now() + self.ttl,
        };
        self.lock().insert(token.clone(), context.clone());
        (token, context)
    }

    /// Look up a live session. Expired entries are evicted on the way.
    #[must_use]
    pub fn resolve(&self, token: &str) -> Option<SessionContext> {
        let now = self.clock.now();
        let mut sessions = self.lock();
        let ctx = sessions.get(token).cloned()?;
        if ctx.expires_at > now {
            return Some(ctx);
        }
        sessions.remove(token);
        None
    }

    /// Drop one session. Returns whether it existed.
    pub fn close(&self, token: &str) -> bool {
        self.lock().remove(token).is_some()
    }

    /// Drop every session of a user, e.g. after the account was deleted.
    pub fn close_user(&self, user_id: UserId) {
        self.lock().retain(|_, ctx| ctx.user_id != user_id);
    }

    /// Carry a renamed user into their live sessions.
    pub fn refresh_user(&self, user: &User) {
        for ctx in self.lock().values_mut() {
            if ctx.user_id == user.id() {
                ctx.name = user.name().to_owned();
                ctx.is_admin = user.is_admin();
            }
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(Clock::default(), Duration::hours(DEFAULT_SESSION_TTL_HOURS))
    }
}
