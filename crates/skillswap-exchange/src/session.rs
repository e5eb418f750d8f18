//! Session resolution.
//!
//! The engine only needs `verify(token) -> {user, role} | invalid`. The
//! bundled [`SessionStore`] issues random bearer tokens and keeps nothing
//! but their SHA-256 digests, so a leaked snapshot of the store cannot be
//! replayed as a credential.
//!
//! Every failure mode (unknown token, expired token, poisoned lock) fails
//! closed to `None`.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use skillswap_types::{
    ExchangeError, Result, Role, SessionConfig, UserId, constants::SESSION_TOKEN_BYTES,
};

/// What a valid token resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

/// The identity collaborator as seen by the engine.
pub trait SessionVerifier: Send + Sync {
    /// Resolve a token, or `None` if it is unknown or expired.
    fn verify(&self, token: &str, now: DateTime<Utc>) -> Option<Session>;

    /// Drop every live session belonging to `user`.
    fn invalidate_user(&self, user: UserId);
}

/// In-process token store.
#[derive(Debug)]
pub struct SessionStore {
    /// hex(SHA-256(token)) -> session
    sessions: Mutex<HashMap<String, Session>>,
    ttl: Duration,
}

impl SessionStore {
    #[must_use]
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl: Duration::hours(config.ttl_hours),
        }
    }

    /// Mint a fresh token for `user`.
    ///
    /// # Errors
    /// `Internal` if the store lock is poisoned.
    pub fn issue(&self, user_id: UserId, role: Role, now: DateTime<Utc>) -> Result<String> {
        let mut raw = [0u8; SESSION_TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut raw);
        let token = hex::encode(raw);

        let session = Session {
            user_id,
            role,
            expires_at: now + self.ttl,
        };
        self.sessions
            .lock()
            .map_err(|_| ExchangeError::Internal("session store lock poisoned".into()))?
            .insert(digest(&token), session);
        tracing::debug!(user = %user_id, "session issued");
        Ok(token)
    }

    /// Forget expired sessions. Returns how many were dropped.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let Ok(mut sessions) = self.sessions.lock() else {
            return 0;
        };
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at > now);
        before - sessions.len()
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.sessions.lock().map_or(0, |s| s.len())
    }
}

impl SessionVerifier for SessionStore {
    fn verify(&self, token: &str, now: DateTime<Utc>) -> Option<Session> {
        if token.is_empty() {
            return None;
        }
        let sessions = self.sessions.lock().ok()?;
        sessions
            .get(&digest(token))
            .copied()
            .filter(|s| s.expires_at > now)
    }

    fn invalidate_user(&self, user: UserId) {
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.retain(|_, s| s.user_id != user);
        }
    }
}

fn digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
