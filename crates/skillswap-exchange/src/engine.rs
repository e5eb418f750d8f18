//! The engine facade and the per-call handler context.
//!
//! ## Call Flow
//!
//! ```text
//! Exchange::op(token, args)
//!   → clock.now()                       (read once per call)
//!   → Store::transact(|state| {
//!         Ctx { records, audit, effects, now }
//!         authenticate → precondition checks → mutations
//!     })                                (commit on Ok, discard on Err)
//!   → deliver notifications, revoke sessions
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use skillswap_types::{
    ExchangeConfig, ExchangeError, Notification, NotificationKind, Result, User, UserId,
};

use crate::clock::{Clock, SystemClock};
use crate::journal::{AdminJournal, AuditSink};
use crate::notify::{Effects, NotificationSink, TracingSink};
use crate::session::{SessionStore, SessionVerifier};
use crate::state::{Records, State};
use crate::store::Store;

/// The exchange & moderation engine.
pub struct Exchange {
    store: Store,
    sessions: SessionStore,
    sink: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    config: ExchangeConfig,
}

impl Exchange {
    /// An engine on the wall clock that logs notifications.
    #[must_use]
    pub fn new(config: ExchangeConfig) -> Self {
        Self::with_parts(config, Arc::new(SystemClock), Arc::new(TracingSink))
    }

    #[must_use]
    pub fn with_parts(
        config: ExchangeConfig,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            store: Store::default(),
            sessions: SessionStore::new(&config.sessions),
            sink,
            clock,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Copy of the committed state, for persistence.
    #[must_use]
    pub fn snapshot(&self) -> State {
        self.store.snapshot()
    }

    /// Replace the committed state, e.g. from a persisted snapshot. The
    /// incoming state must pass the integrity check; otherwise the current
    /// state is kept.
    ///
    /// # Errors
    /// The first integrity violation found in `state`.
    pub fn restore(&self, state: State) -> Result<()> {
        state.records.verify_integrity()?;
        self.store.restore(state);
        Ok(())
    }

    /// Replay the ledger and cross-check escrow against transactions.
    ///
    /// # Errors
    /// The first integrity violation found.
    pub fn verify_integrity(&self) -> Result<()> {
        self.store.read(|state| state.records.verify_integrity())
    }

    /// Run a mutating handler as one atomic unit, then apply its effects.
    pub(crate) fn run<T>(&self, f: impl FnOnce(&mut Ctx<'_>) -> Result<T>) -> Result<T> {
        let now = self.clock.now();
        let mut effects = Effects::default();
        let result = self.store.transact(|state| {
            let State { records, journal } = state;
            let mut cx = Ctx {
                db: records,
                audit: journal,
                effects: &mut effects,
                now,
                config: &self.config,
                sessions: &self.sessions,
            };
            f(&mut cx)
        });
        match &result {
            Ok(_) => self.apply(effects),
            Err(err) => tracing::debug!(error = %err, "call rejected"),
        }
        result
    }

    /// Run a read-only handler against the committed state.
    pub(crate) fn query<T>(&self, f: impl FnOnce(&Reader<'_>) -> Result<T>) -> Result<T> {
        let now = self.clock.now();
        let result = self.store.read(|state| {
            let reader = Reader {
                db: &state.records,
                journal: &state.journal,
                now,
                sessions: &self.sessions,
            };
            f(&reader)
        });
        if let Err(err) = &result {
            tracing::debug!(error = %err, "query rejected");
        }
        result
    }

    fn apply(&self, effects: Effects) {
        for user in effects.revoked_sessions {
            self.sessions.invalidate_user(user);
        }
        for notification in &effects.notifications {
            self.sink.deliver(notification);
        }
    }
}

impl std::fmt::Debug for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exchange")
            .field("config", &self.config)
            .field("sessions", &self.sessions.active_count())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Handler contexts
// ---------------------------------------------------------------------------

/// Everything a mutating handler may touch during one call.
pub(crate) struct Ctx<'a> {
    pub db: &'a mut Records,
    pub audit: &'a mut dyn AuditSink,
    pub effects: &'a mut Effects,
    pub now: DateTime<Utc>,
    pub config: &'a ExchangeConfig,
    sessions: &'a dyn SessionVerifier,
}

impl Ctx<'_> {
    pub fn authenticate(&self, token: &str) -> Result<User> {
        authenticate(self.sessions, self.db, token, self.now)
    }

    pub fn require_admin(&self, token: &str) -> Result<User> {
        require_admin(self.sessions, self.db, token, self.now)
    }

    pub fn notify(
        &mut self,
        user: UserId,
        kind: NotificationKind,
        message: impl Into<String>,
        related: impl std::fmt::Display,
    ) {
        self.effects
            .notify(Notification::new(user, kind, message, self.now).about(related));
    }
}

/// Read-only view for query handlers.
pub(crate) struct Reader<'a> {
    pub db: &'a Records,
    pub journal: &'a AdminJournal,
    pub now: DateTime<Utc>,
    sessions: &'a dyn SessionVerifier,
}

impl Reader<'_> {
    pub fn authenticate(&self, token: &str) -> Result<User> {
        authenticate(self.sessions, self.db, token, self.now)
    }

    pub fn require_admin(&self, token: &str) -> Result<User> {
        require_admin(self.sessions, self.db, token, self.now)
    }
}

/// Resolve a token to a live account. Unknown users and deactivated
/// accounts are indistinguishable from a bad token.
fn authenticate(
    sessions: &dyn SessionVerifier,
    db: &Records,
    token: &str,
    now: DateTime<Utc>,
) -> Result<User> {
    let session = sessions
        .verify(token, now)
        .ok_or(ExchangeError::InvalidSession)?;
    db.users
        .get(&session.user_id)
        .filter(|u| u.is_active)
        .cloned()
        .ok_or(ExchangeError::InvalidSession)
}

/// Like [`authenticate`], then re-check the stored role rather than
/// trusting the session's.
fn require_admin(
    sessions: &dyn SessionVerifier,
    db: &Records,
    token: &str,
    now: DateTime<Utc>,
) -> Result<User> {
    let user = authenticate(sessions, db, token, now)?;
    if !user.is_admin() {
        return Err(ExchangeError::AdminRequired);
    }
    Ok(user)
}
