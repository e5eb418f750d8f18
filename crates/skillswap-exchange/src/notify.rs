//! Notification delivery.
//!
//! Handlers never talk to a sink directly. They push onto the call's
//! [`Effects`], which the engine hands to the sink only after the state
//! change has committed. A sink has no way to report failure back.

use std::sync::Mutex;

use skillswap_types::{Notification, UserId};

/// Fire-and-forget delivery of "message M to user U".
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, notification: &Notification);
}

/// Logs every notification at `info`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn deliver(&self, n: &Notification) {
        tracing::info!(
            user = %n.user_id,
            kind = ?n.kind,
            related = n.related_id.as_deref().unwrap_or("-"),
            "notify: {}",
            n.message
        );
    }
}

/// Keeps delivered notifications in memory for inspection.
#[derive(Debug, Default)]
pub struct InMemoryInbox {
    delivered: Mutex<Vec<Notification>>,
}

impl InMemoryInbox {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn all(&self) -> Vec<Notification> {
        self.delivered
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn for_user(&self, user: UserId) -> Vec<Notification> {
        self.delivered
            .lock()
            .map(|d| d.iter().filter(|n| n.user_id == user).cloned().collect())
            .unwrap_or_default()
    }

    pub fn drain(&self) -> Vec<Notification> {
        self.delivered
            .lock()
            .map(|mut d| std::mem::take(&mut *d))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.delivered.lock().map_or(0, |d| d.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NotificationSink for InMemoryInbox {
    fn deliver(&self, notification: &Notification) {
        if let Ok(mut delivered) = self.delivered.lock() {
            delivered.push(notification.clone());
        }
    }
}

/// Side effects collected during one handler call, applied after commit.
#[derive(Debug, Default)]
pub struct Effects {
    pub notifications: Vec<Notification>,
    /// Users whose sessions must be dropped.
    pub revoked_sessions: Vec<UserId>,
}

impl Effects {
    pub fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    pub fn revoke_sessions(&mut self, user: UserId) {
        self.revoked_sessions.push(user);
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use skillswap_types::NotificationKind;

    use super::*;

    #[test]
    fn inbox_filters_by_user() {
        let inbox = InMemoryInbox::new();
        let a = UserId::new();
        let b = UserId::new();
        inbox.deliver(&Notification::new(a, NotificationKind::MatchesFound, "hi", Utc::now()));
        inbox.deliver(&Notification::new(b, NotificationKind::RatingReceived, "yo", Utc::now()));
        assert_eq!(inbox.len(), 2);
        assert_eq!(inbox.for_user(a).len(), 1);
        assert_eq!(inbox.drain().len(), 2);
        assert!(inbox.is_empty());
    }
}
