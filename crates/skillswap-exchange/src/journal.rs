//! The admin action journal.
//!
//! Append-only: rows are never removed or rewritten. The single permitted
//! mutation is the one-shot `is_undone` flip performed by an undo.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use skillswap_types::{AdminAction, AdminActionId, ExchangeError, NewAdminAction, Result, UserId};

/// Audit capability handed to every admin handler.
pub trait AuditSink {
    /// Append a row and return its id.
    fn record(&mut self, action: NewAdminAction, now: DateTime<Utc>) -> AdminActionId;

    fn action(&self, id: AdminActionId) -> Option<&AdminAction>;

    /// Flip `is_undone` on a row.
    ///
    /// # Errors
    /// `NotFound` for an unknown row, `AlreadyUndone` if already flipped.
    fn mark_undone(&mut self, id: AdminActionId, by: UserId, now: DateTime<Utc>) -> Result<()>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminJournal {
    /// Creation order.
    actions: Vec<AdminAction>,
}

impl AdminJournal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn actions(&self) -> &[AdminAction] {
        &self.actions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl AuditSink for AdminJournal {
    fn record(&mut self, action: NewAdminAction, now: DateTime<Utc>) -> AdminActionId {
        let id = AdminActionId::new();
        let row = action.into_action(id, now);
        tracing::info!(
            action = %id,
            admin = %row.admin_id,
            kind = %row.action_type,
            "admin action recorded"
        );
        self.actions.push(row);
        id
    }

    fn action(&self, id: AdminActionId) -> Option<&AdminAction> {
        self.actions.iter().find(|a| a.id == id)
    }

    fn mark_undone(&mut self, id: AdminActionId, by: UserId, now: DateTime<Utc>) -> Result<()> {
        let row = self
            .actions
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| ExchangeError::not_found("AdminAction", id))?;
        if row.is_undone {
            return Err(ExchangeError::AlreadyUndone);
        }
        row.is_undone = true;
        row.undone_at = Some(now);
        row.undone_by = Some(by);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use skillswap_types::AdminActionType;

    use super::*;

    #[test]
    fn record_appends_in_order() {
        let mut journal = AdminJournal::new();
        let admin = UserId::new();
        let a = journal.record(
            NewAdminAction::new(admin, AdminActionType::UserSuspended, "first"),
            Utc::now(),
        );
        let b = journal.record(
            NewAdminAction::new(admin, AdminActionType::UserPardoned, "second"),
            Utc::now(),
        );
        let ids: Vec<AdminActionId> = journal.actions().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn mark_undone_is_one_shot() {
        let mut journal = AdminJournal::new();
        let admin = UserId::new();
        let id = journal.record(
            NewAdminAction::new(admin, AdminActionType::UserActivated, "x"),
            Utc::now(),
        );
        journal.mark_undone(id, admin, Utc::now()).unwrap();
        assert!(journal.action(id).unwrap().is_undone);
        assert_eq!(
            journal.mark_undone(id, admin, Utc::now()),
            Err(ExchangeError::AlreadyUndone)
        );
        assert!(matches!(
            journal.mark_undone(AdminActionId::new(), admin, Utc::now()),
            Err(ExchangeError::NotFound { .. })
        ));
    }
}
