//! Account moderation, the admin queue, and undo.
//!
//! ## Undo
//!
//! Undo never rewrites history. It flips `is_undone` on the original row
//! once, applies the inverse effect, and appends a new row that points back
//! at the original through `reverses`.
//!
//! | Original                     | Inverse effect              | Logged as          |
//! |------------------------------|-----------------------------|--------------------|
//! | `user_suspended`             | lift the suspension         | `user_pardoned`    |
//! | `user_activated`             | deactivate, drop sessions   | `user_deactivated` |
//! | `user_deactivated`           | reactivate                  | `user_activated`   |
//! | `report_*`                   | report back to `pending`    | `report_reopened`  |
//! | `dispute_*`                  | dispute back to `open`      | `dispute_reopened` |
//! | `fraud_*`                    | alert back to `pending`     | `fraud_reopened`   |
//! | `user_pardoned`, `*_reopened`, `credits_adjusted` | rejected | -         |

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use skillswap_types::{
    AdminAction, AdminActionId, AdminActionType, Dispute, ExchangeError, FraudAlert,
    NewAdminAction, NotificationKind, RelatedEntity, Report, ReportTarget, ReportType, Result,
    TransactionStatus, UserId,
};

use crate::engine::{Ctx, Exchange};
use crate::state::Records;

/// A report with its people resolved to display names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedReport {
    pub report: Report,
    pub report_type: ReportType,
    pub reporter_name: String,
    pub target_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedDispute {
    pub dispute: Dispute,
    pub filed_by_name: String,
    pub other_party_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedFraudAlert {
    pub alert: FraudAlert,
    pub user_name: String,
}

/// Everything waiting on an admin decision, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminQueue {
    pub reports: Vec<QueuedReport>,
    pub disputes: Vec<QueuedDispute>,
    pub fraud_alerts: Vec<QueuedFraudAlert>,
}

impl Exchange {
    /// Suspend a user for `days` days.
    ///
    /// # Errors
    /// - `AdminRequired` for non-admins
    /// - `Validation` for zero days
    /// - `Forbidden` when the target is an admin
    pub fn suspend_user(
        &self,
        admin_token: &str,
        user_id: UserId,
        days: u32,
        reason: &str,
    ) -> Result<DateTime<Utc>> {
        self.run(|cx| {
            let admin = cx.require_admin(admin_token)?;
            apply_suspension(cx, admin.id, user_id, days, reason)
        })
    }

    /// Lift a running suspension.
    ///
    /// # Errors
    /// `AdminRequired` for non-admins, `InvalidState` if the user is not
    /// currently suspended.
    pub fn pardon_user(&self, admin_token: &str, user_id: UserId, note: &str) -> Result<()> {
        self.run(|cx| {
            let admin = cx.require_admin(admin_token)?;
            let now = cx.now;
            let user = cx.db.user_mut(user_id)?;
            if !user.is_suspended(now) {
                return Err(ExchangeError::invalid_state(
                    "User",
                    "suspended",
                    "not suspended",
                ));
            }
            user.suspended_until = None;
            cx.audit.record(
                NewAdminAction::new(admin.id, AdminActionType::UserPardoned, note.trim())
                    .target(user_id),
                now,
            );
            cx.notify(
                user_id,
                NotificationKind::AccountPardoned,
                "Your suspension has been lifted",
                user_id,
            );
            tracing::info!(user = %user_id, "user pardoned");
            Ok(())
        })
    }

    /// Flip an account between active and deactivated. Deactivation drops
    /// every session the user holds. Returns the new `is_active`.
    ///
    /// # Errors
    /// `AdminRequired` for non-admins, `Forbidden` for the caller's own
    /// account.
    pub fn toggle_user_status(&self, admin_token: &str, user_id: UserId) -> Result<bool> {
        self.run(|cx| {
            let admin = cx.require_admin(admin_token)?;
            if admin.id == user_id {
                return Err(ExchangeError::Forbidden {
                    reason: "cannot change your own account status".into(),
                });
            }
            let active = !cx.db.user(user_id)?.is_active;
            let action_type = if active {
                AdminActionType::UserActivated
            } else {
                AdminActionType::UserDeactivated
            };
            set_active(cx, user_id, active)?;
            cx.audit.record(
                NewAdminAction::new(admin.id, action_type, "Account status changed")
                    .target(user_id),
                cx.now,
            );
            Ok(active)
        })
    }

    /// Reverse a journaled admin action. Returns the id of the new row.
    ///
    /// # Errors
    /// - `AdminRequired` for non-admins
    /// - `AlreadyUndone` on the second attempt
    /// - `Irreversible` for actions without a faithful inverse
    pub fn undo_admin_action(
        &self,
        admin_token: &str,
        action_id: AdminActionId,
    ) -> Result<AdminActionId> {
        self.run(|cx| {
            let admin = cx.require_admin(admin_token)?;
            let original: AdminAction = cx
                .audit
                .action(action_id)
                .cloned()
                .ok_or_else(|| ExchangeError::not_found("AdminAction", action_id))?;
            if original.is_undone {
                return Err(ExchangeError::AlreadyUndone);
            }

            let inverse = invert(cx, &original)?;
            cx.audit.mark_undone(action_id, admin.id, cx.now)?;
            let mut row = NewAdminAction::new(
                admin.id,
                inverse,
                format!("Undo of {}", original.action_type),
            )
            .reversing(action_id);
            if let Some(user) = original.target_user_id {
                row = row.target(user);
            }
            if let Some(related) = original.related {
                row = row.related(related);
            }
            let id = cx.audit.record(row, cx.now);
            tracing::info!(action = %action_id, undo = %id, kind = %original.action_type, "admin action undone");
            Ok(id)
        })
    }

    /// Open reports, disputes, and fraud alerts.
    ///
    /// # Errors
    /// `AdminRequired` for non-admins.
    pub fn admin_queue(&self, admin_token: &str) -> Result<AdminQueue> {
        self.query(|r| {
            r.require_admin(admin_token)?;
            Ok(build_queue(r.db))
        })
    }

    /// The journal in creation order.
    ///
    /// # Errors
    /// `AdminRequired` for non-admins.
    pub fn admin_actions(&self, admin_token: &str) -> Result<Vec<AdminAction>> {
        self.query(|r| {
            r.require_admin(admin_token)?;
            Ok(r.journal.actions().to_vec())
        })
    }
}

/// Gate a user for `days` days, journal it, and tell them.
pub(crate) fn apply_suspension(
    cx: &mut Ctx<'_>,
    admin_id: UserId,
    user_id: UserId,
    days: u32,
    reason: &str,
) -> Result<DateTime<Utc>> {
    if days == 0 {
        return Err(ExchangeError::validation("suspension must last at least one day"));
    }
    let now = cx.now;
    let until = Duration::try_days(i64::from(days))
        .and_then(|length| now.checked_add_signed(length))
        .ok_or_else(|| {
            ExchangeError::validation(format!("a suspension of {days} days ends past the calendar"))
        })?;
    let user = cx.db.user_mut(user_id)?;
    if user.is_admin() {
        return Err(ExchangeError::Forbidden {
            reason: "admins cannot be suspended".into(),
        });
    }
    user.suspended_until = Some(until);
    cx.audit.record(
        NewAdminAction::new(admin_id, AdminActionType::UserSuspended, reason.trim())
            .target(user_id)
            .suspend_days(days),
        now,
    );
    cx.notify(
        user_id,
        NotificationKind::AccountSuspended,
        format!("Your account is suspended for {days} day(s): {}", reason.trim()),
        user_id,
    );
    tracing::info!(user = %user_id, days, %until, "user suspended");
    Ok(until)
}

fn set_active(cx: &mut Ctx<'_>, user_id: UserId, active: bool) -> Result<()> {
    cx.db.user_mut(user_id)?.is_active = active;
    if !active {
        cx.effects.revoke_sessions(user_id);
    }
    let message = if active {
        "Your account has been reactivated"
    } else {
        "Your account has been deactivated"
    };
    cx.notify(user_id, NotificationKind::AccountStatusChanged, message, user_id);
    tracing::info!(user = %user_id, active, "account status changed");
    Ok(())
}

/// Apply the inverse of `original` and return the type to log it under.
fn invert(cx: &mut Ctx<'_>, original: &AdminAction) -> Result<AdminActionType> {
    use AdminActionType as A;

    let irreversible = |reason: &str| ExchangeError::Irreversible {
        action: original.action_type.to_string(),
        reason: reason.to_string(),
    };
    match original.action_type {
        A::UserSuspended => {
            let user_id = original
                .target_user_id
                .ok_or_else(|| irreversible("no target user recorded"))?;
            cx.db.user_mut(user_id)?.suspended_until = None;
            cx.notify(
                user_id,
                NotificationKind::AccountPardoned,
                "Your suspension has been lifted",
                user_id,
            );
            Ok(A::UserPardoned)
        }
        A::UserActivated | A::UserDeactivated => {
            let user_id = original
                .target_user_id
                .ok_or_else(|| irreversible("no target user recorded"))?;
            let reactivate = original.action_type == A::UserDeactivated;
            set_active(cx, user_id, reactivate)?;
            Ok(if reactivate {
                A::UserActivated
            } else {
                A::UserDeactivated
            })
        }
        A::ReportReviewed | A::ReportResolved | A::ReportDismissed => {
            let Some(RelatedEntity::Report(id)) = original.related else {
                return Err(irreversible("no report recorded"));
            };
            let report = cx.db.report_mut(id)?;
            report.reopen();
            let target = report.target;
            if let ReportTarget::Request(request_id) = target {
                cx.db.request_mut(request_id)?.is_reported = true;
            }
            Ok(A::ReportReopened)
        }
        A::DisputeUnderReview | A::DisputeResolved | A::DisputeDismissed => {
            let Some(RelatedEntity::Dispute(id)) = original.related else {
                return Err(irreversible("no dispute recorded"));
            };
            let tx_id = cx.db.dispute(id)?.transaction_id;
            if cx.db.open_dispute_for(tx_id).is_some_and(|open| open.id != id) {
                return Err(ExchangeError::DisputeAlreadyOpen);
            }
            cx.db.dispute_mut(id)?.reopen();
            let tx = cx.db.transaction_mut(tx_id)?;
            if tx.status == TransactionStatus::InProgress {
                tx.status = TransactionStatus::Disputed;
            }
            Ok(A::DisputeReopened)
        }
        A::FraudInvestigating | A::FraudResolved | A::FraudDismissed => {
            let Some(RelatedEntity::FraudAlert(id)) = original.related else {
                return Err(irreversible("no fraud alert recorded"));
            };
            cx.db.fraud_alert_mut(id)?.reopen();
            Ok(A::FraudReopened)
        }
        A::UserPardoned => Err(irreversible(
            "the original suspension duration is not recoverable",
        )),
        A::ReportReopened | A::DisputeReopened | A::FraudReopened => {
            Err(irreversible("a reopen is undone by ruling on the item again"))
        }
        A::CreditsAdjusted => Err(irreversible(
            "issue a compensating adjustment instead",
        )),
    }
}

fn build_queue(db: &Records) -> AdminQueue {
    let reports = db
        .reports
        .values()
        .filter(|r| r.status.is_open())
        .map(|r| {
            let target_name = match r.target {
                ReportTarget::User(id) => db.display_name(id),
                ReportTarget::Request(id) => db
                    .requests
                    .get(&id)
                    .map_or_else(unknown, |req| db.display_name(req.requester_id)),
                ReportTarget::Rating(id) => db
                    .ratings
                    .get(&id)
                    .map_or_else(unknown, |rating| db.display_name(rating.rater_id)),
            };
            QueuedReport {
                report_type: r.target.report_type(),
                reporter_name: db.display_name(r.reporter_id),
                target_name,
                report: r.clone(),
            }
        })
        .collect();

    let disputes = db
        .disputes
        .values()
        .filter(|d| d.status.is_open())
        .map(|d| {
            let other = db.transactions.get(&d.transaction_id).map(|tx| {
                if tx.requester_id == d.filed_by {
                    tx.provider_id
                } else {
                    tx.requester_id
                }
            });
            QueuedDispute {
                filed_by_name: db.display_name(d.filed_by),
                other_party_name: other.map_or_else(unknown, |id| db.display_name(id)),
                dispute: d.clone(),
            }
        })
        .collect();

    let fraud_alerts = db
        .fraud_alerts
        .values()
        .filter(|a| a.status.is_open())
        .map(|a| QueuedFraudAlert {
            user_name: db.display_name(a.user_id),
            alert: a.clone(),
        })
        .collect();

    AdminQueue {
        reports,
        disputes,
        fraud_alerts,
    }
}

fn unknown() -> String {
    skillswap_types::constants::UNKNOWN_DISPLAY_NAME.to_string()
}
