//! User reports and their admin resolution.
//!
//! ## Side effects by target
//!
//! | Target  | Resolve                                   | Dismiss                          |
//! |---------|-------------------------------------------|----------------------------------|
//! | user    | optional suspension                       | none                             |
//! | request | cancel if open; reverse a paused tx       | unhide; resume a paused tx       |
//! | rating  | hide the rating                           | unhide the rating                |

use serde::{Deserialize, Serialize};
use skillswap_types::{
    AdminActionType, ExchangeError, NewAdminAction, NotificationKind, RelatedEntity, Report,
    ReportId, ReportStatus, ReportTarget, RequestStatus, Result, TransactionId, TransactionStatus,
    User, UserId,
};

use crate::admin::apply_suspension;
use crate::engine::{Ctx, Exchange};
use crate::requests::close_open_offers;
use crate::transactions::end_transaction;

/// Admin decision on a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ReportResolution {
    /// Uphold the report. `suspend_days` only applies to user reports.
    Resolve {
        #[serde(default, rename = "suspendDays")]
        suspend_days: Option<u32>,
    },
    Dismiss,
}

impl Exchange {
    /// Report a user, a request, or a rating.
    ///
    /// # Errors
    /// - `AdminNotAllowed` for admins
    /// - `Forbidden` for reports on oneself or one's own content
    /// - `NotFound` for an unknown target
    /// - `Validation` for a blank reason
    pub fn file_report(
        &self,
        token: &str,
        target: ReportTarget,
        reason: &str,
        description: &str,
    ) -> Result<ReportId> {
        self.run(|cx| {
            let user = cx.authenticate(token)?;
            if user.is_admin() {
                return Err(ExchangeError::AdminNotAllowed {
                    action: "file reports",
                });
            }
            if reason.trim().is_empty() {
                return Err(ExchangeError::validation("report reason is required"));
            }
            let owner = match target {
                ReportTarget::User(id) => cx.db.user(id)?.id,
                ReportTarget::Request(id) => cx.db.request(id)?.requester_id,
                ReportTarget::Rating(id) => cx.db.rating(id)?.rater_id,
            };
            if owner == user.id {
                return Err(ExchangeError::Forbidden {
                    reason: "cannot report yourself or your own content".into(),
                });
            }

            let report = Report {
                id: ReportId::new(),
                reporter_id: user.id,
                target,
                reason: reason.trim().to_string(),
                description: description.trim().to_string(),
                status: ReportStatus::Pending,
                paused_transaction_id: None,
                admin_note: None,
                resolved_by: None,
                resolved_at: None,
                created_at: cx.now,
            };
            let id = report.id;
            cx.db.reports.insert(id, report);
            if let ReportTarget::Request(request_id) = target {
                cx.db.request_mut(request_id)?.is_reported = true;
            }
            tracing::info!(report = %id, %target, kind = ?target.report_type(), "report filed");
            Ok(id)
        })
    }

    /// Mark a pending report as looked at.
    ///
    /// # Errors
    /// `AdminRequired` for non-admins, `InvalidState` unless pending.
    pub fn review_report(&self, admin_token: &str, report_id: ReportId) -> Result<()> {
        self.run(|cx| {
            let admin = cx.require_admin(admin_token)?;
            let report = cx.db.report_mut(report_id)?;
            if report.status != ReportStatus::Pending {
                return Err(ExchangeError::invalid_state(
                    "Report",
                    "pending",
                    report.status,
                ));
            }
            report.status = ReportStatus::Reviewed;
            let reporter = report.reporter_id;
            cx.audit.record(
                NewAdminAction::new(admin.id, AdminActionType::ReportReviewed, "Report under review")
                    .target(reporter)
                    .related(RelatedEntity::Report(report_id)),
                cx.now,
            );
            cx.notify(
                reporter,
                NotificationKind::ReportUpdated,
                "Your report is being reviewed",
                report_id,
            );
            Ok(())
        })
    }

    /// Uphold or dismiss a report, applying the target's side effect.
    ///
    /// # Errors
    /// - `AdminRequired` for non-admins
    /// - `AlreadyProcessed` once the report is closed
    /// - `Forbidden` when asked to suspend an admin
    pub fn resolve_report(
        &self,
        admin_token: &str,
        report_id: ReportId,
        resolution: ReportResolution,
        note: &str,
    ) -> Result<ReportStatus> {
        self.run(|cx| {
            let admin = cx.require_admin(admin_token)?;
            let report = cx.db.report(report_id)?.clone();
            if !report.status.is_open() {
                return Err(ExchangeError::AlreadyProcessed { entity: "Report" });
            }

            let (status, action_type) = match resolution {
                ReportResolution::Resolve { suspend_days } => {
                    uphold(cx, &admin, &report, suspend_days)?;
                    (ReportStatus::Resolved, AdminActionType::ReportResolved)
                }
                ReportResolution::Dismiss => {
                    dismiss(cx, &report)?;
                    (ReportStatus::Dismissed, AdminActionType::ReportDismissed)
                }
            };

            let now = cx.now;
            let r = cx.db.report_mut(report_id)?;
            r.status = status;
            r.admin_note = Some(note.trim().to_string()).filter(|n| !n.is_empty());
            r.resolved_by = Some(admin.id);
            r.resolved_at = Some(now);
            let mut action = NewAdminAction::new(
                admin.id,
                action_type,
                format!("Report on {} {status}: {note}", report.target),
            )
            .related(RelatedEntity::Report(report_id));
            if let Some(user) = target_user(cx, report.target) {
                action = action.target(user);
            }
            cx.audit.record(action, now);
            cx.notify(
                report.reporter_id,
                NotificationKind::ReportUpdated,
                format!("Your report was {status}"),
                report_id,
            );
            tracing::info!(report = %report_id, %status, "report ruled on");
            Ok(status)
        })
    }
}

/// The user a report is ultimately about, for the journal row.
fn target_user(cx: &Ctx<'_>, target: ReportTarget) -> Option<UserId> {
    match target {
        ReportTarget::User(id) => Some(id),
        ReportTarget::Request(id) => cx.db.requests.get(&id).map(|r| r.requester_id),
        ReportTarget::Rating(id) => cx.db.ratings.get(&id).map(|r| r.rater_id),
    }
}

fn uphold(cx: &mut Ctx<'_>, admin: &User, report: &Report, suspend_days: Option<u32>) -> Result<()> {
    match report.target {
        ReportTarget::User(user_id) => {
            if let Some(days) = suspend_days {
                apply_suspension(cx, admin.id, user_id, days, &report.reason)?;
            }
        }
        ReportTarget::Request(request_id) => {
            if let Some(tx_id) = paused_transaction(cx, report)? {
                reverse_paused(cx, tx_id)?;
            } else if cx.db.request(request_id)?.is_open() {
                cx.db
                    .request_mut(request_id)?
                    .set_status(RequestStatus::Cancelled, cx.now);
                close_open_offers(cx, request_id);
            }
        }
        ReportTarget::Rating(rating_id) => {
            cx.db.rating_mut(rating_id)?.is_reported = true;
        }
    }
    Ok(())
}

fn dismiss(cx: &mut Ctx<'_>, report: &Report) -> Result<()> {
    match report.target {
        ReportTarget::User(_) => {}
        ReportTarget::Request(request_id) => {
            let still_reported = cx.db.reports.values().any(|r| {
                r.id != report.id && r.status.is_open() && r.target == report.target
            });
            cx.db.request_mut(request_id)?.is_reported = still_reported;
            if let Some(tx_id) = paused_transaction(cx, report)? {
                let tx = cx.db.transaction_mut(tx_id)?;
                tx.status = TransactionStatus::Pending;
                let parties = [tx.requester_id, tx.provider_id];
                for user in parties {
                    cx.notify(
                        user,
                        NotificationKind::TransactionResumed,
                        "The report was dismissed; the transaction is pending again",
                        tx_id,
                    );
                }
                tracing::info!(tx = %tx_id, "paused transaction resumed");
            }
        }
        ReportTarget::Rating(rating_id) => {
            cx.db.rating_mut(rating_id)?.is_reported = false;
        }
    }
    Ok(())
}

/// The transaction this report paused, if it is still paused.
fn paused_transaction(cx: &Ctx<'_>, report: &Report) -> Result<Option<TransactionId>> {
    let Some(tx_id) = report.paused_transaction_id else {
        return Ok(None);
    };
    let tx = cx.db.transaction(tx_id)?;
    Ok((tx.status == TransactionStatus::Disputed).then_some(tx_id))
}

/// Unwind a transaction paused by an upheld request report: escrow goes
/// back to the requester and the request is closed.
fn reverse_paused(cx: &mut Ctx<'_>, tx_id: TransactionId) -> Result<()> {
    let tx = cx.db.transaction(tx_id)?.clone();
    end_transaction(cx, &tx, TransactionStatus::Reversed)?;
    cx.db
        .request_mut(tx.request_id)?
        .set_status(RequestStatus::Cancelled, cx.now);
    for user in [tx.requester_id, tx.provider_id] {
        cx.notify(
            user,
            NotificationKind::TransactionReversed,
            "The transaction was reversed after a report was upheld",
            tx_id,
        );
    }
    tracing::info!(tx = %tx_id, "paused transaction reversed");
    Ok(())
}
