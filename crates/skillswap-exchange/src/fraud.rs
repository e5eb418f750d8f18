//! Scheduled fraud heuristics over recent transaction activity.
//!
//! ## Rules
//!
//! Evaluated independently per requester over the look-back window: each
//! transaction is attributed to the user who pays for it. One scan may
//! raise several alerts for the same user.
//!
//! | Rule                 | Fires when                                      | Severity              |
//! |----------------------|-------------------------------------------------|-----------------------|
//! | `unusual_volume`     | count > 10                                      | high if > 20, else medium |
//! | `repeated_transfers` | first partner with pair count > 3               | high if > 5, else medium  |
//! | `suspicious_pattern` | count >= 5, partners <= 2, volume > 100 credits | high                  |
//!
//! A user who already has an open alert raised inside the suppression
//! window is skipped for the whole scan.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use skillswap_types::{
    AdminActionType, Credits, ExchangeConfig, ExchangeError, FraudAlert, FraudAlertId,
    FraudAlertStatus, FraudAlertType, FraudConfig, NewAdminAction, NotificationKind,
    RelatedEntity, Result, Severity, TransactionId, TransactionStatus, UserId,
};

use crate::admin::apply_suspension;
use crate::engine::Exchange;
use crate::state::Records;

/// Admin decision on a fraud alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FraudResolution {
    /// `pending → investigating`.
    Investigate,
    /// Confirm the alert, optionally suspending the flagged user.
    Resolve {
        #[serde(default, rename = "suspendDays")]
        suspend_days: Option<u32>,
    },
    Dismiss,
}

/// One requester's activity inside the window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Activity {
    pub transactions: Vec<TransactionId>,
    /// Credits committed as requester.
    pub volume: Credits,
    /// Transactions per provider.
    pub partners: BTreeMap<UserId, Vec<TransactionId>>,
}

impl Activity {
    #[must_use]
    pub fn count(&self) -> usize {
        self.transactions.len()
    }
}

/// A rule that fired for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub alert_type: FraudAlertType,
    pub severity: Severity,
    pub description: String,
    pub evidence: Vec<TransactionId>,
}

impl Exchange {
    /// Scheduled scan on the wall clock.
    ///
    /// # Errors
    /// Propagated from the alert writes; the scan commits nothing then.
    pub fn detect_abnormal_credit_activity(&self) -> Result<Vec<FraudAlertId>> {
        self.detect_abnormal_credit_activity_at(self.now())
    }

    /// [`Self::detect_abnormal_credit_activity`] with an explicit `now`.
    pub fn detect_abnormal_credit_activity_at(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<FraudAlertId>> {
        self.run(|cx| {
            cx.now = now;
            let config: &ExchangeConfig = cx.config;
            let fraud = &config.fraud;
            let activity = collect_activity(cx.db, now, fraud.window_hours);
            let suppressed = suppressed_users(cx.db, now, fraud.suppression_hours);
            let admins: Vec<UserId> = cx.db.admins().map(|a| a.id).collect();

            let mut raised = Vec::new();
            for (user_id, stats) in &activity {
                if suppressed.contains(user_id) {
                    tracing::debug!(user = %user_id, "fraud scan suppressed");
                    continue;
                }
                for finding in evaluate(stats, fraud) {
                    let alert = FraudAlert {
                        id: FraudAlertId::new(),
                        user_id: *user_id,
                        alert_type: finding.alert_type,
                        severity: finding.severity,
                        description: finding.description,
                        evidence: finding.evidence,
                        status: FraudAlertStatus::Pending,
                        admin_note: None,
                        resolved_by: None,
                        resolved_at: None,
                        created_at: now,
                    };
                    let id = alert.id;
                    tracing::warn!(
                        alert = %id,
                        user = %user_id,
                        kind = %alert.alert_type,
                        severity = %alert.severity,
                        "fraud alert raised"
                    );
                    let message = format!(
                        "{} alert ({}) for {}",
                        alert.alert_type,
                        alert.severity,
                        cx.db.display_name(*user_id)
                    );
                    cx.db.fraud_alerts.insert(id, alert);
                    for admin in &admins {
                        cx.notify(*admin, NotificationKind::FraudAlert, message.clone(), id);
                    }
                    raised.push(id);
                }
            }
            tracing::info!(users = activity.len(), alerts = raised.len(), "fraud scan finished");
            Ok(raised)
        })
    }

    /// Rule on a fraud alert.
    ///
    /// # Errors
    /// - `AdminRequired` for non-admins
    /// - `AlreadyProcessed` once the alert is closed
    /// - `InvalidState` for `Investigate` on an alert already under
    ///   investigation
    pub fn resolve_fraud_alert(
        &self,
        admin_token: &str,
        alert_id: FraudAlertId,
        resolution: FraudResolution,
        note: &str,
    ) -> Result<FraudAlertStatus> {
        self.run(|cx| {
            let admin = cx.require_admin(admin_token)?;
            let alert = cx.db.fraud_alert(alert_id)?.clone();
            if !alert.status.is_open() {
                return Err(ExchangeError::AlreadyProcessed {
                    entity: "FraudAlert",
                });
            }

            let (status, action_type) = match resolution {
                FraudResolution::Investigate => {
                    if alert.status != FraudAlertStatus::Pending {
                        return Err(ExchangeError::invalid_state(
                            "FraudAlert",
                            "pending",
                            alert.status,
                        ));
                    }
                    (FraudAlertStatus::Investigating, AdminActionType::FraudInvestigating)
                }
                FraudResolution::Resolve { suspend_days } => {
                    if let Some(days) = suspend_days {
                        apply_suspension(cx, admin.id, alert.user_id, days, &alert.description)?;
                    }
                    (FraudAlertStatus::Resolved, AdminActionType::FraudResolved)
                }
                FraudResolution::Dismiss => {
                    (FraudAlertStatus::Dismissed, AdminActionType::FraudDismissed)
                }
            };

            let now = cx.now;
            let a = cx.db.fraud_alert_mut(alert_id)?;
            a.status = status;
            a.admin_note = Some(note.trim().to_string()).filter(|n| !n.is_empty());
            if status != FraudAlertStatus::Investigating {
                a.resolved_by = Some(admin.id);
                a.resolved_at = Some(now);
            }
            cx.audit.record(
                NewAdminAction::new(
                    admin.id,
                    action_type,
                    format!("{} alert {status}: {note}", alert.alert_type),
                )
                .target(alert.user_id)
                .related(RelatedEntity::FraudAlert(alert_id)),
                now,
            );
            tracing::info!(alert = %alert_id, %status, "fraud alert ruled on");
            Ok(status)
        })
    }
}

/// Per-requester statistics over non-cancelled, non-reversed transactions
/// created in `[now - window, now]`. A transaction counts for the
/// requester who funds it; the provider on the other side is the partner.
pub fn collect_activity(
    db: &Records,
    now: DateTime<Utc>,
    window_hours: i64,
) -> BTreeMap<UserId, Activity> {
    let since = now - Duration::hours(window_hours);
    let mut activity: BTreeMap<UserId, Activity> = BTreeMap::new();
    let recent = db.transactions.values().filter(|tx| {
        tx.created_at >= since
            && tx.created_at <= now
            && !matches!(
                tx.status,
                TransactionStatus::Cancelled | TransactionStatus::Reversed
            )
    });
    for tx in recent {
        let entry = activity.entry(tx.requester_id).or_default();
        entry.transactions.push(tx.id);
        entry.volume = entry
            .volume
            .saturating_add(tx.terms.credit_amount().unwrap_or(0));
        entry.partners.entry(tx.provider_id).or_default().push(tx.id);
    }
    activity
}

/// Users with an open alert raised inside the suppression window.
fn suppressed_users(db: &Records, now: DateTime<Utc>, suppression_hours: i64) -> BTreeSet<UserId> {
    let since = now - Duration::hours(suppression_hours);
    db.fraud_alerts
        .values()
        .filter(|a| a.status.is_open() && a.created_at >= since)
        .map(|a| a.user_id)
        .collect()
}

/// Run the three rules against one user's activity.
#[must_use]
pub fn evaluate(stats: &Activity, config: &FraudConfig) -> Vec<Finding> {
    let mut findings = Vec::new();
    let count = stats.count();

    if count > config.volume_count {
        let severity = if count > config.volume_high_count {
            Severity::High
        } else {
            Severity::Medium
        };
        findings.push(Finding {
            alert_type: FraudAlertType::UnusualVolume,
            severity,
            description: format!("{count} transactions in {}h", config.window_hours),
            evidence: stats.transactions.clone(),
        });
    }

    if let Some((partner, txs)) = stats
        .partners
        .iter()
        .find(|(_, txs)| txs.len() > config.repeat_count)
    {
        let pair = txs.len();
        let severity = if pair > config.repeat_high_count {
            Severity::High
        } else {
            Severity::Medium
        };
        findings.push(Finding {
            alert_type: FraudAlertType::RepeatedTransfers,
            severity,
            description: format!("{pair} transactions with {partner}"),
            evidence: txs.clone(),
        });
    }

    if count >= config.pattern_min_count
        && stats.partners.len() <= config.pattern_max_partners
        && stats.volume > config.pattern_min_volume
    {
        findings.push(Finding {
            alert_type: FraudAlertType::SuspiciousPattern,
            severity: Severity::High,
            description: format!(
                "{count} transactions worth {} credits across {} partner(s)",
                stats.volume,
                stats.partners.len()
            ),
            evidence: stats.transactions.clone(),
        });
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn activity(partners: &[(UserId, usize)], per_tx: Credits) -> Activity {
        let mut stats = Activity::default();
        for (partner, n) in partners {
            for _ in 0..*n {
                let id = TransactionId::new();
                stats.transactions.push(id);
                stats.volume += per_tx;
                stats.partners.entry(*partner).or_default().push(id);
            }
        }
        stats
    }

    fn types(findings: &[Finding]) -> Vec<(FraudAlertType, Severity)> {
        findings.iter().map(|f| (f.alert_type, f.severity)).collect()
    }

    #[test]
    fn quiet_user_raises_nothing() {
        let stats = activity(&[(UserId::new(), 2), (UserId::new(), 1)], 10);
        assert!(evaluate(&stats, &FraudConfig::default()).is_empty());
    }

    #[test]
    fn six_with_one_partner_is_repeated_and_suspicious() {
        // 6 > 5 makes the repeated-transfer rule high as well.
        let stats = activity(&[(UserId::new(), 6)], 25);
        let found = evaluate(&stats, &FraudConfig::default());
        assert_eq!(
            types(&found),
            vec![
                (FraudAlertType::RepeatedTransfers, Severity::High),
                (FraudAlertType::SuspiciousPattern, Severity::High),
            ]
        );
    }

    #[test]
    fn pattern_needs_volume_above_threshold() {
        let stats = activity(&[(UserId::new(), 3), (UserId::new(), 2)], 20);
        assert_eq!(stats.volume, 100);
        assert!(evaluate(&stats, &FraudConfig::default()).is_empty());
    }

    #[test]
    fn volume_rule_escalates_past_twenty() {
        let many: Vec<(UserId, usize)> = (0..11).map(|_| (UserId::new(), 1)).collect();
        let found = evaluate(&activity(&many, 0), &FraudConfig::default());
        assert_eq!(types(&found), vec![(FraudAlertType::UnusualVolume, Severity::Medium)]);

        let lots: Vec<(UserId, usize)> = (0..21).map(|_| (UserId::new(), 1)).collect();
        let found = evaluate(&activity(&lots, 0), &FraudConfig::default());
        assert_eq!(types(&found), vec![(FraudAlertType::UnusualVolume, Severity::High)]);
    }

    #[test]
    fn repeated_rule_reports_only_the_first_partner() {
        let stats = activity(&[(UserId::new(), 4), (UserId::new(), 4), (UserId::new(), 4)], 0);
        let found = evaluate(&stats, &FraudConfig::default());
        let repeated: Vec<_> = found
            .iter()
            .filter(|f| f.alert_type == FraudAlertType::RepeatedTransfers)
            .collect();
        assert_eq!(repeated.len(), 1);
        assert_eq!(repeated[0].severity, Severity::Medium);
        assert_eq!(repeated[0].evidence.len(), 4);
    }
}
