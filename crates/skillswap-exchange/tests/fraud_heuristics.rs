//! Integration test: the scheduled fraud scan end to end
//!
//! Six 25-credit deals paid by one user to the same provider inside one day
//! trip the repeated-transfer and suspicious-pattern rules for the payer.

mod common;

use chrono::Duration;
use common::{Account, Harness, start};
use skillswap_exchange::FraudResolution;
use skillswap_types::{
    AdminActionType, ExchangeConfig, ExchangeError, FraudAlert, FraudAlertStatus, FraudAlertType,
    NotificationKind, Severity, SkillLevel, UserId,
};

fn rich_harness() -> Harness {
    let mut config = ExchangeConfig::default();
    config.accounts.initial_credits = 200;
    Harness::with_config(config)
}

/// `rounds` completed 25-credit deals from `x` to `p`.
fn churn(h: &Harness, x: &Account, p: &Account, rounds: usize) {
    for _ in 0..rounds {
        let tx = h.deal(x, p, 25);
        h.complete(x, p, tx);
    }
}

fn alerts_for(h: &Harness, user: UserId) -> Vec<FraudAlert> {
    h.state()
        .records
        .fraud_alerts
        .into_values()
        .filter(|a| a.user_id == user)
        .collect()
}

#[test]
fn repeated_pair_trading_is_flagged_once() {
    let h = rich_harness();
    let admin = h.admin("root");
    let x = h.user("xavier");
    let p = h.provider("pat", SkillLevel::Expert, 0);
    churn(&h, &x, &p, 6);
    assert_eq!(h.balance(&x), 50);
    assert_eq!(h.balance(&p), 350);

    // =====================================================================
    // FIRST SCAN: the paying side is flagged
    // =====================================================================
    h.inbox.drain();
    let raised = h.ex.detect_abnormal_credit_activity_at(start()).unwrap();
    assert_eq!(raised.len(), 2);
    assert!(alerts_for(&h, p.id).is_empty());
    let all_patterns = h
        .state()
        .records
        .fraud_alerts
        .values()
        .filter(|a| a.alert_type == FraudAlertType::SuspiciousPattern)
        .count();
    assert_eq!(all_patterns, 1);

    let flagged = alerts_for(&h, x.id);
    let patterns: Vec<_> = flagged
        .iter()
        .filter(|a| a.alert_type == FraudAlertType::SuspiciousPattern)
        .collect();
    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0].severity, Severity::High);
    assert_eq!(patterns[0].evidence.len(), 6);
    assert_eq!(patterns[0].status, FraudAlertStatus::Pending);
    let repeated: Vec<_> = flagged
        .iter()
        .filter(|a| a.alert_type == FraudAlertType::RepeatedTransfers)
        .collect();
    assert_eq!(repeated.len(), 1);
    assert_eq!(repeated[0].severity, Severity::High);
    assert!(flagged
        .iter()
        .all(|a| a.alert_type != FraudAlertType::UnusualVolume));

    let notified = h
        .inbox
        .for_user(admin.id)
        .into_iter()
        .filter(|n| n.kind == NotificationKind::FraudAlert)
        .count();
    assert_eq!(notified, raised.len());

    // =====================================================================
    // SECOND SCAN: open alerts suppress the user
    // =====================================================================
    assert!(h
        .ex
        .detect_abnormal_credit_activity_at(start() + Duration::hours(1))
        .unwrap()
        .is_empty());
    assert_eq!(alerts_for(&h, x.id).len(), 2);
}

#[test]
fn light_activity_raises_nothing() {
    let h = rich_harness();
    let x = h.user("xavier");
    let p = h.provider("pat", SkillLevel::Expert, 0);
    churn(&h, &x, &p, 3);
    assert!(h.ex.detect_abnormal_credit_activity_at(start()).unwrap().is_empty());
}

#[test]
fn activity_outside_the_window_is_ignored() {
    let h = rich_harness();
    let x = h.user("xavier");
    let p = h.provider("pat", SkillLevel::Expert, 0);
    churn(&h, &x, &p, 6);

    let later = start() + Duration::hours(25);
    assert!(h.ex.detect_abnormal_credit_activity_at(later).unwrap().is_empty());
}

#[test]
fn cancelled_deals_do_not_count() {
    let h = rich_harness();
    let x = h.user("xavier");
    let p = h.provider("pat", SkillLevel::Expert, 0);
    for _ in 0..6 {
        let tx = h.deal(&x, &p, 25);
        h.ex.cancel_transaction(&x.token, tx).unwrap();
    }
    assert_eq!(h.balance(&x), 200);
    assert!(h.ex.detect_abnormal_credit_activity_at(start()).unwrap().is_empty());
}

#[test]
fn resolving_alerts_clears_suppression_and_can_suspend() {
    let h = rich_harness();
    let admin = h.admin("root");
    let x = h.user("xavier");
    let p = h.provider("pat", SkillLevel::Expert, 0);
    churn(&h, &x, &p, 6);
    h.ex.detect_abnormal_credit_activity_at(start()).unwrap();

    let flagged = alerts_for(&h, x.id);
    let (pattern, others): (Vec<_>, Vec<_>) = flagged
        .into_iter()
        .partition(|a| a.alert_type == FraudAlertType::SuspiciousPattern);
    let pattern = &pattern[0];

    assert_eq!(
        h.ex
            .resolve_fraud_alert(&x.token, pattern.id, FraudResolution::Dismiss, "")
            .unwrap_err(),
        ExchangeError::AdminRequired
    );
    assert_eq!(
        h.ex
            .resolve_fraud_alert(&admin.token, pattern.id, FraudResolution::Investigate, "")
            .unwrap(),
        FraudAlertStatus::Investigating
    );
    assert_eq!(
        h.ex
            .resolve_fraud_alert(
                &admin.token,
                pattern.id,
                FraudResolution::Resolve {
                    suspend_days: Some(2)
                },
                "Wash trading",
            )
            .unwrap(),
        FraudAlertStatus::Resolved
    );
    assert!(matches!(
        h.ex.create_request(&x.token, &common::credit_input(10)),
        Err(ExchangeError::AccountSuspended { .. })
    ));
    assert_eq!(
        h.ex
            .resolve_fraud_alert(&admin.token, pattern.id, FraudResolution::Dismiss, "")
            .unwrap_err(),
        ExchangeError::AlreadyProcessed {
            entity: "FraudAlert"
        }
    );
    for alert in &others {
        h.ex
            .resolve_fraud_alert(&admin.token, alert.id, FraudResolution::Dismiss, "")
            .unwrap();
    }

    // With nothing open, the next scan flags the same activity again.
    let again = h
        .ex
        .detect_abnormal_credit_activity_at(start() + Duration::hours(1))
        .unwrap();
    assert_eq!(again.len(), 2);
    assert_eq!(alerts_for(&h, x.id).len(), 4);
    assert!(alerts_for(&h, p.id).is_empty());

    // Undo of a dismissal puts the alert back in the queue.
    let dismissed = h
        .ex
        .admin_actions(&admin.token)
        .unwrap()
        .into_iter()
        .find(|a| a.action_type == AdminActionType::FraudDismissed)
        .unwrap();
    h.ex.undo_admin_action(&admin.token, dismissed.id).unwrap();
    let queue = h.ex.admin_queue(&admin.token).unwrap();
    assert!(queue
        .fraud_alerts
        .iter()
        .any(|q| q.alert.id == others[0].id && q.user_name == "xavier"));
}

#[test]
fn busy_provider_is_not_flagged_for_the_requesters_it_serves() {
    let h = rich_harness();
    let p = h.provider("pat", SkillLevel::Expert, 0);
    let clients: Vec<Account> = (0..6).map(|i| h.user(&format!("client-{i}"))).collect();
    for client in &clients {
        churn(&h, client, &p, 2);
    }
    assert_eq!(h.balance(&p), 500);

    assert!(h.ex.detect_abnormal_credit_activity_at(start()).unwrap().is_empty());
    assert!(alerts_for(&h, p.id).is_empty());
}
