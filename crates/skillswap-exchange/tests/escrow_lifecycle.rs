//! Integration test: transaction lifecycle and credit escrow
//!
//! accept → reserve → start → confirm x2 → settle, plus every side exit
//! (cancel, reject, counter-offer, report) and what each does to escrow.

mod common;

use common::{Harness, SKILL};
use skillswap_exchange::ReportResolution;
use skillswap_types::{
    EntryKind, ExchangeError, MatchStatus, NegotiationStatus, NotificationKind, PartyRole,
    RequestStatus, SkillLevel, Terms, TransactionStatus,
};

#[test]
fn expert_match_completes_and_pays_provider() {
    let h = Harness::new();
    let a = h.user("ana");
    let b = h.provider("ben", SkillLevel::Expert, 2);

    // =====================================================================
    // MATCH: expert (90) + 2 endorsements (4) = 94
    // =====================================================================
    let request = h.credit_request(&a, 30);
    let m = h.match_for(&a, request, b.id);
    assert_eq!(m.match_score, 94);
    assert_eq!(m.status, MatchStatus::Pending);

    // =====================================================================
    // ACCEPT: 30 credits move into escrow
    // =====================================================================
    let tx = h.ex.accept_match(&a.token, m.id).unwrap();
    assert_eq!(h.balance(&a), 70);
    let reserved: Vec<_> = h
        .ex
        .credit_history(&a.token)
        .unwrap()
        .into_iter()
        .filter(|e| e.kind == EntryKind::Reserved)
        .collect();
    assert_eq!(reserved.len(), 1);
    assert_eq!(reserved[0].amount, -30);
    assert_eq!(reserved[0].balance_after, 70);
    assert_eq!(reserved[0].transaction_id, Some(tx));

    // =====================================================================
    // FULFIL: provider starts, both confirm
    // =====================================================================
    h.ex.start_transaction(&b.token, tx).unwrap();
    assert_eq!(
        h.ex.confirm_completion(&a.token, tx).unwrap(),
        TransactionStatus::InProgress
    );
    assert_eq!(
        h.ex.confirm_completion(&b.token, tx).unwrap(),
        TransactionStatus::Completed
    );

    assert_eq!(h.balance(&a), 70);
    assert_eq!(h.balance(&b), 130);
    let earned: Vec<_> = h
        .ex
        .credit_history(&b.token)
        .unwrap()
        .into_iter()
        .filter(|e| e.kind == EntryKind::Earned)
        .collect();
    assert_eq!(earned.len(), 1);
    assert_eq!(earned[0].amount, 30);

    let state = h.state();
    assert_eq!(state.records.request(request).unwrap().status, RequestStatus::Completed);
    assert_eq!(state.records.ledger.transaction_net(tx), 0);
    h.ex.verify_integrity().unwrap();
}

#[test]
fn provider_rejection_refunds_and_reopens() {
    let h = Harness::new();
    let a = h.user("ana");
    let b = h.provider("ben", SkillLevel::Intermediate, 0);
    let tx = h.deal(&a, &b, 30);
    assert_eq!(h.balance(&a), 70);

    h.ex.reject_transaction(&b.token, tx).unwrap();

    assert_eq!(h.balance(&a), 100);
    let history = h.ex.credit_history(&a.token).unwrap();
    let last = history.last().unwrap();
    assert_eq!(last.kind, EntryKind::Released);
    assert_eq!(last.amount, 30);
    assert_eq!(last.balance_after, 100);

    let state = h.state();
    let t = state.records.transaction(tx).unwrap();
    assert_eq!(t.status, TransactionStatus::Cancelled);
    let request = state.records.request(t.request_id).unwrap();
    assert_eq!(request.status, RequestStatus::Open);
    assert_eq!(request.matched_provider_id, None);
    assert_eq!(
        state.records.suggested_match(t.match_id).unwrap().status,
        MatchStatus::Rejected
    );
    h.ex.verify_integrity().unwrap();
}

#[test]
fn requester_cancel_refunds_and_closes_request() {
    let h = Harness::new();
    let a = h.user("ana");
    let b = h.provider("ben", SkillLevel::Beginner, 0);
    let tx = h.deal(&a, &b, 40);

    let err = h.ex.cancel_transaction(&b.token, tx).unwrap_err();
    assert_eq!(
        err,
        ExchangeError::WrongParty {
            expected: "requester",
            action: "cancel this transaction"
        }
    );

    h.ex.cancel_transaction(&a.token, tx).unwrap();
    assert_eq!(h.balance(&a), 100);
    let state = h.state();
    let t = state.records.transaction(tx).unwrap();
    assert_eq!(t.status, TransactionStatus::Cancelled);
    assert_eq!(
        state.records.request(t.request_id).unwrap().status,
        RequestStatus::Cancelled
    );
    assert!(h.inbox.for_user(b.id).iter().any(|n| n.kind == NotificationKind::TransactionCancelled));
}

#[test]
fn only_provider_starts_and_only_while_pending() {
    let h = Harness::new();
    let a = h.user("ana");
    let b = h.provider("ben", SkillLevel::Expert, 0);
    let tx = h.deal(&a, &b, 10);

    assert!(matches!(
        h.ex.start_transaction(&a.token, tx),
        Err(ExchangeError::WrongParty { expected: "provider", .. })
    ));
    h.ex.start_transaction(&b.token, tx).unwrap();
    assert!(matches!(
        h.ex.start_transaction(&b.token, tx),
        Err(ExchangeError::InvalidState { .. })
    ));
    // Work has started, so the pending-only exits are closed.
    assert!(h.ex.cancel_transaction(&a.token, tx).is_err());
    assert!(h.ex.reject_transaction(&b.token, tx).is_err());
    assert_eq!(h.balance(&a), 90);
}

#[test]
fn double_confirmation_is_rejected() {
    let h = Harness::new();
    let a = h.user("ana");
    let b = h.provider("ben", SkillLevel::Expert, 0);
    let tx = h.deal(&a, &b, 10);
    h.ex.start_transaction(&b.token, tx).unwrap();

    h.ex.confirm_completion(&b.token, tx).unwrap();
    assert_eq!(
        h.ex.confirm_completion(&b.token, tx).unwrap_err(),
        ExchangeError::AlreadyConfirmed { party: "provider" }
    );
    assert_eq!(
        h.ex.confirm_completion(&a.token, tx).unwrap(),
        TransactionStatus::Completed
    );
    assert_eq!(h.balance(&b), 110);
}

#[test]
fn outsider_cannot_touch_a_transaction() {
    let h = Harness::new();
    let a = h.user("ana");
    let b = h.provider("ben", SkillLevel::Expert, 0);
    let eve = h.user("eve");
    let tx = h.deal(&a, &b, 10);

    assert!(matches!(
        h.ex.confirm_completion(&eve.token, tx),
        Err(ExchangeError::Forbidden { .. })
    ));
    assert!(matches!(
        h.ex.transaction(&eve.token, tx),
        Err(ExchangeError::NotFound { .. })
    ));
}

#[test]
fn underfunded_accept_changes_nothing() {
    let h = Harness::new();
    let a = h.user("ana");
    let b = h.provider("ben", SkillLevel::Expert, 0);
    let c = h.provider("cy", SkillLevel::Beginner, 0);

    // Both post while the balance still covers them.
    let first = h.credit_request(&a, 80);
    let second = h.credit_request(&a, 80);
    h.ex.accept_match(&a.token, h.match_id(&a, first, b.id)).unwrap();
    assert_eq!(h.balance(&a), 20);

    let m = h.match_id(&a, second, c.id);
    let err = h.ex.accept_match(&a.token, m).unwrap_err();
    assert_eq!(
        err,
        ExchangeError::InsufficientCredits {
            needed: 80,
            available: 20
        }
    );

    let state = h.state();
    assert_eq!(state.records.request(second).unwrap().status, RequestStatus::Open);
    assert!(state
        .records
        .matches_for_request(second, None)
        .all(|m| m.status == MatchStatus::Pending));
    assert_eq!(state.records.transactions_for_request(second).count(), 0);
    h.ex.verify_integrity().unwrap();
}

#[test]
fn skill_swap_moves_no_credits() {
    let h = Harness::new();
    let a = h.user("ana");
    let b = h.provider("ben", SkillLevel::Expert, 0);
    let request = h.swap_request(&a, "Piano lessons");
    let tx = h
        .ex
        .accept_match(&a.token, h.match_id(&a, request, b.id))
        .unwrap();
    h.complete(&a, &b, tx);

    assert_eq!(h.balance(&a), 100);
    assert_eq!(h.balance(&b), 100);
    let t = h.ex.transaction(&a.token, tx).unwrap();
    assert_eq!(
        t.terms,
        Terms::SkillSwap {
            offered: "piano lessons".into(),
            requested: SKILL.to_lowercase()
        }
    );
    assert_eq!(t.status, TransactionStatus::Completed);
}

#[test]
fn provider_counter_offer_unwinds_into_negotiation() {
    let h = Harness::new();
    let a = h.user("ana");
    let b = h.provider("ben", SkillLevel::Expert, 0);
    let tx = h.deal(&a, &b, 30);

    let neg = h
        .ex
        .provider_counter_offer(
            &b.token,
            tx,
            Terms::Credit { amount: 45 },
            Some("more work than it looks".into()),
        )
        .unwrap();

    assert_eq!(h.balance(&a), 100);
    let state = h.state();
    let t = state.records.transaction(tx).unwrap();
    assert_eq!(t.status, TransactionStatus::Cancelled);
    assert_eq!(state.records.request(t.request_id).unwrap().status, RequestStatus::Open);
    assert_eq!(
        state.records.suggested_match(t.match_id).unwrap().status,
        MatchStatus::Pending
    );
    let n = state.records.negotiation(neg).unwrap();
    assert_eq!(n.initiator_role, PartyRole::Provider);
    assert_eq!(n.status, NegotiationStatus::Pending);
    assert_eq!(n.match_id, t.match_id);
    h.ex.verify_integrity().unwrap();
}

#[test]
fn counter_offer_with_bad_terms_keeps_the_transaction() {
    let h = Harness::new();
    let a = h.user("ana");
    let b = h.provider("ben", SkillLevel::Expert, 0);
    let tx = h.deal(&a, &b, 30);

    let err = h
        .ex
        .provider_counter_offer(&b.token, tx, Terms::Credit { amount: 0 }, None)
        .unwrap_err();
    assert!(matches!(err, ExchangeError::InvalidTerms { .. }));
    assert_eq!(h.balance(&a), 70);
    assert_eq!(
        h.ex.transaction(&a.token, tx).unwrap().status,
        TransactionStatus::Pending
    );
}

#[test]
fn reported_request_pauses_then_resumes_on_dismissal() {
    let h = Harness::new();
    let a = h.user("ana");
    let b = h.provider("ben", SkillLevel::Expert, 0);
    let admin = h.admin("root");
    let tx = h.deal(&a, &b, 30);

    let report = h
        .ex
        .report_request_from_transaction(&b.token, tx, "Spam", "Not a real job")
        .unwrap();
    let t = h.ex.transaction(&a.token, tx).unwrap();
    assert_eq!(t.status, TransactionStatus::Disputed);
    assert_eq!(h.balance(&a), 70, "escrow stays held while paused");
    assert!(h.state().records.request(t.request_id).unwrap().is_reported);

    h.inbox.drain();
    h.ex
        .resolve_report(&admin.token, report, ReportResolution::Dismiss, "Looks legitimate")
        .unwrap();

    let t = h.ex.transaction(&a.token, tx).unwrap();
    assert_eq!(t.status, TransactionStatus::Pending);
    assert!(!h.state().records.request(t.request_id).unwrap().is_reported);
    for party in [a.id, b.id] {
        assert!(h
            .inbox
            .for_user(party)
            .iter()
            .any(|n| n.kind == NotificationKind::TransactionResumed));
    }
    // Normal flow continues from pending.
    h.complete(&a, &b, tx);
    assert_eq!(h.balance(&b), 130);
    h.ex.verify_integrity().unwrap();
}

#[test]
fn upheld_request_report_reverses_the_paused_transaction() {
    let h = Harness::new();
    let a = h.user("ana");
    let b = h.provider("ben", SkillLevel::Expert, 0);
    let admin = h.admin("root");
    let tx = h.deal(&a, &b, 30);
    let report = h
        .ex
        .report_request_from_transaction(&b.token, tx, "Scam", "Asked to pay off-platform")
        .unwrap();

    h.ex
        .resolve_report(
            &admin.token,
            report,
            ReportResolution::Resolve { suspend_days: None },
            "Confirmed",
        )
        .unwrap();

    let state = h.state();
    let t = state.records.transaction(tx).unwrap();
    assert_eq!(t.status, TransactionStatus::Reversed);
    assert_eq!(
        state.records.request(t.request_id).unwrap().status,
        RequestStatus::Cancelled
    );
    assert_eq!(state.records.ledger.transaction_net(tx), 0);
    assert_eq!(h.balance(&a), 100);
    assert_eq!(h.balance(&b), 100);
    h.ex.verify_integrity().unwrap();
}

#[test]
fn escrow_nets_to_zero_for_every_terminal_path() {
    let h = Harness::new();
    let a = h.user("ana");
    let b = h.provider("ben", SkillLevel::Expert, 0);

    let completed = h.deal(&a, &b, 10);
    h.complete(&a, &b, completed);
    let cancelled = h.deal(&a, &b, 10);
    h.ex.cancel_transaction(&a.token, cancelled).unwrap();
    let rejected = h.deal(&a, &b, 10);
    h.ex.reject_transaction(&b.token, rejected).unwrap();

    let state = h.state();
    for tx in [completed, cancelled, rejected] {
        let t = state.records.transaction(tx).unwrap();
        assert!(t.status.is_terminal());
        assert_eq!(state.records.ledger.transaction_net(tx), 0, "{tx} leaks credits");
    }
    assert_eq!(state.records.ledger.total_held(), 0);
    h.ex.verify_integrity().unwrap();
}
