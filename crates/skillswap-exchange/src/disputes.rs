//! Disputes on in-progress transactions.
//!
//! Either party may open one while work is under way; the transaction then
//! sits in `disputed` with its escrow intact until an admin either forces
//! completion or sends it back to `in_progress`.

use serde::{Deserialize, Serialize};
use skillswap_types::{
    AdminActionType, BlobRef, Dispute, DisputeId, DisputeStatus, ExchangeError, NewAdminAction,
    NotificationKind, RelatedEntity, Result, TransactionId, TransactionStatus,
};

use crate::engine::{Ctx, Exchange};
use crate::transactions::{check_evidence, complete_transaction, expect_status, party_transaction};

/// Admin decision on a dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeResolution {
    /// `open → under_review`; the transaction stays paused.
    Review,
    /// Force completion and pay out if not already paid.
    Complete,
    /// Resume the transaction so confirmation can continue.
    Dismiss,
}

impl Exchange {
    /// File a dispute without attachments.
    ///
    /// # Errors
    /// - `Forbidden` for callers outside the transaction
    /// - `DisputeAlreadyOpen` while another dispute is open
    /// - `InvalidState` unless the transaction is in progress
    pub fn open_dispute(
        &self,
        token: &str,
        tx_id: TransactionId,
        reason: &str,
        description: &str,
    ) -> Result<DisputeId> {
        self.run(|cx| file_dispute(cx, token, tx_id, reason, description, None))
    }

    /// File a dispute backed by an evidence attachment.
    ///
    /// # Errors
    /// As [`Self::open_dispute`], plus `Validation` for a blank reference.
    pub fn report_dispute(
        &self,
        token: &str,
        tx_id: TransactionId,
        reason: &str,
        description: &str,
        evidence: BlobRef,
    ) -> Result<DisputeId> {
        self.run(|cx| file_dispute(cx, token, tx_id, reason, description, Some(evidence)))
    }

    /// Rule on a dispute.
    ///
    /// # Errors
    /// - `AdminRequired` for non-admins
    /// - `AlreadyProcessed` once the dispute is closed
    /// - `InvalidState` if the transaction is not `disputed`, or for
    ///   `Review` on a dispute already under review
    pub fn resolve_dispute(
        &self,
        admin_token: &str,
        dispute_id: DisputeId,
        resolution: DisputeResolution,
        note: &str,
    ) -> Result<DisputeStatus> {
        self.run(|cx| {
            let admin = cx.require_admin(admin_token)?;
            let dispute = cx.db.dispute(dispute_id)?.clone();
            if !dispute.status.is_open() {
                return Err(ExchangeError::AlreadyProcessed { entity: "Dispute" });
            }
            let tx = cx.db.transaction(dispute.transaction_id)?.clone();

            let (status, action_type) = match resolution {
                DisputeResolution::Review => {
                    if dispute.status != DisputeStatus::Open {
                        return Err(ExchangeError::invalid_state(
                            "Dispute",
                            "open",
                            dispute.status,
                        ));
                    }
                    (DisputeStatus::UnderReview, AdminActionType::DisputeUnderReview)
                }
                // A dispute reopened by an undo may sit on a transaction
                // that already completed; ruling on it again moves no credits.
                DisputeResolution::Complete => {
                    match tx.status {
                        TransactionStatus::Disputed => {
                            complete_transaction(cx, tx.id)?;
                        }
                        TransactionStatus::Completed => {}
                        _ => expect_status(&tx, TransactionStatus::Disputed)?,
                    }
                    (DisputeStatus::Resolved, AdminActionType::DisputeResolved)
                }
                DisputeResolution::Dismiss => {
                    match tx.status {
                        TransactionStatus::Disputed => {
                            cx.db.transaction_mut(tx.id)?.status = TransactionStatus::InProgress;
                        }
                        TransactionStatus::Completed => {}
                        _ => expect_status(&tx, TransactionStatus::Disputed)?,
                    }
                    (DisputeStatus::Dismissed, AdminActionType::DisputeDismissed)
                }
            };

            let now = cx.now;
            let d = cx.db.dispute_mut(dispute_id)?;
            d.status = status;
            d.admin_note = Some(note.trim().to_string()).filter(|n| !n.is_empty());
            if status != DisputeStatus::UnderReview {
                d.resolved_by = Some(admin.id);
                d.resolved_at = Some(now);
            }
            cx.audit.record(
                NewAdminAction::new(admin.id, action_type, format!("Dispute {status}: {note}"))
                    .target(dispute.filed_by)
                    .related(RelatedEntity::Dispute(dispute_id)),
                now,
            );
            for user in [tx.requester_id, tx.provider_id] {
                cx.notify(
                    user,
                    NotificationKind::DisputeUpdated,
                    format!("Dispute is now {status}"),
                    dispute_id,
                );
            }
            tracing::info!(dispute = %dispute_id, tx = %tx.id, %status, "dispute ruled on");
            Ok(status)
        })
    }
}

fn file_dispute(
    cx: &mut Ctx<'_>,
    token: &str,
    tx_id: TransactionId,
    reason: &str,
    description: &str,
    evidence: Option<BlobRef>,
) -> Result<DisputeId> {
    let (role, tx) = party_transaction(cx, token, tx_id, None)?;
    if cx.db.open_dispute_for(tx_id).is_some() {
        return Err(ExchangeError::DisputeAlreadyOpen);
    }
    expect_status(&tx, TransactionStatus::InProgress)?;
    if reason.trim().is_empty() {
        return Err(ExchangeError::validation("dispute reason is required"));
    }
    check_evidence(evidence.as_ref())?;

    let filed_by = tx.party(role);
    let dispute = Dispute {
        id: DisputeId::new(),
        transaction_id: tx_id,
        filed_by,
        reason: reason.trim().to_string(),
        description: description.trim().to_string(),
        evidence,
        status: DisputeStatus::Open,
        admin_note: None,
        resolved_by: None,
        resolved_at: None,
        created_at: cx.now,
    };
    let id = dispute.id;
    cx.db.disputes.insert(id, dispute);
    cx.db.transaction_mut(tx_id)?.status = TransactionStatus::Disputed;
    cx.notify(
        tx.counterparty(role),
        NotificationKind::DisputeOpened,
        format!("The {role} opened a dispute on your transaction"),
        id,
    );
    tracing::info!(dispute = %id, tx = %tx_id, %role, "dispute opened");
    Ok(id)
}
