//! Post-completion feedback.

use skillswap_types::{
    ExchangeError, NotificationKind, Rating, RatingId, Result, TransactionId, TransactionStatus,
    UserId,
    constants::{MAX_RATING_SCORE, MIN_RATING_SCORE},
};

use crate::engine::Exchange;
use crate::transactions::{expect_status, party_transaction};

impl Exchange {
    /// Rate the other party of a completed transaction, once per rater.
    ///
    /// # Errors
    /// - `Forbidden` for callers outside the transaction
    /// - `InvalidState` unless the transaction is completed
    /// - `Validation` for a score outside 1..=5
    /// - `AlreadyRated` on a second rating by the same user
    pub fn submit_rating(
        &self,
        token: &str,
        tx_id: TransactionId,
        score: u8,
        comment: &str,
    ) -> Result<RatingId> {
        self.run(|cx| {
            let (role, tx) = party_transaction(cx, token, tx_id, None)?;
            expect_status(&tx, TransactionStatus::Completed)?;
            if !(MIN_RATING_SCORE..=MAX_RATING_SCORE).contains(&score) {
                return Err(ExchangeError::validation(format!(
                    "score must be between {MIN_RATING_SCORE} and {MAX_RATING_SCORE}, got {score}"
                )));
            }
            let ratee_id = tx.counterparty(role);
            let rater_id = tx.party(role);
            if cx
                .db
                .ratings
                .values()
                .any(|r| r.transaction_id == tx_id && r.rater_id == rater_id)
            {
                return Err(ExchangeError::AlreadyRated);
            }

            let rating = Rating {
                id: RatingId::new(),
                transaction_id: tx_id,
                rater_id,
                ratee_id,
                score,
                comment: comment.trim().to_string(),
                is_reported: false,
                created_at: cx.now,
            };
            let id = rating.id;
            cx.db.ratings.insert(id, rating);
            cx.notify(
                ratee_id,
                NotificationKind::RatingReceived,
                format!("You received a {score}-star rating"),
                id,
            );
            tracing::info!(rating = %id, tx = %tx_id, score, "rating submitted");
            Ok(id)
        })
    }

    /// Ratings a user has received, minus those hidden by an upheld report.
    pub fn user_ratings(&self, token: &str, user_id: UserId) -> Result<Vec<Rating>> {
        self.query(|r| {
            r.authenticate(token)?;
            r.db.user(user_id)?;
            Ok(r.db
                .ratings
                .values()
                .filter(|rating| rating.ratee_id == user_id && !rating.is_reported)
                .cloned()
                .collect())
        })
    }
}
