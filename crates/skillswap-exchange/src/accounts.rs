//! Provisioning and account reads.
//!
//! Registration sits outside authentication: it is how the node and the
//! tests seed users, skills, and sessions.

use skillswap_types::{
    AdminActionType, CreditHistoryEntry, Credits, ExchangeError, NewAdminAction, NotificationKind,
    Result, Role, SkillId, SkillLevel, SkillRecord, User, UserId, UserProfile, normalize_skill,
};

use crate::engine::Exchange;

impl Exchange {
    /// Create an account and open its ledger entry. Admins start at zero.
    ///
    /// # Errors
    /// `Validation` for a blank display name.
    pub fn register_user(&self, display_name: &str, role: Role) -> Result<UserId> {
        let name = display_name.trim();
        if name.is_empty() {
            return Err(ExchangeError::validation("display name is required"));
        }
        self.run(|cx| {
            let user = User::new(name, role, cx.now);
            let id = user.id;
            let opening = match role {
                Role::User => cx.config.accounts.initial_credits,
                Role::Admin => 0,
            };
            cx.db.ledger.open_account(id, opening, cx.now)?;
            cx.db.users.insert(id, user);
            tracing::info!(user = %id, %role, opening, "user registered");
            Ok(id)
        })
    }

    /// Record a skill a user can provide.
    ///
    /// # Errors
    /// `NotFound` for an unknown user, `Validation` for a blank name.
    pub fn register_skill(
        &self,
        user_id: UserId,
        name: &str,
        level: SkillLevel,
        endorsements: u32,
    ) -> Result<SkillId> {
        if normalize_skill(name).is_empty() {
            return Err(ExchangeError::validation("skill name is required"));
        }
        self.run(|cx| {
            cx.db.user(user_id)?;
            let skill = SkillRecord::new(user_id, name, level, endorsements);
            let id = skill.id;
            tracing::info!(user = %user_id, skill = %skill.name, %level, "skill registered");
            cx.db.skills.insert(id, skill);
            Ok(id)
        })
    }

    /// Mint a session token for an active account.
    ///
    /// # Errors
    /// `NotFound` for an unknown user, `AccountInactive` for a deactivated one.
    pub fn issue_session(&self, user_id: UserId) -> Result<String> {
        let (user, now) = self.query(|r| Ok((r.db.user(user_id)?.clone(), r.now)))?;
        if !user.is_active {
            return Err(ExchangeError::AccountInactive);
        }
        self.sessions().issue(user.id, user.role, now)
    }

    /// The caller's profile with their current balance.
    pub fn profile(&self, token: &str) -> Result<UserProfile> {
        self.query(|r| {
            let user = r.authenticate(token)?;
            Ok(UserProfile {
                id: user.id,
                display_name: user.display_name,
                role: user.role,
                credits: r.db.ledger.balance(user.id),
                is_active: user.is_active,
                suspended_until: user.suspended_until,
            })
        })
    }

    pub fn balance(&self, token: &str) -> Result<Credits> {
        self.query(|r| {
            let user = r.authenticate(token)?;
            Ok(r.db.ledger.balance(user.id))
        })
    }

    /// The caller's ledger rows in creation order.
    pub fn credit_history(&self, token: &str) -> Result<Vec<CreditHistoryEntry>> {
        self.query(|r| {
            let user = r.authenticate(token)?;
            Ok(r.db.ledger.history(user.id).into_iter().cloned().collect())
        })
    }

    /// Admin correction of a balance. Journaled, but not undoable: the
    /// reversal of an adjustment is a compensating adjustment.
    ///
    /// # Errors
    /// - `AdminRequired` for non-admins
    /// - `Validation` for a blank reason or zero amount
    /// - `BalanceUnderflow` if the balance would go negative
    pub fn adjust_credits(
        &self,
        admin_token: &str,
        user_id: UserId,
        amount: Credits,
        reason: &str,
    ) -> Result<Credits> {
        self.run(|cx| {
            let admin = cx.require_admin(admin_token)?;
            if reason.trim().is_empty() {
                return Err(ExchangeError::validation("adjustment reason is required"));
            }
            cx.db.user(user_id)?;
            cx.db.ledger.adjust(user_id, amount, reason, cx.now)?;
            let balance = cx.db.ledger.balance(user_id);
            cx.audit.record(
                NewAdminAction::new(
                    admin.id,
                    AdminActionType::CreditsAdjusted,
                    format!("{amount:+} credits: {reason}"),
                )
                .target(user_id),
                cx.now,
            );
            cx.notify(
                user_id,
                NotificationKind::CreditsAdjusted,
                format!("An administrator adjusted your balance by {amount:+} credits"),
                user_id,
            );
            tracing::info!(user = %user_id, amount, balance, "credits adjusted");
            Ok(balance)
        })
    }
}
