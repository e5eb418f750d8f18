//! Shared fixtures for the scenario tests: an engine on a manual clock
//! with an in-memory inbox, plus shortcuts for seeding users and deals.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use skillswap_exchange::{Exchange, InMemoryInbox, ManualClock, State};
use skillswap_types::{
    Credits, ExchangeConfig, ExchangeMode, MatchId, NewRequest, RequestId, Role, SkillLevel,
    SuggestedMatch, TransactionId, UserId,
};

pub const SKILL: &str = "Graphic Design";

pub struct Harness {
    pub ex: Exchange,
    pub clock: Arc<ManualClock>,
    pub inbox: Arc<InMemoryInbox>,
}

/// A registered account with a live session.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: UserId,
    pub token: String,
}

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0)
        .single()
        .expect("valid start time")
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(ExchangeConfig::default())
    }

    pub fn with_config(config: ExchangeConfig) -> Self {
        let clock = Arc::new(ManualClock::new(start()));
        let inbox = Arc::new(InMemoryInbox::new());
        let ex = Exchange::with_parts(config, clock.clone(), inbox.clone());
        Self { ex, clock, inbox }
    }

    pub fn user(&self, name: &str) -> Account {
        self.account(name, Role::User)
    }

    pub fn admin(&self, name: &str) -> Account {
        self.account(name, Role::Admin)
    }

    fn account(&self, name: &str, role: Role) -> Account {
        let id = self.ex.register_user(name, role).expect("register");
        let token = self.ex.issue_session(id).expect("session");
        Account { id, token }
    }

    /// A user who can provide [`SKILL`].
    pub fn provider(&self, name: &str, level: SkillLevel, endorsements: u32) -> Account {
        let account = self.user(name);
        self.ex
            .register_skill(account.id, SKILL, level, endorsements)
            .expect("skill");
        account
    }

    pub fn credit_request(&self, requester: &Account, amount: Credits) -> RequestId {
        self.ex
            .create_request(&requester.token, &credit_input(amount))
            .expect("create request")
    }

    pub fn swap_request(&self, requester: &Account, offered: &str) -> RequestId {
        let input = NewRequest {
            title: "Logo swap".into(),
            description: "Trade a logo for lessons".into(),
            skill_needed: SKILL.into(),
            exchange_mode: ExchangeMode::SkillSwap,
            credit_amount: None,
            skill_offered: Some(offered.into()),
        };
        self.ex
            .create_request(&requester.token, &input)
            .expect("create swap request")
    }

    /// The owner's view of the match suggested to `provider`.
    pub fn match_for(&self, requester: &Account, request: RequestId, provider: UserId) -> SuggestedMatch {
        self.ex
            .view_request(&requester.token, request)
            .expect("view request")
            .matches
            .into_iter()
            .find(|m| m.provider_id == provider)
            .expect("provider was matched")
    }

    pub fn match_id(&self, requester: &Account, request: RequestId, provider: UserId) -> MatchId {
        self.match_for(requester, request, provider).id
    }

    /// Post a credit request and accept `provider`'s match.
    pub fn deal(&self, requester: &Account, provider: &Account, amount: Credits) -> TransactionId {
        let request = self.credit_request(requester, amount);
        let m = self.match_id(requester, request, provider.id);
        self.ex
            .accept_match(&requester.token, m)
            .expect("accept match")
    }

    /// Take a pending transaction all the way to completion.
    pub fn complete(&self, requester: &Account, provider: &Account, tx: TransactionId) {
        self.ex.start_transaction(&provider.token, tx).expect("start");
        self.ex
            .confirm_completion(&requester.token, tx)
            .expect("requester confirms");
        self.ex
            .confirm_completion(&provider.token, tx)
            .expect("provider confirms");
    }

    pub fn balance(&self, account: &Account) -> Credits {
        self.ex.balance(&account.token).expect("balance")
    }

    pub fn state(&self) -> State {
        self.ex.snapshot()
    }
}

pub fn credit_input(amount: Credits) -> NewRequest {
    NewRequest {
        title: "Bakery logo".into(),
        description: "A logo for my bakery".into(),
        skill_needed: SKILL.into(),
        exchange_mode: ExchangeMode::Credit,
        credit_amount: Some(amount),
        skill_offered: None,
    }
}
