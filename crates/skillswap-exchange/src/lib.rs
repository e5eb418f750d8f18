//! # skillswap-exchange
//!
//! **Exchange & moderation engine** for the SkillSwap marketplace.
//!
//! Every public operation on [`Exchange`] is one atomic unit against the
//! record store: it authenticates the caller, checks every precondition,
//! then mutates. A failed call leaves no trace, and notifications go out
//! only after commit.
//!
//! ## Architecture
//!
//! 1. **Matching** ([`matching`]): scores providers for open requests
//! 2. **Negotiation** ([`negotiation`]): one live counter-offer per match
//! 3. **Transactions** ([`transactions`]): the escrowed fulfillment state
//!    machine
//! 4. **Moderation** ([`disputes`], [`reports`], [`fraud`]): admin queues
//!    and their side effects
//! 5. **Admin journal** ([`admin`], [`journal`]): append-only audit with
//!    typed, one-shot undo
//!
//! ## Lifecycle
//!
//! ```text
//! request ──▶ matches ──accept / negotiate──▶ transaction
//!                                               │
//!           pending ──start──▶ in_progress ──confirm x2──▶ completed
//!              │                    │
//!              ├─cancel/reject─▶ cancelled      └─dispute─▶ disputed
//!              └─report──────▶ disputed ──upheld──▶ reversed
//! ```

pub mod accounts;
pub mod admin;
pub mod clock;
pub mod disputes;
pub mod engine;
pub mod fraud;
pub mod journal;
pub mod matching;
pub mod negotiation;
pub mod notify;
pub mod ratings;
pub mod reports;
pub mod requests;
pub mod rpc;
pub mod session;
pub mod state;
pub mod store;
pub mod transactions;

pub use admin::{AdminQueue, QueuedDispute, QueuedFraudAlert, QueuedReport};
pub use clock::{Clock, ManualClock, SystemClock};
pub use disputes::DisputeResolution;
pub use engine::Exchange;
pub use fraud::{Activity, Finding, FraudResolution};
pub use journal::{AdminJournal, AuditSink};
pub use negotiation::NegotiationOutcome;
pub use notify::{InMemoryInbox, NotificationSink, TracingSink};
pub use reports::ReportResolution;
pub use requests::RequestView;
pub use rpc::{RpcRequest, dispatch, handle_line};
pub use session::{Session, SessionStore, SessionVerifier};
pub use state::{Records, State};
pub use store::Store;
