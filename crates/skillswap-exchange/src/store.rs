//! The transactional record store.
//!
//! `transact` is the per-handler atomic unit: the handler runs against a
//! working copy of the state under the store lock, and the copy replaces
//! the committed state only if the handler returns `Ok`. Concurrent calls
//! serialise on the lock, so the second of two racing "accept" calls sees
//! the first one's commit and fails its own precondition check.
//!
//! A handler that panics does so on its working copy, so the committed
//! state behind a poisoned lock is still the last good commit. The store
//! recovers the guard and keeps serving.

use std::sync::{Mutex, MutexGuard, PoisonError};

use skillswap_types::Result;

use crate::state::State;

#[derive(Debug, Default)]
pub struct Store {
    state: Mutex<State>,
}

impl Store {
    #[must_use]
    pub fn new(state: State) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    /// Run `f` atomically. On `Err` nothing `f` did is kept.
    ///
    /// # Errors
    /// Whatever `f` returns.
    pub fn transact<T>(&self, f: impl FnOnce(&mut State) -> Result<T>) -> Result<T> {
        let mut committed = self.lock();
        let mut working = committed.clone();
        let out = f(&mut working)?;
        *committed = working;
        Ok(out)
    }

    /// Run a read-only query against the committed state.
    ///
    /// # Errors
    /// Whatever `f` returns.
    pub fn read<T>(&self, f: impl FnOnce(&State) -> Result<T>) -> Result<T> {
        let committed = self.lock();
        f(&committed)
    }

    /// Clone of the committed state.
    #[must_use]
    pub fn snapshot(&self) -> State {
        self.lock().clone()
    }

    /// Replace the committed state wholesale.
    pub fn restore(&self, state: State) {
        *self.lock() = state;
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("record store lock was poisoned by a panicking handler, recovering");
            self.state.clear_poison();
            PoisonError::into_inner(poisoned)
        })
    }
}
