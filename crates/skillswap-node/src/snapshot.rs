//! JSON snapshot of the engine state.
//!
//! Written to a sibling temp file first and renamed into place, so a crash
//! mid-write leaves the previous snapshot intact.

use std::path::{Path, PathBuf};

use skillswap_exchange::{Exchange, State};

use crate::error::{NodeError, NodeResult};

fn snapshot_error(path: &Path, reason: impl std::fmt::Display) -> NodeError {
    NodeError::Snapshot {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

/// Load the snapshot at `path`. A missing file is a fresh start.
///
/// # Errors
/// `Snapshot` if the file exists but cannot be read or parsed.
pub fn load(path: &Path) -> NodeResult<Option<State>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path).map_err(|e| snapshot_error(path, e))?;
    let state = serde_json::from_str(&raw).map_err(|e| snapshot_error(path, e))?;
    Ok(Some(state))
}

/// # Errors
/// `Snapshot` if serialization or the write fails.
pub fn save(path: &Path, state: &State) -> NodeResult<()> {
    let json = serde_json::to_vec_pretty(state).map_err(|e| snapshot_error(path, e))?;
    let tmp = temp_path(path);
    std::fs::write(&tmp, json).map_err(|e| snapshot_error(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| snapshot_error(path, e))?;
    Ok(())
}

/// Restore `exchange` from `path` if a snapshot exists. The snapshot must
/// pass the engine's integrity check.
///
/// # Errors
/// `Snapshot` for an unreadable file, `Exchange` if the stored state
/// fails its integrity check.
pub fn restore_into(exchange: &Exchange, path: &Path) -> NodeResult<bool> {
    let Some(state) = load(path)? else {
        tracing::info!(path = %path.display(), "no snapshot, starting empty");
        return Ok(false);
    };
    let users = state.records.users.len();
    let transactions = state.records.transactions.len();
    exchange.restore(state)?;
    tracing::info!(path = %path.display(), users, transactions, "snapshot restored");
    Ok(true)
}

/// Persist the committed state of `exchange` to `path`.
///
/// # Errors
/// As [`save`].
pub fn persist(exchange: &Exchange, path: &Path) -> NodeResult<()> {
    let state = exchange.snapshot();
    save(path, &state)?;
    tracing::info!(path = %path.display(), "snapshot written");
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use skillswap_types::{ExchangeConfig, Role};

    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("skillswap-node-{}-{name}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join("state.json")
    }

    #[test]
    fn missing_file_is_a_fresh_start() {
        let path = scratch("missing");
        let _ = std::fs::remove_file(&path);
        assert!(load(&path).unwrap().is_none());
        let exchange = Exchange::new(ExchangeConfig::default());
        assert!(!restore_into(&exchange, &path).unwrap());
    }

    #[test]
    fn persisted_state_restores_into_a_new_engine() {
        let path = scratch("roundtrip");
        let first = Exchange::new(ExchangeConfig::default());
        let ana = first.register_user("ana", Role::User).unwrap();
        persist(&first, &path).unwrap();
        assert!(!temp_path(&path).exists());

        let second = Exchange::new(ExchangeConfig::default());
        assert!(restore_into(&second, &path).unwrap());
        let state = second.snapshot();
        assert_eq!(state.records.user(ana).unwrap().display_name, "ana");
        assert_eq!(state.records.ledger.balance(ana), 100);
    }

    #[test]
    fn corrupt_file_is_reported() {
        let path = scratch("corrupt");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(load(&path), Err(NodeError::Snapshot { .. })));
    }
}
