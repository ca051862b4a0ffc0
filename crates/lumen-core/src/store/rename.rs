//! Copy-then-delete rename with existence polling.
//!
//! The store has no atomic rename, so it is modeled as a two-phase
//! operation: copy to the new key, wait for it to become visible, delete the
//! old key, wait for it to disappear. The waits only accommodate eventual
//! consistency; exhausting them is logged and tolerated since the copy and
//! delete calls themselves already succeeded. A failed delete after a
//! successful copy is an error: the object then exists at both keys and no
//! rollback is attempted.

use super::ObjectStore;
use crate::error::{PipelineError, RenamePhase};
use std::time::Duration;

/// Polling knobs for the two visibility waits.
#[derive(Debug, Clone)]
pub struct PollSettings {
    /// Max existence checks per wait
    pub max_attempts: u32,
    /// Fixed delay between checks
    pub interval: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            interval: Duration::from_secs(5),
        }
    }
}

/// Rename `old_key` to `new_key`, returning the new public URL.
pub async fn rename(
    store: &dyn ObjectStore,
    old_key: &str,
    new_key: &str,
    poll: &PollSettings,
) -> Result<String, PipelineError> {
    store
        .copy_object(old_key, new_key)
        .await
        .map_err(|e| PipelineError::Rename {
            phase: RenamePhase::Copy,
            old_key: old_key.to_string(),
            new_key: new_key.to_string(),
            message: e.to_string(),
        })?;

    if !wait_for_existence(store, new_key, true, poll).await {
        tracing::warn!(key = new_key, "Copied object not yet visible; proceeding");
    }

    store
        .delete_object(old_key)
        .await
        .map_err(|e| PipelineError::Rename {
            phase: RenamePhase::Delete,
            old_key: old_key.to_string(),
            new_key: new_key.to_string(),
            message: format!("{e} (object now exists at both keys)"),
        })?;

    if !wait_for_existence(store, old_key, false, poll).await {
        tracing::warn!(key = old_key, "Deleted object still visible; proceeding");
    }

    tracing::debug!(old_key, new_key, "Renamed object");
    Ok(store.public_url(new_key))
}

/// Poll until the key's existence matches `target`.
///
/// Returns `false` when attempts run out or every check errors; callers
/// treat that as advisory.
async fn wait_for_existence(
    store: &dyn ObjectStore,
    key: &str,
    target: bool,
    poll: &PollSettings,
) -> bool {
    for attempt in 0..poll.max_attempts {
        if attempt > 0 {
            tokio::time::sleep(poll.interval).await;
        }
        match store.object_exists(key).await {
            Ok(exists) if exists == target => return true,
            Ok(_) => {}
            Err(e) => tracing::debug!(key, attempt, "Existence check failed: {e}"),
        }
    }
    false
}
