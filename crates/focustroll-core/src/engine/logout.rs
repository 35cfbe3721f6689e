//! Delayed-logout debounce.
//!
//! Tab-close events fire per tab, not per site, and users routinely close
//! and reopen a tab within seconds. Eviction therefore waits out a grace
//! period and only acts once no tab for the host remains. State per host is
//! Idle (absent from the map) or Pending; a new timer always supersedes an
//! existing one, and generation stamps make supersede/cancel race-free --
//! a fired task that lost its generation does nothing.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::EngineInner;
use crate::host::{self, HostKey};
use crate::policy;
use crate::settings::BlockMethod;
use crate::tabs::TabRecord;

/// Grace period between a host's last tab closing and session eviction.
/// Fixed by design; the user-configurable delays elsewhere do not apply
/// here.
pub const LOGOUT_DELAY: Duration = Duration::from_secs(10);

#[derive(Debug)]
struct PendingLogout {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Per-host pending-eviction timers. At most one per host.
#[derive(Debug, Default)]
pub(crate) struct LogoutCoordinator {
    pending: HashMap<HostKey, PendingLogout>,
    next_generation: u64,
}

impl LogoutCoordinator {
    fn next_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    /// Register a timer, aborting any existing one for the host.
    fn insert(&mut self, key: HostKey, generation: u64, handle: JoinHandle<()>) {
        if let Some(old) = self.pending.insert(key, PendingLogout { generation, handle }) {
            old.handle.abort();
        }
    }

    /// Cancel a pending timer (user reopened the site). Returns whether one
    /// existed.
    pub fn cancel(&mut self, key: &HostKey) -> bool {
        match self.pending.remove(key) {
            Some(old) => {
                old.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Claim the pending entry iff `generation` is still the live one.
    fn take_if_current(&mut self, key: &HostKey, generation: u64) -> bool {
        let current = matches!(
            self.pending.get(key),
            Some(pending) if pending.generation == generation
        );
        if current {
            self.pending.remove(key);
        }
        current
    }

    pub fn is_pending(&self, key: &HostKey) -> bool {
        self.pending.contains_key(key)
    }
}

impl EngineInner {
    /// Tab-close side of the debounce. Eligibility (method, duty, host
    /// permission) is decided here, at close time; the fire side only
    /// re-checks that no tab for the host remains.
    pub(crate) async fn maybe_schedule_logout(self: &Arc<Self>, record: &TabRecord) {
        if record.incognito {
            return;
        }
        let Some(key) = record.host.clone() else {
            return;
        };
        let settings = match self.settings.get().await {
            Ok(settings) => settings,
            Err(error) => {
                warn!(%error, "settings unavailable, skipping logout debounce");
                return;
            }
        };
        let now = chrono::Local::now().naive_local();
        if policy::active_method(&settings, &key, now) != Some(BlockMethod::LogOut) {
            return;
        }
        match self
            .permissions
            .has_permission(&host::origin_patterns(&key))
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                debug!(host = %key, "no permission, skipping logout debounce");
                return;
            }
            Err(error) => {
                warn!(host = %key, %error, "permission check failed, skipping logout debounce");
                return;
            }
        }

        let mut state = self.state.lock().await;
        let generation = state.logouts.next_generation();
        let engine = self.clone();
        let task_key = key.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(LOGOUT_DELAY).await;
            engine.fire_logout(task_key, generation).await;
        });
        state.logouts.insert(key.clone(), generation, handle);
        info!(host = %key, delay_secs = LOGOUT_DELAY.as_secs(), "logout grace timer started");
    }

    async fn fire_logout(self: Arc<Self>, key: HostKey, generation: u64) {
        let mut state = self.state.lock().await;
        if !state.logouts.take_if_current(&key, generation) {
            // Superseded or cancelled while we slept.
            return;
        }
        // Hold the state lock through the re-check so a queued cancel
        // cannot interleave with the decision below.
        let tabs = match self.tab_host.query_all_tabs().await {
            Ok(tabs) => tabs,
            Err(error) => {
                warn!(host = %key, %error, "tab enumeration failed, eviction skipped");
                return;
            }
        };
        let still_open = tabs.iter().any(|tab| {
            !tab.incognito
                && tab
                    .url
                    .as_deref()
                    .and_then(host::from_url)
                    .is_some_and(|h| h == key)
        });
        if still_open {
            debug!(host = %key, "tabs still open, eviction skipped");
            return;
        }
        match self.evictor.evict_session(&key).await {
            Ok(()) => {
                info!(host = %key, "session evicted");
                if !self.store.record_action(&key, "logOut").await {
                    debug!(host = %key, "action history append rejected");
                }
            }
            Err(error) => warn!(host = %key, %error, "session eviction failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_handle() -> JoinHandle<()> {
        tokio::spawn(async {})
    }

    #[tokio::test]
    async fn supersede_keeps_only_latest_generation() {
        let mut coordinator = LogoutCoordinator::default();
        let key = host::from_input("x.com").unwrap();

        let first = coordinator.next_generation();
        coordinator.insert(key.clone(), first, dummy_handle());
        let second = coordinator.next_generation();
        coordinator.insert(key.clone(), second, dummy_handle());

        // The superseded generation can no longer claim the entry.
        assert!(!coordinator.take_if_current(&key, first));
        assert!(coordinator.is_pending(&key));
        assert!(coordinator.take_if_current(&key, second));
        assert!(!coordinator.is_pending(&key));
    }

    #[tokio::test]
    async fn cancel_removes_pending_entry() {
        let mut coordinator = LogoutCoordinator::default();
        let key = host::from_input("x.com").unwrap();

        let generation = coordinator.next_generation();
        coordinator.insert(key.clone(), generation, dummy_handle());
        assert!(coordinator.cancel(&key));
        assert!(!coordinator.cancel(&key));
        assert!(!coordinator.take_if_current(&key, generation));
    }
}
