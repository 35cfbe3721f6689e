//! The policy engine.
//!
//! One event intake ([`PolicyEngine::handle_event`]) over explicit owned
//! state: the tab tracker, the active-intervention map, and the pending
//! logout timers all live in a single `EngineState` behind a mutex, never
//! in module-level globals. Handlers re-derive the desired outcome from
//! current state on every event, so interleaved boundary I/O cannot leave a
//! decision based on a stale premise.

mod dispatcher;
mod logout;
mod mindful;

pub use logout::LOGOUT_DELAY;
pub use mindful::MINDFUL_PROMPTS;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::events::{EngineEvent, OverlayMessage, TabId, TabSnapshot};
use crate::host::{self, HostKey};
use crate::ports::{OverlayPort, PermissionProbe, SessionEvictor, TabHost};
use crate::settings::{SettingsCache, SettingsStore};
use crate::tabs::TabTracker;

use dispatcher::ActiveIntervention;
use logout::LogoutCoordinator;

pub(crate) struct EngineState {
    pub tabs: TabTracker,
    pub interventions: HashMap<TabId, ActiveIntervention>,
    pub logouts: LogoutCoordinator,
}

pub(crate) struct EngineInner {
    pub settings: SettingsCache,
    pub store: Arc<dyn SettingsStore>,
    pub permissions: Arc<dyn PermissionProbe>,
    pub evictor: Arc<dyn SessionEvictor>,
    pub overlay: Arc<dyn OverlayPort>,
    pub tab_host: Arc<dyn TabHost>,
    pub state: Mutex<EngineState>,
}

/// Tab-lifecycle policy engine. Construct once at extension startup, feed
/// it every browser event, and call [`reconcile_all_tabs`] after
/// construction to recover from the ephemeral state being empty.
///
/// [`reconcile_all_tabs`]: PolicyEngine::reconcile_all_tabs
pub struct PolicyEngine {
    inner: Arc<EngineInner>,
}

impl PolicyEngine {
    pub fn new(
        store: Arc<dyn SettingsStore>,
        permissions: Arc<dyn PermissionProbe>,
        evictor: Arc<dyn SessionEvictor>,
        overlay: Arc<dyn OverlayPort>,
        tab_host: Arc<dyn TabHost>,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                settings: SettingsCache::new(store.clone()),
                store,
                permissions,
                evictor,
                overlay,
                tab_host,
                state: Mutex::new(EngineState {
                    tabs: TabTracker::new(),
                    interventions: HashMap::new(),
                    logouts: LogoutCoordinator::default(),
                }),
            }),
        }
    }

    /// Process one browser event. Never fails: boundary errors are logged
    /// and degrade to "feature unavailable" for this event, and one failing
    /// tab does not affect others.
    pub async fn handle_event(&self, event: EngineEvent) {
        match event {
            EngineEvent::TabCreated { tab } => self.on_tab_created(tab).await,
            EngineEvent::TabUpdated { tab } => {
                let tab_id = tab.id;
                self.inner.state.lock().await.tabs.upsert(&tab);
                self.inner.apply_tab(tab_id).await;
            }
            EngineEvent::TabActivated { tab_id } => self.inner.apply_tab(tab_id).await,
            EngineEvent::TabRemoved {
                tab_id,
                window_closing,
            } => self.on_tab_removed(tab_id, window_closing).await,
            EngineEvent::SettingsChanged => {
                self.inner.settings.invalidate().await;
                if let Err(error) = self.reconcile_all_tabs().await {
                    warn!(%error, "re-evaluation after settings change failed");
                }
            }
            EngineEvent::Overlay { message } => self.on_overlay_message(message).await,
        }
    }

    /// Re-derive everything from a fresh tab enumeration: rebuild the
    /// tracker, drop paint state for tabs that no longer exist, and
    /// re-apply the correct intervention to every open tab. Called at
    /// startup and after settings changes.
    pub async fn reconcile_all_tabs(&self) -> Result<()> {
        let tabs = self.inner.tab_host.query_all_tabs().await?;
        let ids = {
            let mut state = self.inner.state.lock().await;
            state.tabs.replace_all(&tabs);
            let stale: Vec<TabId> = state
                .interventions
                .keys()
                .copied()
                .filter(|id| !state.tabs.contains(*id))
                .collect();
            for id in stale {
                dispatcher::drop_tab_paint_state(&mut state, id);
            }
            state.tabs.ids()
        };
        info!(tab_count = ids.len(), "reconciling interventions for all tabs");
        for id in ids {
            self.inner.apply_tab(id).await;
        }
        Ok(())
    }

    /// Introspection: is a logout grace timer pending for `host`?
    pub async fn has_pending_logout(&self, key: &HostKey) -> bool {
        self.inner.state.lock().await.logouts.is_pending(key)
    }

    /// Introspection: number of tabs currently tracked.
    pub async fn tracked_tabs(&self) -> usize {
        self.inner.state.lock().await.tabs.len()
    }

    async fn on_tab_created(&self, tab: TabSnapshot) {
        let tab_id = tab.id;
        {
            let mut state = self.inner.state.lock().await;
            state.tabs.upsert(&tab);
            // A fresh tab on a pending host retracts the "I'm done with
            // this site" signal.
            if !tab.incognito {
                if let Some(key) = tab.url.as_deref().and_then(host::from_url) {
                    if state.logouts.cancel(&key) {
                        info!(host = %key, "logout cancelled, site reopened");
                    }
                }
            }
        }
        self.inner.apply_tab(tab_id).await;
    }

    async fn on_tab_removed(&self, tab_id: TabId, window_closing: bool) {
        let removed = {
            let mut state = self.inner.state.lock().await;
            dispatcher::drop_tab_paint_state(&mut state, tab_id);
            state.tabs.remove(tab_id)
        };
        if window_closing {
            debug!(tab_id, "tab removed with its window, no logout debounce");
            return;
        }
        let Some(record) = removed else {
            debug!(tab_id, "no stored record for closed tab");
            return;
        };
        self.inner.maybe_schedule_logout(&record).await;
    }

    async fn on_overlay_message(&self, message: OverlayMessage) {
        match message {
            OverlayMessage::MindfulFinished {
                tab_id,
                instance_id,
                reason,
            } => {
                self.inner
                    .on_mindful_signal(tab_id, instance_id, reason)
                    .await;
            }
            OverlayMessage::CloseTabRequested {
                tab_id,
                instance_id,
            } => {
                let current = {
                    let state = self.inner.state.lock().await;
                    matches!(
                        state.interventions.get(&tab_id),
                        Some(ActiveIntervention::Mindful(record))
                            if record.instance_id == instance_id
                    )
                };
                if !current {
                    debug!(tab_id, %instance_id, "stale close request ignored");
                    return;
                }
                if let Err(error) = self.inner.tab_host.close_tab(tab_id).await {
                    warn!(tab_id, %error, "closing tab on overlay request failed");
                }
                // The TabRemoved event that follows does the cleanup.
            }
        }
    }
}
