//! Intervention dispatch.
//!
//! `apply_tab` recomputes the desired intervention for a tab from scratch on
//! every trigger and transitions from whatever is currently painted. All
//! transitions are idempotent: re-applying with unchanged inputs invokes no
//! duplicate effect, so repeated navigation events within the same page are
//! free.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tracing::{debug, warn};
use uuid::Uuid;

use super::mindful::{self, MindfulPhase, MindfulRecord};
use super::{EngineInner, EngineState};
use crate::events::{FinishReason, TabId};
use crate::host::{self, HostKey};
use crate::policy;
use crate::ports::MindfulParams;
use crate::settings::{BlockMethod, Settings};

/// What is currently painted on a tab. The dispatcher is the sole writer;
/// everything else only observes.
#[derive(Debug)]
pub(crate) enum ActiveIntervention {
    Grayscale { opacity: f64 },
    Mindful(MindfulRecord),
}

impl EngineInner {
    /// Recompute and apply the correct intervention for one tab.
    pub(crate) async fn apply_tab(self: &Arc<Self>, tab_id: TabId) {
        let settings = match self.settings.get().await {
            Ok(settings) => settings,
            Err(error) => {
                warn!(%error, tab_id, "settings unavailable, tab left as-is");
                return;
            }
        };
        let mut state = self.state.lock().await;
        let record = match state.tabs.get(tab_id) {
            Some(record) => record.clone(),
            None => {
                self.clear_intervention(&mut state, tab_id).await;
                return;
            }
        };
        // Incognito tabs are never painted; tabs without a web URL have
        // nothing to paint on.
        let key = match record.host {
            Some(key) if !record.incognito => key,
            _ => {
                self.clear_intervention(&mut state, tab_id).await;
                return;
            }
        };
        let now = Local::now().naive_local();
        match policy::active_method(&settings, &key, now) {
            Some(BlockMethod::Grayscale) => {
                self.apply_grayscale(&mut state, tab_id, &key, &settings).await;
            }
            Some(BlockMethod::MindfulTimer) => {
                self.apply_mindful(&mut state, tab_id, &key, &record.url, &settings)
                    .await;
            }
            // logOut is handled entirely by the close-time debounce and
            // hideFeed by the content layer; neither paints the tab here.
            _ => self.clear_intervention(&mut state, tab_id).await,
        }
    }

    async fn apply_grayscale(
        &self,
        state: &mut EngineState,
        tab_id: TabId,
        key: &HostKey,
        settings: &Settings,
    ) {
        if !self.permission_granted(tab_id, key).await {
            self.clear_intervention(state, tab_id).await;
            return;
        }
        let target = settings.on_duty.grayscale_fraction();
        if let Some(ActiveIntervention::Grayscale { opacity }) = state.interventions.get(&tab_id) {
            if (*opacity - target).abs() < 0.005 {
                // Already painted at this strength.
                return;
            }
        }
        if matches!(
            state.interventions.get(&tab_id),
            Some(ActiveIntervention::Mindful(_))
        ) {
            self.clear_intervention(state, tab_id).await;
        }
        match self.overlay.apply_grayscale(tab_id, target).await {
            Ok(()) => {
                state
                    .interventions
                    .insert(tab_id, ActiveIntervention::Grayscale { opacity: target });
                debug!(tab_id, host = %key, opacity = target, "grayscale applied");
            }
            Err(error) => warn!(tab_id, %error, "grayscale injection failed"),
        }
    }

    async fn apply_mindful(
        self: &Arc<Self>,
        state: &mut EngineState,
        tab_id: TabId,
        key: &HostKey,
        url: &str,
        settings: &Settings,
    ) {
        if let Some(ActiveIntervention::Mindful(record)) = state.interventions.get(&tab_id) {
            if record.host == *key {
                match record.phase {
                    // The pause is shown at most once per distinct visit:
                    // suppressed until this tab navigates to another host.
                    MindfulPhase::Completed => return,
                    MindfulPhase::InFlight if record.url == url => return,
                    // Same host, new URL: supersede the instance below.
                    MindfulPhase::InFlight => {}
                }
            }
        }
        self.clear_intervention(state, tab_id).await;
        if !self.permission_granted(tab_id, key).await {
            return;
        }
        let delay = settings.on_duty.mindful_delay();
        self.start_mindful(state, tab_id, key, url, delay).await;
    }

    /// Show a fresh overlay instance and start its countdown. A zero delay
    /// completes the instance synchronously, with no clock tick involved.
    async fn start_mindful(
        self: &Arc<Self>,
        state: &mut EngineState,
        tab_id: TabId,
        key: &HostKey,
        url: &str,
        delay: Duration,
    ) {
        let instance_id = Uuid::new_v4();
        let params = MindfulParams {
            instance_id,
            delay_ms: delay.as_millis() as u64,
            prompt: mindful::pick_prompt(),
        };
        if let Err(error) = self.overlay.show_mindful_overlay(tab_id, &params).await {
            warn!(tab_id, %error, "mindful overlay injection failed");
            return;
        }
        let countdown = mindful::spawn_countdown(self.clone(), tab_id, instance_id, delay);
        state.interventions.insert(
            tab_id,
            ActiveIntervention::Mindful(MindfulRecord::new(
                instance_id,
                key.clone(),
                url.to_string(),
                countdown,
            )),
        );
        debug!(tab_id, host = %key, %instance_id, delay_ms = params.delay_ms, "mindful pause shown");
        if delay.is_zero() {
            self.finish_mindful_locked(state, tab_id, instance_id, FinishReason::Complete)
                .await;
        }
    }

    /// Finish a mindful instance: countdown elapsed or overlay message.
    /// Signals for any other instance id are stale and discarded.
    pub(crate) async fn finish_mindful_locked(
        &self,
        state: &mut EngineState,
        tab_id: TabId,
        instance_id: Uuid,
        reason: FinishReason,
    ) {
        let Some(ActiveIntervention::Mindful(record)) = state.interventions.get_mut(&tab_id)
        else {
            debug!(tab_id, %instance_id, "mindful signal for unknown tab ignored");
            return;
        };
        if record.instance_id != instance_id {
            debug!(tab_id, %instance_id, "stale mindful signal ignored");
            return;
        }
        if record.phase == MindfulPhase::Completed {
            return;
        }
        record.abort_countdown();
        record.phase = MindfulPhase::Completed;
        debug!(tab_id, %instance_id, ?reason, "mindful pause finished");
        if let Err(error) = self.overlay.clear_mindful_overlay(tab_id).await {
            warn!(tab_id, %error, "clearing mindful overlay failed");
        }
    }

    pub(crate) async fn on_mindful_signal(
        self: &Arc<Self>,
        tab_id: TabId,
        instance_id: Uuid,
        reason: FinishReason,
    ) {
        let mut state = self.state.lock().await;
        self.finish_mindful_locked(&mut state, tab_id, instance_id, reason)
            .await;
    }

    /// Remove and un-paint whatever is active on a live tab. No record, no
    /// effect.
    pub(crate) async fn clear_intervention(&self, state: &mut EngineState, tab_id: TabId) {
        match state.interventions.remove(&tab_id) {
            None => {}
            Some(ActiveIntervention::Grayscale { .. }) => {
                if let Err(error) = self.overlay.clear_grayscale(tab_id).await {
                    warn!(tab_id, %error, "clearing grayscale failed");
                }
            }
            Some(ActiveIntervention::Mindful(mut record)) => {
                record.abort_countdown();
                if let Err(error) = self.overlay.clear_mindful_overlay(tab_id).await {
                    warn!(tab_id, %error, "clearing mindful overlay failed");
                }
            }
        }
    }

    async fn permission_granted(&self, tab_id: TabId, key: &HostKey) -> bool {
        match self
            .permissions
            .has_permission(&host::origin_patterns(key))
            .await
        {
            Ok(true) => true,
            Ok(false) => {
                debug!(tab_id, host = %key, "no permission, nothing painted");
                false
            }
            Err(error) => {
                warn!(tab_id, host = %key, %error, "permission check failed, nothing painted");
                false
            }
        }
    }
}

/// Forget paint state for a tab that no longer exists. No injections: there
/// is no tab to inject into.
pub(crate) fn drop_tab_paint_state(state: &mut EngineState, tab_id: TabId) {
    if let Some(ActiveIntervention::Mindful(mut record)) = state.interventions.remove(&tab_id) {
        record.abort_countdown();
    }
}
