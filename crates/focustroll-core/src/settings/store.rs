//! Settings store boundary.
//!
//! The engine only ever *reads* settings (plus a best-effort action append);
//! the mutation surface exists for the popup/options layer of an embedding
//! shell. [`MemorySettingsStore`] implements both sides in process: it is
//! the reference implementation for embedders and the double used by the
//! engine tests. Mutators silently sanitize their inputs and report plain
//! success/failure, never an error the UI would have to render.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{watch, Mutex};

use super::actions::{self, ActionEntry};
use super::{BlockMethod, Settings, Site};
use crate::error::SettingsError;
use crate::host::{self, HostKey};
use crate::schedule::{sanitize_time_str, OnDutySchedule};

/// Read side of the settings boundary, as consumed by the policy engine.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Fetch the current settings snapshot.
    async fn get(&self) -> Result<Settings, SettingsError>;

    /// Append an intervention to the action history. Best effort: returns
    /// false when the entry was rejected or could not be persisted.
    async fn record_action(&self, host: &HostKey, action_type: &str) -> bool;
}

struct StoreState {
    settings: Settings,
    actions: Vec<ActionEntry>,
    revision: u64,
}

/// In-memory settings store with the full mutation surface.
pub struct MemorySettingsStore {
    state: Mutex<StoreState>,
    changed: watch::Sender<u64>,
}

impl Default for MemorySettingsStore {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl MemorySettingsStore {
    pub fn new(settings: Settings) -> Self {
        let (changed, _) = watch::channel(0);
        Self {
            state: Mutex::new(StoreState {
                settings,
                actions: Vec::new(),
                revision: 0,
            }),
            changed,
        }
    }

    /// Observe settings revisions; the receiver yields after every
    /// successful mutation. The shell forwards these to the engine as
    /// `SettingsChanged` events.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changed.subscribe()
    }

    async fn mutate<F>(&self, mutation: F) -> bool
    where
        F: FnOnce(&mut Settings) -> bool,
    {
        let mut state = self.state.lock().await;
        if !mutation(&mut state.settings) {
            return false;
        }
        state.revision += 1;
        let revision = state.revision;
        drop(state);
        let _ = self.changed.send(revision);
        true
    }

    /// Replace everything with the built-in defaults (action history kept).
    pub async fn restore_defaults(&self) -> bool {
        self.mutate(|settings| {
            *settings = Settings::default();
            true
        })
        .await
    }

    /// Add a custom site. Rejects unusable hosts and duplicates.
    pub async fn add_site(&self, name: &str, url: &str, method: &str) -> bool {
        let Some(key) = host::from_input(url) else {
            return false;
        };
        let method = BlockMethod::from_wire(method);
        self.mutate(|settings| {
            if settings.sites.iter().any(|s| s.host == key) {
                return false;
            }
            let name = name.trim();
            let name = if name.is_empty() { key.as_str() } else { name };
            settings.sites.push(Site::custom(name, key.clone(), method));
            true
        })
        .await
    }

    /// Update a site's block method; unknown method names coerce to `none`.
    pub async fn update_site_method(&self, url: &str, method: &str) -> bool {
        let Some(key) = host::from_input(url) else {
            return false;
        };
        let method = BlockMethod::from_wire(method);
        self.mutate(|settings| {
            match settings.sites.iter_mut().find(|s| s.host == key) {
                Some(site) => {
                    site.set_method(method);
                    true
                }
                None => false,
            }
        })
        .await
    }

    pub async fn remove_site(&self, url: &str) -> bool {
        let Some(key) = host::from_input(url) else {
            return false;
        };
        self.mutate(|settings| {
            let before = settings.sites.len();
            settings.sites.retain(|s| s.host != key);
            settings.sites.len() != before
        })
        .await
    }

    pub async fn toggle_on_duty(&self, enabled: bool) -> bool {
        self.mutate(|settings| {
            settings.on_duty.enabled = enabled;
            true
        })
        .await
    }

    pub async fn update_always_on(&self, always_on: bool) -> bool {
        self.mutate(|settings| {
            settings.on_duty.always_on = always_on;
            true
        })
        .await
    }

    pub async fn update_start_time(&self, time: &str) -> bool {
        let Some(time) = sanitize_time_str(time) else {
            return false;
        };
        self.mutate(|settings| {
            settings.on_duty.start_time = time;
            true
        })
        .await
    }

    pub async fn update_end_time(&self, time: &str) -> bool {
        let Some(time) = sanitize_time_str(time) else {
            return false;
        };
        self.mutate(|settings| {
            settings.on_duty.end_time = time;
            true
        })
        .await
    }

    /// Set one weekday flag by name (`"monday"` .. `"sunday"`).
    pub async fn update_day(&self, day: &str, value: bool) -> bool {
        let day = day.to_string();
        self.mutate(move |settings| settings.on_duty.days.set_named(&day, value))
            .await
    }

    pub async fn update_auto_logout_delay(&self, delay: &str) -> bool {
        let value = coerce_enum(delay, &OnDutySchedule::AUTO_LOGOUT_DELAYS, "15s");
        self.mutate(|settings| {
            settings.on_duty.auto_logout_delay = value;
            true
        })
        .await
    }

    pub async fn update_feed_bypass_method(&self, method: &str) -> bool {
        let value = coerce_enum(method, &OnDutySchedule::FEED_BYPASS_METHODS, "button");
        self.mutate(|settings| {
            settings.on_duty.feed_bypass_method = value;
            true
        })
        .await
    }

    pub async fn update_mindful_timer_delay(&self, delay: &str) -> bool {
        let value = coerce_enum(delay, &OnDutySchedule::MINDFUL_TIMER_DELAYS, "15s");
        self.mutate(|settings| {
            settings.on_duty.mindful_timer_delay = value;
            true
        })
        .await
    }

    pub async fn update_grayscale_opacity(&self, opacity: &str) -> bool {
        let raw = opacity.trim().trim_end_matches('%');
        let value = coerce_enum(raw, &OnDutySchedule::GRAYSCALE_OPACITY_VALUES, "100");
        self.mutate(|settings| {
            settings.on_duty.grayscale_opacity = value;
            true
        })
        .await
    }

    /// Action history, optionally bounded to an inclusive time range,
    /// newest first.
    pub async fn actions(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Vec<ActionEntry> {
        let state = self.state.lock().await;
        let mut items: Vec<ActionEntry> = state
            .actions
            .iter()
            .filter(|a| start.is_none_or(|s| a.at >= s) && end.is_none_or(|e| a.at <= e))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.at.cmp(&a.at));
        items
    }

    /// Drop actions strictly older than `cutoff`; returns how many were
    /// removed.
    pub async fn purge_actions_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut state = self.state.lock().await;
        let before = state.actions.len();
        state.actions.retain(|a| a.at >= cutoff);
        before - state.actions.len()
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn get(&self) -> Result<Settings, SettingsError> {
        Ok(self.state.lock().await.settings.clone())
    }

    async fn record_action(&self, host: &HostKey, action_type: &str) -> bool {
        let action_type = action_type.trim();
        if action_type.is_empty() {
            return false;
        }
        let mut state = self.state.lock().await;
        state
            .actions
            .insert(0, ActionEntry::new(host.clone(), action_type));
        actions::trim(&mut state.actions, Utc::now());
        true
    }
}

fn coerce_enum(value: &str, allowed: &[&str], fallback: &str) -> String {
    if allowed.contains(&value) {
        value.to_string()
    } else {
        fallback.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_site_rejects_duplicates_by_host() {
        let store = MemorySettingsStore::default();
        assert!(store.add_site("HN", "news.ycombinator.com", "grayscale").await);
        assert!(
            !store
                .add_site("HN again", "www.news.ycombinator.com", "logOut")
                .await
        );
        // Built-in hosts are duplicates too.
        assert!(!store.add_site("Reddit", "reddit.com", "logOut").await);
    }

    #[tokio::test]
    async fn update_site_method_maintains_last_method() {
        let store = MemorySettingsStore::default();
        assert!(store.update_site_method("reddit.com", "grayscale").await);
        assert!(store.update_site_method("reddit.com", "none").await);
        let settings = store.get().await.unwrap();
        let site = settings
            .sites
            .iter()
            .find(|s| s.host.as_str() == "reddit.com")
            .unwrap();
        assert_eq!(site.block_method, BlockMethod::None);
        assert_eq!(site.last_method, BlockMethod::Grayscale);
    }

    #[tokio::test]
    async fn update_site_method_fails_for_unknown_host() {
        let store = MemorySettingsStore::default();
        assert!(!store.update_site_method("nowhere.example", "logOut").await);
    }

    #[tokio::test]
    async fn time_mutators_reject_invalid_input() {
        let store = MemorySettingsStore::default();
        assert!(store.update_start_time("9:30").await);
        assert!(!store.update_end_time("25:99").await);
        let settings = store.get().await.unwrap();
        assert_eq!(settings.on_duty.start_time, "09:30");
        assert_eq!(settings.on_duty.end_time, "17:00");
    }

    #[tokio::test]
    async fn enum_knobs_coerce_to_defaults() {
        let store = MemorySettingsStore::default();
        assert!(store.update_mindful_timer_delay("90s").await);
        assert!(store.update_grayscale_opacity("42%").await);
        assert!(store.update_auto_logout_delay("2h").await);
        let settings = store.get().await.unwrap();
        assert_eq!(settings.on_duty.mindful_timer_delay, "15s");
        assert_eq!(settings.on_duty.grayscale_opacity, "100");
        assert_eq!(settings.on_duty.auto_logout_delay, "15s");

        assert!(store.update_grayscale_opacity("25").await);
        let settings = store.get().await.unwrap();
        assert_eq!(settings.on_duty.grayscale_opacity, "25");
    }

    #[tokio::test]
    async fn mutations_notify_subscribers() {
        let store = MemorySettingsStore::default();
        let mut rx = store.subscribe();
        assert!(store.toggle_on_duty(false).await);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), 1);
        // A rejected mutation produces no notification.
        assert!(!store.update_day("funday", true).await);
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn record_action_trims_history() {
        let store = MemorySettingsStore::default();
        let host = crate::host::from_input("x.com").unwrap();
        for _ in 0..300 {
            assert!(store.record_action(&host, "logOut").await);
        }
        assert_eq!(store.actions(None, None).await.len(), actions::MAX_ACTIONS);
        assert!(!store.record_action(&host, "   ").await);
    }
}
