//! Last-known per-tab state.
//!
//! The browser does not include a tab's URL in its close event, so the
//! tracker remembers what was in each tab while it was alive. Records are
//! ephemeral: lost on restart and rebuilt wholesale from a tab enumeration.

use std::collections::HashMap;

use crate::events::{TabId, TabSnapshot};
use crate::host::{self, HostKey};

/// What we last knew about an open tab.
#[derive(Debug, Clone)]
pub struct TabRecord {
    pub url: String,
    /// `None` for non-web URLs (`chrome://`, `about:`, ...).
    pub host: Option<HostKey>,
    pub incognito: bool,
}

/// Per-tab record map. One instance, owned by the engine.
#[derive(Debug, Default)]
pub struct TabTracker {
    tabs: HashMap<TabId, TabRecord>,
}

impl TabTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record or refresh a tab from an event snapshot. Snapshots without a
    /// URL leave any existing record untouched.
    pub fn upsert(&mut self, snapshot: &TabSnapshot) {
        let Some(url) = snapshot.url.as_deref() else {
            return;
        };
        self.tabs.insert(
            snapshot.id,
            TabRecord {
                url: url.to_string(),
                host: host::from_url(url),
                incognito: snapshot.incognito,
            },
        );
    }

    /// Forget a closed tab, returning its last record for the logout flow.
    pub fn remove(&mut self, tab_id: TabId) -> Option<TabRecord> {
        self.tabs.remove(&tab_id)
    }

    pub fn get(&self, tab_id: TabId) -> Option<&TabRecord> {
        self.tabs.get(&tab_id)
    }

    /// Is any tracked, non-incognito tab still on `host`?
    pub fn any_open_for(&self, host: &HostKey) -> bool {
        self.tabs
            .values()
            .any(|tab| !tab.incognito && tab.host.as_ref() == Some(host))
    }

    /// Rebuild from a full enumeration (startup reconciliation).
    pub fn replace_all(&mut self, snapshots: &[TabSnapshot]) {
        self.tabs.clear();
        for snapshot in snapshots {
            self.upsert(snapshot);
        }
    }

    pub fn ids(&self) -> Vec<TabId> {
        self.tabs.keys().copied().collect()
    }

    pub fn contains(&self, tab_id: TabId) -> bool {
        self.tabs.contains_key(&tab_id)
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_ignores_urlless_snapshots() {
        let mut tracker = TabTracker::new();
        tracker.upsert(&TabSnapshot::new(1, "https://reddit.com/r/rust"));
        tracker.upsert(&TabSnapshot {
            id: 1,
            url: None,
            incognito: false,
        });
        let record = tracker.get(1).unwrap();
        assert_eq!(record.url, "https://reddit.com/r/rust");
        assert_eq!(record.host.as_ref().unwrap().as_str(), "reddit.com");
    }

    #[test]
    fn non_web_urls_track_with_no_host() {
        let mut tracker = TabTracker::new();
        tracker.upsert(&TabSnapshot::new(2, "chrome://settings"));
        assert!(tracker.get(2).unwrap().host.is_none());
    }

    #[test]
    fn any_open_for_skips_incognito() {
        let mut tracker = TabTracker::new();
        tracker.upsert(&TabSnapshot {
            id: 3,
            url: Some("https://x.com/home".to_string()),
            incognito: true,
        });
        let host = crate::host::from_input("x.com").unwrap();
        assert!(!tracker.any_open_for(&host));

        tracker.upsert(&TabSnapshot::new(4, "https://www.x.com/explore"));
        assert!(tracker.any_open_for(&host));

        tracker.remove(4);
        assert!(!tracker.any_open_for(&host));
    }

    #[test]
    fn replace_all_rebuilds_from_scratch() {
        let mut tracker = TabTracker::new();
        tracker.upsert(&TabSnapshot::new(1, "https://a.com"));
        tracker.replace_all(&[
            TabSnapshot::new(2, "https://b.com"),
            TabSnapshot::new(3, "https://c.com"),
        ]);
        assert!(!tracker.contains(1));
        assert_eq!(tracker.len(), 2);
    }
}
