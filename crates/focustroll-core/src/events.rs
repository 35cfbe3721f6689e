//! Browser events consumed by the policy engine.
//!
//! The extension shell translates raw browser callbacks (tab lifecycle,
//! storage change notifications, messages posted by injected overlay
//! scripts) into one tagged union. The engine is driven exclusively through
//! [`EngineEvent`], which keeps the whole decision path unit-testable
//! without a browser.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Browser-assigned tab identifier.
pub type TabId = u64;

/// What the browser reports about a tab at event time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabSnapshot {
    pub id: TabId,
    /// Absent while the tab has not committed a URL yet.
    pub url: Option<String>,
    pub incognito: bool,
}

impl TabSnapshot {
    pub fn new(id: TabId, url: impl Into<String>) -> Self {
        Self {
            id,
            url: Some(url.into()),
            incognito: false,
        }
    }
}

/// Every input the engine reacts to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EngineEvent {
    TabCreated {
        tab: TabSnapshot,
    },
    /// Fired for both navigation-started and navigation-finished updates,
    /// always carrying the freshest snapshot. The dispatcher is idempotent,
    /// so applying twice per navigation is free and paints as early as
    /// possible while still correcting after redirects.
    TabUpdated {
        tab: TabSnapshot,
    },
    TabActivated {
        tab_id: TabId,
    },
    TabRemoved {
        tab_id: TabId,
        /// True when the tab went away because its whole window closed.
        window_closing: bool,
    },
    SettingsChanged,
    Overlay {
        message: OverlayMessage,
    },
}

/// Messages posted back by an injected mindful overlay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum OverlayMessage {
    /// The overlay for `instance_id` finished, either by its countdown
    /// elapsing or by the user dismissing it early.
    MindfulFinished {
        tab_id: TabId,
        instance_id: Uuid,
        reason: FinishReason,
    },
    /// The user asked, from within the overlay, for the tab to be closed.
    CloseTabRequested {
        tab_id: TabId,
        instance_id: Uuid,
    },
}

/// Why a mindful overlay instance ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinishReason {
    /// The countdown ran to zero.
    Complete,
    /// The user dismissed the overlay before the countdown finished.
    Dismissed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_round_trip_as_tagged_json() {
        let event = EngineEvent::TabRemoved {
            tab_id: 7,
            window_closing: false,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"TabRemoved\""));
        let _decoded: EngineEvent = serde_json::from_str(&json).unwrap();
    }

    #[test]
    fn overlay_message_carries_instance_id() {
        let id = Uuid::new_v4();
        let message = OverlayMessage::MindfulFinished {
            tab_id: 3,
            instance_id: id,
            reason: FinishReason::Complete,
        };
        let json = serde_json::to_string(&message).unwrap();
        assert!(json.contains(&id.to_string()));
        assert!(json.contains("\"complete\""));
    }
}
