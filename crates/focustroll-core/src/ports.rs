//! Browser capability boundaries.
//!
//! Everything the engine cannot decide on its own lives behind one of these
//! traits: permission state, script injection, cookie/storage eviction, and
//! the tab surface itself. The shell implements them over the real browser
//! APIs; tests inject recording doubles. All calls are failure-tolerant --
//! the engine logs a rejection and degrades to "no intervention" rather
//! than letting an event handler die.

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::error::PortError;
use crate::events::{TabId, TabSnapshot};
use crate::host::HostKey;

/// Parameters for one mindful-pause overlay injection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MindfulParams {
    /// Identifies this overlay instance; messages carrying a different id
    /// are stale and ignored.
    pub instance_id: Uuid,
    pub delay_ms: u64,
    pub prompt: String,
}

/// Host-permission state. The engine only ever asks; it never requests
/// permissions on its own.
#[async_trait]
pub trait PermissionProbe: Send + Sync {
    async fn has_permission(&self, origin_patterns: &[String]) -> Result<bool, PortError>;
}

/// Clears authentication cookies and page storage for a host. Which
/// cookies count as authentication-related is this collaborator's business.
#[async_trait]
pub trait SessionEvictor: Send + Sync {
    async fn evict_session(&self, host: &HostKey) -> Result<(), PortError>;
}

/// Paints and clears visual interventions on a tab. Fire-and-forget script
/// injections: a failure is logged by the caller, never retried.
#[async_trait]
pub trait OverlayPort: Send + Sync {
    async fn apply_grayscale(&self, tab: TabId, opacity: f64) -> Result<(), PortError>;
    async fn clear_grayscale(&self, tab: TabId) -> Result<(), PortError>;
    async fn show_mindful_overlay(&self, tab: TabId, params: &MindfulParams)
        -> Result<(), PortError>;
    async fn clear_mindful_overlay(&self, tab: TabId) -> Result<(), PortError>;
}

/// The tab surface: enumeration for reconciliation and the logout re-check,
/// plus closing a tab on request from an overlay.
#[async_trait]
pub trait TabHost: Send + Sync {
    async fn query_all_tabs(&self) -> Result<Vec<TabSnapshot>, PortError>;
    async fn close_tab(&self, tab: TabId) -> Result<(), PortError>;
}
