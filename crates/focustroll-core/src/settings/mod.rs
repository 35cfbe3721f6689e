//! Settings data model.
//!
//! This is the shape of the snapshot the engine consumes; it is owned by
//! whatever store the embedding shell provides (see [`store`]). Wire names
//! match the original extension payload (`blockMethod`, `lastMethod`,
//! `onDuty`, ...), so a shell can deserialize persisted settings directly.

pub mod actions;
pub mod cache;
pub mod store;

use serde::{Deserialize, Serialize};

use crate::host::{self, HostKey};
use crate::schedule::OnDutySchedule;

pub use actions::ActionEntry;
pub use cache::SettingsCache;
pub use store::{MemorySettingsStore, SettingsStore};

/// The intervention configured for a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockMethod {
    None,
    LogOut,
    HideFeed,
    MindfulTimer,
    Grayscale,
}

impl BlockMethod {
    /// Parse a wire-format method name; unknown names coerce to `None`, the
    /// same silent fallback the settings layer has always applied.
    pub fn from_wire(value: &str) -> Self {
        match value {
            "logOut" => Self::LogOut,
            "hideFeed" => Self::HideFeed,
            "mindfulTimer" => Self::MindfulTimer,
            "grayscale" => Self::Grayscale,
            _ => Self::None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// A watched site and its configured intervention.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub name: String,
    /// Canonical host key; wire name kept from the original payload.
    #[serde(rename = "url")]
    pub host: HostKey,
    pub block_method: BlockMethod,
    /// Last non-`none` method, so a toggle can restore the previous choice.
    #[serde(rename = "lastMethod")]
    pub last_method: BlockMethod,
    pub is_custom: bool,
}

impl Site {
    /// Create a custom site. A site created disabled still gets a sensible
    /// `last_method` for the first toggle-on.
    pub fn custom(name: impl Into<String>, host: HostKey, method: BlockMethod) -> Self {
        Self {
            name: name.into(),
            host,
            block_method: method,
            last_method: if method.is_none() {
                BlockMethod::LogOut
            } else {
                method
            },
            is_custom: true,
        }
    }

    /// Change the configured method, remembering the last non-`none` choice.
    pub fn set_method(&mut self, method: BlockMethod) {
        if !method.is_none() {
            self.last_method = method;
        }
        self.block_method = method;
    }

    /// Origin patterns for the permission probe.
    pub fn origin_patterns(&self) -> Vec<String> {
        host::origin_patterns(&self.host)
    }
}

/// Snapshot of everything the policy engine reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub sites: Vec<Site>,
    pub on_duty: OnDutySchedule,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sites: default_sites(),
            on_duty: OnDutySchedule::default(),
        }
    }
}

/// The built-in site catalog: everything starts disabled, with feed-first
/// defaults for the sites where hiding the feed is the usual choice.
fn default_sites() -> Vec<Site> {
    fn builtin(name: &str, host: &str, last_method: BlockMethod) -> Option<Site> {
        Some(Site {
            name: name.to_string(),
            host: host::from_input(host)?,
            block_method: BlockMethod::None,
            last_method,
            is_custom: false,
        })
    }
    [
        builtin("Facebook", "facebook.com", BlockMethod::LogOut),
        builtin("Instagram", "instagram.com", BlockMethod::LogOut),
        builtin("YouTube", "youtube.com", BlockMethod::HideFeed),
        builtin("TikTok", "tiktok.com", BlockMethod::HideFeed),
        builtin("Reddit", "reddit.com", BlockMethod::HideFeed),
        builtin("X (Twitter)", "x.com", BlockMethod::HideFeed),
        builtin("LinkedIn", "linkedin.com", BlockMethod::LogOut),
    ]
    .into_iter()
    .flatten()
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_method_names_coerce_to_none() {
        assert_eq!(BlockMethod::from_wire("grayscale"), BlockMethod::Grayscale);
        assert_eq!(BlockMethod::from_wire("blockHard"), BlockMethod::None);
        assert_eq!(BlockMethod::from_wire(""), BlockMethod::None);
    }

    #[test]
    fn set_method_tracks_last_non_none() {
        let host = crate::host::from_input("reddit.com").unwrap();
        let mut site = Site::custom("Reddit", host, BlockMethod::Grayscale);
        assert_eq!(site.last_method, BlockMethod::Grayscale);

        site.set_method(BlockMethod::None);
        assert_eq!(site.block_method, BlockMethod::None);
        assert_eq!(site.last_method, BlockMethod::Grayscale);

        site.set_method(BlockMethod::HideFeed);
        assert_eq!(site.last_method, BlockMethod::HideFeed);
    }

    #[test]
    fn disabled_custom_site_defaults_last_method_to_logout() {
        let host = crate::host::from_input("example.com").unwrap();
        let site = Site::custom("Example", host, BlockMethod::None);
        assert_eq!(site.last_method, BlockMethod::LogOut);
    }

    #[test]
    fn default_catalog_is_disabled_and_builtin() {
        let settings = Settings::default();
        assert_eq!(settings.sites.len(), 7);
        assert!(settings.sites.iter().all(|s| s.block_method.is_none()));
        assert!(settings.sites.iter().all(|s| !s.is_custom));
    }

    #[test]
    fn settings_serialize_with_original_wire_names() {
        let settings = Settings::default();
        let json = serde_json::to_string(&settings).unwrap();
        assert!(json.contains("\"blockMethod\":\"none\""));
        assert!(json.contains("\"lastMethod\""));
        assert!(json.contains("\"onDuty\""));
        assert!(json.contains("\"url\":\"facebook.com\""));
        let _decoded: Settings = serde_json::from_str(&json).unwrap();
    }
}
