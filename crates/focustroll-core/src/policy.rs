//! Site policy lookup.
//!
//! A host that is absent from the site list means "no intervention", which
//! is a different state from a listed site whose method is `none` (the
//! latter stays in the watch list and keeps its `lastMethod`). The list is
//! small, so a linear scan is fine.

use chrono::NaiveDateTime;

use crate::host::HostKey;
use crate::settings::{BlockMethod, Settings, Site};

/// The configured site entry for `host`, if any.
pub fn site_for<'a>(settings: &'a Settings, host: &HostKey) -> Option<&'a Site> {
    settings.sites.iter().find(|site| site.host == *host)
}

/// The intervention that currently applies to `host`, or `None` when off
/// duty, the host is not configured, or its method is `none`.
pub fn active_method(settings: &Settings, host: &HostKey, now: NaiveDateTime) -> Option<BlockMethod> {
    if !settings.on_duty.is_active_at(now) {
        return None;
    }
    let site = site_for(settings, host)?;
    if site.block_method.is_none() {
        return None;
    }
    Some(site.block_method)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::host;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 8, 3)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn settings_with(host: &str, method: BlockMethod) -> Settings {
        let mut settings = Settings::default();
        settings.sites.push(Site::custom(
            host,
            crate::host::from_input(host).unwrap(),
            method,
        ));
        settings
    }

    #[test]
    fn lookup_is_by_normalized_host() {
        let settings = settings_with("example.com", BlockMethod::Grayscale);
        let key = host::from_url("https://www.example.com/feed").unwrap();
        assert!(site_for(&settings, &key).is_some());
    }

    #[test]
    fn absent_site_yields_no_method() {
        let settings = Settings::default();
        let key = host::from_input("unlisted.com").unwrap();
        assert_eq!(active_method(&settings, &key, noon()), None);
    }

    #[test]
    fn site_with_method_none_yields_no_method_but_is_listed() {
        let settings = settings_with("example.com", BlockMethod::None);
        let key = host::from_input("example.com").unwrap();
        assert!(site_for(&settings, &key).is_some());
        assert_eq!(active_method(&settings, &key, noon()), None);
    }

    #[test]
    fn off_duty_suppresses_configured_method() {
        let mut settings = settings_with("example.com", BlockMethod::LogOut);
        settings.on_duty.enabled = false;
        let key = host::from_input("example.com").unwrap();
        assert_eq!(active_method(&settings, &key, noon()), None);

        settings.on_duty.enabled = true;
        assert_eq!(
            active_method(&settings, &key, noon()),
            Some(BlockMethod::LogOut)
        );
    }
}
