//! Detects whether the backend is talking to real CheapDeck hardware.
//!
//! The backend answers `/api/settings` even without a paired device; it then
//! reports the factory defaults. A snapshot that differs from those defaults
//! in any device-reported field means a device has pushed its own settings.
//! A device the user configured back to exactly the defaults is
//! indistinguishable from "no device".

use std::{future::Future, time::Duration};

use serde::{Deserialize, Serialize};

use crate::DeckResult;

pub const FACTORY_TIMEOUT: u32 = 900;
pub const FACTORY_BACKGROUND: &str = "0a1e46";
pub const FACTORY_ACTIVE: &str = "b4dcfa";
pub const FACTORY_COLORS: [&str; 6] = ["4682b4", "6495ed", "48d1cc", "5f9ea0", "ff6347", "8a2be2"];
pub const FACTORY_LAYOUT: u32 = 0;

/// Settings record served by `GET /api/settings`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub timeout: u32,
    pub background: String,
    pub active: String,
    pub colors: Vec<String>,
    #[serde(default)]
    pub layout: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_timeout: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_enabled: Option<bool>,
}

impl DeviceSnapshot {
    pub fn factory_default() -> Self {
        Self {
            timeout: FACTORY_TIMEOUT,
            background: FACTORY_BACKGROUND.to_string(),
            active: FACTORY_ACTIVE.to_string(),
            colors: FACTORY_COLORS.iter().map(|color| color.to_string()).collect(),
            layout: FACTORY_LAYOUT,
            info_timeout: None,
            info_enabled: None,
        }
    }

    // info_timeout / info_enabled are filled in by the backend itself, so
    // they say nothing about the device.
    pub fn is_factory_default(&self) -> bool {
        self.timeout == FACTORY_TIMEOUT
            && self.background == FACTORY_BACKGROUND
            && self.active == FACTORY_ACTIVE
            && self.colors.iter().map(String::as_str).eq(FACTORY_COLORS)
            && self.layout == FACTORY_LAYOUT
    }
}

pub(crate) trait SettingsSource: Send + Sync {
    fn fetch_settings(&self) -> impl Future<Output = DeckResult<DeviceSnapshot>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DeviceFound {
    pub(crate) snapshot: DeviceSnapshot,
    pub(crate) polls: u32,
}

/// Polls until a non-default snapshot shows up. Fetch and parse errors count
/// as "no device". There is no overall timeout; `cancelled` is checked
/// before every fetch and ends the loop with `None`.
pub(crate) async fn poll_until_device_found<S, C>(
    source: &S,
    interval: Duration,
    cancelled: C,
) -> Option<DeviceFound>
where
    S: SettingsSource,
    C: Fn() -> bool,
{
    let mut polls = 0;
    loop {
        if cancelled() {
            log::info!("device discovery cancelled after {polls} poll(s)");
            return None;
        }

        polls += 1;
        match source.fetch_settings().await {
            Ok(snapshot) if !snapshot.is_factory_default() => {
                log::info!("CheapDeck device detected on poll {polls}");
                return Some(DeviceFound { snapshot, polls });
            }
            Ok(_) => log::debug!("settings still at factory defaults (poll {polls})"),
            Err(error) => log::debug!("settings fetch failed (poll {polls}): {error}"),
        }

        tokio::time::sleep(interval).await;
    }
}
