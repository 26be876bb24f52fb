use tauri_plugin_autostart::AutoLaunchManager;

use crate::{DeckError, DeckResult};

pub(crate) const ENABLE_AUTOSTART_LABEL: &str = "Enable Autostart";
pub(crate) const DISABLE_AUTOSTART_LABEL: &str = "Disable Autostart";

/// OS login-item registration for the app.
pub(crate) trait LoginItem {
    fn login_item_enabled(&self) -> DeckResult<bool>;
    fn set_login_item_enabled(&self, enabled: bool) -> DeckResult<()>;
}

impl LoginItem for AutoLaunchManager {
    fn login_item_enabled(&self) -> DeckResult<bool> {
        self.is_enabled()
            .map_err(|error| DeckError::Autostart(error.to_string()))
    }

    fn set_login_item_enabled(&self, enabled: bool) -> DeckResult<()> {
        let result = if enabled { self.enable() } else { self.disable() };
        result.map_err(|error| DeckError::Autostart(error.to_string()))
    }
}

/// Flips the registration and returns the state read back from the OS.
pub(crate) fn toggle_login_item<L>(item: &L) -> DeckResult<bool>
where
    L: LoginItem + ?Sized,
{
    let enabled = item.login_item_enabled()?;
    item.set_login_item_enabled(!enabled)?;
    item.login_item_enabled()
}

pub(crate) fn autostart_label(enabled: bool) -> &'static str {
    if enabled {
        DISABLE_AUTOSTART_LABEL
    } else {
        ENABLE_AUTOSTART_LABEL
    }
}
