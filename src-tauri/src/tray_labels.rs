use tauri::{menu::MenuItem, AppHandle, Manager};
use tauri_plugin_autostart::ManagerExt;

use crate::{autostart, autostart::LoginItem, tray_actions, TrayMenuState};

pub(crate) const TRAY_SHOW_LABEL: &str = "Show";
pub(crate) const TRAY_EXIT_LABEL: &str = "Exit";

fn set_menu_text_safe<F>(item: &MenuItem<tauri::Wry>, text: &str, item_name: &str, log: F)
where
    F: Fn(&str),
{
    if let Err(error) = item.set_text(text) {
        log(&format!(
            "failed to update tray menu text for {}: {}",
            item_name, error
        ));
    }
}

/// Reads the login-item state, treating a failed read as "disabled".
pub fn read_autostart_enabled<F>(app_handle: &AppHandle, log: F) -> bool
where
    F: Fn(&str),
{
    match app_handle.autolaunch().login_item_enabled() {
        Ok(enabled) => enabled,
        Err(error) => {
            log(&format!("failed to read autostart state: {error}"));
            false
        }
    }
}

pub fn update_autostart_label<F>(app_handle: &AppHandle, log: F)
where
    F: Fn(&str),
{
    let Some(tray_state) = app_handle.try_state::<TrayMenuState>() else {
        return;
    };

    let enabled = read_autostart_enabled(app_handle, &log);
    set_menu_text_safe(
        &tray_state.autostart_item,
        autostart::autostart_label(enabled),
        tray_actions::TRAY_MENU_TOGGLE_AUTOSTART,
        &log,
    );
}
