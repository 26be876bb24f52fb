use tauri::AppHandle;
use tauri_plugin_autostart::ManagerExt;

use crate::{
    append_desktop_log, append_shutdown_log, autostart, presentation::PresentationEvent,
    tray_actions, tray_labels, window_actions,
};

pub fn handle_tray_menu_event(app_handle: &AppHandle, menu_id: &str) {
    match tray_actions::action_from_menu_id(menu_id) {
        Some(tray_actions::TrayMenuAction::Show) => {
            window_actions::dispatch_presentation_event(
                app_handle,
                PresentationEvent::TrayShowRequested,
            );
        }
        Some(tray_actions::TrayMenuAction::ToggleAutostart) => {
            match autostart::toggle_login_item(&*app_handle.autolaunch()) {
                Ok(enabled) => append_desktop_log(&format!(
                    "tray toggled autostart: {}",
                    if enabled { "enabled" } else { "disabled" }
                )),
                Err(error) => append_desktop_log(&format!("failed to toggle autostart: {error}")),
            }
            tray_labels::update_autostart_label(app_handle, append_desktop_log);
        }
        Some(tray_actions::TrayMenuAction::Exit) => {
            append_shutdown_log("tray exit requested");
            window_actions::request_quit(app_handle);
        }
        None => append_desktop_log(&format!("unknown tray menu id: {menu_id}")),
    }
}
