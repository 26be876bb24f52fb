use tauri::{
    menu::{Menu, MenuItem, PredefinedMenuItem},
    tray::{MouseButton, MouseButtonState, TrayIconBuilder, TrayIconEvent},
    AppHandle, Manager,
};

use crate::{
    append_desktop_log, autostart, presentation::PresentationEvent, tray_actions, tray_labels,
    tray_menu_handler, window_actions, TrayMenuState, APP_DISPLAY_NAME, TRAY_ID,
};

pub fn setup_tray(app_handle: &AppHandle) -> Result<(), String> {
    let autostart_enabled = tray_labels::read_autostart_enabled(app_handle, append_desktop_log);

    let show_item = MenuItem::with_id(
        app_handle,
        tray_actions::TRAY_MENU_SHOW,
        tray_labels::TRAY_SHOW_LABEL,
        true,
        None::<&str>,
    )
    .map_err(|error| format!("Failed to create tray show menu item: {error}"))?;
    let autostart_item = MenuItem::with_id(
        app_handle,
        tray_actions::TRAY_MENU_TOGGLE_AUTOSTART,
        autostart::autostart_label(autostart_enabled),
        true,
        None::<&str>,
    )
    .map_err(|error| format!("Failed to create tray autostart menu item: {error}"))?;
    let exit_item = MenuItem::with_id(
        app_handle,
        tray_actions::TRAY_MENU_EXIT,
        tray_labels::TRAY_EXIT_LABEL,
        true,
        None::<&str>,
    )
    .map_err(|error| format!("Failed to create tray exit menu item: {error}"))?;
    let separator = PredefinedMenuItem::separator(app_handle)
        .map_err(|error| format!("Failed to create tray separator menu item: {error}"))?;

    let menu = Menu::with_items(app_handle, &[&show_item, &autostart_item, &separator, &exit_item])
        .map_err(|error| format!("Failed to build tray menu: {error}"))?;

    if !app_handle.manage(TrayMenuState {
        autostart_item: autostart_item.clone(),
    }) {
        append_desktop_log("tray menu state already exists, skipping manage");
    }

    let tray_builder = TrayIconBuilder::with_id(TRAY_ID)
        .menu(&menu)
        .tooltip(APP_DISPLAY_NAME)
        .icon(tauri::include_image!("./icons/tray.png"))
        .show_menu_on_left_click(false)
        .on_menu_event(|app, event| {
            tray_menu_handler::handle_tray_menu_event(app, event.id().as_ref())
        })
        .on_tray_icon_event(|tray, event| {
            if let TrayIconEvent::Click {
                button,
                button_state: MouseButtonState::Up,
                ..
            } = event
            {
                tray_labels::update_autostart_label(tray.app_handle(), append_desktop_log);
                if button == MouseButton::Left {
                    window_actions::dispatch_presentation_event(
                        tray.app_handle(),
                        PresentationEvent::TrayShowRequested,
                    );
                }
            }
        });

    #[cfg(target_os = "macos")]
    let tray_builder = tray_builder.icon_as_template(true);

    tray_builder
        .build(app_handle)
        .map_err(|error| format!("Failed to create tray icon: {error}"))?;

    Ok(())
}
