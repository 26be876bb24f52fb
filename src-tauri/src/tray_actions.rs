pub const TRAY_MENU_SHOW: &str = "tray_show";
pub const TRAY_MENU_TOGGLE_AUTOSTART: &str = "tray_toggle_autostart";
pub const TRAY_MENU_EXIT: &str = "tray_exit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayMenuAction {
    Show,
    ToggleAutostart,
    Exit,
}

pub fn action_from_menu_id(menu_id: &str) -> Option<TrayMenuAction> {
    match menu_id {
        TRAY_MENU_SHOW => Some(TrayMenuAction::Show),
        TRAY_MENU_TOGGLE_AUTOSTART => Some(TrayMenuAction::ToggleAutostart),
        TRAY_MENU_EXIT => Some(TrayMenuAction::Exit),
        _ => None,
    }
}
