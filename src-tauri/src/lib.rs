mod app_constants;
mod app_runtime;
mod app_types;
mod autostart;
mod backend_config;
mod backend_supervisor;
pub mod device_discovery;
mod diagnostic_log;
mod error;
mod exit_events;
mod launch_plan;
mod log_window;
mod logging;
mod presentation;
mod process_control;
mod readiness;
pub mod settings_gateway;
mod splash;
mod startup_task;
mod tray_actions;
mod tray_labels;
mod tray_menu_handler;
mod tray_setup;
mod ui_dispatch;
mod window_actions;

pub(crate) use app_constants::*;
pub(crate) use app_types::{AtomicFlagGuard, DeckContext, TrayMenuState};
pub use error::{DeckError, DeckResult};
pub(crate) use logging::{append_desktop_log, append_shutdown_log, append_startup_log};

pub fn run() {
    app_runtime::run();
}
