use log::LevelFilter;
use tauri::{plugin::TauriPlugin, Wry};
use tauri_plugin_log::{Target, TargetKind};

pub(crate) const DESKTOP_LOG_TARGET: &str = "cheapdeck::desktop";
pub(crate) const STARTUP_LOG_TARGET: &str = "cheapdeck::startup";
pub(crate) const SHUTDOWN_LOG_TARGET: &str = "cheapdeck::shutdown";
pub(crate) const BACKEND_LOG_TARGET: &str = "cheapdeck::backend";
const DESKTOP_LOG_FILE_NAME: &str = "desktop";

pub(crate) fn append_desktop_log(message: &str) {
    log::info!(target: DESKTOP_LOG_TARGET, "{message}");
}

pub(crate) fn append_startup_log(message: &str) {
    log::info!(target: STARTUP_LOG_TARGET, "{message}");
}

pub(crate) fn append_shutdown_log(message: &str) {
    log::info!(target: SHUTDOWN_LOG_TARGET, "{message}");
}

pub(crate) fn log_plugin() -> TauriPlugin<Wry> {
    tauri_plugin_log::Builder::new()
        .level(if cfg!(debug_assertions) {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .level_for("reqwest", LevelFilter::Warn)
        .level_for("hyper", LevelFilter::Warn)
        .level_for("hyper_util", LevelFilter::Warn)
        .targets([
            Target::new(TargetKind::Stdout),
            Target::new(TargetKind::LogDir {
                file_name: Some(DESKTOP_LOG_FILE_NAME.to_string()),
            }),
        ])
        .build()
}
