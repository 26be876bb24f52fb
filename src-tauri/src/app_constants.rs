use std::time::Duration;

pub(crate) const DEFAULT_BACKEND_URL: &str = "http://localhost:22778/";
pub(crate) const BACKEND_URL_ENV: &str = "CHEAPDECK_BACKEND_URL";
pub(crate) const BACKEND_CMD_ENV: &str = "CHEAPDECK_BACKEND_CMD";
pub(crate) const BACKEND_DIR_ENV: &str = "CHEAPDECK_BACKEND_DIR";
pub(crate) const BACKEND_AUTO_START_ENV: &str = "CHEAPDECK_BACKEND_AUTO_START";
pub(crate) const SHOW_LOG_WINDOW_ENV: &str = "CHEAPDECK_SHOW_LOG_WINDOW";
pub(crate) const PORTABLE_EXECUTABLE_DIR_ENV: &str = "PORTABLE_EXECUTABLE_DIR";

pub(crate) const BACKEND_ENTRYPOINT: &str = "api.py";
pub(crate) const BACKEND_DIST_DIR: &str = "dist";
#[cfg(target_os = "windows")]
pub(crate) const BACKEND_EXECUTABLE: &str = "api.exe";
#[cfg(not(target_os = "windows"))]
pub(crate) const BACKEND_EXECUTABLE: &str = "api";
pub(crate) const PYTHON_COMMANDS: [&str; 3] = ["python", "python3", "py"];

pub(crate) const MAIN_WINDOW_LABEL: &str = "main";
pub(crate) const SPLASH_WINDOW_LABEL: &str = "splash";
pub(crate) const LOG_WINDOW_LABEL: &str = "logs";
pub(crate) const TRAY_ID: &str = "cheapdeck-tray";
pub(crate) const APP_DISPLAY_NAME: &str = "CheapDeck";

pub(crate) const SPAWN_RETRY_DELAY: Duration = Duration::from_millis(1000);
pub(crate) const CHILD_EXIT_POLL_INTERVAL: Duration = Duration::from_millis(250);
pub(crate) const CHILD_STOP_GRACE: Duration = Duration::from_millis(3000);
pub(crate) const CHILD_STOP_POLL_INTERVAL: Duration = Duration::from_millis(50);

pub(crate) const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_millis(1000);
pub(crate) const READINESS_MAX_ATTEMPTS: u32 = 40;
pub(crate) const READINESS_INTERVAL: Duration = Duration::from_millis(250);
pub(crate) const DISCOVERY_INTERVAL: Duration = Duration::from_millis(2000);

pub(crate) const DIAGNOSTIC_BUFFER_CAPACITY: usize = 500;
