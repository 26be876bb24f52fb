use std::{env, path::PathBuf};

use url::Url;

use crate::{
    DeckError, DeckResult, BACKEND_AUTO_START_ENV, BACKEND_CMD_ENV, BACKEND_DIR_ENV,
    BACKEND_URL_ENV, DEFAULT_BACKEND_URL, SHOW_LOG_WINDOW_ENV,
};

#[derive(Debug, Clone)]
pub(crate) struct DeckConfig {
    pub(crate) backend_url: Url,
    pub(crate) custom_backend_cmd: Option<String>,
    pub(crate) backend_dir: Option<PathBuf>,
    pub(crate) auto_start_backend: bool,
    pub(crate) show_log_window: bool,
}

impl DeckConfig {
    pub(crate) fn from_env() -> DeckResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> DeckResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend_url = lookup(BACKEND_URL_ENV)
            .map(|raw| normalize_backend_url(&raw, DEFAULT_BACKEND_URL))
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());

        let backend_url = Url::parse(&backend_url)
            .map_err(|error| DeckError::Config(format!("backend url {backend_url}: {error}")))?;

        Ok(Self {
            backend_url,
            custom_backend_cmd: lookup(BACKEND_CMD_ENV)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty()),
            backend_dir: lookup(BACKEND_DIR_ENV)
                .map(|value| PathBuf::from(value.trim()))
                .filter(|path| !path.as_os_str().is_empty()),
            auto_start_backend: flag_enabled(lookup(BACKEND_AUTO_START_ENV)),
            show_log_window: flag_enabled(lookup(SHOW_LOG_WINDOW_ENV)),
        })
    }
}

fn flag_enabled(raw: Option<String>) -> bool {
    raw.map(|value| value.trim() != "0").unwrap_or(true)
}

pub(crate) fn normalize_backend_url(raw: &str, default_backend_url: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return default_backend_url.to_string();
    }

    match Url::parse(trimmed) {
        Ok(mut parsed) if matches!(parsed.scheme(), "http" | "https") => {
            if !parsed.path().ends_with('/') {
                let path = format!("{}/", parsed.path());
                parsed.set_path(&path);
            }
            parsed.to_string()
        }
        _ => default_backend_url.to_string(),
    }
}
