use std::sync::Arc;

use tauri::{AppHandle, Manager, Webview, WebviewUrl, WebviewWindowBuilder};

use crate::{
    backend_supervisor::DiagnosticSink, diagnostic_log::DiagnosticBuffer,
    logging::BACKEND_LOG_TARGET, DeckContext, LOG_WINDOW_LABEL,
};

const LOG_WINDOW_TITLE: &str = "CheapDeck Backend Logs";

pub fn open_log_window(app_handle: &AppHandle) -> Result<(), String> {
    if app_handle.get_webview_window(LOG_WINDOW_LABEL).is_some() {
        return Ok(());
    }

    WebviewWindowBuilder::new(app_handle, LOG_WINDOW_LABEL, WebviewUrl::App("logs.html".into()))
        .title(LOG_WINDOW_TITLE)
        .inner_size(600.0, 300.0)
        .build()
        .map(|_| ())
        .map_err(|error| format!("Failed to create log window: {error}"))
}

/// Every supervisor line goes to the log file, the replay buffer and, when
/// it is open, the log window.
pub(crate) fn diagnostic_sink(
    app_handle: AppHandle,
    buffer: Arc<DiagnosticBuffer>,
) -> DiagnosticSink {
    Arc::new(move |line: &str| {
        log::info!(target: BACKEND_LOG_TARGET, "{line}");
        let stamped = buffer.push(line);
        append_log_line(&app_handle, &stamped);
    })
}

fn append_log_line(app_handle: &AppHandle, line: &str) {
    let Some(window) = app_handle.get_webview_window(LOG_WINDOW_LABEL) else {
        return;
    };
    let Ok(encoded) = serde_json::to_string(line) else {
        return;
    };
    // Not logged on failure: the sink would feed on its own errors.
    let _ = window.eval(&format!("window.appendLog && window.appendLog({encoded});"));
}

/// Replays the buffered lines after the log page (re)loaded.
pub fn replay_log(webview: &Webview) {
    let Some(context) = webview.app_handle().try_state::<DeckContext>() else {
        return;
    };
    let lines = context.diagnostics.snapshot();
    match serde_json::to_string(&lines) {
        Ok(encoded) => {
            let script = format!("window.replaceLog && window.replaceLog({encoded});");
            if let Err(error) = webview.eval(&script) {
                log::warn!("failed to replay backend log: {error}");
            }
        }
        Err(error) => log::warn!("failed to encode backend log: {error}"),
    }
}
