use tauri::{AppHandle, ExitRequestApi, Manager};

use crate::{
    append_shutdown_log, presentation::PresentationEvent, window_actions, DeckContext,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitRequestDecision {
    KeepRunningInTray,
    ProceedWithQuit,
}

/// `code` is `None` when the last window closed and `Some` when something
/// called `exit` explicitly.
fn decide_exit_request(code: Option<i32>, quitting: bool) -> ExitRequestDecision {
    if quitting || code.is_some() {
        ExitRequestDecision::ProceedWithQuit
    } else {
        ExitRequestDecision::KeepRunningInTray
    }
}

pub fn handle_exit_requested(app_handle: &AppHandle, code: Option<i32>, api: &ExitRequestApi) {
    let quitting = app_handle
        .try_state::<DeckContext>()
        .map(|context| context.is_quitting())
        .unwrap_or(true);

    match decide_exit_request(code, quitting) {
        ExitRequestDecision::KeepRunningInTray => {
            api.prevent_exit();
            append_shutdown_log("all windows closed, staying in the tray");
        }
        ExitRequestDecision::ProceedWithQuit => {
            append_shutdown_log(&format!("exit requested (code {code:?})"));
            window_actions::dispatch_presentation_event(
                app_handle,
                PresentationEvent::PlatformQuit,
            );
        }
    }
}

pub fn handle_exit_event(app_handle: &AppHandle) {
    if let Some(context) = app_handle.try_state::<DeckContext>() {
        context.supervisor.stop();
    }
    append_shutdown_log("desktop process exited");
}
