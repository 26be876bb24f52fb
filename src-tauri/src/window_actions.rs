use std::sync::Arc;

use tauri::{AppHandle, Manager, WebviewUrl, WebviewWindowBuilder};
use url::Url;

use crate::{
    append_desktop_log, append_shutdown_log,
    presentation::{PresentationEffect, PresentationEvent},
    ui_dispatch, DeckContext, APP_DISPLAY_NAME, MAIN_WINDOW_LABEL, SPLASH_WINDOW_LABEL,
};

/// Window operations the startup lifecycle drives.
pub(crate) trait ShellSurfaces: Send + Sync {
    fn show_splash(&self);
    fn set_splash_text(&self, text: &str);
    fn close_splash(&self);
    fn open_main_window(&self, url: &Url);
    fn show_main_window(&self);
    fn hide_main_window(&self);
}

/// Carries out the window-level effects. Effects that concern the backend
/// process or the app itself are left to the caller.
pub(crate) fn apply_surface_effects<S>(
    surfaces: &S,
    effects: &[PresentationEffect],
    backend_url: &Url,
) where
    S: ShellSurfaces + ?Sized,
{
    for effect in effects {
        match effect {
            PresentationEffect::CloseSplash => surfaces.close_splash(),
            PresentationEffect::OpenMainWindow => surfaces.open_main_window(backend_url),
            PresentationEffect::ShowMainWindow => surfaces.show_main_window(),
            PresentationEffect::HideMainWindow => surfaces.hide_main_window(),
            PresentationEffect::StartDiscovery
            | PresentationEffect::PreventClose
            | PresentationEffect::StopBackend
            | PresentationEffect::ExitApp => {}
        }
    }
}

pub(crate) struct TauriSurfaces {
    app_handle: AppHandle,
}

impl TauriSurfaces {
    pub(crate) fn new(app_handle: AppHandle) -> Self {
        Self { app_handle }
    }

    fn dispatch<F>(&self, task_name: &'static str, task: F)
    where
        F: FnOnce(&AppHandle) + Send + 'static,
    {
        if let Err(error) =
            ui_dispatch::run_on_main_thread_dispatch(&self.app_handle, task_name, task)
        {
            append_desktop_log(&error);
        }
    }
}

impl ShellSurfaces for TauriSurfaces {
    fn show_splash(&self) {
        self.dispatch("show splash window", |app_handle| {
            if let Err(error) = build_splash_window(app_handle) {
                append_desktop_log(&error);
            }
        });
    }

    fn set_splash_text(&self, text: &str) {
        let script = match serde_json::to_string(text) {
            Ok(encoded) => format!("window.setSplashText && window.setSplashText({encoded});"),
            Err(error) => {
                append_desktop_log(&format!("failed to encode splash text: {error}"));
                return;
            }
        };
        self.dispatch("update splash text", move |app_handle| {
            let Some(splash) = app_handle.get_webview_window(SPLASH_WINDOW_LABEL) else {
                return;
            };
            if let Err(error) = splash.eval(&script) {
                append_desktop_log(&format!("failed to update splash text: {error}"));
            }
        });
    }

    fn close_splash(&self) {
        self.dispatch("close splash window", |app_handle| {
            if let Some(splash) = app_handle.get_webview_window(SPLASH_WINDOW_LABEL) {
                if let Err(error) = splash.close() {
                    append_desktop_log(&format!("failed to close splash window: {error}"));
                }
            }
        });
    }

    fn open_main_window(&self, url: &Url) {
        let url = url.clone();
        self.dispatch("open main window", move |app_handle| {
            if let Err(error) = build_main_window(app_handle, url) {
                append_desktop_log(&error);
            }
        });
    }

    fn show_main_window(&self) {
        self.dispatch("show main window", |app_handle| {
            show_main_window(app_handle, append_desktop_log)
        });
    }

    fn hide_main_window(&self) {
        self.dispatch("hide main window", |app_handle| {
            hide_main_window(app_handle, append_desktop_log)
        });
    }
}

fn build_splash_window(app_handle: &AppHandle) -> Result<(), String> {
    if app_handle.get_webview_window(SPLASH_WINDOW_LABEL).is_some() {
        return Ok(());
    }

    WebviewWindowBuilder::new(
        app_handle,
        SPLASH_WINDOW_LABEL,
        WebviewUrl::App("splash.html".into()),
    )
    .title(APP_DISPLAY_NAME)
    .inner_size(400.0, 140.0)
    .decorations(false)
    .always_on_top(true)
    .resizable(false)
    .skip_taskbar(true)
    .center()
    .build()
    .map(|_| ())
    .map_err(|error| format!("Failed to create splash window: {error}"))
}

fn build_main_window(app_handle: &AppHandle, url: Url) -> Result<(), String> {
    if app_handle.get_webview_window(MAIN_WINDOW_LABEL).is_some() {
        append_desktop_log("main window already exists, showing it instead");
        show_main_window(app_handle, append_desktop_log);
        return Ok(());
    }

    append_desktop_log(&format!("opening main window on {url}"));
    let window =
        WebviewWindowBuilder::new(app_handle, MAIN_WINDOW_LABEL, WebviewUrl::External(url))
            .title(APP_DISPLAY_NAME)
            .inner_size(800.0, 600.0)
            .center()
            .build()
            .map_err(|error| format!("Failed to create main window: {error}"))?;
    if let Err(error) = window.set_focus() {
        append_desktop_log(&format!("failed to focus main window: {error}"));
    }
    Ok(())
}

pub fn show_main_window<F>(app_handle: &AppHandle, log: F)
where
    F: Fn(&str),
{
    let Some(window) = app_handle.get_webview_window(MAIN_WINDOW_LABEL) else {
        log("show_main_window skipped: main window not created yet");
        return;
    };

    if let Err(error) = window.set_skip_taskbar(false) {
        log(&format!("failed to restore main window to taskbar: {error}"));
    }
    if let Err(error) = window.unminimize() {
        log(&format!("failed to unminimize main window: {error}"));
    }
    if let Err(error) = window.show() {
        log(&format!("failed to show main window: {error}"));
    }
    if let Err(error) = window.set_focus() {
        log(&format!("failed to focus main window: {error}"));
    }
}

pub fn hide_main_window<F>(app_handle: &AppHandle, log: F)
where
    F: Fn(&str),
{
    let Some(window) = app_handle.get_webview_window(MAIN_WINDOW_LABEL) else {
        log("hide_main_window skipped: main window not found");
        return;
    };

    if let Err(error) = window.hide() {
        log(&format!("failed to hide main window: {error}"));
    }
    if let Err(error) = window.set_skip_taskbar(true) {
        log(&format!("failed to remove main window from taskbar: {error}"));
    }
}

/// Feeds `event` through the shared state machine and carries out every
/// resulting effect, including stopping the backend and exiting.
/// `PreventClose` is returned for the close interceptor to act on.
///
/// A user quit stops the backend on the blocking pool and exits once the
/// child is gone, so the event loop stays live through the grace period.
pub(crate) fn dispatch_presentation_event(
    app_handle: &AppHandle,
    event: PresentationEvent,
) -> Vec<PresentationEffect> {
    let Some(context) = app_handle.try_state::<DeckContext>() else {
        append_desktop_log(&format!("{event:?} ignored: app context not ready"));
        return Vec::new();
    };

    let effects = context.dispatch(event);
    log::debug!(
        "{event:?} -> {effects:?}, now {:?}",
        context.presentation_state()
    );
    apply_surface_effects(
        &TauriSurfaces::new(app_handle.clone()),
        &effects,
        &context.config.backend_url,
    );

    let stop_backend = effects.contains(&PresentationEffect::StopBackend);
    let exit_app = effects.contains(&PresentationEffect::ExitApp);
    if stop_backend {
        append_shutdown_log(&format!("{event:?}: stopping backend"));
    }
    match (stop_backend, exit_app) {
        (true, true) => {
            let supervisor = Arc::clone(&context.supervisor);
            let app_handle = app_handle.clone();
            tauri::async_runtime::spawn(async move {
                supervisor.stop_off_thread().await;
                append_shutdown_log("exiting desktop process");
                app_handle.exit(0);
            });
        }
        // The platform is already tearing the app down; this blocks the
        // event loop for at most the stop grace period.
        (true, false) => context.supervisor.stop(),
        (false, true) => {
            append_shutdown_log("exiting desktop process");
            app_handle.exit(0);
        }
        (false, false) => {}
    }
    effects
}

pub(crate) fn request_quit(app_handle: &AppHandle) {
    dispatch_presentation_event(app_handle, PresentationEvent::QuitRequested);
}

#[cfg(test)]
pub(crate) mod test_surfaces {
    use std::sync::Mutex;

    use url::Url;

    use super::ShellSurfaces;

    /// Records every surface call as a short string.
    #[derive(Default)]
    pub(crate) struct RecordingSurfaces {
        calls: Mutex<Vec<String>>,
    }

    impl RecordingSurfaces {
        fn record(&self, call: String) {
            self.calls.lock().expect("calls lock").push(call);
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().expect("calls lock").clone()
        }

        pub(crate) fn count(&self, prefix: &str) -> usize {
            self.calls()
                .iter()
                .filter(|call| call.starts_with(prefix))
                .count()
        }
    }

    impl ShellSurfaces for RecordingSurfaces {
        fn show_splash(&self) {
            self.record("show_splash".to_string());
        }
        fn set_splash_text(&self, text: &str) {
            self.record(format!("splash:{text}"));
        }
        fn close_splash(&self) {
            self.record("close_splash".to_string());
        }
        fn open_main_window(&self, url: &Url) {
            self.record(format!("open:{url}"));
        }
        fn show_main_window(&self) {
            self.record("show_main".to_string());
        }
        fn hide_main_window(&self) {
            self.record("hide_main".to_string());
        }
    }
}
