use std::{
    env,
    path::{Path, PathBuf},
    sync::Arc,
};
use tauri::{webview::PageLoadEvent, App, Manager, RunEvent, WindowEvent};
use tauri_plugin_autostart::MacosLauncher;

use crate::{
    append_desktop_log, append_shutdown_log, append_startup_log,
    backend_config::DeckConfig,
    backend_supervisor::{BackendSupervisor, SupervisorPolicy, SystemLauncher},
    diagnostic_log::DiagnosticBuffer,
    exit_events,
    launch_plan::{resolve_launch_candidates, LaunchSearchRoots},
    log_window, logging,
    presentation::{PresentationEffect, PresentationEvent},
    settings_gateway::BackendClient,
    startup_task, tray_setup, ui_dispatch, window_actions, DeckContext, LOG_WINDOW_LABEL,
    MAIN_WINDOW_LABEL, PORTABLE_EXECUTABLE_DIR_ENV,
};

pub(crate) fn run() {
    tauri::Builder::default()
        .plugin(tauri_plugin_single_instance::init(|app, _argv, _cwd| {
            append_desktop_log("second instance launched, showing existing window");
            window_actions::dispatch_presentation_event(app, PresentationEvent::TrayShowRequested);
        }))
        .plugin(logging::log_plugin())
        .plugin(tauri_plugin_autostart::init(MacosLauncher::LaunchAgent, None))
        .on_window_event(|window, event| {
            if window.label() != MAIN_WINDOW_LABEL {
                return;
            }

            if let WindowEvent::CloseRequested { api, .. } = event {
                let effects = window_actions::dispatch_presentation_event(
                    window.app_handle(),
                    PresentationEvent::MainWindowCloseRequested,
                );
                if effects.contains(&PresentationEffect::PreventClose) {
                    api.prevent_close();
                }
            }
        })
        .on_page_load(|webview, payload| {
            if let PageLoadEvent::Finished = payload.event() {
                append_desktop_log(&format!(
                    "page-load finished in {}: {}",
                    webview.label(),
                    payload.url()
                ));
                if webview.label() == LOG_WINDOW_LABEL {
                    log_window::replay_log(webview);
                }
            }
        })
        .setup(|app| {
            append_startup_log("desktop process starting");
            let context = build_context(app)?;
            let open_log_window =
                context.config.auto_start_backend && context.config.show_log_window;
            app.manage(context);

            let app_handle = app.handle().clone();
            if let Err(error) = tray_setup::setup_tray(&app_handle) {
                append_startup_log(&format!("failed to initialize tray: {error}"));
            }
            if open_log_window {
                if let Err(error) = log_window::open_log_window(&app_handle) {
                    append_startup_log(&error);
                }
            }

            startup_task::spawn_startup_task(app_handle.clone(), append_startup_log);
            spawn_ctrl_c_listener(app_handle);
            Ok(())
        })
        .build(tauri::generate_context!())
        .expect("error while building tauri application")
        .run(|app_handle, event| match event {
            RunEvent::ExitRequested { code, api, .. } => {
                exit_events::handle_exit_requested(app_handle, code, &api);
            }
            RunEvent::Exit => {
                exit_events::handle_exit_event(app_handle);
            }
            _ => {}
        });
}

fn build_context(app: &App) -> Result<DeckContext, crate::DeckError> {
    let config = DeckConfig::from_env()?;
    append_startup_log(&format!("backend url: {}", config.backend_url));

    let diagnostics = Arc::new(DiagnosticBuffer::default());
    let sink = log_window::diagnostic_sink(app.handle().clone(), Arc::clone(&diagnostics));

    let roots = LaunchSearchRoots {
        resource_dir: app.path().resource_dir().ok(),
        portable_dir: env::var_os(PORTABLE_EXECUTABLE_DIR_ENV).map(PathBuf::from),
        executable_dir: env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf)),
        source_dir: config.backend_dir.clone(),
    };
    let candidates = match resolve_launch_candidates(&config, &roots) {
        Ok(candidates) => candidates,
        Err(error) => {
            sink(&format!("[FATAL] {error}"));
            Vec::new()
        }
    };
    for candidate in &candidates {
        append_startup_log(&format!("launch candidate: {}", candidate.debug_command()));
    }

    let backend = BackendClient::new(config.backend_url.clone())?;
    let supervisor = BackendSupervisor::new(
        candidates,
        Box::new(SystemLauncher),
        sink,
        SupervisorPolicy::default(),
    );
    Ok(DeckContext::new(config, backend, supervisor, diagnostics))
}

fn spawn_ctrl_c_listener(app_handle: tauri::AppHandle) {
    tauri::async_runtime::spawn(async move {
        if let Err(error) = tokio::signal::ctrl_c().await {
            append_desktop_log(&format!("failed to listen for Ctrl-C: {error}"));
            return;
        }

        append_shutdown_log("Ctrl-C received, quitting");
        if let Err(error) =
            ui_dispatch::run_on_main_thread_dispatch(&app_handle, "quit after Ctrl-C", |app| {
                window_actions::request_quit(app)
            })
        {
            append_shutdown_log(&error);
        }
    });
}
