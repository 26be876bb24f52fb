use std::{
    pin::pin,
    sync::{Arc, Mutex},
    time::Duration,
};

use tauri::{AppHandle, Manager};
use url::Url;

use crate::{
    append_startup_log,
    device_discovery::{poll_until_device_found, DeviceFound, SettingsSource},
    presentation::{self, PresentationEffect, PresentationEvent, PresentationStateMachine},
    readiness::{wait_until_ready, BackendProbe, ReadinessOutcome, ReadinessPolicy},
    splash::{run_splash_schedule, SPLASH_STAGES},
    window_actions::{apply_surface_effects, ShellSurfaces, TauriSurfaces},
    DeckContext, DISCOVERY_INTERVAL,
};

#[derive(Debug, Clone, Copy)]
pub(crate) struct LifecycleTimings {
    pub(crate) readiness: ReadinessPolicy,
    pub(crate) discovery_interval: Duration,
}

impl Default for LifecycleTimings {
    fn default() -> Self {
        Self {
            readiness: ReadinessPolicy::default(),
            discovery_interval: DISCOVERY_INTERVAL,
        }
    }
}

/// Splash, readiness, discovery, then the main window. Returns `None` when
/// the app started quitting before a device showed up.
pub(crate) async fn run_startup_lifecycle<B, S, F>(
    backend: &B,
    surfaces: &S,
    presentation: &Mutex<PresentationStateMachine>,
    backend_url: &Url,
    timings: LifecycleTimings,
    on_readiness: F,
) -> Option<DeviceFound>
where
    B: BackendProbe + SettingsSource,
    S: ShellSurfaces,
    F: FnOnce(ReadinessOutcome),
{
    surfaces.show_splash();

    // The splash schedule lives only inside this block, so leaving it for
    // any reason cancels the remaining texts.
    let found = {
        let mut splash = pin!(run_splash_schedule(&SPLASH_STAGES, |text| {
            surfaces.set_splash_text(text)
        }));
        let mut connect = pin!(connect_and_discover(
            backend,
            presentation,
            backend_url,
            timings,
            on_readiness,
        ));
        tokio::select! {
            found = &mut connect => found,
            () = &mut splash => connect.await,
        }
    };

    let found = found?;
    let effects = presentation::dispatch_event(presentation, PresentationEvent::DeviceFound);
    apply_surface_effects(surfaces, &effects, backend_url);
    Some(found)
}

async fn connect_and_discover<B, F>(
    backend: &B,
    presentation: &Mutex<PresentationStateMachine>,
    backend_url: &Url,
    timings: LifecycleTimings,
    on_readiness: F,
) -> Option<DeviceFound>
where
    B: BackendProbe + SettingsSource,
    F: FnOnce(ReadinessOutcome),
{
    let outcome = wait_until_ready(backend, backend_url, timings.readiness).await;
    on_readiness(outcome);

    let effects = presentation::dispatch_event(presentation, PresentationEvent::BackendReady);
    if !effects.contains(&PresentationEffect::StartDiscovery) {
        return None;
    }

    poll_until_device_found(backend, timings.discovery_interval, || {
        presentation::is_quitting(presentation)
    })
    .await
}

pub fn spawn_startup_task<F>(app_handle: AppHandle, log: F)
where
    F: Fn(&str) + Send + Sync + 'static,
{
    tauri::async_runtime::spawn(async move {
        let Some(context) = app_handle.try_state::<DeckContext>() else {
            log("startup task aborted: app context is not managed");
            return;
        };

        if context.config.auto_start_backend {
            let supervisor = Arc::clone(&context.supervisor);
            log(&format!(
                "launching backend ({} candidate(s))",
                supervisor.candidate_count()
            ));
            tauri::async_runtime::spawn(async move {
                let outcome = supervisor.run().await;
                append_startup_log(&format!("backend supervision ended: {outcome:?}"));
            });
        } else {
            log(&format!(
                "backend auto start disabled, attaching to {}",
                context.config.backend_url
            ));
        }

        let surfaces = TauriSurfaces::new(app_handle.clone());
        let supervisor = Arc::clone(&context.supervisor);
        let found = run_startup_lifecycle(
            &context.backend,
            &surfaces,
            &context.presentation,
            &context.config.backend_url,
            LifecycleTimings::default(),
            |outcome| {
                if outcome.is_ready() {
                    supervisor.mark_established();
                    log(&format!(
                        "backend ready after {} attempt(s), waiting for device",
                        outcome.attempts()
                    ));
                } else {
                    log(&format!(
                        "backend not reachable after {} attempt(s), waiting for device anyway",
                        outcome.attempts()
                    ));
                }
            },
        )
        .await;

        match found {
            Some(found) => log(&format!(
                "device found after {} settings poll(s), main window opened",
                found.polls
            )),
            None => log("startup ended before a device was found"),
        }
    });
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::{
        device_discovery::DeviceSnapshot,
        presentation::PresentationState,
        window_actions::test_surfaces::RecordingSurfaces,
        DeckError, DeckResult,
    };

    struct FakeBackend {
        reachable: bool,
        /// Snapshots served in order; the last one repeats.
        snapshots: Vec<DeviceSnapshot>,
        probes: AtomicU32,
        fetches: AtomicU32,
    }

    impl FakeBackend {
        fn unreachable() -> Self {
            Self {
                reachable: false,
                snapshots: Vec::new(),
                probes: AtomicU32::new(0),
                fetches: AtomicU32::new(0),
            }
        }

        fn serving(snapshots: Vec<DeviceSnapshot>) -> Self {
            Self {
                reachable: true,
                snapshots,
                ..Self::unreachable()
            }
        }
    }

    impl BackendProbe for FakeBackend {
        async fn probe(&self, _url: &Url) -> DeckResult<()> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            if self.reachable {
                Ok(())
            } else {
                Err(DeckError::Probe("connection refused".to_string()))
            }
        }
    }

    impl SettingsSource for FakeBackend {
        async fn fetch_settings(&self) -> DeckResult<DeviceSnapshot> {
            let index = self.fetches.fetch_add(1, Ordering::SeqCst) as usize;
            if !self.reachable {
                return Err(DeckError::Probe("connection refused".to_string()));
            }
            self.snapshots
                .get(index)
                .or_else(|| self.snapshots.last())
                .cloned()
                .ok_or_else(|| DeckError::MalformedResponse("empty body".to_string()))
        }
    }

    fn backend_url() -> Url {
        Url::parse(crate::DEFAULT_BACKEND_URL).expect("default url")
    }

    fn layout_one() -> DeviceSnapshot {
        DeviceSnapshot {
            layout: 1,
            ..DeviceSnapshot::factory_default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_backend_keeps_splash_and_never_opens_main_window() {
        let backend = FakeBackend::unreachable();
        let surfaces = RecordingSurfaces::default();
        let presentation = Mutex::new(PresentationStateMachine::default());
        let readiness = Mutex::new(None);

        let result = tokio::time::timeout(
            Duration::from_secs(40),
            run_startup_lifecycle(
                &backend,
                &surfaces,
                &presentation,
                &backend_url(),
                LifecycleTimings::default(),
                |outcome| *readiness.lock().expect("readiness lock") = Some(outcome),
            ),
        )
        .await;

        assert!(result.is_err(), "lifecycle must keep waiting for a device");
        assert_eq!(
            *readiness.lock().expect("readiness lock"),
            Some(ReadinessOutcome::BudgetExhausted { attempts: 40 })
        );
        assert_eq!(backend.probes.load(Ordering::SeqCst), 40);
        assert!(backend.fetches.load(Ordering::SeqCst) > 0);

        let calls = surfaces.calls();
        assert_eq!(calls[0], "show_splash");
        let texts: Vec<&str> = calls
            .iter()
            .filter_map(|call| call.strip_prefix("splash:"))
            .collect();
        assert_eq!(texts.len(), 3);
        assert_eq!(texts[0], "Starting app...");
        assert_eq!(texts[1], "Connecting to CheapDeck...");
        assert!(texts[2].starts_with("Connecting is taking longer than usual."));
        assert_eq!(surfaces.count("open:"), 0);
        assert_eq!(surfaces.count("close_splash"), 0);
        assert_eq!(
            presentation.lock().expect("presentation").state(),
            PresentationState::WaitingForDevice
        );
    }

    #[tokio::test(start_paused = true)]
    async fn device_appearing_on_fourth_poll_opens_main_window_once() {
        let defaults = DeviceSnapshot::factory_default();
        let backend = FakeBackend::serving(vec![
            defaults.clone(),
            defaults.clone(),
            defaults,
            layout_one(),
        ]);
        let surfaces = RecordingSurfaces::default();
        let presentation = Mutex::new(PresentationStateMachine::default());
        let started = tokio::time::Instant::now();

        let found = run_startup_lifecycle(
            &backend,
            &surfaces,
            &presentation,
            &backend_url(),
            LifecycleTimings::default(),
            |outcome| assert_eq!(outcome, ReadinessOutcome::Ready { attempts: 1 }),
        )
        .await
        .expect("device found");

        assert_eq!(found.polls, 4);
        assert_eq!(found.snapshot.layout, 1);
        assert_eq!(started.elapsed(), DISCOVERY_INTERVAL * 3);
        assert_eq!(surfaces.count("close_splash"), 1);
        assert_eq!(
            surfaces.calls().last().map(String::as_str),
            Some("open:http://localhost:22778/")
        );
        assert_eq!(
            presentation.lock().expect("presentation").state(),
            PresentationState::Ready
        );

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(surfaces.count("splash:"), 2, "late splash text after close");
        assert_eq!(surfaces.count("open:"), 1);
        assert_eq!(backend.fetches.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn quitting_during_discovery_ends_startup_without_main_window() {
        let backend = FakeBackend::serving(vec![DeviceSnapshot::factory_default()]);
        let surfaces = RecordingSurfaces::default();
        let presentation = Mutex::new(PresentationStateMachine::default());

        let url = backend_url();
        let lifecycle = run_startup_lifecycle(
            &backend,
            &surfaces,
            &presentation,
            &url,
            LifecycleTimings::default(),
            |_| {},
        );
        let quit = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            presentation::dispatch_event(&presentation, PresentationEvent::QuitRequested)
        };
        let (found, quit_effects) = tokio::join!(lifecycle, quit);

        assert!(found.is_none());
        assert!(quit_effects.contains(&PresentationEffect::StopBackend));
        assert_eq!(backend.fetches.load(Ordering::SeqCst), 3);
        assert_eq!(surfaces.count("open:"), 0);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(surfaces.count("splash:"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn hiding_and_showing_after_startup_reuses_the_window() {
        let backend = FakeBackend::serving(vec![layout_one()]);
        let surfaces = RecordingSurfaces::default();
        let presentation = Mutex::new(PresentationStateMachine::default());
        let url = backend_url();

        run_startup_lifecycle(
            &backend,
            &surfaces,
            &presentation,
            &url,
            LifecycleTimings::default(),
            |_| {},
        )
        .await
        .expect("device found");

        for event in [
            PresentationEvent::MainWindowCloseRequested,
            PresentationEvent::TrayShowRequested,
            PresentationEvent::MainWindowCloseRequested,
            PresentationEvent::TrayShowRequested,
        ] {
            let effects = presentation::dispatch_event(&presentation, event);
            apply_surface_effects(&surfaces, &effects, &url);
        }

        assert_eq!(surfaces.count("open:"), 1);
        assert_eq!(surfaces.count("hide_main"), 2);
        assert_eq!(surfaces.count("show_main"), 2);
        assert_eq!(backend.fetches.load(Ordering::SeqCst), 1);
    }
}
