use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use tauri::menu::MenuItem;

use crate::{
    backend_config::DeckConfig,
    backend_supervisor::BackendSupervisor,
    diagnostic_log::DiagnosticBuffer,
    presentation::{
        self, PresentationEffect, PresentationEvent, PresentationState, PresentationStateMachine,
    },
    settings_gateway::BackendClient,
};

#[derive(Clone)]
pub(crate) struct TrayMenuState {
    pub(crate) autostart_item: MenuItem<tauri::Wry>,
}

/// Everything the shell shares between the event loop and its tasks.
pub(crate) struct DeckContext {
    pub(crate) config: DeckConfig,
    pub(crate) backend: BackendClient,
    pub(crate) supervisor: Arc<BackendSupervisor>,
    pub(crate) presentation: Mutex<PresentationStateMachine>,
    pub(crate) diagnostics: Arc<DiagnosticBuffer>,
}

impl DeckContext {
    pub(crate) fn new(
        config: DeckConfig,
        backend: BackendClient,
        supervisor: BackendSupervisor,
        diagnostics: Arc<DiagnosticBuffer>,
    ) -> Self {
        Self {
            config,
            backend,
            supervisor: Arc::new(supervisor),
            presentation: Mutex::new(PresentationStateMachine::default()),
            diagnostics,
        }
    }

    pub(crate) fn dispatch(&self, event: PresentationEvent) -> Vec<PresentationEffect> {
        presentation::dispatch_event(&self.presentation, event)
    }

    pub(crate) fn is_quitting(&self) -> bool {
        presentation::is_quitting(&self.presentation)
    }

    pub(crate) fn presentation_state(&self) -> PresentationState {
        match self.presentation.lock() {
            Ok(machine) => machine.state(),
            Err(poisoned) => poisoned.into_inner().state(),
        }
    }
}

pub(crate) struct AtomicFlagGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> AtomicFlagGuard<'a> {
    pub(crate) fn try_set(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(Self { flag })
    }
}

impl Drop for AtomicFlagGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
