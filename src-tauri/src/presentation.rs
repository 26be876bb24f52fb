//! Window lifecycle as a pure state machine. Callers feed events and carry
//! out the returned effects; nothing here touches Tauri.

use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum PresentationState {
    #[default]
    Starting,
    WaitingForDevice,
    Ready,
    HiddenInTray,
    Quitting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PresentationEvent {
    BackendReady,
    DeviceFound,
    MainWindowCloseRequested,
    TrayShowRequested,
    /// Tray "Exit" or the Ctrl-C handler.
    QuitRequested,
    /// The platform is already tearing the app down.
    PlatformQuit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PresentationEffect {
    StartDiscovery,
    CloseSplash,
    OpenMainWindow,
    ShowMainWindow,
    HideMainWindow,
    PreventClose,
    StopBackend,
    ExitApp,
}

#[derive(Debug, Default)]
pub(crate) struct PresentationStateMachine {
    state: PresentationState,
}

impl PresentationStateMachine {
    pub(crate) fn state(&self) -> PresentationState {
        self.state
    }

    pub(crate) fn is_quitting(&self) -> bool {
        self.state == PresentationState::Quitting
    }

    pub(crate) fn handle(&mut self, event: PresentationEvent) -> Vec<PresentationEffect> {
        use PresentationEffect as Effect;
        use PresentationEvent as Event;
        use PresentationState as State;

        let (next, effects) = match (self.state, event) {
            (State::Quitting, _) => (State::Quitting, Vec::new()),
            (_, Event::QuitRequested) => (
                State::Quitting,
                vec![Effect::StopBackend, Effect::ExitApp],
            ),
            (_, Event::PlatformQuit) => (State::Quitting, vec![Effect::StopBackend]),

            (State::Starting, Event::BackendReady) => {
                (State::WaitingForDevice, vec![Effect::StartDiscovery])
            }
            (State::WaitingForDevice, Event::DeviceFound) => (
                State::Ready,
                vec![Effect::CloseSplash, Effect::OpenMainWindow],
            ),

            (State::Ready, Event::MainWindowCloseRequested) => (
                State::HiddenInTray,
                vec![Effect::PreventClose, Effect::HideMainWindow],
            ),
            (State::HiddenInTray, Event::MainWindowCloseRequested) => {
                (State::HiddenInTray, vec![Effect::PreventClose])
            }

            (State::Ready | State::HiddenInTray, Event::TrayShowRequested) => {
                (State::Ready, vec![Effect::ShowMainWindow])
            }

            (state, ignored) => {
                log::debug!("presentation event {ignored:?} ignored in state {state:?}");
                (state, Vec::new())
            }
        };

        if next != self.state {
            log::debug!("presentation state {:?} -> {next:?}", self.state);
        }
        self.state = next;
        effects
    }
}

fn lock_machine(
    machine: &Mutex<PresentationStateMachine>,
) -> MutexGuard<'_, PresentationStateMachine> {
    match machine.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Feeds `event` to the shared machine. The lock is released before the
/// caller applies the effects.
pub(crate) fn dispatch_event(
    machine: &Mutex<PresentationStateMachine>,
    event: PresentationEvent,
) -> Vec<PresentationEffect> {
    lock_machine(machine).handle(event)
}

pub(crate) fn is_quitting(machine: &Mutex<PresentationStateMachine>) -> bool {
    lock_machine(machine).is_quitting()
}
