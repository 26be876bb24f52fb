use std::time::Duration;

use tokio::time::{sleep_until, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SplashStage {
    pub(crate) offset: Duration,
    pub(crate) text: &'static str,
}

pub(crate) const SPLASH_STAGES: [SplashStage; 3] = [
    SplashStage {
        offset: Duration::ZERO,
        text: "Starting app...",
    },
    SplashStage {
        offset: Duration::from_secs(2),
        text: "Connecting to CheapDeck...",
    },
    SplashStage {
        offset: Duration::from_secs(32),
        text: "Connecting is taking longer than usual.<br>Please check your CheapDeck device and network.",
    },
];

/// Pushes each stage's text at its offset from the moment this future is
/// first polled. Dropping the future cancels the remaining stages.
pub(crate) async fn run_splash_schedule<F>(stages: &[SplashStage], set_text: F)
where
    F: Fn(&str),
{
    let started = Instant::now();
    for stage in stages {
        sleep_until(started + stage.offset).await;
        set_text(stage.text);
    }
}
