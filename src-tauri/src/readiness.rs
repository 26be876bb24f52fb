use std::{future::Future, time::Duration};

use url::Url;

use crate::{DeckResult, READINESS_INTERVAL, READINESS_MAX_ATTEMPTS};

pub(crate) trait BackendProbe: Send + Sync {
    /// Resolves `Ok` when `url` answered with a 2xx status.
    fn probe(&self, url: &Url) -> impl Future<Output = DeckResult<()>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ReadinessPolicy {
    pub(crate) max_attempts: u32,
    pub(crate) interval: Duration,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            max_attempts: READINESS_MAX_ATTEMPTS,
            interval: READINESS_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReadinessOutcome {
    Ready { attempts: u32 },
    /// Budget spent without a 2xx. Callers proceed anyway.
    BudgetExhausted { attempts: u32 },
}

impl ReadinessOutcome {
    pub(crate) fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }

    pub(crate) fn attempts(&self) -> u32 {
        match self {
            Self::Ready { attempts } | Self::BudgetExhausted { attempts } => *attempts,
        }
    }
}

pub(crate) async fn wait_until_ready<P>(
    probe: &P,
    url: &Url,
    policy: ReadinessPolicy,
) -> ReadinessOutcome
where
    P: BackendProbe,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempts = 0;
    loop {
        attempts += 1;
        match probe.probe(url).await {
            Ok(()) => {
                log::info!("backend at {url} is ready after {attempts} attempt(s)");
                return ReadinessOutcome::Ready { attempts };
            }
            Err(error) => {
                log::debug!("readiness attempt {attempts}/{max_attempts} failed: {error}")
            }
        }

        if attempts >= max_attempts {
            log::warn!(
                "backend at {url} did not answer after {attempts} attempts, continuing anyway"
            );
            return ReadinessOutcome::BudgetExhausted { attempts };
        }
        tokio::time::sleep(policy.interval).await;
    }
}
