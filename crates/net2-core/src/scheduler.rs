// ── Per-site refresh scheduler ──
//
// Each site owns one ticker task. The task holds a `Weak` reference so a
// dropped site ends its own schedule, and a `CancellationToken` so `stop`
// can end it deterministically.

use std::sync::Weak;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug};

use crate::error::CoreError;
use crate::site::Site;

/// Handle to a running refresh schedule.
pub(crate) struct SchedulerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Arm a schedule that refreshes `site` every `period`, starting now.
    /// A zero period is rejected.
    pub(crate) fn spawn(
        site: Weak<Site>,
        period: Duration,
        span: tracing::Span,
    ) -> Result<Self, CoreError> {
        if period.is_zero() {
            return Err(CoreError::Config {
                message: "refresh interval must be greater than zero".into(),
            });
        }
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| CoreError::RuntimeUnavailable)?;
        let cancel = CancellationToken::new();
        let task = runtime.spawn(refresh_task(site, period, cancel.clone()).instrument(span));
        Ok(Self { cancel, task })
    }

    /// Stop ticking. A refresh already in progress runs to completion.
    pub(crate) async fn stop(self) {
        self.cancel.cancel();
        let _ = self.task.await;
    }

    pub(crate) fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

async fn refresh_task(site: Weak<Site>, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    debug!(period = ?period, "refresh schedule armed");

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let Some(site) = site.upgrade() else { break };
                site.refresh_all().await;
            }
        }
    }

    debug!("refresh schedule stopped");
}
