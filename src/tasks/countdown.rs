use std::sync::Weak;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TickControl {
    Continue,
    Stop,
}

/// Receives one call per countdown period.
#[async_trait]
pub(crate) trait CountdownTarget: Send + Sync + 'static {
    async fn on_tick(&self) -> TickControl;
}

/// Owns the background ticking task of one attempt. Dropping the handle cancels the task.
///
/// The task holds only a weak reference to its target, so it ends on its own once the
/// target is gone. A target must not cancel its own handle from inside `on_tick`; it
/// returns `TickControl::Stop` instead.
#[derive(Debug)]
pub(crate) struct CountdownHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl CountdownHandle {
    pub(crate) fn spawn<T: CountdownTarget>(period: Duration, target: Weak<T>) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run(period, target, shutdown_rx));
        Self { shutdown, task }
    }

    pub(crate) fn cancel(&self) {
        let _ = self.shutdown.send(true);
        self.task.abort();
    }

    #[cfg(test)]
    pub(crate) fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for CountdownHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn run<T: CountdownTarget>(
    period: Duration,
    target: Weak<T>,
    mut shutdown: watch::Receiver<bool>,
) {
    // First tick lands one full period after start.
    let mut tick = interval_at(Instant::now() + period, period);
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                let Some(target) = target.upgrade() else {
                    tracing::debug!("Countdown target dropped; stopping");
                    break;
                };
                if target.on_tick().await == TickControl::Stop {
                    break;
                }
            }
        }
    }
}
