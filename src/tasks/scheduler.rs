use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::tasks::retention::{self, RETENTION_INTERVAL};

/// Spawns the background loops next to the HTTP server. They stop once `shutdown` flips.
pub(crate) fn spawn(state: AppState, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
    vec![tokio::spawn(retention_loop(state, shutdown))]
}

pub(crate) async fn join(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        if let Err(err) = handle.await {
            tracing::error!(error = %err, "Background task join failed");
        }
    }
}

async fn retention_loop(state: AppState, shutdown: watch::Receiver<bool>) {
    let state = &state;
    run_periodic("retention", RETENTION_INTERVAL, shutdown, move || async move {
        retention::run_retention(state.db(), state.storage(), primitive_now_utc()).await.map(|_| ())
    })
    .await;

    tracing::info!("Retention sweeper stopped");
}

/// Runs `job` on every tick of `period`, the first one immediately, until `shutdown` flips.
/// A failed run is logged and the next tick runs as usual.
async fn run_periodic<F, Fut>(
    name: &'static str,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    mut job: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    let mut tick = interval(period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                if let Err(err) = job().await {
                    tracing::error!(task = name, error = %err, "Background task run failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn failing_job(runs: Arc<AtomicUsize>) -> impl FnMut() -> std::future::Ready<anyhow::Result<()>> {
        move || {
            runs.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Err(anyhow::anyhow!("database unavailable")))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_runs_do_not_stop_the_loop() {
        let runs = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(run_periodic(
            "test",
            Duration::from_secs(3600),
            rx,
            failing_job(runs.clone()),
        ));

        tokio::time::sleep(Duration::from_secs(2 * 3600 + 1)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);

        tx.send(true).expect("send shutdown");
        handle.await.expect("loop exits");
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_the_loop_between_ticks() {
        let runs = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(run_periodic(
            "test",
            Duration::from_secs(3600),
            rx,
            failing_job(runs.clone()),
        ));

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        tx.send(true).expect("send shutdown");
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("loop stopped before the next tick")
            .expect("join");
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn already_flipped_shutdown_skips_the_first_run() {
        let runs = Arc::new(AtomicUsize::new(0));
        let (_tx, rx) = watch::channel(true);

        run_periodic("test", Duration::from_secs(3600), rx, failing_job(runs.clone())).await;

        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }
}
