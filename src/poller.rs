use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::{resources, Transport};
use crate::error::LogisticsError;
use crate::models::route::{LocationSample, RouteTrace, RouteUpdate};
use crate::observability::metrics::Metrics;

/// Background refresh loop for one delivery's route trace: fetch on start,
/// then on a fixed interval, replacing the trace wholesale each time. The
/// loop awaits each fetch before the next tick, so polls for a key never
/// overlap. `stop()` (or drop) aborts the loop and discards any in-flight
/// fetch before its result can be applied.
pub struct RoutePoller {
    request_id: Uuid,
    supplier_id: Uuid,
    updates: watch::Receiver<Option<RouteUpdate>>,
    handle: JoinHandle<()>,
    stopped: Arc<AtomicBool>,
    metrics: Metrics,
}

impl RoutePoller {
    pub fn start(
        transport: Arc<dyn Transport>,
        metrics: Metrics,
        request_id: Uuid,
        supplier_id: Uuid,
        poll_interval: Duration,
        on_update: impl Fn(RouteUpdate) + Send + Sync + 'static,
    ) -> Self {
        let (tx, rx) = watch::channel(None);

        metrics.active_pollers.inc();
        info!(%request_id, %supplier_id, ?poll_interval, "route poller started");

        let loop_metrics = metrics.clone();
        let handle = tokio::spawn(poll_loop(
            transport,
            loop_metrics,
            request_id,
            supplier_id,
            poll_interval,
            tx,
            on_update,
        ));

        Self {
            request_id,
            supplier_id,
            updates: rx,
            handle,
            stopped: Arc::new(AtomicBool::new(false)),
            metrics,
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn supplier_id(&self) -> Uuid {
        self.supplier_id
    }

    pub fn latest(&self) -> Option<RouteUpdate> {
        self.updates.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<RouteUpdate>> {
        self.updates.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.stopped.load(Ordering::SeqCst) && !self.handle.is_finished()
    }

    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        self.handle.abort();
        self.metrics.active_pollers.dec();
        info!(request_id = %self.request_id, supplier_id = %self.supplier_id, "route poller stopped");
    }
}

impl Drop for RoutePoller {
    fn drop(&mut self) {
        self.stop();
    }
}

#[allow(clippy::too_many_arguments)]
async fn poll_loop(
    transport: Arc<dyn Transport>,
    metrics: Metrics,
    request_id: Uuid,
    supplier_id: Uuid,
    poll_interval: Duration,
    tx: watch::Sender<Option<RouteUpdate>>,
    on_update: impl Fn(RouteUpdate) + Send + Sync + 'static,
) {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        // First tick completes immediately, giving the fetch-on-start.
        ticker.tick().await;

        let started = Instant::now();
        match fetch_trace(transport.as_ref(), request_id, supplier_id).await {
            Ok(trace) => {
                metrics
                    .poll_latency_seconds
                    .with_label_values(&["success"])
                    .observe(started.elapsed().as_secs_f64());
                metrics
                    .route_polls_total
                    .with_label_values(&["success"])
                    .inc();

                let update = RouteUpdate::from_trace(trace);
                debug!(
                    %request_id,
                    samples = update.trace.len(),
                    last_update = ?update.last_update,
                    "route trace refreshed"
                );
                tx.send_replace(Some(update.clone()));
                on_update(update);
            }
            Err(err) => {
                metrics
                    .poll_latency_seconds
                    .with_label_values(&["error"])
                    .observe(started.elapsed().as_secs_f64());
                metrics
                    .route_polls_total
                    .with_label_values(&["error"])
                    .inc();
                // Transient failures must not kill the loop.
                warn!(%request_id, %supplier_id, error = %err, "route poll failed; will retry");
            }
        }
    }
}

// An empty or missing sample array means "no trace yet", not an error.
async fn fetch_trace(
    transport: &dyn Transport,
    request_id: Uuid,
    supplier_id: Uuid,
) -> Result<RouteTrace, LogisticsError> {
    let query = vec![
        ("requestId".to_string(), request_id.to_string()),
        ("supplierId".to_string(), supplier_id.to_string()),
    ];

    let response = transport
        .fetch_collection(resources::ROUTE_SAMPLES, &query)
        .await?;

    if !response.is_success() {
        return Err(LogisticsError::Transport(format!(
            "route samples returned status {}",
            response.status
        )));
    }

    let mut samples = Vec::new();
    for value in response.data.unwrap_or_default() {
        match serde_json::from_value::<LocationSample>(value) {
            Ok(sample) => samples.push(sample),
            Err(err) => warn!(%request_id, error = %err, "skipping malformed route sample"),
        }
    }

    Ok(RouteTrace::from_samples(samples))
}
