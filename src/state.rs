use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::assignment::Assignment;
use crate::models::associate::DeliveryAssociate;
use crate::observability::metrics::Metrics;

/// Session-local read caches, the assignment event bus, and the metrics
/// handle.
pub struct EngineState {
    pub assignments: DashMap<Uuid, Assignment>,
    pub associates: DashMap<Uuid, DeliveryAssociate>,
    pub assignment_events_tx: broadcast::Sender<Assignment>,
    pub metrics: Metrics,
}

impl EngineState {
    pub fn new(event_buffer_size: usize) -> Self {
        let (assignment_events_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        Self {
            assignments: DashMap::new(),
            associates: DashMap::new(),
            assignment_events_tx,
            metrics: Metrics::new(),
        }
    }
}
