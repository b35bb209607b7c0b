use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use tokio::time::Instant;
use tracing::trace;
use uuid::Uuid;

use crate::{
    events::{BusConfig, BusMetrics, EnrichedEvent, Event},
    routes::Routes,
};

/// Fan-out of pipeline events to subscriber inboxes.
///
/// Publishing never blocks: a full inbox drops according to its queue kind.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<EventBusInner>,
}

pub struct EventBusInner {
    session_id: Uuid,
    next_ingest_seq: AtomicU64,
    routes: Arc<Routes>,
    metrics: Arc<BusMetrics>,
}

impl EventBus {
    pub fn new(cfg: BusConfig, routes: Routes, metrics: Arc<BusMetrics>) -> Self {
        Self {
            inner: Arc::new(EventBusInner {
                session_id: cfg.session_id,
                next_ingest_seq: AtomicU64::new(0),
                routes: Arc::new(routes),
                metrics,
            }),
        }
    }

    pub fn publish(&self, event: Arc<dyn Event>) {
        let ingest_seq = self.inner.next_ingest_seq.fetch_add(1, Ordering::Relaxed);

        let enriched_event = Arc::new(EnrichedEvent {
            event,
            session_id: self.inner.session_id,
            ingest_seq,
            ingested_at: Instant::now(),
        });

        let event_type = enriched_event.event.event_type();
        let Some(routes) = self.inner.routes.table.get(event_type) else {
            self.inner.metrics.record_unrouted(event_type);
            trace!(event_type, "No subscribers for event");
            return;
        };

        for route in routes {
            let ok = route.inbox.try_deliver(Arc::clone(&enriched_event));

            if !ok {
                route.drops_total.fetch_add(1, Ordering::Relaxed);
                trace!(event_type, subscriber = route.subscriber_id, "Inbox full, event dropped");
            }
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.inner.session_id
    }

    pub fn metrics(&self) -> &BusMetrics {
        &self.inner.metrics
    }
}
