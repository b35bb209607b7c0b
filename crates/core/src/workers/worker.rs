use std::sync::Arc;

use anyhow::Result;
use tokio::sync::broadcast;
use tracing::warn;

use crate::{
    events::{EnrichedEvent, EventBus},
    workers::{SubscriptionSpec, WorkerInputs},
};

/// A bus subscriber. Handler failures are logged and never stop the worker.
pub trait Worker: Send + Sized + 'static {
    const SUBSCRIBER_ID: &'static str;

    fn subscription() -> SubscriptionSpec;

    fn handle(
        &mut self,
        event: Arc<EnrichedEvent>,
        bus: &EventBus,
    ) -> impl Future<Output = Result<()>> + Send;

    fn run(
        mut self,
        mut inputs: WorkerInputs,
        bus: Arc<EventBus>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> impl Future<Output = Result<()>> + Send {
        async move {
            loop {
                tokio::select! {
                    _ = shutdown.recv() => return Ok(()),
                    event = inputs.next() => {
                        if let Err(e) = self.handle(Arc::clone(&event), &bus).await {
                            warn!(
                                subscriber = Self::SUBSCRIBER_ID,
                                event_type = event.event.event_type(),
                                error = %e,
                                "Event handler failed"
                            );
                        }
                    }
                }
            }
        }
    }
}
