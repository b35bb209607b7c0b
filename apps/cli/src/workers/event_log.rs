use std::sync::Arc;

use storyreel_core::{
    events::{EnrichedEvent, EventBus},
    queues::QueueKind,
    workers::{
        GenerationOutput, InputSpec, PipelineFailed, PipelineStageChanged, SegmentRendered,
        StoryAssembled, SubscriptionSpec, Worker,
    },
};
use tracing::{debug, info, warn};

/// Writes every pipeline and generation event to the log
#[derive(Default)]
pub struct EventLogWorker;

impl Worker for EventLogWorker {
    const SUBSCRIBER_ID: &'static str = "log.events";

    fn subscription() -> SubscriptionSpec {
        let fifo = || QueueKind::FifoDropOldest { capacity: 64 };
        SubscriptionSpec {
            subscriber_id: Self::SUBSCRIBER_ID,
            inputs: vec![
                InputSpec {
                    event_type: PipelineStageChanged::EVENT_TYPE,
                    queue_kind: fifo(),
                },
                InputSpec {
                    event_type: SegmentRendered::EVENT_TYPE,
                    queue_kind: fifo(),
                },
                InputSpec {
                    event_type: StoryAssembled::EVENT_TYPE,
                    queue_kind: fifo(),
                },
                InputSpec {
                    event_type: PipelineFailed::EVENT_TYPE,
                    queue_kind: fifo(),
                },
                InputSpec {
                    event_type: GenerationOutput::EVENT_TYPE,
                    queue_kind: QueueKind::Isolated {
                        output_buffer: 256,
                    },
                },
            ],
        }
    }

    async fn handle(&mut self, event: Arc<EnrichedEvent>, _bus: &EventBus) -> anyhow::Result<()> {
        let payload = serde_json::to_string(event.event.as_ref())?;
        let event_type = event.event.event_type();
        let story_id = event.event.story_id().unwrap_or("-");

        match event_type {
            PipelineFailed::EVENT_TYPE => {
                warn!(event_type, story_id, seq = event.ingest_seq, %payload, "event")
            }
            GenerationOutput::EVENT_TYPE | SegmentRendered::EVENT_TYPE => {
                debug!(event_type, story_id, seq = event.ingest_seq, %payload, "event")
            }
            _ => info!(event_type, story_id, seq = event.ingest_seq, %payload, "event"),
        }
        Ok(())
    }
}
