use std::sync::Arc;

use console::style;
use indicatif::ProgressBar;
use storyreel_core::{
    PipelineStage,
    events::{EnrichedEvent, EventBus, downcast_ref},
    queues::QueueKind,
    workers::{InputSpec, PipelineStageChanged, SegmentRendered, SubscriptionSpec, Worker},
};

/// Drives the CLI spinner from stage and render events
pub struct BuildProgressWorker {
    progress: ProgressBar,
    segment_count: usize,
    rendered: usize,
}

impl BuildProgressWorker {
    pub fn new(progress: ProgressBar, segment_count: usize) -> Self {
        Self {
            progress,
            segment_count,
            rendered: 0,
        }
    }

    fn stage_message(&self, stage: PipelineStage) -> Option<String> {
        match stage {
            PipelineStage::Normalizing => Some("Normalizing assets...".to_string()),
            PipelineStage::Rendering => Some(self.rendering_message()),
            PipelineStage::Concatenating => Some("Merging clips...".to_string()),
            PipelineStage::Idle | PipelineStage::Done | PipelineStage::Failed => None,
        }
    }

    fn rendering_message(&self) -> String {
        format!(
            "Rendering segments {}",
            style(format!("({}/{})", self.rendered, self.segment_count)).dim()
        )
    }
}

impl Worker for BuildProgressWorker {
    const SUBSCRIBER_ID: &'static str = "cli.build_progress";

    fn subscription() -> SubscriptionSpec {
        SubscriptionSpec {
            subscriber_id: Self::SUBSCRIBER_ID,
            inputs: vec![
                InputSpec {
                    event_type: PipelineStageChanged::EVENT_TYPE,
                    queue_kind: QueueKind::FifoDropOldest { capacity: 8 },
                },
                InputSpec {
                    event_type: SegmentRendered::EVENT_TYPE,
                    queue_kind: QueueKind::FifoDropOldest { capacity: 16 },
                },
            ],
        }
    }

    async fn handle(&mut self, event: Arc<EnrichedEvent>, _bus: &EventBus) -> anyhow::Result<()> {
        if let Some(changed) = downcast_ref::<PipelineStageChanged>(&event.event) {
            if changed.stage == PipelineStage::Normalizing {
                self.rendered = 0;
            }
            if let Some(message) = self.stage_message(changed.stage) {
                self.progress.set_message(message);
            }
        }

        if downcast_ref::<SegmentRendered>(&event.event).is_some() {
            self.rendered += 1;
            self.progress.set_message(self.rendering_message());
        }
        Ok(())
    }
}
