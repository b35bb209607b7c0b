use std::{any::Any, time::SystemTime};

use serde::Serialize;
use uuid::Uuid;

use crate::{events::Event, pipeline::PipelineStage, workers::events::EventHeader};

#[derive(Clone, Debug, Serialize)]
pub struct PipelineStageChanged {
    pub header: EventHeader,
    pub story_id: String,
    pub stage: PipelineStage,
}

impl PipelineStageChanged {
    pub const EVENT_TYPE: &'static str = "pipeline.stage_changed";

    pub fn new(parent: Option<Uuid>, story_id: &str, stage: PipelineStage) -> Self {
        Self {
            header: EventHeader::new(parent),
            story_id: story_id.to_string(),
            stage,
        }
    }
}

impl Event for PipelineStageChanged {
    fn event_id(&self) -> Uuid {
        self.header.event_id
    }

    fn parent_ids(&self) -> &[Uuid] {
        &self.header.parent_ids
    }

    fn event_type(&self) -> &'static str {
        Self::EVENT_TYPE
    }

    fn timestamp(&self) -> SystemTime {
        self.header.timestamp
    }

    fn story_id(&self) -> Option<&str> {
        Some(&self.story_id)
    }

    fn as_any(&self) -> &dyn Any {
        self as &dyn Any
    }
}
