use std::{any::Any, time::SystemTime};

use serde::Serialize;
use uuid::Uuid;

use crate::{events::Event, pipeline::PipelineStage, workers::events::EventHeader};

/// Published once when a build run ends in `Failed`
#[derive(Clone, Debug, Serialize)]
pub struct PipelineFailed {
    pub header: EventHeader,
    pub story_id: String,
    /// Stage that was active when the failure happened
    pub stage: PipelineStage,
    pub message: String,
}

impl PipelineFailed {
    pub const EVENT_TYPE: &'static str = "pipeline.failed";

    pub fn new(parent: Option<Uuid>, story_id: &str, stage: PipelineStage, message: String) -> Self {
        Self {
            header: EventHeader::new(parent),
            story_id: story_id.to_string(),
            stage,
            message,
        }
    }
}

impl Event for PipelineFailed {
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
