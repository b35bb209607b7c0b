use std::{any::Any, time::SystemTime};

use serde::Serialize;
use uuid::Uuid;

use crate::{events::Event, workers::events::EventHeader};

/// One line of output reported by the generation tool while it runs
#[derive(Clone, Debug, Serialize)]
pub struct GenerationOutput {
    pub header: EventHeader,
    pub story_id: String,
    pub output: String,
}

impl GenerationOutput {
    pub const EVENT_TYPE: &'static str = "generation.output";

    pub fn new(story_id: &str, output: String) -> Self {
        Self {
            header: EventHeader::new(None),
            story_id: story_id.to_string(),
            output,
        }
    }
}

impl Event for GenerationOutput {
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
