use std::{any::Any, time::SystemTime};

use serde::Serialize;
use uuid::Uuid;

use crate::{events::Event, types::FinalVideo, workers::events::EventHeader};

#[derive(Clone, Debug, Serialize)]
pub struct StoryAssembled {
    pub header: EventHeader,
    pub story_id: String,
    pub video: FinalVideo,
}

impl StoryAssembled {
    pub const EVENT_TYPE: &'static str = "story.assembled";

    pub fn new(parent: Option<Uuid>, story_id: &str, video: FinalVideo) -> Self {
        Self {
            header: EventHeader::new(parent),
            story_id: story_id.to_string(),
            video,
        }
    }
}

impl Event for StoryAssembled {
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
