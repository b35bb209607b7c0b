pub mod generation_output;
pub mod pipeline_failed;
pub mod segment_rendered;
pub mod stage_changed;
pub mod story_assembled;

pub use generation_output::*;
pub use pipeline_failed::*;
pub use segment_rendered::*;
pub use stage_changed::*;
pub use story_assembled::*;

use std::time::SystemTime;

use uuid::Uuid;

#[derive(Clone, Debug, serde::Serialize)]
pub struct EventHeader {
    pub event_id: Uuid,
    pub parent_ids: Vec<Uuid>,
    pub timestamp: SystemTime,
}

impl EventHeader {
    pub fn new(parent: Option<Uuid>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            parent_ids: parent.into_iter().collect(),
            timestamp: SystemTime::now(),
        }
    }
}
