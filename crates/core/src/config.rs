use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    captions::CaptionStyle,
    error::{Result, StoryError},
};

/// Settings injected into the renderer, the concatenator and the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding one sub-directory per story
    pub stories_root: PathBuf,
    /// ffmpeg executable, resolved through `PATH` when relative
    pub ffmpeg_path: PathBuf,
    pub segment_count: usize,
    pub render_timeout_secs: u64,
    pub concat_timeout_secs: u64,
    pub video_codec: String,
    pub captions: CaptionStyle,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stories_root: PathBuf::from("./stories"),
            ffmpeg_path: PathBuf::from("ffmpeg"),
            segment_count: 3,
            render_timeout_secs: 600,
            concat_timeout_secs: 600,
            video_codec: "libx264".to_string(),
            captions: CaptionStyle::default(),
        }
    }
}

impl PipelineConfig {
    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }

    pub fn concat_timeout(&self) -> Duration {
        Duration::from_secs(self.concat_timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.segment_count == 0 {
            return Err(StoryError::Config("segment_count must be > 0".into()));
        }
        if self.render_timeout_secs == 0 || self.concat_timeout_secs == 0 {
            return Err(StoryError::Config("timeouts must be > 0".into()));
        }
        if self.video_codec.trim().is_empty() {
            return Err(StoryError::Config("video_codec must not be empty".into()));
        }
        Ok(())
    }
}
