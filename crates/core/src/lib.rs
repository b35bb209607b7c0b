//! Storyreel Core Library
//!
//! Turns the per-segment assets of a generated story (still image, voiceover,
//! word-timing transcript) into captioned clips and joins them into one video.

pub mod assets;
pub mod captions;
pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod ffmpeg;
pub mod generation;
pub mod pipeline;
pub mod queues;
pub mod routes;
pub mod story;
pub mod transcript;
pub mod types;
pub mod workers;

// Re-export commonly used items at crate root
pub use assets::{AssetKind, NormalizationReport, locate_segments, normalize_assets};
pub use captions::{CaptionStyle, build_caption_filter};
pub use catalog::list_completed_stories;
pub use config::PipelineConfig;
pub use error::{ErrorClass, Result, StoryError};
pub use ffmpeg::{FfmpegRunner, SystemFfmpegRunner};
pub use generation::{GenerationConfig, GenerationRequest, GptScriptGenerator, StoryGenerator, create_story};
pub use pipeline::{PipelineStage, StoryPipeline};
pub use story::{StoryId, StoryLayout};
pub use transcript::{load_transcript, parse_transcript};
pub use types::{FinalVideo, RenderedClip, Segment, Transcript, WordTiming};
