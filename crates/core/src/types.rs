use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One narrated beat of a story: still image, voiceover and word timings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub index: usize,
    pub image: PathBuf,
    pub audio: PathBuf,
    pub transcript: PathBuf,
}

impl Segment {
    /// True when image, audio and transcript are all present on disk
    pub fn is_render_ready(&self) -> bool {
        self.image.exists() && self.audio.exists() && self.transcript.exists()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordTiming {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

impl WordTiming {
    /// Negative or inverted windows are kept as-is; they simply never (or only partly) show
    pub fn is_well_formed(&self) -> bool {
        self.start >= 0.0 && self.end >= self.start
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    /// Seconds, rounded to two decimals
    pub duration: f64,
    pub words: Vec<WordTiming>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedClip {
    pub segment: usize,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinalVideo {
    pub path: PathBuf,
    /// `<id>/final.mp4`, relative to the stories root
    pub relative_path: String,
}
