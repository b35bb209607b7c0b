use std::path::Path;

use serde::Deserialize;
use tokio::fs;

use crate::{
    error::{Result, StoryError},
    types::{Transcript, WordTiming},
};

/// Numbers in transcripts may arrive as JSON numbers or numeric strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum Seconds {
    Number(f64),
    Text(String),
}

impl Seconds {
    fn value(&self) -> Option<f64> {
        let value = match self {
            Seconds::Number(n) => *n,
            Seconds::Text(s) => s.trim().parse().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

#[derive(Deserialize)]
struct RawWord {
    word: String,
    start: Seconds,
    end: Seconds,
}

#[derive(Deserialize)]
struct RawTranscript {
    duration: Seconds,
    words: Vec<RawWord>,
}

/// Round to the two-decimal precision used for every ffmpeg time argument
pub fn round_seconds(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Parse a transcript document; `path` is only used for error reporting
pub fn parse_transcript(json: &str, path: &Path) -> Result<Transcript> {
    let parse_error = |reason: String| StoryError::Parse {
        path: path.to_path_buf(),
        reason,
    };

    let raw: RawTranscript =
        serde_json::from_str(json).map_err(|e| parse_error(e.to_string()))?;

    let duration = raw
        .duration
        .value()
        .map(round_seconds)
        .filter(|d| *d > 0.0)
        .ok_or_else(|| parse_error("duration must be a positive number".to_string()))?;

    let words = raw
        .words
        .into_iter()
        .enumerate()
        .map(|(i, w)| {
            let start = w.start.value();
            let end = w.end.value();
            match (start, end) {
                (Some(start), Some(end)) => Ok(WordTiming {
                    word: w.word,
                    start,
                    end,
                }),
                _ => Err(parse_error(format!("word {} has a non-numeric timing", i))),
            }
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Transcript { duration, words })
}

/// Load a transcript from a story directory
pub async fn load_transcript(path: &Path) -> Result<Transcript> {
    let json_content = fs::read_to_string(path)
        .await
        .map_err(|e| StoryError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    parse_transcript(&json_content, path)
}
