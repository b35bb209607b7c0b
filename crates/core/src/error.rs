use std::{path::PathBuf, time::Duration};

use thiserror::Error;

/// Coarse status class an error maps to at the transport boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Client,
    Server,
}

#[derive(Error, Debug)]
pub enum StoryError {
    #[error("Invalid story id {id:?}: {reason}")]
    InvalidStoryId { id: String, reason: &'static str },

    #[error("Story {id} does not exist")]
    StoryNotFound { id: String },

    #[error("Renaming {from} to {to} failed: {source}")]
    Normalization {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Transcript {path} could not be parsed: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Rendering segment {segment} failed: {reason}")]
    Render { segment: usize, reason: String },

    #[error("Concatenation into {output} failed: {reason}")]
    Concatenation { output: PathBuf, reason: String },

    #[error("Story generation failed for {url}: {reason}")]
    Generation { url: String, reason: String },

    #[error("Story is missing assets for segments {missing:?}")]
    IncompleteStory { missing: Vec<usize> },

    #[error("{process} did not finish within {timeout:?}")]
    Timeout {
        process: &'static str,
        timeout: Duration,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl StoryError {
    pub fn class(&self) -> ErrorClass {
        match self {
            StoryError::InvalidStoryId { .. } | StoryError::StoryNotFound { .. } => {
                ErrorClass::Client
            }
            _ => ErrorClass::Server,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoryError>;
