use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::{Transcript, WordTiming};

/// ffmpeg's passthrough video filter, used when there is nothing to draw
pub const PASSTHROUGH_FILTER: &str = "null";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionStyle {
    pub font_size: u32,
    pub font_color: String,
    pub border_width: u32,
    pub border_color: String,
    pub font_file: Option<PathBuf>,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            font_size: 96,
            font_color: "white".to_string(),
            border_width: 4,
            border_color: "black".to_string(),
            font_file: None,
        }
    }
}

/// Format seconds with the two-decimal precision used in filter expressions
pub fn format_seconds(seconds: f64) -> String {
    format!("{:.2}", seconds)
}

/// Build the `-vf` expression that shows each word during its own window.
///
/// Clauses follow transcript order and are joined with `,`, so later words
/// are drawn on top of earlier ones when their windows overlap.
pub fn build_caption_filter(transcript: &Transcript, style: &CaptionStyle) -> String {
    if transcript.words.is_empty() {
        return PASSTHROUGH_FILTER.to_string();
    }

    transcript
        .words
        .iter()
        .map(|word| drawtext_clause(word, style))
        .collect::<Vec<_>>()
        .join(",")
}

fn drawtext_clause(word: &WordTiming, style: &CaptionStyle) -> String {
    let mut clause = format!("drawtext=text={}", escape_drawtext_text(&word.word));
    if let Some(font_file) = &style.font_file {
        clause.push_str(&format!(
            ":fontfile={}",
            escape_filter_value(&font_file.to_string_lossy())
        ));
    }
    clause.push_str(&format!(
        ":fontcolor={}:fontsize={}:borderw={}:bordercolor={}",
        escape_filter_value(&style.font_color),
        style.font_size,
        style.border_width,
        escape_filter_value(&style.border_color),
    ));
    clause.push_str(":x=(w-text_w)/2:y=(h*3/4)-text_h");
    clause.push_str(&format!(
        ":enable=between(t\\,{}\\,{})",
        format_seconds(word.start),
        format_seconds(word.end)
    ));
    clause
}

/// Escape free text for drawtext's `text` option.
///
/// Three parsers see the value: drawtext's own `%{...}` expansion, the
/// `key=value` option parser, and the filtergraph parser.
pub fn escape_drawtext_text(text: &str) -> String {
    escape_filter_value(&escape_with(text, |c| matches!(c, '\\' | '%')))
}

/// Escape an option value for use inside a filtergraph
pub fn escape_filter_value(value: &str) -> String {
    let option_level = escape_with(value, |c| matches!(c, '\\' | '\'' | '"' | ':'));
    escape_with(&option_level, |c| {
        matches!(c, '\\' | '\'' | '[' | ']' | ',' | ';')
    })
}

fn escape_with(value: &str, needs_escape: impl Fn(char) -> bool) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if needs_escape(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
