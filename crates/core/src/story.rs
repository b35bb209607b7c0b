use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::{Result, StoryError},
    types::Segment,
};

/// Opaque story identifier: lowercase ASCII letters and digits, at least six of them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct StoryId(String);

impl StoryId {
    pub const MIN_LEN: usize = 6;

    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = |reason| StoryError::InvalidStoryId {
            id: raw.to_string(),
            reason,
        };

        if raw.len() < Self::MIN_LEN {
            return Err(invalid("must be at least 6 characters"));
        }
        if !raw
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
        {
            return Err(invalid("must contain only lowercase letters and digits"));
        }

        Ok(Self(raw.to_string()))
    }

    /// Fresh identifier for a new story
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for StoryId {
    type Err = StoryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Path conventions of one story directory.
///
/// Segment indices are 1-based everywhere except the rendered clip names,
/// which keep their zero-based `output_{i-1}.mp4` form.
#[derive(Debug, Clone)]
pub struct StoryLayout {
    id: StoryId,
    dir: PathBuf,
}

impl StoryLayout {
    pub fn new(stories_root: &Path, id: &StoryId) -> Self {
        Self {
            id: id.clone(),
            dir: stories_root.join(id.as_str()),
        }
    }

    pub fn id(&self) -> &StoryId {
        &self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn image_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}.png", index))
    }

    pub fn audio_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}.mp3", index))
    }

    pub fn transcript_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("transcription-{}.json", index))
    }

    pub fn raw_image_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("b-roll-{}.png", index))
    }

    pub fn raw_audio_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("voiceover-{}.mp3", index))
    }

    pub fn raw_transcript_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("voiceover-{}.txt", index))
    }

    pub fn clip_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("output_{}.mp4", index.saturating_sub(1)))
    }

    pub fn concat_manifest_path(&self) -> PathBuf {
        self.dir.join("concat.txt")
    }

    pub fn final_path(&self) -> PathBuf {
        self.dir.join(Self::FINAL_NAME)
    }

    /// Where the concatenator writes before the result is renamed to `final.mp4`
    pub fn partial_final_path(&self) -> PathBuf {
        self.dir.join(format!("{}.part", Self::FINAL_NAME))
    }

    /// Final artifact path relative to the stories root, as handed to callers
    pub fn final_relative(&self) -> String {
        format!("{}/{}", self.id, Self::FINAL_NAME)
    }

    pub fn segment(&self, index: usize) -> Segment {
        Segment {
            index,
            image: self.image_path(index),
            audio: self.audio_path(index),
            transcript: self.transcript_path(index),
        }
    }

    pub const FINAL_NAME: &'static str = "final.mp4";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_lowercase_alphanumeric_ids() {
        assert!(StoryId::parse("abc123").is_ok());
        assert!(StoryId::parse("lq0x9k2m1z").is_ok());
    }

    #[test]
    fn rejects_short_or_foreign_ids() {
        for raw in ["", "abc12", "ABC123", "abc-123", "../etc", "abc 123", "ab\u{e9}cdef"] {
            assert!(
                matches!(StoryId::parse(raw), Err(StoryError::InvalidStoryId { .. })),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn generated_ids_satisfy_the_pattern() {
        let id = StoryId::generate();
        assert_eq!(StoryId::parse(id.as_str()).unwrap(), id);
        assert_ne!(StoryId::generate(), id);
    }

    #[test]
    fn layout_follows_naming_conventions() {
        let id = StoryId::parse("story42").unwrap();
        let layout = StoryLayout::new(Path::new("/srv/stories"), &id);

        assert_eq!(layout.dir(), Path::new("/srv/stories/story42"));
        assert_eq!(layout.image_path(1), Path::new("/srv/stories/story42/1.png"));
        assert_eq!(layout.audio_path(2), Path::new("/srv/stories/story42/2.mp3"));
        assert_eq!(
            layout.transcript_path(3),
            Path::new("/srv/stories/story42/transcription-3.json")
        );
        assert_eq!(
            layout.raw_image_path(1),
            Path::new("/srv/stories/story42/b-roll-1.png")
        );
        assert_eq!(
            layout.raw_transcript_path(2),
            Path::new("/srv/stories/story42/voiceover-2.txt")
        );
        assert_eq!(layout.clip_path(1), Path::new("/srv/stories/story42/output_0.mp4"));
        assert_eq!(layout.clip_path(3), Path::new("/srv/stories/story42/output_2.mp4"));
        assert_eq!(layout.final_relative(), "story42/final.mp4");
        assert_eq!(
            layout.partial_final_path(),
            Path::new("/srv/stories/story42/final.mp4.part")
        );
    }
}
