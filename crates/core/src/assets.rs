use std::path::PathBuf;

use serde::Serialize;
use tokio::fs;
use tracing::{debug, warn};

use crate::{
    error::{Result, StoryError},
    story::StoryLayout,
    types::Segment,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AssetKind {
    Image,
    Audio,
    Transcript,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingAsset {
    pub segment: usize,
    pub kind: AssetKind,
    pub path: PathBuf,
}

/// Outcome of one normalization pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct NormalizationReport {
    pub renamed: Vec<PathBuf>,
    pub missing: Vec<MissingAsset>,
}

/// Rename the generation tool's raw outputs to their canonical names.
///
/// A raw file that is absent is recorded and skipped unless its canonical
/// counterpart already exists; only a failing rename aborts the pass.
pub async fn normalize_assets(
    layout: &StoryLayout,
    segment_count: usize,
) -> Result<NormalizationReport> {
    let mut report = NormalizationReport::default();

    for index in 1..=segment_count {
        let renames = [
            (
                AssetKind::Image,
                layout.raw_image_path(index),
                layout.image_path(index),
            ),
            (
                AssetKind::Audio,
                layout.raw_audio_path(index),
                layout.audio_path(index),
            ),
            (
                AssetKind::Transcript,
                layout.raw_transcript_path(index),
                layout.transcript_path(index),
            ),
        ];

        for (kind, from, to) in renames {
            if !from.exists() {
                if to.exists() {
                    debug!(path = %to.display(), "Asset already has its canonical name");
                    continue;
                }
                warn!(story_id = %layout.id(), segment = index, path = %from.display(), "File not found");
                report.missing.push(MissingAsset {
                    segment: index,
                    kind,
                    path: from,
                });
                continue;
            }

            fs::rename(&from, &to)
                .await
                .map_err(|source| StoryError::Normalization {
                    from: from.clone(),
                    to: to.clone(),
                    source,
                })?;
            debug!(from = %from.display(), to = %to.display(), "Renamed asset");
            report.renamed.push(to);
        }
    }

    Ok(report)
}

/// Canonical segments of a story, in index order
pub fn locate_segments(layout: &StoryLayout, segment_count: usize) -> Vec<Segment> {
    (1..=segment_count).map(|i| layout.segment(i)).collect()
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::story::StoryId;

    fn layout(root: &TempDir) -> StoryLayout {
        let id = StoryId::parse("abcdef1").unwrap();
        let layout = StoryLayout::new(root.path(), &id);
        std::fs::create_dir_all(layout.dir()).unwrap();
        layout
    }

    #[tokio::test]
    async fn renames_raw_outputs_and_records_missing_ones() {
        let root = TempDir::new().unwrap();
        let layout = layout(&root);
        std::fs::write(layout.raw_image_path(1), b"png").unwrap();
        std::fs::write(layout.raw_audio_path(1), b"mp3").unwrap();
        std::fs::write(layout.raw_transcript_path(1), b"{}").unwrap();
        std::fs::write(layout.raw_image_path(2), b"png").unwrap();

        let report = normalize_assets(&layout, 2).await.unwrap();

        assert_eq!(report.renamed.len(), 4);
        assert!(layout.image_path(1).exists());
        assert!(layout.audio_path(1).exists());
        assert!(layout.transcript_path(1).exists());
        assert!(layout.image_path(2).exists());
        assert!(!layout.raw_image_path(1).exists());

        let missing: Vec<_> = report.missing.iter().map(|m| (m.segment, m.kind)).collect();
        assert_eq!(
            missing,
            vec![(2, AssetKind::Audio), (2, AssetKind::Transcript)]
        );
    }

    #[tokio::test]
    async fn readiness_requires_all_three_files() {
        let root = TempDir::new().unwrap();
        let layout = layout(&root);
        std::fs::write(layout.image_path(1), b"png").unwrap();
        std::fs::write(layout.audio_path(1), b"mp3").unwrap();
        std::fs::write(layout.transcript_path(1), b"{}").unwrap();
        std::fs::write(layout.image_path(2), b"png").unwrap();
        std::fs::write(layout.transcript_path(2), b"{}").unwrap();

        let segments = locate_segments(&layout, 3);
        let ready: Vec<_> = segments.iter().map(Segment::is_render_ready).collect();
        assert_eq!(ready, vec![true, false, false]);
        assert_eq!(segments[2].index, 3);
    }

    #[tokio::test]
    async fn second_pass_is_a_no_op() {
        let root = TempDir::new().unwrap();
        let layout = layout(&root);
        std::fs::write(layout.raw_image_path(1), b"png").unwrap();

        normalize_assets(&layout, 1).await.unwrap();
        let again = normalize_assets(&layout, 1).await.unwrap();

        assert!(again.renamed.is_empty());
        assert!(layout.image_path(1).exists());
        assert!(!again.missing.iter().any(|m| m.kind == AssetKind::Image));
    }
}
