use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    assets::{locate_segments, normalize_assets},
    captions::build_caption_filter,
    config::PipelineConfig,
    error::{Result, StoryError},
    events::{Event, EventBus},
    ffmpeg::{FfmpegRunner, SegmentRender, concatenate_clips, render_segment},
    story::{StoryId, StoryLayout},
    transcript::load_transcript,
    types::{FinalVideo, RenderedClip, Segment},
    workers::{PipelineFailed, PipelineStageChanged, SegmentRendered, StoryAssembled},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipelineStage {
    Idle,
    Normalizing,
    Rendering,
    Concatenating,
    Done,
    Failed,
}

/// Assembles a story's segments into `final.mp4`.
///
/// Ready segments render concurrently; the join waits for every render to
/// finish before deciding the outcome. Assembly needs every segment, so a
/// story with missing assets fails after its ready segments were rendered.
#[derive(Clone)]
pub struct StoryPipeline {
    config: Arc<PipelineConfig>,
    runner: Arc<dyn FfmpegRunner>,
    bus: Option<Arc<EventBus>>,
}

/// Per-run bookkeeping: current stage and the event that opened the run
struct Run<'a> {
    story_id: &'a StoryId,
    stage: PipelineStage,
    root_event: Option<Uuid>,
    bus: Option<&'a EventBus>,
}

impl Run<'_> {
    fn enter(&mut self, stage: PipelineStage) {
        info!(story_id = %self.story_id, ?stage, "Pipeline stage");
        self.stage = stage;
        let event = PipelineStageChanged::new(self.root_event, self.story_id.as_str(), stage);
        if self.root_event.is_none() {
            self.root_event = Some(event.event_id());
        }
        self.publish(event);
    }

    fn publish(&self, event: impl Event) {
        if let Some(bus) = self.bus {
            bus.publish(Arc::new(event));
        }
    }

    fn fail(&mut self, err: StoryError) -> StoryError {
        error!(story_id = %self.story_id, stage = ?self.stage, error = %err, "Video processing failed");
        self.publish(PipelineFailed::new(
            self.root_event,
            self.story_id.as_str(),
            self.stage,
            err.to_string(),
        ));
        self.stage = PipelineStage::Failed;
        err
    }
}

impl StoryPipeline {
    pub fn new(config: PipelineConfig, runner: Arc<dyn FfmpegRunner>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            runner,
            bus: None,
        })
    }

    /// Publish stage, render and failure events to `bus`
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn layout(&self, id: &StoryId) -> StoryLayout {
        StoryLayout::new(&self.config.stories_root, id)
    }

    #[instrument(skip_all, fields(story_id = %id))]
    pub async fn build(&self, id: &StoryId) -> Result<FinalVideo> {
        let layout = self.layout(id);
        if !layout.dir().is_dir() {
            return Err(StoryError::StoryNotFound { id: id.to_string() });
        }

        let mut run = Run {
            story_id: id,
            stage: PipelineStage::Idle,
            root_event: None,
            bus: self.bus.as_deref(),
        };

        run.enter(PipelineStage::Normalizing);
        if let Err(e) = normalize_assets(&layout, self.config.segment_count).await {
            return Err(run.fail(e));
        }

        let (ready, missing): (Vec<Segment>, Vec<Segment>) =
            locate_segments(&layout, self.config.segment_count)
                .into_iter()
                .partition(Segment::is_render_ready);
        for segment in &missing {
            warn!(
                segment = segment.index,
                image = %segment.image.display(),
                audio = %segment.audio.display(),
                transcript = %segment.transcript.display(),
                "Missing files for video segment"
            );
        }

        run.enter(PipelineStage::Rendering);
        let clips = match self.render_all(&layout, ready, run.root_event).await {
            Ok(clips) => clips,
            Err(e) => return Err(run.fail(e)),
        };

        if !missing.is_empty() {
            let missing = missing.iter().map(|s| s.index).collect();
            return Err(run.fail(StoryError::IncompleteStory { missing }));
        }

        run.enter(PipelineStage::Concatenating);
        let video = match concatenate_clips(self.runner.as_ref(), &self.config, &layout, &clips).await
        {
            Ok(video) => video,
            Err(e) => return Err(run.fail(e)),
        };

        run.enter(PipelineStage::Done);
        run.publish(StoryAssembled::new(run.root_event, id.as_str(), video.clone()));
        info!(path = %video.relative_path, "done");
        Ok(video)
    }

    /// Render every ready segment concurrently and wait for all of them.
    ///
    /// Results are inspected in segment order once all tasks have finished,
    /// so the reported error is the lowest-indexed failing segment.
    async fn render_all(
        &self,
        layout: &StoryLayout,
        ready: Vec<Segment>,
        parent: Option<Uuid>,
    ) -> Result<Vec<RenderedClip>> {
        let handles: Vec<(usize, JoinHandle<Result<RenderedClip>>)> = ready
            .into_iter()
            .map(|segment| {
                let index = segment.index;
                let output = layout.clip_path(index);
                let story_id = layout.id().to_string();
                let pipeline = self.clone();
                let handle = tokio::spawn(async move {
                    pipeline
                        .render_one(&story_id, segment, output, parent)
                        .await
                });
                (index, handle)
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (index, handle) in handles {
            let result = handle.await.unwrap_or_else(|join_error| {
                Err(StoryError::Render {
                    segment: index,
                    reason: format!("render task aborted: {}", join_error),
                })
            });
            results.push(result);
        }

        results.into_iter().collect()
    }

    async fn render_one(
        &self,
        story_id: &str,
        segment: Segment,
        output: std::path::PathBuf,
        parent: Option<Uuid>,
    ) -> Result<RenderedClip> {
        let transcript = load_transcript(&segment.transcript).await?;
        for word in transcript.words.iter().filter(|w| !w.is_well_formed()) {
            warn!(
                segment = segment.index,
                word = %word.word,
                start = word.start,
                end = word.end,
                "Word timing window is malformed and may never be shown"
            );
        }

        let job = SegmentRender {
            segment: segment.index,
            image: segment.image,
            audio: segment.audio,
            filter: build_caption_filter(&transcript, &self.config.captions),
            duration: transcript.duration,
            output,
        };
        let clip = render_segment(self.runner.as_ref(), &self.config, &job).await?;

        if let Some(bus) = &self.bus {
            bus.publish(Arc::new(SegmentRendered::new(
                parent,
                story_id,
                clip.clone(),
                transcript.duration,
            )));
        }
        Ok(clip)
    }
}
