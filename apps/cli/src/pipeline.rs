use std::sync::Arc;

use anyhow::Context;
use indicatif::ProgressBar;
use storyreel_core::{
    GptScriptGenerator, StoryPipeline, SystemFfmpegRunner,
    events::{BusConfig, EventBus, EventBusBuilder},
    workers::Worker,
};
use tokio::sync::broadcast;
use tracing::debug;

use crate::{
    config::AppConfig,
    workers::{build_progress::BuildProgressWorker, event_log::EventLogWorker},
};

pub struct PipelineHandle {
    pub pipeline: StoryPipeline,
    pub generator: Arc<GptScriptGenerator>,
    pub bus: Arc<EventBus>,
    pub shutdown_tx: broadcast::Sender<()>,
}

impl PipelineHandle {
    /// Stop the event workers; events published afterwards are dropped
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Wire the event bus and its workers, then hand out the pipeline and generator
/// publishing into it. `progress` adds the CLI spinner worker.
pub fn start_pipeline(
    config: &AppConfig,
    progress: Option<ProgressBar>,
) -> anyhow::Result<PipelineHandle> {
    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);

    let mut builder =
        EventBusBuilder::new(BusConfig::default()).subscribe(EventLogWorker::subscription());
    if progress.is_some() {
        builder = builder.subscribe(BuildProgressWorker::subscription());
    }

    let (bus, mut wiring, tasks) = builder.build()?;
    let bus = Arc::new(bus);
    debug!(session_id = %bus.session_id(), "Event bus is ready");

    // isolated drain tasks must run before anything publishes
    for t in tasks.tokio {
        tokio::spawn(t);
    }

    tokio::spawn(EventLogWorker::default().run(
        wiring
            .take(EventLogWorker::SUBSCRIBER_ID)
            .context("event log worker was not wired")?,
        Arc::clone(&bus),
        shutdown_rx.resubscribe(),
    ));

    if let Some(progress) = progress {
        let worker = BuildProgressWorker::new(progress, config.pipeline.segment_count);
        tokio::spawn(worker.run(
            wiring
                .take(BuildProgressWorker::SUBSCRIBER_ID)
                .context("build progress worker was not wired")?,
            Arc::clone(&bus),
            shutdown_rx.resubscribe(),
        ));
    }

    let runner = Arc::new(SystemFfmpegRunner::from_config(&config.pipeline));
    let pipeline =
        StoryPipeline::new(config.pipeline.clone(), runner)?.with_event_bus(Arc::clone(&bus));
    let generator = Arc::new(
        GptScriptGenerator::new(config.generation.clone()).with_event_bus(Arc::clone(&bus)),
    );

    Ok(PipelineHandle {
        pipeline,
        generator,
        bus,
        shutdown_tx,
    })
}
