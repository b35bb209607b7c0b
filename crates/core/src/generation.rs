use std::{
    path::{Path, PathBuf},
    process::Stdio,
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::{
    fs,
    io::{AsyncBufReadExt, AsyncReadExt, BufReader},
    process::Command,
};
use tracing::{debug, info, instrument};

use crate::{
    error::{Result, StoryError},
    events::EventBus,
    story::{StoryId, StoryLayout},
    workers::GenerationOutput,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub gptscript_path: PathBuf,
    /// Script that writes the raw story assets into `--dir`
    pub script_path: PathBuf,
    pub timeout_ms: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            gptscript_path: PathBuf::from("gptscript"),
            script_path: PathBuf::from("./story.gpt"),
            timeout_ms: 120_000,
        }
    }
}

impl GenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub story_id: StoryId,
    pub source_url: String,
    pub output_dir: PathBuf,
    pub timeout: Duration,
}

/// Produces the raw assets of a story (`b-roll-{i}.png`, `voiceover-{i}.mp3`,
/// `voiceover-{i}.txt`) inside the request's output directory.
#[async_trait]
pub trait StoryGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<()>;

    fn timeout(&self) -> Duration;
}

/// Runs a gptscript story script as a child process
pub struct GptScriptGenerator {
    config: GenerationConfig,
    bus: Option<Arc<EventBus>>,
}

impl GptScriptGenerator {
    pub fn new(config: GenerationConfig) -> Self {
        Self { config, bus: None }
    }

    /// Report each line the script prints as a `GenerationOutput` event
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn command_args(&self, request: &GenerationRequest) -> Vec<String> {
        vec![
            "--disable-cache".to_string(),
            self.config.script_path.to_string_lossy().into_owned(),
            "--url".to_string(),
            request.source_url.clone(),
            "--dir".to_string(),
            request.output_dir.to_string_lossy().into_owned(),
        ]
    }

    async fn run_script(&self, request: &GenerationRequest) -> Result<()> {
        let failed = |reason: String| StoryError::Generation {
            url: request.source_url.clone(),
            reason,
        };

        let mut child = Command::new(&self.config.gptscript_path)
            .args(self.command_args(request))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                failed(format!(
                    "failed to start {}: {}",
                    self.config.gptscript_path.display(),
                    e
                ))
            })?;

        let stdout = child.stdout.take();
        let mut stderr = child.stderr.take();

        let stdout_task = async {
            let Some(stdout) = stdout else { return };
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if line.trim().is_empty() {
                    continue;
                }
                debug!(story_id = %request.story_id, output = %line, "gptscript");
                if let Some(bus) = &self.bus {
                    bus.publish(Arc::new(GenerationOutput::new(
                        request.story_id.as_str(),
                        line,
                    )));
                }
            }
        };

        let stderr_task = async {
            let mut text = String::new();
            if let Some(stderr) = stderr.as_mut() {
                if let Err(e) = stderr.read_to_string(&mut text).await {
                    debug!(error = %e, "Failed to read gptscript stderr");
                }
            }
            text
        };

        let (_, stderr_text, status) = tokio::join!(stdout_task, stderr_task, child.wait());
        let status = status?;

        if !status.success() {
            let tail = stderr_text
                .lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .unwrap_or("")
                .to_string();
            return Err(failed(format!("exit status {}: {}", status, tail)));
        }
        Ok(())
    }
}

#[async_trait]
impl StoryGenerator for GptScriptGenerator {
    #[instrument(skip_all, fields(story_id = %request.story_id, url = %request.source_url))]
    async fn generate(&self, request: &GenerationRequest) -> Result<()> {
        match tokio::time::timeout(request.timeout, self.run_script(request)).await {
            Ok(result) => result,
            Err(_) => Err(StoryError::Timeout {
                process: "gptscript",
                timeout: request.timeout,
            }),
        }
    }

    fn timeout(&self) -> Duration {
        self.config.timeout()
    }
}

/// Allocate a new story directory under `stories_root` and fill it from `source_url`.
///
/// The directory is left in place when generation fails.
pub async fn create_story(
    generator: &dyn StoryGenerator,
    stories_root: &Path,
    source_url: &str,
) -> Result<StoryId> {
    let story_id = StoryId::generate();
    let layout = StoryLayout::new(stories_root, &story_id);
    fs::create_dir_all(layout.dir()).await?;
    info!(story_id = %story_id, url = source_url, "Creating story");

    let request = GenerationRequest {
        story_id: story_id.clone(),
        source_url: source_url.to_string(),
        output_dir: layout.dir().to_path_buf(),
        timeout: generator.timeout(),
    };
    generator.generate(&request).await?;

    info!(story_id = %story_id, "Story assets generated");
    Ok(story_id)
}
