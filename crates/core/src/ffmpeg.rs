use std::{
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use async_trait::async_trait;
use thiserror::Error;
use tokio::{fs, process::Command};
use tracing::{debug, info, instrument};

use crate::{
    config::PipelineConfig,
    error::{Result, StoryError},
    story::StoryLayout,
    types::{FinalVideo, RenderedClip},
};

/// Lines of ffmpeg stderr kept when a run fails
const STDERR_TAIL_LINES: usize = 12;

/// yuv420p needs even frame dimensions; odd-sized images are cropped by at most one pixel
pub const EVEN_DIMENSIONS_FILTER: &str = "scale=trunc(iw/2)*2:trunc(ih/2)*2";

#[derive(Error, Debug)]
pub enum FfmpegFailure {
    #[error("failed to start {binary}: {source}")]
    Spawn {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("exited with code {code:?}: {stderr}")]
    Exit { code: Option<i32>, stderr: String },

    #[error("timed out after {0:?}")]
    TimedOut(Duration),
}

/// Arguments and time budget of one ffmpeg invocation
#[derive(Debug, Clone, PartialEq)]
pub struct FfmpegCommand {
    pub args: Vec<OsString>,
    pub timeout: Duration,
}

impl FfmpegCommand {
    pub fn new(timeout: Duration) -> Self {
        Self {
            args: Vec::new(),
            timeout,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Last argument, which ffmpeg treats as the output file
    pub fn output(&self) -> Option<&OsStr> {
        self.args.last().map(OsString::as_os_str)
    }
}

#[async_trait]
pub trait FfmpegRunner: Send + Sync {
    async fn run(&self, command: &FfmpegCommand) -> std::result::Result<(), FfmpegFailure>;
}

/// Runs the ffmpeg binary named in the pipeline configuration
#[derive(Debug, Clone)]
pub struct SystemFfmpegRunner {
    binary: PathBuf,
}

impl SystemFfmpegRunner {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(&config.ffmpeg_path)
    }
}

#[async_trait]
impl FfmpegRunner for SystemFfmpegRunner {
    async fn run(&self, command: &FfmpegCommand) -> std::result::Result<(), FfmpegFailure> {
        debug!(binary = %self.binary.display(), args = ?command.args, "Running ffmpeg");

        let mut process = Command::new(&self.binary);
        process
            .args(&command.args)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(command.timeout, process.output()).await {
            Ok(output) => output.map_err(|source| FfmpegFailure::Spawn {
                binary: self.binary.clone(),
                source,
            })?,
            Err(_) => return Err(FfmpegFailure::TimedOut(command.timeout)),
        };

        if !output.status.success() {
            return Err(FfmpegFailure::Exit {
                code: output.status.code(),
                stderr: stderr_tail(&output.stderr),
            });
        }

        Ok(())
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

/// Inputs for rendering one captioned clip
#[derive(Debug, Clone)]
pub struct SegmentRender {
    pub segment: usize,
    pub image: PathBuf,
    pub audio: PathBuf,
    pub filter: String,
    /// Seconds, two-decimal precision
    pub duration: f64,
    pub output: PathBuf,
}

/// Loop the still image for `duration` seconds, copy the voiceover untouched,
/// draw captions, and hard-cut the output at `duration`.
pub fn render_command(config: &PipelineConfig, job: &SegmentRender) -> FfmpegCommand {
    let duration = format!("{:.2}", job.duration);
    FfmpegCommand::new(config.render_timeout())
        .arg("-y")
        .arg("-loop")
        .arg("1")
        .arg("-t")
        .arg(&duration)
        .arg("-i")
        .arg(&job.image)
        .arg("-i")
        .arg(&job.audio)
        .arg("-map")
        .arg("0:v:0")
        .arg("-map")
        .arg("1:a:0")
        .arg("-vf")
        .arg(format!("{},{}", EVEN_DIMENSIONS_FILTER, job.filter))
        .arg("-c:v")
        .arg(&config.video_codec)
        .arg("-pix_fmt")
        .arg("yuv420p")
        .arg("-c:a")
        .arg("copy")
        .arg("-t")
        .arg(&duration)
        .arg(&job.output)
}

/// Concat-demuxer manifest; entries are file names relative to the manifest's directory
pub fn concat_manifest(clips: &[RenderedClip]) -> String {
    clips
        .iter()
        .map(|clip| {
            let name = clip
                .path
                .file_name()
                .map(|n| n.to_string_lossy())
                .unwrap_or_else(|| clip.path.to_string_lossy());
            format!("file '{}'\n", name.replace('\'', "'\\''"))
        })
        .collect()
}

/// Stream-copy join of clips listed in `manifest`.
///
/// The container is named explicitly since `output` may carry a temporary extension.
pub fn concat_command(config: &PipelineConfig, manifest: &Path, output: &Path) -> FfmpegCommand {
    FfmpegCommand::new(config.concat_timeout())
        .arg("-y")
        .arg("-f")
        .arg("concat")
        .arg("-safe")
        .arg("0")
        .arg("-i")
        .arg(manifest)
        .arg("-c")
        .arg("copy")
        .arg("-f")
        .arg("mp4")
        .arg(output)
}

#[instrument(skip_all, fields(segment = job.segment, output = %job.output.display()))]
pub async fn render_segment(
    runner: &dyn FfmpegRunner,
    config: &PipelineConfig,
    job: &SegmentRender,
) -> Result<RenderedClip> {
    info!(image = %job.image.display(), audio = %job.audio.display(), "Processing segment");

    runner
        .run(&render_command(config, job))
        .await
        .map_err(|failure| match failure {
            FfmpegFailure::TimedOut(timeout) => StoryError::Timeout {
                process: "ffmpeg render",
                timeout,
            },
            other => StoryError::Render {
                segment: job.segment,
                reason: other.to_string(),
            },
        })?;

    info!("Segment clip is complete");
    Ok(RenderedClip {
        segment: job.segment,
        path: job.output.clone(),
    })
}

/// Join `clips` in segment order into the story's final video.
///
/// Every clip must exist. ffmpeg writes to `final.mp4.part`, which is renamed to
/// `final.mp4` only once the join succeeded; a failed or interrupted join leaves
/// any earlier `final.mp4` untouched.
#[instrument(skip_all, fields(story_id = %layout.id()))]
pub async fn concatenate_clips(
    runner: &dyn FfmpegRunner,
    config: &PipelineConfig,
    layout: &StoryLayout,
    clips: &[RenderedClip],
) -> Result<FinalVideo> {
    let output = layout.final_path();
    let concat_error = |reason: String| StoryError::Concatenation {
        output: output.clone(),
        reason,
    };

    if clips.is_empty() {
        return Err(concat_error("no clips to join".to_string()));
    }

    let mut ordered = clips.to_vec();
    ordered.sort_by_key(|clip| clip.segment);
    if let Some(missing) = ordered.iter().find(|clip| !clip.path.exists()) {
        return Err(concat_error(format!(
            "clip for segment {} is missing",
            missing.segment
        )));
    }

    let manifest = layout.concat_manifest_path();
    fs::write(&manifest, concat_manifest(&ordered)).await?;
    info!(clips = ordered.len(), "Merging videos together");

    let partial = layout.partial_final_path();
    runner
        .run(&concat_command(config, &manifest, &partial))
        .await
        .map_err(|failure| match failure {
            FfmpegFailure::TimedOut(timeout) => StoryError::Timeout {
                process: "ffmpeg concat",
                timeout,
            },
            other => concat_error(other.to_string()),
        })?;

    fs::rename(&partial, &output)
        .await
        .map_err(|e| {
            concat_error(format!(
                "failed to move {} into place: {}",
                partial.display(),
                e
            ))
        })?;

    Ok(FinalVideo {
        path: output,
        relative_path: layout.final_relative(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(command: &FfmpegCommand) -> Vec<String> {
        command
            .args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    fn job() -> SegmentRender {
        SegmentRender {
            segment: 2,
            image: PathBuf::from("/s/abcdef/2.png"),
            audio: PathBuf::from("/s/abcdef/2.mp3"),
            filter: "null".to_string(),
            duration: 3.456,
            output: PathBuf::from("/s/abcdef/output_1.mp4"),
        }
    }

    #[test]
    fn render_copies_audio_and_bounds_duration() {
        let command = render_command(&PipelineConfig::default(), &job());
        let args = args(&command);

        let image_at = args.iter().position(|a| a == "/s/abcdef/2.png").unwrap();
        assert_eq!(&args[image_at - 5..image_at], ["-loop", "1", "-t", "3.46", "-i"]);
        assert!(args.windows(2).any(|w| w == ["-c:a", "copy"]));
        assert!(
            args.windows(2)
                .any(|w| w == ["-vf", "scale=trunc(iw/2)*2:trunc(ih/2)*2,null"])
        );
        assert_eq!(args[args.len() - 3..], ["-t", "3.46", "/s/abcdef/output_1.mp4"]);
        assert_eq!(command.timeout, Duration::from_secs(600));
        assert_eq!(command.output(), Some(OsStr::new("/s/abcdef/output_1.mp4")));
    }

    #[test]
    fn manifest_lists_clips_by_name_and_escapes_quotes() {
        let clips = vec![
            RenderedClip {
                segment: 1,
                path: PathBuf::from("/s/abcdef/output_0.mp4"),
            },
            RenderedClip {
                segment: 2,
                path: PathBuf::from("/s/abcdef/it's.mp4"),
            },
        ];
        assert_eq!(
            concat_manifest(&clips),
            "file 'output_0.mp4'\nfile 'it'\\''s.mp4'\n"
        );
    }

    #[test]
    fn concat_uses_stream_copy() {
        let command = concat_command(
            &PipelineConfig::default(),
            Path::new("/s/abcdef/concat.txt"),
            Path::new("/s/abcdef/final.mp4.part"),
        );
        assert_eq!(
            args(&command),
            [
                "-y",
                "-f",
                "concat",
                "-safe",
                "0",
                "-i",
                "/s/abcdef/concat.txt",
                "-c",
                "copy",
                "-f",
                "mp4",
                "/s/abcdef/final.mp4.part"
            ]
        );
    }

    #[test]
    fn stderr_tail_keeps_the_last_lines() {
        let stderr: String = (0..20).map(|i| format!("line {i}\n")).collect();
        let tail = stderr_tail(stderr.as_bytes());
        assert!(tail.starts_with("line 8"));
        assert!(tail.ends_with("line 19"));
    }

    #[tokio::test]
    async fn hung_process_is_killed_at_the_timeout() {
        let runner = SystemFfmpegRunner::new("sleep");
        let command = FfmpegCommand::new(Duration::from_millis(50)).arg("5");

        let started = std::time::Instant::now();
        let err = runner.run(&command).await.unwrap_err();

        assert!(matches!(err, FfmpegFailure::TimedOut(t) if t == Duration::from_millis(50)));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_failure() {
        let runner = SystemFfmpegRunner::new("/nonexistent/ffmpeg-binary");
        let command = FfmpegCommand::new(Duration::from_secs(5)).arg("-version");
        let err = runner.run(&command).await.unwrap_err();
        assert!(matches!(err, FfmpegFailure::Spawn { .. }));
    }
}
