use std::{
    net::SocketAddr,
    path::PathBuf,
    time::{Duration, Instant},
};

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use storyreel_core::{StoryId, create_story, list_completed_stories};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::{
    config::{AppConfig, LoggingConfig},
    pipeline::start_pipeline,
    server::ApiState,
};

mod config;
mod pipeline;
mod server;
mod workers;

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", (secs / 60.0).floor(), secs % 60.0)
    }
}

#[derive(Parser)]
#[command(name = "storyreel", version)]
#[command(about = "Assemble generated story assets into a captioned narrated video")]
struct Cli {
    /// Config file (defaults to <config dir>/storyreel/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API and the stories directory
    Serve {
        /// Address to listen on
        #[arg(short, long)]
        listen: Option<SocketAddr>,
    },
    /// Generate a new story from a source URL
    Create { url: String },
    /// Render and join the segments of a story into final.mp4
    Build { id: String },
    /// List stories that have a final video
    List,
}

fn init_tracing(logging: &LoggingConfig, json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json || logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn fail(spinner: &ProgressBar, what: &str, err: impl std::fmt::Display) -> ! {
    spinner.finish_and_clear();
    eprintln!("{} {}: {}", style("Error:").red().bold(), what, err);
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    init_tracing(&config.logging, cli.json_logs);

    match cli.command {
        Command::Serve { listen } => {
            let handle = start_pipeline(&config, None)?;
            let state = ApiState::new(handle.pipeline.clone(), handle.generator.clone());
            let listen = listen.unwrap_or(config.server.listen);
            let result = server::serve(state, listen).await;
            handle.shutdown();
            result?;
        }

        Command::Create { url } => {
            let started = Instant::now();
            let spinner = create_spinner("Generating story...");
            let handle = start_pipeline(&config, None)?;

            let id = match create_story(
                handle.generator.as_ref(),
                &config.pipeline.stories_root,
                &url,
            )
            .await
            {
                Ok(id) => id,
                Err(e) => fail(&spinner, "Failed to create the story", e),
            };
            handle.shutdown();

            spinner.finish_with_message(format!(
                "{} Story created {}",
                style("✓").green().bold(),
                style(format!("[{}]", format_duration(started.elapsed()))).dim()
            ));
            println!("{}", id);
        }

        Command::Build { id } => {
            let id = StoryId::parse(&id)?;
            let started = Instant::now();
            let spinner = create_spinner("Preparing...");
            let handle = start_pipeline(&config, Some(spinner.clone()))?;

            let video = match handle.pipeline.build(&id).await {
                Ok(video) => video,
                Err(e) => fail(&spinner, "Video processing failed", e),
            };
            debug!(unrouted = handle.bus.metrics().unrouted(), "Build finished");
            handle.shutdown();

            spinner.finish_with_message(format!(
                "{} Video assembled: {} {}",
                style("✓").green().bold(),
                style(video.path.display()).dim(),
                style(format!("[{}]", format_duration(started.elapsed()))).dim()
            ));
            println!("{}", video.relative_path);
        }

        Command::List => {
            for id in list_completed_stories(&config.pipeline.stories_root).await? {
                println!("{}", id);
            }
        }
    }

    Ok(())
}
