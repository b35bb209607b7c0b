use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use storyreel_core::{GenerationConfig, PipelineConfig};

const ENV_STORIES_ROOT: &str = "STORYREEL_STORIES_ROOT";
const ENV_FFMPEG: &str = "STORYREEL_FFMPEG";
const ENV_LISTEN: &str = "STORYREEL_LISTEN";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub pipeline: PipelineConfig,
    pub generation: GenerationConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load from `path`, else from the user config file if it exists, else defaults.
    /// Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path().filter(|p| p.is_file()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config
            .pipeline
            .validate()
            .context("invalid pipeline configuration")?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(root) = var(ENV_STORIES_ROOT) {
            self.pipeline.stories_root = PathBuf::from(root);
        }
        if let Some(ffmpeg) = var(ENV_FFMPEG) {
            self.pipeline.ffmpeg_path = PathBuf::from(ffmpeg);
        }
        if let Some(listen) = var(ENV_LISTEN) {
            self.server.listen = listen
                .parse()
                .with_context(|| format!("{} is not a socket address: {}", ENV_LISTEN, listen))?;
        }
        Ok(())
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("storyreel").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.server.listen.port(), 8080);
        assert_eq!(config.pipeline.stories_root, PathBuf::from("./stories"));
        assert_eq!(config.generation.timeout_ms, 120_000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn file_values_merge_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[server]
listen = "127.0.0.1:9000"

[pipeline]
segment_count = 4

[pipeline.captions]
font_size = 72
"#,
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.server.listen, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.pipeline.segment_count, 4);
        assert_eq!(config.pipeline.captions.font_size, 72);
        assert_eq!(config.pipeline.captions.border_width, 4);
        assert_eq!(config.generation.gptscript_path, PathBuf::from("gptscript"));
    }

    #[test]
    fn environment_overrides_win() {
        let vars: HashMap<&str, &str> = [
            (ENV_STORIES_ROOT, "/srv/stories"),
            (ENV_FFMPEG, "/opt/ffmpeg/bin/ffmpeg"),
            (ENV_LISTEN, "127.0.0.1:3000"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.pipeline.stories_root, PathBuf::from("/srv/stories"));
        assert_eq!(
            config.pipeline.ffmpeg_path,
            PathBuf::from("/opt/ffmpeg/bin/ffmpeg")
        );
        assert_eq!(config.server.listen.port(), 3000);
    }

    #[test]
    fn bad_listen_address_is_rejected() {
        let mut config = AppConfig::default();
        let result = config.apply_overrides(|key| (key == ENV_LISTEN).then(|| "nowhere".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn invalid_pipeline_values_fail_to_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[pipeline]\nsegment_count = 0\n").unwrap();
        assert!(AppConfig::load(Some(&path)).is_err());
    }
}
