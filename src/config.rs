use crate::core_modules::picture::Flip;
use crate::pipeline::PipelineConfig;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Everything the binary can read from a JSON config file.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub pipeline: PipelineConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub screen_width: usize,
    pub screen_height: usize,
    /// Applied to the decoded picture before it is shown and edge-detected for
    /// the preview. Output bitmaps keep the file's row order.
    pub flip: Flip,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            screen_width: 320,
            screen_height: 240,
            flip: Flip::Vertical,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::convolution::BorderPolicy;
    use crate::core_modules::isolation_pruner::PruneNeighborhood;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("edge_vision_{}_{name}", std::process::id()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn empty_object_gives_defaults() {
        let path = write_temp("empty.json", "{}");
        let config = load_config(&path).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!((config.render.screen_width, config.render.screen_height), (320, 240));
        fs::remove_file(path).ok();
    }

    #[test]
    fn sections_override_individual_fields() {
        let path = write_temp(
            "partial.json",
            r#"{
                "pipeline": { "border_policy": "clamp_to_edge", "prune_neighborhood": "legacy" },
                "render": { "flip": "both", "screen_width": 640 }
            }"#,
        );
        let config = load_config(&path).unwrap();
        assert_eq!(config.pipeline.border_policy, BorderPolicy::ClampToEdge);
        assert_eq!(config.pipeline.prune_neighborhood, PruneNeighborhood::Legacy);
        assert_eq!(config.pipeline.strong_pixel_threshold, 42.0);
        assert_eq!(config.render.flip, Flip::Both);
        assert_eq!(config.render.screen_width, 640);
        assert_eq!(config.render.screen_height, 240);
        fs::remove_file(path).ok();
    }

    #[test]
    fn missing_and_malformed_files_are_reported() {
        let missing = std::env::temp_dir().join("edge_vision_no_such_config.json");
        assert!(matches!(load_config(&missing), Err(ConfigError::Read { .. })));

        let path = write_temp("broken.json", "{ pipeline: ");
        assert!(matches!(load_config(&path), Err(ConfigError::Parse { .. })));
        fs::remove_file(path).ok();
    }
}
