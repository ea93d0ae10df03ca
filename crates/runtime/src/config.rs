//! Engine configuration. Loaded from config.ron at startup and never written back.

use crate::EngineError;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Startup settings. Every field has a default, so a partial file is fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// World gravity, overridden per scene by `SceneSettings::gravity`.
    #[serde(default = "default_gravity")]
    pub gravity: Vec3,
    /// Upper bound for one frame's delta in seconds.
    #[serde(default = "default_max_frame_dt")]
    pub max_frame_dt: f32,
    /// Start in editor mode (pausable) instead of standalone.
    #[serde(default)]
    pub editor_mode: bool,
    /// Viewport size used for camera aspect and orthographic extents.
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,
    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,
    /// Directory Rhai scripts are resolved against.
    #[serde(default = "default_script_root")]
    pub script_root: PathBuf,
    /// Rhai operations allowed per script hook call.
    #[serde(default = "default_script_max_operations")]
    pub script_max_operations: u64,
    /// Directory of extra behavior tree `.ron` files; skipped when missing.
    #[serde(default = "default_behavior_dir")]
    pub behavior_dir: PathBuf,
    #[serde(default = "default_master_volume")]
    pub master_volume: f64,
    #[serde(default = "default_network_host")]
    pub network_host: String,
    #[serde(default = "default_network_port")]
    pub network_port: u16,
}

fn default_gravity() -> Vec3 {
    Vec3::new(0.0, -9.81, 0.0)
}
fn default_max_frame_dt() -> f32 {
    0.25
}
fn default_viewport_width() -> u32 {
    1280
}
fn default_viewport_height() -> u32 {
    720
}
fn default_script_root() -> PathBuf {
    PathBuf::from("scripts")
}
fn default_script_max_operations() -> u64 {
    100_000
}
fn default_behavior_dir() -> PathBuf {
    PathBuf::from("behaviors")
}
fn default_master_volume() -> f64 {
    0.5
}
fn default_network_host() -> String {
    network::DEFAULT_HOST.to_string()
}
fn default_network_port() -> u16 {
    network::DEFAULT_PORT
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gravity: default_gravity(),
            max_frame_dt: default_max_frame_dt(),
            editor_mode: false,
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            script_root: default_script_root(),
            script_max_operations: default_script_max_operations(),
            behavior_dir: default_behavior_dir(),
            master_volume: default_master_volume(),
            network_host: default_network_host(),
            network_port: default_network_port(),
        }
    }
}

impl EngineConfig {
    /// Load config from `config.ron` in the working directory. If the file is missing or
    /// invalid, returns default config.
    pub fn load() -> Self {
        Self::load_from(config_path())
    }

    pub fn load_from(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if let Ok(data) = std::fs::read_to_string(path) {
            match Self::parse(&data) {
                Ok(c) => {
                    log::info!("Loaded config from {:?}", path);
                    return c;
                }
                Err(e) => log::warn!("Invalid config at {:?}: {}, using defaults", path, e),
            }
        }
        Self::default()
    }

    pub fn parse(text: &str) -> Result<Self, EngineError> {
        ron::from_str(text).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Reject values the engine cannot start with.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.max_frame_dt.is_finite() && self.max_frame_dt > 0.0) {
            return Err(EngineError::Config(format!(
                "max_frame_dt must be positive, got {}",
                self.max_frame_dt
            )));
        }
        if !self.gravity.is_finite() {
            return Err(EngineError::Config("gravity must be finite".into()));
        }
        if self.viewport_width == 0 || self.viewport_height == 0 {
            return Err(EngineError::Config("viewport size must be non-zero".into()));
        }
        if self.script_max_operations == 0 {
            return Err(EngineError::Config("script_max_operations must be non-zero".into()));
        }
        Ok(())
    }

    pub fn aspect(&self) -> f32 {
        self.viewport_width as f32 / self.viewport_height.max(1) as f32
    }
}

fn config_path() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join("config.ron")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = EngineConfig::parse("(max_frame_dt: 0.1, editor_mode: true)").unwrap();
        assert_eq!(config.max_frame_dt, 0.1);
        assert!(config.editor_mode);
        assert_eq!(config.gravity, Vec3::new(0.0, -9.81, 0.0));
        assert_eq!(config.network_port, 5555);
        assert_eq!(config.master_volume, 0.5);
    }

    #[test]
    fn unreadable_or_invalid_file_falls_back_to_defaults() {
        assert_eq!(EngineConfig::load_from("/definitely/not/here.ron"), EngineConfig::default());

        let path = std::env::temp_dir().join(format!("engine_config_{}.ron", std::process::id()));
        std::fs::write(&path, "(max_frame_dt: \"fast\")").unwrap();
        assert_eq!(EngineConfig::load_from(&path), EngineConfig::default());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn validation_rejects_unusable_values() {
        assert!(EngineConfig::default().validate().is_ok());
        let config = EngineConfig {
            max_frame_dt: 0.0,
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(EngineError::Config(_))));
    }
}
