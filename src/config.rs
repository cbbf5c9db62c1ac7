use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

use crate::error::EngineError;
use crate::input::MAX_POINTERS;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub width: u32,  // Visible world units horizontally
    pub height: u32, // Visible world units vertically
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: 480,
            height: 320,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FrameSkipConfig {
    pub enabled: bool,
    pub max_frames: u32, // Extra simulation steps allowed per rendered frame
}

impl Default for FrameSkipConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_frames: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub assets_dir: String, // Served under /assets for the web client
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
            assets_dir: "assets".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    pub fps: u32,
    pub cell_size: f32,
    pub pointer_slots: usize,
    pub viewport: ViewportConfig,
    pub frame_skip: FrameSkipConfig,
    pub server: ServerConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            cell_size: crate::collision::DEFAULT_CELL_SIZE,
            pointer_slots: 5,
            viewport: ViewportConfig::default(),
            frame_skip: FrameSkipConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn load(path: &str) -> Result<Self, EngineError> {
        let content = fs::read_to_string(path)?;
        let config: EngineConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<(), EngineError> {
        let content = toml::to_string(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.fps == 0 {
            return Err(EngineError::InvalidFrameRate(self.fps));
        }
        if !self.cell_size.is_finite() || self.cell_size <= 0.0 {
            return Err(EngineError::InvalidCellSize(self.cell_size));
        }
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(EngineError::MissingCamera {
                width: self.viewport.width,
                height: self.viewport.height,
            });
        }
        if self.pointer_slots == 0 || self.pointer_slots > MAX_POINTERS {
            return Err(EngineError::InvalidPointerSlots {
                got: self.pointer_slots,
                max: MAX_POINTERS,
            });
        }
        Ok(())
    }

    /// Fixed simulation step, also the real-time budget of one frame.
    pub fn frame_time(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / self.fps.max(1) as u64)
    }

    pub fn frame_seconds(&self) -> f32 {
        self.frame_time().as_secs_f32()
    }
}
