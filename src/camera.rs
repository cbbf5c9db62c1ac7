use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::geometry::Rect;
use crate::process::Process;

/// The active viewport. `x`/`y` is the bottom-left corner in world units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub x: f32,
    pub y: f32,
    pub width: u32,
    pub height: u32,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Result<Self, EngineError> {
        if width == 0 || height == 0 {
            return Err(EngineError::MissingCamera { width, height });
        }
        Ok(Self {
            x: 0.0,
            y: 0.0,
            width,
            height,
        })
    }

    pub fn viewport(&self) -> Rect {
        Rect::new(self.x, self.y, self.width as f32, self.height as f32)
    }

    pub fn move_to(&mut self, x: f32, y: f32) {
        self.x = x;
        self.y = y;
    }

    /// Culling test. Fixed-position objects live in camera space.
    pub fn contains(&self, process: &Process) -> bool {
        let bounds = process.bounds();
        if process.fixed_position {
            Rect::new(0.0, 0.0, self.width as f32, self.height as f32).intersects(&bounds)
        } else {
            self.viewport().intersects(&bounds)
        }
    }
}
