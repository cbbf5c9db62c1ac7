use serde::Serialize;
use std::collections::BTreeMap;

use crate::camera::Camera;
use crate::process::{ObjectId, Process};

/// One textured quad, in world coordinates.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DrawCommand {
    pub object: ObjectId,
    pub texture: String,
    pub width: u32,
    pub height: u32,
    pub x: f32,
    pub y: f32,
    pub z: i32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub rotation: f32, // Degrees
    pub mirror_x: bool,
    pub mirror_y: bool,
}

impl DrawCommand {
    /// Default draw of a process: its texture at its position. Fixed-position objects
    /// are shifted by the camera so they stay put on screen.
    pub fn for_process(process: &Process, camera: &Camera) -> Option<Self> {
        let texture = process.texture()?;
        let (x, y) = if process.fixed_position {
            (process.x + camera.x, process.y + camera.y)
        } else {
            (process.x, process.y)
        };

        Some(Self {
            object: process.id(),
            texture: texture.path().to_string(),
            width: process.width(),
            height: process.height(),
            x,
            y,
            z: process.z,
            scale_x: process.scale_x,
            scale_y: process.scale_y,
            rotation: process.angle,
            mirror_x: process.mirror_x,
            mirror_y: process.mirror_y,
        })
    }
}

/// Drawing backend. Receives one batch per frame, commands in depth order.
pub trait Renderer {
    fn clear_viewport(&mut self, camera: &Camera);
    fn draw(&mut self, command: &DrawCommand);
    fn present(&mut self) {}
}

/// Everything needed to draw one frame. Owned, so it can cross threads.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RenderBatch {
    pub frame: u64,
    pub camera: Camera,
    pub commands: Vec<DrawCommand>,
}

impl RenderBatch {
    pub fn replay(&self, renderer: &mut dyn Renderer) {
        renderer.clear_viewport(&self.camera);
        for command in &self.commands {
            renderer.draw(command);
        }
        renderer.present();
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }
}

/// Groups draw commands by depth, ascending. Insertion order is kept within a depth.
#[derive(Debug, Default)]
pub struct DepthBuckets {
    buckets: BTreeMap<i32, Vec<DrawCommand>>,
}

impl DepthBuckets {
    pub fn push(&mut self, command: DrawCommand) {
        self.buckets.entry(command.z).or_default().push(command);
    }

    pub fn into_commands(self) -> Vec<DrawCommand> {
        self.buckets.into_values().flatten().collect()
    }
}
