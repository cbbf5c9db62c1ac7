//! Simulation core of a small 2D engine: fixed-step scheduling of processes,
//! per-object alarms, grid-based pixel-accurate collisions and depth-sorted
//! render batches handed to a pluggable renderer.

pub mod alarm;
pub mod animation;
pub mod audio;
pub mod camera;
pub mod collision;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod input;
pub mod lifecycle;
pub mod process;
pub mod render;
pub mod texture;

pub use engine::Engine;
pub use error::{EngineError, HookResult};
pub use lifecycle::{EngineHandle, Runner};
