use serde::{Deserialize, Serialize};

use misty::render::RenderBatch;

/// Sent by the browser client. Pointer positions are in screen pixels, y down.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum ClientMessage {
    PointerDown {
        slot: usize,
        x: f32,
        y: f32,
        screen_width: f32,
        screen_height: f32,
    },
    PointerMove {
        slot: usize,
        x: f32,
        y: f32,
        screen_width: f32,
        screen_height: f32,
    },
    PointerUp {
        slot: usize,
    },
    Orientation {
        x: f32,
        y: f32,
        z: f32,
    },
}

#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type")]
pub enum ServerMessage {
    Hello {
        viewport_width: u32,
        viewport_height: u32,
        fps: u32,
    },
    Frame {
        batch: RenderBatch,
    },
    Sound {
        id: String,
    },
    Music {
        id: String,
    },
    StopMusic,
}

impl ServerMessage {
    pub fn to_json(&self) -> Option<String> {
        match serde_json::to_string(self) {
            Ok(json) => Some(json),
            Err(e) => {
                log::error!("[WS] Failed to serialize message: {}", e);
                None
            }
        }
    }
}
