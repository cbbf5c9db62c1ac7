use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::{Html, Response},
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use misty::audio::AudioProvider;
use misty::camera::Camera;
use misty::config::EngineConfig;
use misty::input::{InputHub, Orientation, ScreenMapping};
use misty::render::{DrawCommand, RenderBatch, Renderer};

use crate::message::{ClientMessage, ServerMessage};

pub type Tx = broadcast::Sender<String>;

#[derive(Clone)]
pub struct AppState {
    pub tx: Tx,
    pub input: Arc<InputHub>,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub fps: u32,
}

impl AppState {
    pub fn new(tx: Tx, input: Arc<InputHub>, config: &EngineConfig) -> Self {
        Self {
            tx,
            input,
            viewport_width: config.viewport.width,
            viewport_height: config.viewport.height,
            fps: config.fps,
        }
    }

    fn mapping(&self, screen_width: f32, screen_height: f32) -> ScreenMapping {
        ScreenMapping {
            screen_width,
            screen_height,
            viewport_width: self.viewport_width as f32,
            viewport_height: self.viewport_height as f32,
        }
    }

    /// Feeds one client message into the shared input slots.
    pub fn apply(&self, message: &ClientMessage) {
        match *message {
            ClientMessage::PointerDown {
                slot,
                x,
                y,
                screen_width,
                screen_height,
            }
            | ClientMessage::PointerMove {
                slot,
                x,
                y,
                screen_width,
                screen_height,
            } => {
                let (vx, vy) = self.mapping(screen_width, screen_height).to_viewport(x, y);
                self.input.pointer_down(slot, vx, vy);
            }
            ClientMessage::PointerUp { slot } => self.input.pointer_up(slot),
            ClientMessage::Orientation { x, y, z } => self.input.set_orientation(Orientation { x, y, z }),
        }
    }
}

/// Renderer that streams each frame to every connected client as JSON.
pub struct BroadcastRenderer {
    tx: Tx,
    frame: u64,
    camera: Option<Camera>,
    commands: Vec<DrawCommand>,
}

impl BroadcastRenderer {
    pub fn new(tx: Tx) -> Self {
        Self {
            tx,
            frame: 0,
            camera: None,
            commands: Vec::new(),
        }
    }
}

impl Renderer for BroadcastRenderer {
    fn clear_viewport(&mut self, camera: &Camera) {
        self.camera = Some(*camera);
        self.commands.clear();
    }

    fn draw(&mut self, command: &DrawCommand) {
        self.commands.push(command.clone());
    }

    fn present(&mut self) {
        let Some(camera) = self.camera else {
            return;
        };
        self.frame += 1;
        // Nobody listening is not an error
        if self.tx.receiver_count() == 0 {
            return;
        }
        let message = ServerMessage::Frame {
            batch: RenderBatch {
                frame: self.frame,
                camera,
                commands: std::mem::take(&mut self.commands),
            },
        };
        if let Some(json) = message.to_json() {
            let _ = self.tx.send(json);
        }
    }
}

/// Relays audio cues to the clients, which own the actual playback.
pub struct BroadcastAudio {
    tx: Tx,
}

impl BroadcastAudio {
    pub fn new(tx: Tx) -> Self {
        Self { tx }
    }

    fn send(&self, message: ServerMessage) {
        if let Some(json) = message.to_json() {
            let _ = self.tx.send(json);
        }
    }
}

impl AudioProvider for BroadcastAudio {
    fn play_sound(&self, id: &str) {
        self.send(ServerMessage::Sound { id: id.to_string() });
    }

    fn play_music(&self, id: &str) {
        self.send(ServerMessage::Music { id: id.to_string() });
    }

    fn stop_music(&self) {
        self.send(ServerMessage::StopMusic);
    }

    fn pause(&self) {
        log::debug!("[WS] Audio paused");
    }

    fn resume(&self) {
        log::debug!("[WS] Audio resumed");
    }
}

pub fn router(state: AppState, assets_dir: &str) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/ws", get(websocket_handler))
        .nest_service("/assets", ServeDir::new(assets_dir))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(include_str!("../client/index.html"))
}

async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = state.tx.subscribe();
    log::info!("[WS] Client connected ({} listening)", state.tx.receiver_count());

    let hello = ServerMessage::Hello {
        viewport_width: state.viewport_width,
        viewport_height: state.viewport_height,
        fps: state.fps,
    };
    if let Some(json) = hello.to_json() {
        if sender.send(Message::Text(json)).await.is_err() {
            log::warn!("[WS] Client left before the handshake");
            return;
        }
    }

    // Spawn task to forward frames and audio cues to the client
    let mut send_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(msg) => {
                    if sender.send(Message::Text(msg)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::debug!("[WS] Slow client dropped {} messages", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Spawn task to receive input from the client
    let recv_state = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            match message {
                Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(msg) => recv_state.apply(&msg),
                    Err(e) => log::warn!("[WS] Ignoring malformed message: {}", e),
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    // A vanished client cannot lift its fingers
    state.input.release_all();
    log::info!("[WS] Client disconnected");
}
