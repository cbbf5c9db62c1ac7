use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::alarm::{AlarmId, Alarms, Ring};
use crate::context::Context;
use crate::geometry::{PixelRect, Rect};
use crate::texture::{AssetProvider, Texture};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityState {
    Awake,    // Updated and rendered
    Frozen,   // Rendered, update skipped
    Sleeping, // Neither rendered nor updated
}

/// A single simulated entity. Behaviour lives in the `Behavior` attached at `start`.
#[derive(Debug)]
pub struct Process {
    pub(crate) id: ObjectId,
    pub(crate) kind: &'static str,
    state: ActivityState,
    is_dynamic: bool,
    is_collisionable: bool,
    pub visible: bool,
    pub fixed_position: bool, // Drawn relative to the camera (HUD)

    // transform
    pub x: f32,
    pub y: f32,
    pub z: i32, // Draw order only
    pub angle: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub mirror_x: bool,
    pub mirror_y: bool,

    texture: Option<Arc<Texture>>,
    width: u32,
    height: u32,

    pub(crate) alarms: Alarms,
    finished: bool,
}

impl Process {
    pub fn new(is_dynamic: bool, is_collisionable: bool) -> Self {
        Self {
            id: ObjectId(0),
            kind: "",
            state: ActivityState::Awake,
            is_dynamic,
            is_collisionable,
            visible: true,
            fixed_position: false,
            x: 0.0,
            y: 0.0,
            z: 0,
            angle: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            mirror_x: false,
            mirror_y: false,
            texture: None,
            width: 0,
            height: 0,
            alarms: Alarms::default(),
            finished: false,
        }
    }

    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn with_depth(mut self, z: i32) -> Self {
        self.z = z;
        self
    }

    pub fn with_texture(mut self, texture: Arc<Texture>) -> Self {
        self.set_texture(Some(texture));
        self
    }

    /// Zero until the object is started.
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Concrete behaviour type, used by collision type filters.
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn is_dynamic(&self) -> bool {
        self.is_dynamic
    }

    pub fn is_collisionable(&self) -> bool {
        self.is_collisionable
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    // ============================= TEXTURE =========================== \\

    pub fn set_texture(&mut self, texture: Option<Arc<Texture>>) {
        match &texture {
            Some(t) => {
                self.width = t.width();
                self.height = t.height();
            }
            None => {
                self.width = 0;
                self.height = 0;
            }
        }
        self.texture = texture;
    }

    /// Resolves `path` through the asset provider. Returns false when it is unknown,
    /// which leaves the object without a texture (not rendered, never collides).
    pub fn set_image(&mut self, assets: &dyn AssetProvider, path: &str) -> bool {
        if self.texture.as_ref().map(|t| t.path() == path).unwrap_or(false) {
            return true;
        }
        let texture = assets.texture(path);
        let found = texture.is_some();
        if !found {
            log::warn!("[PROCESS] Texture '{}' not found for object {:?}", path, self.id);
        }
        self.set_texture(texture);
        found
    }

    pub fn texture(&self) -> Option<&Arc<Texture>> {
        self.texture.as_ref()
    }

    pub fn has_image(&self) -> bool {
        self.texture.is_some()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.width as f32, self.height as f32)
    }

    pub fn has_finite_position(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub(crate) fn pixel_bounds(&self) -> PixelRect {
        PixelRect::new(self.x.floor() as i32, self.y.floor() as i32, self.width, self.height)
    }

    // ============================= GEOMETRY =========================== \\

    /// Degrees, negated atan2 of the offset to `other`.
    pub fn angle_to(&self, other: &Process) -> f32 {
        -(other.y - self.y).atan2(other.x - self.x).to_degrees()
    }

    pub fn distance_to(&self, other: &Process) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    // ============================= STATE =========================== \\

    pub fn state(&self) -> ActivityState {
        self.state
    }

    pub fn is_awake(&self) -> bool {
        self.state == ActivityState::Awake
    }

    pub fn is_frozen(&self) -> bool {
        self.state == ActivityState::Frozen
    }

    pub fn is_sleeping(&self) -> bool {
        self.state == ActivityState::Sleeping
    }

    pub fn wake_up(&mut self) {
        self.visible = true;
        self.state = ActivityState::Awake;
    }

    pub fn freeze(&mut self) {
        self.visible = true;
        self.state = ActivityState::Frozen;
    }

    pub fn sleep(&mut self) {
        self.visible = false;
        self.state = ActivityState::Sleeping;
    }

    // ============================= ALARMS =========================== \\

    pub fn set_alarm<F>(&mut self, callback: F, delay_ms: u32, repeat: bool) -> AlarmId
    where
        F: FnMut(&mut Process, &mut Context<'_>) -> Ring + Send + 'static,
    {
        self.alarms.set(Box::new(callback), delay_ms, repeat)
    }

    pub fn cancel_alarm(&mut self, id: AlarmId) -> bool {
        self.alarms.cancel(id)
    }

    pub fn has_alarm(&self, id: AlarmId) -> bool {
        self.alarms.contains(id)
    }

    pub fn alarm_count(&self) -> usize {
        self.alarms.len()
    }

    // ============================= LIFECYCLE =========================== \\

    /// Queues removal at the next commit point and drops every alarm.
    pub fn finish(&mut self, ctx: &mut Context<'_>) {
        if self.finished {
            log::debug!("[PROCESS] Object {:?} finished twice", self.id);
        }
        self.finished = true;
        self.alarms.clear();
        ctx.finish(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::AssetLibrary;

    #[test]
    fn state_transitions_drive_visibility() {
        let mut process = Process::new(true, true);
        assert!(process.is_awake() && process.visible);

        process.sleep();
        assert!(process.is_sleeping());
        assert!(!process.visible);

        process.freeze();
        assert!(process.is_frozen());
        assert!(process.visible);

        process.sleep();
        process.wake_up();
        assert!(process.is_awake());
        assert!(process.visible);
    }

    #[test]
    fn geometry_helpers() {
        let a = Process::new(true, false).at(0.0, 0.0);
        let b = Process::new(true, false).at(3.0, 4.0);
        assert_eq!(a.distance_to(&b), 5.0);

        let right = Process::new(true, false).at(10.0, 0.0);
        let above = Process::new(true, false).at(0.0, 10.0);
        assert_eq!(a.angle_to(&right), 0.0);
        assert!((a.angle_to(&above) + 90.0).abs() < 1e-4);
    }

    #[test]
    fn size_follows_texture() {
        let mut assets = AssetLibrary::new();
        assets.insert(Texture::solid("ship.png", 12, 7));

        let mut process = Process::new(true, true);
        assert!(process.set_image(&assets, "ship.png"));
        assert_eq!((process.width(), process.height()), (12, 7));

        assert!(!process.set_image(&assets, "missing.png"));
        assert!(!process.has_image());
        assert_eq!((process.width(), process.height()), (0, 0));
    }

    #[test]
    fn pixel_bounds_floor_negative_positions() {
        let process = Process::new(true, true)
            .at(-0.5, 2.9)
            .with_texture(Arc::new(Texture::solid("p.png", 4, 4)));
        assert_eq!(process.pixel_bounds(), PixelRect::new(-1, 2, 4, 4));
    }
}
