use crate::audio::AudioProvider;
use crate::camera::Camera;
use crate::collision::SpatialGrid;
use crate::input::InputSnapshot;
use crate::process::{Behavior, ObjectId, Objects, Pending, Process};
use crate::texture::AssetProvider;

/// Engine services handed to every hook call.
///
/// Reads see the committed objects only: the object being dispatched is not
/// among them, and objects started this tick appear after the commit.
pub struct Context<'a> {
    objects: &'a Objects,
    grid: &'a SpatialGrid,
    pending: &'a mut Pending,
    camera: &'a mut Camera,
    input: &'a InputSnapshot,
    audio: &'a dyn AudioProvider,
    assets: &'a dyn AssetProvider,
    frame: u64,
}

impl<'a> Context<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        objects: &'a Objects,
        grid: &'a SpatialGrid,
        pending: &'a mut Pending,
        camera: &'a mut Camera,
        input: &'a InputSnapshot,
        audio: &'a dyn AudioProvider,
        assets: &'a dyn AssetProvider,
        frame: u64,
    ) -> Self {
        Self {
            objects,
            grid,
            pending,
            camera,
            input,
            audio,
            assets,
            frame,
        }
    }

    /// Registers a new object. It takes part in the simulation from the next tick.
    pub fn start<B: Behavior + 'static>(&mut self, process: Process, behavior: B) -> ObjectId {
        self.pending.start(process, Box::new(behavior))
    }

    /// Queues removal of any object. It stays live until the end of this tick.
    pub fn finish(&mut self, id: ObjectId) {
        self.pending.finish(id);
    }

    pub fn process(&self, id: ObjectId) -> Option<&'a Process> {
        self.objects.get(id)
    }

    pub fn objects(&self) -> &'a Objects {
        self.objects
    }

    /// Objects overlapping `process` pixel-wise, filtered by kind (empty = any).
    /// Uses the grid built during the previous collision pass.
    pub fn collisions(&self, process: &Process, kinds: &[&str]) -> Vec<&'a Process> {
        let objects = self.objects;
        self.grid.query(process, kinds, |id| objects.get(id))
    }

    pub fn camera(&self) -> &Camera {
        &*self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut *self.camera
    }

    pub fn input(&self) -> &'a InputSnapshot {
        self.input
    }

    pub fn audio(&self) -> &'a dyn AudioProvider {
        self.audio
    }

    pub fn assets(&self) -> &'a dyn AssetProvider {
        self.assets
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }
}

/// Owns everything a `Context` borrows, for unit tests of hooks and alarms.
#[cfg(test)]
pub(crate) struct Harness {
    pub objects: Objects,
    pub grid: SpatialGrid,
    pub pending: Pending,
    pub camera: Camera,
    pub input: InputSnapshot,
    pub audio: crate::audio::SilentAudio,
    pub assets: crate::texture::AssetLibrary,
}

#[cfg(test)]
impl Harness {
    pub fn new() -> Self {
        Self {
            objects: Objects::default(),
            grid: SpatialGrid::new(crate::collision::DEFAULT_CELL_SIZE).unwrap(),
            pending: Pending::default(),
            camera: Camera::new(480, 320).unwrap(),
            input: InputSnapshot::default(),
            audio: crate::audio::SilentAudio,
            assets: crate::texture::AssetLibrary::new(),
        }
    }

    pub fn ctx(&mut self) -> Context<'_> {
        Context::new(
            &self.objects,
            &self.grid,
            &mut self.pending,
            &mut self.camera,
            &self.input,
            &self.audio,
            &self.assets,
            0,
        )
    }
}
