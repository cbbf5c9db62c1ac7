use std::collections::BTreeSet;
use std::sync::Arc;

use crate::alarm;
use crate::audio::{AudioProvider, SilentAudio};
use crate::camera::Camera;
use crate::collision::SpatialGrid;
use crate::config::EngineConfig;
use crate::context::Context;
use crate::error::{isolate, EngineError};
use crate::input::{InputHub, InputSnapshot};
use crate::process::{Behavior, ObjectId, Process, ProcessRegistry, Slot};
use crate::render::{DepthBuckets, RenderBatch};
use crate::texture::{AssetLibrary, AssetProvider};

/// Owns every live object and advances them one fixed step at a time.
pub struct Engine {
    config: EngineConfig,
    registry: ProcessRegistry,
    grid: SpatialGrid,
    camera: Camera,
    input: Arc<InputHub>,
    audio: Arc<dyn AudioProvider>,
    assets: Arc<dyn AssetProvider>,
    frame: u64,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let grid = SpatialGrid::new(config.cell_size)?;
        let camera = Camera::new(config.viewport.width, config.viewport.height)?;
        let input = Arc::new(InputHub::new(config.pointer_slots));

        log::info!(
            "[ENGINE] {}x{} viewport at {} fps, cell size {}",
            camera.width,
            camera.height,
            config.fps,
            config.cell_size
        );

        Ok(Self {
            config,
            registry: ProcessRegistry::new(),
            grid,
            camera,
            input,
            audio: Arc::new(SilentAudio),
            assets: Arc::new(AssetLibrary::new()),
            frame: 0,
        })
    }

    pub fn with_audio(mut self, audio: Arc<dyn AudioProvider>) -> Self {
        self.audio = audio;
        self
    }

    pub fn with_assets(mut self, assets: Arc<dyn AssetProvider>) -> Self {
        self.assets = assets;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Shared with platform threads, which write pointer and sensor state into it.
    pub fn input(&self) -> Arc<InputHub> {
        self.input.clone()
    }

    pub fn audio(&self) -> Arc<dyn AudioProvider> {
        self.audio.clone()
    }

    pub fn assets(&self) -> &dyn AssetProvider {
        self.assets.as_ref()
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Number of completed steps.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn object_count(&self) -> usize {
        self.registry.len()
    }

    pub fn process(&self, id: ObjectId) -> Option<&Process> {
        self.registry.get(id)
    }

    pub fn process_mut(&mut self, id: ObjectId) -> Option<&mut Process> {
        self.registry.get_mut(id)
    }

    /// Queues a new object. It is live after the next commit.
    pub fn start<B: Behavior + 'static>(&mut self, process: Process, behavior: B) -> ObjectId {
        self.registry.start(process, Box::new(behavior))
    }

    pub fn finish(&mut self, id: ObjectId) {
        self.registry.finish(id);
    }

    /// Pixel-accurate collisions of `id` against the grid built by the last step.
    pub fn collisions(&self, id: ObjectId, kinds: &[&str]) -> Vec<ObjectId> {
        let Some(process) = self.registry.get(id) else {
            return Vec::new();
        };
        let objects = self.registry.objects();
        self.grid
            .query(process, kinds, |other| objects.get(other))
            .into_iter()
            .map(|other| other.id())
            .collect()
    }

    /// One step and the frame it produces.
    pub fn tick(&mut self, delta: f32) -> RenderBatch {
        self.step(delta);
        self.render_batch()
    }

    /// Advances the simulation by `delta` seconds: updates, collisions, commit.
    /// Hook faults are contained, so this always reaches the commit.
    pub fn step(&mut self, delta: f32) {
        self.frame += 1;
        let input = self.input.snapshot();

        let dynamic: Vec<ObjectId> = self.registry.dynamic().collect();
        for id in dynamic {
            self.with_slot(id, &input, |slot, ctx| {
                let Slot { process, behavior } = slot;
                alarm::step_alarms(process, delta, ctx);
                if process.is_awake() {
                    isolate(process.id(), "update", || behavior.update(process, ctx, delta));
                }
            });
        }

        self.rebuild_grid();

        for (id, other) in self.collision_pairs() {
            self.notify_collision(id, other, &input);
        }

        let commit = self.registry.commit();
        if !commit.added.is_empty() || !commit.removed.is_empty() {
            log::debug!(
                "[ENGINE] frame {}: +{} -{} objects ({} live)",
                self.frame,
                commit.added.len(),
                commit.removed.len(),
                self.registry.len()
            );
        }
    }

    /// Depth-ordered draw list of the visible, on-screen objects.
    pub fn render_batch(&self) -> RenderBatch {
        let mut buckets = DepthBuckets::default();

        for id in self.registry.dynamic().chain(self.registry.statics()) {
            let Some(slot) = self.registry.slot(id) else {
                continue;
            };
            let process = &slot.process;
            if !process.visible || process.is_sleeping() || !process.has_image() {
                continue;
            }
            if !self.camera.contains(process) {
                continue;
            }
            let camera = &self.camera;
            if let Some(command) = isolate(id, "render", || Ok(slot.behavior.render(process, camera))).flatten() {
                buckets.push(command);
            }
        }

        RenderBatch {
            frame: self.frame,
            camera: self.camera,
            commands: buckets.into_commands(),
        }
    }

    fn rebuild_grid(&mut self) {
        self.grid.clear();
        for id in self.registry.collisionable() {
            let Some(process) = self.registry.get(id) else {
                continue;
            };
            if !process.has_finite_position() {
                log::debug!("[ENGINE] {:?} at ({}, {}) left out of the grid", id, process.x, process.y);
                continue;
            }
            if process.visible && process.has_image() {
                self.grid.insert(process);
            }
        }
    }

    /// Overlapping pairs in both directions, ordered by receiver then other id.
    /// Both sides are queried because an object is only bucketed by its corners.
    fn collision_pairs(&self) -> BTreeSet<(ObjectId, ObjectId)> {
        let objects = self.registry.objects();
        let mut pairs = BTreeSet::new();

        for id in self.registry.collisionable() {
            let Some(process) = objects.get(id) else {
                continue;
            };
            if !process.visible || !process.has_image() {
                continue;
            }
            for other in self.grid.query(process, &[], |other| objects.get(other)) {
                pairs.insert((id, other.id()));
                pairs.insert((other.id(), id));
            }
        }

        pairs
    }

    fn notify_collision(&mut self, id: ObjectId, other: ObjectId, input: &InputSnapshot) {
        self.with_slot(id, input, |slot, ctx| {
            let Some(other) = ctx.process(other) else {
                return;
            };
            let Slot { process, behavior } = slot;
            isolate(process.id(), "on_collision", || behavior.on_collision(process, other, ctx));
        });
    }

    /// Takes the slot out of the arena so its hooks can borrow the rest of the engine,
    /// then puts it back.
    fn with_slot(&mut self, id: ObjectId, input: &InputSnapshot, call: impl FnOnce(&mut Slot, &mut Context<'_>)) {
        let Some(mut slot) = self.registry.take(id) else {
            return;
        };
        {
            let (objects, pending) = self.registry.parts_mut();
            let mut ctx = Context::new(
                objects,
                &self.grid,
                pending,
                &mut self.camera,
                input,
                self.audio.as_ref(),
                self.assets.as_ref(),
                self.frame,
            );
            call(&mut slot, &mut ctx);
        }
        self.registry.restore(slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HookResult;
    use crate::process::Inert;
    use crate::texture::Texture;
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<String>>>;

    struct Tracer {
        name: &'static str,
        log: Log,
    }

    impl Behavior for Tracer {
        fn kind(&self) -> &'static str {
            self.name
        }

        fn update(&mut self, process: &mut Process, _ctx: &mut Context<'_>, _delta: f32) -> HookResult {
            self.log.lock().unwrap().push(format!("update {}", process.id().0));
            Ok(())
        }

        fn on_collision(&mut self, process: &mut Process, other: &Process, _ctx: &mut Context<'_>) -> HookResult {
            self.log
                .lock()
                .unwrap()
                .push(format!("hit {}->{}", process.id().0, other.id().0));
            Ok(())
        }
    }

    fn engine() -> Engine {
        Engine::new(EngineConfig::default()).unwrap()
    }

    fn block(x: f32, y: f32) -> Process {
        Process::new(true, true)
            .at(x, y)
            .with_texture(Arc::new(Texture::solid("block.png", 8, 8)))
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = EngineConfig::default();
        config.cell_size = 0.0;
        assert!(matches!(Engine::new(config), Err(EngineError::InvalidCellSize(_))));
    }

    #[test]
    fn updates_run_in_id_order() {
        let log: Log = Arc::default();
        let mut engine = engine();
        for _ in 0..3 {
            engine.start(Process::new(true, false), Tracer { name: "tracer", log: log.clone() });
        }
        engine.step(0.1);
        assert!(log.lock().unwrap().is_empty());

        engine.step(0.1);
        assert_eq!(*log.lock().unwrap(), vec!["update 1", "update 2", "update 3"]);
    }

    #[test]
    fn both_sides_are_notified_lower_id_first() {
        let log: Log = Arc::default();
        let mut engine = engine();
        engine.start(block(0.0, 0.0), Tracer { name: "a", log: log.clone() });
        engine.start(block(4.0, 4.0), Tracer { name: "b", log: log.clone() });
        engine.step(0.1);
        log.lock().unwrap().clear();

        engine.step(0.1);
        let entries = log.lock().unwrap().clone();
        assert_eq!(entries, vec!["update 1", "update 2", "hit 1->2", "hit 2->1"]);
        assert_eq!(engine.collisions(ObjectId(1), &["b"]), vec![ObjectId(2)]);
        assert!(engine.collisions(ObjectId(1), &["c"]).is_empty());
    }

    #[test]
    fn mutual_overlaps_are_notified_by_receiver_then_other() {
        let log: Log = Arc::default();
        let mut engine = engine();
        for offset in [0.0, 2.0, 4.0] {
            engine.start(block(offset, offset), Tracer { name: "block", log: log.clone() });
        }
        engine.step(0.1);
        log.lock().unwrap().clear();

        engine.step(0.1);
        let hits: Vec<String> = log
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| entry.starts_with("hit"))
            .cloned()
            .collect();
        assert_eq!(
            hits,
            vec!["hit 1->2", "hit 1->3", "hit 2->1", "hit 2->3", "hit 3->1", "hit 3->2"]
        );
    }

    #[test]
    fn tick_renders_the_state_after_its_step() {
        let mut engine = engine();
        let id = engine.start(block(10.0, 10.0), Inert);
        let first = engine.tick(0.1);
        assert_eq!(first.frame, 1);
        assert_eq!(first.commands.iter().map(|c| c.object).collect::<Vec<_>>(), vec![id]);

        engine.process_mut(id).unwrap().x = 30.0;
        let batch = engine.tick(0.1);
        assert_eq!(batch.frame, 2);
        assert_eq!(batch.commands[0].x, 30.0);
    }

    #[test]
    fn sleeping_objects_are_not_drawn_and_frozen_ones_are() {
        let mut engine = engine();
        let frozen = engine.start(block(10.0, 10.0), Inert);
        let sleeping = engine.start(block(20.0, 10.0), Inert);
        engine.step(0.1);

        engine.process_mut(frozen).unwrap().freeze();
        engine.process_mut(sleeping).unwrap().sleep();
        let batch = engine.render_batch();
        let drawn: Vec<ObjectId> = batch.commands.iter().map(|c| c.object).collect();
        assert_eq!(drawn, vec![frozen]);
    }

    #[test]
    fn static_objects_render_after_dynamic_ones_at_equal_depth() {
        let mut engine = engine();
        let wall = engine.start(
            Process::new(false, false).with_texture(Arc::new(Texture::solid("wall.png", 4, 4))),
            Inert,
        );
        let ball = engine.start(block(0.0, 0.0), Inert);
        engine.step(0.1);

        let drawn: Vec<ObjectId> = engine.render_batch().commands.iter().map(|c| c.object).collect();
        assert_eq!(drawn, vec![ball, wall]);
    }
}
