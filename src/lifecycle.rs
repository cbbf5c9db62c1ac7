use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::audio::AudioProvider;
use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::error::EngineError;
use crate::input::InputHub;
use crate::render::Renderer;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateState {
    Running,  // Simulation thread ticking
    Paused,   // Pause requested, not yet acknowledged
    Finished, // Stop requested, not yet acknowledged
    Idle,     // Simulation thread parked
    Stopped,  // Simulation thread gone
}

/// Hand-off between the host thread and the simulation thread.
///
/// The simulation thread calls `await_frame` before each frame; the host calls
/// `pause`, `resume` and `stop`. A pause only takes effect between frames.
pub struct RenderGate {
    state: Mutex<GateState>,
    changed: Condvar,
}

impl RenderGate {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState::Running),
            changed: Condvar::new(),
        }
    }

    pub fn state(&self) -> GateState {
        *self.lock()
    }

    /// Returns false once the loop must exit. Parks while paused.
    pub fn await_frame(&self) -> bool {
        let mut state = self.lock();
        loop {
            match *state {
                GateState::Running => return true,
                GateState::Paused => {
                    *state = GateState::Idle;
                    self.changed.notify_all();
                }
                GateState::Finished => {
                    *state = GateState::Stopped;
                    self.changed.notify_all();
                    return false;
                }
                GateState::Stopped => return false,
                GateState::Idle => {
                    state = self.changed.wait(state).unwrap_or_else(|poisoned| poisoned.into_inner());
                }
            }
        }
    }

    /// Blocks until the simulation thread has parked, or exited when `finishing`.
    pub fn pause(&self, finishing: bool) {
        let mut state = self.lock();
        match *state {
            GateState::Stopped => return,
            GateState::Idle if !finishing => return,
            _ => {}
        }

        *state = if finishing { GateState::Finished } else { GateState::Paused };
        self.changed.notify_all();

        while matches!(*state, GateState::Paused | GateState::Finished) {
            state = self.changed.wait(state).unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }

    pub fn resume(&self) {
        let mut state = self.lock();
        if *state == GateState::Idle {
            *state = GateState::Running;
            self.changed.notify_all();
        } else {
            log::debug!("[RUNNER] Resume ignored in state {:?}", *state);
        }
    }

    /// Requests exit after the current frame without waiting for it.
    pub fn stop(&self) {
        let mut state = self.lock();
        if *state != GateState::Stopped {
            *state = GateState::Finished;
            self.changed.notify_all();
        }
    }

    fn mark_stopped(&self) {
        *self.lock() = GateState::Stopped;
        self.changed.notify_all();
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for RenderGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-step timing: how long a frame may take and how far to catch up when it overruns.
#[derive(Clone, Copy, Debug)]
pub struct FramePacer {
    budget: Duration,
    frame_skip: bool,
    max_frames: u32,
}

impl FramePacer {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            budget: config.frame_time(),
            frame_skip: config.frame_skip.enabled,
            max_frames: config.frame_skip.max_frames,
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Extra simulation steps, without rendering, owed after a frame that took `consumed`.
    pub fn catch_up_steps(&self, consumed: Duration) -> u32 {
        if !self.frame_skip || consumed <= self.budget || self.budget.is_zero() {
            return 0;
        }
        let overrun = (consumed - self.budget).as_nanos();
        let budget = self.budget.as_nanos();
        let steps = (overrun + budget - 1) / budget;
        steps.min(self.max_frames as u128) as u32
    }

    pub fn idle_time(&self, consumed: Duration) -> Duration {
        self.budget.saturating_sub(consumed)
    }
}

/// Steps once, catches up on an overrun, then renders the latest state once.
/// Returns how long to idle before the next frame.
fn run_frame<R: Renderer>(engine: &mut Engine, renderer: &mut R, pacer: &FramePacer, delta: f32) -> Duration {
    let started = Instant::now();
    engine.step(delta);

    let consumed = started.elapsed();
    let skipped = pacer.catch_up_steps(consumed);
    if skipped > 0 {
        log::debug!(
            "[RUNNER] Frame {} took {:?}, skipping {} frames",
            engine.frame(),
            consumed,
            skipped
        );
        for _ in 0..skipped {
            engine.step(delta);
        }
    }

    engine.render_batch().replay(renderer);
    if skipped > 0 {
        Duration::ZERO
    } else {
        pacer.idle_time(started.elapsed())
    }
}

/// Parks the gate as stopped when the simulation thread leaves its loop, even by panic.
struct StopOnExit(Arc<RenderGate>);

impl Drop for StopOnExit {
    fn drop(&mut self) {
        self.0.mark_stopped();
    }
}

pub struct Runner;

impl Runner {
    /// Moves `engine` onto its own thread and drives it at the configured rate,
    /// replaying each frame into `renderer`.
    pub fn spawn<R>(mut engine: Engine, mut renderer: R) -> Result<EngineHandle, EngineError>
    where
        R: Renderer + Send + 'static,
    {
        let gate = Arc::new(RenderGate::new());
        let audio = engine.audio();
        let input = engine.input();

        let thread_gate = gate.clone();
        let thread = thread::Builder::new()
            .name("misty-simulation".to_string())
            .spawn(move || {
                let _guard = StopOnExit(thread_gate.clone());
                let pacer = FramePacer::new(engine.config());
                let delta = engine.config().frame_seconds();
                log::info!("[RUNNER] Simulation started, {:?} per frame", pacer.budget());

                while thread_gate.await_frame() {
                    let idle = run_frame(&mut engine, &mut renderer, &pacer, delta);
                    if !idle.is_zero() {
                        thread::sleep(idle);
                    }
                }

                log::info!("[RUNNER] Simulation stopped after {} frames", engine.frame());
                engine
            })?;

        Ok(EngineHandle {
            gate,
            audio,
            input,
            thread: Some(thread),
        })
    }
}

/// Host-side control of a running engine.
pub struct EngineHandle {
    gate: Arc<RenderGate>,
    audio: Arc<dyn AudioProvider>,
    input: Arc<InputHub>,
    thread: Option<JoinHandle<Engine>>,
}

impl EngineHandle {
    pub fn input(&self) -> Arc<InputHub> {
        self.input.clone()
    }

    pub fn state(&self) -> GateState {
        self.gate.state()
    }

    /// Returns once no frame is in flight. `finishing` also ends the simulation thread.
    pub fn pause(&self, finishing: bool) {
        self.audio.pause();
        self.input.release_all();
        self.gate.pause(finishing);
    }

    pub fn resume(&self) {
        self.gate.resume();
        self.audio.resume();
    }

    /// Stops the loop and hands the engine back. `None` if the simulation thread panicked.
    pub fn stop(mut self) -> Option<Engine> {
        self.audio.stop_music();
        self.gate.stop();
        let thread = self.thread.take()?;
        match thread.join() {
            Ok(engine) => Some(engine),
            Err(_) => {
                log::error!("[RUNNER] Simulation thread panicked");
                None
            }
        }
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            self.gate.stop();
            let _ = thread.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::context::Context;
    use crate::error::HookResult;
    use crate::process::{Behavior, Process};
    use crate::render::DrawCommand;
    use crate::texture::Texture;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingRenderer(Arc<AtomicUsize>);

    impl Renderer for CountingRenderer {
        fn clear_viewport(&mut self, _camera: &Camera) {}

        fn draw(&mut self, _command: &DrawCommand) {}

        fn present(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn pacer(fps: u32, enabled: bool, max_frames: u32) -> FramePacer {
        let mut config = EngineConfig::default();
        config.fps = fps;
        config.frame_skip.enabled = enabled;
        config.frame_skip.max_frames = max_frames;
        FramePacer::new(&config)
    }

    #[test]
    fn pacer_catches_up_in_whole_frames() {
        let pacer = pacer(50, true, 5);
        assert_eq!(pacer.catch_up_steps(Duration::from_millis(10)), 0);
        assert_eq!(pacer.catch_up_steps(Duration::from_millis(20)), 0);
        assert_eq!(pacer.catch_up_steps(Duration::from_millis(21)), 1);
        assert_eq!(pacer.catch_up_steps(Duration::from_millis(60)), 2);
        assert_eq!(pacer.catch_up_steps(Duration::from_secs(10)), 5);
        assert_eq!(pacer.idle_time(Duration::from_millis(5)), Duration::from_millis(15));
        assert_eq!(pacer.idle_time(Duration::from_millis(50)), Duration::ZERO);
    }

    #[test]
    fn pacer_without_frame_skip_never_catches_up() {
        assert_eq!(pacer(50, false, 5).catch_up_steps(Duration::from_secs(1)), 0);
    }

    /// Moves one pixel per update and always overruns a 1 ms frame.
    struct Slow;

    impl Behavior for Slow {
        fn update(&mut self, process: &mut Process, _ctx: &mut Context<'_>, _delta: f32) -> HookResult {
            process.x += 1.0;
            thread::sleep(Duration::from_millis(5));
            Ok(())
        }
    }

    #[derive(Default)]
    struct LastDraw {
        presents: usize,
        x: Option<f32>,
    }

    impl Renderer for LastDraw {
        fn clear_viewport(&mut self, _camera: &Camera) {}

        fn draw(&mut self, command: &DrawCommand) {
            self.x = Some(command.x);
        }

        fn present(&mut self) {
            self.presents += 1;
        }
    }

    #[test]
    fn overrun_frames_catch_up_before_rendering_once() {
        let mut config = EngineConfig::default();
        config.fps = 1000;
        config.frame_skip.max_frames = 3;
        let pacer = FramePacer::new(&config);
        let mut engine = Engine::new(config).unwrap();
        let slow = Process::new(true, false).with_texture(Arc::new(Texture::solid("slow.png", 4, 4)));
        let id = engine.start(slow, Slow);
        engine.step(0.001);

        let mut renderer = LastDraw::default();
        let idle = run_frame(&mut engine, &mut renderer, &pacer, 0.001);

        assert_eq!(engine.frame(), 5);
        assert_eq!(renderer.presents, 1);
        assert_eq!(renderer.x, Some(4.0));
        assert_eq!(engine.process(id).unwrap().x, 4.0);
        assert_eq!(idle, Duration::ZERO);
    }

    #[test]
    fn gate_pause_waits_for_the_simulation_thread() {
        let gate = Arc::new(RenderGate::new());
        let worker_gate = gate.clone();
        let frames = Arc::new(AtomicUsize::new(0));
        let worker_frames = frames.clone();
        let worker = thread::spawn(move || {
            while worker_gate.await_frame() {
                worker_frames.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(1));
            }
        });

        gate.pause(false);
        assert_eq!(gate.state(), GateState::Idle);
        let parked = frames.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(frames.load(Ordering::SeqCst), parked);

        gate.resume();
        while frames.load(Ordering::SeqCst) == parked {
            thread::sleep(Duration::from_millis(1));
        }

        gate.pause(true);
        assert_eq!(gate.state(), GateState::Stopped);
        worker.join().unwrap();
    }

    #[test]
    fn gate_ignores_resume_unless_idle_and_pause_after_stop() {
        let gate = RenderGate::new();
        gate.resume();
        assert_eq!(gate.state(), GateState::Running);

        gate.stop();
        assert_eq!(gate.state(), GateState::Finished);
        assert!(!gate.await_frame());
        assert_eq!(gate.state(), GateState::Stopped);

        gate.pause(false);
        gate.pause(true);
        assert_eq!(gate.state(), GateState::Stopped);
    }

    #[test]
    fn runner_pauses_resumes_and_returns_the_engine() {
        let mut config = EngineConfig::default();
        config.fps = 200;
        let engine = Engine::new(config).unwrap();
        let presented = Arc::new(AtomicUsize::new(0));
        let handle = Runner::spawn(engine, CountingRenderer(presented.clone())).unwrap();

        while presented.load(Ordering::SeqCst) < 3 {
            thread::sleep(Duration::from_millis(1));
        }

        handle.pause(false);
        assert_eq!(handle.state(), GateState::Idle);
        let parked = presented.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(presented.load(Ordering::SeqCst), parked);

        handle.resume();
        while presented.load(Ordering::SeqCst) == parked {
            thread::sleep(Duration::from_millis(1));
        }

        let engine = handle.stop().unwrap();
        assert!(engine.frame() as usize >= parked + 1);
    }
}
