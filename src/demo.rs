use rand::Rng;

use misty::alarm::Ring;
use misty::animation::Animation;
use misty::context::Context;
use misty::error::HookResult;
use misty::process::{Behavior, Process};
use misty::texture::{AlphaMask, AssetLibrary, AssetProvider, Texture};
use misty::Engine;

const BALL: &str = "ball.png";
const BALL_LIT: &str = "ball_lit.png";
const BLOCK: &str = "block.png";
const SPARK: &str = "spark.png";
const MARKER: &str = "marker.png";

fn disc(path: &str, size: u32) -> Texture {
    let radius = size as f32 / 2.0;
    let mask = AlphaMask::from_fn(size, size, |x, y| {
        let dx = x as f32 + 0.5 - radius;
        let dy = y as f32 + 0.5 - radius;
        dx * dx + dy * dy <= radius * radius
    });
    Texture::new(path, mask)
}

fn cross(path: &str, size: u32) -> Texture {
    let third = size / 3;
    let mask = AlphaMask::from_fn(size, size, |x, y| {
        (third..size - third).contains(&x) || (third..size - third).contains(&y)
    });
    Texture::new(path, mask)
}

/// Procedural sprites for the demo scene. The client draws them from the same names.
pub fn assets() -> AssetLibrary {
    let mut assets = AssetLibrary::new();
    assets.insert(disc(BALL, 16));
    assets.insert(disc(BALL_LIT, 16));
    assets.insert(Texture::solid(BLOCK, 48, 16));
    assets.insert(disc(SPARK, 4));
    assets.insert(cross(MARKER, 15));
    assets
}

/// Bounces around the viewport, off blocks and off other balls.
pub struct Ball {
    vx: f32,
    vy: f32,
    last_move: (f32, f32),
    glow: Animation,
}

impl Ball {
    pub fn new(vx: f32, vy: f32) -> Self {
        let mut glow = Animation::new(0.15, [BALL_LIT, BALL]).once();
        glow.frame(1.0);
        Self {
            vx,
            vy,
            last_move: (0.0, 0.0),
            glow,
        }
    }
}

impl Behavior for Ball {
    fn kind(&self) -> &'static str {
        "ball"
    }

    fn update(&mut self, process: &mut Process, ctx: &mut Context<'_>, delta: f32) -> HookResult {
        let (dx, dy) = (self.vx * delta, self.vy * delta);
        process.x += dx;
        process.y += dy;
        self.last_move = (dx, dy);

        let max_x = ctx.camera().width as f32 - process.width() as f32;
        let max_y = ctx.camera().height as f32 - process.height() as f32;
        if process.x < 0.0 || process.x > max_x {
            self.vx = -self.vx;
            process.x = process.x.clamp(0.0, max_x);
        }
        if process.y < 0.0 || process.y > max_y {
            self.vy = -self.vy;
            process.y = process.y.clamp(0.0, max_y);
        }

        let frame = self.glow.frame(delta);
        if !process.set_image(ctx.assets(), frame) {
            return Err(format!("missing ball frame {}", frame).into());
        }

        // Balls that somehow ended up inside a block get pushed out upwards
        if !ctx.collisions(process, &["block"]).is_empty() {
            process.y += 1.0;
        }
        Ok(())
    }

    fn on_collision(&mut self, process: &mut Process, other: &Process, ctx: &mut Context<'_>) -> HookResult {
        process.x -= self.last_move.0;
        process.y -= self.last_move.1;

        let (cx, cy) = centre(process);
        let (ox, oy) = centre(other);
        if (cx - ox).abs() * other.height() as f32 > (cy - oy).abs() * other.width() as f32 {
            self.vx = (cx - ox).signum() * self.vx.abs();
        } else {
            self.vy = (cy - oy).signum() * self.vy.abs();
        }

        self.glow.reset();
        if other.kind() == "block" {
            ctx.audio().play_sound("bounce");
        }
        Ok(())
    }
}

fn centre(process: &Process) -> (f32, f32) {
    (
        process.x + process.width() as f32 / 2.0,
        process.y + process.height() as f32 / 2.0,
    )
}

/// Static obstacle.
pub struct Block;

impl Behavior for Block {
    fn kind(&self) -> &'static str {
        "block"
    }
}

/// Drifts upwards and shrinks. Removed by the alarm set in `spark`.
pub struct Spark {
    vx: f32,
    vy: f32,
}

impl Behavior for Spark {
    fn kind(&self) -> &'static str {
        "spark"
    }

    fn update(&mut self, process: &mut Process, _ctx: &mut Context<'_>, delta: f32) -> HookResult {
        process.x += self.vx * delta;
        process.y += self.vy * delta;
        process.scale_x = (process.scale_x - delta).max(0.2);
        process.scale_y = process.scale_x;
        Ok(())
    }
}

pub const SPARK_LIFETIME_MS: u32 = 600;

pub fn spark(assets: &dyn AssetProvider, x: f32, y: f32) -> (Process, Spark) {
    let mut rng = rand::thread_rng();
    let mut process = Process::new(true, false).at(x, y).with_depth(2);
    process.set_image(assets, SPARK);
    process.set_alarm(
        |owner, ctx| {
            owner.finish(ctx);
            Ring::Stop
        },
        SPARK_LIFETIME_MS,
        false,
    );
    let behavior = Spark {
        vx: rng.gen_range(-40.0..40.0),
        vy: rng.gen_range(20.0..80.0),
    };
    (process, behavior)
}

/// Turns pointer presses into sparks. Presses on the HUD marker only click.
#[derive(Default)]
pub struct Spawner {
    music_started: bool,
}

impl Spawner {
    pub fn new() -> Self {
        Self { music_started: false }
    }
}

impl Behavior for Spawner {
    fn kind(&self) -> &'static str {
        "spawner"
    }

    fn update(&mut self, _process: &mut Process, ctx: &mut Context<'_>, _delta: f32) -> HookResult {
        if !self.music_started {
            ctx.audio().play_music("theme");
            self.music_started = true;
        }
        // one burst every third frame
        if ctx.frame() % 3 != 0 {
            return Ok(());
        }

        let input = ctx.input();
        let height = ctx.camera().height as f32;
        if input.is_pressed(0.0, 32.0, height - 32.0, height) {
            ctx.audio().play_sound("click");
            return Ok(());
        }

        let (camera_x, camera_y) = (ctx.camera().x, ctx.camera().y);
        for pointer in input.pressed() {
            let (process, behavior) = spark(ctx.assets(), pointer.x + camera_x, pointer.y + camera_y);
            ctx.start(process, behavior);
        }
        Ok(())
    }
}

/// HUD marker that alternates between spinning and holding still.
pub struct Marker;

impl Behavior for Marker {
    fn kind(&self) -> &'static str {
        "marker"
    }

    fn update(&mut self, process: &mut Process, _ctx: &mut Context<'_>, delta: f32) -> HookResult {
        process.angle = (process.angle + 180.0 * delta) % 360.0;
        Ok(())
    }
}

pub fn marker(assets: &dyn AssetProvider, viewport_height: f32) -> Process {
    let mut process = Process::new(true, false).at(8.0, viewport_height - 24.0).with_depth(10);
    process.fixed_position = true;
    process.set_image(assets, MARKER);
    process.set_alarm(
        |owner, _| {
            if owner.is_frozen() {
                owner.wake_up();
            } else {
                owner.freeze();
            }
            Ring::Again
        },
        500,
        true,
    );
    process
}

/// Fills `engine` with the demo scene. Objects go live on the first step.
pub fn populate(engine: &mut Engine) {
    let mut rng = rand::thread_rng();
    let width = engine.camera().width as f32;
    let height = engine.camera().height as f32;

    for i in 0..4 {
        let x = width * (i as f32 + 1.0) / 5.0 - 24.0;
        let mut block = Process::new(false, true).at(x, height / 3.0);
        block.set_image(engine.assets(), BLOCK);
        engine.start(block, Block);
    }

    for _ in 0..8 {
        let mut ball = Process::new(true, true)
            .at(rng.gen_range(0.0..width - 16.0), rng.gen_range(height / 2.0..height - 16.0))
            .with_depth(1);
        ball.set_image(engine.assets(), BALL);
        let speed = rng.gen_range(60.0..140.0);
        let heading: f32 = rng.gen_range(0.0..std::f32::consts::TAU);
        engine.start(ball, Ball::new(speed * heading.cos(), speed * heading.sin()));
    }

    engine.start(Process::new(true, false), Spawner::new());
    let hud = marker(engine.assets(), height);
    engine.start(hud, Marker);
}
