use crate::camera::Camera;
use crate::context::Context;
use crate::error::HookResult;
use crate::process::Process;
use crate::render::DrawCommand;

/// Per-kind hooks of a process. Every method has a do-nothing default.
pub trait Behavior: Send {
    /// Name matched by collision type filters. Defaults to the concrete type name.
    fn kind(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Called once per tick while the process is awake, after its alarms ran.
    fn update(&mut self, _process: &mut Process, _ctx: &mut Context<'_>, _delta: f32) -> HookResult {
        Ok(())
    }

    fn on_collision(&mut self, _process: &mut Process, _other: &Process, _ctx: &mut Context<'_>) -> HookResult {
        Ok(())
    }

    /// Draw command for this frame. Only called for visible, textured, on-screen objects.
    fn render(&self, process: &Process, camera: &Camera) -> Option<DrawCommand> {
        DrawCommand::for_process(process, camera)
    }
}

/// Scenery with no behaviour of its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct Inert;

impl Behavior for Inert {
    fn kind(&self) -> &'static str {
        "inert"
    }
}
