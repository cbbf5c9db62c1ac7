/// Fire-and-forget audio sink. Implementations must never block the simulation thread.
pub trait AudioProvider: Send + Sync {
    fn play_sound(&self, id: &str);
    fn play_music(&self, id: &str);
    fn stop_music(&self);
    fn pause(&self) {}
    fn resume(&self) {}
}

/// Default provider when no audio backend is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentAudio;

impl AudioProvider for SilentAudio {
    fn play_sound(&self, id: &str) {
        log::trace!("[AUDIO] sound {} (silent)", id);
    }

    fn play_music(&self, id: &str) {
        log::trace!("[AUDIO] music {} (silent)", id);
    }

    fn stop_music(&self) {}
}
