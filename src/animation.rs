/// A sequence of texture paths shown one after another.
#[derive(Clone, Debug)]
pub struct Animation {
    frames: Vec<String>,
    frame_duration: f32, // Seconds per frame
    looped: bool,
    elapsed: f32,
}

impl Animation {
    pub fn new<S: Into<String>>(frame_duration: f32, frames: impl IntoIterator<Item = S>) -> Self {
        Self {
            frames: frames.into_iter().map(Into::into).collect(),
            frame_duration,
            looped: true,
            elapsed: 0.0,
        }
    }

    /// Stops on the last frame instead of wrapping around.
    pub fn once(mut self) -> Self {
        self.looped = false;
        self
    }

    pub fn reset(&mut self) {
        self.elapsed = 0.0;
    }

    pub fn is_finished(&self) -> bool {
        !self.looped && self.index() + 1 >= self.frames.len()
    }

    /// Advances by `delta` seconds and returns the path to show.
    pub fn frame(&mut self, delta: f32) -> &str {
        self.elapsed += delta;
        let total = self.frame_duration * self.frames.len() as f32;
        if total > 0.0 {
            self.elapsed = if self.looped { self.elapsed % total } else { self.elapsed.min(total) };
        }
        self.current()
    }

    pub fn current(&self) -> &str {
        if self.frames.is_empty() {
            return "";
        }
        let index = self.index();
        if !self.looped && index >= self.frames.len() {
            &self.frames[self.frames.len() - 1]
        } else {
            &self.frames[index % self.frames.len()]
        }
    }

    fn index(&self) -> usize {
        if self.frame_duration <= 0.0 {
            return 0;
        }
        (self.elapsed / self.frame_duration) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looped_animation_wraps() {
        let mut walk = Animation::new(0.25, ["a.png", "b.png", "c.png"]);
        assert_eq!(walk.frame(0.0), "a.png");
        assert_eq!(walk.frame(0.25), "b.png");
        assert_eq!(walk.frame(0.25), "c.png");
        assert_eq!(walk.frame(0.25), "a.png");
        assert!(!walk.is_finished());
    }

    #[test]
    fn one_shot_animation_holds_last_frame() {
        let mut burst = Animation::new(0.5, ["1.png", "2.png"]).once();
        assert_eq!(burst.frame(0.5), "2.png");
        assert_eq!(burst.frame(10.0), "2.png");
        assert!(burst.is_finished());

        burst.reset();
        assert_eq!(burst.current(), "1.png");
        assert!(!burst.is_finished());
    }

    #[test]
    fn looped_animation_keeps_advancing_after_long_uptimes() {
        let mut walk = Animation::new(0.25, ["a.png", "b.png", "c.png"]);
        assert_eq!(walk.frame(1.0e7), "b.png");
        assert_eq!(walk.frame(0.25), "c.png");
        assert_eq!(walk.frame(0.25), "a.png");
    }

    #[test]
    fn empty_animation_has_no_frame() {
        let mut nothing = Animation::new(0.1, Vec::<String>::new());
        assert_eq!(nothing.frame(1.0), "");
    }
}
