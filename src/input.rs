use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use crate::geometry::Rect;

pub const MAX_POINTERS: usize = 10;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pointer {
    pub pressed: bool,
    pub x: f32, // Camera space, y up
    pub y: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Consistent copy of the input state, taken once per tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InputSnapshot {
    pointers: Vec<Pointer>,
    orientation: Orientation,
}

impl InputSnapshot {
    pub fn pointer(&self, slot: usize) -> Option<Pointer> {
        self.pointers.get(slot).copied()
    }

    pub fn pressed(&self) -> impl Iterator<Item = &Pointer> + '_ {
        self.pointers.iter().filter(|p| p.pressed)
    }

    /// Whether any pressed pointer lies inside the given camera-space box.
    pub fn is_pressed(&self, left: f32, right: f32, bottom: f32, top: f32) -> bool {
        let area = Rect::new(left, bottom, right - left, top - bottom);
        self.pressed().any(|p| area.contains_point(p.x, p.y))
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }
}

/// Latest-state-wins pointer slots written by platform threads.
pub struct InputHub {
    state: Mutex<InputSnapshot>,
}

impl InputHub {
    pub fn new(slots: usize) -> Self {
        Self {
            state: Mutex::new(InputSnapshot {
                pointers: vec![Pointer::default(); slots.min(MAX_POINTERS)],
                orientation: Orientation::default(),
            }),
        }
    }

    pub fn slots(&self) -> usize {
        self.lock().pointers.len()
    }

    /// Press or move. Slots past the configured count are ignored.
    pub fn pointer_down(&self, slot: usize, x: f32, y: f32) {
        let mut state = self.lock();
        match state.pointers.get_mut(slot) {
            Some(pointer) => {
                pointer.pressed = true;
                pointer.x = x;
                pointer.y = y;
            }
            None => log::debug!("[INPUT] Ignoring pointer slot {}", slot),
        }
    }

    pub fn pointer_up(&self, slot: usize) {
        let mut state = self.lock();
        if let Some(pointer) = state.pointers.get_mut(slot) {
            pointer.pressed = false;
        }
    }

    pub fn release_all(&self) {
        let mut state = self.lock();
        for pointer in state.pointers.iter_mut() {
            pointer.pressed = false;
        }
    }

    pub fn set_orientation(&self, orientation: Orientation) {
        self.lock().orientation = orientation;
    }

    pub fn snapshot(&self) -> InputSnapshot {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, InputSnapshot> {
        // A writer that panicked cannot leave a slot half-written, so the data is still usable
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Maps screen pixels (origin top-left, y down) into the viewport (origin bottom-left, y up).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenMapping {
    pub screen_width: f32,
    pub screen_height: f32,
    pub viewport_width: f32,
    pub viewport_height: f32,
}

impl ScreenMapping {
    pub fn to_viewport(&self, x: f32, y: f32) -> (f32, f32) {
        if self.screen_width <= 0.0 || self.screen_height <= 0.0 {
            return (0.0, 0.0);
        }
        let vx = x * self.viewport_width / self.screen_width;
        let vy = (self.screen_height - y) * self.viewport_height / self.screen_height;
        (vx, vy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn latest_state_wins_per_slot() {
        let hub = InputHub::new(5);
        hub.pointer_down(1, 10.0, 20.0);
        hub.pointer_down(1, 30.0, 40.0);
        let snapshot = hub.snapshot();
        assert_eq!(snapshot.pointer(1), Some(Pointer { pressed: true, x: 30.0, y: 40.0 }));
        assert_eq!(snapshot.pressed().count(), 1);

        hub.pointer_up(1);
        assert_eq!(hub.snapshot().pressed().count(), 0);
    }

    #[test]
    fn out_of_range_slots_are_ignored() {
        let hub = InputHub::new(2);
        hub.pointer_down(7, 1.0, 1.0);
        assert_eq!(hub.snapshot().pressed().count(), 0);
        assert_eq!(hub.slots(), 2);
    }

    #[test]
    fn snapshot_is_detached_from_later_writes() {
        let hub = InputHub::new(3);
        hub.pointer_down(0, 5.0, 5.0);
        let snapshot = hub.snapshot();
        hub.pointer_up(0);
        assert!(snapshot.is_pressed(0.0, 10.0, 0.0, 10.0));
        assert!(!snapshot.is_pressed(6.0, 10.0, 0.0, 10.0));
    }

    #[test]
    fn writes_from_other_threads_are_visible() {
        let hub = Arc::new(InputHub::new(5));
        let writers: Vec<_> = (0..5)
            .map(|slot| {
                let hub = hub.clone();
                thread::spawn(move || hub.pointer_down(slot, slot as f32, 0.0))
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }
        assert_eq!(hub.snapshot().pressed().count(), 5);
    }

    #[test]
    fn screen_coordinates_flip_into_viewport_space() {
        let mapping = ScreenMapping {
            screen_width: 960.0,
            screen_height: 640.0,
            viewport_width: 480.0,
            viewport_height: 320.0,
        };
        assert_eq!(mapping.to_viewport(0.0, 640.0), (0.0, 0.0));
        assert_eq!(mapping.to_viewport(960.0, 0.0), (480.0, 320.0));
        assert_eq!(mapping.to_viewport(480.0, 320.0), (240.0, 160.0));
    }

    #[test]
    fn orientation_is_latest_value() {
        let hub = InputHub::new(1);
        hub.set_orientation(Orientation { x: 1.0, y: 2.0, z: 3.0 });
        assert_eq!(hub.snapshot().orientation().z, 3.0);
    }
}
