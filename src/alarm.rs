use std::collections::BTreeMap;
use std::fmt;

use crate::context::Context;
use crate::error::isolate;
use crate::process::Process;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AlarmId(pub u32);

/// What an alarm callback wants next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ring {
    Again, // Keep ringing (only honoured by repeating alarms)
    Stop,
}

pub type AlarmCallback = Box<dyn FnMut(&mut Process, &mut Context<'_>) -> Ring + Send>;

pub struct Alarm {
    pub id: AlarmId,
    delay_ms: f32,
    elapsed_ms: f32,
    repeat: bool,
    callback: AlarmCallback,
}

impl Alarm {
    pub fn new(id: AlarmId, delay_ms: u32, repeat: bool, callback: AlarmCallback) -> Self {
        Self {
            id,
            delay_ms: delay_ms as f32,
            elapsed_ms: 0.0,
            repeat,
            callback,
        }
    }

    /// Advances by `delta` seconds, firing as many times as the accumulated time allows.
    /// Returns true when the alarm is done and must be detached from its owner.
    pub fn step(&mut self, delta: f32, process: &mut Process, ctx: &mut Context<'_>) -> bool {
        self.elapsed_ms += delta * 1000.0;

        while self.elapsed_ms >= self.delay_ms {
            let ring = (self.callback)(process, ctx);
            if ring == Ring::Stop || !self.repeat {
                return true;
            }
            if self.delay_ms <= 0.0 {
                self.elapsed_ms = 0.0;
                break;
            }
            self.elapsed_ms -= self.delay_ms;
        }

        false
    }
}

impl fmt::Debug for Alarm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Alarm")
            .field("id", &self.id)
            .field("delay_ms", &self.delay_ms)
            .field("elapsed_ms", &self.elapsed_ms)
            .field("repeat", &self.repeat)
            .finish()
    }
}

/// The timer set owned by one process.
#[derive(Debug, Default)]
pub struct Alarms {
    next_id: u32,
    timers: BTreeMap<AlarmId, Alarm>,
    // Bookkeeping for calls made from inside a callback, while `timers` is checked out
    cancelled: Vec<AlarmId>,
    cleared: bool,
}

impl Alarms {
    pub fn set(&mut self, callback: AlarmCallback, delay_ms: u32, repeat: bool) -> AlarmId {
        self.next_id += 1;
        let id = AlarmId(self.next_id);
        self.timers.insert(id, Alarm::new(id, delay_ms, repeat, callback));
        id
    }

    pub fn cancel(&mut self, id: AlarmId) -> bool {
        if self.timers.remove(&id).is_some() {
            return true;
        }
        if id.0 > 0 && id.0 <= self.next_id && !self.cancelled.contains(&id) {
            self.cancelled.push(id);
        }
        false
    }

    pub fn clear(&mut self) {
        self.timers.clear();
        self.cleared = true;
    }

    pub fn contains(&self, id: AlarmId) -> bool {
        self.timers.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

/// Steps every alarm of `process`. Callbacks get the owner mutably, so the set is
/// checked out for the duration and merged back afterwards.
pub(crate) fn step_alarms(process: &mut Process, delta: f32, ctx: &mut Context<'_>) {
    if process.alarms.timers.is_empty() {
        return;
    }

    let mut running = std::mem::take(&mut process.alarms.timers);
    process.alarms.cancelled.clear();
    process.alarms.cleared = false;

    let ids: Vec<AlarmId> = running.keys().copied().collect();
    for id in ids {
        if process.alarms.cleared {
            break;
        }
        if process.alarms.cancelled.contains(&id) {
            running.remove(&id);
            continue;
        }
        let detach = match running.get_mut(&id) {
            Some(alarm) => {
                let owner = process.id();
                // a panicking callback loses its alarm, the rest keep running
                isolate(owner, "alarm", || Ok(alarm.step(delta, process, ctx))).unwrap_or(true)
            }
            None => false,
        };
        if detach {
            running.remove(&id);
        }
    }

    if process.alarms.cleared {
        // finish() or clear() ran inside a callback: only alarms set after that survive
        process.alarms.cleared = false;
        process.alarms.cancelled.clear();
        return;
    }

    for id in process.alarms.cancelled.drain(..) {
        running.remove(&id);
    }
    let added = std::mem::replace(&mut process.alarms.timers, running);
    process.alarms.timers.extend(added);
}
