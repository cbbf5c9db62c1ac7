use std::collections::{BTreeSet, HashMap};

use crate::process::{Behavior, ObjectId, Process};

/// A live object: its state plus the hooks that drive it.
pub struct Slot {
    pub process: Process,
    pub behavior: Box<dyn Behavior>,
}

/// Read-only view of the committed objects handed to hooks.
#[derive(Default)]
pub struct Objects {
    slots: HashMap<ObjectId, Slot>,
}

impl Objects {
    pub fn get(&self, id: ObjectId) -> Option<&Process> {
        self.slots.get(&id).map(|slot| &slot.process)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Starts and finishes requested during a tick, applied together at the commit point.
#[derive(Default)]
pub struct Pending {
    next_id: u32,
    inserts: Vec<Slot>,
    removals: Vec<ObjectId>,
}

impl Pending {
    pub fn start(&mut self, mut process: Process, behavior: Box<dyn Behavior>) -> ObjectId {
        self.next_id += 1;
        let id = ObjectId(self.next_id);
        process.id = id;
        process.kind = behavior.kind();
        self.inserts.push(Slot { process, behavior });
        id
    }

    pub fn finish(&mut self, id: ObjectId) {
        self.removals.push(id);
    }

    pub fn inserts(&self) -> usize {
        self.inserts.len()
    }

    pub fn removals(&self) -> usize {
        self.removals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.removals.is_empty()
    }
}

/// What a commit changed.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Commit {
    pub added: Vec<ObjectId>,
    pub removed: Vec<ObjectId>,
}

pub struct ProcessRegistry {
    objects: Objects,
    pending: Pending,
    dynamic: BTreeSet<ObjectId>,
    statics: BTreeSet<ObjectId>,
    collisionable: BTreeSet<ObjectId>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self {
            objects: Objects::default(),
            pending: Pending::default(),
            dynamic: BTreeSet::new(),
            statics: BTreeSet::new(),
            collisionable: BTreeSet::new(),
        }
    }

    /// Queues `process`; it becomes live at the next commit.
    pub fn start(&mut self, process: Process, behavior: Box<dyn Behavior>) -> ObjectId {
        self.pending.start(process, behavior)
    }

    pub fn finish(&mut self, id: ObjectId) {
        self.pending.finish(id);
    }

    pub fn get(&self, id: ObjectId) -> Option<&Process> {
        self.objects.get(id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut Process> {
        self.objects.slots.get_mut(&id).map(|slot| &mut slot.process)
    }

    pub fn slot(&self, id: ObjectId) -> Option<&Slot> {
        self.objects.slots.get(&id)
    }

    pub fn objects(&self) -> &Objects {
        &self.objects
    }

    pub fn pending(&self) -> &Pending {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn dynamic(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.dynamic.iter().copied()
    }

    pub fn statics(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.statics.iter().copied()
    }

    pub fn collisionable(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.collisionable.iter().copied()
    }

    /// Removes a slot from the arena for dispatch. Views are left untouched;
    /// every taken slot must be handed back through `restore`.
    pub fn take(&mut self, id: ObjectId) -> Option<Slot> {
        self.objects.slots.remove(&id)
    }

    pub fn restore(&mut self, slot: Slot) {
        self.objects.slots.insert(slot.process.id, slot);
    }

    /// Committed objects to read and pending queues to write, borrowed together.
    pub fn parts_mut(&mut self) -> (&Objects, &mut Pending) {
        (&self.objects, &mut self.pending)
    }

    /// Applies pending inserts, then pending removals.
    pub fn commit(&mut self) -> Commit {
        let mut commit = Commit::default();

        for slot in std::mem::take(&mut self.pending.inserts) {
            let id = slot.process.id;
            if slot.process.is_dynamic() {
                self.dynamic.insert(id);
            } else {
                self.statics.insert(id);
            }
            if slot.process.is_collisionable() {
                self.collisionable.insert(id);
            }
            self.objects.slots.insert(id, slot);
            commit.added.push(id);
        }

        for id in std::mem::take(&mut self.pending.removals) {
            if self.objects.slots.remove(&id).is_none() {
                log::debug!("[REGISTRY] Ignoring removal of unknown object {:?}", id);
                continue;
            }
            self.dynamic.remove(&id);
            self.statics.remove(&id);
            self.collisionable.remove(&id);
            commit.removed.push(id);
        }

        commit
    }
}

impl Default for ProcessRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::Inert;

    fn start(registry: &mut ProcessRegistry, dynamic: bool, collisionable: bool) -> ObjectId {
        registry.start(Process::new(dynamic, collisionable), Box::new(Inert))
    }

    #[test]
    fn ids_start_at_one_and_are_never_reused() {
        let mut registry = ProcessRegistry::new();
        let a = start(&mut registry, true, false);
        let b = start(&mut registry, true, false);
        assert_eq!((a, b), (ObjectId(1), ObjectId(2)));

        registry.commit();
        registry.finish(a);
        registry.commit();

        let c = start(&mut registry, true, false);
        assert_eq!(c, ObjectId(3));
    }

    #[test]
    fn started_objects_are_invisible_until_commit() {
        let mut registry = ProcessRegistry::new();
        let id = start(&mut registry, true, true);
        assert!(registry.get(id).is_none());
        assert_eq!(registry.dynamic().count(), 0);
        assert_eq!(registry.pending().inserts(), 1);

        let commit = registry.commit();
        assert_eq!(commit.added, vec![id]);
        assert_eq!(registry.get(id).map(|p| p.id()), Some(id));
        assert_eq!(registry.get(id).map(|p| p.kind()), Some("inert"));
        assert!(registry.pending().is_empty());
    }

    #[test]
    fn views_follow_construction_flags() {
        let mut registry = ProcessRegistry::new();
        let mover = start(&mut registry, true, true);
        let ghost = start(&mut registry, true, false);
        let wall = start(&mut registry, false, true);
        let decor = start(&mut registry, false, false);
        registry.commit();

        assert_eq!(registry.dynamic().collect::<Vec<_>>(), vec![mover, ghost]);
        assert_eq!(registry.statics().collect::<Vec<_>>(), vec![wall, decor]);
        assert_eq!(registry.collisionable().collect::<Vec<_>>(), vec![mover, wall]);
    }

    #[test]
    fn start_and_finish_in_one_tick_never_goes_live() {
        let mut registry = ProcessRegistry::new();
        let id = start(&mut registry, true, true);
        registry.finish(id);

        let commit = registry.commit();
        assert_eq!(commit.added, vec![id]);
        assert_eq!(commit.removed, vec![id]);
        assert!(registry.is_empty());
        assert_eq!(registry.collisionable().count(), 0);
    }

    #[test]
    fn finished_objects_stay_until_commit_and_double_finish_is_tolerated() {
        let mut registry = ProcessRegistry::new();
        let id = start(&mut registry, true, true);
        registry.commit();

        registry.finish(id);
        registry.finish(id);
        assert!(registry.get(id).is_some());

        let commit = registry.commit();
        assert_eq!(commit.removed, vec![id]);
        assert!(registry.get(id).is_none());
        assert_eq!(registry.dynamic().count(), 0);
    }

    #[test]
    fn taken_slots_keep_their_view_membership() {
        let mut registry = ProcessRegistry::new();
        let id = start(&mut registry, true, false);
        registry.commit();

        let mut slot = registry.take(id).unwrap();
        assert!(registry.get(id).is_none());
        assert_eq!(registry.dynamic().collect::<Vec<_>>(), vec![id]);

        slot.process.x = 4.0;
        registry.restore(slot);
        assert_eq!(registry.get(id).map(|p| p.x), Some(4.0));
    }
}
