// Process module - simulated objects, their hooks and the registry that owns them
pub mod behavior;
pub mod object;
pub mod registry;

pub use behavior::{Behavior, Inert};
pub use object::{ActivityState, ObjectId, Process};
pub use registry::{Commit, Objects, Pending, ProcessRegistry, Slot};
