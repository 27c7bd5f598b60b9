//! Session layer: the registry of live instances, the per-instance facade and
//! the validated memory-area accessor.

pub mod area;
pub mod controller;
pub mod registry;

pub use area::AreaAccessor;
pub use controller::ControllerSession;
pub use registry::{InstanceRegistry, InstanceSelector};
