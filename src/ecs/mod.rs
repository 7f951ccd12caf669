//! Minimal deterministic ECS substrate (spec §2 row 2, §9).
//!
//! This is intentionally small: entities are generational indices, components live in
//! per-type flat columns, resources are per-type singletons, and the scheduler resolves
//! a fixed `after`/`before` order once. None of it depends on a hash table being
//! iterated in frame-critical code (spec §5 O4).

mod entity;
mod storage;
mod system;
mod world;

pub use entity::{Entity, EntityAllocator};
pub use storage::ComponentStorage;
pub use system::{Scheduler, System};
pub use world::World;
