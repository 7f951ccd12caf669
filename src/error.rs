//! Setup-time errors.
//!
//! The per-tick hot path is infallible by design (spec §7): missing components or
//! destroyed joint targets are silently skipped, never reported as errors. The small
//! surface that *can* fail is the one-time embedder setup — wiring the scheduler,
//! addressing a stale entity from outside the tick.

use crate::ecs::Entity;

/// Errors raised while an embedder is constructing a [`crate::World`] or
/// [`crate::Scheduler`]. Never produced by [`crate::tick`] itself.
#[derive(Debug, thiserror::Error)]
pub enum PhysicsError {
    /// The `after`/`before` dependency graph declared for the scheduler's systems has a
    /// cycle and cannot be linearized.
    #[error("scheduler dependency graph has a cycle involving stage `{stage}`")]
    CyclicSchedule {
        /// One of the stage names participating in the cycle.
        stage: &'static str,
    },

    /// A system declared a dependency (`after`/`before`) on a stage name that was never
    /// registered.
    #[error("scheduler stage `{0}` depends on unknown stage `{1}`")]
    UnknownStage(&'static str, &'static str),

    /// An entity handle referred to a slot whose generation no longer matches —
    /// the entity was despawned (and possibly replaced) since the handle was taken.
    #[error("entity {0:?} is no longer alive")]
    StaleEntity(Entity),
}
