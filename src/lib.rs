//! Deterministic, lock-step 2D rigid body physics core.
//!
//! Fixed-point arithmetic ([`fx`]) over a small in-house ECS ([`ecs`]) drives a
//! standard broadphase/narrowphase/solver pipeline (spec dataflow, §2): integrate
//! velocities, sync AABBs, sweep-and-prune broadphase, narrowphase contact generation,
//! speculative CCD, warm-start, joint build, Gauss-Seidel contact and joint solves with
//! split-impulse position correction, contact commit, sleep/wake, and a per-frame state
//! hash. Every stage is built from [`Fx`](fx::Fx) and [`Vec2Fx`](fx::Vec2Fx) only — no
//! floating point anywhere in the hot path — so two runs fed the same inputs in the same
//! order produce bit-identical output.

pub mod broadphase;
pub mod ccd;
pub mod collide;
pub mod components;
pub mod contact;
pub mod ecs;
pub mod error;
pub mod fx;
pub mod geometry;
pub mod hash;
pub mod integrate;
pub mod pairkey;
pub mod resources;
pub mod sleep;
pub mod solver;
pub mod warmstart;

pub use ecs::{Entity, Scheduler, System, World};
pub use error::PhysicsError;
pub use fx::{Fx, Vec2Fx};

use broadphase::{BroadphaseSystem, SyncAabbSystem};
use ccd::SpeculativeCcdSystem;
use collide::NarrowphaseSystem;
use contact::{ContactCache2D, Contacts2D};
use integrate::IntegrateVelocitiesSystem;
use resources::{BroadphasePairs, JointBatch2D, PhysicsSleepConfig, PrismaticBatch2D, RevoluteBatch2D};
use sleep::{SleepUpdateSystem, WakeOnContactSystem};
use solver::contact::ContactSolverSystem;
use solver::joints::{
    DistanceJointBuildSystem, DistanceJointSolveSystem, PrismaticJointBuildSystem,
    PrismaticJointSolveSystem, RevoluteJointBuildSystem, RevoluteJointSolveSystem,
};
use warmstart::{CommitContactsSystem, WarmStartSystem};

/// Construct a [`World`] with every resource this crate's systems expect already
/// registered, at the given fixed timestep.
pub fn new_world(dt: Fx) -> World {
    let mut world = World::new(dt);
    world.insert_resource(BroadphasePairs::new());
    world.insert_resource(Contacts2D::new());
    world.insert_resource(ContactCache2D::new());
    world.insert_resource(JointBatch2D::new());
    world.insert_resource(RevoluteBatch2D::new());
    world.insert_resource(PrismaticBatch2D::new());
    world.insert_resource(resources::JointEvents2D::new());
    world.insert_resource(PhysicsSleepConfig::default());
    world
}

/// Build the standard per-tick [`Scheduler`], wired in the dataflow order spec.md's §2
/// describes. Joint builds/solves for the three joint kinds are independent of each
/// other and of nothing but the contact solve having finished, so they're declared with
/// `after` rather than chained in sequence — insertion order (distance, revolute,
/// prismatic) is the deterministic tie-break spec §4.12 calls for.
pub fn build_scheduler() -> Scheduler {
    let mut scheduler = Scheduler::new();
    scheduler.add(IntegrateVelocitiesSystem, &[], &[]);
    scheduler.add(SyncAabbSystem, &["integrate_velocities"], &[]);
    scheduler.add(BroadphaseSystem, &["sync_aabb"], &[]);
    scheduler.add(NarrowphaseSystem, &["broadphase"], &[]);
    scheduler.add(SpeculativeCcdSystem, &["narrowphase"], &[]);
    scheduler.add(WarmStartSystem, &["speculative_ccd"], &[]);
    scheduler.add(DistanceJointBuildSystem, &["warm_start"], &[]);
    scheduler.add(RevoluteJointBuildSystem, &["warm_start"], &[]);
    scheduler.add(PrismaticJointBuildSystem, &["warm_start"], &[]);
    scheduler.add(
        ContactSolverSystem,
        &["build_distance_joints", "build_revolute_joints", "build_prismatic_joints"],
        &[],
    );
    scheduler.add(DistanceJointSolveSystem, &["solve_contacts"], &[]);
    scheduler.add(RevoluteJointSolveSystem, &["solve_distance_joints"], &[]);
    scheduler.add(PrismaticJointSolveSystem, &["solve_revolute_joints"], &[]);
    scheduler.add(CommitContactsSystem, &["solve_prismatic_joints"], &[]);
    scheduler.add(WakeOnContactSystem, &["commit_contacts"], &[]);
    scheduler.add(SleepUpdateSystem, &["wake_on_contact"], &[]);
    scheduler
}

/// Advance the simulation by one fixed tick, returning that tick's deterministic state
/// hash (spec §4.11). Advances the frame counter and the contact cache's eviction clock
/// before running the pipeline.
pub fn tick(world: &mut World, scheduler: &mut Scheduler) -> Result<u32, PhysicsError> {
    let span = tracing::debug_span!("tick", frame = world.frame() + 1);
    let _guard = span.enter();
    world.advance_frame();
    let frame = world.frame();
    world.resource_mut::<ContactCache2D>().begin_frame(frame);
    scheduler.run(world)?;
    Ok(hash::frame_hash(world))
}
