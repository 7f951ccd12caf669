//! Joint builders and Gauss-Seidel solvers (spec §4.9): distance, revolute, prismatic.
//!
//! Each submodule owns one joint type end to end — its own build system that
//! precomputes a [`crate::resources::JointBatch2D`]-family row per frame, and its own
//! solve system. All three share the same impulse application and relative-velocity
//! helpers the contact solver uses, since a joint row and a contact row both boil down
//! to "two bodies, two arms, an axis, an accumulated impulse."

pub mod distance;
pub mod prismatic;
pub mod revolute;

pub use distance::{DistanceJointBuildSystem, DistanceJointSolveSystem};
pub use prismatic::{PrismaticJointBuildSystem, PrismaticJointSolveSystem};
pub use revolute::{RevoluteJointBuildSystem, RevoluteJointSolveSystem};

use crate::components::Body2D;
use crate::ecs::{Entity, World};
use crate::fx::{Fx, Vec2Fx};

/// Apply a scalar impulse `dj` along `axis` at arms `r_a`/`r_b`, symmetric about the
/// pair (subtract from `a`, add to `b`) — identical in form to the contact solver's
/// impulse application.
pub(super) fn apply_joint_impulse(
    world: &mut World,
    a: Entity,
    b: Entity,
    r_a: Vec2Fx,
    r_b: Vec2Fx,
    axis: Vec2Fx,
    dj: Fx,
) {
    if let Some(body) = world.get_mut::<Body2D>(a) {
        let impulse = axis.scale(dj.mul(body.inv_mass));
        body.vx = body.vx - impulse.x;
        body.vy = body.vy - impulse.y;
        body.w = body.w - r_a.cross(axis).mul(dj).mul(body.inv_i);
    }
    if let Some(body) = world.get_mut::<Body2D>(b) {
        let impulse = axis.scale(dj.mul(body.inv_mass));
        body.vx = body.vx + impulse.x;
        body.vy = body.vy + impulse.y;
        body.w = body.w + r_b.cross(axis).mul(dj).mul(body.inv_i);
    }
}

/// Apply a 2D impulse `(jx, jy)` directly (not decomposed into axis*scalar) — used by
/// the revolute solver, whose constraint isn't along a single shared axis.
pub(super) fn apply_joint_impulse_vec(
    world: &mut World,
    a: Entity,
    b: Entity,
    r_a: Vec2Fx,
    r_b: Vec2Fx,
    impulse: Vec2Fx,
) {
    if let Some(body) = world.get_mut::<Body2D>(a) {
        let d = impulse.scale(body.inv_mass);
        body.vx = body.vx - d.x;
        body.vy = body.vy - d.y;
        body.w = body.w - r_a.cross(impulse).mul(body.inv_i);
    }
    if let Some(body) = world.get_mut::<Body2D>(b) {
        let d = impulse.scale(body.inv_mass);
        body.vx = body.vx + d.x;
        body.vy = body.vy + d.y;
        body.w = body.w + r_b.cross(impulse).mul(body.inv_i);
    }
}

pub(super) fn relative_velocity(world: &World, a: Entity, b: Entity, r_a: Vec2Fx, r_b: Vec2Fx) -> Vec2Fx {
    let body_a = world.get::<Body2D>(a).unwrap();
    let body_b = world.get::<Body2D>(b).unwrap();
    body_b.point_velocity(r_b) - body_a.point_velocity(r_a)
}
