//! World-scoped singleton resources other than the contact ones (spec §3), which live
//! in [`crate::contact`].

use shrev::EventChannel;

use crate::ecs::Entity;
use crate::fx::{Fx, Vec2Fx};

/// This frame's candidate pairs from broadphase, in insertion order (ordering
/// guarantee O3) — never re-sorted, since the SAP sweep already produced the order
/// narrowphase wants to consume.
#[derive(Default)]
pub struct BroadphasePairs {
    pub pairs: Vec<(Entity, Entity)>,
}

impl BroadphasePairs {
    pub fn new() -> BroadphasePairs {
        BroadphasePairs::default()
    }

    pub fn clear(&mut self) {
        self.pairs.clear();
    }
}

/// One distance joint row, precomputed once per frame (spec §4.9).
#[derive(Clone, Copy, Debug)]
pub struct JointRow2D {
    pub joint: Entity,
    pub a: Entity,
    pub b: Entity,
    pub r_a: Vec2Fx,
    pub r_b: Vec2Fx,
    pub normal: Vec2Fx,
    pub mass: Fx,
    pub bias: Fx,
    pub gamma_k: Fx,
}

#[derive(Default)]
pub struct JointBatch2D {
    pub rows: Vec<JointRow2D>,
}

impl JointBatch2D {
    pub fn new() -> JointBatch2D {
        JointBatch2D::default()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }
}

/// One revolute joint row. The 2x2 inverse effective-mass matrix is stored as four
/// scalars (row-major) rather than pulling in a generic matrix type for a single use.
#[derive(Clone, Copy, Debug)]
pub struct RevoluteRow2D {
    pub joint: Entity,
    pub a: Entity,
    pub b: Entity,
    pub r_a: Vec2Fx,
    pub r_b: Vec2Fx,
    pub k_inv_00: Fx,
    pub k_inv_01: Fx,
    pub k_inv_10: Fx,
    pub k_inv_11: Fx,
    pub bias: Vec2Fx,
    pub gamma_k: Fx,
}

#[derive(Default)]
pub struct RevoluteBatch2D {
    pub rows: Vec<RevoluteRow2D>,
}

impl RevoluteBatch2D {
    pub fn new() -> RevoluteBatch2D {
        RevoluteBatch2D::default()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }
}

/// One prismatic joint row. `lower_active`/`upper_active` were decided at build time
/// from the current translation along the axis (spec §4.9) and stay fixed for the
/// frame's solve; the accumulated impulses they gate live on the component itself.
#[derive(Clone, Copy, Debug)]
pub struct PrismaticRow2D {
    pub joint: Entity,
    pub a: Entity,
    pub b: Entity,
    pub r_a: Vec2Fx,
    pub r_b: Vec2Fx,
    pub axis: Vec2Fx,
    pub perp: Vec2Fx,
    pub perp_mass: Fx,
    pub axial_mass: Fx,
    pub perp_bias: Fx,
    pub lower_active: bool,
    pub upper_active: bool,
    pub axial_bias: Fx,
}

#[derive(Default)]
pub struct PrismaticBatch2D {
    pub rows: Vec<PrismaticRow2D>,
}

impl PrismaticBatch2D {
    pub fn new() -> PrismaticBatch2D {
        PrismaticBatch2D::default()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }
}

/// Which joint kind produced a [`JointBrokenEvent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum JointKind {
    Distance,
    Revolute,
    Prismatic,
}

/// Raised exactly once, in the tick a joint's break threshold is first crossed
/// (spec §4.9, §7).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JointBrokenEvent {
    pub joint: Entity,
    pub a: Entity,
    pub b: Entity,
    pub kind: JointKind,
    pub frame: u64,
}

/// Break events raised this frame, via `shrev` the same way the teacher's contact
/// resolution system raises its own events (spec §9 "a per-frame list ... read by
/// external systems between ticks").
pub struct JointEvents2D {
    pub channel: EventChannel<JointBrokenEvent>,
}

impl JointEvents2D {
    pub fn new() -> JointEvents2D {
        JointEvents2D { channel: EventChannel::new() }
    }
}

impl Default for JointEvents2D {
    fn default() -> JointEvents2D {
        JointEvents2D::new()
    }
}

/// Sleep thresholds (spec §6 configuration surface). Defaults are part of the
/// bit-identical contract: changing one changes `frameHash`.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhysicsSleepConfig {
    pub lin_thresh: Fx,
    pub ang_thresh: Fx,
    pub time_to_sleep: Fx,
    pub wake_bias: Fx,
    pub impulse_wake: Fx,
}

impl Default for PhysicsSleepConfig {
    fn default() -> PhysicsSleepConfig {
        PhysicsSleepConfig {
            lin_thresh: Fx::from_f64(0.02),
            ang_thresh: Fx::from_f64(0.05),
            time_to_sleep: Fx::from_f64(0.5),
            wake_bias: Fx::from_f64(1.5),
            impulse_wake: Fx::from_f64(0.05),
        }
    }
}
