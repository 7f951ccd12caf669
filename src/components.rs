//! Core components (spec §3).

use crate::ecs::Entity;
use crate::fx::{Fx, Vec2Fx};

/// A rigid body: position, velocity, mass properties, and material. `invMass == 0` is
/// the definition of "static" (invariant I1) — a static body also carries `invI == 0`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Body2D {
    pub px: Fx,
    pub py: Fx,
    pub vx: Fx,
    pub vy: Fx,
    pub w: Fx,
    /// 16-bit wrapped angle; stored as `Fx` but only the low bits of its integer part
    /// are meaningful, matching the source's wrapped representation.
    pub angle: Fx,
    pub inv_mass: Fx,
    pub inv_i: Fx,
    pub friction: Fx,
    pub restitution: Fx,
    pub awake: bool,
}

impl Body2D {
    pub fn new_dynamic(px: Fx, py: Fx, mass: Fx, inertia: Fx) -> Body2D {
        Body2D {
            px,
            py,
            vx: Fx::ZERO,
            vy: Fx::ZERO,
            w: Fx::ZERO,
            angle: Fx::ZERO,
            inv_mass: Fx::ONE.div(mass),
            inv_i: Fx::ONE.div(inertia),
            friction: Fx::from_f64(0.2),
            restitution: Fx::ZERO,
            awake: true,
        }
    }

    pub fn new_static(px: Fx, py: Fx) -> Body2D {
        Body2D {
            px,
            py,
            vx: Fx::ZERO,
            vy: Fx::ZERO,
            w: Fx::ZERO,
            angle: Fx::ZERO,
            inv_mass: Fx::ZERO,
            inv_i: Fx::ZERO,
            friction: Fx::from_f64(0.2),
            restitution: Fx::ZERO,
            awake: true,
        }
    }

    pub fn is_static(&self) -> bool {
        self.inv_mass.is_zero()
    }

    pub fn pos(&self) -> Vec2Fx {
        Vec2Fx::new(self.px, self.py)
    }

    pub fn vel(&self) -> Vec2Fx {
        Vec2Fx::new(self.vx, self.vy)
    }

    /// Velocity of a point offset `r` from this body's center, including the
    /// contribution of angular velocity: `v + w x r`.
    pub fn point_velocity(&self, r: Vec2Fx) -> Vec2Fx {
        self.vel() + Vec2Fx::cross_scalar(self.w, r)
    }
}

/// Sleep bookkeeping for one body (spec §4.10). Mutated only by the sleep/wake systems.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sleep2D {
    pub sleeping: bool,
    pub timer: Fx,
    pub keep_awake: bool,
}

/// Circle shape, local to the body.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShapeCircle {
    pub r: Fx,
}

/// Convex polygon shape, local to the body. Vertices wind counter-clockwise.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConvexHull2D {
    pub local_vertices: Vec<Vec2Fx>,
    pub skin: Fx,
}

/// World-space cached vertices and outward edge normals for a [`ConvexHull2D`],
/// recomputed every frame by the geometry-sync system.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HullWorld2D {
    pub vertices: Vec<Vec2Fx>,
    pub normals: Vec<Vec2Fx>,
}

/// World-space cached center for a [`ShapeCircle`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CircleWorld2D {
    pub center: Vec2Fx,
}

/// Axis-aligned bounding box, recomputed every frame from body + shape.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AABB2D {
    pub min: Vec2Fx,
    pub max: Vec2Fx,
}

impl AABB2D {
    pub fn overlaps_y(&self, other: &AABB2D) -> bool {
        self.min.y <= other.max.y && other.min.y <= self.max.y
    }
}

/// Shared state for a distance joint connecting two bodies (spec §4.9). Anchors are in
/// each body's local frame.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JointDistance2D {
    pub body_a: Entity,
    pub body_b: Entity,
    pub anchor_a: Vec2Fx,
    pub anchor_b: Vec2Fx,
    pub rest_length: Fx,
    pub beta: Fx,
    pub gamma: Fx,
    /// Accumulated normal impulse, warm-started across frames.
    pub jn: Fx,
    pub break_impulse: Fx,
    pub broken: bool,
}

/// Revolute (pin) joint: both bodies' anchors are held coincident.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RevoluteJoint2D {
    pub body_a: Entity,
    pub body_b: Entity,
    pub anchor_a: Vec2Fx,
    pub anchor_b: Vec2Fx,
    pub beta: Fx,
    pub gamma: Fx,
    /// Accumulated 2D impulse, warm-started across frames.
    pub jx: Fx,
    pub jy: Fx,
    pub break_impulse: Fx,
    pub broken: bool,
}

/// Prismatic (slider) joint: motion constrained to `axis`, with an optional limit and
/// motor along it.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PrismaticJoint2D {
    pub body_a: Entity,
    pub body_b: Entity,
    pub anchor_a: Vec2Fx,
    pub anchor_b: Vec2Fx,
    /// Joint axis in body A's local frame.
    pub axis: Vec2Fx,
    pub beta: Fx,
    pub gamma: Fx,
    pub enable_limit: bool,
    pub lower: Fx,
    pub upper: Fx,
    pub enable_motor: bool,
    pub motor_speed: Fx,
    pub max_motor_impulse: Fx,
    /// Accumulated perpendicular (equality) impulse.
    pub j_perp: Fx,
    /// Accumulated axial impulse (limit and/or motor).
    pub j_axis: Fx,
    pub break_impulse: Fx,
    pub broken: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_body_has_zero_inverse_mass_and_inertia() {
        let b = Body2D::new_static(Fx::ZERO, Fx::ZERO);
        assert!(b.is_static());
        assert_eq!(b.inv_i, Fx::ZERO);
    }

    #[test]
    fn dynamic_body_inverts_mass() {
        let b = Body2D::new_dynamic(Fx::ZERO, Fx::ZERO, Fx::from_f64(2.0), Fx::ONE);
        assert_eq!(b.inv_mass, Fx::from_f64(0.5));
        assert!(!b.is_static());
    }

    #[test]
    fn point_velocity_includes_angular_term() {
        let mut b = Body2D::new_dynamic(Fx::ZERO, Fx::ZERO, Fx::ONE, Fx::ONE);
        b.w = Fx::ONE;
        let r = Vec2Fx::new(Fx::ONE, Fx::ZERO);
        let v = b.point_velocity(r);
        assert_eq!(v, Vec2Fx::new(Fx::ZERO, Fx::ONE));
    }
}
