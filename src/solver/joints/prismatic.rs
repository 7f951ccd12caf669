//! Prismatic (slider) joint: builder + Gauss-Seidel solver (spec §4.9).
//!
//! The perpendicular row is an equality constraint solved exactly like a distance
//! joint. The axial row is a single accumulator shared between the optional limit and
//! the optional motor: while a limit is active it clamps to a one-sided impulse, and
//! otherwise (no limit engaged) a motor clamps to `[-maxMotorImpulse, maxMotorImpulse]`
//! against its target speed. Both can't be simultaneously unconstrained-bidirectional,
//! which matches how a real slider behaves (a motor never fights an engaged limit).

use crate::components::{Body2D, PrismaticJoint2D};
use crate::ecs::{Entity, System, World};
use crate::fx::{Fx, Vec2Fx};
use crate::geometry::angle_sin_cos;
use crate::resources::{JointKind, PrismaticBatch2D, PrismaticRow2D};
use crate::solver::contact::POS_SLOP;

pub const ITER_P: u32 = 8;

fn world_anchor(body: &Body2D, local: Vec2Fx) -> Vec2Fx {
    let (s, c) = angle_sin_cos(body.angle);
    body.pos() + crate::geometry::rotate(local, s, c)
}

fn effective_mass(body_a: &Body2D, body_b: &Body2D, arm_a: Vec2Fx, arm_b: Vec2Fx, axis: Vec2Fx) -> Fx {
    let sa = arm_a.cross(axis);
    let sb = arm_b.cross(axis);
    let denom = body_a.inv_mass + body_b.inv_mass + sa.mul(sa).mul(body_a.inv_i) + sb.mul(sb).mul(body_b.inv_i);
    Fx::ONE.div(denom)
}

pub struct PrismaticJointBuildSystem;

impl System for PrismaticJointBuildSystem {
    fn name(&self) -> &'static str {
        "build_prismatic_joints"
    }

    fn run(&mut self, world: &mut World) {
        let dt = world.dt();
        let mut entities: Vec<Entity> = world.iter_entities_with::<PrismaticJoint2D>();
        entities.sort_by_key(|&e| {
            let j = world.get::<PrismaticJoint2D>(e).unwrap();
            (crate::pairkey::make_pair_key(world, j.body_a, j.body_b).key, e.id())
        });

        let mut rows = Vec::new();
        for joint_entity in entities {
            let joint = *world.get::<PrismaticJoint2D>(joint_entity).unwrap();
            if joint.broken {
                continue;
            }
            let (Some(body_a), Some(body_b)) =
                (world.get::<Body2D>(joint.body_a), world.get::<Body2D>(joint.body_b))
            else {
                continue;
            };
            if body_a.is_static() && body_b.is_static() {
                continue;
            }

            let a_asleep = !body_a.awake;
            let b_asleep = !body_b.awake;
            if a_asleep && b_asleep {
                continue;
            }
            if a_asleep {
                crate::sleep::wake(world, joint.body_a);
            }
            if b_asleep {
                crate::sleep::wake(world, joint.body_b);
            }

            let body_a = *world.get::<Body2D>(joint.body_a).unwrap();
            let body_b = *world.get::<Body2D>(joint.body_b).unwrap();
            let r_a = world_anchor(&body_a, joint.anchor_a) - body_a.pos();
            let r_b = world_anchor(&body_b, joint.anchor_b) - body_b.pos();
            let (sin_a, cos_a) = angle_sin_cos(body_a.angle);
            let axis = crate::geometry::rotate(joint.axis, sin_a, cos_a).normalize();
            let perp = axis.perp();

            let d = (body_b.pos() + r_b) - (body_a.pos() + r_a);
            // Effective torque arms: body A's arm is offset by `d` since the
            // perpendicular/axial constraint point floats along the slider rather than
            // sitting at A's anchor.
            let arm_a = r_a + d;
            let arm_b = r_b;

            let perp_mass = effective_mass(&body_a, &body_b, arm_a, arm_b, perp);
            let axial_mass = effective_mass(&body_a, &body_b, arm_a, arm_b, axis);

            // Current translation along the axis: how far B's anchor sits past A's,
            // projected onto `axis`.
            let tr = d.dot(axis);
            let lower_active = joint.enable_limit && tr < joint.lower - POS_SLOP;
            let upper_active = joint.enable_limit && tr > joint.upper + POS_SLOP;
            let axial_bias = if lower_active {
                joint.beta.mul(tr - joint.lower).div(dt)
            } else if upper_active {
                joint.beta.mul(tr - joint.upper).div(dt)
            } else {
                Fx::ZERO
            };

            rows.push(PrismaticRow2D {
                joint: joint_entity,
                a: joint.body_a,
                b: joint.body_b,
                r_a: arm_a,
                r_b: arm_b,
                axis,
                perp,
                perp_mass,
                axial_mass,
                perp_bias: joint.beta.mul(d.dot(perp)).div(dt),
                lower_active,
                upper_active,
                axial_bias,
            });
        }

        world.resource_mut::<PrismaticBatch2D>().rows = rows;
    }
}

pub struct PrismaticJointSolveSystem;

impl System for PrismaticJointSolveSystem {
    fn name(&self) -> &'static str {
        "solve_prismatic_joints"
    }

    fn run(&mut self, world: &mut World) {
        let rows = world.resource::<PrismaticBatch2D>().rows.clone();

        for row in &rows {
            let joint = *world.get::<PrismaticJoint2D>(row.joint).unwrap();
            if !joint.j_perp.is_zero() {
                super::apply_joint_impulse(world, row.a, row.b, row.r_a, row.r_b, row.perp, joint.j_perp);
            }
            if !joint.j_axis.is_zero() {
                super::apply_joint_impulse(world, row.a, row.b, row.r_a, row.r_b, row.axis, joint.j_axis);
            }
        }

        for _ in 0..ITER_P {
            for row in &rows {
                let joint = *world.get::<PrismaticJoint2D>(row.joint).unwrap();

                let v_rel = super::relative_velocity(world, row.a, row.b, row.r_a, row.r_b);
                let cdot_perp = v_rel.dot(row.perp);
                let lambda_perp = row.perp_mass.mul((cdot_perp + row.perp_bias).neg());
                super::apply_joint_impulse(world, row.a, row.b, row.r_a, row.r_b, row.perp, lambda_perp);
                crate::sleep::wake_on_impulse(world, row.a, lambda_perp.abs());
                crate::sleep::wake_on_impulse(world, row.b, lambda_perp.abs());
                world.get_mut::<PrismaticJoint2D>(row.joint).unwrap().j_perp += lambda_perp;

                let v_rel = super::relative_velocity(world, row.a, row.b, row.r_a, row.r_b);
                let cdot_axis = v_rel.dot(row.axis);
                let target = if joint.enable_motor { joint.motor_speed } else { Fx::ZERO };
                let lambda_axis = row.axial_mass.mul((cdot_axis - target + row.axial_bias).neg());
                let mut j_axis_new = joint.j_axis + lambda_axis;
                if row.lower_active {
                    // Translation is below `lower`: only an impulse that pushes it back
                    // up (non-negative along `axis`) is physically admissible.
                    j_axis_new = j_axis_new.max(Fx::ZERO);
                } else if row.upper_active {
                    j_axis_new = j_axis_new.min(Fx::ZERO);
                } else if joint.enable_motor {
                    j_axis_new = j_axis_new.clamp(joint.max_motor_impulse.neg(), joint.max_motor_impulse);
                }
                let dj_axis = j_axis_new - joint.j_axis;
                super::apply_joint_impulse(world, row.a, row.b, row.r_a, row.r_b, row.axis, dj_axis);
                crate::sleep::wake_on_impulse(world, row.a, dj_axis.abs());
                crate::sleep::wake_on_impulse(world, row.b, dj_axis.abs());
                world.get_mut::<PrismaticJoint2D>(row.joint).unwrap().j_axis = j_axis_new;
            }
        }

        for row in &rows {
            let joint = *world.get::<PrismaticJoint2D>(row.joint).unwrap();
            if joint.j_perp.abs() + joint.j_axis.abs() > joint.break_impulse {
                let event = crate::resources::JointBrokenEvent {
                    joint: row.joint,
                    a: row.a,
                    b: row.b,
                    kind: JointKind::Prismatic,
                    frame: world.frame(),
                };
                let j = world.get_mut::<PrismaticJoint2D>(row.joint).unwrap();
                j.j_perp = Fx::ZERO;
                j.j_axis = Fx::ZERO;
                j.broken = true;
                world.resource_mut::<crate::resources::JointEvents2D>().channel.single_write(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slider_world(lower: f64, upper: f64) -> (World, Entity, Entity, Entity) {
        let mut world = World::new(Fx::from_f64(1.0 / 60.0));
        world.insert_resource(PrismaticBatch2D::new());
        world.insert_resource(crate::resources::JointEvents2D::new());
        let a = world.spawn();
        world.insert(a, Body2D::new_static(Fx::ZERO, Fx::ZERO));
        let b = world.spawn();
        let mut bb = Body2D::new_dynamic(Fx::from_f64(1.0), Fx::ZERO, Fx::ONE, Fx::ONE);
        bb.vx = Fx::from_f64(5.0);
        world.insert(b, bb);
        let joint = world.spawn();
        world.insert(
            joint,
            PrismaticJoint2D {
                body_a: a,
                body_b: b,
                anchor_a: Vec2Fx::ZERO,
                anchor_b: Vec2Fx::ZERO,
                axis: Vec2Fx::new(Fx::ONE, Fx::ZERO),
                beta: Fx::from_f64(0.2),
                gamma: Fx::ZERO,
                enable_limit: true,
                lower: Fx::from_f64(lower),
                upper: Fx::from_f64(upper),
                enable_motor: false,
                motor_speed: Fx::ZERO,
                max_motor_impulse: Fx::ZERO,
                j_perp: Fx::ZERO,
                j_axis: Fx::ZERO,
                break_impulse: Fx::from_f64(1000.0),
                broken: false,
            },
        );
        (world, a, b, joint)
    }

    #[test]
    fn upper_limit_arrests_outward_motion() {
        let (mut world, _a, b, _joint) = slider_world(0.0, 2.0);
        for _ in 0..30 {
            PrismaticJointBuildSystem.run(&mut world);
            PrismaticJointSolveSystem.run(&mut world);
        }
        let body = world.get::<Body2D>(b).unwrap();
        assert!(body.vx.to_f64() < 3.0);
    }

    #[test]
    fn perpendicular_velocity_is_cancelled() {
        let (mut world, _a, b, _joint) = slider_world(-10.0, 10.0);
        world.get_mut::<Body2D>(b).unwrap().vy = Fx::from_f64(3.0);
        PrismaticJointBuildSystem.run(&mut world);
        PrismaticJointSolveSystem.run(&mut world);
        let body = world.get::<Body2D>(b).unwrap();
        assert!(body.vy.abs().to_f64() < 0.5);
    }
}
