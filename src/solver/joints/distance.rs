//! Distance joint: builder + Gauss-Seidel solver (spec §4.9).

use crate::components::{Body2D, JointDistance2D};
use crate::ecs::{Entity, System, World};
use crate::fx::{Fx, Vec2Fx};
use crate::geometry::angle_sin_cos;
use crate::resources::{JointBatch2D, JointKind, JointRow2D};

pub const ITER_J: u32 = 8;

fn world_anchor(body: &Body2D, local: Vec2Fx) -> Vec2Fx {
    let (s, c) = angle_sin_cos(body.angle);
    body.pos() + crate::geometry::rotate(local, s, c)
}

/// Precomputes one [`JointRow2D`] per non-broken, non-fully-static distance joint.
pub struct DistanceJointBuildSystem;

impl System for DistanceJointBuildSystem {
    fn name(&self) -> &'static str {
        "build_distance_joints"
    }

    fn run(&mut self, world: &mut World) {
        let dt = world.dt();
        let mut entities: Vec<Entity> = world.iter_entities_with::<JointDistance2D>();
        entities.sort_by_key(|&e| {
            let j = world.get::<JointDistance2D>(e).unwrap();
            (crate::pairkey::make_pair_key(world, j.body_a, j.body_b).key, e.id())
        });

        let mut rows = Vec::new();
        for joint_entity in entities {
            let joint = *world.get::<JointDistance2D>(joint_entity).unwrap();
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
            let p_a = body_a.pos() + r_a;
            let p_b = body_b.pos() + r_b;
            let d = p_b - p_a;
            let dist = d.len_approx();
            let normal = if dist.is_zero() { Vec2Fx::new(Fx::ONE, Fx::ZERO) } else { d.normalize() };
            let c = dist - joint.rest_length;

            let ra_cross = r_a.cross(normal);
            let rb_cross = r_b.cross(normal);
            let denom = body_a.inv_mass
                + body_b.inv_mass
                + ra_cross.mul(ra_cross).mul(body_a.inv_i)
                + rb_cross.mul(rb_cross).mul(body_b.inv_i);
            let mass = Fx::ONE.div(denom);

            rows.push(JointRow2D {
                joint: joint_entity,
                a: joint.body_a,
                b: joint.body_b,
                r_a,
                r_b,
                normal,
                mass,
                bias: joint.beta.mul(c).div(dt),
                gamma_k: joint.gamma.div(dt),
            });
        }

        let batch = world.resource_mut::<JointBatch2D>();
        batch.rows = rows;
    }
}

pub struct DistanceJointSolveSystem;

impl System for DistanceJointSolveSystem {
    fn name(&self) -> &'static str {
        "solve_distance_joints"
    }

    fn run(&mut self, world: &mut World) {
        let rows = world.resource::<JointBatch2D>().rows.clone();

        for row in &rows {
            let jn = world.get::<JointDistance2D>(row.joint).unwrap().jn;
            if !jn.is_zero() {
                super::apply_joint_impulse(world, row.a, row.b, row.r_a, row.r_b, row.normal, jn);
            }
        }

        for _ in 0..ITER_J {
            for row in &rows {
                let jn = world.get::<JointDistance2D>(row.joint).unwrap().jn;
                let v_rel = super::relative_velocity(world, row.a, row.b, row.r_a, row.r_b);
                let cdot = v_rel.dot(row.normal);
                let lambda = row.mass.mul((cdot + row.bias + row.gamma_k.mul(jn)).neg());
                let jn_new = jn + lambda;
                let dj = jn_new - jn;
                super::apply_joint_impulse(world, row.a, row.b, row.r_a, row.r_b, row.normal, dj);
                crate::sleep::wake_on_impulse(world, row.a, dj.abs());
                crate::sleep::wake_on_impulse(world, row.b, dj.abs());
                world.get_mut::<JointDistance2D>(row.joint).unwrap().jn = jn_new;
            }
        }

        for row in &rows {
            let joint = *world.get::<JointDistance2D>(row.joint).unwrap();
            if joint.jn.abs() > joint.break_impulse {
                let event = crate::resources::JointBrokenEvent {
                    joint: row.joint,
                    a: row.a,
                    b: row.b,
                    kind: JointKind::Distance,
                    frame: world.frame(),
                };
                world.get_mut::<JointDistance2D>(row.joint).unwrap().jn = Fx::ZERO;
                world.get_mut::<JointDistance2D>(row.joint).unwrap().broken = true;
                world.resource_mut::<crate::resources::JointEvents2D>().channel.single_write(event);
            }
        }
    }
}
