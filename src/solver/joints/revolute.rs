//! Revolute (pin) joint: builder + 2x2 Gauss-Seidel solver (spec §4.9).

use crate::components::{Body2D, RevoluteJoint2D};
use crate::ecs::{Entity, System, World};
use crate::fx::{Fx, Vec2Fx};
use crate::geometry::angle_sin_cos;
use crate::resources::{JointKind, RevoluteBatch2D, RevoluteRow2D};

pub const ITER_R: u32 = 8;

fn world_anchor(body: &Body2D, local: Vec2Fx) -> Vec2Fx {
    let (s, c) = angle_sin_cos(body.angle);
    body.pos() + crate::geometry::rotate(local, s, c)
}

/// Precomputes the 2x2 inverse effective-mass matrix (with `gamma` softness on the
/// diagonal) once per frame, inverted analytically since it's always 2x2.
pub struct RevoluteJointBuildSystem;

impl System for RevoluteJointBuildSystem {
    fn name(&self) -> &'static str {
        "build_revolute_joints"
    }

    fn run(&mut self, world: &mut World) {
        let dt = world.dt();
        let mut entities: Vec<Entity> = world.iter_entities_with::<RevoluteJoint2D>();
        entities.sort_by_key(|&e| {
            let j = world.get::<RevoluteJoint2D>(e).unwrap();
            (crate::pairkey::make_pair_key(world, j.body_a, j.body_b).key, e.id())
        });

        let mut rows = Vec::new();
        for joint_entity in entities {
            let joint = *world.get::<RevoluteJoint2D>(joint_entity).unwrap();
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
            let c = (body_b.pos() + r_b) - (body_a.pos() + r_a);

            let im = body_a.inv_mass + body_b.inv_mass;
            // K = [[im + iA*ra.y^2 + iB*rb.y^2, -iA*ra.x*ra.y - iB*rb.x*rb.y],
            //      [-iA*ra.x*ra.y - iB*rb.x*rb.y, im + iA*ra.x^2 + iB*rb.x^2]] + gamma*I
            let k00 = im + body_a.inv_i.mul(r_a.y.mul(r_a.y)) + body_b.inv_i.mul(r_b.y.mul(r_b.y)) + joint.gamma;
            let k01 = (body_a.inv_i.mul(r_a.x).mul(r_a.y) + body_b.inv_i.mul(r_b.x).mul(r_b.y)).neg();
            let k10 = k01;
            let k11 = im + body_a.inv_i.mul(r_a.x.mul(r_a.x)) + body_b.inv_i.mul(r_b.x.mul(r_b.x)) + joint.gamma;

            let det = k00.mul(k11) - k01.mul(k10);
            let (k_inv_00, k_inv_01, k_inv_10, k_inv_11) = if det.is_zero() {
                (Fx::ZERO, Fx::ZERO, Fx::ZERO, Fx::ZERO)
            } else {
                (k11.div(det), k01.neg().div(det), k10.neg().div(det), k00.div(det))
            };

            rows.push(RevoluteRow2D {
                joint: joint_entity,
                a: joint.body_a,
                b: joint.body_b,
                r_a,
                r_b,
                k_inv_00,
                k_inv_01,
                k_inv_10,
                k_inv_11,
                bias: c.scale(joint.beta.div(dt)),
                gamma_k: joint.gamma.div(dt),
            });
        }

        world.resource_mut::<RevoluteBatch2D>().rows = rows;
    }
}

pub struct RevoluteJointSolveSystem;

impl System for RevoluteJointSolveSystem {
    fn name(&self) -> &'static str {
        "solve_revolute_joints"
    }

    fn run(&mut self, world: &mut World) {
        let rows = world.resource::<RevoluteBatch2D>().rows.clone();

        for row in &rows {
            let joint = *world.get::<RevoluteJoint2D>(row.joint).unwrap();
            let impulse = Vec2Fx::new(joint.jx, joint.jy);
            if !impulse.x.is_zero() || !impulse.y.is_zero() {
                super::apply_joint_impulse_vec(world, row.a, row.b, row.r_a, row.r_b, impulse);
            }
        }

        for _ in 0..ITER_R {
            for row in &rows {
                let joint = *world.get::<RevoluteJoint2D>(row.joint).unwrap();
                let v_rel = super::relative_velocity(world, row.a, row.b, row.r_a, row.r_b);
                let rhs_x = (v_rel.x + row.bias.x + row.gamma_k.mul(joint.jx)).neg();
                let rhs_y = (v_rel.y + row.bias.y + row.gamma_k.mul(joint.jy)).neg();
                let dx = row.k_inv_00.mul(rhs_x) + row.k_inv_01.mul(rhs_y);
                let dy = row.k_inv_10.mul(rhs_x) + row.k_inv_11.mul(rhs_y);

                super::apply_joint_impulse_vec(world, row.a, row.b, row.r_a, row.r_b, Vec2Fx::new(dx, dy));
                let dj_mag = Vec2Fx::new(dx, dy).len_approx();
                crate::sleep::wake_on_impulse(world, row.a, dj_mag);
                crate::sleep::wake_on_impulse(world, row.b, dj_mag);
                let j = world.get_mut::<RevoluteJoint2D>(row.joint).unwrap();
                j.jx = j.jx + dx;
                j.jy = j.jy + dy;
            }
        }

        for row in &rows {
            let joint = *world.get::<RevoluteJoint2D>(row.joint).unwrap();
            let magnitude = Vec2Fx::new(joint.jx, joint.jy).len_approx();
            if magnitude > joint.break_impulse {
                let event = crate::resources::JointBrokenEvent {
                    joint: row.joint,
                    a: row.a,
                    b: row.b,
                    kind: JointKind::Revolute,
                    frame: world.frame(),
                };
                let j = world.get_mut::<RevoluteJoint2D>(row.joint).unwrap();
                j.jx = Fx::ZERO;
                j.jy = Fx::ZERO;
                j.broken = true;
                world.resource_mut::<crate::resources::JointEvents2D>().channel.single_write(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pinned_world() -> World {
        let mut world = World::new(Fx::from_f64(1.0 / 60.0));
        world.insert_resource(RevoluteBatch2D::new());
        world.insert_resource(crate::resources::JointEvents2D::new());
        let a = world.spawn();
        world.insert(a, Body2D::new_static(Fx::ZERO, Fx::ZERO));
        let b = world.spawn();
        let mut bb = Body2D::new_dynamic(Fx::from_f64(1.0), Fx::ZERO, Fx::ONE, Fx::ONE);
        bb.vy = Fx::from_f64(2.0);
        world.insert(b, bb);
        let joint = world.spawn();
        world.insert(
            joint,
            RevoluteJoint2D {
                body_a: a,
                body_b: b,
                anchor_a: Vec2Fx::new(Fx::ONE, Fx::ZERO),
                anchor_b: Vec2Fx::ZERO,
                beta: Fx::from_f64(0.2),
                gamma: Fx::ZERO,
                jx: Fx::ZERO,
                jy: Fx::ZERO,
                break_impulse: Fx::from_f64(1000.0),
                broken: false,
            },
        );
        world
    }

    #[test]
    fn pin_arrests_separating_velocity() {
        let mut world = pinned_world();
        let joint = world.iter_entities_with::<RevoluteJoint2D>()[0];
        let _ = joint;
        RevoluteJointBuildSystem.run(&mut world);
        RevoluteJointSolveSystem.run(&mut world);
        let b_entity = crate::ecs::Entity::from_raw(1);
        let b = world.get::<Body2D>(b_entity).unwrap();
        assert!(b.vy.abs().to_f64() < 1.5);
    }

    #[test]
    fn excess_impulse_breaks_revolute_joint() {
        let mut world = pinned_world();
        world.get_mut::<RevoluteJoint2D>(crate::ecs::Entity::from_raw(2)).unwrap().break_impulse =
            Fx::from_f64(0.01);
        RevoluteJointBuildSystem.run(&mut world);
        RevoluteJointSolveSystem.run(&mut world);
        assert!(world.get::<RevoluteJoint2D>(crate::ecs::Entity::from_raw(2)).unwrap().broken);
    }
}
