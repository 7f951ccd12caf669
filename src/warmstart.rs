//! Warm-start and commit (spec §4.7).

use crate::contact::{CachedPoint, ContactCache2D, Contacts2D};
use crate::ecs::System;
use crate::fx::{Fx, Vec2Fx};

/// `cos(75 deg)`, the minimum normal-match dot product for a cached point to still
/// apply (spec §4.7).
const NORMAL_MATCH_COS: Fx = Fx::from_raw(16_962);
/// Squared position-drift tolerance in world units (spec §4.7, §9's resolution of the
/// source's `mul(MAX_POSITION_DRIFT, MAX_POSITION_DRIFT)` ambiguity: `0.1^2 = 0.01`).
const POSITION_DRIFT_SQ: Fx = Fx::from_raw(655);

pub struct WarmStartSystem;

impl System for WarmStartSystem {
    fn name(&self) -> &'static str {
        "warm_start"
    }

    fn run(&mut self, world: &mut crate::ecs::World) {
        world.resource_scope::<ContactCache2D, ()>(|world, cache| {
            let contacts = world.resource_mut::<Contacts2D>();
            for contact in &mut contacts.list {
                match cache.get(contact.key, contact.feature_id) {
                    Some(cached) if matches(cached, contact) => {
                        contact.jn = cached.jn;
                        contact.jt = cached.jt;
                    }
                    _ => {
                        contact.jn = Fx::ZERO;
                        contact.jt = Fx::ZERO;
                        cache.set(
                            contact.key,
                            contact.feature_id,
                            Fx::ZERO,
                            Fx::ZERO,
                            contact.point.x,
                            contact.point.y,
                            contact.normal.x,
                            contact.normal.y,
                        );
                    }
                }
            }
        });
    }
}

fn matches(cached: &CachedPoint, contact: &crate::contact::Contact) -> bool {
    let cached_normal = Vec2Fx::new(cached.nx, cached.ny);
    let cached_point = Vec2Fx::new(cached.px, cached.py);
    if cached_normal.dot(contact.normal) < NORMAL_MATCH_COS {
        return false;
    }
    (contact.point - cached_point).len_sq() <= POSITION_DRIFT_SQ
}

/// Writes solved impulses back into the persistent cache and the lightweight
/// `Contacts2D.prev` map, run after the Gauss-Seidel solver (spec §4.7).
pub struct CommitContactsSystem;

impl System for CommitContactsSystem {
    fn name(&self) -> &'static str {
        "commit_contacts"
    }

    fn run(&mut self, world: &mut crate::ecs::World) {
        world.resource_scope::<ContactCache2D, ()>(|world, cache| {
            let contacts = world.resource_mut::<Contacts2D>();
            contacts.prev.clear();
            for contact in &contacts.list {
                cache.update_impulses(contact.key, contact.feature_id, contact.jn, contact.jt);
                contacts.prev.insert(contact.key, (contact.jn, contact.jt));
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::World;

    #[test]
    fn matching_geometry_keeps_cached_impulse() {
        let mut world = World::new(Fx::from_f64(1.0 / 60.0));
        world.insert_resource(ContactCache2D::new());
        world.insert_resource(Contacts2D::new());

        let a = world.spawn();
        let b = world.spawn();
        let key = crate::pairkey::make_pair_key(&world, a, b).key;
        world.resource_mut::<ContactCache2D>().set(
            key,
            0,
            Fx::from_f64(1.0),
            Fx::from_f64(0.1),
            Fx::ZERO,
            Fx::ZERO,
            Fx::ONE,
            Fx::ZERO,
        );
        world.resource_mut::<Contacts2D>().list.push(crate::contact::Contact::new_regular(
            a,
            b,
            key,
            0,
            Vec2Fx::new(Fx::ONE, Fx::ZERO),
            Vec2Fx::ZERO,
            Fx::from_f64(0.01),
            Fx::ZERO,
            Fx::ZERO,
        ));

        WarmStartSystem.run(&mut world);
        assert_eq!(world.resource::<Contacts2D>().list[0].jn, Fx::from_f64(1.0));
    }

    #[test]
    fn mismatched_normal_resets_impulse() {
        let mut world = World::new(Fx::from_f64(1.0 / 60.0));
        world.insert_resource(ContactCache2D::new());
        world.insert_resource(Contacts2D::new());

        let a = world.spawn();
        let b = world.spawn();
        let key = crate::pairkey::make_pair_key(&world, a, b).key;
        world.resource_mut::<ContactCache2D>().set(
            key,
            0,
            Fx::from_f64(1.0),
            Fx::ZERO,
            Fx::ZERO,
            Fx::ZERO,
            Fx::ONE,
            Fx::ZERO,
        );
        world.resource_mut::<Contacts2D>().list.push(crate::contact::Contact::new_regular(
            a,
            b,
            key,
            0,
            Vec2Fx::new(Fx::ZERO, Fx::ONE), // perpendicular to cached normal
            Vec2Fx::ZERO,
            Fx::from_f64(0.01),
            Fx::ZERO,
            Fx::ZERO,
        ));

        WarmStartSystem.run(&mut world);
        assert_eq!(world.resource::<Contacts2D>().list[0].jn, Fx::ZERO);
    }

    #[test]
    fn commit_writes_back_solved_impulses() {
        let mut world = World::new(Fx::from_f64(1.0 / 60.0));
        world.insert_resource(ContactCache2D::new());
        world.insert_resource(Contacts2D::new());

        let a = world.spawn();
        let b = world.spawn();
        let key = crate::pairkey::make_pair_key(&world, a, b).key;
        let mut contact = crate::contact::Contact::new_regular(
            a,
            b,
            key,
            0,
            Vec2Fx::new(Fx::ONE, Fx::ZERO),
            Vec2Fx::ZERO,
            Fx::ZERO,
            Fx::ZERO,
            Fx::ZERO,
        );
        contact.jn = Fx::from_f64(3.0);
        contact.jt = Fx::from_f64(0.5);
        world.resource_mut::<Contacts2D>().list.push(contact);

        CommitContactsSystem.run(&mut world);
        assert_eq!(world.resource::<ContactCache2D>().get(key, 0).unwrap().jn, Fx::from_f64(3.0));
        assert_eq!(world.resource::<Contacts2D>().prev.get(&key), Some(&(Fx::from_f64(3.0), Fx::from_f64(0.5))));
    }
}
