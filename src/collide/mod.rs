//! Narrowphase contact generation (spec §4.4): turns broadphase pairs into contacts.

mod circle_circle;
mod hull_circle;
mod hull_hull;

use crate::components::{ConvexHull2D, ShapeCircle};
use crate::contact::Contacts2D;
use crate::ecs::{Entity, System, World};
use crate::resources::BroadphasePairs;

/// Runs circle-circle, hull-circle, or hull-hull generation per broadphase pair
/// (whichever shape combination the pair's entities carry), then sorts the resulting
/// contact list by `(a, b)` (spec §4.4, invariant I4).
pub struct NarrowphaseSystem;

impl System for NarrowphaseSystem {
    fn name(&self) -> &'static str {
        "narrowphase"
    }

    fn run(&mut self, world: &mut World) {
        let pairs = world.resource::<BroadphasePairs>().pairs.clone();
        let mut generated = Vec::with_capacity(pairs.len());
        for (a, b) in pairs {
            if let Some(contact) = generate_pair(world, a, b) {
                generated.push(contact);
            }
        }

        let contacts = world.resource_mut::<Contacts2D>();
        contacts.list = generated;
        contacts.sort_canonical();
    }
}

fn generate_pair(world: &World, a: Entity, b: Entity) -> Option<crate::contact::Contact> {
    let key = crate::pairkey::make_pair_key(world, a, b).key;
    let a_circle = world.has::<ShapeCircle>(a);
    let b_circle = world.has::<ShapeCircle>(b);
    let a_hull = world.has::<ConvexHull2D>(a);
    let b_hull = world.has::<ConvexHull2D>(b);

    if a_circle && b_circle {
        circle_circle::generate(world, a, b, key)
    } else if a_hull && b_circle {
        hull_circle::generate(world, a, b, key)
    } else if a_circle && b_hull {
        hull_circle::generate(world, b, a, key).map(|mut c| {
            c.a = a;
            c.b = b;
            c.normal = c.normal.neg();
            c
        })
    } else if a_hull && b_hull {
        hull_hull::generate(world, a, b, key)
    } else {
        None
    }
}
