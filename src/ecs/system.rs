//! System trait and the deterministic `after`/`before` scheduler (spec §4.12).

use std::collections::HashMap;

use super::world::World;
use crate::error::PhysicsError;

/// A unit of per-tick work. Mirrors the shape of a `specs`-style system (a `run` method
/// taking the data it needs) but against this crate's own [`World`], since ECS
/// iteration order is part of the deterministic contract (spec §9).
pub trait System {
    /// Stable name used for `after`/`before` dependency declarations and tracing spans.
    fn name(&self) -> &'static str;

    fn run(&mut self, world: &mut World);
}

struct Entry {
    system: Box<dyn System>,
    after: Vec<&'static str>,
    before: Vec<&'static str>,
}

/// Resolves a fixed, topologically-sorted execution order for its systems once at
/// build time (spec §4.12), then runs that order every tick with no further graph work.
/// Per spec §5, execution is single-threaded and cooperative: systems run to completion
/// in the resolved order, nothing yields or suspends mid-tick.
#[derive(Default)]
pub struct Scheduler {
    entries: Vec<Entry>,
    index_of: HashMap<&'static str, usize>,
    order: Option<Vec<usize>>,
}

impl Scheduler {
    pub fn new() -> Scheduler {
        Scheduler::default()
    }

    /// Register a system with its dependency names. `after`/`before` reference other
    /// systems' [`System::name`]; insertion order is the tie-break for anything the
    /// dependency graph leaves unordered (spec §4.12).
    pub fn add(
        &mut self,
        system: impl System + 'static,
        after: &[&'static str],
        before: &[&'static str],
    ) -> &mut Self {
        let name = system.name();
        let index = self.entries.len();
        self.entries.push(Entry {
            system: Box::new(system),
            after: after.to_vec(),
            before: before.to_vec(),
        });
        self.index_of.insert(name, index);
        self.order = None;
        self
    }

    /// Resolve the topological order. Idempotent; re-run automatically by [`Self::run`]
    /// if systems were added since the last build.
    pub fn build(&mut self) -> Result<(), PhysicsError> {
        let n = self.entries.len();
        let mut edges: Vec<Vec<usize>> = vec![Vec::new(); n]; // edges[a] = things that must come after a
        let mut indegree = vec![0usize; n];

        for (i, entry) in self.entries.iter().enumerate() {
            for dep in &entry.after {
                let &j = self
                    .index_of
                    .get(dep)
                    .ok_or(PhysicsError::UnknownStage(self.entries[i].system.name(), dep))?;
                edges[j].push(i);
                indegree[i] += 1;
            }
            for dep in &entry.before {
                let &j = self
                    .index_of
                    .get(dep)
                    .ok_or(PhysicsError::UnknownStage(self.entries[i].system.name(), dep))?;
                edges[i].push(j);
                indegree[j] += 1;
            }
        }

        // Kahn's algorithm; the ready set is kept in insertion order so remaining ties
        // break deterministically (spec §4.12).
        let mut ready: Vec<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);
        let mut cursor = 0;
        while cursor < ready.len() {
            let node = ready[cursor];
            cursor += 1;
            order.push(node);
            for &next in &edges[node] {
                indegree[next] -= 1;
                if indegree[next] == 0 {
                    ready.push(next);
                }
            }
        }

        if order.len() != n {
            let stuck = (0..n).find(|&i| indegree[i] > 0).unwrap();
            return Err(PhysicsError::CyclicSchedule { stage: self.entries[stuck].system.name() });
        }

        self.order = Some(order);
        Ok(())
    }

    /// Run every system once, in the resolved order.
    pub fn run(&mut self, world: &mut World) -> Result<(), PhysicsError> {
        if self.order.is_none() {
            self.build()?;
        }
        let order = self.order.clone().expect("scheduler built");
        for index in order {
            let entry = &mut self.entries[index];
            let span = tracing::trace_span!("system", name = entry.system.name());
            let _guard = span.enter();
            entry.system.run(world);
        }
        Ok(())
    }
}
