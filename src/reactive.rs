//! Explicit dependency graph for derived view values.
//!
//! Every derived value registers the inputs and derived values it reads and
//! the inputs it may overwrite. The graph is sorted once when built; a run
//! recomputes only the values reachable from the changed inputs, each at most
//! once, upstream before downstream.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use std::collections::{HashSet, VecDeque};
use std::fmt::Debug;
use std::hash::Hash;

/// Something a derived value reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source<I, N> {
    Input(I),
    Derived(N),
}

#[derive(Debug, Clone)]
struct Registration<I, N> {
    node: N,
    reads: Vec<Source<I, N>>,
    writes: Vec<I>,
}

impl<I: PartialEq, N: PartialEq> Registration<I, N> {
    /// True if `self` has to run before `other`.
    fn feeds(&self, other: &Self) -> bool {
        other.reads.iter().any(|source| match source {
            Source::Derived(n) => *n == self.node,
            Source::Input(i) => self.writes.contains(i),
        })
    }
}

pub struct GraphBuilder<I, N> {
    registrations: Vec<Registration<I, N>>,
}

impl<I, N> Default for GraphBuilder<I, N> {
    fn default() -> Self {
        Self {
            registrations: Vec::new(),
        }
    }
}

impl<I, N> GraphBuilder<I, N>
where
    I: Copy + Eq + Hash + Debug,
    N: Copy + Eq + Hash + Debug,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a derived value with the sources it reads and the inputs it writes.
    pub fn node(mut self, node: N, reads: &[Source<I, N>], writes: &[I]) -> Self {
        self.registrations.push(Registration {
            node,
            reads: reads.to_vec(),
            writes: writes.to_vec(),
        });
        self
    }

    /// Sort the registrations topologically (ties keep registration order).
    pub fn build(self) -> Result<DependencyGraph<I, N>> {
        let regs = self.registrations;

        let mut seen = HashSet::new();
        for reg in &regs {
            if !seen.insert(reg.node) {
                return Err(eyre!("{:?} is registered twice", reg.node));
            }
            for source in &reg.reads {
                if let Source::Derived(n) = source {
                    if !regs.iter().any(|r| r.node == *n) {
                        return Err(eyre!("{:?} reads unregistered {:?}", reg.node, n));
                    }
                }
            }
        }

        let mut indegree: Vec<usize> = regs
            .iter()
            .enumerate()
            .map(|(i, reg)| {
                regs.iter()
                    .enumerate()
                    .filter(|(j, other)| *j != i && other.feeds(reg))
                    .count()
            })
            .collect();

        let mut ready: VecDeque<usize> = (0..regs.len()).filter(|&i| indegree[i] == 0).collect();
        let mut order = Vec::with_capacity(regs.len());
        while let Some(i) = ready.pop_front() {
            order.push(i);
            for j in 0..regs.len() {
                if j != i && regs[i].feeds(&regs[j]) {
                    indegree[j] -= 1;
                    if indegree[j] == 0 {
                        ready.push_back(j);
                    }
                }
            }
        }

        if order.len() != regs.len() {
            let stuck: Vec<N> = (0..regs.len())
                .filter(|i| !order.contains(i))
                .map(|i| regs[i].node)
                .collect();
            return Err(eyre!("dependency cycle between {:?}", stuck));
        }

        let mut slots: Vec<Option<Registration<I, N>>> = regs.into_iter().map(Some).collect();
        let sorted = order
            .into_iter()
            .filter_map(|i| slots[i].take())
            .collect();
        Ok(DependencyGraph { sorted })
    }
}

/// Derived values in dependency order.
#[derive(Debug, Clone)]
pub struct DependencyGraph<I, N> {
    sorted: Vec<Registration<I, N>>,
}

impl<I, N> DependencyGraph<I, N>
where
    I: Copy + Eq + Hash + Debug,
    N: Copy + Eq + Hash + Debug,
{
    /// Derived values in the order they are recomputed.
    pub fn order(&self) -> Vec<N> {
        self.sorted.iter().map(|r| r.node).collect()
    }

    /// Recompute everything affected by `changed`.
    ///
    /// `recompute` is called once per affected node and returns the inputs it
    /// actually changed; those propagate to later nodes in the same run.
    /// Returns the nodes that were recomputed, in order.
    pub fn run<F>(&self, changed: impl IntoIterator<Item = I>, mut recompute: F) -> Vec<N>
    where
        F: FnMut(N) -> Vec<I>,
    {
        let mut dirty_inputs: HashSet<I> = changed.into_iter().collect();
        let mut recomputed: Vec<N> = Vec::new();

        for reg in &self.sorted {
            let affected = reg.reads.iter().any(|source| match source {
                Source::Input(i) => dirty_inputs.contains(i),
                Source::Derived(n) => recomputed.contains(n),
            });
            if !affected {
                continue;
            }
            let written = recompute(reg.node);
            for input in written {
                debug_assert!(
                    reg.writes.contains(&input),
                    "{:?} wrote undeclared {:?}",
                    reg.node,
                    input
                );
                dirty_inputs.insert(input);
            }
            recomputed.push(reg.node);
        }

        recomputed
    }
}
