//! Module dependency graph
//!
//! Direct parents are declared per module; children and the transitive
//! closures in both directions are computed once at construction. The
//! graph is immutable afterwards and every lookup is a slice borrow.

use std::sync::OnceLock;

use crate::module::Module;

static GRAPH: OnceLock<DependencyGraph> = OnceLock::new();

/// Shared graph built from [`Module::parents`].
pub fn graph() -> &'static DependencyGraph {
    GRAPH.get_or_init(DependencyGraph::new)
}

#[derive(Debug, Clone)]
pub struct DependencyGraph {
    parents: [Vec<Module>; Module::COUNT],
    children: [Vec<Module>; Module::COUNT],
    ancestors: [Vec<Module>; Module::COUNT],
    descendants: [Vec<Module>; Module::COUNT],
    depth: usize,
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::from_parents(|m| m.parents().to_vec())
    }

    /// Build a graph from an arbitrary parent table.
    ///
    /// # Panics
    /// If the table contains a cycle (including a self edge).
    pub fn from_parents<F: Fn(Module) -> Vec<Module>>(parents_of: F) -> Self {
        let parents: [Vec<Module>; Module::COUNT] = std::array::from_fn(|i| {
            let mut ps: Vec<Module> = Vec::new();
            for p in parents_of(Module::ALL[i]) {
                if !ps.contains(&p) {
                    ps.push(p);
                }
            }
            ps
        });

        let mut children: [Vec<Module>; Module::COUNT] = Default::default();
        for m in Module::ALL {
            for &p in &parents[m.index()] {
                children[p.index()].push(m);
            }
        }

        let order = topo_order(&parents);
        let ancestors = closure(&parents, &order);
        let descendants = closure(&children, &order.iter().rev().copied().collect::<Vec<_>>());

        // Longest parent chain; bounds fixed-point iteration.
        let mut level = [0usize; Module::COUNT];
        for &m in &order {
            level[m.index()] = parents[m.index()]
                .iter()
                .map(|p| level[p.index()] + 1)
                .max()
                .unwrap_or(0);
        }
        let depth = level.iter().copied().max().unwrap_or(0);

        DependencyGraph { parents, children, ancestors, descendants, depth }
    }

    /// Direct dependencies only.
    #[inline]
    pub fn parents_of(&self, m: Module) -> &[Module] {
        &self.parents[m.index()]
    }

    /// Direct dependents only.
    #[inline]
    pub fn children_of(&self, m: Module) -> &[Module] {
        &self.children[m.index()]
    }

    /// Every module reachable through `parents_of`.
    #[inline]
    pub fn ancestors_of(&self, m: Module) -> &[Module] {
        &self.ancestors[m.index()]
    }

    /// Every module reachable through `children_of`.
    #[inline]
    pub fn descendants_of(&self, m: Module) -> &[Module] {
        &self.descendants[m.index()]
    }

    /// Modules with no parents.
    pub fn roots(&self) -> Vec<Module> {
        Module::ALL.iter().copied().filter(|m| self.parents[m.index()].is_empty()).collect()
    }

    /// Length of the longest parent chain (0 for a flat graph).
    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// Parents-before-children order. Panics on a cycle.
fn topo_order(parents: &[Vec<Module>; Module::COUNT]) -> Vec<Module> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        Active,
        Done,
    }

    fn visit(
        m: Module,
        parents: &[Vec<Module>; Module::COUNT],
        marks: &mut [Mark; Module::COUNT],
        out: &mut Vec<Module>,
    ) {
        match marks[m.index()] {
            Mark::Done => return,
            Mark::Active => panic!("module dependency graph has a cycle through '{m}'"),
            Mark::New => {}
        }
        marks[m.index()] = Mark::Active;
        for &p in &parents[m.index()] {
            visit(p, parents, marks, out);
        }
        marks[m.index()] = Mark::Done;
        out.push(m);
    }

    let mut marks = [Mark::New; Module::COUNT];
    let mut out = Vec::with_capacity(Module::COUNT);
    for m in Module::ALL {
        visit(m, parents, &mut marks, &mut out);
    }
    out
}

/// Transitive closure of `edges`, visiting nodes so every edge target is
/// closed before its source. Results are in canonical module order.
fn closure(edges: &[Vec<Module>; Module::COUNT], order: &[Module]) -> [Vec<Module>; Module::COUNT] {
    let mut reach = [[false; Module::COUNT]; Module::COUNT];
    for &m in order {
        for &n in &edges[m.index()] {
            reach[m.index()][n.index()] = true;
            let inherited = reach[n.index()];
            for (i, r) in inherited.iter().enumerate() {
                if *r {
                    reach[m.index()][i] = true;
                }
            }
        }
    }
    std::array::from_fn(|i| {
        Module::ALL.iter().copied().filter(|n| reach[i][n.index()]).collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use Module::*;

    #[test]
    fn direct_edges() {
        let g = DependencyGraph::new();
        assert!(g.parents_of(Buildings).is_empty());
        assert_eq!(g.parents_of(Beds), &[Rooms, Floors, Buildings]);
        assert_eq!(g.children_of(Rooms), &[Beds]);
        assert_eq!(
            g.children_of(Buildings),
            &[Floors, Rooms, Beds, Tenants, Bookings, Payments, Invoices, Expenses]
        );
        assert!(g.children_of(Expenses).is_empty());
    }

    #[test]
    fn children_invert_parents() {
        let g = DependencyGraph::new();
        for m in Module::ALL {
            for &p in g.parents_of(m) {
                assert!(g.children_of(p).contains(&m), "{p} -> {m}");
            }
            for &c in g.children_of(m) {
                assert!(g.parents_of(c).contains(&m), "{m} <- {c}");
            }
        }
    }

    #[test]
    fn closures() {
        let g = DependencyGraph::new();
        assert_eq!(g.ancestors_of(Beds), &[Buildings, Floors, Rooms]);
        assert_eq!(g.descendants_of(Floors), &[Rooms, Beds]);
        assert_eq!(g.descendants_of(Buildings).len(), Module::COUNT - 1);
        assert_eq!(g.roots(), vec![Buildings]);
        assert_eq!(g.depth(), 3);
    }

    #[test]
    fn closure_follows_chains_not_declared_directly() {
        // Beds only names Rooms; Floors and Buildings come transitively.
        let g = DependencyGraph::from_parents(|m| match m {
            Floors => vec![Buildings],
            Rooms => vec![Floors],
            Beds => vec![Rooms],
            _ => vec![],
        });
        assert_eq!(g.ancestors_of(Beds), &[Buildings, Floors, Rooms]);
        assert_eq!(g.descendants_of(Buildings), &[Floors, Rooms, Beds]);
        assert_eq!(g.roots().len(), 6);
    }

    #[test]
    #[should_panic(expected = "cycle")]
    fn cycle_is_rejected() {
        DependencyGraph::from_parents(|m| match m {
            Buildings => vec![Beds],
            other => other.parents().to_vec(),
        });
    }

    #[test]
    #[should_panic(expected = "cycle")]
    fn self_edge_is_rejected() {
        DependencyGraph::from_parents(|m| if m == Tenants { vec![Tenants] } else { vec![] });
    }

    #[test]
    fn shared_instance() {
        assert!(std::ptr::eq(graph(), graph()));
        assert_eq!(graph().depth(), 3);
    }
}
