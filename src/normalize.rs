//! Matrix normalization
//!
//! Two invariants hold for every scope after any completed edit:
//!
//! - upward closure: a module holding any bit has `view` on every ancestor
//! - downward closure: a module without `view` has no bits on any descendant
//!
//! `normalize` restores both with one upward and one downward pass over the
//! precomputed closures. Grants win inside `normalize`; an explicit
//! revocation of `view` must go through [`revoke_view_cascade`] first or
//! the upward pass would restore it.

use tracing::debug;

use crate::graph::DependencyGraph;
use crate::matrix::{PermissionMatrix, PermissionRow, ScopeMatrix};
use crate::module::Module;

/// Run the upward pass then the downward pass. Returns true if any row changed.
pub fn normalize(scope: &mut ScopeMatrix, graph: &DependencyGraph) -> bool {
    let before = scope.clone();

    for m in Module::ALL {
        if scope.row(m).has_any_permission() {
            for &a in graph.ancestors_of(m) {
                scope.row_mut(a).view = true;
            }
        }
    }

    for p in Module::ALL {
        if !scope.row(p).view {
            for &d in graph.descendants_of(p) {
                *scope.row_mut(d) = PermissionRow::NONE;
            }
        }
    }

    let changed = *scope != before;
    if changed {
        debug!(
            rows = Module::ALL.iter().filter(|m| scope.row(**m) != before.row(**m)).count(),
            "normalization adjusted rows"
        );
    }
    changed
}

/// Repeat `normalize` until nothing changes. The bound is derived from the
/// graph depth; exceeding it means the graph is broken.
///
/// # Panics
/// If no fixed point is reached within the bound.
pub fn normalize_to_fixed_point(scope: &mut ScopeMatrix, graph: &DependencyGraph) -> usize {
    let limit = graph.depth() + 2;
    for pass in 0..limit {
        if !normalize(scope, graph) {
            return pass;
        }
    }
    panic!("normalization did not converge within {limit} passes");
}

/// Clear `m` and every descendant of `m`. Used when `view` on `m` is
/// revoked explicitly: without `view` the module's other bits go too.
pub fn revoke_view_cascade(scope: &mut ScopeMatrix, m: Module, graph: &DependencyGraph) {
    let cleared: Vec<Module> = std::iter::once(m)
        .chain(graph.descendants_of(m).iter().copied())
        .filter(|d| scope.row(*d).has_any_permission())
        .collect();
    for &d in &cleared {
        *scope.row_mut(d) = PermissionRow::NONE;
    }
    if !cleared.is_empty() {
        debug!(module = %m, cleared = cleared.len(), "view revoked, cleared descendants");
    }
}

impl PermissionMatrix {
    /// Normalize every scope. Returns the number of scopes changed.
    pub fn normalize_all(&mut self, graph: &DependencyGraph) -> usize {
        self.scopes_mut()
            .map(|(_, scope)| normalize(scope, graph))
            .filter(|changed| *changed)
            .count()
    }
}

/// A broken invariant found by [`check_invariants`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    /// `module` holds a bit but `ancestor` lacks `view`.
    MissingAncestorView { module: Module, ancestor: Module },
    /// `module` lacks `view` but `descendant` holds a bit.
    OrphanedDescendant { module: Module, descendant: Module },
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::MissingAncestorView { module, ancestor } => {
                write!(f, "{module} has permissions but {ancestor} is not viewable")
            }
            Violation::OrphanedDescendant { module, descendant } => {
                write!(f, "{module} is not viewable but {descendant} has permissions")
            }
        }
    }
}

/// List every invariant violation in `scope`. Empty means consistent.
pub fn check_invariants(scope: &ScopeMatrix, graph: &DependencyGraph) -> Vec<Violation> {
    let mut out = Vec::new();
    for m in Module::ALL {
        if scope.row(m).has_any_permission() {
            for &a in graph.ancestors_of(m) {
                if !scope.row(a).view {
                    out.push(Violation::MissingAncestorView { module: m, ancestor: a });
                }
            }
        }
        if !scope.row(m).view {
            for &d in graph.descendants_of(m) {
                if scope.row(d).has_any_permission() {
                    out.push(Violation::OrphanedDescendant { module: m, descendant: d });
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::graph;
    use Module::*;

    fn with(rows: &[(Module, u8)]) -> ScopeMatrix {
        let mut s = ScopeMatrix::new();
        for &(m, mask) in rows {
            *s.row_mut(m) = PermissionRow::from_mask(mask);
        }
        s
    }

    #[test]
    fn empty_is_consistent() {
        let mut s = ScopeMatrix::new();
        assert!(!normalize(&mut s, graph()));
        assert!(check_invariants(&s, graph()).is_empty());
    }

    #[test]
    fn grant_lifts_view_on_ancestors_only() {
        let mut s = with(&[(Beds, crate::module::ADD)]);
        assert!(normalize(&mut s, graph()));
        for a in [Rooms, Floors, Buildings] {
            assert_eq!(*s.row(a), PermissionRow { view: true, ..Default::default() });
        }
        assert!(!s.row(Beds).view);
        assert!(s.row(Beds).add);
    }

    #[test]
    fn own_view_not_implied() {
        let mut s = with(&[(Buildings, crate::module::DELETE)]);
        assert!(!normalize(&mut s, graph()));
        assert!(!s.row(Buildings).view);
    }

    #[test]
    fn reports_violations() {
        let s = with(&[(Rooms, crate::module::EDIT)]);
        let v = check_invariants(&s, graph());
        assert!(v.contains(&Violation::MissingAncestorView { module: Rooms, ancestor: Floors }));
        assert!(v.contains(&Violation::OrphanedDescendant { module: Buildings, descendant: Rooms }));
        assert!(v[0].to_string().contains("not viewable"));
    }

    #[test]
    fn revoke_cascade_clears_whole_subtree() {
        let mut s = ScopeMatrix::filled(PermissionRow::ALL);
        revoke_view_cascade(&mut s, Floors, graph());
        assert_eq!(*s.row(Rooms), PermissionRow::NONE);
        assert_eq!(*s.row(Beds), PermissionRow::NONE);
        assert_eq!(*s.row(Floors), PermissionRow::NONE);
        assert_eq!(*s.row(Buildings), PermissionRow::ALL);
        assert_eq!(*s.row(Tenants), PermissionRow::ALL);
    }

    #[test]
    fn fixed_point_on_flat_chain_graph() {
        let chain = DependencyGraph::from_parents(|m| match m {
            Floors => vec![Buildings],
            Rooms => vec![Floors],
            Beds => vec![Rooms],
            _ => vec![],
        });
        let mut s = with(&[(Beds, crate::module::VIEW)]);
        let passes = normalize_to_fixed_point(&mut s, &chain);
        assert!(passes >= 1);
        assert!(check_invariants(&s, &chain).is_empty());
        assert!(s.row(Buildings).view);
    }
}
