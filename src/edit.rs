//! Edit operations, presets and role classification
//!
//! Every edit is a raw mutation of one scope followed by the revocation
//! cascade (when `view` was cleared) and a full [`normalize`]. Callers never
//! observe a scope between those steps.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PermError;
use crate::graph::{graph, DependencyGraph};
use crate::matrix::{PermissionMatrix, PermissionRow, ScopeId, ScopeMatrix};
use crate::module::{Bit, Module, ADD, ALL_BITS, EDIT, VIEW};
use crate::normalize::{normalize, revoke_view_cascade};

/// Classification of a single row, as shown next to each module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    None,
    Admin,
    Manager,
    ReadOnly,
    Custom,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Role::None => "None",
            Role::Admin => "Admin",
            Role::Manager => "Manager",
            Role::ReadOnly => "Read-only",
            Role::Custom => "Custom",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify a row by its exact bit pattern.
pub fn classify(row: &PermissionRow) -> Role {
    match row.mask() {
        0 => Role::None,
        ALL_BITS => Role::Admin,
        m if m == VIEW | ADD | EDIT => Role::Manager,
        VIEW => Role::ReadOnly,
        _ => Role::Custom,
    }
}

impl ScopeMatrix {
    /// Classification of every module, in canonical order.
    pub fn roles(&self) -> Vec<(Module, Role)> {
        self.iter().map(|(m, row)| (m, classify(row))).collect()
    }

    /// The role shared by every module, if there is one.
    pub fn uniform_role(&self) -> Option<Role> {
        let first = classify(self.row(Module::ALL[0]));
        self.iter().all(|(_, row)| classify(row) == first).then_some(first)
    }
}

/// Named bulk assignment over a whole scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    ReadOnly,
    Manager,
    #[serde(alias = "all")]
    Admin,
}

impl Preset {
    pub fn as_str(self) -> &'static str {
        match self {
            Preset::ReadOnly => "read_only",
            Preset::Manager => "manager",
            Preset::Admin => "admin",
        }
    }

    /// Row assigned to every module by this preset.
    pub fn row(self) -> PermissionRow {
        match self {
            Preset::ReadOnly => PermissionRow::from_mask(VIEW),
            Preset::Manager => PermissionRow::from_mask(VIEW | ADD | EDIT),
            Preset::Admin => PermissionRow::ALL,
        }
    }
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Preset {
    type Err = PermError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "read_only" => Ok(Preset::ReadOnly),
            "manager" => Ok(Preset::Manager),
            "admin" | "all" => Ok(Preset::Admin),
            _ => Err(PermError::UnknownPreset(value.to_string())),
        }
    }
}

/// One edit against one scope.
///
/// Only a `view` bit that actually goes from true to false triggers the
/// revocation cascade; clearing an already-absent `view` leaves the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Edit {
    /// One bit on one module.
    SetBit { module: Module, bit: Bit, value: bool },
    /// All four bits on one module.
    SetModule { module: Module, value: bool },
    /// One bit on every module.
    SetColumn { bit: Bit, value: bool },
    /// Every bit on every module.
    SetAll { value: bool },
    Preset { preset: Preset },
}

impl Edit {
    /// Apply to a scope slice and normalize it.
    pub fn apply_to(&self, scope: &mut ScopeMatrix, graph: &DependencyGraph) {
        let mut revoked: Vec<Module> = Vec::new();
        match *self {
            Edit::SetBit { module, bit, value } => {
                let had_view = scope.row(module).view;
                scope.row_mut(module).set(bit, value);
                if bit == Bit::View && had_view && !value {
                    revoked.push(module);
                }
            }
            Edit::SetModule { module, value } => {
                let had_view = scope.row(module).view;
                scope.row_mut(module).set_all(value);
                if had_view && !value {
                    revoked.push(module);
                }
            }
            Edit::SetColumn { bit, value } => {
                for m in Module::ALL {
                    if bit == Bit::View && !value && scope.row(m).view {
                        revoked.push(m);
                    }
                    scope.row_mut(m).set(bit, value);
                }
            }
            Edit::SetAll { value } => {
                for m in Module::ALL {
                    scope.row_mut(m).set_all(value);
                }
            }
            Edit::Preset { preset } => {
                let row = preset.row();
                for m in Module::ALL {
                    *scope.row_mut(m) = row;
                }
            }
        }
        for m in revoked {
            revoke_view_cascade(scope, m, graph);
        }
        normalize(scope, graph);
    }
}

/// Apply `edit` to `scope` (created if absent) using the shared graph.
pub fn apply<'a>(matrix: &'a mut PermissionMatrix, scope: impl Into<ScopeId>, edit: &Edit) -> &'a ScopeMatrix {
    let scope = scope.into();
    debug!(%scope, ?edit, "applying edit");
    let slice = matrix.ensure_scope(scope);
    edit.apply_to(slice, graph());
    slice
}

/// Value in, value out form of [`apply`].
pub fn apply_edit(mut matrix: PermissionMatrix, scope: impl Into<ScopeId>, edit: Edit) -> PermissionMatrix {
    apply(&mut matrix, scope, &edit);
    matrix
}

pub fn set_bit(matrix: &mut PermissionMatrix, scope: impl Into<ScopeId>, module: Module, bit: Bit, value: bool) {
    apply(matrix, scope, &Edit::SetBit { module, bit, value });
}

pub fn set_all_bits_for_module(matrix: &mut PermissionMatrix, scope: impl Into<ScopeId>, module: Module, value: bool) {
    apply(matrix, scope, &Edit::SetModule { module, value });
}

pub fn set_bit_across_modules(matrix: &mut PermissionMatrix, scope: impl Into<ScopeId>, bit: Bit, value: bool) {
    apply(matrix, scope, &Edit::SetColumn { bit, value });
}

pub fn set_all_bits_across_modules(matrix: &mut PermissionMatrix, scope: impl Into<ScopeId>, value: bool) {
    apply(matrix, scope, &Edit::SetAll { value });
}

pub fn apply_preset(matrix: &mut PermissionMatrix, scope: impl Into<ScopeId>, preset: Preset) {
    apply(matrix, scope, &Edit::Preset { preset });
}

type ChangeFn = Box<dyn FnMut(&PermissionMatrix) + Send>;

/// One staff-edit session: the matrix being edited, the selected scope and
/// an optional change callback fired once per completed edit.
pub struct MatrixEditor {
    matrix: PermissionMatrix,
    selected: ScopeId,
    graph: &'static DependencyGraph,
    on_change: Option<ChangeFn>,
}

impl MatrixEditor {
    /// Start a session on `scope`. Loaded data is normalized up front.
    pub fn new(mut matrix: PermissionMatrix, scope: impl Into<ScopeId>) -> Self {
        let graph = graph();
        matrix.normalize_all(graph);
        let selected = scope.into();
        matrix.ensure_scope(&selected);
        MatrixEditor { matrix, selected, graph, on_change: None }
    }

    pub fn on_change<F: FnMut(&PermissionMatrix) + Send + 'static>(mut self, f: F) -> Self {
        self.on_change = Some(Box::new(f));
        self
    }

    pub fn select(&mut self, scope: impl Into<ScopeId>) -> &ScopeMatrix {
        self.selected = scope.into();
        self.matrix.ensure_scope(&self.selected)
    }

    pub fn selected(&self) -> &ScopeId {
        &self.selected
    }

    pub fn current(&self) -> &ScopeMatrix {
        // select/new always insert the selected scope
        self.matrix.scope(&self.selected).unwrap_or_else(|| unreachable!("selected scope missing"))
    }

    pub fn matrix(&self) -> &PermissionMatrix {
        &self.matrix
    }

    pub fn into_matrix(self) -> PermissionMatrix {
        self.matrix
    }

    /// Apply an edit to the selected scope and notify the listener.
    pub fn apply(&mut self, edit: Edit) -> &ScopeMatrix {
        edit.apply_to(self.matrix.ensure_scope(&self.selected), self.graph);
        if let Some(f) = self.on_change.as_mut() {
            f(&self.matrix);
        }
        self.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::DELETE;

    #[test]
    fn classify_patterns() {
        assert_eq!(classify(&PermissionRow::NONE), Role::None);
        assert_eq!(classify(&PermissionRow::ALL), Role::Admin);
        assert_eq!(classify(&PermissionRow::from_mask(VIEW | ADD | EDIT)), Role::Manager);
        assert_eq!(classify(&PermissionRow::from_mask(VIEW)), Role::ReadOnly);
        assert_eq!(classify(&PermissionRow::from_mask(ADD)), Role::Custom);
        assert_eq!(classify(&PermissionRow::from_mask(VIEW | DELETE)), Role::Custom);
        assert_eq!(Role::ReadOnly.to_string(), "Read-only");
    }

    #[test]
    fn preset_names() {
        assert_eq!("all".parse::<Preset>().unwrap(), Preset::Admin);
        assert_eq!("read_only".parse::<Preset>().unwrap(), Preset::ReadOnly);
        assert!(matches!("owner".parse::<Preset>(), Err(PermError::UnknownPreset(_))));
        assert_eq!(serde_json::from_str::<Preset>("\"all\"").unwrap(), Preset::Admin);
    }

    #[test]
    fn edit_wire_shape() {
        let e: Edit = serde_json::from_str(r#"{"op":"set_bit","module":"beds","bit":"add","value":true}"#).unwrap();
        assert_eq!(e, Edit::SetBit { module: Module::Beds, bit: Bit::Add, value: true });
        let e: Edit = serde_json::from_str(r#"{"op":"preset","preset":"manager"}"#).unwrap();
        assert_eq!(e, Edit::Preset { preset: Preset::Manager });
        let v = serde_json::to_value(Edit::SetAll { value: false }).unwrap();
        assert_eq!(v, serde_json::json!({"op":"set_all","value":false}));
    }

    #[test]
    fn roles_follow_canonical_order() {
        let mut s = ScopeMatrix::new();
        Edit::SetBit { module: Module::Rooms, bit: Bit::Edit, value: true }.apply_to(&mut s, graph());
        let roles = s.roles();
        assert_eq!(roles.len(), Module::COUNT);
        assert_eq!(roles[0], (Module::Buildings, Role::ReadOnly));
        assert_eq!(roles[Module::Rooms.index()], (Module::Rooms, Role::Custom));
        assert_eq!(roles[Module::Beds.index()], (Module::Beds, Role::None));
    }

    #[test]
    fn uniform_role() {
        let mut s = ScopeMatrix::filled(Preset::Manager.row());
        assert_eq!(s.uniform_role(), Some(Role::Manager));
        s.row_mut(Module::Expenses).delete = true;
        assert_eq!(s.uniform_role(), None);
        assert_eq!(ScopeMatrix::new().uniform_role(), Some(Role::None));
    }

    #[test]
    fn revoking_non_view_bit_does_not_cascade() {
        let mut s = ScopeMatrix::filled(PermissionRow::ALL);
        Edit::SetBit { module: Module::Buildings, bit: Bit::Add, value: false }.apply_to(&mut s, graph());
        assert!(!s.row(Module::Buildings).add);
        assert_eq!(*s.row(Module::Beds), PermissionRow::ALL);
    }
}
