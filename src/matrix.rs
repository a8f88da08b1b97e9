//! Permission matrix data model
//!
//! Wire shape: `scope id -> module -> { view, add, edit, delete }`.
//! Missing rows and missing bits read as `false` and are written back
//! explicitly, so every row is always fully populated.

use std::collections::BTreeMap;

use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::module::{Bit, Module, ADD, DELETE, EDIT, VIEW};

/// The four permission bits of one module in one scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionRow {
    pub view: bool,
    pub add: bool,
    pub edit: bool,
    pub delete: bool,
}

impl PermissionRow {
    pub const NONE: PermissionRow = PermissionRow { view: false, add: false, edit: false, delete: false };
    pub const ALL: PermissionRow = PermissionRow { view: true, add: true, edit: true, delete: true };

    pub fn from_mask(mask: u8) -> Self {
        PermissionRow {
            view: mask & VIEW != 0,
            add: mask & ADD != 0,
            edit: mask & EDIT != 0,
            delete: mask & DELETE != 0,
        }
    }

    pub fn mask(&self) -> u8 {
        Bit::ALL.iter().filter(|b| self.get(**b)).fold(0, |a, b| a | b.mask())
    }

    #[inline]
    pub fn get(&self, bit: Bit) -> bool {
        match bit {
            Bit::View => self.view,
            Bit::Add => self.add,
            Bit::Edit => self.edit,
            Bit::Delete => self.delete,
        }
    }

    #[inline]
    pub fn set(&mut self, bit: Bit, value: bool) {
        match bit {
            Bit::View => self.view = value,
            Bit::Add => self.add = value,
            Bit::Edit => self.edit = value,
            Bit::Delete => self.delete = value,
        }
    }

    pub fn set_all(&mut self, value: bool) {
        *self = if value { Self::ALL } else { Self::NONE };
    }

    #[inline]
    pub fn has_any_permission(&self) -> bool {
        self.view || self.add || self.edit || self.delete
    }
}

/// True iff any of the four bits is set.
#[inline]
pub fn has_any_permission(row: &PermissionRow) -> bool {
    row.has_any_permission()
}

/// Rows for every module of one scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeMatrix {
    rows: [PermissionRow; Module::COUNT],
}

impl ScopeMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every module set to `row`.
    pub fn filled(row: PermissionRow) -> Self {
        ScopeMatrix { rows: [row; Module::COUNT] }
    }

    #[inline]
    pub fn row(&self, m: Module) -> &PermissionRow {
        &self.rows[m.index()]
    }

    #[inline]
    pub fn row_mut(&mut self, m: Module) -> &mut PermissionRow {
        &mut self.rows[m.index()]
    }

    #[inline]
    pub fn get(&self, m: Module, bit: Bit) -> bool {
        self.rows[m.index()].get(bit)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Module, &PermissionRow)> {
        Module::ALL.iter().map(move |&m| (m, &self.rows[m.index()]))
    }

    pub fn is_empty(&self) -> bool {
        !self.rows.iter().any(PermissionRow::has_any_permission)
    }
}

impl Serialize for ScopeMatrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Module::COUNT))?;
        for (m, row) in self.iter() {
            map.serialize_entry(m.as_str(), row)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ScopeMatrix {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = BTreeMap::<String, PermissionRow>::deserialize(deserializer)?;
        let mut scope = ScopeMatrix::new();
        for (name, row) in raw {
            match name.parse::<Module>() {
                Ok(m) => *scope.row_mut(m) = row,
                Err(_) => warn!(module = %name, "dropping unknown module from permission matrix"),
            }
        }
        Ok(scope)
    }
}

/// Opaque scope identifier: a building id, or [`ScopeId::GLOBAL`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeId(String);

impl ScopeId {
    pub const GLOBAL: &'static str = "global";

    pub fn global() -> Self {
        ScopeId(Self::GLOBAL.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ScopeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScopeId {
    fn from(s: &str) -> Self {
        ScopeId(s.to_string())
    }
}

impl From<String> for ScopeId {
    fn from(s: String) -> Self {
        ScopeId(s)
    }
}

impl From<u64> for ScopeId {
    fn from(id: u64) -> Self {
        ScopeId(id.to_string())
    }
}

impl From<&ScopeId> for ScopeId {
    fn from(id: &ScopeId) -> Self {
        id.clone()
    }
}

/// All scopes of one staff user. Persisted and loaded as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionMatrix {
    scopes: BTreeMap<ScopeId, ScopeMatrix>,
}

impl PermissionMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the scope slice, inserting an all-false one if absent.
    pub fn ensure_scope(&mut self, scope: impl Into<ScopeId>) -> &mut ScopeMatrix {
        let scope = scope.into();
        if !self.scopes.contains_key(&scope) {
            debug!(%scope, "creating default scope");
        }
        self.scopes.entry(scope).or_default()
    }

    pub fn scope(&self, scope: &ScopeId) -> Option<&ScopeMatrix> {
        self.scopes.get(scope)
    }

    pub fn remove_scope(&mut self, scope: &ScopeId) -> Option<ScopeMatrix> {
        self.scopes.remove(scope)
    }

    pub fn scopes(&self) -> impl Iterator<Item = (&ScopeId, &ScopeMatrix)> {
        self.scopes.iter()
    }

    pub(crate) fn scopes_mut(&mut self) -> impl Iterator<Item = (&ScopeId, &mut ScopeMatrix)> {
        self.scopes.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Stored bit lookup. An absent scope grants nothing.
    pub fn allows(&self, scope: &ScopeId, m: Module, bit: Bit) -> bool {
        self.scopes.get(scope).map(|s| s.get(m, bit)).unwrap_or(false)
    }

    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
