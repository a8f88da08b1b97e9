//! Staffperm - per-building staff permission matrix
//!
//! A staff user's permissions form a matrix `scope -> module -> {view, add,
//! edit, delete}`. Modules depend on each other (a bed lives in a room, a
//! room on a floor, a floor in a building), and every edit keeps the matrix
//! consistent with that graph:
//!
//! - granting anything on a module grants `view` on all of its ancestors
//! - a module without `view` carries nothing on any of its descendants
//!
//! The engine is pure in-memory data. [`store::MatrixStore`] persists whole
//! matrices per staff user; the `server` feature exposes both over HTTP.
//!
//! ```
//! use staffperm::{set_bit, Bit, Module, PermissionMatrix};
//!
//! let mut m = PermissionMatrix::new();
//! set_bit(&mut m, "12", Module::Beds, Bit::Add, true);
//! let scope = m.scope(&"12".into()).unwrap();
//! assert!(scope.row(Module::Buildings).view);
//! assert!(!scope.row(Module::Rooms).add);
//! ```

pub mod config;
pub mod edit;
pub mod error;
pub mod graph;
pub mod matrix;
pub mod module;
pub mod normalize;
pub mod store;

pub use config::{ServerConfig, StoreConfig};
pub use edit::{
    apply, apply_edit, apply_preset, classify, set_all_bits_across_modules, set_all_bits_for_module,
    set_bit, set_bit_across_modules, Edit, MatrixEditor, Preset, Role,
};
pub use error::{PermError, Result};
pub use graph::{graph, DependencyGraph};
pub use matrix::{has_any_permission, PermissionMatrix, PermissionRow, ScopeId, ScopeMatrix};
pub use module::{bits_to_names, Bit, Module, ADD, ALL_BITS, DELETE, EDIT, VIEW};
pub use normalize::{check_invariants, normalize, normalize_to_fixed_point, revoke_view_cascade, Violation};
pub use store::MatrixStore;
