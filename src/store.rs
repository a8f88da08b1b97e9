//! LMDB persistence for permission matrices
//!
//! Storage patterns:
//! - `matrices`:  staff id -> JSON-encoded `PermissionMatrix`
//! - `revisions`: staff id -> save counter (u64, big-endian)
//!
//! A matrix is saved whole in one write transaction. Concurrent saves for
//! the same staff user resolve last-write-wins; the revision lets a caller
//! notice that it happened.

use heed::types::{Bytes, Str, U64};
use heed::{Database, Env, EnvOpenOptions, RoTxn, RwTxn};
use tracing::{info, warn};

use crate::config::StoreConfig;
use crate::edit::{apply, Edit};
use crate::error::{err, Result};
use crate::graph::graph;
use crate::matrix::{PermissionMatrix, ScopeId, ScopeMatrix};

type RevDb = Database<Str, U64<byteorder::BigEndian>>;

pub struct MatrixStore {
    env: Env,
    matrices: Database<Str, Bytes>,
    revisions: RevDb,
}

impl MatrixStore {
    /// Open (creating if needed) the store described by `config`.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.path).map_err(err)?;
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(config.map_size)
                .max_dbs(2)
                .open(&config.path)
                .map_err(err)?
        };
        let mut tx = env.write_txn().map_err(err)?;
        let matrices = env.create_database(&mut tx, Some("matrices")).map_err(err)?;
        let revisions = env.create_database(&mut tx, Some("revisions")).map_err(err)?;
        tx.commit().map_err(err)?;
        info!(path = %config.path.display(), "opened permission store");
        Ok(MatrixStore { env, matrices, revisions })
    }

    fn read<T, F: FnOnce(&Self, &RoTxn) -> Result<T>>(&self, f: F) -> Result<T> {
        let tx = self.env.read_txn().map_err(err)?;
        f(self, &tx)
    }

    fn write<T, F: FnOnce(&Self, &mut RwTxn) -> Result<T>>(&self, f: F) -> Result<T> {
        let mut tx = self.env.write_txn().map_err(err)?;
        let r = f(self, &mut tx)?;
        tx.commit().map_err(err)?;
        Ok(r)
    }

    /// Replace the staff user's matrix. Returns the new revision.
    pub fn save(&self, staff: &str, matrix: &PermissionMatrix) -> Result<u64> {
        let bytes = serde_json::to_vec(matrix)?;
        let rev = self.write(|s, tx| {
            let rev = s.revisions.get(tx, staff).map_err(err)?.unwrap_or(0) + 1;
            s.matrices.put(tx, staff, &bytes).map_err(err)?;
            s.revisions.put(tx, staff, &rev).map_err(err)?;
            Ok(rev)
        })?;
        info!(staff, rev, scopes = matrix.len(), "saved permission matrix");
        Ok(rev)
    }

    /// Load the staff user's matrix with its revision. A user never saved
    /// gets an empty matrix at revision 0. Stored data is normalized.
    pub fn load_with_revision(&self, staff: &str) -> Result<(PermissionMatrix, u64)> {
        let (stored, rev) = self.read(|s, tx| {
            let bytes = s.matrices.get(tx, staff).map_err(err)?.map(<[u8]>::to_vec);
            let rev = s.revisions.get(tx, staff).map_err(err)?.unwrap_or(0);
            Ok((bytes, rev))
        })?;
        let Some(bytes) = stored else {
            return Ok((PermissionMatrix::new(), rev));
        };
        let mut matrix: PermissionMatrix = serde_json::from_slice(&bytes)?;
        let fixed = matrix.normalize_all(graph());
        if fixed > 0 {
            warn!(staff, scopes = fixed, "stored matrix was inconsistent, normalized on load");
        }
        Ok((matrix, rev))
    }

    pub fn load(&self, staff: &str) -> Result<PermissionMatrix> {
        Ok(self.load_with_revision(staff)?.0)
    }

    /// Load, apply one edit to `scope`, save. Returns the edited scope and
    /// the new revision. Callers serialize concurrent edits themselves.
    pub fn apply_edit(&self, staff: &str, scope: &ScopeId, edit: &Edit) -> Result<(ScopeMatrix, u64)> {
        let mut matrix = self.load(staff)?;
        let rows = apply(&mut matrix, scope, edit).clone();
        let rev = self.save(staff, &matrix)?;
        Ok((rows, rev))
    }

    pub fn revision(&self, staff: &str) -> Result<u64> {
        self.read(|s, tx| Ok(s.revisions.get(tx, staff).map_err(err)?.unwrap_or(0)))
    }

    /// Drop the staff user's matrix and revision. Returns whether it existed.
    pub fn delete(&self, staff: &str) -> Result<bool> {
        let existed = self.write(|s, tx| {
            let r = s.matrices.delete(tx, staff).map_err(err)?;
            s.revisions.delete(tx, staff).map_err(err)?;
            Ok(r)
        })?;
        if existed {
            info!(staff, "deleted permission matrix");
        }
        Ok(existed)
    }

    pub fn list_staff(&self) -> Result<Vec<String>> {
        self.read(|s, tx| {
            let mut r = Vec::new();
            for item in s.matrices.iter(tx).map_err(err)? {
                let (k, _) = item.map_err(err)?;
                r.push(k.to_string());
            }
            Ok(r)
        })
    }

    pub fn clear(&self) -> Result<()> {
        self.write(|s, tx| {
            s.matrices.clear(tx).map_err(err)?;
            s.revisions.clear(tx).map_err(err)
        })
    }
}
