//! Error types for staffperm
//!
//! The engine itself has no recoverable failures: rows default to `false`
//! and the module set is closed. Errors here come from parsing names off
//! the wire and from the persistence layer.

use thiserror::Error;

/// Failures from name parsing, configuration and the matrix store
#[derive(Debug, Error)]
pub enum PermError {
    #[error("unknown module '{0}'")]
    UnknownModule(String),

    #[error("unknown permission bit '{0}'")]
    UnknownBit(String),

    #[error("unknown preset '{0}'")]
    UnknownPreset(String),

    #[error("config: {0}")]
    Config(String),

    #[error("store: {0}")]
    Store(String),

    #[error("codec: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Shorthand used across the crate
pub type Result<T> = std::result::Result<T, PermError>;

/// Wrap an LMDB or filesystem failure as `PermError::Store`
pub fn err<E: std::error::Error>(e: E) -> PermError {
    PermError::Store(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_offending_input() {
        let e = PermError::UnknownModule("garages".into());
        assert_eq!(e.to_string(), "unknown module 'garages'");
        let e = PermError::UnknownPreset("owner".into());
        assert!(e.to_string().contains("owner"));
    }

    #[test]
    fn err_wraps_as_store() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        match err(io) {
            PermError::Store(m) => assert_eq!(m, "disk full"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
