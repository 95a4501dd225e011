//! Error taxonomy shared across the storage and query layers

use crate::graph::types::{Address, TypeId};
use thiserror::Error;

/// Errors surfaced by storage and query operations
#[derive(Error, Debug, PartialEq, Eq)]
pub enum StorageError {
    #[error("Entity {0} not found")]
    EntityNotFound(Address),

    // Field deliberately not named `source`: thiserror would wire a field of
    // that name into Error::source().
    #[error("Relation {src} -> {target} not found")]
    RelationNotFound { src: Address, target: Address },

    #[error("Type \"{0}\" not found")]
    TypeNotFound(String),

    #[error("Invalid type id {0}")]
    InvalidType(TypeId),

    #[error("Version conflict: stored version {found}, supplied version {expected}")]
    VersionConflict { expected: u64, found: u64 },
}

pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::types::EntityId;
    use std::error::Error;

    #[test]
    fn test_relation_not_found_display_and_no_source_chain() {
        let err = StorageError::RelationNotFound {
            src: Address::new(TypeId::new(1), EntityId::new(2)),
            target: Address::new(TypeId::new(3), EntityId::new(4)),
        };
        assert_eq!(format!("{}", err), "Relation (1, 2) -> (3, 4) not found");
        // The endpoint addresses are payload, not a wrapped error cause
        assert!(err.source().is_none());
    }

    #[test]
    fn test_version_conflict_display() {
        let err = StorageError::VersionConflict {
            expected: 1,
            found: 2,
        };
        assert_eq!(
            format!("{}", err),
            "Version conflict: stored version 2, supplied version 1"
        );
    }
}
