use std::io;
use std::path::PathBuf;

use gtfs_graph_model::{EntityKind, GtfsParseError};

use crate::notice::ViolationReport;

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("duplicate {kind} key {key}")]
    DuplicateKey { kind: EntityKind, key: String },
    #[error("{kind} {key} references missing {target} {target_key}")]
    UnresolvedReference {
        kind: EntityKind,
        key: String,
        target: EntityKind,
        target_key: String,
    },
    #[error("{0}")]
    InvariantViolation(ViolationReport),
    #[error("dataset already holds data; load into an empty dataset")]
    AlreadyLoaded,
    #[error("cannot remove {kind} {key}: {count} dependent {dependent} entities remain")]
    DependentsExist {
        kind: EntityKind,
        key: String,
        dependent: EntityKind,
        count: usize,
    },
    #[error("{kind} {key} not found")]
    NotFound { kind: EntityKind, key: String },
    #[error("invalid {kind} row: {source}")]
    Field {
        kind: EntityKind,
        #[source]
        source: GtfsParseError,
    },
    #[error("missing required file {0}")]
    MissingFile(String),
    #[error("{present} is present but {missing} is not")]
    UnpairedFile { present: String, missing: String },
    #[error("{0} is a modelled GTFS file and cannot be kept verbatim")]
    ReservedFileName(String),
    #[error("csv error in {file}: {source}")]
    Csv {
        file: String,
        #[source]
        source: csv::Error,
    },
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl GraphError {
    pub(crate) fn duplicate(kind: EntityKind, key: impl ToString) -> Self {
        GraphError::DuplicateKey {
            kind,
            key: key.to_string(),
        }
    }

    pub(crate) fn unresolved(
        kind: EntityKind,
        key: impl ToString,
        target: EntityKind,
        target_key: impl ToString,
    ) -> Self {
        GraphError::UnresolvedReference {
            kind,
            key: key.to_string(),
            target,
            target_key: target_key.to_string(),
        }
    }

    pub(crate) fn not_found(kind: EntityKind, key: impl ToString) -> Self {
        GraphError::NotFound {
            kind,
            key: key.to_string(),
        }
    }

    pub(crate) fn dependents(
        kind: EntityKind,
        key: impl ToString,
        dependent: EntityKind,
        count: usize,
    ) -> Self {
        GraphError::DependentsExist {
            kind,
            key: key.to_string(),
            dependent,
            count,
        }
    }

    /// Errors confined to a single input row, which a partial load skips.
    pub fn is_row_error(&self) -> bool {
        matches!(
            self,
            GraphError::Field { .. } | GraphError::UnresolvedReference { .. }
        )
    }

    pub fn violations(&self) -> Option<&ViolationReport> {
        match self {
            GraphError::InvariantViolation(report) => Some(report),
            _ => None,
        }
    }
}
