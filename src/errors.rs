//! Error taxonomy shared across the toolkit.
//!
//! Fallible operations return [`anyhow::Error`]; the variants here cover the
//! cases callers are expected to branch on (downcast with
//! [`anyhow::Error::downcast_ref`]): writes against read-only handles and
//! mandatory keys that are absent.

use std::fmt;
use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GalacticusError {
    /// A mutating operation was attempted on a handle opened read-only.
    ReadOnly {
        /// File the handle is bound to.
        file: PathBuf,
        /// The operation that was refused.
        operation: &'static str,
    },
    /// One or more mandatory keys (datasets, attributes) were not found.
    KeyNotFound {
        /// Path of the object that was searched.
        location: String,
        /// The keys that could not be resolved.
        missing: Vec<String>,
    },
    /// A named parameter is not present in the parameter tree.
    ParameterNotFound(String),
}

impl fmt::Display for GalacticusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadOnly { file, operation } => {
                write!(f, "{operation}: file {} is read-only", file.display())
            }
            Self::KeyNotFound { location, missing } => {
                write!(f, "keys not found in '{location}': {}", missing.join(", "))
            }
            Self::ParameterNotFound(name) => write!(f, "parameter '{name}' does not exist"),
        }
    }
}

impl std::error::Error for GalacticusError {}
