//! Error type shared by the persistence layer and the lending workflow.

use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by [`crate::LibraryStore`] operations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("book '{0}' not found")]
    NotFound(String),

    #[error("book '{id}' is already borrowed by {borrower}")]
    AlreadyBorrowed { id: String, borrower: String },

    #[error("failed to read catalog at {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog at {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write catalog at {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize catalog")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    /// True when the operation referenced an unknown book id.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// True when the backing file could not be read, parsed or written.
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            Self::Read { .. } | Self::Parse { .. } | Self::Write { .. } | Self::Serialize(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
