use std::{
    path::PathBuf,
    sync::{Arc, Mutex, PoisonError},
};

use crate::{
    clock::{Clock, SystemClock},
    error::Result,
    model::Catalog,
    persistence::CatalogFile,
};

pub const DEFAULT_EXPIRING_HORIZON_DAYS: i64 = 7;

/// Rules the lending workflow enforces beyond the basic state invariants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LendingPolicy {
    /// Whether a borrowed book may be borrowed again, replacing the current
    /// borrower and due date.
    pub allow_reborrow: bool,
    /// Days ahead that count as "expiring soon".
    pub expiring_horizon_days: i64,
}

impl Default for LendingPolicy {
    fn default() -> Self {
        Self {
            allow_reborrow: true,
            expiring_horizon_days: DEFAULT_EXPIRING_HORIZON_DAYS,
        }
    }
}

/// Construction options for [`LibraryStore`].
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub data_file: PathBuf,
    pub atomic_writes: bool,
    pub seed_on_create: bool,
    pub policy: LendingPolicy,
}

impl StoreOptions {
    pub fn new(data_file: impl Into<PathBuf>) -> Self {
        Self {
            data_file: data_file.into(),
            atomic_writes: true,
            seed_on_create: true,
            policy: LendingPolicy::default(),
        }
    }
}

/// The library storage engine.
///
/// Owns the catalog file and answers queries and lending transitions over it.
/// No state is cached between calls: each query loads the document afresh and
/// each mutation performs its own load-modify-save cycle while holding the
/// writer lock, so at most one mutation touches the file at a time.
pub struct LibraryStore {
    pub(crate) file: CatalogFile,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) policy: LendingPolicy,
    writer: Mutex<()>,
}

impl LibraryStore {
    pub fn new(options: StoreOptions) -> Self {
        let file = CatalogFile::new(options.data_file)
            .atomic_writes(options.atomic_writes)
            .seed_on_create(options.seed_on_create);
        Self {
            file,
            clock: Arc::new(SystemClock),
            policy: options.policy,
            writer: Mutex::new(()),
        }
    }

    /// Store over `path` with default options.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::new(StoreOptions::new(path))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn file(&self) -> &CatalogFile {
        &self.file
    }

    pub fn policy(&self) -> LendingPolicy {
        self.policy
    }

    /// Loads the catalog, creating the backing file if it is missing.
    pub fn ensure_catalog(&self) -> Result<Catalog> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        self.file.try_load()
    }

    /// Runs one read-modify-write cycle under the writer lock.
    ///
    /// The closure's result is only returned after the modified document has
    /// been saved; a closure error leaves the file untouched.
    pub(crate) fn mutate<T>(&self, apply: impl FnOnce(&mut Catalog) -> Result<T>) -> Result<T> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut catalog = self.file.try_load()?;
        let value = apply(&mut catalog)?;
        self.file.try_save(&catalog)?;
        Ok(value)
    }
}

impl std::fmt::Debug for LibraryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibraryStore")
            .field("file", &self.file)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
