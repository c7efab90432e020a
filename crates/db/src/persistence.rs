//! Whole-document persistence of the catalog in a single JSON file.
//!
//! Every load re-reads and re-parses the file; every save rewrites it in full.
//! With `atomic_writes` the new document is written to a sibling temp file and
//! renamed over the old one. Without it the file is truncated and rewritten in
//! place, and an interrupted save can leave a truncated file behind.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use serde_json::{Map, Value};
use tempfile::NamedTempFile;

use crate::{
    error::{Result, StoreError},
    model::{Book, Catalog},
};

/// Handle on the backing file. The only code that touches it.
#[derive(Debug, Clone)]
pub struct CatalogFile {
    path: PathBuf,
    atomic_writes: bool,
    seed_on_create: bool,
}

impl CatalogFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            atomic_writes: true,
            seed_on_create: true,
        }
    }

    pub fn atomic_writes(mut self, enabled: bool) -> Self {
        self.atomic_writes = enabled;
        self
    }

    pub fn seed_on_create(mut self, enabled: bool) -> Self {
        self.seed_on_create = enabled;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the catalog, never failing.
    ///
    /// A missing file is created (seeded or empty). A file that cannot be read
    /// or parsed is logged and reported as an empty catalog.
    pub fn load(&self) -> Catalog {
        match self.try_load() {
            Ok(catalog) => catalog,
            Err(err) => {
                tracing::error!(
                    path = %self.path.display(),
                    error = %err,
                    source = ?std::error::Error::source(&err),
                    "catalog unavailable, serving an empty one"
                );
                Catalog::default()
            }
        }
    }

    /// Loads the catalog, reporting read and parse failures to the caller.
    pub fn try_load(&self) -> Result<Catalog> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return self.create(),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_str(&raw).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Writes the catalog, returning `false` after logging on failure.
    pub fn save(&self, catalog: &Catalog) -> bool {
        match self.try_save(catalog) {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(
                    path = %self.path.display(),
                    error = %err,
                    source = ?std::error::Error::source(&err),
                    "failed to persist catalog"
                );
                false
            }
        }
    }

    /// Serializes the full document and replaces the backing file.
    pub fn try_save(&self, catalog: &Catalog) -> Result<()> {
        let body = serde_json::to_string_pretty(catalog)?;
        self.ensure_parent()?;

        if self.atomic_writes {
            self.replace_atomically(body.as_bytes())
        } else {
            fs::write(&self.path, body).map_err(|source| self.write_error(source))
        }
    }

    fn create(&self) -> Result<Catalog> {
        let catalog = if self.seed_on_create {
            seed_catalog()
        } else {
            Catalog::default()
        };
        tracing::info!(
            path = %self.path.display(),
            books = catalog.books.len(),
            "catalog file missing, creating it"
        );
        self.try_save(&catalog)?;
        Ok(catalog)
    }

    fn ensure_parent(&self) -> Result<()> {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => {
                fs::create_dir_all(dir).map_err(|source| self.write_error(source))
            }
            _ => Ok(()),
        }
    }

    fn replace_atomically(&self, body: &[u8]) -> Result<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(|source| self.write_error(source))?;
        tmp.write_all(body)
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|source| self.write_error(source))?;
        tmp.persist(&self.path)
            .map_err(|err| self.write_error(err.error))?;
        Ok(())
    }

    fn write_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

/// Catalog written the first time the backing file is missing.
pub fn seed_catalog() -> Catalog {
    let book = |id: &str, title: &str, author: &str, year: i32, genre: &str| Book {
        id: id.to_string(),
        title: title.to_string(),
        author: author.to_string(),
        year,
        genre: genre.to_string(),
        is_available: true,
        borrower: None,
        reader_email: None,
        reader_phone: None,
        due_date: None,
        added_date: Some("2024-01-01".to_string()),
        borrowed_date: None,
        extra: Map::<String, Value>::new(),
    };

    let mut borrowed = book("2", "Dune", "Frank Herbert", 1965, "Science Fiction");
    borrowed.is_available = false;
    borrowed.borrower = Some("Alice Johnson".to_string());
    borrowed.reader_email = Some("alice@example.com".to_string());
    borrowed.due_date = Some("2099-12-31".to_string());
    borrowed.borrowed_date = Some("2024-01-15".to_string());

    Catalog::new(vec![
        book(
            "1",
            "The Rust Programming Language",
            "Steve Klabnik",
            2019,
            "Programming",
        ),
        borrowed,
        book("3", "Programming Rust", "Jim Blandy", 2021, "Programming"),
    ])
}
