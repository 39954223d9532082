//! File-backed storage: a directory holding one JSON document.
//!
//! The whole catalog is loaded at open time and rewritten after every
//! mutation. Writes go to a temporary file that is then renamed over
//! `services.json`, so a crash mid-write leaves the previous version.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use catalog_common::{Error, Result, StorageErrorKind};
use parking_lot::RwLock;

use super::{ServiceQuery, ServiceStore};
use crate::types::Service;

const DB_FILE: &str = "services.json";

/// JSON document store persisted under a directory.
pub struct FileStore {
    dir: PathBuf,
    services: RwLock<Vec<Service>>,
}

impl FileStore {
    /// Opens (or creates) the store in `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| Error::storage_io(e, format!("create {}", dir.display())))?;

        let path = dir.join(DB_FILE);
        let services = if path.exists() {
            let bytes =
                fs::read(&path).map_err(|e| Error::storage_io(e, format!("read {}", path.display())))?;
            serde_json::from_slice(&bytes).map_err(|e| {
                Error::storage(
                    StorageErrorKind::Fatal,
                    format!("corrupt catalog file {}: {}", path.display(), e),
                )
            })?
        } else {
            Vec::new()
        };

        let store = Self {
            dir,
            services: RwLock::new(services),
        };
        tracing::info!(
            "Opened catalog file {} ({} services)",
            store.path().display(),
            store.services.read().len()
        );
        Ok(store)
    }

    /// Location of the catalog document.
    pub fn path(&self) -> PathBuf {
        self.dir.join(DB_FILE)
    }

    /// Writes `services` to disk, replacing the previous document.
    fn persist(&self, services: &[Service]) -> Result<()> {
        let path = self.path();
        let tmp = self.dir.join(format!("{}.tmp", DB_FILE));

        let bytes = serde_json::to_vec_pretty(services)
            .map_err(|e| Error::storage(StorageErrorKind::Fatal, format!("serialize catalog: {}", e)))?;

        let result = write_file(&tmp, &bytes)
            .map_err(|e| Error::storage_io(e, format!("write {}", tmp.display())))
            .and_then(|()| {
                fs::rename(&tmp, &path)
                    .map_err(|e| Error::storage_io(e, format!("replace {}", path.display())))
            });

        if result.is_err() {
            // Never leave a partial document next to the real one.
            match fs::remove_file(&tmp) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("Failed to remove {}: {}", tmp.display(), e),
            }
        }
        result
    }

    /// Applies `change` to a copy of the catalog, persists it, then swaps
    /// it in. On failure the in-memory view is left untouched.
    fn mutate(&self, change: impl FnOnce(&mut Vec<Service>)) -> Result<()> {
        let mut guard = self.services.write();
        let mut next = guard.clone();
        change(&mut next);

        self.persist(&next)?;
        *guard = next;
        Ok(())
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

impl ServiceStore for FileStore {
    fn get(&self, query: &ServiceQuery) -> Result<Service> {
        self.services
            .read()
            .iter()
            .find(|service| query.matches(service))
            .cloned()
            .ok_or_else(|| match &query.name {
                Some(name) => Error::not_found(format!("service '{}'", name)),
                None => Error::not_found("service"),
            })
    }

    fn filter(&self, query: &ServiceQuery) -> Result<Vec<Service>> {
        Ok(self
            .services
            .read()
            .iter()
            .filter(|service| query.matches(service))
            .cloned()
            .collect())
    }

    fn save(&self, service: &Service) -> Result<()> {
        self.mutate(|services| {
            match services.iter_mut().find(|s| s.name == service.name) {
                Some(existing) => *existing = service.clone(),
                None => services.push(service.clone()),
            }
        })
    }

    fn delete(&self, service: &Service) -> Result<()> {
        self.mutate(|services| services.retain(|s| s.name != service.name))
    }

    fn describe(&self) -> String {
        format!("file ({})", self.path().display())
    }
}
