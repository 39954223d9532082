//! In-memory storage backend.
//!
//! # Rust Learning Note
//!
//! ## DashMap vs RwLock<HashMap>
//!
//! DashMap shards the map internally, so readers and writers touching
//! different keys rarely contend and there is no lock to forget. It does
//! not keep insertion order, so every record carries a sequence number
//! and `filter` sorts by it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use catalog_common::{Error, Result, ServiceName};
use dashmap::DashMap;

use super::{ServiceQuery, ServiceStore};
use crate::types::Service;

#[derive(Debug, Clone)]
struct Entry {
    seq: u64,
    service: Service,
}

/// Thread-safe in-memory service storage.
///
/// Cloning is cheap and clones share the same map.
#[derive(Clone, Default)]
pub struct MemoryStore {
    services: Arc<DashMap<ServiceName, Entry>>,
    next_seq: Arc<AtomicU64>,
}

impl MemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ServiceStore for MemoryStore {
    fn get(&self, query: &ServiceQuery) -> Result<Service> {
        // Fast path: name lookups hit a single shard.
        if let Some(name) = &query.name {
            return self
                .services
                .get(name)
                .map(|entry| entry.service.clone())
                .filter(|service| query.matches(service))
                .ok_or_else(|| Error::not_found(format!("service '{}'", name)));
        }

        self.filter(query)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found("service"))
    }

    fn filter(&self, query: &ServiceQuery) -> Result<Vec<Service>> {
        let mut matched: Vec<Entry> = self
            .services
            .iter()
            .filter(|entry| query.matches(&entry.service))
            .map(|entry| entry.value().clone())
            .collect();

        matched.sort_by_key(|entry| entry.seq);
        Ok(matched.into_iter().map(|entry| entry.service).collect())
    }

    fn save(&self, service: &Service) -> Result<()> {
        if let Some(mut existing) = self.services.get_mut(&service.name) {
            existing.service = service.clone();
            tracing::debug!("Updated service: {}", service.name);
            return Ok(());
        }

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.services.insert(
            service.name.clone(),
            Entry {
                seq,
                service: service.clone(),
            },
        );
        tracing::debug!("Inserted service: {}", service.name);
        Ok(())
    }

    fn delete(&self, service: &Service) -> Result<()> {
        if self.services.remove(&service.name).is_some() {
            tracing::debug!("Deleted service: {}", service.name);
        }
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory".to_string()
    }
}
