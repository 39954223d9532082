//! The catalog: register, deregister, list and lookup over a
//! [`ServiceStore`].
//!
//! # Rust Learning Note
//!
//! ## Per-Key Locking
//!
//! Register and deregister both read a service, change its node list and
//! write it back. Two such cycles on the same name must not interleave, or
//! one update is lost. Different names never conflict, so instead of one
//! global lock the catalog keeps one mutex per service name:
//!
//! ```rust,ignore
//! self.with_name_lock(&name, || {
//!     let service = self.store.get(...)?;
//!     self.store.save(&service)
//! })
//! ```
//!
//! An entry lives in the lock map only while some operation on that name
//! holds or waits for it, so unknown names do not accumulate.
//!
//! The methods are synchronous so the same catalog works behind a
//! thread-per-request server or, via `spawn_blocking`, an async one.

use std::sync::Arc;

use catalog_common::{
    DeregisterOutcome, DeregisterRequest, Error, NodeId, RegisterOutcome, RegisterRequest,
    Result, ServiceDetails, ServiceName, ServiceSummary,
};
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::storage::{NodeQuery, ServiceQuery, ServiceStore};
use crate::types::{Node, Service};

/// A validated registration.
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: ServiceName,
    pub description: Option<String>,
    pub node: Node,
}

impl TryFrom<RegisterRequest> for Registration {
    type Error = Error;

    fn try_from(req: RegisterRequest) -> Result<Self> {
        let name = required(req.name, "name")?;
        let address = required(req.address, "address")?;
        let port = match req.service_port {
            None | Some(0) => return Err(Error::null_field("service_port")),
            Some(port) => u16::try_from(port).map_err(|_| {
                Error::validation(format!(
                    "'service_port' must be between 1 and 65535, got {}",
                    port
                ))
            })?,
        };
        let node_id = required(req.node_id, "node_id")?;

        Ok(Self {
            name: ServiceName::parse(name)?,
            description: req.description.filter(|d| !d.is_empty()),
            node: Node {
                address,
                service_port: port,
                node_id: NodeId::parse(node_id)?,
            },
        })
    }
}

/// A validated deregistration.
#[derive(Debug, Clone)]
pub struct Deregistration {
    pub name: ServiceName,
    pub node_id: NodeId,
}

impl TryFrom<DeregisterRequest> for Deregistration {
    type Error = Error;

    fn try_from(req: DeregisterRequest) -> Result<Self> {
        let name = required(req.name, "name")?;
        let node_id = required(req.node_id, "node_id")?;

        Ok(Self {
            name: ServiceName::parse(name)?,
            node_id: NodeId::parse(node_id)?,
        })
    }
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::null_field(field))
}

/// The service catalog.
pub struct Catalog {
    store: Arc<dyn ServiceStore>,
    locks: DashMap<ServiceName, Arc<Mutex<()>>>,
}

impl Catalog {
    /// Creates a catalog over the given store.
    pub fn new(store: Arc<dyn ServiceStore>) -> Self {
        Self {
            store,
            locks: DashMap::new(),
        }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &Arc<dyn ServiceStore> {
        &self.store
    }

    /// Runs `op` while holding the lock for `name`.
    ///
    /// The lock entry is dropped again once nobody else holds or waits on
    /// it, so the map only contains names with an operation in flight.
    fn with_name_lock<T>(&self, name: &ServiceName, op: impl FnOnce() -> Result<T>) -> Result<T> {
        let lock = self
            .locks
            .entry(name.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();

        let result = {
            let _guard = lock.lock();
            op()
        };

        drop(lock);
        self.locks
            .remove_if(name, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    /// Finds a service, mapping the store's NotFound to `None`.
    fn find(&self, query: &ServiceQuery) -> Result<Option<Service>> {
        match self.store.get(query) {
            Ok(service) => Ok(Some(service)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Registers a node under a service name.
    pub fn register(&self, req: RegisterRequest) -> Result<RegisterOutcome> {
        let registration = Registration::try_from(req)?;
        self.register_node(registration)
    }

    /// Registers an already validated node.
    pub fn register_node(&self, registration: Registration) -> Result<RegisterOutcome> {
        let name = registration.name.clone();
        self.with_name_lock(&name, || self.register_locked(registration))
    }

    fn register_locked(&self, registration: Registration) -> Result<RegisterOutcome> {
        let Registration {
            name,
            description,
            node,
        } = registration;

        let duplicate = ServiceQuery::by_name(&name).with_node(NodeQuery::exact(&node));
        if self.find(&duplicate)?.is_some() {
            debug!("Node {}:{} already registered for {}", node.address, node.service_port, name);
            return Ok(RegisterOutcome::AlreadyExists);
        }

        let service = match self.find(&ServiceQuery::by_name(&name))? {
            Some(mut service) => {
                match service.position_of(&node.node_id) {
                    Some(pos) => {
                        info!(
                            "Node moved in {}: {}:{} -> {}:{}",
                            name,
                            service.nodes[pos].address,
                            service.nodes[pos].service_port,
                            node.address,
                            node.service_port
                        );
                        service.nodes[pos] = node;
                    }
                    None => {
                        info!("Added node {}:{} to {}", node.address, node.service_port, name);
                        service.nodes.push(node);
                    }
                }
                if service.description.is_none() {
                    service.description = description;
                }
                service
            }
            None => {
                info!("Registered new service: {} ({}:{})", name, node.address, node.service_port);
                Service::new(name, description, node)
            }
        };

        self.store.save(&service)?;
        Ok(RegisterOutcome::Created)
    }

    /// Removes a node from a service, deleting the service with its last node.
    pub fn deregister(&self, req: DeregisterRequest) -> Result<DeregisterOutcome> {
        let Deregistration { name, node_id } = Deregistration::try_from(req)?;
        self.with_name_lock(&name, || self.deregister_locked(&name, &node_id))
    }

    fn deregister_locked(&self, name: &ServiceName, node_id: &NodeId) -> Result<DeregisterOutcome> {
        let Some(mut service) = self.find(&ServiceQuery::by_name(name))? else {
            debug!("Deregister for unknown service {}", name);
            return Ok(DeregisterOutcome::NotFound);
        };

        let Some(pos) = service.position_of(node_id) else {
            debug!("Node {} not registered under {}; nothing to remove", node_id, name);
            return Ok(DeregisterOutcome::Removed);
        };

        let removed = service.nodes.remove(pos);
        if service.nodes.is_empty() {
            self.store.delete(&service)?;
            info!("Removed service: {} (last node {}:{})", name, removed.address, removed.service_port);
        } else {
            self.store.save(&service)?;
            info!("Removed node {}:{} from {}", removed.address, removed.service_port, name);
        }

        Ok(DeregisterOutcome::Removed)
    }

    /// Lists every service in insertion order.
    pub fn list(&self) -> Result<Vec<ServiceSummary>> {
        Ok(self
            .store
            .filter(&ServiceQuery::all())?
            .iter()
            .map(Service::summary)
            .collect())
    }

    /// Looks up a service by name. Node ids are stripped from the result.
    pub fn lookup(&self, name: &str) -> Result<Option<ServiceDetails>> {
        let Ok(name) = ServiceName::parse(name) else {
            return Ok(None);
        };

        Ok(self
            .find(&ServiceQuery::by_name(&name))?
            .map(|service| service.details()))
    }
}
