//! In-memory adapters for the route repository and event publisher ports.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, trace};

use haulage_core::{
    events::RouteEvent,
    model::{RouteId, RouteStatus, VehicleId},
    ports::{EventPublisher, PublishError, RepositoryError, RouteRepository},
    route::RouteProcess,
    service::RouteService,
    snapshot::RouteSnapshot,
};

/// Route repository keeping snapshots in a map.
///
/// Each save replaces the whole snapshot under a write lock, so a route and its stops are
/// always stored together. Versions start at 0 and grow by one per successful update.
#[derive(Default)]
pub struct InMemoryRouteRepository {
    routes: RwLock<HashMap<RouteId, RouteSnapshot>>,
}

impl InMemoryRouteRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored routes.
    pub async fn len(&self) -> usize {
        self.routes.read().await.len()
    }

    /// Whether nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.routes.read().await.is_empty()
    }

    async fn matching<P>(&self, predicate: P) -> Result<Vec<RouteProcess>, RepositoryError>
    where
        P: Fn(&RouteSnapshot) -> bool + Send,
    {
        let mut snapshots: Vec<RouteSnapshot> = self
            .routes
            .read()
            .await
            .values()
            .filter(|snapshot| predicate(snapshot))
            .cloned()
            .collect();
        snapshots.sort_by_key(|snapshot| (snapshot.created_at, snapshot.id));

        snapshots.into_iter().map(restore).collect()
    }
}

#[async_trait]
impl RouteRepository for InMemoryRouteRepository {
    async fn get_by_id(&self, id: RouteId) -> Result<Option<RouteProcess>, RepositoryError> {
        let snapshot = self.routes.read().await.get(&id).cloned();
        snapshot.map(restore).transpose()
    }

    async fn get_by_status(
        &self,
        status: RouteStatus,
    ) -> Result<Vec<RouteProcess>, RepositoryError> {
        self.matching(|snapshot| snapshot.status == status).await
    }

    async fn get_by_vehicle_id(
        &self,
        vehicle_id: VehicleId,
    ) -> Result<Vec<RouteProcess>, RepositoryError> {
        self.matching(|snapshot| snapshot.vehicle_id == vehicle_id).await
    }

    async fn add(&self, route: &RouteProcess) -> Result<u64, RepositoryError> {
        let mut routes = self.routes.write().await;
        if routes.contains_key(&route.id()) {
            return Err(RepositoryError::AlreadyExists(route.id()));
        }

        let mut snapshot = route.snapshot();
        snapshot.version = 0;
        routes.insert(route.id(), snapshot);

        debug!(route_id = %route.id(), "route stored");
        Ok(0)
    }

    async fn update(&self, route: &RouteProcess) -> Result<u64, RepositoryError> {
        let mut routes = self.routes.write().await;
        let stored = routes
            .get_mut(&route.id())
            .ok_or(RepositoryError::NotFound(route.id()))?;

        if stored.version != route.version() {
            return Err(RepositoryError::Conflict {
                route_id: route.id(),
                expected: route.version(),
                actual: stored.version,
            });
        }

        let mut snapshot = route.snapshot();
        snapshot.version = stored.version + 1;
        let version = snapshot.version;
        *stored = snapshot;

        debug!(route_id = %route.id(), version, "route replaced");
        Ok(version)
    }
}

fn restore(snapshot: RouteSnapshot) -> Result<RouteProcess, RepositoryError> {
    RouteProcess::restore(snapshot).map_err(|err| RepositoryError::Storage(err.to_string()))
}

/// Append-only event outbox.
///
/// Published events are kept in arrival order until a delivery process drains them.
#[derive(Default)]
pub struct InMemoryOutbox {
    events: Mutex<Vec<RouteEvent>>,
}

impl InMemoryOutbox {
    /// Create an empty outbox.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything published so far.
    pub async fn drain(&self) -> Vec<RouteEvent> {
        let mut events = self.events.lock().await;
        let drained: Vec<RouteEvent> = events.drain(..).collect();
        trace!(events = drained.len(), "outbox drained");
        drained
    }

    /// Copy of the events currently held.
    pub async fn events(&self) -> Vec<RouteEvent> {
        self.events.lock().await.clone()
    }

    /// Number of events currently held.
    pub async fn len(&self) -> usize {
        self.events.lock().await.len()
    }

    /// Whether the outbox holds no events.
    pub async fn is_empty(&self) -> bool {
        self.events.lock().await.is_empty()
    }
}

#[async_trait]
impl EventPublisher for InMemoryOutbox {
    async fn publish(&self, events: &[RouteEvent]) -> Result<(), PublishError> {
        self.events.lock().await.extend_from_slice(events);
        debug!(events = events.len(), "events appended to outbox");
        Ok(())
    }
}

/// Repository and outbox pair sharing one process.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    /// Stored routes.
    pub repository: Arc<InMemoryRouteRepository>,
    /// Published events.
    pub outbox: Arc<InMemoryOutbox>,
}

impl MemoryBackend {
    /// Create empty adapters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a route service writing to these adapters.
    #[must_use]
    pub fn service(&self) -> RouteService {
        let repository: Arc<InMemoryRouteRepository> = Arc::clone(&self.repository);
        let outbox: Arc<InMemoryOutbox> = Arc::clone(&self.outbox);
        RouteService::new(repository, outbox)
    }
}
