//! Traits describing the persistence and event delivery boundaries.

use async_trait::async_trait;

use crate::events::RouteEvent;
use crate::model::{RouteId, RouteStatus, VehicleId};
use crate::route::RouteProcess;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
/// Errors that can occur while loading or saving routes.
pub enum RepositoryError {
    /// No stored route has this id.
    #[error("Route not found: {0}")]
    NotFound(RouteId),
    /// A route with this id is already stored.
    #[error("Route already exists: {0}")]
    AlreadyExists(RouteId),
    /// The route was changed by someone else since it was loaded.
    #[error("Version conflict on route {route_id}: expected {expected}, stored {actual}")]
    Conflict {
        /// Route being saved.
        route_id: RouteId,
        /// Version the caller loaded.
        expected: u64,
        /// Version currently stored.
        actual: u64,
    },
    /// Backend failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
/// Event delivery failed.
#[error("Event publishing failed: {0}")]
pub struct PublishError(pub String);

#[async_trait]
/// Persistence boundary for route processes.
///
/// Implementations store a route together with all of its stops as one atomic unit.
/// Routes handed out carry the stored version; `update` must reject a route whose
/// version no longer matches.
pub trait RouteRepository: Send + Sync {
    /// Load a route by id.
    ///
    /// # Errors
    ///
    /// Returns a [`RepositoryError`] when the backend fails.
    async fn get_by_id(&self, id: RouteId) -> Result<Option<RouteProcess>, RepositoryError>;

    /// All routes in the given status, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a [`RepositoryError`] when the backend fails.
    async fn get_by_status(
        &self,
        status: RouteStatus,
    ) -> Result<Vec<RouteProcess>, RepositoryError>;

    /// All routes assigned to the vehicle, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a [`RepositoryError`] when the backend fails.
    async fn get_by_vehicle_id(
        &self,
        vehicle_id: VehicleId,
    ) -> Result<Vec<RouteProcess>, RepositoryError>;

    /// Store a new route and return its stored version.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::AlreadyExists`] for a duplicate id.
    async fn add(&self, route: &RouteProcess) -> Result<u64, RepositoryError>;

    /// Replace a stored route and return its new version.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] for an unknown id and
    /// [`RepositoryError::Conflict`] when the stored version moved on.
    async fn update(&self, route: &RouteProcess) -> Result<u64, RepositoryError>;
}

#[async_trait]
/// Hands drained route events to whatever delivers them (outbox, bus, handlers).
pub trait EventPublisher: Send + Sync {
    /// Publish events in the given order.
    ///
    /// # Errors
    ///
    /// Returns a [`PublishError`] when the events could not be accepted.
    async fn publish(&self, events: &[RouteEvent]) -> Result<(), PublishError>;
}
