//! Application service running route commands against the ports.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{RouteError, RouteErrorKind};
use crate::model::{DriverId, RouteId, RouteStatus, StopId, StopPlan, VehicleId, WasteItemId};
use crate::ports::{EventPublisher, PublishError, RepositoryError, RouteRepository};
use crate::route::RouteProcess;

#[derive(thiserror::Error, Debug)]
/// Failures surfaced by [`RouteService`].
pub enum ServiceError {
    /// The aggregate rejected the command.
    #[error(transparent)]
    Route(#[from] RouteError),
    /// Loading or saving failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    /// The state change was saved but its events could not be handed over.
    #[error(transparent)]
    Publish(#[from] PublishError),
    /// The command names a route that does not exist.
    #[error("Route not found: {0}")]
    RouteNotFound(RouteId),
}

impl ServiceError {
    /// Whether the command lost against the route's current state or a concurrent writer.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        match self {
            Self::Route(err) => err.kind() == RouteErrorKind::Conflict,
            Self::Repository(RepositoryError::Conflict { .. }) => true,
            _ => false,
        }
    }
}

/// Public entry point for executing routes.
///
/// Every command loads the route, applies one mutation, saves it, and only then publishes
/// the events the mutation produced. A rejected command saves and publishes nothing.
pub struct RouteService {
    routes: Arc<dyn RouteRepository>,
    publisher: Arc<dyn EventPublisher>,
}

impl RouteService {
    /// Create a new service bound to the given repository and publisher.
    #[must_use]
    pub fn new(routes: Arc<dyn RouteRepository>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { routes, publisher }
    }

    /// Plan and store a new route.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError`] if the definition is invalid or storing fails.
    pub async fn create_route(
        &self,
        vehicle_id: VehicleId,
        driver_id: DriverId,
        stops: Vec<StopPlan>,
    ) -> Result<RouteProcess, ServiceError> {
        let mut route = RouteProcess::create(vehicle_id, driver_id, stops).inspect_err(|err| {
            warn!(vehicle_id = %vehicle_id, error = %err, "route definition rejected");
        })?;

        let version = self.routes.add(&route).await?;
        route.committed(version);
        info!(route_id = %route.id(), vehicle_id = %vehicle_id, "route created");

        self.publish(&mut route).await?;
        Ok(route)
    }

    /// Start a planned route.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError`] if the route is missing, not planned, or saving fails.
    pub async fn start_route(&self, route_id: RouteId) -> Result<RouteProcess, ServiceError> {
        self.execute(route_id, "start", RouteProcess::start).await
    }

    /// Complete one stop of a running route.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError`] if the route or stop is missing, the stop cannot be
    /// completed, or saving fails.
    pub async fn complete_stop(
        &self,
        route_id: RouteId,
        stop_id: StopId,
        notes: Option<String>,
        waste_item_ids: Option<Vec<WasteItemId>>,
    ) -> Result<RouteProcess, ServiceError> {
        self.execute(route_id, "complete_stop", |route| {
            route.complete_stop(stop_id, notes, waste_item_ids)
        })
        .await
    }

    /// Cancel a route that has not finished.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError`] if the route is missing, already terminal, or saving fails.
    pub async fn cancel_route(
        &self,
        route_id: RouteId,
        reason: impl Into<String>,
    ) -> Result<RouteProcess, ServiceError> {
        let reason = reason.into();
        self.execute(route_id, "cancel", |route| route.cancel(reason)).await
    }

    /// Load a route.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::RouteNotFound`] if no such route is stored.
    pub async fn route(&self, route_id: RouteId) -> Result<RouteProcess, ServiceError> {
        self.routes
            .get_by_id(route_id)
            .await?
            .ok_or(ServiceError::RouteNotFound(route_id))
    }

    /// Routes currently in the given status.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError`] if the repository fails.
    pub async fn routes_by_status(
        &self,
        status: RouteStatus,
    ) -> Result<Vec<RouteProcess>, ServiceError> {
        Ok(self.routes.get_by_status(status).await?)
    }

    /// Routes assigned to a vehicle.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError`] if the repository fails.
    pub async fn routes_for_vehicle(
        &self,
        vehicle_id: VehicleId,
    ) -> Result<Vec<RouteProcess>, ServiceError> {
        Ok(self.routes.get_by_vehicle_id(vehicle_id).await?)
    }

    async fn execute<F>(
        &self,
        route_id: RouteId,
        command: &'static str,
        mutate: F,
    ) -> Result<RouteProcess, ServiceError>
    where
        F: FnOnce(&mut RouteProcess) -> Result<(), RouteError> + Send,
    {
        let mut route = self.route(route_id).await?;

        if let Err(err) = mutate(&mut route) {
            warn!(route_id = %route_id, command, error = %err, "route command rejected");
            return Err(err.into());
        }

        let version = self.routes.update(&route).await.inspect_err(|err| {
            warn!(route_id = %route_id, command, error = %err, "saving route failed");
        })?;
        route.committed(version);
        info!(route_id = %route_id, command, status = %route.status(), version, "route updated");

        self.publish(&mut route).await?;
        Ok(route)
    }

    async fn publish(&self, route: &mut RouteProcess) -> Result<(), ServiceError> {
        let events = route.take_events();
        if events.is_empty() {
            return Ok(());
        }

        self.publisher.publish(&events).await.inspect_err(|err| {
            warn!(route_id = %route.id(), events = events.len(), error = %err, "publishing failed");
        })?;
        Ok(())
    }
}
