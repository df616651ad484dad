//! Flat, serializable form of a route process used at the persistence boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    DriverId, LocationId, OperationType, PartyId, RouteId, RouteStatus, StopId, VehicleId,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Persisted state of a route and all of its stops, written and read as one unit.
///
/// Pending events are not part of the snapshot.
pub struct RouteSnapshot {
    /// Route identifier.
    pub id: RouteId,
    /// Assigned vehicle.
    pub vehicle_id: VehicleId,
    /// Assigned driver.
    pub driver_id: DriverId,
    /// Lifecycle stage.
    pub status: RouteStatus,
    /// Concurrency token maintained by the repository.
    pub version: u64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Start time.
    pub started_at: Option<DateTime<Utc>>,
    /// Completion time.
    pub completed_at: Option<DateTime<Utc>>,
    /// Cancellation time.
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Reason given on cancellation.
    pub cancellation_reason: Option<String>,
    /// Stops ordered by their position.
    pub stops: Vec<StopSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Persisted state of one stop.
pub struct StopSnapshot {
    /// Stop identifier.
    pub id: StopId,
    /// Owning route.
    pub route_id: RouteId,
    /// Stop location.
    pub location_id: LocationId,
    /// 1-based position.
    pub order: u32,
    /// Operation performed.
    pub operation: OperationType,
    /// Receiving party.
    pub responsible_party_id: Option<PartyId>,
    /// Completion time; `None` while open.
    pub completed_at: Option<DateTime<Utc>>,
    /// Driver notes.
    pub notes: Option<String>,
}
