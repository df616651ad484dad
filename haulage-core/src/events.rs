//! Immutable records describing what happened to a route.
//!
//! The aggregate only computes these; draining and delivering them is up to an
//! [`EventPublisher`](crate::ports::EventPublisher).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{DriverId, LocationId, PartyId, RouteId, StopId, VehicleId, WasteItemId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A route process was planned.
pub struct RouteCreated {
    /// Route identifier.
    pub route_id: RouteId,
    /// Assigned vehicle.
    pub vehicle_id: VehicleId,
    /// Assigned driver.
    pub driver_id: DriverId,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// The vehicle set off.
pub struct RouteStarted {
    /// Route identifier.
    pub route_id: RouteId,
    /// Assigned vehicle.
    pub vehicle_id: VehicleId,
    /// Assigned driver.
    pub driver_id: DriverId,
    /// Start time.
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Which way waste moved between a location and the vehicle.
pub enum RelocationDirection {
    /// Loaded at the location onto the vehicle.
    ToVehicle,
    /// Unloaded from the vehicle at the location.
    FromVehicle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Waste items changed physical location.
pub struct ResidueRelocationTriggered {
    /// Route identifier.
    pub route_id: RouteId,
    /// Completed stop.
    pub stop_id: StopId,
    /// Stop location; origin when loading, destination when unloading.
    pub location_id: LocationId,
    /// Vehicle on the other side of the move.
    pub vehicle_id: VehicleId,
    /// Direction of the move.
    pub direction: RelocationDirection,
    /// Items moved.
    pub waste_item_ids: Vec<WasteItemId>,
    /// Stop completion time.
    pub occurred_on: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Custodial responsibility for waste items changed hands.
pub struct ResidueTransferTriggered {
    /// Route identifier.
    pub route_id: RouteId,
    /// Completed stop.
    pub stop_id: StopId,
    /// Handing-over party (the driver).
    pub from_party_id: PartyId,
    /// Receiving party.
    pub to_party_id: PartyId,
    /// Items handed over.
    pub waste_item_ids: Vec<WasteItemId>,
    /// Stop completion time.
    pub occurred_on: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Waste items were parked temporarily.
pub struct ResidueStorageTriggered {
    /// Route identifier.
    pub route_id: RouteId,
    /// Completed stop.
    pub stop_id: StopId,
    /// Storage location.
    pub location_id: LocationId,
    /// Items stored.
    pub waste_item_ids: Vec<WasteItemId>,
    /// Stop completion time.
    pub occurred_on: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Every stop of the route is done.
pub struct RouteCompleted {
    /// Route identifier.
    pub route_id: RouteId,
    /// Assigned vehicle.
    pub vehicle_id: VehicleId,
    /// Completion time of the last stop.
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// The route was aborted.
pub struct RouteCancelled {
    /// Route identifier.
    pub route_id: RouteId,
    /// Reason given by the caller.
    pub reason: String,
    /// Cancellation time.
    pub cancelled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
/// Any event a route process can queue.
pub enum RouteEvent {
    /// See [`RouteCreated`].
    RouteCreated(RouteCreated),
    /// See [`RouteStarted`].
    RouteStarted(RouteStarted),
    /// See [`ResidueRelocationTriggered`].
    ResidueRelocationTriggered(ResidueRelocationTriggered),
    /// See [`ResidueTransferTriggered`].
    ResidueTransferTriggered(ResidueTransferTriggered),
    /// See [`ResidueStorageTriggered`].
    ResidueStorageTriggered(ResidueStorageTriggered),
    /// See [`RouteCompleted`].
    RouteCompleted(RouteCompleted),
    /// See [`RouteCancelled`].
    RouteCancelled(RouteCancelled),
}

impl RouteEvent {
    /// Route the event belongs to.
    #[must_use]
    pub fn route_id(&self) -> RouteId {
        match self {
            Self::RouteCreated(event) => event.route_id,
            Self::RouteStarted(event) => event.route_id,
            Self::ResidueRelocationTriggered(event) => event.route_id,
            Self::ResidueTransferTriggered(event) => event.route_id,
            Self::ResidueStorageTriggered(event) => event.route_id,
            Self::RouteCompleted(event) => event.route_id,
            Self::RouteCancelled(event) => event.route_id,
        }
    }

    /// When the recorded fact happened.
    #[must_use]
    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            Self::RouteCreated(event) => event.created_at,
            Self::RouteStarted(event) => event.started_at,
            Self::ResidueRelocationTriggered(event) => event.occurred_on,
            Self::ResidueTransferTriggered(event) => event.occurred_on,
            Self::ResidueStorageTriggered(event) => event.occurred_on,
            Self::RouteCompleted(event) => event.completed_at,
            Self::RouteCancelled(event) => event.cancelled_at,
        }
    }

    /// Stable name used for routing and serialization.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::RouteCreated(_) => "RouteCreated",
            Self::RouteStarted(_) => "RouteStarted",
            Self::ResidueRelocationTriggered(_) => "ResidueRelocationTriggered",
            Self::ResidueTransferTriggered(_) => "ResidueTransferTriggered",
            Self::ResidueStorageTriggered(_) => "ResidueStorageTriggered",
            Self::RouteCompleted(_) => "RouteCompleted",
            Self::RouteCancelled(_) => "RouteCancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_serialized_tag_matches_event_type() {
        let event = RouteEvent::RouteCancelled(RouteCancelled {
            route_id: RouteId::new(),
            reason: "vehicle breakdown".to_owned(),
            cancelled_at: Utc
                .with_ymd_and_hms(2024, 3, 1, 9, 30, 0)
                .single()
                .expect("valid timestamp"),
        });

        let json = serde_json::to_value(&event).expect("serialize event");
        assert_eq!(json["type"], event.event_type(), "tag names the event");
        assert_eq!(json["reason"], "vehicle breakdown", "fields are flattened");

        let decoded: RouteEvent = serde_json::from_value(json).expect("decode event");
        assert_eq!(decoded, event, "event survives a json hop");
    }

    #[test]
    fn test_accessors_read_the_inner_record() {
        let route_id = RouteId::new();
        let at = Utc
            .with_ymd_and_hms(2024, 3, 1, 11, 0, 0)
            .single()
            .expect("valid timestamp");
        let event = RouteEvent::ResidueStorageTriggered(ResidueStorageTriggered {
            route_id,
            stop_id: StopId::new(),
            location_id: LocationId::new(),
            waste_item_ids: Vec::new(),
            occurred_on: at,
        });

        assert_eq!(event.route_id(), route_id, "route id");
        assert_eq!(event.occurred_at(), at, "occurrence time");
    }
}
