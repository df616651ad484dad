//! Identifiers and enumerations shared by the route aggregate, its events, and the ports.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::{Error as UuidError, Uuid};

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(formatter, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = UuidError;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(raw.trim()).map(Self)
            }
        }
    };
}

opaque_id!(
    /// Identifier of a route process.
    RouteId
);
opaque_id!(
    /// Identifier of a stop within a route.
    StopId
);
opaque_id!(
    /// Reference to a vehicle owned by the fleet subsystem.
    VehicleId
);
opaque_id!(
    /// Reference to the driver operating the vehicle.
    DriverId
);
opaque_id!(
    /// Reference to a physical location (site, facility, depot).
    LocationId
);
opaque_id!(
    /// Reference to a party taking custodial responsibility for waste.
    PartyId
);
opaque_id!(
    /// Reference to a tracked waste item.
    WasteItemId
);

/// The driver acts as the handing-over party of a custody transfer.
impl From<DriverId> for PartyId {
    fn from(driver: DriverId) -> Self {
        PartyId(driver.0)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
/// A string did not name a known enumeration value.
#[error("Unknown {kind}: {value}")]
pub struct UnknownVariant {
    /// Name of the enumeration being parsed.
    pub kind: &'static str,
    /// Rejected input.
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Physical effect a stop causes once it is completed.
pub enum OperationType {
    /// Waste is loaded onto the vehicle.
    Pickup,
    /// Waste is unloaded and handed to a receiver.
    Delivery,
    /// Waste is parked temporarily at a location.
    IntermediateStorage,
    /// Custody changes hands without waste leaving the vehicle.
    CustodyTransfer,
}

impl OperationType {
    /// All operation types in declaration order.
    pub const ALL: [OperationType; 4] = [
        OperationType::Pickup,
        OperationType::Delivery,
        OperationType::IntermediateStorage,
        OperationType::CustodyTransfer,
    ];

    /// Whether completing a stop of this type needs a responsible party.
    #[must_use]
    pub const fn requires_responsible_party(self) -> bool {
        matches!(self, Self::Delivery | Self::CustodyTransfer)
    }

    /// Stable snake case slug.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pickup => "pickup",
            Self::Delivery => "delivery",
            Self::IntermediateStorage => "intermediate_storage",
            Self::CustodyTransfer => "custody_transfer",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for OperationType {
    type Err = UnknownVariant;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let slug = raw.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|operation| operation.as_str() == slug)
            .ok_or_else(|| UnknownVariant {
                kind: "operation type",
                value: raw.to_owned(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Lifecycle stage of a route process.
///
/// Only `Planned`, `InProgress`, `Completed` and `Cancelled` are reachable:
///
/// ```text
/// Planned --start--> InProgress --(last stop completed)--> Completed
/// Planned | InProgress --cancel--> Cancelled
/// ```
///
/// The remaining values are carried for compatibility with stored data and are
/// never produced by the aggregate. A route holding one of them can only be cancelled.
pub enum RouteStatus {
    /// Stops are fixed; the vehicle has not left yet.
    Planned,
    /// The vehicle is executing the stops.
    InProgress,
    /// Every stop was completed.
    Completed,
    /// The route was aborted.
    Cancelled,
    /// Extension value, no transitions.
    Draft,
    /// Extension value, no transitions.
    Approved,
    /// Extension value, no transitions.
    Dispatched,
    /// Extension value, no transitions.
    Paused,
    /// Extension value, no transitions.
    PartiallyCompleted,
    /// Extension value, no transitions.
    Failed,
}

impl RouteStatus {
    /// All statuses in declaration order.
    pub const ALL: [RouteStatus; 10] = [
        RouteStatus::Planned,
        RouteStatus::InProgress,
        RouteStatus::Completed,
        RouteStatus::Cancelled,
        RouteStatus::Draft,
        RouteStatus::Approved,
        RouteStatus::Dispatched,
        RouteStatus::Paused,
        RouteStatus::PartiallyCompleted,
        RouteStatus::Failed,
    ];

    /// Completed and Cancelled routes accept no further mutation.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether the status is one of the values no transition produces.
    #[must_use]
    pub const fn is_extension(self) -> bool {
        !matches!(
            self,
            Self::Planned | Self::InProgress | Self::Completed | Self::Cancelled
        )
    }

    /// Stable snake case slug.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Draft => "draft",
            Self::Approved => "approved",
            Self::Dispatched => "dispatched",
            Self::Paused => "paused",
            Self::PartiallyCompleted => "partially_completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RouteStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for RouteStatus {
    type Err = UnknownVariant;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let slug = raw.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == slug)
            .ok_or_else(|| UnknownVariant {
                kind: "route status",
                value: raw.to_owned(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// One entry of the already-decided stop sequence handed to route creation.
pub struct StopPlan {
    /// Where the stop takes place.
    pub location_id: LocationId,
    /// What happens there.
    pub operation: OperationType,
    /// Party taking custody, required for deliveries and custody transfers.
    #[serde(default)]
    pub responsible_party_id: Option<PartyId>,
}

impl StopPlan {
    /// Construct a plan entry.
    #[must_use]
    pub fn new(
        location_id: LocationId,
        operation: OperationType,
        responsible_party_id: Option<PartyId>,
    ) -> Self {
        Self {
            location_id,
            operation,
            responsible_party_id,
        }
    }

    /// Load waste at a location.
    #[must_use]
    pub fn pickup(location_id: LocationId) -> Self {
        Self::new(location_id, OperationType::Pickup, None)
    }

    /// Unload waste at a location and hand it to a receiver.
    #[must_use]
    pub fn delivery(location_id: LocationId, receiver: PartyId) -> Self {
        Self::new(location_id, OperationType::Delivery, Some(receiver))
    }

    /// Park waste temporarily at a location.
    #[must_use]
    pub fn intermediate_storage(location_id: LocationId) -> Self {
        Self::new(location_id, OperationType::IntermediateStorage, None)
    }

    /// Hand custody to another party at a location.
    #[must_use]
    pub fn custody_transfer(location_id: LocationId, receiver: PartyId) -> Self {
        Self::new(location_id, OperationType::CustodyTransfer, Some(receiver))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_type_round_trips_through_slug() {
        for operation in OperationType::ALL {
            assert_eq!(
                operation.to_string().parse::<OperationType>(),
                Ok(operation),
                "slug should parse back"
            );
        }
        assert_eq!(
            " Custody_Transfer ".parse::<OperationType>(),
            Ok(OperationType::CustodyTransfer),
            "parsing ignores case and surrounding whitespace"
        );
        assert!("unload".parse::<OperationType>().is_err(), "unknown slug");
    }

    #[test]
    fn test_only_handover_operations_need_a_party() {
        assert!(OperationType::Delivery.requires_responsible_party(), "delivery");
        assert!(
            OperationType::CustodyTransfer.requires_responsible_party(),
            "custody transfer"
        );
        assert!(!OperationType::Pickup.requires_responsible_party(), "pickup");
        assert!(
            !OperationType::IntermediateStorage.requires_responsible_party(),
            "storage"
        );
    }

    #[test]
    fn test_route_status_classification() {
        let terminal: Vec<_> = RouteStatus::ALL
            .into_iter()
            .filter(|status| status.is_terminal())
            .collect();
        assert_eq!(
            terminal,
            vec![RouteStatus::Completed, RouteStatus::Cancelled],
            "only completed and cancelled are terminal"
        );
        assert!(RouteStatus::Paused.is_extension(), "paused has no transitions");
        assert!(!RouteStatus::InProgress.is_extension(), "in progress is reachable");
        assert_eq!(
            "partially_completed".parse::<RouteStatus>(),
            Ok(RouteStatus::PartiallyCompleted),
            "extension values still parse"
        );
    }

    #[test]
    fn test_ids_parse_and_serialize_transparently() {
        let id = RouteId::new();
        assert_eq!(id.to_string().parse::<RouteId>().ok(), Some(id), "display parses back");

        let json = serde_json::to_string(&id).expect("serialize id");
        assert_eq!(json, format!("\"{id}\""), "ids serialize as bare strings");
        assert!("not-a-uuid".parse::<StopId>().is_err(), "garbage is rejected");
    }

    #[test]
    fn test_stop_plan_defaults_missing_party() {
        let location = LocationId::new();
        let json = format!(r#"{{"location_id":"{location}","operation":"pickup"}}"#);
        let plan: StopPlan = serde_json::from_str(&json).expect("decode plan");
        assert_eq!(plan, StopPlan::pickup(location), "party defaults to none");
    }
}
