//! The route process aggregate: one vehicle executing an ordered sequence of stops.

use std::mem;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{RouteAction, RouteError};
use crate::events::{
    RelocationDirection, ResidueRelocationTriggered, ResidueStorageTriggered,
    ResidueTransferTriggered, RouteCancelled, RouteCompleted, RouteCreated, RouteEvent,
    RouteStarted,
};
use crate::model::{
    DriverId, OperationType, PartyId, RouteId, RouteStatus, StopId, StopPlan, VehicleId,
    WasteItemId,
};
use crate::snapshot::RouteSnapshot;
use crate::stop::Stop;

#[derive(Debug, Clone)]
/// Aggregate root governing the execution of a transport route.
///
/// All mutation goes through [`start`](Self::start), [`complete_stop`](Self::complete_stop)
/// and [`cancel`](Self::cancel). Each call validates everything up front; on error the
/// route and its pending events stay exactly as they were. Derived events are appended to a
/// private queue that the caller drains with [`take_events`](Self::take_events) once the
/// new state has been persisted.
pub struct RouteProcess {
    id: RouteId,
    vehicle_id: VehicleId,
    driver_id: DriverId,
    status: RouteStatus,
    version: u64,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    cancellation_reason: Option<String>,
    stops: Vec<Stop>,
    pending_events: Vec<RouteEvent>,
}

impl RouteProcess {
    /// Plan a new route from an already-decided stop sequence.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::InvalidRouteDefinition`] when `stops` is empty or contains no
    /// pickup.
    pub fn create(
        vehicle_id: VehicleId,
        driver_id: DriverId,
        stops: Vec<StopPlan>,
    ) -> Result<Self, RouteError> {
        Self::create_at(vehicle_id, driver_id, stops, Utc::now())
    }

    /// [`create`](Self::create) with an explicit creation time.
    ///
    /// # Errors
    ///
    /// See [`create`](Self::create).
    pub fn create_at(
        vehicle_id: VehicleId,
        driver_id: DriverId,
        stops: Vec<StopPlan>,
        at: DateTime<Utc>,
    ) -> Result<Self, RouteError> {
        validate_stop_sequence(stops.iter().map(|plan| plan.operation))?;

        let id = RouteId::new();
        let stops: Vec<Stop> = (1..)
            .zip(stops)
            .map(|(order, plan)| Stop::planned(id, order, plan))
            .collect();

        debug!(route_id = %id, vehicle_id = %vehicle_id, stops = stops.len(), "route planned");

        Ok(Self {
            id,
            vehicle_id,
            driver_id,
            status: RouteStatus::Planned,
            version: 0,
            created_at: at,
            started_at: None,
            completed_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            stops,
            pending_events: vec![RouteEvent::RouteCreated(RouteCreated {
                route_id: id,
                vehicle_id,
                driver_id,
                created_at: at,
            })],
        })
    }

    /// Rebuild a route from its persisted form. The event queue starts empty.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::InvalidRouteDefinition`] when the snapshot breaks the stop
    /// invariants: no stops, no pickup, gaps in the numbering, or stops of another route.
    pub fn restore(snapshot: RouteSnapshot) -> Result<Self, RouteError> {
        validate_stop_sequence(snapshot.stops.iter().map(|stop| stop.operation))?;

        for (expected, stop) in (1..).zip(&snapshot.stops) {
            if stop.order != expected {
                return Err(RouteError::InvalidRouteDefinition(format!(
                    "stop {} has order {}, expected {expected}",
                    stop.id, stop.order
                )));
            }
            if stop.route_id != snapshot.id {
                return Err(RouteError::InvalidRouteDefinition(format!(
                    "stop {} belongs to route {}",
                    stop.id, stop.route_id
                )));
            }
        }

        Ok(Self {
            id: snapshot.id,
            vehicle_id: snapshot.vehicle_id,
            driver_id: snapshot.driver_id,
            status: snapshot.status,
            version: snapshot.version,
            created_at: snapshot.created_at,
            started_at: snapshot.started_at,
            completed_at: snapshot.completed_at,
            cancelled_at: snapshot.cancelled_at,
            cancellation_reason: snapshot.cancellation_reason,
            stops: snapshot.stops.into_iter().map(Stop::restore).collect(),
            pending_events: Vec::new(),
        })
    }

    /// Persisted form of the route and all of its stops.
    #[must_use]
    pub fn snapshot(&self) -> RouteSnapshot {
        RouteSnapshot {
            id: self.id,
            vehicle_id: self.vehicle_id,
            driver_id: self.driver_id,
            status: self.status,
            version: self.version,
            created_at: self.created_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
            cancelled_at: self.cancelled_at,
            cancellation_reason: self.cancellation_reason.clone(),
            stops: self.stops.iter().map(Stop::snapshot).collect(),
        }
    }

    /// Send the vehicle off.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::InvalidStateTransition`] unless the route is planned.
    pub fn start(&mut self) -> Result<(), RouteError> {
        self.start_at(Utc::now())
    }

    /// [`start`](Self::start) with an explicit start time.
    ///
    /// # Errors
    ///
    /// See [`start`](Self::start).
    pub fn start_at(&mut self, at: DateTime<Utc>) -> Result<(), RouteError> {
        self.ensure_status(RouteAction::Start, RouteStatus::Planned)?;

        self.status = RouteStatus::InProgress;
        self.started_at = Some(at);
        self.pending_events.push(RouteEvent::RouteStarted(RouteStarted {
            route_id: self.id,
            vehicle_id: self.vehicle_id,
            driver_id: self.driver_id,
            started_at: at,
        }));

        debug!(route_id = %self.id, "route started");
        Ok(())
    }

    /// Complete one stop and queue the custody events it implies.
    ///
    /// Completing the last open stop also completes the route.
    ///
    /// # Errors
    ///
    /// - [`RouteError::InvalidStateTransition`] unless the route is in progress.
    /// - [`RouteError::StopNotFound`] when the stop is not part of the route.
    /// - [`RouteError::StopAlreadyCompleted`] when the stop is done already.
    /// - [`RouteError::MissingRequiredParty`] for a delivery or custody transfer stop
    ///   without a responsible party.
    pub fn complete_stop(
        &mut self,
        stop_id: StopId,
        notes: Option<String>,
        waste_item_ids: Option<Vec<WasteItemId>>,
    ) -> Result<(), RouteError> {
        self.complete_stop_at(stop_id, notes, waste_item_ids, Utc::now())
    }

    /// [`complete_stop`](Self::complete_stop) with an explicit completion time.
    ///
    /// # Errors
    ///
    /// See [`complete_stop`](Self::complete_stop).
    pub fn complete_stop_at(
        &mut self,
        stop_id: StopId,
        notes: Option<String>,
        waste_item_ids: Option<Vec<WasteItemId>>,
        at: DateTime<Utc>,
    ) -> Result<(), RouteError> {
        self.ensure_status(RouteAction::CompleteStop, RouteStatus::InProgress)?;

        let assignment = Assignment {
            route_id: self.id,
            vehicle_id: self.vehicle_id,
            driver_id: self.driver_id,
        };
        let stop = self
            .stops
            .iter_mut()
            .find(|stop| stop.id() == stop_id)
            .ok_or(RouteError::StopNotFound(stop_id))?;
        if stop.is_completed() {
            return Err(RouteError::StopAlreadyCompleted(stop_id));
        }

        let events = assignment.custody_events(stop, waste_item_ids.unwrap_or_default(), at)?;
        stop.complete(notes, at)?;
        debug!(
            route_id = %self.id,
            stop_id = %stop_id,
            operation = %stop.operation(),
            events = events.len(),
            "stop completed"
        );
        self.pending_events.extend(events);

        if self.stops.iter().all(Stop::is_completed) {
            self.status = RouteStatus::Completed;
            self.completed_at = Some(at);
            self.pending_events.push(RouteEvent::RouteCompleted(RouteCompleted {
                route_id: self.id,
                vehicle_id: self.vehicle_id,
                completed_at: at,
            }));
            debug!(route_id = %self.id, "route completed");
        }

        Ok(())
    }

    /// Abort the route. Stops already completed stay completed.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::InvalidStateTransition`] when the route is completed or
    /// cancelled.
    pub fn cancel(&mut self, reason: impl Into<String>) -> Result<(), RouteError> {
        self.cancel_at(reason, Utc::now())
    }

    /// [`cancel`](Self::cancel) with an explicit cancellation time.
    ///
    /// # Errors
    ///
    /// See [`cancel`](Self::cancel).
    pub fn cancel_at(
        &mut self,
        reason: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<(), RouteError> {
        if self.status.is_terminal() {
            return Err(self.invalid_transition(RouteAction::Cancel));
        }

        let reason = reason.into();
        self.status = RouteStatus::Cancelled;
        self.cancelled_at = Some(at);
        self.cancellation_reason = Some(reason.clone());
        self.pending_events.push(RouteEvent::RouteCancelled(RouteCancelled {
            route_id: self.id,
            reason,
            cancelled_at: at,
        }));

        debug!(route_id = %self.id, "route cancelled");
        Ok(())
    }

    /// Drain the queued events, leaving the queue empty.
    pub fn take_events(&mut self) -> Vec<RouteEvent> {
        mem::take(&mut self.pending_events)
    }

    /// Events queued since the last drain, in the order they were produced.
    #[must_use]
    pub fn pending_events(&self) -> &[RouteEvent] {
        &self.pending_events
    }

    /// Record the version the repository assigned on a successful save.
    pub fn committed(&mut self, version: u64) {
        self.version = version;
    }

    /// Route identifier.
    #[must_use]
    pub fn id(&self) -> RouteId {
        self.id
    }

    /// Assigned vehicle.
    #[must_use]
    pub fn vehicle_id(&self) -> VehicleId {
        self.vehicle_id
    }

    /// Assigned driver.
    #[must_use]
    pub fn driver_id(&self) -> DriverId {
        self.driver_id
    }

    /// Current lifecycle stage.
    #[must_use]
    pub fn status(&self) -> RouteStatus {
        self.status
    }

    /// Whether the route accepts no further mutation.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Concurrency token of the stored copy this route was loaded from.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Creation time.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Start time.
    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Completion time of the last stop.
    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Cancellation time.
    #[must_use]
    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    /// Reason given on cancellation.
    #[must_use]
    pub fn cancellation_reason(&self) -> Option<&str> {
        self.cancellation_reason.as_deref()
    }

    /// Stops ordered by position.
    #[must_use]
    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    /// Look up a stop by id.
    #[must_use]
    pub fn stop(&self, stop_id: StopId) -> Option<&Stop> {
        self.stops.iter().find(|stop| stop.id() == stop_id)
    }

    /// Look up a stop by its 1-based position.
    #[must_use]
    pub fn stop_by_order(&self, order: u32) -> Option<&Stop> {
        self.stops.iter().find(|stop| stop.order() == order)
    }

    /// Lowest-ordered stop that is still open.
    #[must_use]
    pub fn next_stop(&self) -> Option<&Stop> {
        self.stops.iter().find(|stop| !stop.is_completed())
    }

    /// Completed and total stop counts.
    #[must_use]
    pub fn progress(&self) -> (usize, usize) {
        let done = self.stops.iter().filter(|stop| stop.is_completed()).count();
        (done, self.stops.len())
    }

    fn ensure_status(&self, action: RouteAction, required: RouteStatus) -> Result<(), RouteError> {
        if self.status == required {
            Ok(())
        } else {
            Err(self.invalid_transition(action))
        }
    }

    fn invalid_transition(&self, action: RouteAction) -> RouteError {
        RouteError::InvalidStateTransition {
            action,
            status: self.status,
        }
    }
}

/// Route-level references every custody event carries.
#[derive(Clone, Copy)]
struct Assignment {
    route_id: RouteId,
    vehicle_id: VehicleId,
    driver_id: DriverId,
}

impl Assignment {
    /// Events implied by completing `stop`, in emission order.
    fn custody_events(
        self,
        stop: &Stop,
        waste_item_ids: Vec<WasteItemId>,
        at: DateTime<Utc>,
    ) -> Result<Vec<RouteEvent>, RouteError> {
        let receiver = || {
            stop.responsible_party_id().ok_or(RouteError::MissingRequiredParty {
                stop_id: stop.id(),
                operation: stop.operation(),
            })
        };

        let events = match stop.operation() {
            OperationType::Pickup => vec![self.relocation(
                stop,
                RelocationDirection::ToVehicle,
                waste_item_ids,
                at,
            )],
            OperationType::Delivery => {
                let to_party_id = receiver()?;
                vec![
                    self.relocation(
                        stop,
                        RelocationDirection::FromVehicle,
                        waste_item_ids.clone(),
                        at,
                    ),
                    self.transfer(stop, to_party_id, waste_item_ids, at),
                ]
            }
            OperationType::IntermediateStorage => {
                vec![RouteEvent::ResidueStorageTriggered(ResidueStorageTriggered {
                    route_id: self.route_id,
                    stop_id: stop.id(),
                    location_id: stop.location_id(),
                    waste_item_ids,
                    occurred_on: at,
                })]
            }
            OperationType::CustodyTransfer => {
                vec![self.transfer(stop, receiver()?, waste_item_ids, at)]
            }
        };
        Ok(events)
    }

    fn relocation(
        self,
        stop: &Stop,
        direction: RelocationDirection,
        waste_item_ids: Vec<WasteItemId>,
        at: DateTime<Utc>,
    ) -> RouteEvent {
        RouteEvent::ResidueRelocationTriggered(ResidueRelocationTriggered {
            route_id: self.route_id,
            stop_id: stop.id(),
            location_id: stop.location_id(),
            vehicle_id: self.vehicle_id,
            direction,
            waste_item_ids,
            occurred_on: at,
        })
    }

    fn transfer(
        self,
        stop: &Stop,
        to_party_id: PartyId,
        waste_item_ids: Vec<WasteItemId>,
        at: DateTime<Utc>,
    ) -> RouteEvent {
        RouteEvent::ResidueTransferTriggered(ResidueTransferTriggered {
            route_id: self.route_id,
            stop_id: stop.id(),
            from_party_id: self.driver_id.into(),
            to_party_id,
            waste_item_ids,
            occurred_on: at,
        })
    }
}

fn validate_stop_sequence<I>(operations: I) -> Result<(), RouteError>
where
    I: IntoIterator<Item = OperationType>,
{
    let mut count = 0_usize;
    let mut has_pickup = false;
    for operation in operations {
        count += 1;
        has_pickup |= operation == OperationType::Pickup;
    }

    if count == 0 {
        return Err(RouteError::InvalidRouteDefinition(
            "a route needs at least one stop".to_owned(),
        ));
    }
    if !has_pickup {
        return Err(RouteError::InvalidRouteDefinition(
            "a route needs at least one pickup stop".to_owned(),
        ));
    }
    Ok(())
}
