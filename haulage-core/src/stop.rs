//! Ordered waypoint owned by a route process.

use chrono::{DateTime, Utc};

use crate::error::RouteError;
use crate::model::{LocationId, OperationType, PartyId, RouteId, StopId, StopPlan};
use crate::snapshot::StopSnapshot;

#[derive(Debug, Clone, PartialEq, Eq)]
/// One waypoint of a route.
///
/// Stops are only produced by [`RouteProcess`](crate::route::RouteProcess) and only
/// change through it.
pub struct Stop {
    id: StopId,
    route_id: RouteId,
    location_id: LocationId,
    order: u32,
    operation: OperationType,
    responsible_party_id: Option<PartyId>,
    completed_at: Option<DateTime<Utc>>,
    notes: Option<String>,
}

impl Stop {
    pub(crate) fn planned(route_id: RouteId, order: u32, plan: StopPlan) -> Self {
        Self {
            id: StopId::new(),
            route_id,
            location_id: plan.location_id,
            order,
            operation: plan.operation,
            responsible_party_id: plan.responsible_party_id,
            completed_at: None,
            notes: None,
        }
    }

    pub(crate) fn restore(snapshot: StopSnapshot) -> Self {
        Self {
            id: snapshot.id,
            route_id: snapshot.route_id,
            location_id: snapshot.location_id,
            order: snapshot.order,
            operation: snapshot.operation,
            responsible_party_id: snapshot.responsible_party_id,
            completed_at: snapshot.completed_at,
            notes: snapshot.notes,
        }
    }

    pub(crate) fn snapshot(&self) -> StopSnapshot {
        StopSnapshot {
            id: self.id,
            route_id: self.route_id,
            location_id: self.location_id,
            order: self.order,
            operation: self.operation,
            responsible_party_id: self.responsible_party_id,
            completed_at: self.completed_at,
            notes: self.notes.clone(),
        }
    }

    /// Mark the stop as done. A stop completes at most once.
    pub(crate) fn complete(
        &mut self,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<(), RouteError> {
        if self.is_completed() {
            return Err(RouteError::StopAlreadyCompleted(self.id));
        }
        self.completed_at = Some(at);
        self.notes = notes;
        Ok(())
    }

    /// Stop identifier.
    #[must_use]
    pub fn id(&self) -> StopId {
        self.id
    }

    /// Owning route.
    #[must_use]
    pub fn route_id(&self) -> RouteId {
        self.route_id
    }

    /// Where the stop takes place.
    #[must_use]
    pub fn location_id(&self) -> LocationId {
        self.location_id
    }

    /// 1-based position within the route.
    #[must_use]
    pub fn order(&self) -> u32 {
        self.order
    }

    /// What happens at the stop.
    #[must_use]
    pub fn operation(&self) -> OperationType {
        self.operation
    }

    /// Party taking custody, if any.
    #[must_use]
    pub fn responsible_party_id(&self) -> Option<PartyId> {
        self.responsible_party_id
    }

    /// Whether the stop was completed.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Completion time, once completed.
    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Notes left by the driver on completion.
    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 2, hour, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    #[test]
    fn test_complete_records_time_and_notes() {
        let mut stop = Stop::planned(RouteId::new(), 1, StopPlan::pickup(LocationId::new()));
        assert!(!stop.is_completed(), "new stops are open");

        stop.complete(Some("gate 4".to_owned()), at(8)).expect("first completion succeeds");

        assert!(stop.is_completed(), "flag set");
        assert_eq!(stop.completed_at(), Some(at(8)), "timestamp set");
        assert_eq!(stop.notes(), Some("gate 4"), "notes kept");
    }

    #[test]
    fn test_second_completion_is_rejected_and_keeps_first_values() {
        let mut stop = Stop::planned(RouteId::new(), 2, StopPlan::pickup(LocationId::new()));
        stop.complete(None, at(8)).expect("first completion succeeds");

        let err = stop
            .complete(Some("again".to_owned()), at(9))
            .expect_err("second completion fails");

        assert_eq!(err, RouteError::StopAlreadyCompleted(stop.id()), "error names stop");
        assert_eq!(stop.completed_at(), Some(at(8)), "timestamp unchanged");
        assert_eq!(stop.notes(), None, "notes unchanged");
    }

    #[test]
    fn test_snapshot_round_trip_preserves_fields() {
        let party = PartyId::new();
        let plan = StopPlan::delivery(LocationId::new(), party);
        let mut stop = Stop::planned(RouteId::new(), 3, plan);
        stop.complete(Some("signed".to_owned()), at(10)).expect("completion succeeds");

        let restored = Stop::restore(stop.snapshot());
        assert_eq!(restored, stop, "restored stop equals original");
        assert_eq!(restored.responsible_party_id(), Some(party), "party kept");
    }
}
