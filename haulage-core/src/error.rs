//! Errors raised by the route aggregate.

use std::fmt;

use crate::model::{OperationType, RouteStatus, StopId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Mutation attempted on a route, used to describe rejected transitions.
pub enum RouteAction {
    /// Leaving the depot.
    Start,
    /// Completing a stop.
    CompleteStop,
    /// Aborting the route.
    Cancel,
}

impl fmt::Display for RouteAction {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RouteAction::Start => "start",
            RouteAction::CompleteStop => "complete a stop of",
            RouteAction::Cancel => "cancel",
        };
        formatter.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Coarse classification callers map to their own response codes.
pub enum RouteErrorKind {
    /// The request itself is malformed (bad definition, missing party).
    Validation,
    /// The referenced stop does not belong to the route.
    NotFound,
    /// The request clashes with the route's current state.
    Conflict,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
/// Business rule violations of the route process aggregate.
///
/// Every variant is raised before the aggregate changes, so a failed call leaves the
/// route and its pending events untouched.
pub enum RouteError {
    /// Creation without stops or without a pickup stop.
    #[error("Invalid route definition: {0}")]
    InvalidRouteDefinition(String),
    /// The route's status does not allow the requested action.
    #[error("Cannot {action} a route in status {status}")]
    InvalidStateTransition {
        /// Rejected action.
        action: RouteAction,
        /// Status at the time of the call.
        status: RouteStatus,
    },
    /// The stop id is not part of the route.
    #[error("Stop not found: {0}")]
    StopNotFound(StopId),
    /// The stop was completed before.
    #[error("Stop already completed: {0}")]
    StopAlreadyCompleted(StopId),
    /// A delivery or custody transfer stop has no responsible party.
    #[error("Stop {stop_id} ({operation}) requires a responsible party")]
    MissingRequiredParty {
        /// Stop being completed.
        stop_id: StopId,
        /// Its operation type.
        operation: OperationType,
    },
}

impl RouteError {
    /// Classify the error.
    #[must_use]
    pub const fn kind(&self) -> RouteErrorKind {
        match self {
            Self::InvalidRouteDefinition(_) | Self::MissingRequiredParty { .. } => {
                RouteErrorKind::Validation
            }
            Self::StopNotFound(_) => RouteErrorKind::NotFound,
            Self::InvalidStateTransition { .. } | Self::StopAlreadyCompleted(_) => {
                RouteErrorKind::Conflict
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let stop_id = StopId::new();
        assert_eq!(
            RouteError::InvalidRouteDefinition("empty".to_owned()).kind(),
            RouteErrorKind::Validation,
            "definition errors are validation errors"
        );
        assert_eq!(
            RouteError::MissingRequiredParty {
                stop_id,
                operation: OperationType::Delivery
            }
            .kind(),
            RouteErrorKind::Validation,
            "missing party is a validation error"
        );
        assert_eq!(
            RouteError::StopNotFound(stop_id).kind(),
            RouteErrorKind::NotFound,
            "unknown stop"
        );
        assert_eq!(
            RouteError::StopAlreadyCompleted(stop_id).kind(),
            RouteErrorKind::Conflict,
            "double completion"
        );
    }

    #[test]
    fn test_transition_message_names_action_and_status() {
        let err = RouteError::InvalidStateTransition {
            action: RouteAction::Cancel,
            status: RouteStatus::Completed,
        };
        assert_eq!(
            err.to_string(),
            "Cannot cancel a route in status completed",
            "message is human readable"
        );
    }
}
