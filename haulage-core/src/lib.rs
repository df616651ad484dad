//! Core types and service wiring for executing waste transport routes.

/// Errors raised by the route aggregate.
pub mod error;
/// Domain events derived from route mutations.
pub mod events;
/// Identifiers, enumerations, and stop plans.
pub mod model;
/// Traits describing the repository and event publisher boundaries.
pub mod ports;
/// The route process aggregate.
pub mod route;
/// High-level service facade used by clients.
pub mod service;
/// Persisted form of a route.
pub mod snapshot;
/// Stops owned by a route.
pub mod stop;

pub use error::*;
pub use events::*;
pub use model::*;
pub use ports::*;
pub use route::*;
pub use service::*;
pub use snapshot::*;
pub use stop::*;
