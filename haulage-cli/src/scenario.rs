use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use haulage_core::{
    model::{DriverId, StopPlan, VehicleId, WasteItemId},
    route::RouteProcess,
    service::RouteService,
};
use serde::Deserialize;
use tracing::info;

/// Route definition plus the commands to replay against it.
#[derive(Debug, Deserialize)]
pub(crate) struct Scenario {
    pub(crate) vehicle_id: VehicleId,
    pub(crate) driver_id: DriverId,
    pub(crate) stops: Vec<StopPlan>,
    #[serde(default)]
    pub(crate) steps: Vec<Step>,
}

/// One command. Stops are addressed by their 1-based order since ids are generated.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub(crate) enum Step {
    Start,
    CompleteStop {
        stop: u32,
        #[serde(default)]
        notes: Option<String>,
        #[serde(default)]
        waste_item_ids: Vec<WasteItemId>,
    },
    Cancel {
        reason: String,
    },
}

impl Scenario {
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("parsing scenario {}", path.display()))
    }

    pub(crate) fn parse(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Create the route and apply every step in order, stopping at the first failure.
    pub(crate) async fn run(&self, service: &RouteService) -> Result<RouteProcess> {
        let mut route = service
            .create_route(self.vehicle_id, self.driver_id, self.stops.clone())
            .await?;

        for (index, step) in self.steps.iter().enumerate() {
            info!(step = index + 1, action = ?step, "applying step");
            route = match step {
                Step::Start => service.start_route(route.id()).await,
                Step::CompleteStop {
                    stop,
                    notes,
                    waste_item_ids,
                } => {
                    let stop_id = route
                        .stop_by_order(*stop)
                        .ok_or_else(|| anyhow!("route has no stop {stop}"))?
                        .id();
                    service
                        .complete_stop(
                            route.id(),
                            stop_id,
                            notes.clone(),
                            Some(waste_item_ids.clone()),
                        )
                        .await
                }
                Step::Cancel { reason } => service.cancel_route(route.id(), reason.clone()).await,
            }
            .with_context(|| format!("step {} failed", index + 1))?;
        }

        Ok(route)
    }
}

#[cfg(test)]
mod tests {
    use haulage_core::{events::RouteEvent, model::RouteStatus};
    use haulage_store_memory::MemoryBackend;

    use super::*;

    const SCENARIO: &str = r#"{
        "vehicle_id": "6f2c1a52-4a47-4d6e-9a7c-0d1b8e5b2f10",
        "driver_id": "0b3e6a1c-2d44-4c8f-8f3e-51a2c6b7d901",
        "stops": [
            { "location_id": "a1f0c2d3-1111-4e5f-8a9b-0c1d2e3f4a5b", "operation": "pickup" },
            {
                "location_id": "b2e1d3c4-2222-4f60-9bac-1d2e3f4a5b6c",
                "operation": "delivery",
                "responsible_party_id": "c3d2e4f5-3333-4071-8cbd-2e3f4a5b6c7d"
            }
        ],
        "steps": [
            { "action": "start" },
            { "action": "complete_stop", "stop": 1, "waste_item_ids": ["d4c3f5a6-4444-4182-9dce-3f4a5b6c7d8e"] },
            { "action": "complete_stop", "stop": 2, "notes": "signed by receiver" }
        ]
    }"#;

    #[test]
    fn test_parse_reads_steps_with_defaults() {
        let scenario = Scenario::parse(SCENARIO).expect("valid scenario");

        assert_eq!(scenario.stops.len(), 2, "two stops");
        assert_eq!(scenario.steps.first(), Some(&Step::Start), "start first");
        assert_eq!(
            scenario.steps.get(2),
            Some(&Step::CompleteStop {
                stop: 2,
                notes: Some("signed by receiver".to_owned()),
                waste_item_ids: Vec::new(),
            }),
            "missing items default to empty"
        );
    }

    #[test]
    fn test_parse_rejects_unknown_action() {
        let raw = SCENARIO.replace("\"start\"", "\"teleport\"");
        assert!(Scenario::parse(&raw).is_err(), "unknown action");
    }

    #[tokio::test]
    async fn test_run_replays_steps() {
        let backend = MemoryBackend::new();
        let scenario = Scenario::parse(SCENARIO).expect("valid scenario");

        let route = scenario.run(&backend.service()).await.expect("scenario runs");

        assert_eq!(route.status(), RouteStatus::Completed, "all stops done");
        let events = backend.outbox.drain().await;
        assert_eq!(
            events.last().map(RouteEvent::event_type),
            Some("RouteCompleted"),
            "completion is the last event"
        );
    }

    #[tokio::test]
    async fn test_run_stops_at_missing_stop() {
        let backend = MemoryBackend::new();
        let raw = SCENARIO.replace("\"stop\": 2", "\"stop\": 7");
        let scenario = Scenario::parse(&raw).expect("valid scenario");

        let err = scenario
            .run(&backend.service())
            .await
            .expect_err("stop 7 does not exist");

        assert!(err.to_string().contains("stop 7"), "error names the stop: {err}");
    }
}
