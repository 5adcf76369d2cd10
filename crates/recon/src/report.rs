use serde::Serialize;
use serde_json::{Map, Value as Json};

use crate::collector::SourceStatus;
use crate::delivery::DeliveryOutcome;
use crate::model::CombinedData;
use crate::procedure::Procedure;
use crate::value::Value;

// ---------------------------------------------------------------------------
// Run report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub procedure: String,
    pub engine_version: String,
    pub run_at: String,
    pub dry_run: bool,
}

/// Per-participant outcome of one run.
#[derive(Debug, Clone, Serialize)]
pub struct ParticipantReport {
    pub code: String,
    pub status: SourceStatus,
    pub fetched: usize,
    pub collected: usize,
    pub dropped: usize,
    pub delivery: DeliveryOutcome,
    pub delivered: usize,
}

impl ParticipantReport {
    pub fn is_degraded(&self) -> bool {
        !self.status.is_ok() || self.delivery.is_degraded()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub meta: RunMeta,
    pub participants: Vec<ParticipantReport>,
    pub matched_items: usize,
    pub combined_items: usize,
}

impl RunReport {
    /// Some participant failed to collect or to accept delivery.
    pub fn is_partial(&self) -> bool {
        self.participants.iter().any(ParticipantReport::is_degraded)
    }

    pub fn degraded(&self) -> impl Iterator<Item = &ParticipantReport> {
        self.participants.iter().filter(|p| p.is_degraded())
    }
}

// ---------------------------------------------------------------------------
// Combined output
// ---------------------------------------------------------------------------

/// Combined data as JSON objects keyed by procedure field id, fields in
/// declaration order.
pub fn render_combined(procedure: &Procedure, combined: &CombinedData) -> Json {
    let rows = combined
        .iter()
        .map(|item| {
            let mut row = Map::new();
            for (field_id, value) in item.iter() {
                if let Some(field) = procedure.procedure_field(field_id) {
                    row.insert(field.id().to_string(), to_json(value));
                }
            }
            Json::Object(row)
        })
        .collect();
    Json::Array(rows)
}

fn to_json(value: &Value) -> Json {
    serde_json::to_value(value).unwrap_or(Json::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participant(status: SourceStatus, delivery: DeliveryOutcome) -> ParticipantReport {
        ParticipantReport {
            code: "hr".into(),
            status,
            fetched: 3,
            collected: 2,
            dropped: 1,
            delivered: delivery.delivered(),
            delivery,
        }
    }

    fn report(participants: Vec<ParticipantReport>) -> RunReport {
        RunReport {
            meta: RunMeta {
                procedure: "p".into(),
                engine_version: "0".into(),
                run_at: "2026-01-01T00:00:00Z".into(),
                dry_run: false,
            },
            participants,
            matched_items: 2,
            combined_items: 2,
        }
    }

    #[test]
    fn partial_when_any_participant_degraded() {
        let ok = participant(SourceStatus::Ok, DeliveryOutcome::Delivered(2));
        assert!(!report(vec![ok.clone()]).is_partial());

        let timed_out = participant(SourceStatus::TimedOut, DeliveryOutcome::Skipped);
        assert!(report(vec![ok.clone(), timed_out]).is_partial());

        let rejected = participant(SourceStatus::Ok, DeliveryOutcome::Rejected);
        assert_eq!(report(vec![ok, rejected]).degraded().count(), 1);
    }

    #[test]
    fn serializes_statuses() {
        let r = report(vec![participant(
            SourceStatus::Failed("down".into()),
            DeliveryOutcome::Skipped,
        )]);
        let json = serde_json::to_value(&r).unwrap();
        let p = &json["participants"][0];
        assert_eq!(p["status"]["state"], "failed");
        assert_eq!(p["status"]["detail"], "down");
        assert_eq!(p["delivery"]["state"], "skipped");
        assert_eq!(json["matched_items"], 2);
    }
}
