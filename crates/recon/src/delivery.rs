//! Delivery stage: hand combined records back to every participant, keyed by
//! the participant's own field names.

use std::sync::Arc;
use std::time::Duration;

use accord_core::IdentityMap;
use serde::Serialize;

use crate::collector::CollectedData;
use crate::model::{CombinedData, ItemData, ItemQueue, ParticipantId};
use crate::participant::Participant;
use crate::procedure::Procedure;
use crate::worker::{self, JobError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    /// Accepted; number of records handed over.
    Delivered(usize),
    /// The sink answered `false`.
    Rejected,
    Failed(String),
    TimedOut,
    /// Not attempted: collection from this participant failed, or delivery is off.
    Skipped,
}

impl DeliveryOutcome {
    pub fn delivered(&self) -> usize {
        match self {
            Self::Delivered(n) => *n,
            _ => 0,
        }
    }

    /// Degraded outcomes make the run partial.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Rejected | Self::Failed(_) | Self::TimedOut)
    }
}

/// Combined records mapped onto `participant`'s field names.
///
/// Only procedure fields the participant owns a field in are carried. Absent
/// winners are kept as `Null` so the sink can clear the field. Records with
/// nothing for the participant are skipped.
pub fn items_for(procedure: &Procedure, participant: ParticipantId, combined: &CombinedData) -> ItemQueue {
    let mut queue = ItemQueue::new();
    for item in combined.iter() {
        let mut data = ItemData::new();
        for (field_id, value) in item.iter() {
            let Some(pf) = procedure
                .procedure_field(field_id)
                .and_then(|f| f.owned_by(participant))
            else {
                continue;
            };
            if let Some(field) = procedure.field(pf) {
                // Declared field names are never empty.
                let _ = data.insert(field.name(), value.clone());
            }
        }
        // An empty record is refused by the queue; that is the skip.
        let _ = queue.push(data);
    }
    queue
}

/// Deliver to every participant whose collection succeeded.
pub fn deliver(
    procedure: &Procedure,
    combined: &CombinedData,
    collected: &CollectedData,
    timeout: Option<Duration>,
) -> IdentityMap<ParticipantId, DeliveryOutcome> {
    let mut outcomes = IdentityMap::new();
    for (id, participant) in procedure.participants() {
        if !collected.status(id).is_some_and(|s| s.is_ok()) {
            tracing::info!("deliver: {}: skipped, collection failed", participant.code());
            outcomes.set(id, DeliveryOutcome::Skipped);
            continue;
        }
        let items = items_for(procedure, id, combined);
        let outcome = deliver_one(participant, items, timeout);
        match &outcome {
            DeliveryOutcome::Delivered(n) => tracing::info!("deliver: {}: {n} item(s)", participant.code()),
            other => tracing::warn!("deliver: {}: {other:?}", participant.code()),
        }
        outcomes.set(id, outcome);
    }
    outcomes
}

fn deliver_one(participant: &Participant, items: ItemQueue, timeout: Option<Duration>) -> DeliveryOutcome {
    let count = items.len();
    let result = match timeout {
        None => Ok(participant.deliver_data(items)),
        Some(_) => {
            let adapter = Arc::clone(participant.adapter());
            worker::run_with_timeout(format!("deliver-{}", participant.code()), timeout, move || {
                adapter.deliver_data(items)
            })
        }
    };
    match result {
        Ok(Ok(true)) => DeliveryOutcome::Delivered(count),
        Ok(Ok(false)) => DeliveryOutcome::Rejected,
        Ok(Err(e)) => DeliveryOutcome::Failed(e.to_string()),
        Err(JobError::TimedOut(_)) => DeliveryOutcome::TimedOut,
        Err(e) => DeliveryOutcome::Failed(e.to_string()),
    }
}
