//! Collect stage: fetch every participant's raw records and keep the ones
//! whose fields validate.

use std::sync::Arc;
use std::time::Duration;

use accord_core::IdentityMap;
use serde::Serialize;

use crate::error::AdapterError;
use crate::model::{FieldValue, ItemData, ItemQueue, ParticipantId};
use crate::participant::Participant;
use crate::procedure::Procedure;
use crate::value::Value;
use crate::worker::{self, JobError, PendingJob};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectOptions {
    /// Per-participant fetch deadline. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Fetch all participants at once instead of one after another.
    pub parallel: bool,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(30)),
            parallel: true,
        }
    }
}

/// How a participant's fetch went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum SourceStatus {
    Ok,
    Failed(String),
    TimedOut,
}

impl SourceStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectStats {
    pub status: SourceStatus,
    /// Raw records the adapter returned.
    pub fetched: usize,
    /// Records kept after validation.
    pub collected: usize,
    /// Records dropped for a bad or missing required field.
    pub dropped: usize,
}

impl CollectStats {
    fn failed(status: SourceStatus) -> Self {
        Self {
            status,
            fetched: 0,
            collected: 0,
            dropped: 0,
        }
    }
}

/// Collector output: validated records and stats per participant.
#[derive(Debug, Clone, Default)]
pub struct CollectedData {
    items: IdentityMap<ParticipantId, ItemQueue>,
    stats: IdentityMap<ParticipantId, CollectStats>,
}

impl CollectedData {
    /// Validated records of `participant`; empty if its fetch failed.
    pub fn items(&self, participant: ParticipantId) -> Option<&ItemQueue> {
        self.items.get(participant)
    }

    pub fn stats(&self, participant: ParticipantId) -> Option<&CollectStats> {
        self.stats.get(participant)
    }

    pub fn status(&self, participant: ParticipantId) -> Option<&SourceStatus> {
        self.stats(participant).map(|s| &s.status)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParticipantId, &ItemQueue)> {
        self.items.iter()
    }

    pub fn total_collected(&self) -> usize {
        self.items.values().map(ItemQueue::len).sum()
    }

    /// Insert an already validated queue. Used by callers that bypass fetching.
    pub fn insert(&mut self, participant: ParticipantId, items: ItemQueue) {
        let collected = items.len();
        self.stats.set(
            participant,
            CollectStats {
                status: SourceStatus::Ok,
                fetched: collected,
                collected,
                dropped: 0,
            },
        );
        self.items.set(participant, items);
    }
}

/// Fetch and validate every participant's records.
pub fn collect(procedure: &Procedure, options: &CollectOptions) -> CollectedData {
    let fetched = fetch_all(procedure, options);

    let mut out = CollectedData::default();
    for (id, result) in fetched {
        let Some(participant) = procedure.participant(id) else {
            continue;
        };
        match result {
            Ok(raw) => {
                let (items, stats) = validate_items(participant, raw);
                tracing::info!(
                    "collect: {}: {} fetched, {} kept, {} dropped",
                    participant.code(),
                    stats.fetched,
                    stats.collected,
                    stats.dropped
                );
                out.items.set(id, items);
                out.stats.set(id, stats);
            }
            Err(status) => {
                tracing::warn!("collect: {}: skipped ({})", participant.code(), describe(&status));
                out.items.set(id, ItemQueue::new());
                out.stats.set(id, CollectStats::failed(status));
            }
        }
    }
    out
}

fn describe(status: &SourceStatus) -> String {
    match status {
        SourceStatus::Ok => "ok".into(),
        SourceStatus::Failed(msg) => msg.clone(),
        SourceStatus::TimedOut => "timed out".into(),
    }
}

type FetchResult = Result<ItemQueue, SourceStatus>;

fn fetch_all(procedure: &Procedure, options: &CollectOptions) -> Vec<(ParticipantId, FetchResult)> {
    if !options.parallel {
        return procedure
            .participants()
            .map(|(id, p)| (id, fetch_one(p, options.timeout)))
            .collect();
    }

    // Start every fetch before waiting on any of them.
    let pending: Vec<(ParticipantId, Result<PendingJob<_>, JobError>)> = procedure
        .participants()
        .map(|(id, p)| (id, start_fetch(p)))
        .collect();

    pending
        .into_iter()
        .map(|(id, job)| {
            let result = job.and_then(|job| job.wait(options.timeout));
            (id, settle(result))
        })
        .collect()
}

/// Even without a timeout the fetch runs on a worker so a panicking adapter
/// fails only its own participant.
fn fetch_one(participant: &Participant, timeout: Option<Duration>) -> FetchResult {
    settle(start_fetch(participant).and_then(|job| job.wait(timeout)))
}

fn start_fetch(
    participant: &Participant,
) -> Result<PendingJob<Result<ItemQueue, AdapterError>>, JobError> {
    let adapter = Arc::clone(participant.adapter());
    worker::spawn(format!("collect-{}", participant.code()), move || adapter.provided_data())
}

fn settle(result: Result<Result<ItemQueue, AdapterError>, JobError>) -> FetchResult {
    match result {
        Ok(Ok(items)) => Ok(items),
        Ok(Err(e)) => Err(SourceStatus::Failed(e.to_string())),
        Err(JobError::TimedOut(_)) => Err(SourceStatus::TimedOut),
        Err(e) => Err(SourceStatus::Failed(e.to_string())),
    }
}

/// Validate raw records against the participant's declared fields.
///
/// A required field that fails or comes out absent drops the record. Other
/// failing or absent fields are left out. Undeclared keys are ignored.
pub fn validate_items(participant: &Participant, raw: ItemQueue) -> (ItemQueue, CollectStats) {
    let mut stats = CollectStats {
        status: SourceStatus::Ok,
        fetched: raw.len(),
        collected: 0,
        dropped: 0,
    };
    let mut kept = ItemQueue::new();
    for (index, item) in raw.into_iter().enumerate() {
        match validate_item(participant, &item) {
            Some(valid) => match kept.push(valid) {
                Ok(()) => stats.collected += 1,
                Err(_) => {
                    tracing::warn!("{}: item {index} has no usable fields, dropped", participant.code());
                    stats.dropped += 1;
                }
            },
            None => stats.dropped += 1,
        }
    }
    (kept, stats)
}

fn validate_item(participant: &Participant, raw: &ItemData) -> Option<ItemData> {
    let mut valid = ItemData::new();
    for field in participant.fields() {
        let input = raw.get(field.name()).unwrap_or(&Value::Null);
        match FieldValue::new(field, input) {
            Ok(fv) if fv.is_absent() => {
                if field.is_required() {
                    tracing::warn!(
                        "{}: required field '{}' is absent, item dropped",
                        participant.code(),
                        field.name()
                    );
                    return None;
                }
            }
            Ok(fv) => {
                // Field names are non-empty by construction.
                let _ = valid.insert(field.name(), fv.into_value());
            }
            Err(e) if field.is_required() => {
                tracing::warn!("{}: {e}, item dropped", participant.code());
                return None;
            }
            Err(e) => tracing::debug!("{}: {e}, field dropped", participant.code()),
        }
    }
    Some(valid)
}
