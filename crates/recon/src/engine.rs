use std::time::Duration;

use accord_core::IdentityMap;

use crate::collector::{collect, CollectOptions, CollectedData, CollectStats, SourceStatus};
use crate::combiner::combine;
use crate::delivery::{deliver, DeliveryOutcome};
use crate::matcher::match_items;
use crate::model::{CombinedData, ParticipantId};
use crate::procedure::Procedure;
use crate::report::{ParticipantReport, RunMeta, RunReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub collect: CollectOptions,
    /// Hand combined data back to participants. Off for a dry run.
    pub deliver: bool,
    pub delivery_timeout: Option<Duration>,
}

impl Default for RunOptions {
    fn default() -> Self {
        let collect = CollectOptions::default();
        Self {
            collect,
            deliver: true,
            delivery_timeout: collect.timeout,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report: RunReport,
    pub combined: CombinedData,
}

/// Collect → match → combine → deliver. Source failures degrade the run but
/// never abort it.
pub fn run(procedure: &Procedure, options: &RunOptions) -> RunOutcome {
    tracing::info!("run: procedure '{}'", procedure.name());
    let run_at = chrono::Utc::now().to_rfc3339();

    let collected = collect(procedure, &options.collect);
    let matched = match_items(procedure, &collected);
    let combined = combine(procedure, &matched);

    let deliveries = if options.deliver {
        deliver(procedure, &combined, &collected, options.delivery_timeout)
    } else {
        IdentityMap::new()
    };

    let report = RunReport {
        meta: RunMeta {
            procedure: procedure.name().to_string(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at,
            dry_run: !options.deliver,
        },
        participants: participant_reports(procedure, &collected, &deliveries),
        matched_items: matched.len(),
        combined_items: combined.len(),
    };

    if report.is_partial() {
        tracing::warn!(
            "run: partial, degraded: {}",
            report.degraded().map(|p| p.code.as_str()).collect::<Vec<_>>().join(", ")
        );
    }

    RunOutcome { report, combined }
}

fn participant_reports(
    procedure: &Procedure,
    collected: &CollectedData,
    deliveries: &IdentityMap<ParticipantId, DeliveryOutcome>,
) -> Vec<ParticipantReport> {
    procedure
        .participants()
        .map(|(id, participant)| {
            let stats = collected.stats(id).cloned().unwrap_or(CollectStats {
                status: SourceStatus::Failed("not collected".into()),
                fetched: 0,
                collected: 0,
                dropped: 0,
            });
            let delivery = deliveries.get(id).cloned().unwrap_or(DeliveryOutcome::Skipped);
            ParticipantReport {
                code: participant.code().to_string(),
                status: stats.status,
                fetched: stats.fetched,
                collected: stats.collected,
                dropped: stats.dropped,
                delivered: delivery.delivered(),
                delivery,
            }
        })
        .collect()
}
