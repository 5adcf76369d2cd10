//! Combine stage: resolve one value per procedure field for every matched item.

use accord_core::Queue;

use crate::model::{CombinedData, CombinedItem, MatchedItem, ProcedureField};
use crate::procedure::Procedure;
use crate::value::Value;

/// Merge every matched item. Items whose resolved values are all absent
/// produce nothing.
pub fn combine(procedure: &Procedure, matched: &Queue<MatchedItem>) -> CombinedData {
    let mut out = CombinedData::new();
    let mut empty = 0usize;
    for item in matched.iter() {
        match combine_item(procedure, item) {
            Some(combined) => out.push(combined),
            None => empty += 1,
        }
    }
    tracing::info!(
        "combine: {} matched item(s) → {} combined, {} without values",
        matched.len(),
        out.len(),
        empty
    );
    out
}

/// Resolve every procedure field of one matched item, in declaration order.
pub fn combine_item(procedure: &Procedure, item: &MatchedItem) -> Option<CombinedItem> {
    let mut combined = CombinedItem::new();
    for (id, field) in procedure.procedure_fields() {
        if let Some(value) = resolve(procedure, field, item) {
            combined.set(id, value);
        }
    }
    if combined.is_empty() || combined.all_absent() {
        None
    } else {
        Some(combined)
    }
}

/// Winner among the group's participants owning a field in `field`.
///
/// Higher priority wins; a tie keeps the earlier declared participant field.
/// Absent values only compete when flagged "empty has priority". `None` when
/// nobody competes.
fn resolve(procedure: &Procedure, field: &ProcedureField, item: &MatchedItem) -> Option<Value> {
    let rules = procedure.combining_rules();
    let mut best: Option<(i64, &Value)> = None;

    for pf in field.fields().iter() {
        let Some(data) = item.get(pf.participant) else {
            continue;
        };
        let Some(name) = procedure.field(pf).map(|f| f.name()) else {
            continue;
        };
        let value = data.get(name).unwrap_or(&Value::Null);
        if value.is_null() && !rules.empty_has_priority(pf) {
            continue;
        }
        let priority = rules.priority(pf);
        if best.map_or(true, |(top, _)| priority > top) {
            best = Some((priority, value));
        }
    }

    best.map(|(_, value)| value.clone())
}
