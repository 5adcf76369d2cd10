//! Match stage: group records from different participants that describe the
//! same entity.
//!
//! Every matching rule compares each pair of its participants item by item.
//! Two items match when every procedure field of the rule carries equal,
//! non-absent values on both sides. Matches merge transitively through a
//! disjoint-set forest, with one constraint: a group never holds two items of
//! the same participant. A union that would break it is refused.

use accord_core::Queue;

use crate::collector::CollectedData;
use crate::model::{FieldsSet, ItemData, MatchedItem, ParticipantId};
use crate::procedure::Procedure;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Union {
    Joined,
    Already,
    Refused,
}

/// Disjoint-set forest over item nodes, tracking which participants each
/// group already holds.
#[derive(Debug)]
struct Dsu {
    parent: Vec<usize>,
    rank: Vec<u8>,
    owners: Vec<Vec<ParticipantId>>,
}

impl Dsu {
    fn new(owners: &[ParticipantId]) -> Self {
        Self {
            parent: (0..owners.len()).collect(),
            rank: vec![0; owners.len()],
            owners: owners.iter().map(|&p| vec![p]).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) -> Union {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return Union::Already;
        }
        if self.owners[ra].iter().any(|p| self.owners[rb].contains(p)) {
            return Union::Refused;
        }
        let (root, child) = if self.rank[ra] >= self.rank[rb] { (ra, rb) } else { (rb, ra) };
        if self.rank[ra] == self.rank[rb] {
            self.rank[root] += 1;
        }
        self.parent[child] = root;
        let moved = std::mem::take(&mut self.owners[child]);
        self.owners[root].extend(moved);
        Union::Joined
    }
}

/// Counters from one match pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchStats {
    pub comparisons: usize,
    pub unions: usize,
    /// Matches refused because both groups already held the same participant.
    pub refused: usize,
}

/// Group collected items into matched items, ordered by earliest member
/// (participant declaration order, then input order).
pub fn match_items(procedure: &Procedure, collected: &CollectedData) -> Queue<MatchedItem> {
    match_items_with_stats(procedure, collected).0
}

pub fn match_items_with_stats(
    procedure: &Procedure,
    collected: &CollectedData,
) -> (Queue<MatchedItem>, MatchStats) {
    // One node per item, participants in declaration order.
    let mut owners = Vec::new();
    let mut items: Vec<&ItemData> = Vec::new();
    let mut ranges: Vec<(ParticipantId, std::ops::Range<usize>)> = Vec::new();
    for (id, _) in procedure.participants() {
        let start = items.len();
        if let Some(queue) = collected.items(id) {
            for item in queue.iter() {
                owners.push(id);
                items.push(item);
            }
        }
        ranges.push((id, start..items.len()));
    }
    let range_of = |id: ParticipantId| {
        ranges
            .iter()
            .find(|(p, _)| *p == id)
            .map(|(_, r)| r.clone())
            .unwrap_or(0..0)
    };

    let mut dsu = Dsu::new(&owners);
    let mut stats = MatchStats::default();

    for (participants, fields) in procedure.matching_rules().iter() {
        let members: Vec<ParticipantId> = participants.iter().collect();
        for (i, &left) in members.iter().enumerate() {
            let left_names = field_names(procedure, fields, left);
            for &right in &members[i + 1..] {
                let right_names = field_names(procedure, fields, right);
                for x in range_of(left) {
                    for y in range_of(right) {
                        stats.comparisons += 1;
                        if !same_entity(items[x], &left_names, items[y], &right_names) {
                            continue;
                        }
                        match dsu.union(x, y) {
                            Union::Joined => stats.unions += 1,
                            Union::Already => {}
                            Union::Refused => {
                                stats.refused += 1;
                                tracing::debug!(
                                    "match: {} item {} and {} item {} agree but their groups overlap",
                                    participant_code(procedure, left),
                                    x - range_of(left).start,
                                    participant_code(procedure, right),
                                    y - range_of(right).start
                                );
                            }
                        }
                    }
                }
            }
        }
    }

    // Group nodes by root; node order makes the first member the earliest.
    let mut group_of_root: Vec<Option<usize>> = vec![None; items.len()];
    let mut groups: Vec<MatchedItem> = Vec::new();
    for node in 0..items.len() {
        let root = dsu.find(node);
        let slot = match group_of_root[root] {
            Some(slot) => slot,
            None => {
                groups.push(MatchedItem::new());
                group_of_root[root] = Some(groups.len() - 1);
                groups.len() - 1
            }
        };
        groups[slot].insert(owners[node], items[node].clone());
    }

    tracing::info!(
        "match: {} item(s) into {} group(s), {} union(s), {} refused",
        items.len(),
        groups.len(),
        stats.unions,
        stats.refused
    );
    (groups.into_iter().collect(), stats)
}

fn participant_code(procedure: &Procedure, id: ParticipantId) -> &str {
    procedure.participant(id).map(|p| p.code()).unwrap_or("?")
}

/// Field names `participant` uses for each procedure field of a rule.
fn field_names<'a>(procedure: &'a Procedure, fields: &FieldsSet, participant: ParticipantId) -> Vec<&'a str> {
    fields
        .iter()
        .filter_map(|f| procedure.procedure_field(f)?.owned_by(participant))
        .filter_map(|pf| procedure.field(pf).map(|f| f.name()))
        .collect()
}

fn same_entity(left: &ItemData, left_names: &[&str], right: &ItemData, right_names: &[&str]) -> bool {
    if left_names.is_empty() || left_names.len() != right_names.len() {
        return false;
    }
    left_names.iter().zip(right_names).all(|(l, r)| {
        match (left.get(l), right.get(r)) {
            (Some(a), Some(b)) => !matches!(a, Value::Null) && a == b,
            _ => false,
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::adapters::MemoryAdapter;
    use crate::model::{Field, ItemQueue};
    use crate::participant::Participant;
    use crate::types::{ItemIdType, StringType};

    fn participant(code: &str) -> Participant {
        Participant::new(
            code,
            vec![
                Field::new("id", Arc::new(ItemIdType), true),
                Field::new("email", Arc::new(StringType), false),
            ],
            Arc::new(MemoryAdapter::default()),
        )
        .unwrap()
    }

    /// Three participants, procedure fields `id` and `email`, one rule per
    /// listed (participants, field) pair.
    fn procedure(rules: &[(&[&str], &str)]) -> Procedure {
        let mut b = Procedure::builder("match-test");
        for code in ["a", "b", "c"] {
            b.add_participant(participant(code)).unwrap();
        }
        for field in ["id", "email"] {
            let refs: Vec<_> = ["a", "b", "c"]
                .iter()
                .map(|p| b.participant_field(p, field).unwrap())
                .collect();
            b.add_procedure_field(field, &refs).unwrap();
        }
        for (participants, field) in rules {
            let ids: Vec<_> = participants.iter().map(|p| b.participant_id(p).unwrap()).collect();
            let f = b.procedure_field_id(field).unwrap();
            b.add_matching_rule(&ids, &[f]).unwrap();
        }
        b.build().unwrap()
    }

    fn collected(procedure: &Procedure, data: &[(&str, Vec<ItemData>)]) -> CollectedData {
        let mut out = CollectedData::default();
        for (code, items) in data {
            let id = procedure.participant_by_code(code).unwrap();
            out.insert(id, ItemQueue::from_items(items.clone()).unwrap());
        }
        out
    }

    fn item(id: i64, email: Option<&str>) -> ItemData {
        let mut item = ItemData::from_pairs([("id", id)]).unwrap();
        if let Some(email) = email {
            item.insert("email", email).unwrap();
        }
        item
    }

    fn shape(procedure: &Procedure, groups: &Queue<MatchedItem>) -> Vec<Vec<String>> {
        groups
            .iter()
            .map(|g| {
                g.iter()
                    .map(|(p, item)| {
                        let id = match item.get("id") {
                            Some(Value::Int(i)) => *i,
                            _ => 0,
                        };
                        format!("{}{}", participant_code(procedure, p), id)
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn matches_on_equal_values_and_keeps_singletons() {
        let p = procedure(&[(&["a", "b"], "id")]);
        let data = collected(
            &p,
            &[("a", vec![item(1, None), item(2, None)]), ("b", vec![item(2, None), item(3, None)])],
        );
        let groups = match_items(&p, &data);
        assert_eq!(shape(&p, &groups), vec![vec!["a1"], vec!["a2", "b2"], vec!["b3"]]);
    }

    #[test]
    fn absent_values_never_match() {
        let p = procedure(&[(&["a", "b"], "email")]);
        let data = collected(&p, &[("a", vec![item(1, None)]), ("b", vec![item(2, None)])]);
        let groups = match_items(&p, &data);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn merges_transitively_across_rules() {
        // a~b on id, b~c on email: a1, b1 and c9 form one entity.
        let p = procedure(&[(&["a", "b"], "id"), (&["b", "c"], "email")]);
        let data = collected(
            &p,
            &[
                ("a", vec![item(1, Some("x@corp"))]),
                ("b", vec![item(1, Some("y@corp"))]),
                ("c", vec![item(9, Some("y@corp"))]),
            ],
        );
        let groups = match_items(&p, &data);
        assert_eq!(shape(&p, &groups), vec![vec!["a1", "b1", "c9"]]);
    }

    #[test]
    fn one_item_per_participant_per_group() {
        // Both b items carry id 1; only the first joins a1.
        let p = procedure(&[(&["a", "b"], "id")]);
        let data = collected(&p, &[("a", vec![item(1, None)]), ("b", vec![item(1, None), item(1, None)])]);
        let (groups, stats) = match_items_with_stats(&p, &data);
        assert_eq!(shape(&p, &groups), vec![vec!["a1", "b1"], vec!["b1"]]);
        assert_eq!(stats.refused, 1);
        assert_eq!(stats.unions, 1);
    }

    #[test]
    fn numbers_compare_by_value() {
        let p = procedure(&[(&["a", "b"], "id")]);
        let mut float_item = ItemData::new();
        float_item.insert("id", Value::Float(4.0)).unwrap();
        let data = collected(&p, &[("a", vec![item(4, None)]), ("b", vec![float_item])]);
        assert_eq!(match_items(&p, &data).len(), 1);
    }

    #[test]
    fn no_rules_means_all_singletons() {
        let p = procedure(&[]);
        let data = collected(&p, &[("a", vec![item(1, None)]), ("b", vec![item(1, None)])]);
        assert_eq!(match_items(&p, &data).len(), 2);
    }
}
