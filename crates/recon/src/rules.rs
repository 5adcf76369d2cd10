use accord_core::{Arena, Handle, IdentityMap, OrderedSet};

use crate::model::{FieldsSet, ParticipantField, ParticipantsSet};

pub type MatchingRuleId = Handle<ParticipantsSet>;

/// Participant group → procedure fields that must agree for a match.
///
/// Each rule's participant set is stored once in an arena and keyed by its
/// handle, so two rules over the same participants stay two rules.
#[derive(Debug, Clone, Default)]
pub struct DataMatchingRules {
    sets: Arena<ParticipantsSet>,
    rules: IdentityMap<MatchingRuleId, FieldsSet>,
}

impl DataMatchingRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, participants: ParticipantsSet, fields: FieldsSet) -> MatchingRuleId {
        let id = self.sets.alloc(participants);
        self.rules.set(id, fields);
        id
    }

    pub fn participants(&self, rule: MatchingRuleId) -> Option<&ParticipantsSet> {
        self.sets.get(rule)
    }

    pub fn fields(&self, rule: MatchingRuleId) -> Option<&FieldsSet> {
        self.rules.get(rule)
    }

    pub fn len(&self) -> usize {
        self.rules.count()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&ParticipantsSet, &FieldsSet)> {
        self.rules.iter().map(|(id, fields)| (&self.sets[id], fields))
    }
}

/// Participant field → priority weight, plus the fields whose absence may win.
#[derive(Debug, Clone, Default)]
pub struct DataCombiningRules {
    priorities: IdentityMap<ParticipantField, i64>,
    empty_has_priority: OrderedSet<ParticipantField>,
}

impl DataCombiningRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: ParticipantField, priority: i64, empty_has_priority: bool) {
        self.priorities.set(field, priority);
        if empty_has_priority {
            self.empty_has_priority.push(field);
        } else {
            self.empty_has_priority.delete(field);
        }
    }

    /// Weight of `field`; fields without a rule weigh 0.
    pub fn priority(&self, field: ParticipantField) -> i64 {
        self.priorities.get(field).copied().unwrap_or(0)
    }

    pub fn has_rule(&self, field: ParticipantField) -> bool {
        self.priorities.has_key(field)
    }

    pub fn empty_has_priority(&self, field: ParticipantField) -> bool {
        self.empty_has_priority.contains(field)
    }

    pub fn len(&self) -> usize {
        self.priorities.count()
    }

    pub fn is_empty(&self) -> bool {
        self.priorities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_participant_sets_are_distinct_rules() {
        let p: Vec<_> = (0..2).map(Handle::from_raw).collect();
        let f = Handle::from_raw(0);

        let mut rules = DataMatchingRules::new();
        let a = rules.add(p.iter().copied().collect(), [f].into_iter().collect());
        let b = rules.add(p.iter().copied().collect(), [f].into_iter().collect());

        assert_ne!(a, b);
        assert_eq!(rules.len(), 2);
        assert_eq!(rules.participants(a), rules.participants(b));
    }

    #[test]
    fn missing_priority_is_zero() {
        let pf = ParticipantField::new(Handle::from_raw(0), 0);
        let other = ParticipantField::new(Handle::from_raw(1), 0);
        let mut rules = DataCombiningRules::new();
        rules.set(pf, 5, true);
        assert_eq!(rules.priority(pf), 5);
        assert_eq!(rules.priority(other), 0);
        assert!(rules.empty_has_priority(pf));
        assert!(!rules.empty_has_priority(other));

        rules.set(pf, 1, false);
        assert!(!rules.empty_has_priority(pf));
    }
}
