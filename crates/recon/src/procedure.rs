//! Procedure: participants, procedure fields and the two rule sets.
//!
//! Built once through [`ProcedureBuilder`], which checks every reference as it
//! is added, then shared read-only by the pipeline.

use std::collections::HashSet;

use accord_core::{Arena, OrderedSet};

use crate::error::ProcedureError;
use crate::model::{
    Field, FieldsSet, ParticipantField, ParticipantId, ParticipantsSet, ProcedureField,
    ProcedureFieldId,
};
use crate::participant::Participant;
use crate::rules::{DataCombiningRules, DataMatchingRules, MatchingRuleId};

#[derive(Debug, Clone)]
pub struct Procedure {
    name: String,
    participants: Arena<Participant>,
    fields: Arena<ProcedureField>,
    matching: DataMatchingRules,
    combining: DataCombiningRules,
}

impl Procedure {
    pub fn builder(name: impl Into<String>) -> ProcedureBuilder {
        ProcedureBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Participants in declaration order.
    pub fn participants(&self) -> impl Iterator<Item = (ParticipantId, &Participant)> {
        self.participants.iter()
    }

    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.get(id)
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn participant_by_code(&self, code: &str) -> Option<ParticipantId> {
        self.participants
            .iter()
            .find(|(_, p)| p.code() == code)
            .map(|(id, _)| id)
    }

    /// Procedure fields in declaration order.
    pub fn procedure_fields(&self) -> impl Iterator<Item = (ProcedureFieldId, &ProcedureField)> {
        self.fields.iter()
    }

    pub fn procedure_field(&self, id: ProcedureFieldId) -> Option<&ProcedureField> {
        self.fields.get(id)
    }

    pub fn procedure_field_by_id(&self, id: &str) -> Option<ProcedureFieldId> {
        self.fields.iter().find(|(_, f)| f.id() == id).map(|(h, _)| h)
    }

    pub fn matching_rules(&self) -> &DataMatchingRules {
        &self.matching
    }

    pub fn combining_rules(&self) -> &DataCombiningRules {
        &self.combining
    }

    /// Descriptor behind a participant field.
    pub fn field(&self, pf: ParticipantField) -> Option<&Field> {
        self.participant(pf.participant)?.field(pf.field_index())
    }

    /// `participant.field` rendering for logs and errors.
    pub fn describe(&self, pf: ParticipantField) -> String {
        describe(&self.participants, pf)
    }
}

fn describe(participants: &Arena<Participant>, pf: ParticipantField) -> String {
    match participants.get(pf.participant) {
        Some(p) => match p.field(pf.field_index()) {
            Some(f) => format!("{}.{}", p.code(), f.name()),
            None => format!("{}.#{}", p.code(), pf.field),
        },
        None => format!("{:?}.#{}", pf.participant, pf.field),
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Incrementally validated construction of a [`Procedure`].
#[derive(Debug)]
pub struct ProcedureBuilder {
    name: String,
    participants: Arena<Participant>,
    fields: Arena<ProcedureField>,
    used: HashSet<ParticipantField>,
    matching: DataMatchingRules,
    combining: DataCombiningRules,
}

impl ProcedureBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            participants: Arena::new(),
            fields: Arena::new(),
            used: HashSet::new(),
            matching: DataMatchingRules::new(),
            combining: DataCombiningRules::new(),
        }
    }

    pub fn add_participant(&mut self, participant: Participant) -> Result<ParticipantId, ProcedureError> {
        if self.participants.iter().any(|(_, p)| p.code() == participant.code()) {
            return Err(ProcedureError::DuplicateParticipant(participant.code().to_string()));
        }
        Ok(self.participants.alloc(participant))
    }

    /// Resolve `code` + field `name` to a participant field.
    pub fn participant_field(&self, code: &str, name: &str) -> Result<ParticipantField, ProcedureError> {
        let (id, participant) = self
            .participants
            .iter()
            .find(|(_, p)| p.code() == code)
            .ok_or_else(|| ProcedureError::UnknownParticipant(code.to_string()))?;
        let index = participant.field_index(name).ok_or_else(|| ProcedureError::UnknownField {
            participant: code.to_string(),
            field: name.to_string(),
        })?;
        Ok(ParticipantField::new(id, index))
    }

    pub fn participant_id(&self, code: &str) -> Result<ParticipantId, ProcedureError> {
        self.participants
            .iter()
            .find(|(_, p)| p.code() == code)
            .map(|(id, _)| id)
            .ok_or_else(|| ProcedureError::UnknownParticipant(code.to_string()))
    }

    pub fn procedure_field_id(&self, id: &str) -> Result<ProcedureFieldId, ProcedureError> {
        self.fields
            .iter()
            .find(|(_, f)| f.id() == id)
            .map(|(h, _)| h)
            .ok_or_else(|| ProcedureError::UnknownProcedureField(id.to_string()))
    }

    /// Declare that `fields` denote one attribute. Each participant field may
    /// appear in one procedure field only, and each participant contributes at
    /// most one field to it.
    pub fn add_procedure_field(
        &mut self,
        id: impl Into<String>,
        fields: &[ParticipantField],
    ) -> Result<ProcedureFieldId, ProcedureError> {
        let id = id.into();
        if fields.is_empty() {
            return Err(ProcedureError::EmptyProcedureField(id));
        }
        if self.fields.iter().any(|(_, f)| f.id() == id) {
            return Err(ProcedureError::DuplicateProcedureField(id));
        }

        let mut set = OrderedSet::new();
        for &pf in fields {
            self.check_participant_field(pf)?;
            if self.used.contains(&pf) || set.contains(pf) {
                return Err(ProcedureError::ParticipantFieldReused {
                    field: describe(&self.participants, pf),
                });
            }
            if set.iter().any(|other: ParticipantField| other.participant == pf.participant) {
                return Err(ProcedureError::ConfigValidation(format!(
                    "procedure field '{id}' takes two fields from participant '{}'",
                    self.participants[pf.participant].code()
                )));
            }
            set.push(pf);
        }

        self.used.extend(set.iter());
        Ok(self.fields.alloc(ProcedureField::new(id, set)))
    }

    /// Compare `participants` pairwise on `fields`. Needs two or more distinct
    /// participants, at least one field, and every participant must own a
    /// field in every listed procedure field.
    pub fn add_matching_rule(
        &mut self,
        participants: &[ParticipantId],
        fields: &[ProcedureFieldId],
    ) -> Result<MatchingRuleId, ProcedureError> {
        let participants: ParticipantsSet = participants.iter().copied().collect();
        let fields: FieldsSet = fields.iter().copied().collect();

        if participants.len() < 2 {
            return Err(ProcedureError::InvalidRule(
                "matching rule needs at least two participants".into(),
            ));
        }
        if fields.is_empty() {
            return Err(ProcedureError::InvalidRule(
                "matching rule needs at least one procedure field".into(),
            ));
        }

        for participant in participants.iter() {
            if self.participants.get(participant).is_none() {
                return Err(ProcedureError::UnknownParticipant(format!("{participant:?}")));
            }
        }
        for field in fields.iter() {
            let procedure_field = self
                .fields
                .get(field)
                .ok_or_else(|| ProcedureError::UnknownProcedureField(format!("{field:?}")))?;
            for participant in participants.iter() {
                if procedure_field.owned_by(participant).is_none() {
                    return Err(ProcedureError::InvalidRule(format!(
                        "participant '{}' has no field in procedure field '{}'",
                        self.participants[participant].code(),
                        procedure_field.id()
                    )));
                }
            }
        }

        Ok(self.matching.add(participants, fields))
    }

    /// Weight `field` when combining. The field must belong to a procedure field.
    pub fn add_combining_rule(
        &mut self,
        field: ParticipantField,
        priority: i64,
        empty_has_priority: bool,
    ) -> Result<(), ProcedureError> {
        self.check_participant_field(field)?;
        if !self.used.contains(&field) {
            return Err(ProcedureError::InvalidRule(format!(
                "combining rule on '{}' which no procedure field uses",
                describe(&self.participants, field)
            )));
        }
        self.combining.set(field, priority, empty_has_priority);
        Ok(())
    }

    pub fn build(self) -> Result<Procedure, ProcedureError> {
        if self.name.trim().is_empty() {
            return Err(ProcedureError::ConfigValidation("procedure name is empty".into()));
        }
        if self.participants.is_empty() {
            return Err(ProcedureError::ConfigValidation("no participants".into()));
        }
        Ok(Procedure {
            name: self.name,
            participants: self.participants,
            fields: self.fields,
            matching: self.matching,
            combining: self.combining,
        })
    }

    fn check_participant_field(&self, pf: ParticipantField) -> Result<(), ProcedureError> {
        let participant = self
            .participants
            .get(pf.participant)
            .ok_or_else(|| ProcedureError::UnknownParticipant(format!("{:?}", pf.participant)))?;
        if participant.field(pf.field_index()).is_none() {
            return Err(ProcedureError::UnknownField {
                participant: participant.code().to_string(),
                field: format!("#{}", pf.field),
            });
        }
        Ok(())
    }
}
