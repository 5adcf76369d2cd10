use std::path::Path;

use serde::Deserialize;

use crate::adapters::{AdapterRegistry, AdapterSpec};
use crate::error::ProcedureError;
use crate::model::Field;
use crate::participant::Participant;
use crate::procedure::Procedure;
use crate::types::{FieldTypeManager, FieldTypeRegistry};

// ---------------------------------------------------------------------------
// Procedure definition (`*.procedure.toml`)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcedureDefinition {
    pub name: String,
    #[serde(default)]
    pub metadata: MetadataConfig,
    #[serde(default)]
    pub participants: Vec<ParticipantConfig>,
    #[serde(default)]
    pub procedure_fields: Vec<ProcedureFieldConfig>,
    #[serde(default)]
    pub matching: Vec<MatchingConfig>,
    #[serde(default)]
    pub combining: Vec<CombiningConfig>,
}

/// What the metadata source offers.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetadataConfig {
    /// Available type codes. Empty means every registered code.
    #[serde(default)]
    pub field_types: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParticipantConfig {
    pub code: String,
    pub adapter: String,
    #[serde(default)]
    pub options: toml::Table,
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub type_code: String,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcedureFieldConfig {
    pub id: String,
    /// `participant.field` references.
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatchingConfig {
    pub participants: Vec<String>,
    /// Procedure field ids.
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CombiningConfig {
    /// `participant.field` reference.
    pub field: String,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub empty_has_priority: bool,
}

/// Registries and paths a definition is built against.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    pub types: &'a FieldTypeRegistry,
    pub adapters: &'a AdapterRegistry,
    /// Directory of the definition file; relative adapter paths resolve here.
    pub base_dir: &'a Path,
}

/// Split `participant.field` at the first dot.
pub fn split_field_ref(reference: &str) -> Result<(&str, &str), ProcedureError> {
    match reference.split_once('.') {
        Some((participant, field)) if !participant.is_empty() && !field.is_empty() => {
            Ok((participant, field))
        }
        _ => Err(ProcedureError::BadFieldRef(reference.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate + Build
// ---------------------------------------------------------------------------

impl ProcedureDefinition {
    pub fn from_toml(input: &str) -> Result<Self, ProcedureError> {
        let definition: ProcedureDefinition =
            toml::from_str(input).map_err(|e| ProcedureError::ConfigParse(e.to_string()))?;
        definition.validate()?;
        Ok(definition)
    }

    /// Structural checks that need no registry.
    pub fn validate(&self) -> Result<(), ProcedureError> {
        if self.name.trim().is_empty() {
            return Err(ProcedureError::ConfigValidation("name must not be empty".into()));
        }

        if self.participants.is_empty() {
            return Err(ProcedureError::ConfigValidation(
                "at least one participant is required".into(),
            ));
        }

        for participant in &self.participants {
            if participant.code.trim().is_empty() {
                return Err(ProcedureError::ConfigValidation(
                    "participant code must not be empty".into(),
                ));
            }
            if participant.fields.is_empty() {
                return Err(ProcedureError::ConfigValidation(format!(
                    "participant '{}' declares no fields",
                    participant.code
                )));
            }
        }

        for field in &self.procedure_fields {
            for reference in &field.fields {
                split_field_ref(reference)?;
            }
        }
        for rule in &self.combining {
            split_field_ref(&rule.field)?;
        }

        Ok(())
    }

    pub fn participant(&self, code: &str) -> Option<&ParticipantConfig> {
        self.participants.iter().find(|p| p.code == code)
    }

    /// Resolve types and adapters, then assemble the procedure.
    pub fn build(&self, ctx: &BuildContext<'_>) -> Result<Procedure, ProcedureError> {
        let manager = if self.metadata.field_types.is_empty() {
            FieldTypeManager::new(ctx.types.clone())
        } else {
            FieldTypeManager::with_available(ctx.types.clone(), self.metadata.field_types.iter().cloned())
        };

        let mut builder = Procedure::builder(self.name.clone());

        for config in &self.participants {
            let fields = resolve_fields(config, &manager)?;
            let spec = AdapterSpec {
                participant: &config.code,
                kind: &config.adapter,
                options: &config.options,
                fields: &fields,
                base_dir: ctx.base_dir,
            };
            let adapter = ctx
                .adapters
                .build(&spec)
                .ok_or_else(|| ProcedureError::UnknownAdapter {
                    participant: config.code.clone(),
                    kind: config.adapter.clone(),
                })?
                .map_err(|e| ProcedureError::Adapter {
                    participant: config.code.clone(),
                    message: e.to_string(),
                })?;
            builder.add_participant(Participant::new(config.code.clone(), fields, adapter)?)?;
        }

        for config in &self.procedure_fields {
            let refs = config
                .fields
                .iter()
                .map(|r| {
                    let (participant, field) = split_field_ref(r)?;
                    builder.participant_field(participant, field)
                })
                .collect::<Result<Vec<_>, _>>()?;
            builder.add_procedure_field(config.id.clone(), &refs)?;
        }

        for rule in &self.matching {
            let participants = rule
                .participants
                .iter()
                .map(|code| builder.participant_id(code))
                .collect::<Result<Vec<_>, _>>()?;
            let fields = rule
                .fields
                .iter()
                .map(|id| builder.procedure_field_id(id))
                .collect::<Result<Vec<_>, _>>()?;
            builder.add_matching_rule(&participants, &fields)?;
        }

        for rule in &self.combining {
            let (participant, field) = split_field_ref(&rule.field)?;
            let pf = builder.participant_field(participant, field)?;
            builder.add_combining_rule(pf, rule.priority, rule.empty_has_priority)?;
        }

        let procedure = builder.build()?;
        tracing::debug!(
            "procedure '{}': {} participant(s), {} matching rule(s)",
            procedure.name(),
            procedure.participant_count(),
            procedure.matching_rules().len()
        );
        Ok(procedure)
    }
}

fn resolve_fields(config: &ParticipantConfig, manager: &FieldTypeManager) -> Result<Vec<Field>, ProcedureError> {
    config
        .fields
        .iter()
        .map(|f| {
            if f.name.is_empty() {
                return Err(ProcedureError::EmptyFieldName {
                    participant: config.code.clone(),
                });
            }
            let field_type = manager.resolve(&f.type_code).map_err(|_| ProcedureError::UnknownFieldType {
                participant: config.code.clone(),
                field: f.name.clone(),
                code: f.type_code.clone(),
            })?;
            Ok(Field::new(f.name.clone(), field_type, f.required))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
