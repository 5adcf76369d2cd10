use std::fmt;
use std::sync::Arc;

use crate::error::{AdapterError, ProcedureError};
use crate::model::{Field, ItemQueue};

/// I/O half of a participant: where its records come from and go back to.
///
/// Adapters are shared across collector threads, so they must be `Send + Sync`
/// and use interior mutability for any state they keep.
pub trait ParticipantAdapter: Send + Sync {
    /// Raw records as the source holds them. Values are not yet validated.
    fn provided_data(&self) -> Result<ItemQueue, AdapterError>;

    /// Hand combined records back. `Ok(false)` means the sink declined them.
    fn deliver_data(&self, items: ItemQueue) -> Result<bool, AdapterError>;
}

/// A data source in the exchange: code, declared fields, adapter.
#[derive(Clone)]
pub struct Participant {
    code: String,
    fields: Vec<Field>,
    adapter: Arc<dyn ParticipantAdapter>,
}

impl Participant {
    /// Field names must be non-empty and unique within the participant.
    pub fn new(
        code: impl Into<String>,
        fields: Vec<Field>,
        adapter: Arc<dyn ParticipantAdapter>,
    ) -> Result<Self, ProcedureError> {
        let code = code.into();
        for (i, field) in fields.iter().enumerate() {
            if field.name().is_empty() {
                return Err(ProcedureError::EmptyFieldName { participant: code });
            }
            if fields[..i].iter().any(|f| f.name() == field.name()) {
                return Err(ProcedureError::DuplicateField {
                    participant: code,
                    field: field.name().to_string(),
                });
            }
        }
        Ok(Self { code, fields, adapter })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name() == name)
    }

    pub fn adapter(&self) -> &Arc<dyn ParticipantAdapter> {
        &self.adapter
    }

    pub fn provided_data(&self) -> Result<ItemQueue, AdapterError> {
        self.adapter.provided_data()
    }

    pub fn deliver_data(&self, items: ItemQueue) -> Result<bool, AdapterError> {
        self.adapter.deliver_data(items)
    }
}

impl fmt::Debug for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Participant")
            .field("code", &self.code)
            .field("fields", &self.fields.iter().map(Field::name).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
