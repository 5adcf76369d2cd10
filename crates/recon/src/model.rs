use std::sync::Arc;

use accord_core::{Handle, Identity, IdentityMap, KernelError, OrderedSet, Queue, ValueMap};
use serde::Serialize;

use crate::error::DomainError;
use crate::participant::Participant;
use crate::types::FieldType;
use crate::value::Value;

pub type ParticipantId = Handle<Participant>;
pub type ProcedureFieldId = Handle<ProcedureField>;

/// Participants a matching rule compares, in declaration order.
pub type ParticipantsSet = OrderedSet<ParticipantId>;

/// Procedure fields a matching rule compares on.
pub type FieldsSet = OrderedSet<ProcedureFieldId>;

// ---------------------------------------------------------------------------
// Field
// ---------------------------------------------------------------------------

/// Participant-owned field descriptor with its resolved type.
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    required: bool,
    field_type: Arc<dyn FieldType>,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: Arc<dyn FieldType>, required: bool) -> Self {
        Self {
            name: name.into(),
            required,
            field_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_code(&self) -> &str {
        self.field_type.code()
    }

    pub fn field_type(&self) -> &dyn FieldType {
        self.field_type.as_ref()
    }

    pub fn is_required(&self) -> bool {
        self.required
    }
}

// ---------------------------------------------------------------------------
// FieldValue
// ---------------------------------------------------------------------------

/// One raw input bound to one field: validated once, printed once.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValue {
    value: Value,
    printable: String,
}

impl FieldValue {
    pub fn new(field: &Field, raw: &Value) -> Result<Self, DomainError> {
        let wrap = |source| DomainError::InvalidValue {
            field: field.name.clone(),
            source,
        };
        let value = field.field_type.validate_value(raw).map_err(wrap)?;
        let printable = field.field_type.convert_value_for_print(&value).map_err(wrap)?;
        Ok(Self { value, printable })
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn printable(&self) -> &str {
        &self.printable
    }

    pub fn is_absent(&self) -> bool {
        self.value.is_null()
    }

    pub fn into_value(self) -> Value {
        self.value
    }
}

// ---------------------------------------------------------------------------
// ItemData
// ---------------------------------------------------------------------------

/// One record: field name → value, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ItemData {
    values: ValueMap<String, Value>,
}

impl ItemData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut item = Self::new();
        for (name, value) in pairs {
            item.insert(name, value)?;
        }
        Ok(item)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Result<(), DomainError> {
        let name = name.into();
        if name.is_empty() {
            return Err(DomainError::EmptyFieldName);
        }
        self.values.set(name, value.into());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.values.has_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.count()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

// ---------------------------------------------------------------------------
// ItemQueue
// ---------------------------------------------------------------------------

/// FIFO of records. Refuses empty records.
#[derive(Debug, Clone, Default)]
pub struct ItemQueue {
    inner: Queue<ItemData>,
}

impl ItemQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items<I: IntoIterator<Item = ItemData>>(items: I) -> Result<Self, KernelError> {
        let mut queue = Self::new();
        for item in items {
            queue.push(item)?;
        }
        Ok(queue)
    }

    pub fn push(&mut self, item: ItemData) -> Result<(), KernelError> {
        if item.is_empty() {
            return Err(KernelError::InvalidElement("item has no fields".into()));
        }
        self.inner.push(item);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<ItemData, KernelError> {
        self.inner.pop()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemData> {
        self.inner.iter()
    }
}

impl IntoIterator for ItemQueue {
    type Item = ItemData;
    type IntoIter = <Queue<ItemData> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

// ---------------------------------------------------------------------------
// ParticipantField / ProcedureField
// ---------------------------------------------------------------------------

/// One field as owned by one participant: `(participant, index into its fields)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticipantField {
    pub participant: ParticipantId,
    pub field: u32,
}

impl ParticipantField {
    pub fn new(participant: ParticipantId, field: usize) -> Self {
        Self {
            participant,
            field: field as u32,
        }
    }

    pub fn field_index(self) -> usize {
        self.field as usize
    }
}

impl Identity for ParticipantField {}

/// Participant fields that denote the same attribute, in declaration order.
#[derive(Debug, Clone)]
pub struct ProcedureField {
    id: String,
    fields: OrderedSet<ParticipantField>,
}

impl ProcedureField {
    pub(crate) fn new(id: impl Into<String>, fields: OrderedSet<ParticipantField>) -> Self {
        Self { id: id.into(), fields }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn fields(&self) -> &OrderedSet<ParticipantField> {
        &self.fields
    }

    /// The field `participant` contributes, if any. At most one per participant.
    pub fn owned_by(&self, participant: ParticipantId) -> Option<ParticipantField> {
        self.fields.iter().find(|pf| pf.participant == participant)
    }
}

// ---------------------------------------------------------------------------
// Pipeline items
// ---------------------------------------------------------------------------

/// Records from different participants describing one entity.
#[derive(Debug, Clone, Default)]
pub struct MatchedItem {
    members: IdentityMap<ParticipantId, ItemData>,
}

impl MatchedItem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, participant: ParticipantId, item: ItemData) {
        self.members.set(participant, item);
    }

    pub fn get(&self, participant: ParticipantId) -> Option<&ItemData> {
        self.members.get(participant)
    }

    pub fn contains(&self, participant: ParticipantId) -> bool {
        self.members.has_key(participant)
    }

    pub fn participants(&self) -> impl Iterator<Item = ParticipantId> + '_ {
        self.members.keys()
    }

    pub fn len(&self) -> usize {
        self.members.count()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParticipantId, &ItemData)> {
        self.members.iter()
    }
}

/// The merged record for one entity: procedure field → winning value.
#[derive(Debug, Clone, Default)]
pub struct CombinedItem {
    values: IdentityMap<ProcedureFieldId, Value>,
}

impl CombinedItem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: ProcedureFieldId, value: Value) {
        self.values.set(field, value);
    }

    pub fn get(&self, field: ProcedureFieldId) -> Option<&Value> {
        self.values.get(field)
    }

    pub fn len(&self) -> usize {
        self.values.count()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True when every resolved value is absent.
    pub fn all_absent(&self) -> bool {
        self.values.values().all(Value::is_null)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProcedureFieldId, &Value)> {
        self.values.iter()
    }
}

pub type CombinedData = Queue<CombinedItem>;
