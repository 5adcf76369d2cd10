//! Field-type system.
//!
//! Every declared type code maps to one [`FieldType`] implementation through an
//! explicit [`FieldTypeRegistry`]. A [`FieldTypeManager`] narrows the registry
//! to the codes the metadata source offers.
//!
//! | code                | validated shape                           |
//! |---------------------|-------------------------------------------|
//! | `string`            | `Str` (non-empty) or `Null`               |
//! | `number`            | `Int` / `Float` or `Null`                 |
//! | `boolean`           | `Bool`                                    |
//! | `item_id`           | positive `Int` or non-empty `Str`         |
//! | `array`             | `List` of one scalar kind, or `Null`      |
//! | `array_of_strings`  | `List` of `Str`, or `Null`                |
//! | `array_of_numbers`  | `List` of numbers, or `Null`              |
//! | `array_of_booleans` | `List` of `Bool`, or `Null`               |

mod scalar;
mod sequence;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use rand::RngCore;

use crate::error::{DomainError, InvalidValueError};
use crate::value::Value;

pub use scalar::{BooleanType, ItemIdType, NumberType, StringType};
pub use sequence::SequenceType;

pub const STRING: &str = "string";
pub const NUMBER: &str = "number";
pub const BOOLEAN: &str = "boolean";
pub const ITEM_ID: &str = "item_id";
pub const ARRAY: &str = "array";
pub const ARRAY_OF_STRINGS: &str = "array_of_strings";
pub const ARRAY_OF_NUMBERS: &str = "array_of_numbers";
pub const ARRAY_OF_BOOLEANS: &str = "array_of_booleans";

/// Validation, printing and sampling strategy for one type code.
pub trait FieldType: Send + Sync + fmt::Debug {
    fn code(&self) -> &str;

    /// Normalize a raw value. Must be idempotent on its own output.
    fn validate_value(&self, raw: &Value) -> Result<Value, InvalidValueError>;

    /// Render a validated value for humans and text sinks.
    fn convert_value_for_print(&self, value: &Value) -> Result<String, InvalidValueError>;

    /// A value `validate_value` accepts, for synthetic data.
    fn sample_value(&self, rng: &mut dyn RngCore) -> Value;

    /// Sequence types hold `List` values; text adapters split cells for them.
    fn is_sequence(&self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Type code → implementation. Populated explicitly at startup.
#[derive(Debug, Clone, Default)]
pub struct FieldTypeRegistry {
    types: BTreeMap<String, Arc<dyn FieldType>>,
}

impl FieldTypeRegistry {
    /// Empty registry, for callers that want full control over the type set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in type.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        let string: Arc<dyn FieldType> = Arc::new(StringType);
        let number: Arc<dyn FieldType> = Arc::new(NumberType);
        let boolean: Arc<dyn FieldType> = Arc::new(BooleanType);

        registry.register(string.clone());
        registry.register(number.clone());
        registry.register(boolean.clone());
        registry.register(Arc::new(ItemIdType));
        registry.register(Arc::new(SequenceType::any(ARRAY)));
        registry.register(Arc::new(SequenceType::of(ARRAY_OF_STRINGS, string)));
        registry.register(Arc::new(SequenceType::of(ARRAY_OF_NUMBERS, number)));
        registry.register(Arc::new(SequenceType::of(ARRAY_OF_BOOLEANS, boolean)));
        registry
    }

    /// Register (or replace) the implementation for `field_type.code()`.
    pub fn register(&mut self, field_type: Arc<dyn FieldType>) {
        self.types.insert(field_type.code().to_string(), field_type);
    }

    pub fn get(&self, code: &str) -> Option<Arc<dyn FieldType>> {
        self.types.get(code).cloned()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.types.contains_key(code)
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

/// Resolves type codes, restricted to the codes the metadata source offers.
#[derive(Debug, Clone)]
pub struct FieldTypeManager {
    registry: FieldTypeRegistry,
    available: BTreeSet<String>,
}

impl FieldTypeManager {
    /// Every registered code is available.
    pub fn new(registry: FieldTypeRegistry) -> Self {
        let available = registry.codes().map(str::to_string).collect();
        Self { registry, available }
    }

    /// Only `codes` are available. Codes without an implementation are kept in
    /// the cache but fail at resolution.
    pub fn with_available<I, S>(registry: FieldTypeRegistry, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let available = codes.into_iter().map(Into::into).collect();
        Self { registry, available }
    }

    pub fn available_codes(&self) -> impl Iterator<Item = &str> {
        self.available.iter().map(String::as_str)
    }

    pub fn resolve(&self, code: &str) -> Result<Arc<dyn FieldType>, DomainError> {
        if !self.available.contains(code) {
            return Err(DomainError::UnknownFieldType(code.to_string()));
        }
        self.registry
            .get(code)
            .ok_or_else(|| DomainError::UnknownFieldType(code.to_string()))
    }
}

/// Shortest text form of a number: integral floats print without a fraction.
pub(crate) fn print_number(value: &Value) -> Option<String> {
    match value {
        Value::Int(i) => Some(i.to_string()),
        Value::Float(x) => Some(x.to_string()),
        _ => None,
    }
}

/// Parse a numeric string: integers first, then finite floats.
pub(crate) fn parse_number(s: &str) -> Option<Value> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Some(Value::Int(i));
    }
    match trimmed.parse::<f64>() {
        Ok(x) if x.is_finite() => Some(Value::Float(x)),
        _ => None,
    }
}
