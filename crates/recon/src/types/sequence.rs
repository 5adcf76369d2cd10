use std::sync::Arc;

use rand::{Rng, RngCore};

use super::{FieldType, StringType};
use crate::error::InvalidValueError;
use crate::value::{ScalarKind, Value};

/// Separator between printed sequence elements. Text adapters split on `;`.
pub const PRINT_SEPARATOR: &str = "; ";

/// Homogeneous sequence of scalars.
///
/// Elements are validated one by one with the element type's rule; elements
/// that fail (or validate to absent) are dropped without error. A bare scalar
/// is treated as a one-element sequence. No survivors means absent.
///
/// Without an element type (`array`), any scalar is accepted and the kind of
/// the first surviving element decides which of the rest are kept.
#[derive(Debug, Clone)]
pub struct SequenceType {
    code: String,
    element: Option<Arc<dyn FieldType>>,
}

impl SequenceType {
    pub fn of(code: &str, element: Arc<dyn FieldType>) -> Self {
        Self {
            code: code.to_string(),
            element: Some(element),
        }
    }

    pub fn any(code: &str) -> Self {
        Self {
            code: code.to_string(),
            element: None,
        }
    }

    fn elements(raw: &Value) -> &[Value] {
        match raw {
            Value::List(items) => items,
            other => std::slice::from_ref(other),
        }
    }
}

impl FieldType for SequenceType {
    fn code(&self) -> &str {
        &self.code
    }

    fn validate_value(&self, raw: &Value) -> Result<Value, InvalidValueError> {
        if raw.is_null() {
            return Ok(Value::Null);
        }

        let mut survivors = Vec::new();
        let mut kind: Option<ScalarKind> = None;
        for item in Self::elements(raw) {
            let validated = match &self.element {
                Some(element) => match element.validate_value(item) {
                    Ok(v) => v,
                    Err(e) => {
                        tracing::trace!("{}: dropping element: {e}", self.code);
                        continue;
                    }
                },
                None => item.clone(),
            };
            let Some(item_kind) = validated.scalar_kind() else {
                continue;
            };
            match kind {
                None => kind = Some(item_kind),
                Some(k) if k != item_kind => continue,
                Some(_) => {}
            }
            survivors.push(validated);
        }

        if survivors.is_empty() {
            Ok(Value::Null)
        } else {
            Ok(Value::List(survivors))
        }
    }

    fn convert_value_for_print(&self, value: &Value) -> Result<String, InvalidValueError> {
        let items = match value {
            Value::Null => return Ok(String::new()),
            Value::List(items) => items,
            other => {
                return Err(InvalidValueError::new(
                    &self.code,
                    format!("cannot print {}", other.describe()),
                ))
            }
        };

        let mut parts = Vec::with_capacity(items.len());
        for item in items {
            let part = match &self.element {
                Some(element) => element.convert_value_for_print(item)?,
                None => match item {
                    Value::Str(s) => s.clone(),
                    Value::Bool(b) => b.to_string(),
                    other => super::print_number(other).ok_or_else(|| {
                        InvalidValueError::new(&self.code, format!("cannot print {}", other.describe()))
                    })?,
                },
            };
            parts.push(part);
        }
        Ok(parts.join(PRINT_SEPARATOR))
    }

    fn sample_value(&self, rng: &mut dyn RngCore) -> Value {
        let len = rng.gen_range(1..=3);
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            let item = match &self.element {
                Some(element) => element.sample_value(rng),
                None => StringType.sample_value(rng),
            };
            items.push(item);
        }
        Value::List(items)
    }

    fn is_sequence(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BooleanType, NumberType};

    #[test]
    fn drops_failing_elements_in_order() {
        let ty = SequenceType::of("array_of_numbers", Arc::new(NumberType));
        let raw = Value::List(vec!["1".into(), "x".into(), Value::Int(3), Value::from(vec![4]), "2.5".into()]);
        assert_eq!(
            ty.validate_value(&raw).unwrap(),
            Value::List(vec![Value::Int(1), Value::Int(3), Value::Float(2.5)])
        );
    }

    #[test]
    fn absent_elements_are_dropped() {
        let ty = SequenceType::of("array_of_strings", Arc::new(StringType));
        let raw = Value::List(vec!["a".into(), "".into(), Value::Null, "b".into()]);
        assert_eq!(ty.validate_value(&raw).unwrap(), Value::from(vec!["a", "b"]));
    }

    #[test]
    fn no_survivors_is_absent() {
        let ty = SequenceType::of("array_of_booleans", Arc::new(BooleanType));
        let raw = Value::List(vec!["maybe".into(), Value::Int(7)]);
        assert_eq!(ty.validate_value(&raw).unwrap(), Value::Null);
        assert_eq!(ty.validate_value(&Value::List(vec![])).unwrap(), Value::Null);
    }

    #[test]
    fn scalar_is_single_element_sequence() {
        let ty = SequenceType::of("array_of_strings", Arc::new(StringType));
        assert_eq!(ty.validate_value(&"solo".into()).unwrap(), Value::from(vec!["solo"]));
    }

    #[test]
    fn untyped_sequence_keeps_first_kind() {
        let ty = SequenceType::any("array");
        let raw = Value::List(vec![Value::Int(1), "a".into(), Value::Float(2.5), Value::Bool(true)]);
        assert_eq!(
            ty.validate_value(&raw).unwrap(),
            Value::List(vec![Value::Int(1), Value::Float(2.5)])
        );
    }

    #[test]
    fn prints_joined() {
        let ty = SequenceType::of("array_of_booleans", Arc::new(BooleanType));
        let value = Value::from(vec![true, false]);
        assert_eq!(ty.convert_value_for_print(&value).unwrap(), "Y; N");
        assert!(ty.convert_value_for_print(&Value::Bool(true)).is_err());
    }
}
