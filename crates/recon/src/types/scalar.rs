use rand::distributions::Alphanumeric;
use rand::{Rng, RngCore};

use super::{parse_number, print_number, BOOLEAN, ITEM_ID, NUMBER, STRING};
use crate::error::InvalidValueError;
use crate::types::FieldType;
use crate::value::Value;

// ---------------------------------------------------------------------------
// string
// ---------------------------------------------------------------------------

/// Any scalar stringifies; the empty string is absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringType;

impl FieldType for StringType {
    fn code(&self) -> &str {
        STRING
    }

    fn validate_value(&self, raw: &Value) -> Result<Value, InvalidValueError> {
        let text = match raw {
            Value::Null => return Ok(Value::Null),
            Value::Str(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Int(_) | Value::Float(_) => print_number(raw).unwrap_or_default(),
            Value::List(_) => {
                return Err(InvalidValueError::new(STRING, "sequences cannot be stringified"))
            }
        };
        if text.is_empty() {
            Ok(Value::Null)
        } else {
            Ok(Value::Str(text))
        }
    }

    fn convert_value_for_print(&self, value: &Value) -> Result<String, InvalidValueError> {
        match value {
            Value::Null => Ok(String::new()),
            Value::Str(s) => Ok(s.clone()),
            other => Err(InvalidValueError::new(STRING, format!("cannot print {}", other.describe()))),
        }
    }

    fn sample_value(&self, rng: &mut dyn RngCore) -> Value {
        let len = rng.gen_range(4..=12);
        let text: String = (0..len).map(|_| rng.sample(Alphanumeric) as char).collect();
        Value::Str(text)
    }
}

// ---------------------------------------------------------------------------
// number
// ---------------------------------------------------------------------------

/// Integers and finite floats; numeric strings parse; booleans become 1/0.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumberType;

impl FieldType for NumberType {
    fn code(&self) -> &str {
        NUMBER
    }

    fn validate_value(&self, raw: &Value) -> Result<Value, InvalidValueError> {
        match raw {
            Value::Null => Ok(Value::Null),
            Value::Int(i) => Ok(Value::Int(*i)),
            Value::Float(x) if x.is_finite() => Ok(Value::Float(*x)),
            Value::Float(x) => Err(InvalidValueError::new(NUMBER, format!("non-finite {x}"))),
            Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
            Value::Str(s) => parse_number(s)
                .ok_or_else(|| InvalidValueError::new(NUMBER, format!("not numeric: {s:?}"))),
            Value::List(_) => Err(InvalidValueError::new(NUMBER, "sequence given")),
        }
    }

    fn convert_value_for_print(&self, value: &Value) -> Result<String, InvalidValueError> {
        if value.is_null() {
            return Ok(String::new());
        }
        print_number(value).ok_or_else(|| {
            InvalidValueError::new(NUMBER, format!("cannot print {}", value.describe()))
        })
    }

    fn sample_value(&self, rng: &mut dyn RngCore) -> Value {
        if rng.gen_bool(0.75) {
            Value::Int(rng.gen_range(1..=10_000))
        } else {
            // Two decimals keep printed samples readable.
            Value::Float(f64::from(rng.gen_range(1..=1_000_000i32)) / 100.0)
        }
    }
}

// ---------------------------------------------------------------------------
// boolean
// ---------------------------------------------------------------------------

/// `{true, 1, "1", "Y", "y"}` → true; `{false, 0, "0", "N", "n", absent}` → false.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanType;

impl FieldType for BooleanType {
    fn code(&self) -> &str {
        BOOLEAN
    }

    fn validate_value(&self, raw: &Value) -> Result<Value, InvalidValueError> {
        match raw {
            Value::Null => Ok(Value::Bool(false)),
            Value::Bool(b) => Ok(Value::Bool(*b)),
            Value::Int(1) => Ok(Value::Bool(true)),
            Value::Int(0) => Ok(Value::Bool(false)),
            Value::Str(s) => match s.as_str() {
                "1" | "Y" | "y" => Ok(Value::Bool(true)),
                "0" | "N" | "n" => Ok(Value::Bool(false)),
                _ => Err(InvalidValueError::new(BOOLEAN, format!("not a flag: {s:?}"))),
            },
            other => Err(InvalidValueError::new(BOOLEAN, format!("not a flag: {}", other.describe()))),
        }
    }

    fn convert_value_for_print(&self, value: &Value) -> Result<String, InvalidValueError> {
        match value {
            Value::Null => Ok(String::new()),
            Value::Bool(true) => Ok("Y".into()),
            Value::Bool(false) => Ok("N".into()),
            other => Err(InvalidValueError::new(BOOLEAN, format!("cannot print {}", other.describe()))),
        }
    }

    fn sample_value(&self, rng: &mut dyn RngCore) -> Value {
        Value::Bool(rng.gen_bool(0.5))
    }
}

// ---------------------------------------------------------------------------
// item_id
// ---------------------------------------------------------------------------

/// Positive integer or non-empty string. Numeric strings coerce to numbers
/// first, so `"42"` and `42` are the same id.
#[derive(Debug, Clone, Copy, Default)]
pub struct ItemIdType;

impl ItemIdType {
    fn positive_integer(value: &Value) -> Result<Value, InvalidValueError> {
        match value {
            Value::Int(i) if *i > 0 => Ok(Value::Int(*i)),
            Value::Float(x) if x.is_finite() && *x > 0.0 && x.fract() == 0.0 && *x <= i64::MAX as f64 => {
                Ok(Value::Int(*x as i64))
            }
            other => Err(InvalidValueError::new(
                ITEM_ID,
                format!("not a positive integer: {}", other.describe()),
            )),
        }
    }
}

impl FieldType for ItemIdType {
    fn code(&self) -> &str {
        ITEM_ID
    }

    fn validate_value(&self, raw: &Value) -> Result<Value, InvalidValueError> {
        match raw {
            Value::Int(_) | Value::Float(_) => Self::positive_integer(raw),
            Value::Str(s) if s.trim().is_empty() => {
                Err(InvalidValueError::new(ITEM_ID, "empty id"))
            }
            Value::Str(s) => match parse_number(s) {
                Some(number) => Self::positive_integer(&number),
                None => Ok(Value::Str(s.clone())),
            },
            other => Err(InvalidValueError::new(ITEM_ID, format!("not an id: {}", other.describe()))),
        }
    }

    fn convert_value_for_print(&self, value: &Value) -> Result<String, InvalidValueError> {
        match value {
            Value::Str(s) => Ok(s.clone()),
            Value::Int(_) | Value::Float(_) => Ok(print_number(value).unwrap_or_default()),
            other => Err(InvalidValueError::new(ITEM_ID, format!("cannot print {}", other.describe()))),
        }
    }

    fn sample_value(&self, rng: &mut dyn RngCore) -> Value {
        Value::Int(rng.gen_range(1..=999_999))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(ty: &dyn FieldType, raw: Value) -> Value {
        ty.validate_value(&raw).unwrap()
    }

    fn err(ty: &dyn FieldType, raw: Value) -> bool {
        ty.validate_value(&raw).is_err()
    }

    #[test]
    fn boolean_table() {
        let ty = BooleanType;
        for raw in [Value::Bool(true), Value::Int(1), "1".into(), "Y".into(), "y".into()] {
            assert_eq!(ok(&ty, raw), Value::Bool(true));
        }
        for raw in [Value::Bool(false), Value::Int(0), "0".into(), "N".into(), "n".into(), Value::Null] {
            assert_eq!(ok(&ty, raw), Value::Bool(false));
        }
        for raw in [Value::Int(2), "yes".into(), "".into(), Value::Float(1.0), Value::from(vec![1])] {
            assert!(err(&ty, raw));
        }
    }

    #[test]
    fn number_table() {
        let ty = NumberType;
        assert_eq!(ok(&ty, "12".into()), Value::Int(12));
        assert_eq!(ok(&ty, "1.25".into()), Value::Float(1.25));
        assert_eq!(ok(&ty, Value::Int(7)), Value::Int(7));
        assert_eq!(ok(&ty, Value::Float(0.5)), Value::Float(0.5));
        assert_eq!(ok(&ty, Value::Bool(true)), Value::Int(1));
        assert_eq!(ok(&ty, Value::Bool(false)), Value::Int(0));
        assert_eq!(ok(&ty, Value::Null), Value::Null);
        assert!(err(&ty, "twelve".into()));
        assert!(err(&ty, "".into()));
        assert!(err(&ty, Value::Float(f64::NAN)));
        assert!(err(&ty, Value::from(vec![1, 2])));
    }

    #[test]
    fn string_table() {
        let ty = StringType;
        assert_eq!(ok(&ty, "abc".into()), Value::from("abc"));
        assert_eq!(ok(&ty, "".into()), Value::Null);
        assert_eq!(ok(&ty, Value::Null), Value::Null);
        assert_eq!(ok(&ty, Value::Int(5)), Value::from("5"));
        assert_eq!(ok(&ty, Value::Float(2.5)), Value::from("2.5"));
        assert_eq!(ok(&ty, Value::Bool(true)), Value::from("true"));
        assert!(err(&ty, Value::from(vec!["a"])));
    }

    #[test]
    fn item_id_table() {
        let ty = ItemIdType;
        assert_eq!(ok(&ty, Value::Int(5)), Value::Int(5));
        assert_eq!(ok(&ty, "42".into()), Value::Int(42));
        assert_eq!(ok(&ty, "7.0".into()), Value::Int(7));
        assert_eq!(ok(&ty, "emp-001".into()), Value::from("emp-001"));
        assert!(err(&ty, Value::Int(0)));
        assert!(err(&ty, Value::Int(-3)));
        assert!(err(&ty, "-3".into()));
        assert!(err(&ty, "1.5".into()));
        assert!(err(&ty, "  ".into()));
        assert!(err(&ty, Value::Null));
        assert!(err(&ty, Value::Bool(true)));
    }

    #[test]
    fn printing() {
        assert_eq!(BooleanType.convert_value_for_print(&Value::Bool(true)).unwrap(), "Y");
        assert_eq!(NumberType.convert_value_for_print(&Value::Float(3.0)).unwrap(), "3");
        assert_eq!(NumberType.convert_value_for_print(&Value::Null).unwrap(), "");
        assert_eq!(ItemIdType.convert_value_for_print(&Value::Int(9)).unwrap(), "9");
        assert!(StringType.convert_value_for_print(&Value::Int(9)).is_err());
        assert!(BooleanType.convert_value_for_print(&Value::from("Y")).is_err());
    }
}
