use serde::{Deserialize, Serialize};

/// A raw or validated field value.
///
/// `Null` is "absent". Validated values are either a scalar or a `List` of
/// scalars of one kind; raw values straight from an adapter may be anything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
}

/// Scalar kind, used to keep sequences homogeneous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Bool,
    Number,
    Str,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_scalar(&self) -> bool {
        self.scalar_kind().is_some()
    }

    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match self {
            Value::Bool(_) => Some(ScalarKind::Bool),
            Value::Int(_) | Value::Float(_) => Some(ScalarKind::Number),
            Value::Str(_) => Some(ScalarKind::Str),
            Value::Null | Value::List(_) => None,
        }
    }

    /// Short description for log and error messages.
    pub fn describe(&self) -> String {
        match self {
            Value::Null => "null".into(),
            Value::Bool(b) => format!("bool {b}"),
            Value::Int(i) => format!("int {i}"),
            Value::Float(x) => format!("float {x}"),
            Value::Str(s) => format!("string {s:?}"),
            Value::List(items) => format!("list of {}", items.len()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// `Int(i) == Float(x)` only when `x` is exactly the integer `i`.
fn int_equals_float(i: i64, x: f64) -> bool {
    const LIMIT: f64 = 9_223_372_036_854_775_808.0; // 2^63
    x.fract() == 0.0 && (-LIMIT..LIMIT).contains(&x) && x as i64 == i
}

/// Numbers compare by exact numeric value (`Int(1) == Float(1.0)`); everything
/// else is structural.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(i), Value::Float(x)) | (Value::Float(x), Value::Int(i)) => int_equals_float(*i, *x),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_compare_across_representations() {
        assert_eq!(Value::Int(3), Value::Float(3.0));
        assert_ne!(Value::Int(3), Value::Float(3.5));
        assert_ne!(Value::Int(1), Value::Bool(true));
        assert_ne!(Value::Str("1".into()), Value::Int(1));
    }

    #[test]
    fn large_integers_do_not_equal_rounded_floats() {
        let two_53 = 1_i64 << 53;
        assert_eq!(Value::Int(two_53), Value::Float(two_53 as f64));
        assert_ne!(Value::Int(two_53 + 1), Value::Float(two_53 as f64));
        assert_ne!(Value::Float(two_53 as f64), Value::Int(two_53 + 1));
        assert_ne!(Value::Int(i64::MAX), Value::Float(i64::MAX as f64));
        assert_eq!(Value::Int(i64::MIN), Value::Float(i64::MIN as f64));
        assert_ne!(Value::Int(0), Value::Float(f64::NAN));
        assert_ne!(Value::Int(i64::MAX), Value::Float(f64::INFINITY));
    }

    #[test]
    fn lists_compare_elementwise() {
        assert_eq!(Value::from(vec![1, 2]), Value::List(vec![Value::Int(1), Value::Float(2.0)]));
        assert_ne!(Value::from(vec![1, 2]), Value::from(vec![2, 1]));
    }

    #[test]
    fn deserializes_untagged_json() {
        let v: Value = serde_json::from_str(r#"[1, "a", true, null, 2.5]"#).unwrap();
        assert_eq!(
            v,
            Value::List(vec![
                Value::Int(1),
                Value::from("a"),
                Value::Bool(true),
                Value::Null,
                Value::Float(2.5),
            ])
        );
    }
}
