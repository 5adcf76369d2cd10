//! Participant adapters and the registry that builds them from a definition.
//!
//! Built-in kinds:
//! - `csv`: reads `source`, writes delivered data to `output` if set.
//! - `memory`: records from the `items` option, delivered data kept in memory.

mod csv;
mod memory;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::AdapterError;
use crate::model::Field;
use crate::participant::ParticipantAdapter;
use crate::value::Value;

pub use self::csv::CsvAdapter;
pub use self::memory::MemoryAdapter;

/// What a factory gets to build one participant's adapter.
#[derive(Debug, Clone, Copy)]
pub struct AdapterSpec<'a> {
    pub participant: &'a str,
    pub kind: &'a str,
    pub options: &'a toml::Table,
    pub fields: &'a [Field],
    /// Directory relative paths in options resolve against.
    pub base_dir: &'a Path,
}

impl AdapterSpec<'_> {
    /// Optional string option.
    pub fn string_option(&self, key: &str) -> Result<Option<&str>, AdapterError> {
        match self.options.get(key) {
            None => Ok(None),
            Some(toml::Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(AdapterError::Options(format!(
                "'{key}' must be a string, got {}",
                other.type_str()
            ))),
        }
    }

    /// Optional path option, resolved against `base_dir`.
    pub fn path_option(&self, key: &str) -> Result<Option<PathBuf>, AdapterError> {
        Ok(self.string_option(key)?.map(|p| {
            let path = Path::new(p);
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                self.base_dir.join(path)
            }
        }))
    }
}

pub type AdapterFactory =
    Box<dyn Fn(&AdapterSpec<'_>) -> Result<Arc<dyn ParticipantAdapter>, AdapterError> + Send + Sync>;

/// Adapter kind → factory. Populated explicitly, like the field-type registry.
#[derive(Default)]
pub struct AdapterRegistry {
    factories: BTreeMap<String, AdapterFactory>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("csv", Box::new(csv_factory));
        registry.register("memory", Box::new(memory_factory));
        registry
    }

    pub fn register(&mut self, kind: impl Into<String>, factory: AdapterFactory) {
        self.factories.insert(kind.into(), factory);
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// `None` when the kind is not registered.
    pub fn build(
        &self,
        spec: &AdapterSpec<'_>,
    ) -> Option<Result<Arc<dyn ParticipantAdapter>, AdapterError>> {
        self.factories.get(spec.kind).map(|factory| factory(spec))
    }
}

fn csv_factory(spec: &AdapterSpec<'_>) -> Result<Arc<dyn ParticipantAdapter>, AdapterError> {
    Ok(Arc::new(CsvAdapter::from_spec(spec)?))
}

fn memory_factory(spec: &AdapterSpec<'_>) -> Result<Arc<dyn ParticipantAdapter>, AdapterError> {
    Ok(Arc::new(MemoryAdapter::from_spec(spec)?))
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("kinds", &self.kinds().collect::<Vec<_>>())
            .finish()
    }
}

/// TOML option value → raw field value. Datetimes become strings.
pub(crate) fn value_from_toml(value: &toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::Str(s.clone()),
        toml::Value::Integer(i) => Value::Int(*i),
        toml::Value::Float(x) => Value::Float(*x),
        toml::Value::Boolean(b) => Value::Bool(*b),
        toml::Value::Datetime(d) => Value::Str(d.to_string()),
        toml::Value::Array(items) => Value::List(items.iter().map(value_from_toml).collect()),
        toml::Value::Table(_) => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_options_resolve_against_base_dir() {
        let options: toml::Table = toml::from_str(r#"source = "data/hr.csv""#).unwrap();
        let spec = AdapterSpec {
            participant: "hr",
            kind: "csv",
            options: &options,
            fields: &[],
            base_dir: Path::new("/defs"),
        };
        assert_eq!(
            spec.path_option("source").unwrap(),
            Some(PathBuf::from("/defs/data/hr.csv"))
        );
        assert_eq!(spec.path_option("output").unwrap(), None);
    }

    #[test]
    fn non_string_option_is_rejected() {
        let options: toml::Table = toml::from_str("source = 3").unwrap();
        let spec = AdapterSpec {
            participant: "hr",
            kind: "csv",
            options: &options,
            fields: &[],
            base_dir: Path::new("."),
        };
        assert!(matches!(spec.string_option("source"), Err(AdapterError::Options(_))));
    }

    #[test]
    fn builtins_registered() {
        let registry = AdapterRegistry::with_builtins();
        assert_eq!(registry.kinds().collect::<Vec<_>>(), vec!["csv", "memory"]);
        let options = toml::Table::new();
        let spec = AdapterSpec {
            participant: "x",
            kind: "ldap",
            options: &options,
            fields: &[],
            base_dir: Path::new("."),
        };
        assert!(registry.build(&spec).is_none());
    }

    #[test]
    fn toml_values_convert() {
        let table: toml::Table = toml::from_str(r#"v = [1, "a", true, 2.5]"#).unwrap();
        assert_eq!(
            value_from_toml(&table["v"]),
            Value::List(vec![Value::Int(1), "a".into(), Value::Bool(true), Value::Float(2.5)])
        );
    }
}
