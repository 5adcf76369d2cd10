use std::path::PathBuf;

use super::AdapterSpec;
use crate::error::AdapterError;
use crate::model::{Field, ItemData, ItemQueue};
use crate::participant::ParticipantAdapter;
use crate::value::Value;

/// Cells of sequence fields hold elements separated by this.
const LIST_SEPARATOR: char = ';';

/// Reads records from a CSV file with a header row; writes delivered records
/// to another CSV file.
///
/// Empty cells are absent. Columns without a declared field are passed
/// through as strings and ignored by the collector.
#[derive(Debug, Clone)]
pub struct CsvAdapter {
    source: PathBuf,
    output: Option<PathBuf>,
    fields: Vec<Field>,
    delimiter: u8,
}

impl CsvAdapter {
    pub fn new(source: impl Into<PathBuf>, output: Option<PathBuf>, fields: Vec<Field>) -> Self {
        Self {
            source: source.into(),
            output,
            fields,
            delimiter: b',',
        }
    }

    /// Options: `source` (required), `output`, `delimiter` (one ASCII char).
    pub fn from_spec(spec: &AdapterSpec<'_>) -> Result<Self, AdapterError> {
        let source = spec
            .path_option("source")?
            .ok_or_else(|| AdapterError::Options("'source' is required".into()))?;
        let mut adapter = Self::new(source, spec.path_option("output")?, spec.fields.to_vec());
        if let Some(delimiter) = spec.string_option("delimiter")? {
            match delimiter.as_bytes() {
                [b] if b.is_ascii() => adapter.delimiter = *b,
                _ => {
                    return Err(AdapterError::Options(format!(
                        "'delimiter' must be one ASCII character, got {delimiter:?}"
                    )))
                }
            }
        }
        Ok(adapter)
    }

    fn is_sequence(&self, column: &str) -> bool {
        self.fields
            .iter()
            .any(|f| f.name() == column && f.field_type().is_sequence())
    }

    fn cell_value(&self, column: &str, cell: &str) -> Value {
        if self.is_sequence(column) {
            let parts: Vec<Value> = cell
                .split(LIST_SEPARATOR)
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(Value::from)
                .collect();
            Value::List(parts)
        } else {
            Value::Str(cell.to_string())
        }
    }
}

impl ParticipantAdapter for CsvAdapter {
    fn provided_data(&self) -> Result<ItemQueue, AdapterError> {
        let mut reader = ::csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(self.delimiter)
            .trim(::csv::Trim::All)
            .from_path(&self.source)?;

        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

        let mut queue = ItemQueue::new();
        for (row, record) in reader.records().enumerate() {
            let record = record?;
            let mut item = ItemData::new();
            for (column, cell) in headers.iter().zip(record.iter()) {
                if column.is_empty() || cell.is_empty() {
                    continue;
                }
                item.insert(column.as_str(), self.cell_value(column, cell))
                    .map_err(|e| AdapterError::Malformed(e.to_string()))?;
            }
            if item.is_empty() {
                tracing::debug!("{}: row {} is blank, skipped", self.source.display(), row + 2);
                continue;
            }
            queue
                .push(item)
                .map_err(|e| AdapterError::Malformed(e.to_string()))?;
        }
        Ok(queue)
    }

    fn deliver_data(&self, items: ItemQueue) -> Result<bool, AdapterError> {
        let Some(output) = &self.output else {
            tracing::info!(
                "{}: no output configured, {} delivered item(s) discarded",
                self.source.display(),
                items.len()
            );
            return Ok(true);
        };

        let mut writer = ::csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .terminator(::csv::Terminator::Any(b'\n'))
            .from_path(output)?;

        writer.write_record(self.fields.iter().map(Field::name))?;
        for item in items {
            let mut record = Vec::with_capacity(self.fields.len());
            for field in &self.fields {
                let cell = match item.get(field.name()) {
                    Some(value) => field
                        .field_type()
                        .convert_value_for_print(value)
                        .map_err(|e| AdapterError::Malformed(format!("{}: {e}", field.name())))?,
                    None => String::new(),
                };
                record.push(cell);
            }
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::types::{BooleanType, ItemIdType, SequenceType, StringType, ARRAY_OF_STRINGS};

    fn fields() -> Vec<Field> {
        vec![
            Field::new("id", Arc::new(ItemIdType), true),
            Field::new("name", Arc::new(StringType), false),
            Field::new("active", Arc::new(BooleanType), false),
            Field::new("tags", Arc::new(SequenceType::of(ARRAY_OF_STRINGS, Arc::new(StringType))), false),
        ]
    }

    #[test]
    fn reads_rows_with_absent_cells_and_lists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hr.csv");
        std::fs::write(&path, "id,name,active,tags\n1,Ann,Y,a; b\n2,,N,\n,,,\n").unwrap();

        let adapter = CsvAdapter::new(&path, None, fields());
        let mut queue = adapter.provided_data().unwrap();
        assert_eq!(queue.len(), 2);

        let first = queue.pop().unwrap();
        assert_eq!(first.get("name"), Some(&Value::from("Ann")));
        assert_eq!(first.get("tags"), Some(&Value::from(vec!["a", "b"])));

        let second = queue.pop().unwrap();
        assert!(!second.has("name"));
        assert!(!second.has("tags"));
        assert_eq!(second.get("active"), Some(&Value::from("N")));
    }

    #[test]
    fn missing_source_is_io_error() {
        let adapter = CsvAdapter::new("/nonexistent/accord/hr.csv", None, fields());
        assert!(matches!(adapter.provided_data(), Err(AdapterError::Io(_))));
    }

    #[test]
    fn writes_delivered_rows_in_field_order() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.csv");
        let adapter = CsvAdapter::new(dir.path().join("in.csv"), Some(out.clone()), fields());

        let items = ItemQueue::from_items([ItemData::from_pairs([
            ("tags", Value::from(vec!["x", "y"])),
            ("id", Value::Int(7)),
            ("active", Value::Bool(true)),
            ("name", Value::Null),
        ])
        .unwrap()])
        .unwrap();
        assert!(adapter.deliver_data(items).unwrap());

        let written = std::fs::read_to_string(out).unwrap();
        assert_eq!(written, "id,name,active,tags\n7,,Y,x; y\n");
    }

    #[test]
    fn no_output_discards() {
        let adapter = CsvAdapter::new("in.csv", None, fields());
        assert!(adapter.deliver_data(ItemQueue::new()).unwrap());
    }
}
