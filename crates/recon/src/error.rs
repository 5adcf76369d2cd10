use std::fmt;

// ---------------------------------------------------------------------------
// Field type errors
// ---------------------------------------------------------------------------

/// A field type refused a value.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidValueError {
    pub type_code: String,
    pub detail: String,
}

impl InvalidValueError {
    pub fn new(type_code: &str, detail: impl Into<String>) -> Self {
        Self {
            type_code: type_code.to_string(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for InvalidValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {} value: {}", self.type_code, self.detail)
    }
}

impl std::error::Error for InvalidValueError {}

// ---------------------------------------------------------------------------
// Domain errors (item level, recoverable)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Field value failed its type's validation or printing.
    InvalidValue { field: String, source: InvalidValueError },
    /// Type code not registered or not offered by the metadata source.
    UnknownFieldType(String),
    /// ItemData keys must be non-empty.
    EmptyFieldName,
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidValue { field, source } => write!(f, "field '{field}': {source}"),
            Self::UnknownFieldType(code) => write!(f, "unknown field type: {code}"),
            Self::EmptyFieldName => write!(f, "field name must not be empty"),
        }
    }
}

impl std::error::Error for DomainError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidValue { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Procedure errors (configuration level, fatal)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ProcedureError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Structural problem in the definition (missing name, no participants, ...).
    ConfigValidation(String),
    UnknownFieldType { participant: String, field: String, code: String },
    EmptyFieldName { participant: String },
    DuplicateField { participant: String, field: String },
    DuplicateParticipant(String),
    UnknownParticipant(String),
    UnknownField { participant: String, field: String },
    /// A `participant.field` reference that does not have that shape.
    BadFieldRef(String),
    UnknownAdapter { participant: String, kind: String },
    /// Adapter factory refused its options.
    Adapter { participant: String, message: String },
    EmptyProcedureField(String),
    DuplicateProcedureField(String),
    UnknownProcedureField(String),
    /// A participant field claimed by more than one procedure field.
    ParticipantFieldReused { field: String },
    /// Rule keyed or valued with the wrong kind of object.
    InvalidRule(String),
}

impl fmt::Display for ProcedureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::UnknownFieldType { participant, field, code } => {
                write!(f, "participant '{participant}', field '{field}': unknown field type '{code}'")
            }
            Self::EmptyFieldName { participant } => {
                write!(f, "participant '{participant}': field name must not be empty")
            }
            Self::DuplicateField { participant, field } => {
                write!(f, "participant '{participant}': duplicate field '{field}'")
            }
            Self::DuplicateParticipant(code) => write!(f, "duplicate participant '{code}'"),
            Self::UnknownParticipant(code) => write!(f, "unknown participant '{code}'"),
            Self::UnknownField { participant, field } => {
                write!(f, "participant '{participant}' has no field '{field}'")
            }
            Self::BadFieldRef(r) => {
                write!(f, "bad field reference '{r}' (expected 'participant.field')")
            }
            Self::UnknownAdapter { participant, kind } => {
                write!(f, "participant '{participant}': unknown adapter '{kind}'")
            }
            Self::Adapter { participant, message } => {
                write!(f, "participant '{participant}': adapter error: {message}")
            }
            Self::EmptyProcedureField(id) => {
                write!(f, "procedure field '{id}' has no participant fields")
            }
            Self::DuplicateProcedureField(id) => write!(f, "duplicate procedure field '{id}'"),
            Self::UnknownProcedureField(id) => write!(f, "unknown procedure field '{id}'"),
            Self::ParticipantFieldReused { field } => {
                write!(f, "participant field '{field}' is used by more than one procedure field")
            }
            Self::InvalidRule(msg) => write!(f, "invalid rule: {msg}"),
        }
    }
}

impl std::error::Error for ProcedureError {}

// ---------------------------------------------------------------------------
// Adapter errors (source level, recoverable)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum AdapterError {
    /// IO error (file read/write, connection).
    Io(String),
    /// Source answered with data that cannot be turned into items.
    Malformed(String),
    /// Adapter options are missing or wrong.
    Options(String),
}

impl fmt::Display for AdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::Malformed(msg) => write!(f, "malformed data: {msg}"),
            Self::Options(msg) => write!(f, "bad adapter options: {msg}"),
        }
    }
}

impl std::error::Error for AdapterError {}

impl From<std::io::Error> for AdapterError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<csv::Error> for AdapterError {
    fn from(e: csv::Error) -> Self {
        if e.is_io_error() {
            Self::Io(e.to_string())
        } else {
            Self::Malformed(e.to_string())
        }
    }
}
