//! `accord-recon`: Multi-participant record reconciliation.
//!
//! Collects records from every participant of a procedure, groups the ones
//! that describe the same entity, picks one value per field by priority and
//! hands the result back. No CLI dependencies; sources are reached through
//! [`ParticipantAdapter`].

pub mod adapters;
pub mod collector;
pub mod combiner;
pub mod config;
pub mod delivery;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod model;
pub mod participant;
pub mod procedure;
pub mod report;
pub mod rules;
pub mod sample;
pub mod types;
pub mod value;
pub mod worker;

pub use adapters::AdapterRegistry;
pub use config::{BuildContext, ProcedureDefinition};
pub use engine::{run, RunOptions, RunOutcome};
pub use error::{AdapterError, DomainError, InvalidValueError, ProcedureError};
pub use model::{CombinedData, CombinedItem, Field, ItemData, ItemQueue, MatchedItem};
pub use participant::{Participant, ParticipantAdapter};
pub use procedure::Procedure;
pub use report::RunReport;
pub use types::{FieldType, FieldTypeRegistry};
pub use value::Value;
