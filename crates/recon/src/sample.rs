//! Synthetic records from the field types' `sample_value`.

use std::io;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::error::AdapterError;
use crate::model::ItemData;
use crate::participant::Participant;

/// `count` records with a sampled value for every declared field.
pub fn sample_items(participant: &Participant, count: usize, rng: &mut dyn RngCore) -> Vec<ItemData> {
    (0..count)
        .map(|_| {
            let mut item = ItemData::new();
            for field in participant.fields() {
                let _ = item.insert(field.name(), field.field_type().sample_value(rng));
            }
            item
        })
        .collect()
}

/// Write `count` sampled rows as CSV, header first. Same seed, same rows.
pub fn write_sample_csv<W: io::Write>(
    participant: &Participant,
    count: usize,
    seed: u64,
    out: W,
) -> Result<usize, AdapterError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(out);

    writer.write_record(participant.fields().iter().map(|f| f.name()))?;
    for item in sample_items(participant, count, &mut rng) {
        let mut record = Vec::with_capacity(participant.fields().len());
        for field in participant.fields() {
            let value = item.get(field.name()).cloned().unwrap_or_default();
            let cell = field
                .field_type()
                .convert_value_for_print(&value)
                .map_err(|e| AdapterError::Malformed(e.to_string()))?;
            record.push(cell);
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(count)
}
