use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use super::{value_from_toml, AdapterSpec};
use crate::error::AdapterError;
use crate::model::{ItemData, ItemQueue};
use crate::participant::ParticipantAdapter;

/// Records held in memory. Delivered data is kept for inspection.
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    items: Vec<ItemData>,
    failure: Option<String>,
    delay: Option<Duration>,
    reject_delivery: bool,
    delivered: Mutex<Vec<ItemData>>,
}

impl MemoryAdapter {
    pub fn new(items: Vec<ItemData>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    /// Adapter whose fetch and delivery always fail with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Sleep for `delay` before answering a fetch.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Answer deliveries with `Ok(false)`.
    pub fn rejecting_delivery(mut self) -> Self {
        self.reject_delivery = true;
        self
    }

    /// Options: `items` (array of tables), `delay_ms`, `fail`.
    pub fn from_spec(spec: &AdapterSpec<'_>) -> Result<Self, AdapterError> {
        let mut items = Vec::new();
        if let Some(raw) = spec.options.get("items") {
            let rows = raw
                .as_array()
                .ok_or_else(|| AdapterError::Options("'items' must be an array of tables".into()))?;
            for row in rows {
                let table = row
                    .as_table()
                    .ok_or_else(|| AdapterError::Options("'items' must be an array of tables".into()))?;
                let item = ItemData::from_pairs(table.iter().map(|(k, v)| (k.as_str(), value_from_toml(v))))
                    .map_err(|e| AdapterError::Options(e.to_string()))?;
                items.push(item);
            }
        }

        let mut adapter = Self::new(items);
        if let Some(fail) = spec.string_option("fail")? {
            adapter.failure = Some(fail.to_string());
        }
        if let Some(delay) = spec.options.get("delay_ms") {
            let ms = delay
                .as_integer()
                .and_then(|ms| u64::try_from(ms).ok())
                .ok_or_else(|| AdapterError::Options("'delay_ms' must be a non-negative integer".into()))?;
            adapter.delay = Some(Duration::from_millis(ms));
        }
        Ok(adapter)
    }

    /// Everything delivered so far, oldest first.
    pub fn delivered(&self) -> Vec<ItemData> {
        self.delivered
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl ParticipantAdapter for MemoryAdapter {
    fn provided_data(&self) -> Result<ItemQueue, AdapterError> {
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        if let Some(message) = &self.failure {
            return Err(AdapterError::Io(message.clone()));
        }
        ItemQueue::from_items(self.items.iter().cloned()).map_err(|e| AdapterError::Malformed(e.to_string()))
    }

    fn deliver_data(&self, items: ItemQueue) -> Result<bool, AdapterError> {
        if let Some(message) = &self.failure {
            return Err(AdapterError::Io(message.clone()));
        }
        if self.reject_delivery {
            return Ok(false);
        }
        self.delivered
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .extend(items);
        Ok(true)
    }
}
