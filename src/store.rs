use anyhow::Result;
use serde_json::Value;
use tracing::warn;

use crate::snapshot::Snapshot;

pub trait KeyValueStore {
    fn get_value(&self, key: &str) -> Result<Option<Value>>;
    fn set_value(&self, key: &str, value: &Value) -> Result<()>;
}

/// Append-only sequence of JSON records.
pub trait Dataset {
    fn push_data(&self, record: &Value) -> Result<()>;
}

/// The single "latest snapshot" entry of a key-value store.
pub struct LatestSlot<'s, S: ?Sized> {
    store: &'s S,
    key: &'s str,
}

impl<'s, S: KeyValueStore + ?Sized> LatestSlot<'s, S> {
    pub fn new(store: &'s S, key: &'s str) -> Self {
        Self { store, key }
    }

    /// `None` when nothing was stored yet, or when the stored value is not a
    /// snapshot (treated the same as never stored).
    pub fn read(&self) -> Result<Option<Snapshot>> {
        let Some(value) = self.store.get_value(self.key)? else {
            return Ok(None);
        };
        match serde_json::from_value(value) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                warn!("Ignoring unreadable {} value: {}", self.key, e);
                Ok(None)
            }
        }
    }

    pub fn write(&self, snapshot: &Snapshot) -> Result<()> {
        self.store.set_value(self.key, &snapshot.to_json())
    }
}
