//! In-memory hub
//!
//! Keeps the latest reading per sensor, a bounded history of readings and
//! the stored state of every switch. State can be loaded from and persisted
//! to a JSON file so switch state survives restarts.

use super::{SensorAddress, SensorSink, SwitchId, SwitchRegistry, SwitchValue};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const DEFAULT_MAX_ENTRIES_PER_SENSOR: usize = 1000;

/// Value of a single sensor reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SensorReading {
    Text { text: String },
    Meter { value: f64 },
    Custom { value: f64, unit: String },
}

/// Entry in the sensor history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorRecord {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub address: SensorAddress,
    pub name: String,
    pub reading: SensorReading,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredSwitch {
    id: SwitchId,
    name: String,
    value: SwitchValue,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct HubState {
    /// Keyed by the sensor kind and address, e.g. `meter/1/2`
    history: HashMap<String, Vec<SensorRecord>>,
    switches: Vec<StoredSwitch>,
    #[serde(skip)]
    switch_writes: usize,
}

/// Hub implementation that keeps everything in memory
#[derive(Debug, Clone)]
pub struct InMemoryHub {
    state: Arc<RwLock<HubState>>,
    state_file: Option<PathBuf>,
    max_entries_per_sensor: usize,
}

impl Default for InMemoryHub {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryHub {
    /// Create an empty hub without persistence
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(HubState::default())),
            state_file: None,
            max_entries_per_sensor: DEFAULT_MAX_ENTRIES_PER_SENSOR,
        }
    }

    /// Create a hub backed by a JSON state file
    pub fn with_state_file(path: impl Into<PathBuf>) -> Self {
        Self {
            state_file: Some(path.into()),
            ..Self::new()
        }
    }

    /// Limit the history kept per sensor
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries_per_sensor = max_entries.max(1);
        self
    }

    /// Seed a switch record
    pub async fn set_switch(&self, id: SwitchId, value: SwitchValue, name: &str) {
        let mut state = self.state.write().await;
        Self::store_switch(&mut state, id, value, name);
    }

    /// Load existing state from the state file, if there is one
    pub async fn load(&self) -> Result<()> {
        let Some(path) = &self.state_file else {
            return Ok(());
        };
        if !path.exists() {
            debug!("No hub state at {}", path.display());
            return Ok(());
        }

        let contents = tokio::fs::read_to_string(path).await?;
        let loaded: HubState = serde_json::from_str(&contents)?;
        info!(
            "Loaded {} switch record(s) from {}",
            loaded.switches.len(),
            path.display()
        );
        *self.state.write().await = loaded;
        Ok(())
    }

    /// Write the current state to the state file, if there is one
    pub async fn persist(&self) -> Result<()> {
        let Some(path) = &self.state_file else {
            return Ok(());
        };
        Self::write_state(&self.state, path).await
    }

    /// Persist the state on a fixed period in the background
    ///
    /// The task exits once `cancel` fires and never interrupts a write in
    /// progress. Returns `None` when the hub has no state file.
    pub fn start_periodic_sync(
        &self,
        period: std::time::Duration,
        cancel: CancellationToken,
    ) -> Option<JoinHandle<()>> {
        let path = self.state_file.clone()?;
        let state = self.state.clone();

        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {}
                }
                if let Err(e) = Self::write_state(&state, &path).await {
                    warn!("Failed to persist hub state: {}", e);
                }
            }
            debug!("Hub state sync stopped");
        }))
    }

    /// Most recent reading of a text sensor
    pub async fn last_text(&self, address: SensorAddress) -> Option<String> {
        match self.latest(&Self::key("text", address)).await? {
            SensorReading::Text { text } => Some(text),
            _ => None,
        }
    }

    /// Most recent reading of a meter sensor
    pub async fn last_meter(&self, address: SensorAddress) -> Option<f64> {
        match self.latest(&Self::key("meter", address)).await? {
            SensorReading::Meter { value } => Some(value),
            _ => None,
        }
    }

    /// Most recent reading of a custom sensor
    pub async fn last_custom(&self, address: SensorAddress) -> Option<f64> {
        match self.latest(&Self::key("custom", address)).await? {
            SensorReading::Custom { value, .. } => Some(value),
            _ => None,
        }
    }

    /// All readings of every sensor, oldest first
    pub async fn readings(&self) -> Vec<SensorRecord> {
        let state = self.state.read().await;
        let mut all: Vec<SensorRecord> = state.history.values().flatten().cloned().collect();
        all.sort_by_key(|record| record.timestamp);
        all
    }

    /// Number of readings received, across all sensors
    pub async fn reading_count(&self) -> usize {
        self.state.read().await.history.values().map(Vec::len).sum()
    }

    /// Number of switch writes accepted since creation
    pub async fn switch_writes(&self) -> usize {
        self.state.read().await.switch_writes
    }

    fn key(kind: &str, address: SensorAddress) -> String {
        format!("{kind}/{address}")
    }

    async fn latest(&self, key: &str) -> Option<SensorReading> {
        let state = self.state.read().await;
        state
            .history
            .get(key)
            .and_then(|entries| entries.last())
            .map(|record| record.reading.clone())
    }

    async fn record(&self, key: String, address: SensorAddress, name: &str, reading: SensorReading) {
        let entry = SensorRecord {
            timestamp: chrono::Utc::now(),
            address,
            name: name.to_string(),
            reading,
        };

        let mut state = self.state.write().await;
        let entries = state.history.entry(key).or_default();
        entries.push(entry);
        if entries.len() > self.max_entries_per_sensor {
            entries.remove(0);
        }
    }

    fn store_switch(state: &mut HubState, id: SwitchId, value: SwitchValue, name: &str) {
        match state.switches.iter_mut().find(|stored| stored.id == id) {
            Some(stored) => stored.value = value,
            None => state.switches.push(StoredSwitch {
                id,
                name: name.to_string(),
                value,
            }),
        }
    }

    async fn write_state(state: &RwLock<HubState>, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(&*state.read().await)?;
        tokio::fs::write(path, json).await?;
        debug!("Persisted hub state to {}", path.display());
        Ok(())
    }
}

#[async_trait]
impl SensorSink for InMemoryHub {
    async fn send_text_sensor(&self, address: SensorAddress, text: &str, name: &str) -> Result<()> {
        info!(sensor = %address, "{}", text);
        self.record(
            Self::key("text", address),
            address,
            name,
            SensorReading::Text {
                text: text.to_string(),
            },
        )
        .await;
        Ok(())
    }

    async fn send_meter_sensor(&self, address: SensorAddress, value: f64, name: &str) -> Result<()> {
        info!(sensor = %address, "{}: {:.3}", name, value);
        self.record(
            Self::key("meter", address),
            address,
            name,
            SensorReading::Meter { value },
        )
        .await;
        Ok(())
    }

    async fn send_custom_sensor(
        &self,
        address: SensorAddress,
        value: f64,
        name: &str,
        unit: &str,
    ) -> Result<()> {
        info!(sensor = %address, "{}: {:.3} {}", name, value, unit);
        self.record(
            Self::key("custom", address),
            address,
            name,
            SensorReading::Custom {
                value,
                unit: unit.to_string(),
            },
        )
        .await;
        Ok(())
    }
}

#[async_trait]
impl SwitchRegistry for InMemoryHub {
    async fn last_value(&self, id: &SwitchId) -> Option<SwitchValue> {
        let state = self.state.read().await;
        state
            .switches
            .iter()
            .find(|stored| stored.id == *id)
            .map(|stored| stored.value)
    }

    async fn write_value(&self, id: &SwitchId, value: SwitchValue, name: &str) -> Result<()> {
        info!(
            switch = %id,
            "{} switched {} (level {})",
            name,
            if value.on { "on" } else { "off" },
            value.level
        );
        let mut state = self.state.write().await;
        Self::store_switch(&mut state, *id, value, name);
        state.switch_writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[tokio::test]
    async fn test_latest_readings_per_kind() {
        let hub = InMemoryHub::new();
        let address = SensorAddress::new(1, 1);

        hub.send_text_sensor(address, "first", "").await.unwrap();
        hub.send_text_sensor(address, "second", "").await.unwrap();
        hub.send_meter_sensor(address, 2.5, "Bytes Send (MB)")
            .await
            .unwrap();

        assert_eq!(hub.last_text(address).await.as_deref(), Some("second"));
        assert_eq!(hub.last_meter(address).await, Some(2.5));
        assert_eq!(hub.last_custom(address).await, None);
        assert_eq!(hub.reading_count().await, 3);
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let hub = InMemoryHub::new().with_max_entries(2);
        let address = SensorAddress::new(1, 2);
        for value in [1.0, 2.0, 3.0] {
            hub.send_meter_sensor(address, value, "meter").await.unwrap();
        }

        let readings = hub.readings().await;
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].reading, SensorReading::Meter { value: 2.0 });
    }

    #[tokio::test]
    async fn test_switch_writes_are_counted() {
        let hub = InMemoryHub::new();
        let id = SwitchId::new(1, 1);
        assert_eq!(hub.last_value(&id).await, None);

        let on = SwitchValue { on: true, level: 15 };
        hub.write_value(&id, on, "Call").await.unwrap();
        assert_eq!(hub.last_value(&id).await, Some(on));
        assert_eq!(hub.switch_writes().await, 1);

        // Seeding does not count as a write
        hub.set_switch(id, SwitchValue { on: false, level: 15 }, "Call")
            .await;
        assert_eq!(hub.switch_writes().await, 1);
    }

    #[tokio::test]
    async fn test_state_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("hub.json");
        let id = SwitchId::new(1, 1);
        let on = SwitchValue { on: true, level: 15 };

        let hub = InMemoryHub::with_state_file(&path);
        hub.write_value(&id, on, "Call").await.unwrap();
        hub.send_text_sensor(SensorAddress::new(1, 1), "Connected ID: 7 Number: 1", "")
            .await
            .unwrap();
        hub.persist().await.unwrap();

        let restored = InMemoryHub::with_state_file(&path);
        restored.load().await.unwrap();
        assert_eq!(restored.last_value(&id).await, Some(on));
        assert_eq!(
            restored.last_text(SensorAddress::new(1, 1)).await.as_deref(),
            Some("Connected ID: 7 Number: 1")
        );
        assert_eq!(restored.switch_writes().await, 0);
    }

    #[tokio::test]
    async fn test_periodic_sync_stops_on_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hub.json");
        let hub = InMemoryHub::with_state_file(&path);
        hub.set_switch(SwitchId::new(1, 1), SwitchValue::from_percent(true, 100.0), "Call")
            .await;

        let cancel = CancellationToken::new();
        let sync = hub
            .start_periodic_sync(Duration::from_millis(10), cancel.clone())
            .unwrap();

        for _ in 0..100 {
            if path.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(path.exists());

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), sync)
            .await
            .unwrap()
            .unwrap();

        std::fs::remove_file(&path).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_periodic_sync_needs_state_file() {
        let hub = InMemoryHub::new();
        assert!(hub
            .start_periodic_sync(Duration::from_millis(10), CancellationToken::new())
            .is_none());
    }

    #[tokio::test]
    async fn test_load_without_file_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let hub = InMemoryHub::with_state_file(dir.path().join("missing.json"));
        hub.load().await.unwrap();
        assert_eq!(hub.reading_count().await, 0);
    }
}
