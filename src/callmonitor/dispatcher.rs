//! Maps call events onto hub updates

use super::parser::CallEvent;
use crate::hub::{SensorAddress, SensorSink, SwitchId, SwitchRegistry, SwitchValue};
use std::sync::Arc;
use tracing::{debug, warn};

/// Text sensor that shows the latest call event
pub const CALL_TEXT_SENSOR: SensorAddress = SensorAddress::new(1, 1);

/// Switch that is on while a call is connected
pub const CALL_SWITCH: SwitchId = SwitchId::new(1, 1);

/// Display name of the call switch
pub const CALL_SWITCH_NAME: &str = "Call";

const CALL_SWITCH_LEVEL_PERCENT: f64 = 100.0;

/// Applies call events to the hub
#[derive(Clone)]
pub struct EventDispatcher {
    sensors: Arc<dyn SensorSink>,
    switches: Arc<dyn SwitchRegistry>,
}

impl EventDispatcher {
    pub fn new(sensors: Arc<dyn SensorSink>, switches: Arc<dyn SwitchRegistry>) -> Self {
        Self { sensors, switches }
    }

    /// Apply one event
    ///
    /// Connect and disconnect update the call switch before the text sensor.
    /// Hub failures are logged and otherwise ignored.
    pub async fn dispatch(&self, event: CallEvent) {
        debug!(
            command = event.command(),
            connection_id = event.connection_id(),
            "Dispatching call event"
        );

        match &event {
            CallEvent::Connect { .. } => {
                self.update_switch(CALL_SWITCH, true).await;
            }
            CallEvent::Disconnect { .. } => {
                self.update_switch(CALL_SWITCH, false).await;
            }
            CallEvent::Call { .. } | CallEvent::Ring { .. } => {}
        }

        let text = event.to_string();
        if let Err(e) = self
            .sensors
            .send_text_sensor(CALL_TEXT_SENSOR, &text, "")
            .await
        {
            warn!("Failed to publish call event: {}", e);
        }
    }

    /// Set the switch unless the registry already holds that state
    ///
    /// Returns whether a write was issued.
    pub async fn update_switch(&self, id: SwitchId, on: bool) -> bool {
        let value = SwitchValue::from_percent(on, CALL_SWITCH_LEVEL_PERCENT);

        if let Some(previous) = self.switches.last_value(&id).await {
            if value.is_redundant_after(&previous) {
                debug!(switch = %id, "Switch already in requested state");
                return false;
            }
        }

        match self.switches.write_value(&id, value, CALL_SWITCH_NAME).await {
            Ok(()) => true,
            Err(e) => {
                warn!(switch = %id, "Failed to update switch: {}", e);
                false
            }
        }
    }
}
