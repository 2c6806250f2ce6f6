use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use race_dynamics::dynamics::TelemetrySnapshot;

#[derive(Serialize)]
pub struct TelemetryMessage<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub tick: u64,
    pub position: [f32; 3],
    pub telemetry: &'a TelemetrySnapshot,
}

/// Connected drivers + the broadcast tick, shared between the tick loop and
/// the WebSocket tasks.
pub struct SharedState {
    pub tick: u64,
    pub clients: HashMap<Uuid, UnboundedSender<String>>,
}

impl SharedState {
    pub fn new() -> Self {
        Self { tick: 0, clients: HashMap::new() }
    }

    pub fn register_client(&mut self, id: Uuid, tx: UnboundedSender<String>) {
        self.clients.insert(id, tx);
    }

    pub fn remove_client(&mut self, id: &Uuid) {
        self.clients.remove(id);
    }

    /// Send a telemetry frame to every client; closed channels are dropped.
    pub fn broadcast_telemetry(&mut self, telemetry: &TelemetrySnapshot, position: [f32; 3]) {
        if self.clients.is_empty() {
            return;
        }

        let msg = TelemetryMessage { kind: "telemetry", tick: self.tick, position, telemetry };
        let json = match serde_json::to_string(&msg) {
            Ok(j) => j,
            Err(e) => {
                eprintln!("⚠️ Failed to encode telemetry: {e}");
                return;
            }
        };

        self.clients.retain(|_, tx| tx.send(json.clone()).is_ok());
    }
}
