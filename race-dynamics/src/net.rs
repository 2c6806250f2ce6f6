use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use uuid::Uuid;

use crate::host::{DriverCommand, DriverControls, HostWorld};
use crate::state::SharedState;

pub const WS_ADDR: &str = "0.0.0.0:9001";

/// Everything a driver client may send.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Input {
        #[serde(default)]
        throttle: f32,
        #[serde(default)]
        brake: f32,
        #[serde(default)]
        ers: f32,
        #[serde(default)]
        steer: f32,
    },
    Command {
        command: DriverCommand,
    },
    Surface {
        wetness: f32,
    },
    Ping,
}

impl ClientMessage {
    pub fn from_json(txt: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(txt)
    }
}

fn apply_message(world: &mut HostWorld, msg: ClientMessage) {
    match msg {
        ClientMessage::Input { throttle, brake, ers, steer } => {
            let clean = |x: f32, lo: f32| if x.is_finite() { x.clamp(lo, 1.0) } else { 0.0 };
            world.controls = DriverControls {
                throttle: clean(throttle, 0.0),
                brake: clean(brake, 0.0),
                ers: clean(ers, 0.0),
                steer: clean(steer, -1.0),
            };
        }
        ClientMessage::Command { command } => world.command(command),
        ClientMessage::Surface { wetness } => {
            world.set_wetness(wetness);
            println!("🌧️ Surface wetness set to {:.2}", world.wetness);
        }
        ClientMessage::Ping => {}
    }
}

pub async fn start_websocket_server(state: Arc<Mutex<SharedState>>, world: Arc<Mutex<HostWorld>>) {
    let listener = match TcpListener::bind(WS_ADDR).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("❌ Failed to bind WebSocket port ({WS_ADDR}): {e}");
            return;
        }
    };

    println!("🌐 WebSocket listening on ws://localhost:9001");

    loop {
        let (raw, addr) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                eprintln!("⚠️ Accept failed: {e}");
                continue;
            }
        };
        let state = Arc::clone(&state);
        let world = Arc::clone(&world);

        tokio::spawn(async move {
            let ws = match accept_async(raw).await {
                Ok(ws) => ws,
                Err(e) => {
                    eprintln!("⚠️ WebSocket handshake with {addr} failed: {e}");
                    return;
                }
            };
            let (mut write, mut read) = ws.split();

            // -------------------------------
            // 1) outgoing channel + send loop
            // -------------------------------
            let (tx, mut rx) = mpsc::unbounded_channel::<String>();
            let client_id = Uuid::new_v4();
            state.lock().await.register_client(client_id, tx.clone());

            tokio::spawn(async move {
                while let Some(msg) = rx.recv().await {
                    if write.send(Message::Text(msg)).await.is_err() {
                        break;
                    }
                }
            });

            println!("🟢 Driver connected: {client_id} ({addr})");
            let welcome = serde_json::json!({ "type": "welcome", "client_id": client_id.to_string() });
            let _ = tx.send(welcome.to_string());

            // -------------------------------
            // 2) receive loop
            // -------------------------------
            while let Some(msg) = read.next().await {
                let msg = match msg {
                    Ok(m) => m,
                    Err(_) => break,
                };
                if !msg.is_text() {
                    continue;
                }
                let Ok(text) = msg.to_text() else { continue };

                match ClientMessage::from_json(text) {
                    Ok(ClientMessage::Ping) => {
                        let _ = tx.send(r#"{"type":"pong"}"#.into());
                    }
                    Ok(parsed) => apply_message(&mut *world.lock().await, parsed),
                    Err(e) => eprintln!("⚠️ Ignoring bad message from {client_id}: {e}"),
                }
            }

            println!("🔴 Driver disconnected: {client_id}");
            state.lock().await.remove_client(&client_id);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostConfig;
    use race_dynamics::dynamics::{VehicleConfig, VehicleSimulation};

    #[test]
    fn parses_every_message_kind() {
        assert_eq!(
            ClientMessage::from_json(r#"{"type":"input","throttle":0.7,"steer":-0.2}"#).unwrap(),
            ClientMessage::Input { throttle: 0.7, brake: 0.0, ers: 0.0, steer: -0.2 }
        );
        assert_eq!(
            ClientMessage::from_json(r#"{"type":"command","command":"shift_up"}"#).unwrap(),
            ClientMessage::Command { command: DriverCommand::ShiftUp }
        );
        assert_eq!(
            ClientMessage::from_json(r#"{"type":"command","command":"new_lap"}"#).unwrap(),
            ClientMessage::Command { command: DriverCommand::NewLap }
        );
        assert_eq!(
            ClientMessage::from_json(r#"{"type":"surface","wetness":0.4}"#).unwrap(),
            ClientMessage::Surface { wetness: 0.4 }
        );
        assert_eq!(ClientMessage::from_json(r#"{"type":"ping"}"#).unwrap(), ClientMessage::Ping);
    }

    #[test]
    fn rejects_unknown_messages() {
        assert!(ClientMessage::from_json(r#"{"type":"command","command":"warp"}"#).is_err());
        assert!(ClientMessage::from_json(r#"{"type":"teleport"}"#).is_err());
        assert!(ClientMessage::from_json("not json").is_err());
    }

    #[test]
    fn input_is_clamped_before_reaching_the_car() {
        let sim = VehicleSimulation::new(VehicleConfig::default()).unwrap();
        let mut world = HostWorld::new(sim, HostConfig::default());
        apply_message(&mut world, ClientMessage::Input { throttle: 4.0, brake: -1.0, ers: f32::NAN, steer: -3.0 });
        assert_eq!(world.controls, DriverControls { throttle: 1.0, brake: 0.0, ers: 0.0, steer: -1.0 });
    }
}
