mod host;
mod net;
mod state;

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::{interval, Duration};

use race_dynamics::dynamics::{SimError, VehicleConfig, VehicleSimulation};

use crate::host::{HostConfig, HostWorld};
use crate::net::start_websocket_server;
use crate::state::SharedState;

const DT: f32 = 1.0 / 60.0;

#[tokio::main]
async fn main() -> Result<(), SimError> {
    println!("🏎️ Starting race dynamics server...");

    // optional first argument: vehicle config JSON
    let config = match std::env::args().nth(1) {
        Some(path) => {
            let cfg = VehicleConfig::from_json_file(&path)?;
            println!("📄 Loaded vehicle config from {path}");
            cfg
        }
        None => VehicleConfig::default(),
    };

    let sim = VehicleSimulation::new(config)?;
    for issue in sim.config_issues() {
        eprintln!("⚠️ Config issue: {issue}");
    }

    let world = Arc::new(Mutex::new(HostWorld::new(sim, HostConfig::default())));
    let state = Arc::new(Mutex::new(SharedState::new()));

    tokio::spawn(start_websocket_server(Arc::clone(&state), Arc::clone(&world)));

    // Fixed timestep: 60 Hz
    let mut ticker = interval(Duration::from_secs_f32(DT));

    loop {
        ticker.tick().await;

        let mut world = world.lock().await;
        let Some(out) = world.step(DT) else {
            eprintln!("⚠️ Chassis body missing; skipping tick");
            continue;
        };
        let position = world.chassis_position();
        drop(world);

        let mut game = state.lock().await;
        game.tick += 1;
        game.broadcast_telemetry(&out.telemetry, position);

        if game.tick % 300 == 0 {
            println!("📊 {}", out.telemetry.summary());
        }
    }
}
