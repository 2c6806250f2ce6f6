//! dynamics - engine-agnostic vehicle dynamics core (tire, powertrain, brakes,
//! suspension, load transfer) stepped once per fixed tick

pub mod types;
pub mod error;
pub mod config;
pub mod tire;
pub mod brake;
pub mod suspension;
pub mod load_transfer;
pub mod powertrain;
pub mod traction;
pub mod wheel;
pub mod telemetry;
pub mod step;

pub use types::*;
pub use error::{ConfigError, SimError};
pub use config::{
    BrakeConfig, ChassisConfig, EngineConfig, ErsConfig, GearboxConfig, SuspensionConfig, TireConfig, TractionConfig,
    VehicleConfig, WheelConfig,
};
pub use telemetry::{TelemetrySnapshot, WheelTelemetry};
pub use step::{
    Commands, PitService, SimulationInput, StepOutput, VehicleSimulation, VehicleSimulationState, WheelForce,
    WheelInput,
};
