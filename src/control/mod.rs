pub mod autopilot;
pub mod config;
pub mod flight_state;
pub mod laws;
pub mod modes;
pub mod scheduler;
mod trim;

pub use autopilot::Autopilot;
pub use autopilot::ParamsSnapshot;
pub use trim::TrimVector;
