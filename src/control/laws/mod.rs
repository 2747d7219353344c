mod alt_hold;
mod auto_takeoff;
mod auto_throttle;
mod terrain_follow;
mod wing_level;

pub(crate) use alt_hold::AltitudeHold;
pub(crate) use auto_takeoff::AutoTakeoff;
pub(crate) use auto_throttle::AutoThrottle;
pub(crate) use terrain_follow::TerrainFollow;
pub(crate) use wing_level::WingLevel;

use super::config::ControlConfig;
use super::flight_state::FlightState;
use super::modes::{ApMode, ModeRegistry};
use super::trim::TrimVector;
use crate::nav::WaypointManager;
use crate::provider::{FlightDataProvider, ProviderError};
use async_trait::async_trait;

/// Everything one law invocation may read or touch. Built fresh per law
/// per cycle; the mutable pieces are the shared trim vector, the mode
/// registry and the route.
pub(crate) struct CycleContext<'a> {
    pub state: &'a FlightState,
    pub trim: &'a mut TrimVector,
    pub modes: &'a mut ModeRegistry,
    pub route: &'a mut WaypointManager,
    pub config: &'a ControlConfig,
    pub provider: &'a dyn FlightDataProvider,
}

/// One closed-loop controller. Each call is one discrete correction; the
/// only history a law may carry across cycles is its own adaptation state
/// (and, for the takeoff sequencer, its phase), so laws can be replaced
/// between cycles without corrupting control history.
#[async_trait]
pub(crate) trait ControlLaw: Send + Sync {
    /// The registry key that gates this law.
    fn mode(&self) -> ApMode;

    /// Applies one correction, side-effecting only through the provider
    /// and the shared trim vector.
    async fn apply(&mut self, ctx: &mut CycleContext<'_>) -> Result<(), ProviderError>;

    /// Drops any adaptation state. Called on vehicle reset.
    fn reset(&mut self) {}
}

/// The strategy table, resolved once at startup. Order matters: the
/// takeoff sequencer may enable other modes, and terrain-follow must
/// update the altitude target before altitude-hold consumes it.
pub(crate) fn strategy_table() -> Vec<Box<dyn ControlLaw>> {
    vec![
        Box::new(AutoTakeoff::new()),
        Box::new(TerrainFollow),
        Box::new(WingLevel::new()),
        Box::new(AltitudeHold),
        Box::new(AutoThrottle),
    ]
}
