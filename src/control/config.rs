use crate::{info, warn};
use serde::Deserialize;
use std::path::Path;

/// Every gain, threshold and margin the control laws use, grouped per law.
///
/// The defaults are tuned values, not derived constants; deployments
/// override them with a JSON file named by `TERRAPILOT_CONFIG`. Loaded
/// once at startup and passed by reference from then on.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ControlConfig {
    pub scheduler: SchedulerConfig,
    pub wing_level: WingLevelConfig,
    pub altitude_hold: AltitudeHoldConfig,
    pub auto_throttle: AutoThrottleConfig,
    pub terrain_follow: TerrainFollowConfig,
    pub auto_takeoff: AutoTakeoffConfig,
    pub route: RouteConfig,
}

impl ControlConfig {
    /// Loads overrides from the file named by `TERRAPILOT_CONFIG`, falling
    /// back to the defaults when unset or unreadable.
    pub fn load() -> Self {
        let Ok(path) = std::env::var("TERRAPILOT_CONFIG") else {
            return Self::default();
        };
        Self::from_file(&path)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Self {
        match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(config) => {
                    info!("Loaded control config from {}", path.as_ref().display());
                    config
                }
                Err(err) => {
                    warn!("Ignoring malformed control config: {err}");
                    Self::default()
                }
            },
            Err(err) => {
                warn!("Ignoring unreadable control config: {err}");
                Self::default()
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Control-cycle period in milliseconds.
    pub tick_interval_ms: u64,
    /// A cycle arriving later than this many periods after the previous
    /// one is discarded instead of applying a huge corrective step.
    pub stale_tick_factor: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self { Self { tick_interval_ms: 500, stale_tick_factor: 4 } }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WingLevelConfig {
    /// Target turn rate per degree of heading error, deg/s per deg.
    pub turn_rate_per_deg: f64,
    /// Clamp on the target turn rate, deg/s.
    pub max_turn_rate: f64,
    /// Scale of the square-root boost curve.
    pub boost_scale: f64,
    /// Lower bound of the adaptive maximum deflection.
    pub deflection_floor: f64,
    /// Upper bound of the adaptive maximum deflection.
    pub deflection_ceiling: f64,
    /// Per-cycle step of the adaptive maximum deflection.
    pub deflection_ramp: f64,
    /// Heading error below which the vehicle counts as on-target, deg.
    pub on_target_deg: f64,
    /// Heading-rate magnitude treated as a runaway, deg per cycle.
    pub runaway_rate: f64,
    /// Gain applied to the inverted-flight bank error.
    pub inverted_gain: f64,
}

impl Default for WingLevelConfig {
    fn default() -> Self {
        Self {
            turn_rate_per_deg: 0.1,
            max_turn_rate: 3.0,
            boost_scale: 3.0,
            deflection_floor: 0.05,
            deflection_ceiling: 0.5,
            deflection_ramp: 0.01,
            on_target_deg: 2.0,
            runaway_rate: 5.0,
            inverted_gain: 0.05,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AltitudeHoldConfig {
    /// Target vertical speed per foot of altitude error, fpm per ft.
    pub vs_per_foot: f64,
    /// Clamp on the target vertical speed, fpm.
    pub max_vs: f64,
    /// Tighter climb/descent clamp while landing, fpm.
    pub landing_max_vs: f64,
    /// Trim update per fpm of vertical-speed error.
    pub trim_gain: f64,
    /// Damping against the vertical-speed rate of change.
    pub damp_gain: f64,
    /// Altitude error below which updates are attenuated, ft.
    pub deadband_ft: f64,
    /// Vertical speed that triggers the emergency override, fpm.
    pub vs_emergency: f64,
    /// Tighter emergency threshold while landing, fpm.
    pub landing_vs_emergency: f64,
    /// Vertical-speed change per cycle that triggers the override, fpm.
    pub vs_rate_emergency: f64,
    /// Fixed opposing trim step applied during the override.
    pub recovery_step: f64,
    /// Climb targets shrink once airspeed falls under stall times this.
    pub stall_margin: f64,
}

impl Default for AltitudeHoldConfig {
    fn default() -> Self {
        Self {
            vs_per_foot: 8.0,
            max_vs: 1500.0,
            landing_max_vs: 500.0,
            trim_gain: 0.000_02,
            damp_gain: 0.000_05,
            deadband_ft: 100.0,
            vs_emergency: 3000.0,
            landing_vs_emergency: 1200.0,
            vs_rate_emergency: 800.0,
            recovery_step: 0.002,
            stall_margin: 1.15,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AutoThrottleConfig {
    /// Throttle step per cycle, percent.
    pub step_pct: f64,
    /// Speed error treated as on-target, kt.
    pub speed_deadband_kt: f64,
    /// Extra throttle per 100 ft below the target altitude, percent.
    pub climb_boost_per_100ft: f64,
    /// Clamp on the altitude-driven boost, percent.
    pub max_boost_pct: f64,
    /// Speed change per cycle that already matches expectation, kt.
    pub expected_accel_kt: f64,
}

impl Default for AutoThrottleConfig {
    fn default() -> Self {
        Self {
            step_pct: 1.0,
            speed_deadband_kt: 2.0,
            climb_boost_per_100ft: 0.2,
            max_boost_pct: 5.0,
            expected_accel_kt: 0.5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TerrainFollowConfig {
    /// Probe distance expressed as flight time ahead, seconds.
    pub lookahead_secs: f64,
    /// Floor on the probe distance, nautical miles.
    pub min_probe_nm: f64,
    /// Clearance added above the highest terrain found, ft.
    pub safety_margin_ft: f64,
    /// Altitude targets are rounded up to the next multiple of this, ft.
    pub round_to_ft: f64,
}

impl Default for TerrainFollowConfig {
    fn default() -> Self {
        Self { lookahead_secs: 60.0, min_probe_nm: 2.0, safety_margin_ft: 500.0, round_to_ft: 100.0 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AutoTakeoffConfig {
    /// Throttle step towards full power during the roll, percent per cycle.
    pub throttle_step_pct: f64,
    /// Rudder deflection per nautical mile of centerline offset.
    pub rudder_gain: f64,
    /// Rudder deflection per nautical mile per cycle of offset change.
    pub rudder_rate_gain: f64,
    /// Elevator step while rotating.
    pub rotate_elevator_step: f64,
    /// Maximum nose-up elevator during rotation.
    pub rotate_elevator_limit: f64,
    /// Climb rate the rotation targets, fpm.
    pub target_climb_fpm: f64,
    /// Height above ground required before handing off, ft.
    pub handoff_agl_ft: f64,
    /// Altitude-hold target above field elevation after handoff, ft.
    pub handoff_alt_margin_ft: f64,
    /// Throttle after handoff, percent.
    pub climb_throttle_pct: f64,
    /// Flaps notch set during prep.
    pub flaps_notch: f64,
    /// Pitch trim set during prep.
    pub takeoff_trim: f64,
    /// Length of the cached runway centerline, nautical miles.
    pub centerline_nm: f64,
}

impl Default for AutoTakeoffConfig {
    fn default() -> Self {
        Self {
            throttle_step_pct: 2.0,
            rudder_gain: 60.0,
            rudder_rate_gain: 400.0,
            rotate_elevator_step: 0.02,
            rotate_elevator_limit: 0.4,
            target_climb_fpm: 500.0,
            handoff_agl_ft: 150.0,
            handoff_alt_margin_ft: 1500.0,
            climb_throttle_pct: 90.0,
            flaps_notch: 1.0,
            takeoff_trim: 0.05,
            centerline_nm: 3.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RouteConfig {
    /// Arrival threshold around a waypoint, nautical miles.
    pub arrival_threshold_nm: f64,
    /// Half-width of a leg's terrain corridor, nautical miles.
    pub corridor_half_width_nm: f64,
    /// Half-angle of the unrouted lookahead cone, degrees.
    pub cone_half_angle_deg: f64,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self { arrival_threshold_nm: 1.0, corridor_half_width_nm: 2.0, cone_half_angle_deg: 15.0 }
    }
}
