mod bridge;
#[cfg(test)]
pub(crate) mod mock;

pub use bridge::BridgeProvider;

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use strum_macros::Display;

/// Simulator variables the core reads and writes. The display form is the
/// wire name understood by the flight-data gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlightVar {
    // Per-cycle state.
    Latitude,
    Longitude,
    AltitudeIndicated,
    AltitudeAgl,
    VerticalSpeed,
    Bank,
    HeadingTrue,
    HeadingMag,
    TurnRate,
    AirspeedIndicated,
    GroundSpeed,
    SimOnGround,
    MagVar,
    EngineCombustion,
    BusVoltage,
    CrashFlag,
    // Static aircraft model.
    TotalWeight,
    WingArea,
    StallSpeed,
    CruiseSpeed,
    RotationSpeed,
    TrimUpLimit,
    TrimDownLimit,
    EngineCount,
    TailDragger,
    Acrobatic,
    TrimDisabled,
    RetractableGear,
    // Actuators and annunciators.
    AileronPosition,
    AileronTrim,
    ElevatorPosition,
    ElevatorTrim,
    RudderPosition,
    Throttle(u8),
    Mixture(u8),
    FlapsIndex,
    ParkingBrake,
    GearHandle,
    HeadingBug,
}

impl fmt::Display for FlightVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latitude => write!(f, "PLANE LATITUDE"),
            Self::Longitude => write!(f, "PLANE LONGITUDE"),
            Self::AltitudeIndicated => write!(f, "INDICATED ALTITUDE"),
            Self::AltitudeAgl => write!(f, "PLANE ALT ABOVE GROUND"),
            Self::VerticalSpeed => write!(f, "VERTICAL SPEED"),
            Self::Bank => write!(f, "PLANE BANK DEGREES"),
            Self::HeadingTrue => write!(f, "PLANE HEADING DEGREES TRUE"),
            Self::HeadingMag => write!(f, "PLANE HEADING DEGREES MAGNETIC"),
            Self::TurnRate => write!(f, "TURN INDICATOR RATE"),
            Self::AirspeedIndicated => write!(f, "AIRSPEED INDICATED"),
            Self::GroundSpeed => write!(f, "GROUND VELOCITY"),
            Self::SimOnGround => write!(f, "SIM ON GROUND"),
            Self::MagVar => write!(f, "MAGVAR"),
            Self::EngineCombustion => write!(f, "GENERAL ENG COMBUSTION:1"),
            Self::BusVoltage => write!(f, "ELECTRICAL MAIN BUS VOLTAGE"),
            Self::CrashFlag => write!(f, "CRASH FLAG"),
            Self::TotalWeight => write!(f, "TOTAL WEIGHT"),
            Self::WingArea => write!(f, "WING AREA"),
            Self::StallSpeed => write!(f, "DESIGN SPEED VS1"),
            Self::CruiseSpeed => write!(f, "DESIGN SPEED VC"),
            Self::RotationSpeed => write!(f, "DESIGN TAKEOFF SPEED"),
            Self::TrimUpLimit => write!(f, "ELEVATOR TRIM UP LIMIT"),
            Self::TrimDownLimit => write!(f, "ELEVATOR TRIM DOWN LIMIT"),
            Self::EngineCount => write!(f, "NUMBER OF ENGINES"),
            Self::TailDragger => write!(f, "IS TAIL DRAGGER"),
            Self::Acrobatic => write!(f, "DESIGN ACROBATIC"),
            Self::TrimDisabled => write!(f, "ELEVATOR TRIM DISABLED"),
            Self::RetractableGear => write!(f, "IS GEAR RETRACTABLE"),
            Self::AileronPosition => write!(f, "AILERON POSITION"),
            Self::AileronTrim => write!(f, "AILERON TRIM PCT"),
            Self::ElevatorPosition => write!(f, "ELEVATOR POSITION"),
            Self::ElevatorTrim => write!(f, "ELEVATOR TRIM POSITION"),
            Self::RudderPosition => write!(f, "RUDDER POSITION"),
            Self::Throttle(engine) => write!(f, "GENERAL ENG THROTTLE LEVER POSITION:{engine}"),
            Self::Mixture(engine) => write!(f, "GENERAL ENG MIXTURE LEVER POSITION:{engine}"),
            Self::FlapsIndex => write!(f, "FLAPS HANDLE INDEX"),
            Self::ParkingBrake => write!(f, "BRAKE PARKING POSITION"),
            Self::GearHandle => write!(f, "GEAR HANDLE POSITION"),
            Self::HeadingBug => write!(f, "AUTOPILOT HEADING LOCK DIR"),
        }
    }
}

/// One-shot simulator events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SimEvent {
    #[strum(serialize = "AP_MASTER")]
    ApMaster,
    #[strum(serialize = "GEAR_UP")]
    GearUp,
    #[strum(serialize = "PARKING_BRAKES")]
    ParkingBrakes,
    #[strum(serialize = "LANDING_LIGHTS_ON")]
    LandingLightsOn,
    #[strum(serialize = "STROBES_ON")]
    StrobesOn,
}

/// A batch of sampled variable values.
///
/// Missing entries read as zero/false: a disconnected or stale gateway
/// degrades to "no actionable data," never to an error the laws must
/// handle.
#[derive(Debug, Default, Clone)]
pub struct VarMap(HashMap<FlightVar, f64>);

impl VarMap {
    pub fn insert(&mut self, var: FlightVar, value: f64) { self.0.insert(var, value); }

    pub fn value(&self, var: FlightVar) -> f64 { self.0.get(&var).copied().unwrap_or(0.0) }

    pub fn is_true(&self, var: FlightVar) -> bool { self.value(var) > 0.5 }
}

impl FromIterator<(FlightVar, f64)> for VarMap {
    fn from_iter<T: IntoIterator<Item = (FlightVar, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Errors from the flight-data gateway. All of them are transient: the
/// affected computation is skipped for one cycle and retried on the next.
#[derive(Debug, Display)]
pub enum ProviderError {
    NoConnection,
    BadRequest,
    InternalServer,
    Unknown,
}

impl std::error::Error for ProviderError {}

impl From<reqwest::Error> for ProviderError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_request() {
            ProviderError::BadRequest
        } else if value.is_timeout() || value.is_redirect() {
            ProviderError::InternalServer
        } else if value.is_connect() {
            ProviderError::NoConnection
        } else {
            ProviderError::Unknown
        }
    }
}

/// The vehicle/flight-data boundary.
///
/// Implementations are reached through a host-controlled runtime; the core
/// only ever awaits these calls in sequence within one control cycle and
/// treats `connected() == false` as "do nothing this tick."
#[async_trait]
pub trait FlightDataProvider: Send + Sync {
    /// Last known connection state of the gateway.
    fn connected(&self) -> bool;

    /// Samples a batch of variables.
    async fn get(&self, vars: &[FlightVar]) -> Result<VarMap, ProviderError>;

    /// Writes one actuator or annunciator variable.
    async fn set(&self, var: FlightVar, value: f64) -> Result<(), ProviderError>;

    /// Fires a one-shot simulator event.
    async fn trigger(&self, event: SimEvent, value: Option<f64>) -> Result<(), ProviderError>;
}
