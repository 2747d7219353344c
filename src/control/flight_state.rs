use crate::nav::geodesy::{GeoPoint, heading_error};
use crate::provider::{FlightDataProvider, FlightVar, ProviderError, VarMap};

/// Bus voltage below which the avionics are considered unpowered.
const MIN_BUS_VOLTAGE: f64 = 5.0;

/// Fallback elevator-trim travel when the gateway does not report limits.
const DEFAULT_TRIM_LIMIT: f64 = 0.25;

/// Static-per-aircraft facet of the flight snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct AircraftModel {
    pub weight_lbs: f64,
    pub wing_area_sqft: f64,
    pub stall_speed_kt: f64,
    pub cruise_speed_kt: f64,
    /// Reported rotation speed; zero when the gateway does not know it.
    pub rotation_speed_kt: f64,
    pub trim_up_limit: f64,
    pub trim_down_limit: f64,
    pub engine_count: u8,
    pub acrobatic: bool,
    pub tail_dragger: bool,
    pub no_trim: bool,
    pub retractable_gear: bool,
}

impl AircraftModel {
    fn from_vars(vars: &VarMap) -> Self {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let engine_count = (vars.value(FlightVar::EngineCount) as u8).max(1);
        Self {
            weight_lbs: vars.value(FlightVar::TotalWeight),
            wing_area_sqft: vars.value(FlightVar::WingArea),
            stall_speed_kt: vars.value(FlightVar::StallSpeed),
            cruise_speed_kt: vars.value(FlightVar::CruiseSpeed),
            rotation_speed_kt: vars.value(FlightVar::RotationSpeed),
            trim_up_limit: vars.value(FlightVar::TrimUpLimit),
            trim_down_limit: vars.value(FlightVar::TrimDownLimit),
            engine_count,
            acrobatic: vars.is_true(FlightVar::Acrobatic),
            tail_dragger: vars.is_true(FlightVar::TailDragger),
            no_trim: vars.is_true(FlightVar::TrimDisabled),
            retractable_gear: vars.is_true(FlightVar::RetractableGear),
        }
    }

    /// Weight per wing area, the roll-twitchiness classifier.
    pub fn wing_loading(&self) -> f64 { self.weight_lbs / self.wing_area_sqft.max(1.0) }

    /// Groundspeed at which the takeoff sequencer starts rotation.
    pub fn rotation_speed(&self) -> f64 {
        if self.rotation_speed_kt > 0.0 {
            self.rotation_speed_kt
        } else {
            self.stall_speed_kt * 1.3
        }
    }

    /// Elevator-trim travel as `(down, up)`, falling back to a sane range
    /// when the gateway reports none.
    pub fn trim_limits(&self) -> (f64, f64) {
        let up = if self.trim_up_limit > 0.0 { self.trim_up_limit } else { DEFAULT_TRIM_LIMIT };
        let down =
            if self.trim_down_limit < 0.0 { self.trim_down_limit } else { -DEFAULT_TRIM_LIMIT };
        (down, up)
    }

    /// Whether this snapshot describes a different airframe. Weight is
    /// deliberately ignored: it drifts with fuel burn.
    pub fn identity_differs(&self, other: &Self) -> bool {
        (self.wing_area_sqft - other.wing_area_sqft).abs() > 0.5
            || (self.stall_speed_kt - other.stall_speed_kt).abs() > 0.5
            || (self.cruise_speed_kt - other.cruise_speed_kt).abs() > 0.5
            || self.engine_count != other.engine_count
    }
}

/// Per-cycle facet of the flight snapshot, in gateway units: degrees,
/// feet, knots, feet per minute.
#[derive(Debug, Clone)]
pub struct FlightData {
    pub lat: f64,
    pub lon: f64,
    pub alt_ft: f64,
    pub agl_ft: f64,
    pub vs_fpm: f64,
    pub bank_deg: f64,
    pub heading_true: f64,
    pub heading_mag: f64,
    pub turn_rate: f64,
    pub ias_kt: f64,
    pub gs_kt: f64,
    pub on_ground: bool,
    pub magvar: f64,
    pub throttle_pct: f64,
    pub crashed: bool,
    engines_running: bool,
    bus_voltage: f64,
}

/// Fields derived once per snapshot so every law reads the same,
/// already-validated shape.
#[derive(Debug, Clone, Default)]
pub struct Derived {
    pub declination: f64,
    pub upside_down: bool,
    pub wheels_on_ground: bool,
    pub engines_running: bool,
    pub has_power: bool,
    /// Vertical-speed change since the previous cycle, fpm.
    pub vs_delta: f64,
    /// Airspeed change since the previous cycle, kt.
    pub speed_delta: f64,
    /// Signed heading change since the previous cycle, degrees.
    pub heading_delta: f64,
    /// Bank change since the previous cycle, degrees.
    pub bank_delta: f64,
}

/// Immutable-per-cycle snapshot of everything the control laws read.
#[derive(Debug, Clone)]
pub struct FlightState {
    pub model: AircraftModel,
    pub data: FlightData,
    pub derived: Derived,
}

impl FlightState {
    const VARS: [FlightVar; 29] = [
        FlightVar::Latitude,
        FlightVar::Longitude,
        FlightVar::AltitudeIndicated,
        FlightVar::AltitudeAgl,
        FlightVar::VerticalSpeed,
        FlightVar::Bank,
        FlightVar::HeadingTrue,
        FlightVar::HeadingMag,
        FlightVar::TurnRate,
        FlightVar::AirspeedIndicated,
        FlightVar::GroundSpeed,
        FlightVar::SimOnGround,
        FlightVar::MagVar,
        FlightVar::EngineCombustion,
        FlightVar::BusVoltage,
        FlightVar::CrashFlag,
        FlightVar::Throttle(1),
        FlightVar::TotalWeight,
        FlightVar::WingArea,
        FlightVar::StallSpeed,
        FlightVar::CruiseSpeed,
        FlightVar::RotationSpeed,
        FlightVar::TrimUpLimit,
        FlightVar::TrimDownLimit,
        FlightVar::EngineCount,
        FlightVar::TailDragger,
        FlightVar::Acrobatic,
        FlightVar::TrimDisabled,
        FlightVar::RetractableGear,
    ];

    /// The full sampling batch. Test hook for staging mocks.
    #[cfg(test)]
    pub(crate) fn test_vars() -> &'static [FlightVar] { &Self::VARS }

    /// Samples one snapshot from the gateway, deriving delta fields from
    /// the previous cycle's snapshot.
    ///
    /// # Errors
    /// Propagates the gateway error; the caller skips this cycle.
    pub async fn sample(
        provider: &dyn FlightDataProvider,
        prev: Option<&FlightState>,
    ) -> Result<Self, ProviderError> {
        let vars = provider.get(&Self::VARS).await?;
        Ok(Self::from_vars(&vars, prev))
    }

    /// Builds the snapshot from already-sampled variables. Split out so
    /// tests can feed canned batches.
    pub fn from_vars(vars: &VarMap, prev: Option<&FlightState>) -> Self {
        let model = AircraftModel::from_vars(vars);
        let data = FlightData {
            lat: vars.value(FlightVar::Latitude),
            lon: vars.value(FlightVar::Longitude),
            alt_ft: vars.value(FlightVar::AltitudeIndicated),
            agl_ft: vars.value(FlightVar::AltitudeAgl),
            vs_fpm: vars.value(FlightVar::VerticalSpeed),
            bank_deg: vars.value(FlightVar::Bank),
            heading_true: vars.value(FlightVar::HeadingTrue),
            heading_mag: vars.value(FlightVar::HeadingMag),
            turn_rate: vars.value(FlightVar::TurnRate),
            ias_kt: vars.value(FlightVar::AirspeedIndicated),
            gs_kt: vars.value(FlightVar::GroundSpeed),
            on_ground: vars.is_true(FlightVar::SimOnGround),
            magvar: vars.value(FlightVar::MagVar),
            throttle_pct: vars.value(FlightVar::Throttle(1)),
            crashed: vars.is_true(FlightVar::CrashFlag),
            engines_running: vars.is_true(FlightVar::EngineCombustion),
            bus_voltage: vars.value(FlightVar::BusVoltage),
        };
        let derived = Derived {
            declination: data.magvar,
            upside_down: data.bank_deg.abs() > 90.0,
            wheels_on_ground: data.on_ground,
            engines_running: data.engines_running,
            has_power: data.bus_voltage > MIN_BUS_VOLTAGE,
            vs_delta: prev.map_or(0.0, |p| data.vs_fpm - p.data.vs_fpm),
            speed_delta: prev.map_or(0.0, |p| data.ias_kt - p.data.ias_kt),
            heading_delta: prev.map_or(0.0, |p| heading_error(data.heading_true, p.data.heading_true)),
            bank_delta: prev.map_or(0.0, |p| data.bank_deg - p.data.bank_deg),
        };
        Self { model, data, derived }
    }

    pub fn position(&self) -> GeoPoint { GeoPoint::new(self.data.lat, self.data.lon) }
}
