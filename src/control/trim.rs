use super::flight_state::AircraftModel;
use fixed::types::I32F32;

/// Wing loading below which no initial roll bias is applied, lb/sqft.
const BIAS_BASE_LOADING: I32F32 = I32F32::lit("10.0");
/// Bias gained per lb/sqft of wing loading above the base.
const BIAS_PER_LOADING: I32F32 = I32F32::lit("0.0004");
/// Ceiling of the initial roll bias.
const BIAS_MAX: I32F32 = I32F32::lit("0.08");
/// Twitchy airframes start with a fraction of the computed bias.
const ACROBATIC_BIAS_SCALE: I32F32 = I32F32::lit("0.25");

/// Accumulated control-surface bias, one slot per axis.
///
/// Stored fixed-point so that thousands of small per-cycle corrections
/// accumulate deterministically. Persists across cycles; reset on vehicle
/// reset, crash, or airframe change. Each axis is written only by the law
/// responsible for it.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrimVector {
    pitch: I32F32,
    roll: I32F32,
    yaw: I32F32,
}

impl TrimVector {
    pub fn zeroed() -> Self { Self::default() }

    pub fn pitch(&self) -> f64 { self.pitch.to_num() }

    pub fn roll(&self) -> f64 { self.roll.to_num() }

    pub fn yaw(&self) -> f64 { self.yaw.to_num() }

    /// Zeroes pitch and yaw and seeds the roll bias from the airframe:
    /// heavier, less acrobatic aircraft start with a larger bias.
    pub fn reset_for(&mut self, model: &AircraftModel) {
        self.pitch = I32F32::ZERO;
        self.yaw = I32F32::ZERO;
        let loading = I32F32::from_num(model.wing_loading());
        let mut bias = ((loading - BIAS_BASE_LOADING).max(I32F32::ZERO) * BIAS_PER_LOADING)
            .min(BIAS_MAX);
        if model.acrobatic {
            bias *= ACROBATIC_BIAS_SCALE;
        }
        self.roll = bias;
    }

    /// Accumulates a pitch-trim correction, clamped to the airframe's
    /// trim travel.
    ///
    /// # Returns
    /// The new pitch-trim value.
    pub fn add_pitch(&mut self, delta: f64, lo: f64, hi: f64) -> f64 {
        self.pitch = (self.pitch + I32F32::from_num(delta))
            .clamp(I32F32::from_num(lo), I32F32::from_num(hi));
        self.pitch.to_num()
    }

    /// Accumulates a roll-trim correction within symmetric bounds.
    ///
    /// # Returns
    /// The new roll-trim value.
    pub fn add_roll(&mut self, delta: f64, limit: f64) -> f64 {
        let bound = I32F32::from_num(limit);
        self.roll = (self.roll + I32F32::from_num(delta)).clamp(-bound, bound);
        self.roll.to_num()
    }

    /// Accumulates a yaw-trim correction within symmetric bounds.
    ///
    /// # Returns
    /// The new yaw-trim value.
    pub fn add_yaw(&mut self, delta: f64, limit: f64) -> f64 {
        let bound = I32F32::from_num(limit);
        self.yaw = (self.yaw + I32F32::from_num(delta)).clamp(-bound, bound);
        self.yaw.to_num()
    }
}
