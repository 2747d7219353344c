use super::{ControlLaw, CycleContext};
use crate::control::modes::ApMode;
use crate::cycle;
use crate::nav::geodesy::heading_error;
use crate::provider::{FlightVar, ProviderError};
use async_trait::async_trait;

/// Roll controller: holds wings level or steers towards the heading
/// target.
///
/// Heading error maps to a clamped target turn rate; the turn-rate error
/// passes through a square-root boost curve and scales against an
/// *adaptive* maximum deflection. The maximum ramps up while the vehicle
/// is not turning fast enough for its error and ramps back down once
/// on-target, bounded by an airframe-class floor and ceiling.
pub(crate) struct WingLevel {
    max_deflection: f64,
}

impl WingLevel {
    pub fn new() -> Self { Self { max_deflection: 0.0 } }
}

#[async_trait]
impl ControlLaw for WingLevel {
    fn mode(&self) -> ApMode { ApMode::WingLevel }

    async fn apply(&mut self, ctx: &mut CycleContext<'_>) -> Result<(), ProviderError> {
        let cfg = &ctx.config.wing_level;
        let s = ctx.state;

        let ceiling = if s.model.acrobatic {
            cfg.deflection_ceiling * 0.5
        } else {
            cfg.deflection_ceiling
        };
        if self.max_deflection == 0.0 {
            self.max_deflection = cfg.deflection_floor;
        }

        let hdg_err = ctx
            .modes
            .target(ApMode::Heading)
            .map_or(0.0, |target| heading_error(target, s.data.heading_mag));
        let target_rate = (hdg_err * cfg.turn_rate_per_deg).clamp(-cfg.max_turn_rate, cfg.max_turn_rate);
        let rate_err = target_rate - s.data.turn_rate;

        // Inverted flight: the bank error is measured against 180 so the
        // correction completes the roll instead of stabilizing inverted.
        let steer_err = if s.derived.upside_down {
            let inverted_bank = if s.data.bank_deg >= 0.0 {
                180.0 - s.data.bank_deg
            } else {
                -180.0 - s.data.bank_deg
            };
            inverted_bank * cfg.inverted_gain
        } else {
            rate_err
        };

        // Adapt the deflection ceiling to the observed turn authority.
        if hdg_err.abs() > cfg.on_target_deg && s.data.turn_rate.abs() < target_rate.abs() * 0.3 {
            self.max_deflection = (self.max_deflection + cfg.deflection_ramp).min(ceiling);
        } else if hdg_err.abs() <= cfg.on_target_deg {
            self.max_deflection = (self.max_deflection - cfg.deflection_ramp).max(cfg.deflection_floor);
        }

        let boost = steer_err.signum() * (steer_err.abs() / cfg.boost_scale).sqrt().min(1.0);
        let mut deflection = boost * self.max_deflection;

        // Runaway guard: heading already racing in the direction of the
        // error gets a full opposing clamp for this cycle.
        if s.derived.heading_delta.abs() > cfg.runaway_rate
            && s.derived.heading_delta.signum() == hdg_err.signum()
            && hdg_err != 0.0
        {
            deflection = -s.derived.heading_delta.signum() * self.max_deflection;
        }

        cycle!(
            "wing_level err={hdg_err:.1} rate_err={rate_err:.2} defl={deflection:.3} max={:.3}",
            self.max_deflection
        );

        if s.model.no_trim {
            ctx.provider.set(FlightVar::AileronPosition, deflection.clamp(-1.0, 1.0)).await?;
        } else {
            let command = (ctx.trim.roll() + deflection).clamp(-1.0, 1.0);
            ctx.provider.set(FlightVar::AileronTrim, command).await?;
        }
        Ok(())
    }

    fn reset(&mut self) { self.max_deflection = 0.0; }
}
