use super::{ControlLaw, CycleContext};
use crate::control::modes::ApMode;
use crate::cycle;
use crate::provider::{FlightVar, ProviderError};
use async_trait::async_trait;

/// Speed controller: steps every engine's throttle towards the speed
/// target (an explicit operator value, or cruise speed when the target is
/// unset/zero).
///
/// The step is biased by the altitude error so climbs get power before
/// speed decays, and held entirely once the observed speed trend already
/// matches expectation.
pub(crate) struct AutoThrottle;

#[async_trait]
impl ControlLaw for AutoThrottle {
    fn mode(&self) -> ApMode { ApMode::AutoThrottle }

    async fn apply(&mut self, ctx: &mut CycleContext<'_>) -> Result<(), ProviderError> {
        let cfg = &ctx.config.auto_throttle;
        let s = ctx.state;
        if !s.derived.engines_running {
            return Ok(());
        }

        let target = ctx
            .modes
            .target(ApMode::AutoThrottle)
            .filter(|t| *t > 0.0)
            .unwrap_or(s.model.cruise_speed_kt);
        let speed_err = target - s.data.ias_kt;

        let alt_err = ctx.modes.target(ApMode::AltitudeHold).map_or(0.0, |t| t - s.data.alt_ft);
        let boost = (alt_err / 100.0 * cfg.climb_boost_per_100ft)
            .clamp(-cfg.max_boost_pct, cfg.max_boost_pct);

        if speed_err.abs() < cfg.speed_deadband_kt && boost.abs() < cfg.step_pct {
            return Ok(());
        }
        // Already accelerating/decelerating as expected: let it ride.
        if speed_err.signum() == s.derived.speed_delta.signum()
            && s.derived.speed_delta.abs() >= cfg.expected_accel_kt
        {
            return Ok(());
        }

        let step = speed_err.signum() * cfg.step_pct + boost;
        let setting = (s.data.throttle_pct + step).clamp(0.0, 100.0);
        cycle!("auto_throttle err={speed_err:.1}kt boost={boost:.1} setting={setting:.1}");
        for engine in 1..=s.model.engine_count {
            ctx.provider.set(FlightVar::Throttle(engine), setting).await?;
        }
        Ok(())
    }
}
