use super::{ControlLaw, CycleContext};
use crate::control::modes::ApMode;
use crate::cycle;
use crate::provider::{FlightVar, ProviderError};
use async_trait::async_trait;

/// Pitch controller: holds the altitude target via a vertical-speed inner
/// loop feeding elevator trim.
///
/// The altitude error sets a clamped target vertical speed (tighter while
/// landing); the trim update is proportional to the vertical-speed error
/// with a damping term against its rate of change, attenuated near zero
/// altitude error. Emergency branches override the normal correction for
/// the cycle: runaway vertical speed gets a fixed opposing step, and climb
/// targets shrink as airspeed approaches stall.
pub(crate) struct AltitudeHold;

#[async_trait]
impl ControlLaw for AltitudeHold {
    fn mode(&self) -> ApMode { ApMode::AltitudeHold }

    async fn apply(&mut self, ctx: &mut CycleContext<'_>) -> Result<(), ProviderError> {
        let cfg = &ctx.config.altitude_hold;
        let s = ctx.state;
        let Some(target_alt) = ctx.modes.target(ApMode::AltitudeHold) else {
            return Ok(());
        };
        let landing = ctx.route.is_landing();

        let alt_err = target_alt - s.data.alt_ft;
        let max_vs = if landing {
            cfg.landing_max_vs
        } else {
            ctx.modes.target(ApMode::VerticalSpeed).unwrap_or(cfg.max_vs)
        };
        let mut target_vs = (alt_err * cfg.vs_per_foot).clamp(-max_vs, max_vs);

        // Never trade a climb for a stall: shrink the climb target as
        // airspeed approaches the stall guard.
        let stall_guard = s.model.stall_speed_kt * cfg.stall_margin;
        if target_vs > 0.0 && stall_guard > 0.0 && s.data.ias_kt < stall_guard {
            target_vs *= (s.data.ias_kt / stall_guard).max(0.0).powi(2);
        }

        let vs_err = target_vs - s.data.vs_fpm;
        let mut update = vs_err * cfg.trim_gain - s.derived.vs_delta * cfg.damp_gain;
        update *= (alt_err.abs() / cfg.deadband_ft).clamp(0.25, 1.0);

        let vs_limit = if landing { cfg.landing_vs_emergency } else { cfg.vs_emergency };
        if s.data.vs_fpm.abs() > vs_limit || s.derived.vs_delta.abs() > cfg.vs_rate_emergency {
            update = -s.data.vs_fpm.signum() * cfg.recovery_step;
        }

        let (down, up) = s.model.trim_limits();
        let command = ctx.trim.add_pitch(update, down, up);
        cycle!(
            "alt_hold err={alt_err:.0}ft target_vs={target_vs:.0} vs={:.0} trim={command:.4}",
            s.data.vs_fpm
        );

        if s.model.no_trim {
            // Trimless airframes fly the elevator directly, scaled to the
            // stick range.
            let stick = (command / up.abs().max(f64::EPSILON)).clamp(-1.0, 1.0);
            ctx.provider.set(FlightVar::ElevatorPosition, stick).await?;
        } else {
            ctx.provider.set(FlightVar::ElevatorTrim, command).await?;
        }
        Ok(())
    }
}
