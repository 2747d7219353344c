use super::{ControlLaw, CycleContext};
use crate::control::modes::ApMode;
use crate::cycle;
use crate::provider::ProviderError;
use async_trait::async_trait;

/// Terrain-follow: keeps the altitude-hold target a safety margin above
/// the highest terrain in the corridor ahead.
///
/// The probe distance is flight time, so faster aircraft look further.
/// A void answer (no data under the corridor, e.g. open water) leaves the
/// current target untouched.
pub(crate) struct TerrainFollow;

#[async_trait]
impl ControlLaw for TerrainFollow {
    fn mode(&self) -> ApMode { ApMode::TerrainFollow }

    async fn apply(&mut self, ctx: &mut CycleContext<'_>) -> Result<(), ProviderError> {
        let cfg = &ctx.config.terrain_follow;
        let s = ctx.state;

        let probe_nm = (s.data.gs_kt * cfg.lookahead_secs / 3600.0).max(cfg.min_probe_nm);
        let Some(hit) = ctx.route.max_elevation_ahead(
            s.position(),
            s.data.heading_mag,
            probe_nm,
            s.derived.declination,
        ) else {
            return Ok(());
        };

        let target =
            ((f64::from(hit.elevation_ft) + cfg.safety_margin_ft) / cfg.round_to_ft).ceil()
                * cfg.round_to_ft;
        if ctx.modes.target(ApMode::AltitudeHold).is_none_or(|t| (t - target).abs() >= 1.0) {
            cycle!(
                "terrain_follow target={target:.0}ft peak={}ft at ({:.3}, {:.3})",
                hit.elevation_ft,
                hit.lat,
                hit.lon
            );
            ctx.modes.set_target(ApMode::AltitudeHold, target);
        }
        Ok(())
    }
}
