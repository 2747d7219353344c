use super::{ControlLaw, CycleContext};
use crate::control::modes::ApMode;
use crate::nav::geodesy::{GeoPoint, cross_track_nm};
use crate::provider::{FlightVar, ProviderError, SimEvent};
use crate::{cycle, info};
use async_trait::async_trait;
use strum_macros::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
enum Phase {
    Prep,
    Roll,
    Rotate,
    Handoff,
}

/// Automated takeoff: a four-phase sequencer from a standing start to a
/// configured autopilot climb-out.
///
/// Prep puts the aircraft into a known-safe ground configuration and
/// caches the runway centerline as two projected points. Roll feeds in
/// power and steers the rudder against lateral drift from that
/// centerline. Rotation begins past the rotation speed and works the
/// elevator towards a positive climb. Handoff fires once airborne with
/// height and climb in hand: gear up, power eased, and the full mode set
/// enabled in one step. The `done` flag makes the handoff one-shot.
pub(crate) struct AutoTakeoff {
    phase: Phase,
    centerline: Option<(GeoPoint, GeoPoint)>,
    prev_offset_nm: f64,
    last_elevator: f64,
    done: bool,
}

impl AutoTakeoff {
    pub fn new() -> Self {
        Self {
            phase: Phase::Prep,
            centerline: None,
            prev_offset_nm: 0.0,
            last_elevator: 0.0,
            done: false,
        }
    }

    async fn prep(&mut self, ctx: &mut CycleContext<'_>) -> Result<(), ProviderError> {
        let cfg = &ctx.config.auto_takeoff;
        let s = ctx.state;
        ctx.provider.set(FlightVar::FlapsIndex, cfg.flaps_notch).await?;
        ctx.provider.set(FlightVar::ElevatorTrim, cfg.takeoff_trim).await?;
        for engine in 1..=s.model.engine_count {
            ctx.provider.set(FlightVar::Mixture(engine), 100.0).await?;
        }
        ctx.provider.trigger(SimEvent::LandingLightsOn, None).await?;
        ctx.provider.trigger(SimEvent::StrobesOn, None).await?;
        ctx.provider.trigger(SimEvent::ParkingBrakes, Some(0.0)).await?;

        let origin = s.position();
        let far = origin.destination(s.data.heading_true, cfg.centerline_nm);
        self.centerline = Some((origin, far));
        self.prev_offset_nm = 0.0;
        self.phase = Phase::Roll;
        info!("Takeoff prep complete, rolling on heading {:.0}", s.data.heading_true);
        Ok(())
    }

    async fn roll(&mut self, ctx: &mut CycleContext<'_>) -> Result<(), ProviderError> {
        let cfg = &ctx.config.auto_takeoff;
        let s = ctx.state;
        let setting = (s.data.throttle_pct + cfg.throttle_step_pct).min(100.0);
        for engine in 1..=s.model.engine_count {
            ctx.provider.set(FlightVar::Throttle(engine), setting).await?;
        }

        // Tail-draggers get the tail up once the rudder has authority.
        if s.model.tail_dragger && s.data.gs_kt > 15.0 && s.data.gs_kt < s.model.rotation_speed() * 0.7
        {
            ctx.provider.set(FlightVar::ElevatorPosition, 0.1).await?;
        }

        if let Some((start, end)) = &self.centerline {
            let offset = cross_track_nm(&s.position(), start, end);
            let offset_rate = offset - self.prev_offset_nm;
            self.prev_offset_nm = offset;
            // Right of centerline steers left and vice versa.
            let rudder =
                (-(offset * cfg.rudder_gain + offset_rate * cfg.rudder_rate_gain)).clamp(-1.0, 1.0);
            ctx.provider.set(FlightVar::RudderPosition, rudder).await?;
            cycle!("takeoff roll gs={:.0}kt offset={offset:.4}nm rudder={rudder:.3}", s.data.gs_kt);
        }

        if s.data.gs_kt >= s.model.rotation_speed() {
            self.phase = Phase::Rotate;
            info!("Rotating at {:.0} kt", s.data.gs_kt);
        }
        Ok(())
    }

    async fn rotate(&mut self, ctx: &mut CycleContext<'_>) -> Result<(), ProviderError> {
        let cfg = &ctx.config.auto_takeoff;
        let s = ctx.state;
        let setting = (s.data.throttle_pct + cfg.throttle_step_pct).min(100.0);
        for engine in 1..=s.model.engine_count {
            ctx.provider.set(FlightVar::Throttle(engine), setting).await?;
        }

        // Nose-up elevator is negative; walk it towards the climb target
        // and ease it back out once the climb is established.
        let elevator = if s.data.vs_fpm < cfg.target_climb_fpm {
            (self.last_elevator - cfg.rotate_elevator_step).max(-cfg.rotate_elevator_limit)
        } else {
            (self.last_elevator + cfg.rotate_elevator_step).min(0.0)
        };
        self.last_elevator = elevator;
        ctx.provider.set(FlightVar::ElevatorPosition, elevator).await?;
        cycle!("takeoff rotate vs={:.0}fpm elevator={elevator:.3}", s.data.vs_fpm);

        if !s.derived.wheels_on_ground
            && s.data.agl_ft > ctx.config.auto_takeoff.handoff_agl_ft
            && s.data.vs_fpm > cfg.target_climb_fpm * 0.6
        {
            self.phase = Phase::Handoff;
        }
        Ok(())
    }

    async fn handoff(&mut self, ctx: &mut CycleContext<'_>) -> Result<(), ProviderError> {
        let cfg = &ctx.config.auto_takeoff;
        let s = ctx.state;
        if s.model.retractable_gear {
            ctx.provider.trigger(SimEvent::GearUp, None).await?;
        }
        for engine in 1..=s.model.engine_count {
            ctx.provider.set(FlightVar::Throttle(engine), cfg.climb_throttle_pct).await?;
        }
        ctx.provider.set(FlightVar::RudderPosition, 0.0).await?;
        ctx.provider.set(FlightVar::ElevatorPosition, 0.0).await?;

        let field_elevation = s.data.alt_ft - s.data.agl_ft;
        let target_alt =
            ((field_elevation + cfg.handoff_alt_margin_ft) / 100.0).ceil() * 100.0;
        ctx.modes.set_flag(ApMode::WingLevel, true);
        ctx.modes.set_target(ApMode::Heading, s.data.heading_mag);
        ctx.modes.set_target(ApMode::AltitudeHold, target_alt);
        ctx.modes.set_flag(ApMode::TerrainFollow, true);
        ctx.modes.set_flag(ApMode::AutoTakeoff, false);
        self.done = true;
        info!(
            "Takeoff handoff: holding heading {:.0}, climbing to {target_alt:.0} ft",
            s.data.heading_mag
        );
        Ok(())
    }
}

#[async_trait]
impl ControlLaw for AutoTakeoff {
    fn mode(&self) -> ApMode { ApMode::AutoTakeoff }

    async fn apply(&mut self, ctx: &mut CycleContext<'_>) -> Result<(), ProviderError> {
        let s = ctx.state;
        if self.done {
            // Re-arm only for a fresh takeoff: enabled again while parked.
            if s.derived.wheels_on_ground && s.data.gs_kt < 5.0 {
                self.reset();
            } else {
                return Ok(());
            }
        }
        if self.phase != Phase::Prep && !(s.derived.engines_running && s.derived.has_power) {
            return Ok(());
        }
        match self.phase {
            Phase::Prep => self.prep(ctx).await,
            Phase::Roll => self.roll(ctx).await,
            Phase::Rotate => self.rotate(ctx).await,
            Phase::Handoff => self.handoff(ctx).await,
        }
    }

    fn reset(&mut self) {
        self.phase = Phase::Prep;
        self.centerline = None;
        self.prev_offset_nm = 0.0;
        self.last_elevator = 0.0;
        self.done = false;
    }
}
