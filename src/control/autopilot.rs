use super::config::ControlConfig;
use super::flight_state::{AircraftModel, FlightState};
use super::laws::{ControlLaw, CycleContext, strategy_table};
use super::modes::{ApMode, ModeRegistry, ModeValue, ParameterError};
use super::scheduler::Scheduler;
use super::trim::TrimVector;
use crate::nav::{RouteError, Waypoint, WaypointManager};
use crate::provider::{FlightDataProvider, FlightVar, SimEvent};
use crate::{cycle, error, info, log};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{RwLock, watch};
use tokio_util::sync::CancellationToken;

/// Operator-facing snapshot: the full mode registry plus the route.
///
/// Emitted on *every* parameter change, even a no-op one, so transport
/// listeners can always resynchronize from the latest snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct ParamsSnapshot {
    pub modes: BTreeMap<String, ModeValue>,
    pub waypoints: Vec<Waypoint>,
    pub repeating: bool,
}

/// The autopilot core: owns the mode registry, the trim vector, the route
/// and the strategy table, and runs one bounded unit of work per control
/// cycle.
pub struct Autopilot {
    provider: Arc<dyn FlightDataProvider>,
    config: Arc<ControlConfig>,
    modes: ModeRegistry,
    trim: TrimVector,
    route: WaypointManager,
    laws: Vec<Box<dyn ControlLaw>>,
    prev_state: Option<FlightState>,
    model: Option<AircraftModel>,
    params_tx: watch::Sender<ParamsSnapshot>,
    cancel: CancellationToken,
    scheduler_started: bool,
}

impl Autopilot {
    pub fn new(
        provider: Arc<dyn FlightDataProvider>,
        config: Arc<ControlConfig>,
        route: WaypointManager,
    ) -> Self {
        let modes = ModeRegistry::new();
        let initial = ParamsSnapshot {
            modes: modes.snapshot(),
            waypoints: route.waypoints(),
            repeating: route.repeating(),
        };
        let (params_tx, _) = watch::channel(initial);
        Self {
            provider,
            config,
            modes,
            trim: TrimVector::zeroed(),
            route,
            laws: strategy_table(),
            prev_state: None,
            model: None,
            params_tx,
            cancel: CancellationToken::new(),
            scheduler_started: false,
        }
    }

    /// A receiver of parameter-change notifications for the transport
    /// layer.
    pub fn subscribe(&self) -> watch::Receiver<ParamsSnapshot> { self.params_tx.subscribe() }

    /// Token cancelling the scheduling loop on shutdown.
    pub fn cancel_token(&self) -> CancellationToken { self.cancel.clone() }

    /// Validates and applies a partial mode map, then performs the
    /// external side effects the touched keys require.
    ///
    /// Validation happens for the whole batch before anything is applied:
    /// a rejected key leaves the registry untouched. The first MASTER-on
    /// disengages the in-vehicle autopilot and starts the scheduling loop;
    /// MASTER-off stops law execution but keeps the accumulated trim.
    ///
    /// # Errors
    /// The first [`ParameterError`] found in the batch.
    pub async fn set_parameters(
        ap: &Arc<RwLock<Autopilot>>,
        params: &BTreeMap<String, ModeValue>,
    ) -> Result<(), ParameterError> {
        let (provider, heading_bug, start_scheduler) = {
            let mut this = ap.write().await;
            let validated = params
                .iter()
                .map(|(key, value)| ModeRegistry::validate(key, *value))
                .collect::<Result<Vec<_>, _>>()?;

            let was_master = this.modes.is_enabled(ApMode::Master);
            let mut heading_bug = None;
            for (mode, value) in validated {
                this.modes.apply(mode, value);
                if mode == ApMode::Heading {
                    if let ModeValue::Target(target) = value {
                        heading_bug = Some(target);
                    }
                }
            }
            let master_on = this.modes.is_enabled(ApMode::Master);
            let start_scheduler = master_on && !was_master && !this.scheduler_started;
            if start_scheduler {
                this.scheduler_started = true;
            }
            if master_on != was_master {
                info!("Autopilot MASTER {}", if master_on { "engaged" } else { "disengaged" });
            }
            this.notify();
            (Arc::clone(&this.provider), heading_bug, start_scheduler)
        };

        if let Some(target) = heading_bug {
            if let Err(err) = provider.set(FlightVar::HeadingBug, target).await {
                log!("Heading bug not pushed: {err}");
            }
        }
        if start_scheduler {
            // The in-vehicle autopilot must not fight this one.
            if let Err(err) = provider.trigger(SimEvent::ApMaster, Some(0.0)).await {
                log!("In-vehicle autopilot not disengaged: {err}");
            }
            Scheduler::spawn(Arc::clone(ap));
        }
        Ok(())
    }

    /// The current snapshot of modes, route and repeat flag.
    pub fn get_parameters(&self) -> ParamsSnapshot {
        ParamsSnapshot {
            modes: self.modes.snapshot(),
            waypoints: self.route.waypoints(),
            repeating: self.route.repeating(),
        }
    }

    pub fn add_waypoint(&mut self, lat: f64, lon: f64, altitude: Option<f64>) -> u32 {
        let id = self.route.add(lat, lon, altitude);
        self.notify();
        id
    }

    pub fn set_waypoint_position(&mut self, id: u32, lat: f64, lon: f64) -> Result<(), RouteError> {
        self.route.set_position(id, lat, lon)?;
        self.notify();
        Ok(())
    }

    pub fn set_waypoint_elevation(
        &mut self,
        id: u32,
        altitude: Option<f64>,
    ) -> Result<(), RouteError> {
        self.route.set_elevation(id, altitude)?;
        self.notify();
        Ok(())
    }

    pub fn remove_waypoint(&mut self, id: u32) -> Result<(), RouteError> {
        self.route.remove(id)?;
        self.notify();
        Ok(())
    }

    pub fn split_waypoint(&mut self, id: u32) -> Result<u32, RouteError> {
        let new_id = self.route.split(id)?;
        self.notify();
        Ok(new_id)
    }

    pub fn toggle_repeating(&mut self) -> bool {
        let repeating = self.route.toggle_repeating();
        self.notify();
        repeating
    }

    pub fn reset_waypoints(&mut self) {
        self.route.reset();
        self.notify();
    }

    /// Re-seeds the trim vector from the last known airframe.
    pub fn reset_trim(&mut self) {
        match &self.model {
            Some(model) => self.trim.reset_for(model),
            None => self.trim = TrimVector::zeroed(),
        }
        self.notify();
    }

    /// Full reinitialization: all modes off, trim re-seeded, adaptation
    /// state dropped. Invoked on crash and on airframe change.
    pub fn reset(&mut self, model: Option<&AircraftModel>) {
        self.modes = ModeRegistry::new();
        match model {
            Some(model) => self.trim.reset_for(model),
            None => self.trim = TrimVector::zeroed(),
        }
        for law in &mut self.laws {
            law.reset();
        }
        self.prev_state = None;
        self.notify();
    }

    /// One control cycle: sample, derive, dispatch to the enabled laws.
    ///
    /// Any law error is logged and the remaining laws still run; the
    /// scheduler keeps ticking regardless. A stale cycle only refreshes
    /// the snapshot so the next cycle's deltas stay sane.
    pub async fn tick(&mut self, stale: bool) {
        let state = match FlightState::sample(self.provider.as_ref(), self.prev_state.as_ref()).await
        {
            Ok(state) => state,
            Err(err) => {
                cycle!("Cycle skipped: {err}");
                return;
            }
        };

        if let Some(known) = &self.model {
            if state.model.identity_differs(known) {
                info!("Airframe changed, resetting autopilot state");
                self.reset(Some(&state.model));
            }
        }
        self.model = Some(state.model.clone());

        if state.data.crashed {
            cycle!("Crash flag set, resetting trim");
            self.reset(Some(&state.model));
            self.prev_state = Some(state);
            return;
        }

        if stale || !self.provider.connected() || !self.modes.is_enabled(ApMode::Master) {
            self.prev_state = Some(state);
            return;
        }

        // Route targets feed the registry before any law reads it.
        let pos = state.position();
        let _ = self.route.target_heading(pos, state.derived.declination, &mut self.modes);
        let _ = self.route.target_altitude(&mut self.modes);

        let Self { laws, modes, trim, route, config, provider, .. } = self;
        for law in laws.iter_mut() {
            if !modes.is_enabled(law.mode()) {
                continue;
            }
            let mut ctx = CycleContext {
                state: &state,
                trim: &mut *trim,
                modes: &mut *modes,
                route: &mut *route,
                config: config.as_ref(),
                provider: provider.as_ref(),
            };
            if let Err(err) = law.apply(&mut ctx).await {
                error!("Law {} failed: {err}", law.mode());
            }
        }
        self.prev_state = Some(state);
    }

    pub(crate) fn scheduler_config(&self) -> &Arc<ControlConfig> { &self.config }

    #[cfg(test)]
    pub(crate) fn modes(&self) -> &ModeRegistry { &self.modes }

    #[cfg(test)]
    pub(crate) fn modes_mut(&mut self) -> &mut ModeRegistry { &mut self.modes }

    #[cfg(test)]
    pub(crate) fn trim(&self) -> &TrimVector { &self.trim }

    fn notify(&self) {
        // Even a no-op change is published; listeners resynchronize from
        // whatever the latest snapshot says.
        self.params_tx.send(self.get_parameters()).ok();
    }
}
