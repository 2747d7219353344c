use super::geodesy::{GeoPoint, normalize_heading};
use super::waypoint::Waypoint;
use crate::control::config::RouteConfig;
use crate::control::modes::{ApMode, ModeRegistry};
use crate::elevation::{ElevationEngine, MaxElevation};
use crate::log;
use std::sync::Arc;
use strum_macros::Display;

/// Errors rejected at the operator boundary. Every failed route operation
/// is a no-op; the list is never left partially mutated.
#[derive(Debug, Display, PartialEq, Eq)]
pub enum RouteError {
    /// No waypoint with the given id exists.
    UnknownWaypoint(u32),
    /// The waypoint has no following leg to operate on.
    NoLeg(u32),
}

impl std::error::Error for RouteError {}

/// Owns the ordered route and the notion of the current waypoint.
///
/// The externally visible ordering and the `next` links always agree:
/// every mutation goes through [`WaypointManager::relink`], which rebuilds
/// links, per-leg distances and headings from insertion order. Per-leg
/// terrain is only re-queried for the legs an edit actually touched.
pub struct WaypointManager {
    waypoints: Vec<Waypoint>,
    current: Option<u32>,
    next_id: u32,
    repeating: bool,
    engine: Option<Arc<ElevationEngine>>,
    config: RouteConfig,
}

impl WaypointManager {
    pub fn new(config: RouteConfig, engine: Option<Arc<ElevationEngine>>) -> Self {
        Self { waypoints: Vec::new(), current: None, next_id: 0, repeating: false, engine, config }
    }

    /// Appends a waypoint, making it current if the route was empty.
    ///
    /// # Returns
    /// The id assigned to the new waypoint.
    pub fn add(&mut self, lat: f64, lon: f64, altitude: Option<f64>) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.waypoints.push(Waypoint::new(id, lat, lon, altitude));
        if self.current.is_none() {
            self.set_current(Some(id));
        }
        self.relink();
        if self.waypoints.len() >= 2 {
            self.refresh_leg_elevation(self.waypoints.len() - 2);
        }
        id
    }

    /// Moves a waypoint and refreshes the two legs it touches.
    pub fn set_position(&mut self, id: u32, lat: f64, lon: f64) -> Result<(), RouteError> {
        let idx = self.index_of(id)?;
        self.waypoints[idx].set_position(lat, lon);
        self.relink();
        if idx > 0 {
            self.refresh_leg_elevation(idx - 1);
        }
        self.refresh_leg_elevation(idx);
        Ok(())
    }

    /// Pins or clears a waypoint's target altitude.
    pub fn set_elevation(&mut self, id: u32, altitude: Option<f64>) -> Result<(), RouteError> {
        let idx = self.index_of(id)?;
        self.waypoints[idx].set_altitude(altitude);
        Ok(())
    }

    /// Flags or clears a waypoint as the touchdown point.
    pub fn set_landing(&mut self, id: u32, landing: bool) -> Result<(), RouteError> {
        let idx = self.index_of(id)?;
        self.waypoints[idx].set_landing(landing);
        Ok(())
    }

    /// Removes a waypoint. Removing the current one advances to its
    /// successor in route order.
    pub fn remove(&mut self, id: u32) -> Result<(), RouteError> {
        let idx = self.index_of(id)?;
        self.waypoints.remove(idx);
        if self.current == Some(id) {
            let succ = self.waypoints.get(idx).map(Waypoint::id);
            self.set_current(succ);
        }
        self.relink();
        if idx > 0 && idx <= self.waypoints.len() {
            self.refresh_leg_elevation(idx - 1);
        }
        Ok(())
    }

    /// Inserts the geodesic midpoint of the leg starting at `id`, splitting
    /// it in two.
    ///
    /// # Returns
    /// The id of the inserted waypoint.
    pub fn split(&mut self, id: u32) -> Result<u32, RouteError> {
        let idx = self.index_of(id)?;
        if idx + 1 >= self.waypoints.len() {
            return Err(RouteError::NoLeg(id));
        }
        let mid = self.waypoints[idx].position().midpoint(&self.waypoints[idx + 1].position());
        let new_id = self.next_id;
        self.next_id += 1;
        self.waypoints.insert(idx + 1, Waypoint::new(new_id, mid.lat(), mid.lon(), None));
        self.relink();
        self.refresh_leg_elevation(idx);
        self.refresh_leg_elevation(idx + 1);
        Ok(new_id)
    }

    /// Toggles route looping.
    ///
    /// # Returns
    /// The new repeat flag.
    pub fn toggle_repeating(&mut self) -> bool {
        self.repeating = !self.repeating;
        self.repeating
    }

    /// Drops the whole route.
    pub fn reset(&mut self) {
        self.waypoints.clear();
        self.current = None;
    }

    /// Computes the magnetic heading towards the current waypoint, pushes
    /// it into the heading target when it changed, and evaluates arrival.
    ///
    /// # Returns
    /// The magnetic heading, or `None` without a current waypoint.
    pub fn target_heading(
        &mut self,
        pos: GeoPoint,
        declination: f64,
        modes: &mut ModeRegistry,
    ) -> Option<f64> {
        let wp = self.current_waypoint()?;
        let heading = normalize_heading(pos.bearing_to(&wp.position()) - declination);
        if modes.target(ApMode::Heading).is_none_or(|t| (t - heading).abs() > 0.5) {
            modes.set_target(ApMode::Heading, heading);
        }
        self.check_transition(pos);
        Some(heading)
    }

    /// Pushes the current waypoint's pinned altitude into the
    /// altitude-hold target when it changed.
    ///
    /// # Returns
    /// The target altitude in feet, or `None` when the current waypoint
    /// does not pin one.
    pub fn target_altitude(&mut self, modes: &mut ModeRegistry) -> Option<f64> {
        let altitude = self.current_waypoint()?.altitude()?;
        if modes.target(ApMode::AltitudeHold).is_none_or(|t| (t - altitude).abs() > 0.5) {
            modes.set_target(ApMode::AltitudeHold, altitude);
        }
        Some(altitude)
    }

    /// Completes the current waypoint once the vehicle is within the
    /// arrival threshold and advances along the `next` link; an exhausted
    /// route restarts from the first waypoint when repeat is on.
    pub fn check_transition(&mut self, pos: GeoPoint) {
        let Some(wp) = self.current_waypoint() else { return };
        if pos.distance_nm(&wp.position()) > self.config.arrival_threshold_nm {
            return;
        }
        let (id, next) = (wp.id(), wp.next());
        if let Ok(idx) = self.index_of(id) {
            self.waypoints[idx].set_completed(true);
        }
        log!("Waypoint {id} reached");
        match next {
            Some(next_id) => self.set_current(Some(next_id)),
            None if self.repeating => self.restart(),
            None => self.set_current(None),
        }
    }

    /// Finds the highest terrain under the flight corridor ahead: the
    /// current leg when routed, otherwise a heading-projected cone.
    ///
    /// # Arguments
    /// * `heading_mag` - Current magnetic heading, used when unrouted.
    /// * `probe_nm` - Lookahead distance in nautical miles.
    pub fn max_elevation_ahead(
        &self,
        pos: GeoPoint,
        heading_mag: f64,
        probe_nm: f64,
        declination: f64,
    ) -> Option<MaxElevation> {
        let engine = self.engine.as_ref()?;
        let polygon = match self.current_waypoint() {
            Some(wp) => corridor(pos, wp.position(), self.config.corridor_half_width_nm),
            None => {
                let heading = normalize_heading(heading_mag + declination);
                let half = self.config.cone_half_angle_deg;
                vec![
                    pos,
                    pos.destination(heading - half, probe_nm),
                    pos.destination(heading + half, probe_nm),
                ]
            }
        };
        engine.max_elevation(&polygon)
    }

    pub fn current_id(&self) -> Option<u32> { self.current }

    pub fn is_landing(&self) -> bool {
        self.current_waypoint().is_some_and(Waypoint::is_landing)
    }

    pub fn repeating(&self) -> bool { self.repeating }

    /// Ordered copy of the route; callers never see the live list.
    pub fn waypoints(&self) -> Vec<Waypoint> { self.waypoints.clone() }

    fn current_waypoint(&self) -> Option<&Waypoint> {
        let id = self.current?;
        self.waypoints.iter().find(|w| w.id() == id)
    }

    fn index_of(&self, id: u32) -> Result<usize, RouteError> {
        self.waypoints
            .iter()
            .position(|w| w.id() == id)
            .ok_or(RouteError::UnknownWaypoint(id))
    }

    fn set_current(&mut self, id: Option<u32>) {
        self.current = id;
        for wp in &mut self.waypoints {
            wp.set_active(Some(wp.id()) == id);
        }
    }

    /// Re-activates the whole route from its first waypoint.
    fn restart(&mut self) {
        for wp in &mut self.waypoints {
            wp.set_completed(false);
        }
        let first = self.waypoints.first().map(Waypoint::id);
        self.set_current(first);
    }

    /// Rebuilds `next` links and per-leg distance/heading from insertion
    /// order. Cheap; terrain is refreshed separately per affected leg.
    fn relink(&mut self) {
        let legs: Vec<(Option<u32>, Option<f64>, Option<f64>)> = self
            .waypoints
            .iter()
            .enumerate()
            .map(|(i, wp)| match self.waypoints.get(i + 1) {
                Some(next) => (
                    Some(next.id()),
                    Some(wp.position().distance_nm(&next.position())),
                    Some(wp.position().bearing_to(&next.position())),
                ),
                None => (None, None, None),
            })
            .collect();
        for (wp, (next, dist, heading)) in self.waypoints.iter_mut().zip(legs) {
            wp.set_leg(next, dist, heading);
        }
    }

    /// Re-queries the highest terrain under the leg starting at `idx`.
    fn refresh_leg_elevation(&mut self, idx: usize) {
        let elevation = self.engine.as_ref().and_then(|engine| {
            let from = self.waypoints.get(idx)?.position();
            let to = self.waypoints.get(idx + 1)?.position();
            let polygon = corridor(from, to, self.config.corridor_half_width_nm);
            engine.max_elevation(&polygon).map(|hit| hit.elevation_m)
        });
        if let Some(wp) = self.waypoints.get_mut(idx) {
            wp.set_leg_max_elevation(elevation);
        }
    }
}

/// Builds the quadrilateral corridor of a leg, widened perpendicular to
/// the leg bearing on both sides.
fn corridor(from: GeoPoint, to: GeoPoint, half_width_nm: f64) -> Vec<GeoPoint> {
    let bearing = from.bearing_to(&to);
    vec![
        from.destination(bearing - 90.0, half_width_nm),
        to.destination(bearing - 90.0, half_width_nm),
        to.destination(bearing + 90.0, half_width_nm),
        from.destination(bearing + 90.0, half_width_nm),
    ]
}
