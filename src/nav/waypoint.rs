use super::geodesy::GeoPoint;
use serde::Serialize;

/// One routed waypoint.
///
/// Lifecycle: created inactive, marked active while it is the current
/// target, marked completed once the vehicle arrives within the arrival
/// threshold, then either left behind or re-activated when the route
/// repeats. The manager owns every instance; callers only ever see clones.
#[derive(Debug, Clone, Serialize)]
pub struct Waypoint {
    /// Monotonic, unique id. Never reused within a session.
    id: u32,
    lat: f64,
    lon: f64,
    /// Target altitude in feet, if the operator pinned one.
    altitude: Option<f64>,
    /// Whether this waypoint is the current navigation target.
    active: bool,
    /// Whether the vehicle has already arrived here.
    completed: bool,
    /// Marks the final touchdown waypoint of a route.
    landing: bool,
    /// Great-circle distance to the following waypoint in nautical miles.
    dist_next_nm: Option<f64>,
    /// Initial true bearing of the leg to the following waypoint.
    heading_next: Option<f64>,
    /// Highest terrain under the leg to the following waypoint, in meters.
    leg_max_elevation_m: Option<i16>,
    /// Id of the following waypoint; `None` for the last one.
    next: Option<u32>,
}

impl Waypoint {
    pub fn new(id: u32, lat: f64, lon: f64, altitude: Option<f64>) -> Self {
        Self {
            id,
            lat,
            lon,
            altitude,
            active: false,
            completed: false,
            landing: false,
            dist_next_nm: None,
            heading_next: None,
            leg_max_elevation_m: None,
            next: None,
        }
    }

    pub const fn id(&self) -> u32 { self.id }
    pub const fn position(&self) -> GeoPoint { GeoPoint::new(self.lat, self.lon) }
    pub const fn altitude(&self) -> Option<f64> { self.altitude }
    pub const fn is_active(&self) -> bool { self.active }
    pub const fn is_completed(&self) -> bool { self.completed }
    pub const fn is_landing(&self) -> bool { self.landing }
    pub const fn next(&self) -> Option<u32> { self.next }
    pub const fn dist_next_nm(&self) -> Option<f64> { self.dist_next_nm }
    pub const fn heading_next(&self) -> Option<f64> { self.heading_next }
    pub const fn leg_max_elevation_m(&self) -> Option<i16> { self.leg_max_elevation_m }

    pub(super) fn set_position(&mut self, lat: f64, lon: f64) {
        self.lat = lat;
        self.lon = lon;
    }

    pub(super) fn set_altitude(&mut self, altitude: Option<f64>) { self.altitude = altitude; }

    pub(super) fn set_landing(&mut self, landing: bool) { self.landing = landing; }

    pub(super) fn set_active(&mut self, active: bool) { self.active = active; }

    pub(super) fn set_completed(&mut self, completed: bool) { self.completed = completed; }

    pub(super) fn set_leg(
        &mut self,
        next: Option<u32>,
        dist_nm: Option<f64>,
        heading: Option<f64>,
    ) {
        self.next = next;
        self.dist_next_nm = dist_nm;
        self.heading_next = heading;
    }

    pub(super) fn set_leg_max_elevation(&mut self, elevation_m: Option<i16>) {
        self.leg_max_elevation_m = elevation_m;
    }
}
