use serde::{Deserialize, Serialize};

/// Mean Earth radius in nautical miles, the distance unit used throughout
/// route sequencing.
pub const EARTH_RADIUS_NM: f64 = 3440.065;

/// A geographic position in decimal degrees.
///
/// This struct represents a point on the Earth's surface and provides the
/// great-circle operations the route sequencer is built on: distance,
/// initial bearing, projected destination and leg midpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in decimal degrees, positive north.
    lat: f64,
    /// Longitude in decimal degrees, positive east.
    lon: f64,
}

impl GeoPoint {
    /// Creates a new point from latitude and longitude in decimal degrees.
    pub const fn new(lat: f64, lon: f64) -> Self { Self { lat, lon } }

    /// Returns the latitude in decimal degrees.
    pub const fn lat(&self) -> f64 { self.lat }

    /// Returns the longitude in decimal degrees.
    pub const fn lon(&self) -> f64 { self.lon }

    /// Computes the great-circle distance to another point using the
    /// haversine formulation.
    ///
    /// # Arguments
    /// * `other` - The target point.
    ///
    /// # Returns
    /// The distance in nautical miles.
    pub fn distance_nm(&self, other: &Self) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lon = (other.lon - self.lon).to_radians();
        let a = (d_lat / 2.0).sin().powi(2)
            + self.lat.to_radians().cos() * other.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * a.sqrt().asin() * EARTH_RADIUS_NM
    }

    /// Computes the initial great-circle bearing towards another point.
    ///
    /// # Arguments
    /// * `other` - The target point.
    ///
    /// # Returns
    /// The true bearing in degrees, normalized to `[0, 360)`.
    pub fn bearing_to(&self, other: &Self) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let d_lon = (other.lon - self.lon).to_radians();
        let y = d_lon.sin() * lat2.cos();
        let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos();
        normalize_heading(y.atan2(x).to_degrees())
    }

    /// Projects a destination point along a true bearing.
    ///
    /// # Arguments
    /// * `bearing_deg` - The true bearing in degrees.
    /// * `distance_nm` - The distance to project, in nautical miles.
    ///
    /// # Returns
    /// The projected point.
    pub fn destination(&self, bearing_deg: f64, distance_nm: f64) -> Self {
        let delta = distance_nm / EARTH_RADIUS_NM;
        let theta = bearing_deg.to_radians();
        let lat1 = self.lat.to_radians();
        let lon1 = self.lon.to_radians();
        let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * theta.cos()).asin();
        let lon2 = lon1
            + (theta.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * lat2.sin());
        Self::new(lat2.to_degrees(), normalize_lon(lon2.to_degrees()))
    }

    /// Computes the great-circle midpoint between this point and another.
    ///
    /// # Arguments
    /// * `other` - The far end of the leg.
    ///
    /// # Returns
    /// The midpoint of the leg.
    pub fn midpoint(&self, other: &Self) -> Self {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let d_lon = (other.lon - self.lon).to_radians();
        let bx = lat2.cos() * d_lon.cos();
        let by = lat2.cos() * d_lon.sin();
        let lat3 = (lat1.sin() + lat2.sin()).atan2(((lat1.cos() + bx).powi(2) + by.powi(2)).sqrt());
        let lon3 = self.lon.to_radians() + by.atan2(lat1.cos() + bx);
        Self::new(lat3.to_degrees(), normalize_lon(lon3.to_degrees()))
    }
}

/// Signed cross-track distance of a point from the great circle through
/// `start` and `end`.
///
/// # Returns
/// The offset in nautical miles; positive when the point lies right of
/// the track.
pub fn cross_track_nm(point: &GeoPoint, start: &GeoPoint, end: &GeoPoint) -> f64 {
    let d13 = start.distance_nm(point) / EARTH_RADIUS_NM;
    let theta13 = start.bearing_to(point).to_radians();
    let theta12 = start.bearing_to(end).to_radians();
    (d13.sin() * (theta13 - theta12).sin()).asin() * EARTH_RADIUS_NM
}

/// Normalizes a heading to the range `[0, 360)` degrees.
pub fn normalize_heading(heading_deg: f64) -> f64 {
    let h = heading_deg % 360.0;
    if h < 0.0 { h + 360.0 } else { h }
}

/// Normalizes a longitude to the range `[-180, 180)` degrees.
pub fn normalize_lon(lon_deg: f64) -> f64 {
    let l = (lon_deg + 180.0).rem_euclid(360.0);
    l - 180.0
}

/// Computes the signed shortest-turn error from a current heading to a
/// target heading.
///
/// # Returns
/// The error in degrees within `[-180, 180]`; positive means a right turn.
pub fn heading_error(target_deg: f64, current_deg: f64) -> f64 {
    let mut err = normalize_heading(target_deg) - normalize_heading(current_deg);
    if err > 180.0 {
        err -= 360.0;
    } else if err < -180.0 {
        err += 360.0;
    }
    err
}
