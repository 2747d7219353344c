use super::raster::polygon_spans;
use super::tile::{DecodeError, ElevationTile};
use crate::nav::geodesy::GeoPoint;
use crate::{info, warn};
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, OnceLock};

/// Feet per meter; terrain heights are always rounded *up* when converted
/// because they feed a vertical-safety margin.
const FEET_PER_METER: f64 = 3.280_84;

/// Result of a maximum-elevation query over a flight corridor.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MaxElevation {
    /// Latitude of the highest cell found.
    pub lat: f64,
    /// Longitude of the highest cell found.
    pub lon: f64,
    /// Elevation in meters.
    pub elevation_m: i16,
    /// Elevation in feet, rounded up.
    pub elevation_ft: i32,
    /// Ground resolution the answer was computed at, in meters.
    pub resolution_m: f64,
}

/// Terrain query engine over one geo-referenced elevation raster.
///
/// The fine tile is immutable after load. A coarse, max-preserving copy is
/// built once in the background; until it is ready every query falls back
/// to the fine tile, so lookups never block on the build.
pub struct ElevationEngine {
    fine: Arc<ElevationTile>,
    coarse: Arc<OnceLock<ElevationTile>>,
    coarse_scale: u32,
}

impl ElevationEngine {
    /// Reads and decodes a tile file.
    ///
    /// # Arguments
    /// * `path` - The raster file.
    /// * `coarse_scale` - Downsample exponent for the background coarse
    ///   build; factor `2^(scale - 1)` per axis.
    ///
    /// # Errors
    /// A [`DecodeError`] for unreadable or malformed input. The caller
    /// reports it and continues without terrain answers.
    pub async fn load<P: AsRef<Path>>(path: P, coarse_scale: u32) -> Result<Self, DecodeError> {
        let buf = tokio::fs::read(path).await?;
        let fine = Arc::new(ElevationTile::decode(&buf)?);
        info!(
            "Loaded elevation tile {}x{} at {:.0}m resolution",
            fine.width(),
            fine.height(),
            fine.resolution_m()
        );
        Ok(Self { fine, coarse: Arc::new(OnceLock::new()), coarse_scale })
    }

    /// Builds an engine from an already decoded tile. Used by tests and by
    /// callers that synthesize rasters.
    pub fn from_tile(tile: ElevationTile, coarse_scale: u32) -> Self {
        Self { fine: Arc::new(tile), coarse: Arc::new(OnceLock::new()), coarse_scale }
    }

    /// Kicks off the one-time coarse-tile construction on a blocking
    /// worker. Queries keep using the fine tile until the result is
    /// published.
    pub fn spawn_coarse_build(&self) {
        let fine = Arc::clone(&self.fine);
        let slot = Arc::clone(&self.coarse);
        let scale = self.coarse_scale;
        tokio::task::spawn_blocking(move || {
            let coarse = fine.downsample(scale);
            info!(
                "Coarse elevation tile ready: {}x{} (factor {})",
                coarse.width(),
                coarse.height(),
                coarse.scale_factor()
            );
            if slot.set(coarse).is_err() {
                warn!("Coarse elevation tile was already built");
            }
        });
    }

    /// Runs the coarse build inline. Test hook for deterministic setups.
    #[cfg(test)]
    pub fn build_coarse_now(&self) {
        let _ = self.coarse.set(self.fine.downsample(self.coarse_scale));
    }

    /// Whether the coarse tile has been published yet.
    pub fn coarse_ready(&self) -> bool { self.coarse.get().is_some() }

    fn query_tile(&self, coarse: bool) -> &ElevationTile {
        if coarse {
            if let Some(tile) = self.coarse.get() {
                return tile;
            }
        }
        &self.fine
    }

    /// Looks up the elevation under one geographic position.
    ///
    /// # Arguments
    /// * `coarse` - Prefer the coarse tile when it is ready.
    ///
    /// # Returns
    /// Elevation in meters, or `None` for out-of-range or void cells.
    pub fn lookup(&self, lat: f64, lon: f64, coarse: bool) -> Option<i16> {
        self.query_tile(coarse).lookup(lat, lon)
    }

    /// Finds the highest terrain under a geographic polygon.
    ///
    /// The polygon is rasterized into per-row spans on the coarse tile when
    /// available (fine otherwise); every span cell is scanned and the
    /// maximum valid sample wins. This runs every control cycle, which is
    /// why the coarse tile exists.
    ///
    /// # Returns
    /// The winning cell and the resolution it was found at, or `None` when
    /// the polygon is degenerate, fully outside the raster, or covers only
    /// void cells.
    #[allow(clippy::cast_possible_truncation)]
    pub fn max_elevation(&self, polygon: &[GeoPoint]) -> Option<MaxElevation> {
        let tile = self.query_tile(true);
        let vertices: Vec<(i64, i64)> = polygon
            .iter()
            .map(|p| {
                let (px, py) = tile.transform().geo_to_pixel(p.lat(), p.lon());
                (px.floor() as i64, py.floor() as i64)
            })
            .collect();

        let mut max: Option<(i16, i64, i64)> = None;
        for (y, (start, end)) in polygon_spans(&vertices) {
            if start == end {
                continue;
            }
            for x in start..=end {
                if let Some(sample) = tile.get(x, y) {
                    if max.is_none_or(|(best, _, _)| sample > best) {
                        max = Some((sample, x, y));
                    }
                }
            }
        }

        max.map(|(elevation_m, x, y)| {
            let (lat, lon) = tile.transform().pixel_to_geo(x as f64 + 0.5, y as f64 + 0.5);
            MaxElevation {
                lat,
                lon,
                elevation_m,
                elevation_ft: feet_ceil(elevation_m),
                resolution_m: tile.resolution_m(),
            }
        })
    }
}

/// Converts meters to feet, rounding up so terrain is never under-reported.
#[allow(clippy::cast_possible_truncation)]
pub fn feet_ceil(meters: i16) -> i32 {
    (f64::from(meters) * FEET_PER_METER).ceil() as i32
}
