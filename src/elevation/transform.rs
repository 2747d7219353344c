use super::tile::DecodeError;

/// Affine mapping between raster pixel space and geographic space.
///
/// Both directions are stored as six-parameter matrices in the usual
/// geo-raster layout: `geo = [origin, x_step, x_skew, origin, y_skew, y_step]`
/// applied to `(px, py)`. The reverse matrix is the analytic inverse of the
/// forward one, so a round trip reproduces a coordinate within one pixel's
/// geographic resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    /// Pixel to geographic: `lon = f[0] + px * f[1] + py * f[2]`,
    /// `lat = f[3] + px * f[4] + py * f[5]`.
    forward: [f64; 6],
    /// Geographic to pixel: `px = r[0] + lon * r[1] + lat * r[2]`,
    /// `py = r[3] + lon * r[4] + lat * r[5]`.
    reverse: [f64; 6],
}

impl GeoTransform {
    /// Builds the transform pair from the raster's pixel-scale and tiepoint
    /// tags.
    ///
    /// # Arguments
    /// * `pixel_scale` - `[sx, sy, ...]`, the geographic size of one pixel.
    /// * `tiepoint` - `[px, py, _, lon, lat, _]`, anchoring a pixel to a
    ///   geographic position (in practice the raster origin).
    ///
    /// # Errors
    /// `DecodeError::DegenerateTransform` if either scale component is zero.
    pub fn from_tags(pixel_scale: &[f64], tiepoint: &[f64]) -> Result<Self, DecodeError> {
        if pixel_scale.len() < 2 || tiepoint.len() < 6 {
            return Err(DecodeError::DegenerateTransform);
        }
        let (sx, sy) = (pixel_scale[0], pixel_scale[1]);
        if sx == 0.0 || sy == 0.0 {
            return Err(DecodeError::DegenerateTransform);
        }
        // Tiepoint anchors raster pixel (px, py) at (lon, lat); latitude
        // decreases with increasing row index.
        let origin_lon = tiepoint[3] - tiepoint[0] * sx;
        let origin_lat = tiepoint[4] + tiepoint[1] * sy;
        let forward = [origin_lon, sx, 0.0, origin_lat, 0.0, -sy];
        let reverse = [-origin_lon / sx, 1.0 / sx, 0.0, origin_lat / sy, 0.0, -1.0 / sy];
        Ok(Self { forward, reverse })
    }

    /// Converts a pixel position to geographic coordinates.
    ///
    /// # Returns
    /// `(lat, lon)` in decimal degrees.
    pub fn pixel_to_geo(&self, px: f64, py: f64) -> (f64, f64) {
        let f = &self.forward;
        let lon = f[0] + px * f[1] + py * f[2];
        let lat = f[3] + px * f[4] + py * f[5];
        (lat, lon)
    }

    /// Converts geographic coordinates to a (fractional) pixel position.
    ///
    /// # Returns
    /// `(px, py)`; callers bounds-check against the raster dimensions.
    pub fn geo_to_pixel(&self, lat: f64, lon: f64) -> (f64, f64) {
        let r = &self.reverse;
        let px = r[0] + lon * r[1] + lat * r[2];
        let py = r[3] + lon * r[4] + lat * r[5];
        (px, py)
    }

    /// Derives the transform of a downsampled copy of the raster.
    ///
    /// One coarse pixel covers a `factor x factor` block of this raster, so
    /// both step components grow by `factor` while the origin is unchanged.
    pub fn downsampled(&self, factor: u32) -> Self {
        let k = f64::from(factor);
        let f = &self.forward;
        let forward = [f[0], f[1] * k, f[2] * k, f[3], f[4] * k, f[5] * k];
        let reverse = [
            -f[0] / (f[1] * k),
            1.0 / (f[1] * k),
            0.0,
            -f[3] / (f[5] * k),
            0.0,
            1.0 / (f[5] * k),
        ];
        Self { forward, reverse }
    }

    /// Geographic height of one pixel row in degrees (always positive).
    pub fn pixel_height_deg(&self) -> f64 { self.forward[5].abs() }
}
