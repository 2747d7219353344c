use super::transform::GeoTransform;
use image::GrayImage;
use std::path::Path;
use strum_macros::Display;

/// Raw sentinel marking a raster cell with no elevation data.
pub const NO_DATA: i16 = -32768;

/// Meters of ground distance per degree of latitude, used to express the
/// raster's pixel size as an effective query resolution.
const METERS_PER_DEG_LAT: f64 = 111_320.0;

/// Errors raised while decoding an elevation raster.
///
/// A failed decode never tears down the caller; the tile is reported and
/// treated as unavailable.
#[derive(Debug, Display)]
pub enum DecodeError {
    /// The buffer ends before a structure it promises.
    TruncatedBuffer,
    /// Not a recognizable raster file.
    BadMagic,
    /// A required directory tag is absent.
    MissingTag(&'static str),
    /// The file is valid but uses a feature the decoder does not handle.
    Unsupported(&'static str),
    /// The geo-transform tags do not describe an invertible mapping.
    DegenerateTransform,
    /// The tile file could not be read.
    Io(std::io::Error),
}

impl std::error::Error for DecodeError {}

impl From<std::io::Error> for DecodeError {
    fn from(value: std::io::Error) -> Self { DecodeError::Io(value) }
}

/// A decoded single-band 16-bit elevation raster with its geo-referencing.
///
/// Immutable after decode; the coarse variant produced by
/// [`ElevationTile::downsample`] is a max-preserving copy so wide-area
/// queries never under-report terrain.
#[derive(Debug, Clone)]
pub struct ElevationTile {
    /// Raster width in pixels.
    width: u32,
    /// Raster height in pixels.
    height: u32,
    /// Row-major elevation samples in meters.
    pixels: Vec<i16>,
    /// Pixel/geographic mapping.
    transform: GeoTransform,
    /// Sentinel marking cells without data.
    no_data: i16,
    /// Per-axis downsample factor relative to the source raster (1 = fine).
    scale_factor: u32,
}

/// One 12-byte image-file-directory entry.
struct IfdEntry {
    tag: u16,
    field_type: u16,
    count: u32,
    value_offset: usize,
}

/// Bounds-checked little/big-endian reads over the raw file buffer.
struct RasterReader<'a> {
    buf: &'a [u8],
    little_endian: bool,
}

impl<'a> RasterReader<'a> {
    fn u16_at(&self, offset: usize) -> Result<u16, DecodeError> {
        let b: [u8; 2] = self
            .buf
            .get(offset..offset + 2)
            .ok_or(DecodeError::TruncatedBuffer)?
            .try_into()
            .unwrap();
        Ok(if self.little_endian { u16::from_le_bytes(b) } else { u16::from_be_bytes(b) })
    }

    fn u32_at(&self, offset: usize) -> Result<u32, DecodeError> {
        let b: [u8; 4] = self
            .buf
            .get(offset..offset + 4)
            .ok_or(DecodeError::TruncatedBuffer)?
            .try_into()
            .unwrap();
        Ok(if self.little_endian { u32::from_le_bytes(b) } else { u32::from_be_bytes(b) })
    }

    fn f64_at(&self, offset: usize) -> Result<f64, DecodeError> {
        let b: [u8; 8] = self
            .buf
            .get(offset..offset + 8)
            .ok_or(DecodeError::TruncatedBuffer)?
            .try_into()
            .unwrap();
        Ok(if self.little_endian { f64::from_le_bytes(b) } else { f64::from_be_bytes(b) })
    }

    fn i16_at(&self, offset: usize) -> Result<i16, DecodeError> {
        Ok(self.u16_at(offset)? as i16)
    }

    /// Reads an entry's payload as unsigned integers (SHORT or LONG),
    /// inline when it fits into the four value bytes.
    fn u32_values(&self, entry: &IfdEntry) -> Result<Vec<u32>, DecodeError> {
        let count = entry.count as usize;
        if count == 0 {
            return Err(DecodeError::TruncatedBuffer);
        }
        let (elem_size, short) = match entry.field_type {
            3 => (2, true),
            4 => (4, false),
            _ => return Err(DecodeError::Unsupported("integer tag type")),
        };
        let base = if elem_size * count <= 4 {
            entry.value_offset
        } else {
            self.u32_at(entry.value_offset)? as usize
        };
        (0..count)
            .map(|i| {
                if short {
                    self.u16_at(base + i * 2).map(u32::from)
                } else {
                    self.u32_at(base + i * 4)
                }
            })
            .collect()
    }

    /// Reads an entry's payload as DOUBLEs (always stored out of line).
    fn f64_values(&self, entry: &IfdEntry) -> Result<Vec<f64>, DecodeError> {
        if entry.field_type != 12 {
            return Err(DecodeError::Unsupported("double tag type"));
        }
        let base = self.u32_at(entry.value_offset)? as usize;
        (0..entry.count as usize).map(|i| self.f64_at(base + i * 8)).collect()
    }

    /// Reads an ASCII entry into a string, dropping the NUL terminator.
    fn ascii_value(&self, entry: &IfdEntry) -> Result<String, DecodeError> {
        let count = entry.count as usize;
        let base = if count <= 4 {
            entry.value_offset
        } else {
            self.u32_at(entry.value_offset)? as usize
        };
        let bytes = self.buf.get(base..base + count).ok_or(DecodeError::TruncatedBuffer)?;
        Ok(String::from_utf8_lossy(bytes).trim_end_matches('\0').trim().to_string())
    }
}

impl ElevationTile {
    /// Decodes a single-band 16-bit uncompressed geo-referenced raster.
    ///
    /// Required tags: image dimensions, 16 bits per sample, strip layout,
    /// pixel-scale (33550) and tiepoint (33922). An optional no-data tag
    /// (42113) overrides the default sentinel.
    ///
    /// # Errors
    /// A [`DecodeError`] describing the first malformed structure found.
    #[allow(clippy::too_many_lines)]
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        if buf.len() < 8 {
            return Err(DecodeError::TruncatedBuffer);
        }
        let little_endian = match &buf[0..2] {
            b"II" => true,
            b"MM" => false,
            _ => return Err(DecodeError::BadMagic),
        };
        let r = RasterReader { buf, little_endian };
        if r.u16_at(2)? != 42 {
            return Err(DecodeError::BadMagic);
        }
        let ifd_offset = r.u32_at(4)? as usize;
        let entry_count = r.u16_at(ifd_offset)? as usize;

        let mut width = None;
        let mut height = None;
        let mut strip_offsets = None;
        let mut strip_byte_counts = None;
        let mut pixel_scale = None;
        let mut tiepoint = None;
        let mut no_data = NO_DATA;

        for i in 0..entry_count {
            let base = ifd_offset + 2 + i * 12;
            let entry = IfdEntry {
                tag: r.u16_at(base)?,
                field_type: r.u16_at(base + 2)?,
                count: r.u32_at(base + 4)?,
                value_offset: base + 8,
            };
            match entry.tag {
                256 => width = Some(r.u32_values(&entry)?[0]),
                257 => height = Some(r.u32_values(&entry)?[0]),
                258 => {
                    if r.u32_values(&entry)?[0] != 16 {
                        return Err(DecodeError::Unsupported("bits per sample"));
                    }
                }
                259 => {
                    if r.u32_values(&entry)?[0] != 1 {
                        return Err(DecodeError::Unsupported("compression"));
                    }
                }
                277 => {
                    if r.u32_values(&entry)?[0] != 1 {
                        return Err(DecodeError::Unsupported("samples per pixel"));
                    }
                }
                273 => strip_offsets = Some(r.u32_values(&entry)?),
                279 => strip_byte_counts = Some(r.u32_values(&entry)?),
                33550 => pixel_scale = Some(r.f64_values(&entry)?),
                33922 => tiepoint = Some(r.f64_values(&entry)?),
                42113 => {
                    if let Ok(text) = r.ascii_value(&entry) {
                        if let Ok(v) = text.parse::<i16>() {
                            no_data = v;
                        }
                    }
                }
                _ => {}
            }
        }

        let width = width.ok_or(DecodeError::MissingTag("ImageWidth"))?;
        let height = height.ok_or(DecodeError::MissingTag("ImageLength"))?;
        let strip_offsets = strip_offsets.ok_or(DecodeError::MissingTag("StripOffsets"))?;
        let strip_byte_counts =
            strip_byte_counts.ok_or(DecodeError::MissingTag("StripByteCounts"))?;
        let pixel_scale = pixel_scale.ok_or(DecodeError::MissingTag("ModelPixelScale"))?;
        let tiepoint = tiepoint.ok_or(DecodeError::MissingTag("ModelTiepoint"))?;
        let transform = GeoTransform::from_tags(&pixel_scale, &tiepoint)?;

        let expected = width as usize * height as usize;
        let mut pixels = Vec::with_capacity(expected);
        for (offset, byte_count) in strip_offsets.iter().zip(strip_byte_counts.iter()) {
            let (start, len) = (*offset as usize, *byte_count as usize);
            if start + len > buf.len() || len % 2 != 0 {
                return Err(DecodeError::TruncatedBuffer);
            }
            for pos in (start..start + len).step_by(2) {
                pixels.push(r.i16_at(pos)?);
            }
        }
        if pixels.len() != expected {
            return Err(DecodeError::TruncatedBuffer);
        }

        Ok(Self { width, height, pixels, transform, no_data, scale_factor: 1 })
    }

    /// Test hook assembling a tile without going through the decoder.
    #[cfg(test)]
    pub(crate) fn from_parts(
        width: u32,
        height: u32,
        pixels: Vec<i16>,
        transform: GeoTransform,
    ) -> Self {
        Self { width, height, pixels, transform, no_data: NO_DATA, scale_factor: 1 }
    }

    /// Raster width in pixels.
    pub const fn width(&self) -> u32 { self.width }

    /// Raster height in pixels.
    pub const fn height(&self) -> u32 { self.height }

    /// Per-axis downsample factor relative to the source raster.
    pub const fn scale_factor(&self) -> u32 { self.scale_factor }

    /// Effective ground resolution of one pixel in meters.
    pub fn resolution_m(&self) -> f64 {
        self.transform.pixel_height_deg() * METERS_PER_DEG_LAT
    }

    /// The pixel/geographic mapping of this raster.
    pub const fn transform(&self) -> &GeoTransform { &self.transform }

    /// Returns the sample at `(x, y)`, or `None` when out of bounds or
    /// marked as no-data.
    pub fn get(&self, x: i64, y: i64) -> Option<i16> {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return None;
        }
        let sample = self.pixels[y as usize * self.width as usize + x as usize];
        if sample == self.no_data { None } else { Some(sample) }
    }

    /// Looks up the elevation under a geographic position.
    ///
    /// # Returns
    /// The elevation in meters, or `None` for out-of-range or void cells.
    #[allow(clippy::cast_possible_truncation)]
    pub fn lookup(&self, lat: f64, lon: f64) -> Option<i16> {
        let (px, py) = self.transform.geo_to_pixel(lat, lon);
        self.get(px.floor() as i64, py.floor() as i64)
    }

    /// Produces a coarse copy downsampled by `2^(scale - 1)` per axis,
    /// where every coarse cell holds the maximum of the raw cells it
    /// covers. Queries against the copy therefore never underestimate
    /// terrain.
    pub fn downsample(&self, scale: u32) -> Self {
        let factor = 2u32.pow(scale.saturating_sub(1));
        let coarse_w = self.width.div_ceil(factor);
        let coarse_h = self.height.div_ceil(factor);
        let mut pixels = vec![self.no_data; coarse_w as usize * coarse_h as usize];
        for cy in 0..coarse_h {
            for cx in 0..coarse_w {
                let mut max = self.no_data;
                for y in cy * factor..((cy + 1) * factor).min(self.height) {
                    for x in cx * factor..((cx + 1) * factor).min(self.width) {
                        let sample = self.pixels[y as usize * self.width as usize + x as usize];
                        if sample != self.no_data && sample > max {
                            max = sample;
                        }
                    }
                }
                pixels[cy as usize * coarse_w as usize + cx as usize] = max;
            }
        }
        Self {
            width: coarse_w,
            height: coarse_h,
            pixels,
            transform: self.transform.downsampled(factor),
            no_data: self.no_data,
            scale_factor: self.scale_factor * factor,
        }
    }

    /// Exports the raster as a grayscale PNG for ground inspection,
    /// stretching the valid elevation range to full contrast. Void cells
    /// render black.
    ///
    /// # Errors
    /// Propagates the underlying image encoder error.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn export_to_png<P: AsRef<Path>>(&self, path: P) -> Result<(), image::ImageError> {
        let (mut lo, mut hi) = (i16::MAX, i16::MIN);
        for &sample in &self.pixels {
            if sample != self.no_data {
                lo = lo.min(sample);
                hi = hi.max(sample);
            }
        }
        let span = f64::from(hi) - f64::from(lo);
        let mut img = GrayImage::new(self.width, self.height);
        for (i, &sample) in self.pixels.iter().enumerate() {
            let shade = if sample == self.no_data || span <= 0.0 {
                0
            } else {
                ((f64::from(sample) - f64::from(lo)) / span * 255.0).round() as u8
            };
            let x = i as u32 % self.width;
            let y = i as u32 / self.width;
            img.put_pixel(x, y, image::Luma([shade]));
        }
        img.save(path)
    }
}
