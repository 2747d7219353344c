use super::tile::{DecodeError, ElevationTile, NO_DATA};
use super::engine::{ElevationEngine, feet_ceil};
use crate::nav::geodesy::GeoPoint;
use rand::Rng;

/// Assembles a minimal little-endian single-strip raster around the given
/// samples: pixel data first, then the out-of-line double tags, then the
/// directory.
fn build_raster(width: u32, height: u32, pixels: &[i16], origin: (f64, f64), scale: f64) -> Vec<u8> {
    assert_eq!(pixels.len(), (width * height) as usize);
    let data_len = pixels.len() * 2;
    let scale_off = 8 + data_len;
    let tie_off = scale_off + 3 * 8;
    let ifd_off = tie_off + 6 * 8;

    let mut buf = Vec::new();
    buf.extend_from_slice(b"II");
    buf.extend_from_slice(&42u16.to_le_bytes());
    buf.extend_from_slice(&(ifd_off as u32).to_le_bytes());
    for px in pixels {
        buf.extend_from_slice(&px.to_le_bytes());
    }
    for v in [scale, scale, 0.0] {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    // Tiepoint: pixel (0, 0) anchored at (origin_lon, origin_lat).
    for v in [0.0, 0.0, 0.0, origin.1, origin.0, 0.0] {
        buf.extend_from_slice(&v.to_le_bytes());
    }

    let entry = |tag: u16, field_type: u16, count: u32, value: u32| {
        let mut e = Vec::new();
        e.extend_from_slice(&tag.to_le_bytes());
        e.extend_from_slice(&field_type.to_le_bytes());
        e.extend_from_slice(&count.to_le_bytes());
        e.extend_from_slice(&value.to_le_bytes());
        e
    };
    let entries = [
        entry(256, 4, 1, width),
        entry(257, 4, 1, height),
        entry(258, 3, 1, 16),
        entry(259, 3, 1, 1),
        entry(273, 4, 1, 8),
        entry(277, 3, 1, 1),
        entry(279, 4, 1, data_len as u32),
        entry(33550, 12, 3, scale_off as u32),
        entry(33922, 12, 6, tie_off as u32),
    ];
    buf.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    for e in &entries {
        buf.extend_from_slice(e);
    }
    buf.extend_from_slice(&0u32.to_le_bytes());
    buf
}

/// 16x16 tile anchored at (48 N, 10 E) with 0.01 deg pixels, flat at 100 m
/// except a 1523 m peak at pixel (10, 4) and a void hole at (2, 2).
fn sample_tile() -> ElevationTile {
    let (w, h) = (16u32, 16u32);
    let mut pixels = vec![100i16; (w * h) as usize];
    pixels[(4 * w + 10) as usize] = 1523;
    pixels[(2 * w + 2) as usize] = NO_DATA;
    ElevationTile::decode(&build_raster(w, h, &pixels, (48.0, 10.0), 0.01)).unwrap()
}

#[test]
fn test_decode_and_point_lookup() {
    let tile = sample_tile();
    assert_eq!(tile.width(), 16);
    assert_eq!(tile.height(), 16);
    // Pixel (10, 4) spans lat [47.95, 47.96), lon [10.10, 10.11).
    assert_eq!(tile.lookup(47.955, 10.105), Some(1523));
    assert_eq!(tile.lookup(47.5, 10.5), None, "below the tile");
    assert_eq!(tile.lookup(47.975, 10.025), None, "void cell");
}

#[test]
fn test_decode_rejects_truncated_buffer() {
    let full = build_raster(4, 4, &[7i16; 16], (48.0, 10.0), 0.01);
    assert!(matches!(
        ElevationTile::decode(&full[..full.len() / 2]),
        Err(DecodeError::TruncatedBuffer)
    ));
    assert!(matches!(ElevationTile::decode(&full[..6]), Err(DecodeError::TruncatedBuffer)));
}

#[test]
fn test_decode_rejects_bad_magic() {
    let mut buf = build_raster(2, 2, &[0i16; 4], (48.0, 10.0), 0.01);
    buf[0] = b'X';
    assert!(matches!(ElevationTile::decode(&buf), Err(DecodeError::BadMagic)));
}

#[test]
fn test_decode_requires_geo_tags() {
    let (w, h) = (2u32, 2u32);
    let mut buf = build_raster(w, h, &[0i16; 4], (48.0, 10.0), 0.01);
    // Overwrite the pixel-scale tag id with an unknown one.
    let data_len = 8;
    let ifd_off = 8 + data_len + 24 + 48;
    let scale_entry = ifd_off + 2 + 7 * 12;
    buf[scale_entry..scale_entry + 2].copy_from_slice(&9999u16.to_le_bytes());
    assert!(matches!(
        ElevationTile::decode(&buf),
        Err(DecodeError::MissingTag("ModelPixelScale"))
    ));
}

#[test]
fn test_max_elevation_finds_peak() {
    let engine = ElevationEngine::from_tile(sample_tile(), 3);
    let polygon = [
        GeoPoint::new(47.999, 10.001),
        GeoPoint::new(47.999, 10.159),
        GeoPoint::new(47.841, 10.159),
        GeoPoint::new(47.841, 10.001),
    ];
    let hit = engine.max_elevation(&polygon).unwrap();
    assert_eq!(hit.elevation_m, 1523);
    assert_eq!(hit.elevation_ft, feet_ceil(1523));
    assert!(hit.lat > 47.95 && hit.lat < 47.96);
    assert!(hit.lon > 10.10 && hit.lon < 10.11);
}

#[test]
fn test_max_elevation_outside_tile_is_void() {
    let engine = ElevationEngine::from_tile(sample_tile(), 3);
    // Entirely south-west of the raster.
    let polygon = [
        GeoPoint::new(40.0, 0.0),
        GeoPoint::new(40.0, 0.2),
        GeoPoint::new(39.8, 0.2),
        GeoPoint::new(39.8, 0.0),
    ];
    assert!(engine.max_elevation(&polygon).is_none());
}

#[test]
fn test_max_elevation_degenerate_polygon_is_void() {
    let engine = ElevationEngine::from_tile(sample_tile(), 3);
    assert!(engine.max_elevation(&[GeoPoint::new(47.9, 10.1)]).is_none());
    assert!(
        engine
            .max_elevation(&[GeoPoint::new(47.9, 10.1), GeoPoint::new(47.9, 10.12)])
            .is_none()
    );
}

#[test]
fn test_coarse_never_under_reports() {
    let (w, h) = (32u32, 32u32);
    let mut rng = rand::rng();
    let pixels: Vec<i16> = (0..w * h).map(|_| rng.random_range(0..3000)).collect();
    let fine_max = *pixels.iter().max().unwrap();
    let tile = ElevationTile::decode(&build_raster(w, h, &pixels, (48.0, 10.0), 0.01)).unwrap();

    let engine = ElevationEngine::from_tile(tile, 4);
    engine.build_coarse_now();
    assert!(engine.coarse_ready());
    let polygon = [
        GeoPoint::new(48.001, 9.999),
        GeoPoint::new(48.001, 10.33),
        GeoPoint::new(47.67, 10.33),
        GeoPoint::new(47.67, 9.999),
    ];
    let hit = engine.max_elevation(&polygon).unwrap();
    assert!(hit.elevation_m >= fine_max);
    assert!(hit.resolution_m > 1000.0, "coarse answer carries coarse resolution");
}

#[test]
fn test_lookup_prefers_coarse_only_when_ready() {
    let engine = ElevationEngine::from_tile(sample_tile(), 3);
    assert!(!engine.coarse_ready());
    // Falls back to the fine tile before the build.
    assert_eq!(engine.lookup(47.955, 10.105, true), Some(1523));
    engine.build_coarse_now();
    // The peak dominates its whole coarse block afterwards.
    assert_eq!(engine.lookup(47.955, 10.105, true), Some(1523));
}

#[test]
fn test_feet_conversion_rounds_up() {
    assert_eq!(feet_ceil(100), 329);
    assert_eq!(feet_ceil(1523), 4997);
    assert_eq!(feet_ceil(0), 0);
    assert_eq!(feet_ceil(-10), -32);
}
