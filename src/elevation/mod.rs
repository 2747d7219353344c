mod engine;
mod raster;
mod tile;
mod transform;

pub use engine::ElevationEngine;
pub use engine::MaxElevation;
pub use engine::feet_ceil;
pub use tile::DecodeError;
pub use tile::ElevationTile;
pub use tile::NO_DATA;
pub use transform::GeoTransform;

#[cfg(test)]
mod tests;
