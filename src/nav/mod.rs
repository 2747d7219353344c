pub mod geodesy;
mod route;
mod waypoint;

pub use route::RouteError;
pub use route::WaypointManager;
pub use waypoint::Waypoint;

#[cfg(test)]
mod tests;
