use super::geodesy::GeoPoint;
use super::route::{RouteError, WaypointManager};
use crate::control::config::RouteConfig;
use crate::control::modes::{ApMode, ModeRegistry};
use crate::elevation::{ElevationEngine, ElevationTile, GeoTransform};
use std::sync::Arc;

fn manager() -> WaypointManager {
    WaypointManager::new(RouteConfig::default(), None)
}

/// 32x32 flat tile at 100 m anchored at (1 N, -0.16 E) with 0.01 deg
/// pixels, covering the equator route used below, with a 910 m ridge
/// column near 0.5 E.
fn terrain_manager() -> WaypointManager {
    let (w, h) = (128u32, 32u32);
    let mut pixels = vec![100i16; (w * h) as usize];
    for y in 0..h {
        for x in 64..67u32 {
            pixels[(y * w + x) as usize] = 910;
        }
    }
    let transform =
        GeoTransform::from_tags(&[0.01, 0.01, 0.0], &[0.0, 0.0, 0.0, -0.16, 0.16, 0.0]).unwrap();
    let tile = ElevationTile::from_parts(w, h, pixels, transform);
    WaypointManager::new(RouteConfig::default(), Some(Arc::new(ElevationEngine::from_tile(tile, 3))))
}

#[test]
fn test_resequence_links_follow_insertion_order() {
    let mut mgr = manager();
    let a = mgr.add(0.0, 0.0, None);
    let b = mgr.add(0.0, 1.0, Some(3500.0));
    let c = mgr.add(1.0, 1.0, None);
    let wps = mgr.waypoints();
    assert_eq!(wps.len(), 3);
    assert_eq!(wps[0].next(), Some(b));
    assert_eq!(wps[1].next(), Some(c));
    assert_eq!(wps[2].next(), None);
    assert_eq!(mgr.current_id(), Some(a));
    assert!(wps[0].is_active());
    assert!(!wps[1].is_active());
    let leg = wps[0].dist_next_nm().unwrap();
    assert!((leg - 60.0).abs() < 0.2);
    assert!((wps[0].heading_next().unwrap() - 90.0).abs() < 1e-6);
}

#[test]
fn test_arrival_advances_to_next() {
    let mut mgr = manager();
    let a = mgr.add(0.0, 0.0, None);
    let b = mgr.add(0.0, 1.0, None);
    mgr.check_transition(GeoPoint::new(0.0, 0.0005));
    let wps = mgr.waypoints();
    assert!(wps.iter().find(|w| w.id() == a).unwrap().is_completed());
    assert_eq!(mgr.current_id(), Some(b));
    assert!(wps.iter().find(|w| w.id() == b).unwrap().is_active());
}

#[test]
fn test_arrival_outside_threshold_is_ignored() {
    let mut mgr = manager();
    let a = mgr.add(0.0, 0.0, None);
    mgr.add(0.0, 1.0, None);
    mgr.check_transition(GeoPoint::new(0.0, 0.5));
    assert_eq!(mgr.current_id(), Some(a));
    assert!(!mgr.waypoints()[0].is_completed());
}

#[test]
fn test_exhausted_route_repeats_from_first() {
    let mut mgr = manager();
    let a = mgr.add(0.0, 0.0, None);
    let b = mgr.add(0.0, 1.0, None);
    assert!(mgr.toggle_repeating());
    mgr.check_transition(GeoPoint::new(0.0, 0.0));
    assert_eq!(mgr.current_id(), Some(b));
    mgr.check_transition(GeoPoint::new(0.0, 1.0));
    // Wrapped around: first waypoint re-activated, completions cleared.
    assert_eq!(mgr.current_id(), Some(a));
    let wps = mgr.waypoints();
    assert!(wps.iter().all(|w| !w.is_completed()));
    assert!(wps[0].is_active());
}

#[test]
fn test_exhausted_route_without_repeat_clears_current() {
    let mut mgr = manager();
    mgr.add(0.0, 0.0, None);
    mgr.check_transition(GeoPoint::new(0.0, 0.0));
    assert_eq!(mgr.current_id(), None);
}

#[test]
fn test_split_inserts_midpoint() {
    let mut mgr = manager();
    let a = mgr.add(0.0, 0.0, None);
    let b = mgr.add(0.0, 2.0, None);
    let mid = mgr.split(a).unwrap();
    let wps = mgr.waypoints();
    assert_eq!(wps.len(), 3);
    assert_eq!(wps[1].id(), mid);
    assert_eq!(wps[0].next(), Some(mid));
    assert_eq!(wps[1].next(), Some(b));
    assert!(wps[1].position().lat().abs() < 1e-6);
    assert!((wps[1].position().lon() - 1.0).abs() < 1e-6);
}

#[test]
fn test_split_without_leg_is_rejected() {
    let mut mgr = manager();
    let a = mgr.add(0.0, 0.0, None);
    assert_eq!(mgr.split(a), Err(RouteError::NoLeg(a)));
    assert_eq!(mgr.split(99), Err(RouteError::UnknownWaypoint(99)));
}

#[test]
fn test_remove_current_advances_to_successor() {
    let mut mgr = manager();
    let a = mgr.add(0.0, 0.0, None);
    let b = mgr.add(0.0, 1.0, None);
    mgr.remove(a).unwrap();
    assert_eq!(mgr.current_id(), Some(b));
    assert_eq!(mgr.waypoints().len(), 1);
    assert_eq!(mgr.remove(a), Err(RouteError::UnknownWaypoint(a)));
}

#[test]
fn test_reset_drops_route() {
    let mut mgr = manager();
    mgr.add(0.0, 0.0, None);
    mgr.add(0.0, 1.0, None);
    mgr.reset();
    assert!(mgr.waypoints().is_empty());
    assert_eq!(mgr.current_id(), None);
}

#[test]
fn test_target_heading_applies_declination_and_updates_registry() {
    let mut mgr = manager();
    mgr.add(1.0, 0.0, None);
    let mut modes = ModeRegistry::new();
    let heading = mgr.target_heading(GeoPoint::new(0.0, 0.0), 2.0, &mut modes).unwrap();
    assert!((heading - 358.0).abs() < 1e-6);
    assert!((modes.target(ApMode::Heading).unwrap() - 358.0).abs() < 1e-6);
}

#[test]
fn test_target_altitude_pushes_waypoint_altitude() {
    let mut mgr = manager();
    mgr.add(0.0, 0.0, Some(4500.0));
    let mut modes = ModeRegistry::new();
    assert_eq!(mgr.target_altitude(&mut modes), Some(4500.0));
    assert_eq!(modes.target(ApMode::AltitudeHold), Some(4500.0));
    mgr.set_elevation(mgr.current_id().unwrap(), None).unwrap();
    assert_eq!(mgr.target_altitude(&mut modes), None);
}

#[test]
fn test_leg_elevation_precompute_and_lookahead() {
    let mut mgr = terrain_manager();
    mgr.add(0.0, 0.0, None);
    mgr.add(0.0, 1.0, None);
    let wps = mgr.waypoints();
    // The ridge column sits under the leg around 0.48..0.51 E.
    assert_eq!(wps[0].leg_max_elevation_m(), Some(910));
    assert_eq!(wps[1].leg_max_elevation_m(), None);

    // Advance so the current leg runs towards (0, 1), over the ridge.
    mgr.check_transition(GeoPoint::new(0.0, 0.0));
    let hit = mgr.max_elevation_ahead(GeoPoint::new(0.0, 0.1), 90.0, 60.0, 0.0).unwrap();
    assert_eq!(hit.elevation_m, 910);
}

#[test]
fn test_lookahead_cone_without_route() {
    let mgr = terrain_manager();
    let hit = mgr.max_elevation_ahead(GeoPoint::new(0.0, 0.1), 90.0, 40.0, 0.0).unwrap();
    assert_eq!(hit.elevation_m, 910, "cone towards the ridge");
    let away = mgr.max_elevation_ahead(GeoPoint::new(0.0, 0.1), 270.0, 10.0, 0.0).unwrap();
    assert_eq!(away.elevation_m, 100, "cone away from the ridge sees flat ground");
}

#[test]
fn test_waypoints_snapshot_is_a_copy() {
    let mut mgr = manager();
    mgr.add(0.0, 0.0, None);
    let mut snapshot = mgr.waypoints();
    snapshot.clear();
    assert_eq!(mgr.waypoints().len(), 1);
}
