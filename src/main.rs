#![allow(dead_code, clippy::similar_names)]
#![warn(clippy::shadow_reuse, clippy::shadow_same, clippy::builtin_type_shadow)]
mod control;
mod elevation;
mod logger;
mod nav;
mod provider;

use crate::control::config::ControlConfig;
use crate::control::{Autopilot, ParamsSnapshot};
use crate::elevation::ElevationEngine;
use crate::nav::WaypointManager;
use crate::provider::BridgeProvider;
use std::collections::BTreeMap;
use std::{env, sync::Arc};
use tokio::sync::RwLock;

/// Downsample exponent of the background coarse elevation tile.
const COARSE_TILE_SCALE: u32 = 4;

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() {
    let base_url_var = env::var("TERRAPILOT_BRIDGE_URL");
    let base_url = base_url_var.as_ref().map_or("http://localhost:9330", |v| v.as_str());
    let ap = init(base_url).await;

    let mut params = ap.read().await.subscribe();
    tokio::spawn(async move {
        while params.changed().await.is_ok() {
            let snapshot: ParamsSnapshot = params.borrow_and_update().clone();
            log!("Parameters changed: {} waypoints", snapshot.waypoints.len());
        }
    });

    if env::var("TERRAPILOT_AUTOSTART").is_ok() {
        let engage = BTreeMap::from([(String::from("master"), control::modes::ModeValue::On)]);
        if let Err(err) = Autopilot::set_parameters(&ap, &engage).await {
            error!("Autostart rejected: {err}");
        }
    } else {
        info!("Idle; waiting for an operator to engage MASTER");
    }

    tokio::signal::ctrl_c().await.ok();
    let cancel = ap.read().await.cancel_token();
    cancel.cancel();
    info!("Shutting down");
}

async fn init(url: &str) -> Arc<RwLock<Autopilot>> {
    let config = Arc::new(ControlConfig::load());
    let provider = Arc::new(BridgeProvider::new(url));

    let engine = match env::var("TERRAPILOT_TILE") {
        Ok(tile_path) => match ElevationEngine::load(&tile_path, COARSE_TILE_SCALE).await {
            Ok(engine) => {
                engine.spawn_coarse_build();
                Some(Arc::new(engine))
            }
            Err(err) => {
                // No terrain answers, but the autopilot still flies.
                error!("Elevation tile unavailable: {err}");
                None
            }
        },
        Err(_) => {
            info!("No elevation tile configured");
            None
        }
    };

    let route = WaypointManager::new(config.route.clone(), engine);
    Arc::new(RwLock::new(Autopilot::new(provider, config, route)))
}
