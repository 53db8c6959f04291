// src/main.rs
// Entry point for the collision detection visualizer node.
//
// Wires the diagnostics subscriber, the TF buffer and the marker publisher
// onto one ROS 2 node, then runs the render loop on its own thread while the
// main thread drives the node executor until shutdown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::executor::LocalPool;
use log::{error, info};
use r2r::{Context, Node};

use colvis::ros_interface::{spawn_diag_listener, spawn_tf_listener, MarkerPublisher, TfBuffer};
use colvis::{CollisionCache, ColvisConfig, ColvisError, RenderLoop, RenderSettings};

fn main() {
    env_logger::init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "colvis.yaml".to_string());
    let config = match ColvisConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(config: ColvisConfig) -> Result<(), ColvisError> {
    let ctx = Context::create()?;
    let mut node = Node::create(ctx, &config.node_name, "")?;
    info!("node '{}' created", config.node_name);

    let cache = Arc::new(CollisionCache::new());
    let tf = Arc::new(TfBuffer::new());

    let mut pool = LocalPool::new();
    let spawner = pool.spawner();
    spawn_diag_listener(
        &mut node,
        &spawner,
        &config.subsystem_name,
        &config.component_name,
        cache.clone(),
    )?;
    spawn_tf_listener(&mut node, &spawner, tf.clone())?;

    let markers = MarkerPublisher::new(&mut node, &config.marker_topic)?;
    info!("publishing markers on {}", config.marker_topic);

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || running.store(false, Ordering::SeqCst))
            .map_err(|e| ColvisError::Ros(format!("signal handler: {}", e)))?;
    }

    let settings = RenderSettings::from_config(&config);
    let render_thread = {
        let cache = cache.clone();
        let running = running.clone();
        std::thread::Builder::new()
            .name("render".into())
            .spawn(move || {
                RenderLoop::new(cache, tf, markers, settings).run(&running);
            })
            .map_err(|e| ColvisError::Ros(format!("render thread: {}", e)))?
    };

    // Drive the subscriptions until the shutdown signal.
    while running.load(Ordering::SeqCst) {
        node.spin_once(Duration::from_millis(100));
        pool.run_until_stalled();
    }

    info!("shutting down");
    if render_thread.join().is_err() {
        error!("render thread panicked");
    }

    Ok(())
}
