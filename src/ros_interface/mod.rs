//! ROS 2 edges of the visualizer
//!
//! This module owns all contact with the middleware:
//! - the diagnostics subscription feeding the collision cache,
//! - the TF buffer backing pose lookups,
//! - the RViz marker publisher.
//!
//! Everything here is wired onto one node whose executor is driven by the
//! main thread; the render loop talks to these edges only through the
//! `PoseSource` and `MarkerSink` traits.

mod publisher;
mod subscriber;
mod tf;

pub use publisher::MarkerPublisher;
pub use subscriber::spawn_diag_listener;
pub use tf::{spawn_tf_listener, TfBuffer};

/// Diagnostics topic of a subsystem.
pub fn diag_topic(subsystem_name: &str) -> String {
    format!("/{}/diag", subsystem_name)
}
