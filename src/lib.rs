//! colvis - collision detection visualizer
//!
//! This library provides the building blocks for a ROS 2 node that inspects a
//! robot self-collision detection subsystem: it decodes the XML payload
//! embedded in the subsystem's diagnostics, caches collision pairs and link
//! geometry, and republishes them as RViz markers and console text.

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

pub mod cache;
pub mod decoder;
pub mod model;
pub mod render;
pub mod ros_interface;

// Re-export commonly used items for easier access
pub use cache::CollisionCache;
pub use model::{Collision, GeomShape, Link, LinkGeometry};
pub use render::{MarkerSink, PoseSource, RenderLoop, RenderSettings};

use serde::{Deserialize, Serialize};

/// Runtime configuration for the visualizer node.
///
/// `subsystem_name` and `component_name` are required; everything else has a
/// default. The subsystem name selects the diagnostics topic
/// (`/{subsystem_name}/diag`), the component name selects the status value
/// that carries the collision payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColvisConfig {
    /// Subsystem whose diagnostics topic is consumed.
    pub subsystem_name: String,
    /// Diagnostic key of the collision detector component.
    pub component_name: String,
    /// ROS node name.
    #[serde(default = "default_node_name")]
    pub node_name: String,
    /// Topic the marker array is published on.
    #[serde(default = "default_marker_topic")]
    pub marker_topic: String,
    /// Frame the collision contact vectors are drawn in.
    #[serde(default = "default_fixed_frame")]
    pub fixed_frame: String,
    /// Frame the link geometry is drawn in; link poses are resolved
    /// against this frame.
    #[serde(default = "default_world_frame")]
    pub world_frame: String,
    /// Render loop cadence in Hz.
    #[serde(default = "default_render_rate_hz")]
    pub render_rate_hz: f64,
}

fn default_node_name() -> String {
    "col_det_vis".to_string()
}

fn default_marker_topic() -> String {
    "/collision_markers".to_string()
}

fn default_fixed_frame() -> String {
    "torso_base".to_string()
}

fn default_world_frame() -> String {
    "world".to_string()
}

fn default_render_rate_hz() -> f64 {
    10.0
}

impl ColvisConfig {
    /// Loads the configuration from a YAML file.
    ///
    /// A missing file or a missing required field is an error; the caller is
    /// expected to treat it as fatal before any ROS setup happens.
    pub fn load(path: &str) -> Result<Self, ColvisError> {
        let file = std::fs::File::open(path)
            .map_err(|e| ColvisError::Config(format!("cannot open {}: {}", path, e)))?;
        serde_yaml::from_reader(file)
            .map_err(|e| ColvisError::Config(format!("invalid config {}: {}", path, e)))
    }
}

/// Crate error type.
#[derive(Debug)]
pub enum ColvisError {
    /// Configuration file missing or invalid.
    Config(String),
    /// ROS layer failure (node, publisher, subscription or task setup).
    Ros(String),
    /// Malformed XML in a collision payload.
    XmlParse(String),
    /// A required attribute was absent from a payload element.
    MissingAttribute {
        /// The missing attribute name.
        attribute: &'static str,
        /// The element it was expected on.
        element: String,
    },
    /// An attribute value failed conversion.
    InvalidAttribute {
        /// The offending attribute name.
        attribute: &'static str,
        /// The element carrying it.
        element: String,
    },
}

impl ColvisError {
    pub(crate) fn missing_attribute(attribute: &'static str, element: &str) -> Self {
        ColvisError::MissingAttribute {
            attribute,
            element: element.to_string(),
        }
    }

    pub(crate) fn invalid_attribute(attribute: &'static str, element: &str) -> Self {
        ColvisError::InvalidAttribute {
            attribute,
            element: element.to_string(),
        }
    }
}

impl std::fmt::Display for ColvisError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ColvisError::Config(msg) => write!(f, "configuration error: {}", msg),
            ColvisError::Ros(msg) => write!(f, "ROS error: {}", msg),
            ColvisError::XmlParse(msg) => write!(f, "XML parse error: {}", msg),
            ColvisError::MissingAttribute { attribute, element } => {
                write!(f, "missing attribute '{}' on <{}>", attribute, element)
            }
            ColvisError::InvalidAttribute { attribute, element } => {
                write!(f, "invalid value for '{}' on <{}>", attribute, element)
            }
        }
    }
}

impl std::error::Error for ColvisError {}

impl From<r2r::Error> for ColvisError {
    fn from(e: r2r::Error) -> Self {
        ColvisError::Ros(e.to_string())
    }
}
