// src/render/mod.rs

// Fixed-rate render loop. Every cycle snapshots the cache, draws one arrow
// marker per collision pair, erases the stale remainder of the collision id
// range, then draws the cached link geometry at poses resolved through the
// PoseSource. All outside contact goes through the PoseSource and MarkerSink
// traits so the loop can run against test doubles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error};
use nalgebra::{Isometry3, Point3, Translation3, Vector3};

use crate::cache::CollisionCache;
use crate::model::GeomShape;
use crate::{ColvisConfig, ColvisError};

/// Highest marker id the collision pass may occupy; ids in
/// `[drawn, COLLISION_MARKER_ID_MAX]` are erased every cycle.
pub const COLLISION_MARKER_ID_MAX: i32 = 200;

/// First marker id of the geometry pass, regardless of collision count.
pub const GEOMETRY_MARKER_ID_START: i32 = 201;

/// Namespace of the collision contact vector markers.
pub const COLLISION_NS: &str = "default";

/// Namespace of the link geometry markers.
pub const GEOMETRY_NS: &str = "collision";

/// Shaft width of the collision contact vectors.
const COLLISION_VECTOR_WIDTH: f64 = 0.01;

const COLLISION_COLOR: Rgba = Rgba {
    r: 1.0,
    g: 0.0,
    b: 0.0,
    a: 1.0,
};

const GEOMETRY_COLOR: Rgba = Rgba {
    r: 0.0,
    g: 1.0,
    b: 0.0,
    a: 0.5,
};

/// Marker color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    /// Red channel, 0..=1.
    pub r: f32,
    /// Green channel, 0..=1.
    pub g: f32,
    /// Blue channel, 0..=1.
    pub b: f32,
    /// Alpha channel, 0..=1.
    pub a: f32,
}

/// Shape of a posed marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerShape {
    /// Sphere; scale holds the diameters.
    Sphere,
    /// Cylinder along local Z; scale holds the diameters and the height.
    Cylinder,
}

/// Resolves link poses against a reference frame.
///
/// `None` means the transform is not available yet; the caller skips the link
/// and retries naturally on its next cycle.
pub trait PoseSource {
    /// Pose of `source_frame` expressed in `target_frame`, latest available.
    fn lookup_pose(&self, target_frame: &str, source_frame: &str) -> Option<Isometry3<f64>>;
}

impl<T: PoseSource> PoseSource for Arc<T> {
    fn lookup_pose(&self, target_frame: &str, source_frame: &str) -> Option<Isometry3<f64>> {
        (**self).lookup_pose(target_frame, source_frame)
    }
}

/// Sink for visualization markers.
pub trait MarkerSink {
    /// Draws an arrow marker from `from` to `to`.
    #[allow(clippy::too_many_arguments)]
    fn publish_vector(
        &self,
        id: i32,
        from: Point3<f64>,
        to: Point3<f64>,
        width: f64,
        color: Rgba,
        frame: &str,
        ns: &str,
    ) -> Result<(), ColvisError>;

    /// Draws a posed shape marker.
    #[allow(clippy::too_many_arguments)]
    fn publish_shape(
        &self,
        id: i32,
        shape: MarkerShape,
        pose: Isometry3<f64>,
        scale: Vector3<f64>,
        color: Rgba,
        frame: &str,
        ns: &str,
    ) -> Result<(), ColvisError>;

    /// Erases every marker with id in `[first, last]`. A range with
    /// `first > last` is a no-op.
    fn erase_range(&self, first: i32, last: i32, frame: &str, ns: &str)
        -> Result<(), ColvisError>;
}

/// Frames and cadence of the render loop.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    /// Frame the collision contact vectors are drawn in.
    pub fixed_frame: String,
    /// Frame link poses are resolved against and geometry is drawn in.
    pub world_frame: String,
    /// Cycle rate in Hz.
    pub rate_hz: f64,
}

impl RenderSettings {
    /// Extracts the render settings from the node configuration.
    pub fn from_config(config: &ColvisConfig) -> Self {
        RenderSettings {
            fixed_frame: config.fixed_frame.clone(),
            world_frame: config.world_frame.clone(),
            rate_hz: config.render_rate_hz,
        }
    }
}

/// Counters from one render cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    /// Collision vector markers drawn.
    pub collisions: usize,
    /// Geometry shape markers drawn.
    pub shapes: usize,
    /// Links skipped because their pose was not resolvable.
    pub skipped_links: usize,
}

/// The fixed-rate visualization loop.
pub struct RenderLoop<P, M> {
    cache: Arc<CollisionCache>,
    poses: P,
    markers: M,
    settings: RenderSettings,
}

impl<P: PoseSource, M: MarkerSink> RenderLoop<P, M> {
    /// Creates a loop over the given cache and capability implementations.
    pub fn new(cache: Arc<CollisionCache>, poses: P, markers: M, settings: RenderSettings) -> Self {
        RenderLoop {
            cache,
            poses,
            markers,
            settings,
        }
    }

    /// Runs cycles until `running` clears. A failed cycle is logged and the
    /// loop continues with the next one.
    pub fn run(&self, running: &AtomicBool) {
        let rate = self.settings.rate_hz.max(0.1);
        let period = Duration::from_secs_f64(1.0 / rate);

        while running.load(Ordering::SeqCst) {
            let start = Instant::now();
            match self.render_cycle() {
                Ok(stats) => debug!(
                    "cycle: {} collisions, {} geometry markers, {} links without pose",
                    stats.collisions, stats.shapes, stats.skipped_links
                ),
                Err(e) => error!("render cycle failed: {}", e),
            }
            if let Some(rest) = period.checked_sub(start.elapsed()) {
                std::thread::sleep(rest);
            }
        }
    }

    /// Runs one render pass over the current cache snapshot.
    pub fn render_cycle(&self) -> Result<CycleStats, ColvisError> {
        let (collisions, links) = self.cache.snapshot();
        let fixed = &self.settings.fixed_frame;
        let world = &self.settings.world_frame;

        // Collision pass: ids 0..N, then erase the stale rest of the range.
        let mut id: i32 = 0;
        if !collisions.is_empty() {
            println!("collisions:");
        }
        for c in collisions.iter() {
            self.markers.publish_vector(
                id,
                c.p1,
                c.p2,
                COLLISION_VECTOR_WIDTH,
                COLLISION_COLOR,
                fixed,
                COLLISION_NS,
            )?;
            id += 1;
            // Print only pairs whose both indices are known.
            if let (Some(l1), Some(l2)) = (links.get(&c.i1), links.get(&c.i2)) {
                println!("    {} {} {}", l1.name, l2.name, c.dist);
            }
        }
        self.markers
            .erase_range(id, COLLISION_MARKER_ID_MAX, fixed, COLLISION_NS)?;

        // Geometry pass: ids from 201 up; this range is never erased.
        let mut shapes = 0usize;
        let mut skipped = 0usize;
        let mut id = GEOMETRY_MARKER_ID_START;
        for link in links.values() {
            let Some(t_world_link) = self.poses.lookup_pose(world, &link.name) else {
                debug!("no transform {} -> {} yet", world, link.name);
                skipped += 1;
                continue;
            };
            for geom in &link.geoms {
                let pose = t_world_link * geom.origin;
                match geom.shape {
                    GeomShape::Sphere { radius } => {
                        let d = radius * 2.0;
                        self.markers.publish_shape(
                            id,
                            MarkerShape::Sphere,
                            pose,
                            Vector3::new(d, d, d),
                            GEOMETRY_COLOR,
                            world,
                            GEOMETRY_NS,
                        )?;
                        id += 1;
                        shapes += 1;
                    }
                    GeomShape::Capsule { radius, length } => {
                        let d = radius * 2.0;
                        let cap_scale = Vector3::new(d, d, d);
                        for z in [-length / 2.0, length / 2.0] {
                            let cap_pose = pose * Translation3::new(0.0, 0.0, z);
                            self.markers.publish_shape(
                                id,
                                MarkerShape::Sphere,
                                cap_pose,
                                cap_scale,
                                GEOMETRY_COLOR,
                                world,
                                GEOMETRY_NS,
                            )?;
                            id += 1;
                            shapes += 1;
                        }
                        self.markers.publish_shape(
                            id,
                            MarkerShape::Cylinder,
                            pose,
                            Vector3::new(d, d, length),
                            GEOMETRY_COLOR,
                            world,
                            GEOMETRY_NS,
                        )?;
                        id += 1;
                        shapes += 1;
                    }
                }
            }
        }

        Ok(CycleStats {
            collisions: collisions.len(),
            shapes,
            skipped_links: skipped,
        })
    }
}
