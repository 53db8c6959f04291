// src/model/mod.rs

// Decoded collision state as reported by the collision detector component.
// A payload carries the currently active collision pairs plus the collision
// geometry of every link it has ever mentioned; the pairs are transient, the
// geometry is cached for the life of the process.

use nalgebra::{Isometry3, Point3, Vector3};

/// One reported collision (or near-collision) between two links.
///
/// `i1`/`i2` index into the link map but are not guaranteed to resolve there;
/// consumers skip a pair whose indices are unknown.
#[derive(Debug, Clone, PartialEq)]
pub struct Collision {
    /// Index of the first link.
    pub i1: u32,
    /// Index of the second link.
    pub i2: u32,
    /// Contact point on the first link.
    pub p1: Point3<f64>,
    /// Contact point on the second link.
    pub p2: Point3<f64>,
    /// Signed distance: negative for penetration, positive for clearance.
    pub dist: f64,
    /// Contact normal on the first link.
    pub n1: Vector3<f64>,
    /// Contact normal on the second link.
    pub n2: Vector3<f64>,
}

/// A robot link and its collision geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    /// Link index used by collision records.
    pub idx: u32,
    /// Link (TF frame) name.
    pub name: String,
    /// Collision primitives attached to the link.
    pub geoms: Vec<LinkGeometry>,
}

/// One collision primitive, posed in its owning link's frame.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkGeometry {
    /// Shape of the primitive.
    pub shape: GeomShape,
    /// Pose of the primitive relative to the link frame.
    pub origin: Isometry3<f64>,
}

/// Supported collision primitive shapes.
///
/// The detector also reports convex meshes, triangles and octomaps; those
/// carry no drawable parameters here and are dropped at decode time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeomShape {
    /// Sphere of the given radius.
    Sphere {
        /// Sphere radius in meters.
        radius: f64,
    },
    /// Capsule: a cylinder of the given length capped by two hemispheres,
    /// extending along the local Z axis.
    Capsule {
        /// Capsule radius in meters.
        radius: f64,
        /// Length of the cylindrical section in meters.
        length: f64,
    },
}
