// src/ros_interface/publisher.rs

// MarkerSink backed by a visualization_msgs/MarkerArray publisher. Every call
// publishes one array; erasure publishes one DELETE marker per id in range.

use nalgebra::{Isometry3, Point3, Vector3};
use r2r::builtin_interfaces::msg::Time;
use r2r::geometry_msgs::msg::{
    Point as PointMsg, Pose as PoseMsg, Quaternion as QuaternionMsg, Vector3 as Vector3Msg,
};
use r2r::std_msgs::msg::{ColorRGBA, Header};
use r2r::visualization_msgs::msg::{Marker, MarkerArray};
use r2r::{Clock, ClockType, Node, QosProfile};

use crate::render::{MarkerShape, MarkerSink, Rgba};
use crate::ColvisError;

// visualization_msgs/Marker type and action values.
const MARKER_ARROW: i32 = 0;
const MARKER_SPHERE: i32 = 2;
const MARKER_CYLINDER: i32 = 3;
const ACTION_ADD: i32 = 0;
const ACTION_DELETE: i32 = 2;

/// Publishes RViz markers for the render loop.
pub struct MarkerPublisher {
    publisher: r2r::Publisher<MarkerArray>,
}

impl MarkerPublisher {
    /// Creates the marker publisher on the given topic.
    pub fn new(node: &mut Node, topic: &str) -> Result<Self, ColvisError> {
        let publisher = node.create_publisher::<MarkerArray>(topic, QosProfile::default())?;
        Ok(MarkerPublisher { publisher })
    }

    /// Current ROS time; one stamp is shared by every marker of a batch.
    fn stamp(&self) -> Time {
        match Clock::create(ClockType::RosTime).and_then(|mut clock| clock.get_now()) {
            Ok(now) => Clock::to_builtin_time(&now),
            Err(_) => Time::default(),
        }
    }

    fn base_marker(&self, id: i32, frame: &str, ns: &str, stamp: &Time) -> Marker {
        Marker {
            header: Header {
                stamp: stamp.clone(),
                frame_id: frame.to_string(),
            },
            ns: ns.to_string(),
            id,
            action: ACTION_ADD,
            ..Marker::default()
        }
    }

    fn publish(&self, markers: Vec<Marker>) -> Result<(), ColvisError> {
        self.publisher.publish(&MarkerArray { markers })?;
        Ok(())
    }
}

impl MarkerSink for MarkerPublisher {
    fn publish_vector(
        &self,
        id: i32,
        from: Point3<f64>,
        to: Point3<f64>,
        width: f64,
        color: Rgba,
        frame: &str,
        ns: &str,
    ) -> Result<(), ColvisError> {
        let stamp = self.stamp();
        let marker = Marker {
            type_: MARKER_ARROW,
            pose: pose_msg(&Isometry3::identity()),
            points: vec![point_msg(from), point_msg(to)],
            // Arrow scale: shaft diameter, head diameter, head length (auto).
            scale: Vector3Msg {
                x: width,
                y: width * 2.0,
                z: 0.0,
            },
            color: color_msg(color),
            ..self.base_marker(id, frame, ns, &stamp)
        };
        self.publish(vec![marker])
    }

    fn publish_shape(
        &self,
        id: i32,
        shape: MarkerShape,
        pose: Isometry3<f64>,
        scale: Vector3<f64>,
        color: Rgba,
        frame: &str,
        ns: &str,
    ) -> Result<(), ColvisError> {
        let stamp = self.stamp();
        let marker = Marker {
            type_: match shape {
                MarkerShape::Sphere => MARKER_SPHERE,
                MarkerShape::Cylinder => MARKER_CYLINDER,
            },
            pose: pose_msg(&pose),
            scale: Vector3Msg {
                x: scale.x,
                y: scale.y,
                z: scale.z,
            },
            color: color_msg(color),
            ..self.base_marker(id, frame, ns, &stamp)
        };
        self.publish(vec![marker])
    }

    fn erase_range(
        &self,
        first: i32,
        last: i32,
        frame: &str,
        ns: &str,
    ) -> Result<(), ColvisError> {
        if first > last {
            return Ok(());
        }
        let stamp = self.stamp();
        let markers = (first..=last)
            .map(|id| Marker {
                action: ACTION_DELETE,
                ..self.base_marker(id, frame, ns, &stamp)
            })
            .collect();
        self.publish(markers)
    }
}

fn point_msg(p: Point3<f64>) -> PointMsg {
    PointMsg {
        x: p.x,
        y: p.y,
        z: p.z,
    }
}

fn pose_msg(iso: &Isometry3<f64>) -> PoseMsg {
    let q = iso.rotation.quaternion();
    PoseMsg {
        position: PointMsg {
            x: iso.translation.x,
            y: iso.translation.y,
            z: iso.translation.z,
        },
        orientation: QuaternionMsg {
            x: q.coords.x,
            y: q.coords.y,
            z: q.coords.z,
            w: q.coords.w,
        },
    }
}

fn color_msg(c: Rgba) -> ColorRGBA {
    ColorRGBA {
        r: c.r,
        g: c.g,
        b: c.b,
        a: c.a,
    }
}
