// src/ros_interface/tf.rs

// Latest-value TF buffer. Keeps child frame -> (parent frame, transform)
// from /tf and /tf_static and resolves a link's pose by walking the parent
// chain up to the requested reference frame. No time travel: the original
// tool always queries the latest transform, so only the newest value per
// child frame is kept.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures::executor::LocalSpawner;
use futures::task::LocalSpawnExt;
use futures::StreamExt;
use log::info;
use nalgebra::{Isometry3, Quaternion, Translation3, UnitQuaternion};
use r2r::geometry_msgs::msg::Transform;
use r2r::tf2_msgs::msg::TFMessage;
use r2r::{Node, QosProfile};

use crate::render::PoseSource;
use crate::ColvisError;

/// Chain-walk cap; a longer chain is treated as unresolvable.
const MAX_CHAIN_DEPTH: usize = 64;

struct FrameEntry {
    parent: String,
    t_parent_child: Isometry3<f64>,
}

/// Buffer of the latest transform per child frame.
pub struct TfBuffer {
    frames: Mutex<HashMap<String, FrameEntry>>,
}

impl TfBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        TfBuffer {
            frames: Mutex::new(HashMap::new()),
        }
    }

    /// Records the transforms of one TF message, newest wins per child frame.
    pub fn update(&self, msg: &TFMessage) {
        let mut frames = self.frames.lock().expect("tf buffer poisoned");
        for t in &msg.transforms {
            frames.insert(
                t.child_frame_id.clone(),
                FrameEntry {
                    parent: t.header.frame_id.clone(),
                    t_parent_child: isometry_from(&t.transform),
                },
            );
        }
    }

    /// Number of frames currently buffered.
    pub fn frame_count(&self) -> usize {
        self.frames.lock().expect("tf buffer poisoned").len()
    }
}

impl Default for TfBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl PoseSource for TfBuffer {
    fn lookup_pose(&self, target_frame: &str, source_frame: &str) -> Option<Isometry3<f64>> {
        if target_frame == source_frame {
            return Some(Isometry3::identity());
        }

        let frames = self.frames.lock().expect("tf buffer poisoned");
        let mut acc = Isometry3::identity();
        let mut current = source_frame;
        for _ in 0..MAX_CHAIN_DEPTH {
            let entry = frames.get(current)?;
            acc = entry.t_parent_child * acc;
            if entry.parent == target_frame {
                return Some(acc);
            }
            current = entry.parent.as_str();
        }
        None
    }
}

fn isometry_from(t: &Transform) -> Isometry3<f64> {
    Isometry3::from_parts(
        Translation3::new(t.translation.x, t.translation.y, t.translation.z),
        UnitQuaternion::from_quaternion(Quaternion::new(
            t.rotation.w,
            t.rotation.x,
            t.rotation.y,
            t.rotation.z,
        )),
    )
}

/// Subscribes to `/tf` and `/tf_static` and spawns the tasks feeding the
/// buffer. Static transforms use a transient-local subscription so latched
/// publishers are picked up.
pub fn spawn_tf_listener(
    node: &mut Node,
    spawner: &LocalSpawner,
    buffer: Arc<TfBuffer>,
) -> Result<(), ColvisError> {
    let dynamic = node.subscribe::<TFMessage>("/tf", QosProfile::default())?;
    let latched = node.subscribe::<TFMessage>("/tf_static", QosProfile::default().transient_local())?;

    let buf = buffer.clone();
    spawner
        .spawn_local(async move {
            dynamic
                .for_each(|msg| {
                    buf.update(&msg);
                    futures::future::ready(())
                })
                .await;
        })
        .map_err(|e| ColvisError::Ros(format!("tf task: {}", e)))?;

    let buf = buffer;
    spawner
        .spawn_local(async move {
            latched
                .for_each(|msg| {
                    buf.update(&msg);
                    futures::future::ready(())
                })
                .await;
        })
        .map_err(|e| ColvisError::Ros(format!("tf_static task: {}", e)))?;

    info!("listening on /tf and /tf_static");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use r2r::geometry_msgs::msg::TransformStamped;

    fn transform(parent: &str, child: &str, x: f64, y: f64, z: f64) -> TransformStamped {
        let mut t = TransformStamped::default();
        t.header.frame_id = parent.to_string();
        t.child_frame_id = child.to_string();
        t.transform.translation.x = x;
        t.transform.translation.y = y;
        t.transform.translation.z = z;
        t.transform.rotation.w = 1.0;
        t
    }

    fn message(transforms: Vec<TransformStamped>) -> TFMessage {
        TFMessage { transforms }
    }

    #[test]
    fn same_frame_is_identity() {
        let buffer = TfBuffer::new();
        let pose = buffer.lookup_pose("world", "world").unwrap();
        assert_relative_eq!(pose.translation.vector.norm(), 0.0);
    }

    #[test]
    fn unknown_frame_is_not_available() {
        let buffer = TfBuffer::new();
        assert!(buffer.lookup_pose("world", "torso").is_none());
    }

    #[test]
    fn composes_the_parent_chain() {
        let buffer = TfBuffer::new();
        buffer.update(&message(vec![
            transform("world", "base", 1.0, 0.0, 0.0),
            transform("base", "torso", 0.0, 2.0, 0.0),
        ]));

        let pose = buffer.lookup_pose("world", "torso").unwrap();
        assert_relative_eq!(pose.translation.x, 1.0);
        assert_relative_eq!(pose.translation.y, 2.0);
    }

    #[test]
    fn broken_chain_is_not_available() {
        let buffer = TfBuffer::new();
        buffer.update(&message(vec![transform("base", "torso", 0.0, 2.0, 0.0)]));
        assert!(buffer.lookup_pose("world", "torso").is_none());
    }

    #[test]
    fn newest_transform_wins() {
        let buffer = TfBuffer::new();
        buffer.update(&message(vec![transform("world", "base", 1.0, 0.0, 0.0)]));
        buffer.update(&message(vec![transform("world", "base", 3.0, 0.0, 0.0)]));

        let pose = buffer.lookup_pose("world", "base").unwrap();
        assert_relative_eq!(pose.translation.x, 3.0);
        assert_eq!(buffer.frame_count(), 1);
    }

    #[test]
    fn cyclic_frames_do_not_hang() {
        let buffer = TfBuffer::new();
        buffer.update(&message(vec![
            transform("b", "a", 0.0, 0.0, 0.0),
            transform("a", "b", 0.0, 0.0, 0.0),
        ]));
        assert!(buffer.lookup_pose("world", "a").is_none());
    }
}
