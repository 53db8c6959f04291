// src/cache/mod.rs

// Shared state between the diagnostics callback and the render loop: the
// latest collision list and the accumulated link geometry, behind one mutex.
// Decode work happens outside the lock; the lock is held only to swap the
// collision list, merge new links, or take a shallow snapshot.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::model::{Collision, Link};

/// Snapshot handed to the render loop: the collision list and the link map,
/// both cheap Arc clones of the cached state.
pub type Snapshot = (Arc<Vec<Collision>>, HashMap<u32, Arc<Link>>);

struct CacheState {
    collisions: Arc<Vec<Collision>>,
    links: HashMap<u32, Arc<Link>>,
}

/// Mutex-guarded holder of the decoded collision state.
///
/// The collision list is replaced wholesale on every update. The link map is
/// additive: a link index, once inserted, keeps its original geometry for the
/// life of the process even if later payloads carry different values.
pub struct CollisionCache {
    inner: Mutex<CacheState>,
}

impl CollisionCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        CollisionCache {
            inner: Mutex::new(CacheState {
                collisions: Arc::new(Vec::new()),
                links: HashMap::new(),
            }),
        }
    }

    /// Applies one decoded update: swaps the collision list in and merges
    /// links, inserting only indices not already present.
    pub fn apply_update(&self, collisions: Vec<Collision>, links: Vec<Link>) {
        let collisions = Arc::new(collisions);
        let mut state = self.inner.lock().expect("collision cache poisoned");
        state.collisions = collisions;
        for link in links {
            state
                .links
                .entry(link.idx)
                .or_insert_with(|| Arc::new(link));
        }
    }

    /// Takes a shallow copy of the current state.
    pub fn snapshot(&self) -> Snapshot {
        let state = self.inner.lock().expect("collision cache poisoned");
        (state.collisions.clone(), state.links.clone())
    }

    /// Number of links currently cached.
    pub fn link_count(&self) -> usize {
        self.inner
            .lock()
            .expect("collision cache poisoned")
            .links
            .len()
    }
}

impl Default for CollisionCache {
    fn default() -> Self {
        Self::new()
    }
}
