//! PoseGraph - keyframe store shared between the graph manager and an
//! external optimizer.
//!
//! The graph keeps a monotonic clock. Every insertion and every pose update
//! stamps the touched keyframe with a fresh clock value, which is what local
//! map windows compare against to detect that a snapshot went stale.
//!
//! The graph itself is not synchronized; owners wrap it in a lock
//! (see [`SlidingWindowMapManager`](crate::mapping::SlidingWindowMapManager)).

use std::collections::HashMap;

use crate::cloud::PointCloud;
use crate::error::MapError;
use crate::geometry::SE3;

use super::keyframe::Keyframe;
use super::types::VertexId;

#[derive(Debug, Default)]
pub struct PoseGraph {
    keyframes: HashMap<VertexId, Keyframe>,
    /// Vertices in insertion order.
    order: Vec<VertexId>,
    next_id: u64,
    clock: u64,
}

impl PoseGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Insert a new keyframe and return its vertex.
    pub fn add_keyframe(
        &mut self,
        cloud: PointCloud,
        t_world_kf: SE3,
        timestamp_ns: u64,
    ) -> VertexId {
        let id = VertexId::new(self.next_id);
        self.next_id += 1;

        let stamp = self.tick();
        self.keyframes
            .insert(id, Keyframe::new(cloud, t_world_kf, stamp, timestamp_ns));
        self.order.push(id);
        id
    }

    /// Replace the optimized pose of a keyframe and bump its update time.
    pub fn update_pose(&mut self, v: VertexId, t_world_kf: SE3) -> Result<(), MapError> {
        let stamp = self.tick();
        let kf = self
            .keyframes
            .get_mut(&v)
            .ok_or(MapError::MissingVertex(v))?;
        kf.optimized_t_world_kf = t_world_kf;
        kf.update_time = stamp;
        Ok(())
    }

    /// Remove a keyframe. Windows still holding it will report it outdated.
    pub fn remove_keyframe(&mut self, v: VertexId) -> Option<Keyframe> {
        self.order.retain(|id| *id != v);
        self.keyframes.remove(&v)
    }

    pub fn keyframe(&self, v: VertexId) -> Option<&Keyframe> {
        self.keyframes.get(&v)
    }

    /// Like [`keyframe`](Self::keyframe) but with a typed error.
    pub fn get(&self, v: VertexId) -> Result<&Keyframe, MapError> {
        self.keyframes.get(&v).ok_or(MapError::MissingVertex(v))
    }

    pub fn contains(&self, v: VertexId) -> bool {
        self.keyframes.contains_key(&v)
    }

    /// Current update time of a vertex, `None` if it is gone.
    pub fn update_time(&self, v: VertexId) -> Option<u64> {
        self.keyframes.get(&v).map(|kf| kf.update_time)
    }

    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    /// Vertices in insertion order.
    pub fn vertices(&self) -> &[VertexId] {
        &self.order
    }

    pub fn last_vertex(&self) -> Option<VertexId> {
        self.order.last().copied()
    }
}
