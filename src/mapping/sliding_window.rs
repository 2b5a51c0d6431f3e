//! Sliding-window graph manager.
//!
//! Keeps the last `window_capacity` keyframes as the local map. A new
//! keyframe is inserted whenever the reported overlap drops below
//! `keyframe_overlap_threshold`, and becomes the reference of the next
//! window. No graph optimization happens here; an external optimizer can
//! move keyframes through [`SlidingWindowMapManager::graph`] and the next
//! `local_map_needs_update` call will notice.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use tracing::{debug, info};

use crate::atlas::{PoseGraph, VertexId};
use crate::cloud::PointCloud;
use crate::error::MapError;
use crate::geometry::{RigidTransformation, SE3, Se3Transformation};
use crate::local_map::{Composition, DataBuffer};
use crate::localizer::LocalizerConfig;

use super::MapManager;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SlidingWindowConfig {
    /// Number of keyframes in the local map.
    pub window_capacity: usize,

    /// Insert a keyframe when registration overlap falls below this.
    pub keyframe_overlap_threshold: f64,
}

impl Default for SlidingWindowConfig {
    fn default() -> Self {
        Self {
            window_capacity: 5,
            keyframe_overlap_threshold: 0.8,
        }
    }
}

/// Window sized like the localizer's, inserting keyframes below its
/// upper overlap bound.
impl From<&LocalizerConfig> for SlidingWindowConfig {
    fn from(config: &LocalizerConfig) -> Self {
        Self {
            window_capacity: config.local_map_capacity,
            keyframe_overlap_threshold: config.overlap_range.max,
        }
    }
}

struct WindowState {
    /// Membership the next handed out window will have.
    next_composition: Composition,
    /// Last window handed out, used for change and staleness checks.
    delivered: Option<DataBuffer>,
}

pub struct SlidingWindowMapManager {
    config: SlidingWindowConfig,
    graph: Arc<RwLock<PoseGraph>>,
    state: Mutex<WindowState>,
    rigid_transformation: Se3Transformation,
}

impl SlidingWindowMapManager {
    pub fn new(config: SlidingWindowConfig) -> Self {
        Self::with_graph(config, Arc::new(RwLock::new(PoseGraph::new())))
    }

    /// Manage an existing, possibly shared, graph.
    pub fn with_graph(config: SlidingWindowConfig, graph: Arc<RwLock<PoseGraph>>) -> Self {
        let next_composition = Composition::new(config.window_capacity);
        Self {
            config,
            graph,
            state: Mutex::new(WindowState {
                next_composition,
                delivered: None,
            }),
            rigid_transformation: Se3Transformation,
        }
    }

    pub fn config(&self) -> &SlidingWindowConfig {
        &self.config
    }

    /// Shared handle to the pose graph.
    pub fn graph(&self) -> &Arc<RwLock<PoseGraph>> {
        &self.graph
    }

    pub fn next_composition(&self) -> Composition {
        self.state.lock().next_composition.clone()
    }

    pub fn num_keyframes(&self) -> usize {
        self.graph.read().len()
    }

    fn insert_keyframe(
        &self,
        timestamp_ns: u64,
        cloud: PointCloud,
        t_world_robot: SE3,
    ) -> VertexId {
        let v = self
            .graph
            .write()
            .add_keyframe(cloud, t_world_robot, timestamp_ns);
        self.state.lock().next_composition.push(v);
        v
    }
}

impl Default for SlidingWindowMapManager {
    fn default() -> Self {
        Self::new(SlidingWindowConfig::default())
    }
}

impl MapManager for SlidingWindowMapManager {
    fn add_first_keyframe(
        &self,
        timestamp_ns: u64,
        cloud: PointCloud,
        t_world_robot: SE3,
    ) -> Result<VertexId, MapError> {
        let v = self.insert_keyframe(timestamp_ns, cloud, t_world_robot);
        info!("First keyframe {} added", v);
        Ok(v)
    }

    fn local_map_needs_update(&self) -> bool {
        let state = self.state.lock();
        let Some(delivered) = state.delivered.as_ref() else {
            return !state.next_composition.is_empty();
        };

        if delivered.composition() != state.next_composition {
            return true;
        }

        // Same membership: has any member moved or vanished?
        let graph = self.graph.read();
        delivered
            .iter()
            .any(|e| match graph.update_time(e.vertex) {
                Some(t) => t > e.keyframe.update_time,
                None => true,
            })
    }

    fn updated_local_map(&self) -> Result<DataBuffer, MapError> {
        let mut state = self.state.lock();
        if state.next_composition.is_empty() {
            return Err(MapError::NotInitialized);
        }

        let buffer = {
            let graph = self.graph.read();
            DataBuffer::from_graph(&graph, &state.next_composition)?
        };
        debug!(
            "Handing out local map with {} keyframes",
            buffer.len()
        );
        state.delivered = Some(buffer.clone());
        Ok(buffer)
    }

    fn add_keyframe_based_on_overlap(
        &self,
        overlap: f64,
        timestamp_ns: u64,
        cloud: PointCloud,
        t_world_robot: SE3,
    ) -> Result<Option<VertexId>, MapError> {
        if self.graph.read().is_empty() {
            return Err(MapError::NotInitialized);
        }
        if overlap >= self.config.keyframe_overlap_threshold {
            return Ok(None);
        }

        let v = self.insert_keyframe(timestamp_ns, cloud, t_world_robot);
        debug!("Keyframe {} added (overlap {:.3})", v, overlap);
        Ok(Some(v))
    }

    fn rigid_transformation(&self) -> &dyn RigidTransformation {
        &self.rigid_transformation
    }
}
