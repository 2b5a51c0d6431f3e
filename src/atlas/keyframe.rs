//! Keyframe - a posed point cloud stored as a node of the pose graph.

use std::sync::Arc;

use crate::cloud::PointCloud;
use crate::geometry::SE3;

/// A keyframe in the pose graph.
///
/// Cloning is cheap: the cloud is shared, only the pose and the timestamps
/// are copied. Local map windows rely on this to snapshot graph nodes.
#[derive(Debug, Clone)]
pub struct Keyframe {
    /// Cloud in the keyframe's own (robot) frame.
    pub cloud: Arc<PointCloud>,

    /// Optimized pose of the keyframe in the world (T_world_kf).
    pub optimized_t_world_kf: SE3,

    /// Graph clock value at the last pose change.
    ///
    /// Compared between a window snapshot and the graph to detect staleness.
    pub update_time: u64,

    /// Capture time of the scan this keyframe was created from.
    pub timestamp_ns: u64,
}

impl Keyframe {
    pub fn new(cloud: PointCloud, t_world_kf: SE3, update_time: u64, timestamp_ns: u64) -> Self {
        Self {
            cloud: Arc::new(cloud),
            optimized_t_world_kf: t_world_kf,
            update_time,
            timestamp_ns,
        }
    }

    pub fn num_points(&self) -> usize {
        self.cloud.len()
    }
}
