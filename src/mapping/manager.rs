//! Graph manager interface consumed by the localizer.

use crate::atlas::VertexId;
use crate::cloud::PointCloud;
use crate::error::MapError;
use crate::geometry::{RigidTransformation, SE3};
use crate::local_map::DataBuffer;

/// Owner of the pose graph and of keyframe insertion policy.
///
/// Methods take `&self`: implementations synchronize internally, since an
/// optimizer may touch the graph from another thread while the localizer
/// worker reads it.
pub trait MapManager: Send + Sync {
    /// Seed the graph with the first scan (cloud in robot frame).
    fn add_first_keyframe(
        &self,
        timestamp_ns: u64,
        cloud: PointCloud,
        t_world_robot: SE3,
    ) -> Result<VertexId, MapError>;

    /// Cheap check, called every cycle: did the composition change or did a
    /// member keyframe move since the last handed out window?
    fn local_map_needs_update(&self) -> bool;

    /// Snapshot of the window the localizer should register against.
    fn updated_local_map(&self) -> Result<DataBuffer, MapError>;

    /// Report a registered scan. Returns the new vertex when the manager
    /// decided to insert a keyframe.
    fn add_keyframe_based_on_overlap(
        &self,
        overlap: f64,
        timestamp_ns: u64,
        cloud: PointCloud,
        t_world_robot: SE3,
    ) -> Result<Option<VertexId>, MapError>;

    /// Operator used to move clouds between frames.
    fn rigid_transformation(&self) -> &dyn RigidTransformation;
}
