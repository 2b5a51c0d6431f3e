//! Atlas module - keyframe pose graph data structures.
//!
//! - [`VertexId`] - handle of a keyframe node
//! - [`Keyframe`] - posed point cloud with an update timestamp
//! - [`PoseGraph`] - container of keyframes with a monotonic update clock
//!
//! The graph is the collaborator owned by the graph manager. Local map
//! windows only ever read it.

pub mod keyframe;
pub mod pose_graph;
pub mod types;

pub use keyframe::Keyframe;
pub use pose_graph::PoseGraph;
pub use types::VertexId;
