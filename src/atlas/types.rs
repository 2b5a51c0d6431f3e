//! Core ID types for the pose graph.

/// Unique identifier for a keyframe vertex within a [`PoseGraph`](super::PoseGraph).
///
/// VertexIds are assigned sequentially when keyframes are inserted.
/// They serve as lightweight handles so local map windows can reference
/// graph nodes without holding on to the graph itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(pub u64);

impl VertexId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for VertexId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "V{}", self.0)
    }
}
