//! Typed errors for the local map, the registration engine and the pipeline.
//!
//! Setup paths (configuration files) use `anyhow` with context instead.

use crate::atlas::VertexId;

/// Errors raised while snapshotting keyframes into a local map.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MapError {
    /// A vertex requested by a composition is not in the graph.
    #[error("vertex {0} not found in pose graph")]
    MissingVertex(VertexId),

    /// The operation needs at least one keyframe in the window.
    #[error("local map window is empty")]
    EmptyWindow,

    /// The graph manager has not been bootstrapped with a first keyframe.
    #[error("graph has no keyframes yet")]
    NotInitialized,
}

/// Per-cycle failures of the registration engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistrationError {
    #[error("registration engine has no reference map")]
    NoMap,

    #[error("reading cloud is empty")]
    EmptyReading,

    #[error("not enough correspondences: {found} < {required}")]
    NotEnoughCorrespondences { found: usize, required: usize },

    #[error("degenerate point configuration, alignment is undefined")]
    Degenerate,
}

/// Pipeline-level errors.
#[derive(Debug, thiserror::Error)]
pub enum LocalizerError {
    #[error("localizer worker is already running")]
    AlreadyRunning,

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error(transparent)]
    Map(#[from] MapError),

    #[error(transparent)]
    Registration(#[from] RegistrationError),
}

pub type Result<T, E = LocalizerError> = std::result::Result<T, E>;
