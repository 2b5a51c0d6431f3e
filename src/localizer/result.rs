//! Localization output and worker diagnostics.

use crate::atlas::VertexId;
use crate::geometry::SE3;

/// Corrected pose for one processed scan.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalizationResult {
    pub timestamp_ns: u64,
    pub frame_id: String,
    /// Corrected `T_world_robot`.
    pub pose: SE3,
    /// Share of the scan explained by the local map, in `[0, 1]`.
    pub overlap: f64,
    /// Reference keyframe of the window the scan was registered against.
    pub reference_vertex: VertexId,
    /// Keyframe created from this scan, if any.
    pub new_keyframe: Option<VertexId>,
    pub timing: TimingStats,
}

/// Timing breakdown for a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimingStats {
    pub total_ms: f64,
    pub filter_ms: f64,
    pub map_update_ms: f64,
    pub registration_ms: f64,
}

/// Counters accumulated by the worker since construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LocalizerStats {
    pub processed: u64,
    pub published: u64,
    pub failed_registrations: u64,
    pub low_overlap: u64,
    pub keyframes_added: u64,
    pub local_map_rebuilds: u64,
}
