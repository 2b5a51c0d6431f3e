/// State of the localization worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocalizerState {
    /// No keyframe yet, the next scan bootstraps the map.
    #[default]
    Uninitialized,
    /// Registering scans against the local map.
    Tracking,
    /// Worker shut down.
    Stopped,
}
