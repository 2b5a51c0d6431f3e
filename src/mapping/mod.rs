//! Graph manager: keyframe insertion and local map hand-over.

pub mod manager;
pub mod sliding_window;

pub use manager::MapManager;
pub use sliding_window::{SlidingWindowConfig, SlidingWindowMapManager};
