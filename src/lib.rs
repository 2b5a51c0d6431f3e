//! Localization front-end for pose-graph SLAM.
//!
//! Incoming scans are queued, filtered and registered against a local map
//! window: a few keyframes of the pose graph merged into one cloud in the
//! reference keyframe frame. The graph itself, and the decision of when to
//! add keyframes, belong to a [`mapping::MapManager`].

pub mod atlas;
pub mod cloud;
pub mod error;
pub mod geometry;
pub mod local_map;
pub mod localizer;
pub mod mapping;
pub mod registration;

pub use error::{LocalizerError, MapError, RegistrationError};
pub use localizer::{Localizer, LocalizerConfig, Observation};
