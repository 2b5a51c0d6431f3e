//! Local map windows sampled from the pose graph.
//!
//! - [`Composition`] - ordered vertex membership, last vertex is the reference
//! - [`DataBuffer`] - keyframe snapshots for a membership
//! - [`LocalMap`] - snapshots plus the merged cloud in the reference frame

pub mod composition;
pub mod data_buffer;
pub mod window;

pub use composition::Composition;
pub use data_buffer::{DataBuffer, DataElement};
pub use window::LocalMap;
