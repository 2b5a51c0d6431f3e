//! Geometry utilities: SE3 transforms, cloud transformation, pose metrics.

pub mod metrics;
pub mod se3;
pub mod transformation;

pub use metrics::{DistanceMetric, TranslationRotationMetric};
pub use se3::SE3;
pub use transformation::{RigidTransformation, Se3Transformation};
