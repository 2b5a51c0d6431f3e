//! Distance metrics between poses.
//!
//! Used by the local map to find the window member closest to a query pose.

use super::SE3;

/// Scalar distance between two poses. Smaller is closer.
pub trait DistanceMetric: Send + Sync {
    fn distance(&self, a: &SE3, b: &SE3) -> f64;
}

/// Euclidean distance between positions plus a weighted rotation angle.
///
/// `d = |t_a - t_b| + rotation_weight * angle(R_a⁻¹ R_b)`
#[derive(Debug, Clone, Copy)]
pub struct TranslationRotationMetric {
    /// Meters per radian of relative rotation.
    pub rotation_weight: f64,
}

impl TranslationRotationMetric {
    pub fn new(rotation_weight: f64) -> Self {
        Self { rotation_weight }
    }

    /// Position-only metric.
    pub fn translation_only() -> Self {
        Self::new(0.0)
    }
}

impl Default for TranslationRotationMetric {
    fn default() -> Self {
        Self::translation_only()
    }
}

impl DistanceMetric for TranslationRotationMetric {
    fn distance(&self, a: &SE3, b: &SE3) -> f64 {
        let dt = (a.translation - b.translation).norm();
        if self.rotation_weight == 0.0 {
            return dt;
        }
        dt + self.rotation_weight * a.rotation.angle_to(&b.rotation)
    }
}
