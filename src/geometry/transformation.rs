//! Rigid transformation operator applied to whole point clouds.

use crate::cloud::PointCloud;

use super::SE3;

/// Applies a rigid transform to a cloud, producing a new cloud.
///
/// Implementations must be stateless with respect to the cloud so one
/// operator can be shared between the local map and the pipeline.
pub trait RigidTransformation: Send + Sync {
    fn compute(&self, cloud: &PointCloud, transform: &SE3) -> PointCloud;

    /// In-place variant. The default delegates to [`compute`](Self::compute).
    fn compute_in_place(&self, cloud: &mut PointCloud, transform: &SE3) {
        *cloud = self.compute(cloud, transform);
    }
}

/// Plain `R * p + t` on every point.
#[derive(Debug, Clone, Copy, Default)]
pub struct Se3Transformation;

impl RigidTransformation for Se3Transformation {
    fn compute(&self, cloud: &PointCloud, transform: &SE3) -> PointCloud {
        cloud.iter().map(|p| transform.transform_point(p)).collect()
    }

    fn compute_in_place(&self, cloud: &mut PointCloud, transform: &SE3) {
        for p in cloud.points.iter_mut() {
            *p = transform.transform_point(p);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    #[test]
    fn test_compute_and_in_place_agree() {
        let op = Se3Transformation;
        let pose = SE3::from_euler(0.0, 0.0, 0.3, Vector3::new(1.0, 2.0, 3.0));
        let cloud = PointCloud::from_points(vec![
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 1.0),
        ]);

        let copied = op.compute(&cloud, &pose);
        let mut in_place = cloud.clone();
        op.compute_in_place(&mut in_place, &pose);

        assert_eq!(copied.len(), 2);
        for (a, b) in copied.iter().zip(in_place.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
    }
}
