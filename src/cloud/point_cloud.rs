//! Owned 3D point cloud.

use nalgebra::Vector3;

/// A set of 3D points expressed in a single, implicit frame.
///
/// The frame is carried by context (`cloud_sensor`, `cloud_robot`,
/// `cloud_refkf`, ...), not by the type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloud {
    pub points: Vec<Vector3<f64>>,
}

impl PointCloud {
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
        }
    }

    pub fn from_points(points: Vec<Vector3<f64>>) -> Self {
        Self { points }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn push(&mut self, point: Vector3<f64>) {
        self.points.push(point);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Vector3<f64>> {
        self.points.iter()
    }

    /// Append all points of `other`.
    pub fn concatenate(&mut self, other: PointCloud) {
        self.points.extend(other.points);
    }

    /// Keep only the points for which `keep` returns true.
    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&Vector3<f64>) -> bool,
    {
        self.points.retain(keep);
    }

    /// Mean of all points, `None` for an empty cloud.
    pub fn centroid(&self) -> Option<Vector3<f64>> {
        if self.points.is_empty() {
            return None;
        }
        let sum = self
            .points
            .iter()
            .fold(Vector3::zeros(), |acc, p| acc + p);
        Some(sum / self.points.len() as f64)
    }
}

impl From<Vec<Vector3<f64>>> for PointCloud {
    fn from(points: Vec<Vector3<f64>>) -> Self {
        Self::from_points(points)
    }
}

impl FromIterator<Vector3<f64>> for PointCloud {
    fn from_iter<I: IntoIterator<Item = Vector3<f64>>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a PointCloud {
    type Item = &'a Vector3<f64>;
    type IntoIter = std::slice::Iter<'a, Vector3<f64>>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concatenate_keeps_order() {
        let mut a = PointCloud::from_points(vec![Vector3::new(1.0, 0.0, 0.0)]);
        let b = PointCloud::from_points(vec![
            Vector3::new(2.0, 0.0, 0.0),
            Vector3::new(3.0, 0.0, 0.0),
        ]);

        a.concatenate(b);

        assert_eq!(a.len(), 3);
        assert_eq!(a.points[2].x, 3.0);
    }

    #[test]
    fn test_centroid() {
        let cloud: PointCloud =
            vec![Vector3::new(0.0, 0.0, 0.0), Vector3::new(2.0, 4.0, 6.0)].into();
        assert_eq!(cloud.centroid(), Some(Vector3::new(1.0, 2.0, 3.0)));
        assert_eq!(PointCloud::new().centroid(), None);
    }
}
