//! Point-to-point ICP against the local map.
//!
//! ```text
//! Input: reading R, map M (k-d tree), initial guess T₀
//!
//! 1. For each iteration:
//!    a. Transform R by T and find the nearest map point of each reading point
//!    b. Reject pairs farther than max_correspondence_distance
//!    c. Solve the best rigid ΔT for the pairs (SVD)
//!    d. T = ΔT ∘ T, stop when ΔT is below the epsilons
//! 2. Overlap = share of reading points with a map neighbour in range at T
//! ```

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, bail};
use kiddo::{KdTree, SquaredEuclidean};
use nalgebra::{Matrix3, Vector3};
use serde::Deserialize;
use tracing::debug;

use crate::cloud::PointCloud;
use crate::error::RegistrationError;
use crate::geometry::SE3;

use super::RegistrationEngine;

/// Configuration for [`IcpSequence`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IcpConfig {
    /// Maximum number of iterations.
    pub max_iterations: u32,

    /// Pairs farther apart than this (meters) are outliers.
    /// Also the radius used to compute overlap.
    pub max_correspondence_distance: f64,

    /// Registration fails below this many pairs.
    pub min_correspondences: usize,

    /// Convergence threshold for the translation increment (meters).
    pub translation_epsilon: f64,

    /// Convergence threshold for the rotation increment (radians).
    pub rotation_epsilon: f64,
}

impl Default for IcpConfig {
    fn default() -> Self {
        Self {
            max_iterations: 40,
            max_correspondence_distance: 1.0,
            min_correspondences: 10,
            translation_epsilon: 1e-4,
            rotation_epsilon: 1e-4,
        }
    }
}

impl IcpConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: IcpConfig = serde_yaml::from_str(yaml).context("Failed to parse ICP YAML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        let config: IcpConfig = serde_yaml::from_reader(file)
            .with_context(|| format!("Failed to parse ICP config {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            bail!("max_iterations must be at least 1");
        }
        if !(self.max_correspondence_distance > 0.0) {
            bail!(
                "max_correspondence_distance must be positive, got {}",
                self.max_correspondence_distance
            );
        }
        if self.min_correspondences < 3 {
            bail!(
                "min_correspondences must be at least 3, got {}",
                self.min_correspondences
            );
        }
        Ok(())
    }
}

struct MapIndex {
    points: Vec<Vector3<f64>>,
    tree: KdTree<f64, 3>,
}

impl MapIndex {
    fn build(cloud: &PointCloud) -> Self {
        let mut tree: KdTree<f64, 3> = KdTree::new();
        for (i, p) in cloud.iter().enumerate() {
            tree.add(&[p.x, p.y, p.z], i as u64);
        }
        Self {
            points: cloud.points.clone(),
            tree,
        }
    }

    /// Nearest map point and its squared distance.
    fn nearest(&self, q: &Vector3<f64>) -> (Vector3<f64>, f64) {
        let nn = self.tree.nearest_one::<SquaredEuclidean>(&[q.x, q.y, q.z]);
        (self.points[nn.item as usize], nn.distance)
    }
}

/// Point-to-point ICP registration engine.
pub struct IcpSequence {
    config: IcpConfig,
    map: Option<MapIndex>,
    last_overlap: f64,
}

impl IcpSequence {
    pub fn new(config: IcpConfig) -> Self {
        Self {
            config,
            map: None,
            last_overlap: 0.0,
        }
    }

    pub fn config(&self) -> &IcpConfig {
        &self.config
    }

    pub fn map_size(&self) -> usize {
        self.map.as_ref().map_or(0, |m| m.points.len())
    }

    fn compute_overlap(&self, map: &MapIndex, reading: &PointCloud, pose: &SE3) -> f64 {
        let max_sq = self.config.max_correspondence_distance.powi(2);
        let inliers = reading
            .iter()
            .filter(|p| map.nearest(&pose.transform_point(p)).1 <= max_sq)
            .count();
        inliers as f64 / reading.len() as f64
    }
}

impl Default for IcpSequence {
    fn default() -> Self {
        Self::new(IcpConfig::default())
    }
}

impl RegistrationEngine for IcpSequence {
    fn has_map(&self) -> bool {
        self.map.is_some()
    }

    fn set_map(&mut self, map: &PointCloud) {
        self.map = if map.is_empty() {
            None
        } else {
            Some(MapIndex::build(map))
        };
    }

    fn register(
        &mut self,
        reading: &PointCloud,
        initial_guess: &SE3,
    ) -> Result<SE3, RegistrationError> {
        let map = self.map.as_ref().ok_or(RegistrationError::NoMap)?;
        if reading.is_empty() {
            return Err(RegistrationError::EmptyReading);
        }

        let max_sq = self.config.max_correspondence_distance.powi(2);
        let mut pose = *initial_guess;
        let mut iterations = 0;
        let mut src = Vec::with_capacity(reading.len());
        let mut dst = Vec::with_capacity(reading.len());

        for _ in 0..self.config.max_iterations {
            iterations += 1;
            src.clear();
            dst.clear();

            for p in reading.iter() {
                let q = pose.transform_point(p);
                let (nearest, dist_sq) = map.nearest(&q);
                if dist_sq <= max_sq {
                    src.push(q);
                    dst.push(nearest);
                }
            }

            if src.len() < self.config.min_correspondences {
                return Err(RegistrationError::NotEnoughCorrespondences {
                    found: src.len(),
                    required: self.config.min_correspondences,
                });
            }

            let delta = align_points(&src, &dst)?;
            pose = delta.compose(&pose);

            if delta.translation.norm() < self.config.translation_epsilon
                && delta.rotation_angle() < self.config.rotation_epsilon
            {
                break;
            }
        }

        let overlap = self.compute_overlap(map, reading, &pose);
        debug!(
            "ICP finished after {} iterations, {} pairs, overlap {:.3}",
            iterations,
            src.len(),
            overlap
        );
        self.last_overlap = overlap;
        Ok(pose)
    }

    fn last_overlap(&self) -> f64 {
        self.last_overlap
    }
}

/// Rigid transform minimizing `Σ |T src_i - dst_i|²` (Kabsch / Umeyama without scale).
pub fn align_points(src: &[Vector3<f64>], dst: &[Vector3<f64>]) -> Result<SE3, RegistrationError> {
    if src.len() != dst.len() || src.len() < 3 {
        return Err(RegistrationError::Degenerate);
    }

    let n = src.len() as f64;
    let src_mean = src.iter().fold(Vector3::zeros(), |acc, p| acc + p) / n;
    let dst_mean = dst.iter().fold(Vector3::zeros(), |acc, p| acc + p) / n;

    let mut h = Matrix3::zeros();
    for (s, d) in src.iter().zip(dst.iter()) {
        h += (s - src_mean) * (d - dst_mean).transpose();
    }

    let svd = h.svd(true, true);
    let u = svd.u.ok_or(RegistrationError::Degenerate)?;
    let v_t = svd.v_t.ok_or(RegistrationError::Degenerate)?;

    let mut v = v_t.transpose();
    let mut rotation = v * u.transpose();
    if rotation.determinant() < 0.0 {
        // Reflection: flip the axis of the smallest singular value
        v.column_mut(2).neg_mut();
        rotation = v * u.transpose();
    }

    if !rotation.iter().all(|x| x.is_finite()) {
        return Err(RegistrationError::Degenerate);
    }

    let translation = dst_mean - rotation * src_mean;
    Ok(SE3::from_rt(rotation, translation))
}
