//! Input filter chain applied to every incoming scan.
//!
//! The chain is declared in YAML, e.g.
//!
//! ```yaml
//! filters:
//!   - type: min_distance
//!     min: 0.5
//!   - type: max_distance
//!     max: 40.0
//!   - type: voxel_grid
//!     leaf_size: 0.2
//! ```
//!
//! Filters run in declaration order and mutate the cloud in place.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, bail};
use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

use super::PointCloud;

/// A single in-place cloud filter.
pub trait CloudFilter: Send {
    fn name(&self) -> &'static str;

    fn apply(&mut self, cloud: &mut PointCloud);
}

/// Declarative description of one filter.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterConfig {
    /// Drop points closer than `min` to the sensor origin.
    MinDistance { min: f64 },
    /// Drop points farther than `max` from the sensor origin.
    MaxDistance { max: f64 },
    /// Keep points inside the axis-aligned box.
    BoundingBox { min: [f64; 3], max: [f64; 3] },
    /// Replace all points falling in the same voxel by their centroid.
    VoxelGrid { leaf_size: f64 },
    /// Keep each point with probability `keep_ratio`.
    RandomSampling {
        keep_ratio: f64,
        #[serde(default)]
        seed: Option<u64>,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterChainConfig {
    #[serde(default)]
    pub filters: Vec<FilterConfig>,
}

/// Ordered sequence of filters.
#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Box<dyn CloudFilter>>,
}

impl FilterChain {
    /// Empty chain: `apply` is a no-op.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &FilterChainConfig) -> Result<Self> {
        let mut chain = Self::new();
        for (idx, filter) in config.filters.iter().enumerate() {
            let built = build_filter(filter).with_context(|| format!("Invalid filter #{}", idx))?;
            chain.filters.push(built);
        }
        Ok(chain)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: FilterChainConfig =
            serde_yaml::from_str(yaml).context("Failed to parse filter chain YAML")?;
        Self::from_config(&config)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        let config: FilterChainConfig = serde_yaml::from_reader(file)
            .with_context(|| format!("Failed to parse filter chain {:?}", path))?;
        Self::from_config(&config)
    }

    pub fn push<F: CloudFilter + 'static>(&mut self, filter: F) {
        self.filters.push(Box::new(filter));
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    pub fn apply(&mut self, cloud: &mut PointCloud) {
        for filter in self.filters.iter_mut() {
            filter.apply(cloud);
        }
    }
}

fn build_filter(config: &FilterConfig) -> Result<Box<dyn CloudFilter>> {
    Ok(match *config {
        FilterConfig::MinDistance { min } => {
            if !(min >= 0.0) {
                bail!("min_distance must be non-negative, got {}", min);
            }
            Box::new(MinDistanceFilter { min })
        }
        FilterConfig::MaxDistance { max } => {
            if !(max > 0.0) {
                bail!("max_distance must be positive, got {}", max);
            }
            Box::new(MaxDistanceFilter { max })
        }
        FilterConfig::BoundingBox { min, max } => {
            if (0..3).any(|i| min[i] > max[i]) {
                bail!("bounding_box min {:?} exceeds max {:?}", min, max);
            }
            Box::new(BoundingBoxFilter {
                min: Vector3::from(min),
                max: Vector3::from(max),
            })
        }
        FilterConfig::VoxelGrid { leaf_size } => {
            if !(leaf_size > 0.0) {
                bail!("voxel_grid leaf_size must be positive, got {}", leaf_size);
            }
            Box::new(VoxelGridFilter { leaf_size })
        }
        FilterConfig::RandomSampling { keep_ratio, seed } => {
            if !(0.0..=1.0).contains(&keep_ratio) {
                bail!("random_sampling keep_ratio must be in [0, 1], got {}", keep_ratio);
            }
            Box::new(RandomSamplingFilter::new(keep_ratio, seed))
        }
    })
}

pub struct MinDistanceFilter {
    pub min: f64,
}

impl CloudFilter for MinDistanceFilter {
    fn name(&self) -> &'static str {
        "min_distance"
    }

    fn apply(&mut self, cloud: &mut PointCloud) {
        let min_sq = self.min * self.min;
        cloud.retain(|p| p.norm_squared() >= min_sq);
    }
}

pub struct MaxDistanceFilter {
    pub max: f64,
}

impl CloudFilter for MaxDistanceFilter {
    fn name(&self) -> &'static str {
        "max_distance"
    }

    fn apply(&mut self, cloud: &mut PointCloud) {
        let max_sq = self.max * self.max;
        cloud.retain(|p| p.norm_squared() <= max_sq);
    }
}

pub struct BoundingBoxFilter {
    pub min: Vector3<f64>,
    pub max: Vector3<f64>,
}

impl CloudFilter for BoundingBoxFilter {
    fn name(&self) -> &'static str {
        "bounding_box"
    }

    fn apply(&mut self, cloud: &mut PointCloud) {
        let (min, max) = (self.min, self.max);
        cloud.retain(|p| (0..3).all(|i| p[i] >= min[i] && p[i] <= max[i]));
    }
}

pub struct VoxelGridFilter {
    pub leaf_size: f64,
}

impl CloudFilter for VoxelGridFilter {
    fn name(&self) -> &'static str {
        "voxel_grid"
    }

    fn apply(&mut self, cloud: &mut PointCloud) {
        let inv = 1.0 / self.leaf_size;
        // voxel -> (sum, count, first-seen order)
        let mut voxels: HashMap<(i64, i64, i64), (Vector3<f64>, usize, usize)> = HashMap::new();
        for p in cloud.iter() {
            let key = (
                (p.x * inv).floor() as i64,
                (p.y * inv).floor() as i64,
                (p.z * inv).floor() as i64,
            );
            let next_order = voxels.len();
            let entry = voxels.entry(key).or_insert((Vector3::zeros(), 0, next_order));
            entry.0 += p;
            entry.1 += 1;
        }

        let mut centroids: Vec<(usize, Vector3<f64>)> = voxels
            .into_values()
            .map(|(sum, count, order)| (order, sum / count as f64))
            .collect();
        centroids.sort_by_key(|(order, _)| *order);

        cloud.points = centroids.into_iter().map(|(_, c)| c).collect();
    }
}

pub struct RandomSamplingFilter {
    keep_ratio: f64,
    rng: StdRng,
}

impl RandomSamplingFilter {
    pub fn new(keep_ratio: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { keep_ratio, rng }
    }
}

impl CloudFilter for RandomSamplingFilter {
    fn name(&self) -> &'static str {
        "random_sampling"
    }

    fn apply(&mut self, cloud: &mut PointCloud) {
        let ratio = self.keep_ratio;
        let rng = &mut self.rng;
        cloud.retain(|_| rng.gen::<f64>() < ratio);
    }
}
