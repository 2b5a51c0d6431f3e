//! Point clouds and the input filter chain.

pub mod filters;
pub mod point_cloud;

pub use filters::{CloudFilter, FilterChain, FilterChainConfig, FilterConfig};
pub use point_cloud::PointCloud;
