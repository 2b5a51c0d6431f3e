//! Scan registration against the local map.

pub mod engine;
pub mod icp;

pub use engine::RegistrationEngine;
pub use icp::{IcpConfig, IcpSequence, align_points};
