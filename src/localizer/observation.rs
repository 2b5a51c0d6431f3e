//! Input record handed to the localizer by the sensor driver.

use crate::cloud::PointCloud;
use crate::geometry::SE3;

/// One scan together with the poses needed to place it.
#[derive(Debug, Clone)]
pub struct Observation {
    /// Acquisition time, also used as sequence marker.
    pub timestamp_ns: u64,

    /// Frame the corrected pose is expressed in (usually "world").
    pub frame_id: String,

    /// Odometry estimate of the robot pose.
    pub t_world_robot: SE3,

    /// Sensor mounting pose.
    pub t_robot_sensor: SE3,

    /// Raw cloud in sensor frame.
    pub cloud: PointCloud,
}

impl Observation {
    pub fn new(
        timestamp_ns: u64,
        frame_id: impl Into<String>,
        t_world_robot: SE3,
        t_robot_sensor: SE3,
        cloud: PointCloud,
    ) -> Self {
        Self {
            timestamp_ns,
            frame_id: frame_id.into(),
            t_world_robot,
            t_robot_sensor,
            cloud,
        }
    }
}
