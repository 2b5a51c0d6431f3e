//! Registration engine interface consumed by the localizer.

use crate::cloud::PointCloud;
use crate::error::RegistrationError;
use crate::geometry::SE3;

/// Aligns a reading cloud against a reference map.
///
/// All poses are expressed in the frame of the map handed to
/// [`set_map`](Self::set_map): `register` returns `T_map_reading`.
pub trait RegistrationEngine: Send {
    fn has_map(&self) -> bool;

    /// Replace the reference map.
    fn set_map(&mut self, map: &PointCloud);

    /// Estimate the reading pose starting from `initial_guess`.
    fn register(
        &mut self,
        reading: &PointCloud,
        initial_guess: &SE3,
    ) -> Result<SE3, RegistrationError>;

    /// Overlap of the last successful registration, roughly in `[0, 1]`.
    fn last_overlap(&self) -> f64;
}
