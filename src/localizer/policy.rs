//! Policies deciding whether a candidate window should replace the loaded one.

use crate::geometry::SE3;
use crate::local_map::{Composition, LocalMap};

pub trait CompositionPolicy: Send {
    fn name(&self) -> &'static str;

    /// Is `candidate` worth rebuilding the window for?
    ///
    /// `latest_pose` is the last corrected robot pose, if any.
    fn is_better(
        &self,
        current: &LocalMap,
        candidate: &Composition,
        latest_pose: Option<&SE3>,
    ) -> bool;
}

/// Any change of membership or reference is an improvement.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreferNewComposition;

impl CompositionPolicy for PreferNewComposition {
    fn name(&self) -> &'static str {
        "prefer_new"
    }

    fn is_better(
        &self,
        current: &LocalMap,
        candidate: &Composition,
        _latest_pose: Option<&SE3>,
    ) -> bool {
        !current.has_same_composition(candidate)
    }
}

/// Only switch when the candidate reference is where the robot actually is.
///
/// A candidate whose reference is not in the current window is always
/// accepted, as there is nothing to compare it with.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreferCloserReference;

impl CompositionPolicy for PreferCloserReference {
    fn name(&self) -> &'static str {
        "prefer_closer_reference"
    }

    fn is_better(
        &self,
        current: &LocalMap,
        candidate: &Composition,
        latest_pose: Option<&SE3>,
    ) -> bool {
        if current.has_same_composition(candidate) {
            return false;
        }
        let Some(reference) = candidate.reference_vertex() else {
            return false;
        };
        if !current.composition().contains(reference) {
            return true;
        }
        match latest_pose {
            Some(pose) => current.find_closest_vertex(pose) == Some(reference),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::{PoseGraph, VertexId};
    use crate::cloud::PointCloud;
    use nalgebra::Vector3;

    fn graph_on_a_line(n: usize) -> (PoseGraph, Vec<VertexId>) {
        let mut graph = PoseGraph::new();
        let ids = (0..n)
            .map(|i| {
                let cloud = PointCloud::from_points(vec![Vector3::new(0.0, 0.0, 1.0)]);
                let pose = SE3::from_translation(Vector3::new(i as f64, 0.0, 0.0));
                graph.add_keyframe(cloud, pose, i as u64)
            })
            .collect();
        (graph, ids)
    }

    #[test]
    fn test_prefer_new_composition() {
        let (graph, v) = graph_on_a_line(3);
        let window = Composition::from_vertices(3, [v[0], v[1]]);
        let current = LocalMap::from_graph(&graph, &window).unwrap();

        let same = Composition::from_vertices(3, [v[0], v[1]]);
        let grown = Composition::from_vertices(3, [v[0], v[1], v[2]]);
        let policy = PreferNewComposition;

        assert!(!policy.is_better(&current, &same, None));
        assert!(policy.is_better(&current, &grown, None));
    }

    #[test]
    fn test_prefer_closer_reference() {
        let (graph, v) = graph_on_a_line(3);
        let window = Composition::from_vertices(3, [v[0], v[1]]);
        let current = LocalMap::from_graph(&graph, &window).unwrap();
        let policy = PreferCloserReference;

        // Same members, reference moved back to v0.
        let back_to_v0 = Composition::from_vertices(3, [v[1], v[0]]);
        let near_v0 = SE3::from_translation(Vector3::new(0.1, 0.0, 0.0));
        let near_v1 = SE3::from_translation(Vector3::new(0.9, 0.0, 0.0));
        assert!(policy.is_better(&current, &back_to_v0, Some(&near_v0)));
        assert!(!policy.is_better(&current, &back_to_v0, Some(&near_v1)));

        // New reference outside the window.
        let with_v2 = Composition::from_vertices(3, [v[0], v[1], v[2]]);
        assert!(policy.is_better(&current, &with_v2, Some(&near_v0)));

        assert!(!policy.is_better(&current, &current.composition(), Some(&near_v1)));
    }
}
