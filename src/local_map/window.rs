//! LocalMap - capacity-bounded window over the pose graph with a merged cloud.
//!
//! The merged cloud is expressed in the reference keyframe frame (the last
//! element of the window). Every other member's cloud is brought into that
//! frame with `T_refkf_world * T_world_kf` and concatenated after the
//! reference cloud.
//!
//! Rebuilding costs O(total points), so callers gate it with the comparison
//! and staleness checks instead of refreshing every cycle. The comparisons
//! are linear searches over the members, O(n²) in the window size, which is
//! small and fixed.
//!
//! The window does not lock the graph. Whoever owns the graph must make
//! sure it is not mutated while a window reads from it.

use std::sync::Arc;

use tracing::debug;

use crate::atlas::{Keyframe, PoseGraph, VertexId};
use crate::cloud::PointCloud;
use crate::error::MapError;
use crate::geometry::{
    DistanceMetric, RigidTransformation, SE3, Se3Transformation, TranslationRotationMetric,
};

use super::{Composition, DataBuffer, DataElement};

#[derive(Clone)]
pub struct LocalMap {
    data: DataBuffer,
    /// Merged cloud in the reference keyframe frame.
    cloud: PointCloud,
    rigid_transformation: Arc<dyn RigidTransformation>,
    metric: Arc<dyn DistanceMetric>,
}

impl LocalMap {
    /// Empty window. `has_cloud()` is false until the first update.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: DataBuffer::new(capacity),
            cloud: PointCloud::new(),
            rigid_transformation: Arc::new(Se3Transformation),
            metric: Arc::new(TranslationRotationMetric::default()),
        }
    }

    /// Snapshot every vertex of `comp` and build the merged cloud.
    pub fn from_graph(graph: &PoseGraph, comp: &Composition) -> Result<Self, MapError> {
        let mut map = Self::new(comp.capacity());
        map.data = DataBuffer::from_graph(graph, comp)?;
        map.build_cloud_from_data();
        Ok(map)
    }

    pub fn with_transformation(mut self, transformation: Arc<dyn RigidTransformation>) -> Self {
        self.rigid_transformation = transformation;
        self.build_cloud_from_data();
        self
    }

    pub fn with_metric(mut self, metric: Arc<dyn DistanceMetric>) -> Self {
        self.metric = metric;
        self
    }

    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &DataBuffer {
        &self.data
    }

    /// Ordered vertex membership. Independent of later mutation.
    pub fn composition(&self) -> Composition {
        self.data.composition()
    }

    pub fn reference_vertex(&self) -> Option<VertexId> {
        self.data.back().map(|e| e.vertex)
    }

    pub fn reference_keyframe(&self) -> Option<&Keyframe> {
        self.data.back().map(|e| &e.keyframe)
    }

    /// Re-snapshot every member from the graph, membership unchanged.
    ///
    /// On error the window is left untouched.
    pub fn update_from_graph(&mut self, graph: &PoseGraph) -> Result<(), MapError> {
        let fresh = self
            .data
            .iter()
            .map(|e| graph.get(e.vertex).cloned())
            .collect::<Result<Vec<_>, _>>()?;

        for (element, kf) in self.data.iter_mut().zip(fresh) {
            element.keyframe = kf;
        }
        self.build_cloud_from_data();
        Ok(())
    }

    /// Replace the whole membership with a prepared buffer.
    pub fn update_from_data_buffer(&mut self, data: DataBuffer) {
        self.data = data;
        self.build_cloud_from_data();
    }

    /// Switch to a new membership, taking the composition's capacity.
    ///
    /// On error the window is left untouched.
    pub fn update_to_new_composition(
        &mut self,
        graph: &PoseGraph,
        comp: &Composition,
    ) -> Result<(), MapError> {
        let mut data = DataBuffer::new(comp.capacity());
        for v in comp.iter() {
            data.push(DataElement::new(v, graph.get(v)?.clone()));
        }
        self.data = data;
        self.build_cloud_from_data();
        Ok(())
    }

    pub fn has_cloud(&self) -> bool {
        !self.cloud.is_empty()
    }

    /// Cached merged cloud in the reference keyframe frame.
    pub fn cloud(&self) -> &PointCloud {
        &self.cloud
    }

    /// Merged cloud moved into the world with the reference keyframe pose.
    /// Computed on every call.
    pub fn cloud_in_world_frame(&self) -> PointCloud {
        match self.reference_keyframe() {
            Some(refkf) => self
                .rigid_transformation
                .compute(&self.cloud, &refkf.optimized_t_world_kf),
            None => PointCloud::new(),
        }
    }

    /// Same size and the same members in both directions, order ignored.
    pub fn has_same_vertex_set(&self, comp: &Composition) -> bool {
        if self.data.len() != comp.len() {
            return false;
        }

        // Window members found in composition
        for element in self.data.iter() {
            if !comp.iter().any(|v| v == element.vertex) {
                return false;
            }
        }

        // Composition members found in window
        for v in comp.iter() {
            if !self.data.iter().any(|e| e.vertex == v) {
                return false;
            }
        }

        true
    }

    /// Only the last elements are compared.
    pub fn has_same_reference_vertex(&self, comp: &Composition) -> bool {
        self.reference_vertex() == comp.reference_vertex()
    }

    pub fn has_same_composition(&self, comp: &Composition) -> bool {
        self.has_same_reference_vertex(comp) && self.has_same_vertex_set(comp)
    }

    /// True iff some member was updated in the graph after its snapshot.
    /// A member removed from the graph also counts.
    pub fn is_outdated(&self, graph: &PoseGraph) -> bool {
        self.data.iter().any(|e| is_element_outdated(e, graph))
    }

    /// Staleness check restricted to the reference keyframe.
    pub fn is_reference_keyframe_outdated(&self, graph: &PoseGraph) -> bool {
        self.data
            .back()
            .is_some_and(|e| is_element_outdated(e, graph))
    }

    /// Member whose optimized pose is closest to `t_world_x`.
    ///
    /// Ties keep the earliest member. `None` for an empty window.
    pub fn find_closest_vertex(&self, t_world_x: &SE3) -> Option<VertexId> {
        let mut closest: Option<(VertexId, f64)> = None;
        for e in self.data.iter() {
            let dist = self
                .metric
                .distance(&e.keyframe.optimized_t_world_kf, t_world_x);
            match closest {
                Some((_, best)) if dist >= best => {}
                _ => closest = Some((e.vertex, dist)),
            }
        }
        closest.map(|(v, _)| v)
    }

    fn build_cloud_from_data(&mut self) {
        let Some(refkf) = self.data.back() else {
            self.cloud = PointCloud::new();
            return;
        };

        let total: usize = self.data.iter().map(|e| e.keyframe.num_points()).sum();
        let mut cloud = PointCloud::with_capacity(total);
        cloud.concatenate(refkf.keyframe.cloud.as_ref().clone());

        let t_refkf_world = refkf.keyframe.optimized_t_world_kf.inverse();
        let n_members = self.data.len();

        // Every member except the reference (the last element)
        for e in self.data.iter().take(n_members - 1) {
            let t_refkf_kf = t_refkf_world.compose(&e.keyframe.optimized_t_world_kf);
            cloud.concatenate(self.rigid_transformation.compute(&e.keyframe.cloud, &t_refkf_kf));
        }

        debug!(
            "Local map rebuilt: {} keyframes, {} points, reference {}",
            n_members,
            cloud.len(),
            refkf.vertex
        );
        self.cloud = cloud;
    }
}

fn is_element_outdated(element: &DataElement, graph: &PoseGraph) -> bool {
    match graph.update_time(element.vertex) {
        Some(t) => t > element.keyframe.update_time,
        None => true,
    }
}
