//! DataBuffer - window elements captured from the pose graph.

use std::collections::VecDeque;

use crate::atlas::{Keyframe, PoseGraph, VertexId};
use crate::error::MapError;

use super::Composition;

/// A vertex paired with a copy of its keyframe data at snapshot time.
#[derive(Debug, Clone)]
pub struct DataElement {
    pub vertex: VertexId,
    pub keyframe: Keyframe,
}

impl DataElement {
    pub fn new(vertex: VertexId, keyframe: Keyframe) -> Self {
        Self { vertex, keyframe }
    }
}

/// Capacity-bounded ordered collection of [`DataElement`]s.
///
/// Same shape and push semantics as [`Composition`]: the last element is the
/// reference keyframe, the oldest element is evicted when full.
#[derive(Debug, Clone, Default)]
pub struct DataBuffer {
    capacity: usize,
    elements: VecDeque<DataElement>,
}

impl DataBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            elements: VecDeque::with_capacity(capacity),
        }
    }

    /// Snapshot every vertex of `comp` from the graph, preserving order.
    pub fn from_graph(graph: &PoseGraph, comp: &Composition) -> Result<Self, MapError> {
        let mut buffer = Self::new(comp.capacity());
        for v in comp.iter() {
            let kf = graph.get(v)?;
            buffer.push(DataElement::new(v, kf.clone()));
        }
        Ok(buffer)
    }

    pub fn push(&mut self, element: DataElement) {
        if self.capacity == 0 {
            return;
        }
        if let Some(pos) = self.elements.iter().position(|e| e.vertex == element.vertex) {
            self.elements.remove(pos);
        } else if self.elements.len() == self.capacity {
            self.elements.pop_front();
        }
        self.elements.push_back(element);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn back(&self) -> Option<&DataElement> {
        self.elements.back()
    }

    pub fn iter(&self) -> std::collections::vec_deque::Iter<'_, DataElement> {
        self.elements.iter()
    }

    pub fn iter_mut(&mut self) -> std::collections::vec_deque::IterMut<'_, DataElement> {
        self.elements.iter_mut()
    }

    /// Ordered vertex membership as a composition of the same capacity.
    pub fn composition(&self) -> Composition {
        Composition::from_vertices(self.capacity, self.elements.iter().map(|e| e.vertex))
    }
}
