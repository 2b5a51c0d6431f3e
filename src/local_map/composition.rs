//! Composition - the ordered vertex membership of a local map window.

use std::collections::VecDeque;

use crate::atlas::VertexId;

/// Ordered, capacity-bounded sequence of unique vertices.
///
/// Behaves like a circular buffer: pushing into a full composition evicts
/// the oldest vertex. The last vertex is the reference vertex of the window
/// built from this composition. Pushing a vertex that is already present
/// moves it to the back, so vertices stay unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composition {
    capacity: usize,
    vertices: VecDeque<VertexId>,
}

impl Composition {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            vertices: VecDeque::with_capacity(capacity),
        }
    }

    /// Build from an ordered list; the last vertex becomes the reference.
    pub fn from_vertices<I>(capacity: usize, vertices: I) -> Self
    where
        I: IntoIterator<Item = VertexId>,
    {
        let mut comp = Self::new(capacity);
        for v in vertices {
            comp.push(v);
        }
        comp
    }

    pub fn push(&mut self, v: VertexId) {
        if self.capacity == 0 {
            return;
        }
        if let Some(pos) = self.vertices.iter().position(|x| *x == v) {
            self.vertices.remove(pos);
        } else if self.vertices.len() == self.capacity {
            self.vertices.pop_front();
        }
        self.vertices.push_back(v);
    }

    /// Change the capacity, dropping the oldest vertices if it shrinks.
    pub fn set_capacity(&mut self, capacity: usize) {
        while self.vertices.len() > capacity {
            self.vertices.pop_front();
        }
        self.capacity = capacity;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.vertices.len() == self.capacity
    }

    /// Last vertex.
    pub fn reference_vertex(&self) -> Option<VertexId> {
        self.vertices.back().copied()
    }

    pub fn contains(&self, v: VertexId) -> bool {
        self.vertices.contains(&v)
    }

    pub fn iter(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.vertices.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<VertexId> {
        self.vertices.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
    }
}
