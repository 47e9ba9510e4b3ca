//! Per-vertex skin influences

use crate::core::NodeId;

/// One bone's contribution to a vertex
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SkinInfluence {
    /// Skeleton node driving this influence
    pub node: NodeId,
    pub weight: f32,
    /// Index into the deformer's bone table.
    /// Assigned on reinitialize; `None` if the node could not be resolved.
    pub local_bone: Option<u32>,
}

impl SkinInfluence {
    pub fn new(node: NodeId, weight: f32) -> Self {
        Self {
            node,
            weight,
            local_bone: None,
        }
    }
}

/// Variable-length influence lists for every vertex of a mesh.
///
/// Stored flat with per-vertex offsets, so influence order is vertex order.
#[derive(Clone, Debug, PartialEq)]
pub struct SkinningLayer {
    offsets: Vec<usize>,
    influences: Vec<SkinInfluence>,
}

impl SkinningLayer {
    /// Create an empty layer
    pub fn new() -> Self {
        Self {
            offsets: vec![0],
            influences: Vec::new(),
        }
    }

    /// Build a layer from `(node, weight)` lists, one list per vertex
    pub fn from_weights<I, V>(vertices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: IntoIterator<Item = (NodeId, f32)>,
    {
        let mut layer = Self::new();
        for weights in vertices {
            layer.push_vertex(weights);
        }
        layer
    }

    /// Append a vertex. Returns its index.
    pub fn push_vertex(&mut self, weights: impl IntoIterator<Item = (NodeId, f32)>) -> usize {
        self.influences.extend(
            weights
                .into_iter()
                .map(|(node, weight)| SkinInfluence::new(node, weight)),
        );
        self.offsets.push(self.influences.len());
        self.offsets.len() - 2
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Total number of influences over all vertices
    pub fn influence_count(&self) -> usize {
        self.influences.len()
    }

    /// Influences of a single vertex
    pub fn influences(&self, vertex: usize) -> &[SkinInfluence] {
        &self.influences[self.offsets[vertex]..self.offsets[vertex + 1]]
    }

    /// Mutable influences of a single vertex
    pub fn influences_mut(&mut self, vertex: usize) -> &mut [SkinInfluence] {
        &mut self.influences[self.offsets[vertex]..self.offsets[vertex + 1]]
    }

    /// Every influence, in vertex order
    pub fn all_influences(&self) -> &[SkinInfluence] {
        &self.influences
    }

    /// Every influence, in vertex order, mutably
    pub fn all_influences_mut(&mut self) -> &mut [SkinInfluence] {
        &mut self.influences
    }

    /// Iterate per-vertex influence lists
    pub fn iter(&self) -> impl Iterator<Item = &[SkinInfluence]> + '_ {
        self.offsets
            .windows(2)
            .map(|range| &self.influences[range[0]..range[1]])
    }
}

impl Default for SkinningLayer {
    fn default() -> Self {
        Self::new()
    }
}
