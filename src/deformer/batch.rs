//! Vertex batch partitioning and dispatch
//!
//! The output buffers are split into contiguous, non-overlapping vertex
//! ranges of at most `vertices_per_batch` vertices. Each batch owns the
//! mutable slices for its range, so batches can run on any thread in any
//! order without locking.

use std::ops::Range;

use rayon::prelude::*;

use super::SkinningConfig;
use crate::core::{Vec3, Vec4};
use crate::mesh::VertexAttributes;

/// Mutable output slices for a contiguous vertex range
#[derive(Debug)]
pub struct VertexOutputs<'a> {
    pub positions: &'a mut [Vec3],
    pub normals: &'a mut [Vec3],
    pub tangents: Option<&'a mut [Vec4]>,
    pub bitangents: Option<&'a mut [Vec3]>,
}

impl<'a> VertexOutputs<'a> {
    /// Borrow every output array of `attrs`
    pub fn new(attrs: &'a mut VertexAttributes) -> Self {
        Self {
            positions: &mut attrs.positions,
            normals: &mut attrs.normals,
            tangents: attrs.tangents.as_deref_mut(),
            bitangents: attrs.bitangents.as_deref_mut(),
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Split into `[0, mid)` and `[mid, len)`
    pub fn split_at(self, mid: usize) -> (Self, Self) {
        let (positions_a, positions_b) = self.positions.split_at_mut(mid);
        let (normals_a, normals_b) = self.normals.split_at_mut(mid);
        let (tangents_a, tangents_b) = split_optional(self.tangents, mid);
        let (bitangents_a, bitangents_b) = split_optional(self.bitangents, mid);
        (
            Self {
                positions: positions_a,
                normals: normals_a,
                tangents: tangents_a,
                bitangents: bitangents_a,
            },
            Self {
                positions: positions_b,
                normals: normals_b,
                tangents: tangents_b,
                bitangents: bitangents_b,
            },
        )
    }
}

fn split_optional<T>(slice: Option<&mut [T]>, mid: usize) -> (Option<&mut [T]>, Option<&mut [T]>) {
    match slice {
        Some(slice) => {
            let (a, b) = slice.split_at_mut(mid);
            (Some(a), Some(b))
        }
        None => (None, None),
    }
}

/// One independent unit of skinning work
#[derive(Debug)]
pub struct VertexBatch<'a> {
    /// Mesh index of the first vertex in this batch
    pub start: usize,
    pub outputs: VertexOutputs<'a>,
}

impl VertexBatch<'_> {
    /// Mesh vertex range covered by this batch
    pub fn range(&self) -> Range<usize> {
        self.start..self.start + self.outputs.len()
    }
}

/// Number of batches `vertex_count` vertices split into
pub fn batch_count(vertex_count: usize, vertices_per_batch: usize) -> usize {
    vertex_count.div_ceil(vertices_per_batch)
}

/// Partition outputs into consecutive batches of at most `vertices_per_batch`
pub fn split_batches(outputs: VertexOutputs<'_>, vertices_per_batch: usize) -> Vec<VertexBatch<'_>> {
    let vertex_count = outputs.len();
    let mut batches = Vec::with_capacity(batch_count(vertex_count, vertices_per_batch));
    let mut rest = outputs;
    let mut start = 0;

    while start < vertex_count {
        let len = vertices_per_batch.min(vertex_count - start);
        let (batch, tail) = rest.split_at(len);
        batches.push(VertexBatch { start, outputs: batch });
        rest = tail;
        start += len;
    }

    batches
}

/// Run `kernel` once per batch and wait for all of them.
///
/// A single batch, or `parallel == false`, runs inline on the calling thread.
/// Deformers only hold validated configs; a hand-built config with
/// `vertices_per_batch == 0` is treated as one vertex per batch.
/// Returns the number of batches.
pub fn dispatch<F>(outputs: VertexOutputs<'_>, config: &SkinningConfig, kernel: F) -> usize
where
    F: Fn(VertexBatch<'_>) + Send + Sync,
{
    let batches = split_batches(outputs, config.vertices_per_batch.max(1));
    let count = batches.len();

    if config.parallel && count > 1 {
        batches.into_par_iter().for_each(&kernel);
    } else {
        batches.into_iter().for_each(&kernel);
    }

    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn create_attrs(count: usize) -> VertexAttributes {
        VertexAttributes::new(vec![Vec3::ZERO; count], vec![Vec3::ZERO; count])
            .with_tangents(vec![Vec4::ZERO; count])
    }

    #[test]
    fn test_batch_count() {
        assert_eq!(batch_count(0, 10), 0);
        assert_eq!(batch_count(10, 10), 1);
        assert_eq!(batch_count(11, 10), 2);
        assert_eq!(batch_count(25_000, 10_000), 3);
    }

    #[test]
    fn test_split_covers_range_without_overlap() {
        let mut attrs = create_attrs(23);
        let batches = split_batches(VertexOutputs::new(&mut attrs), 5);

        let ranges: Vec<Range<usize>> = batches.iter().map(|b| b.range()).collect();
        assert_eq!(ranges, vec![0..5, 5..10, 10..15, 15..20, 20..23]);
        for batch in &batches {
            let len = batch.outputs.len();
            assert_eq!(batch.outputs.normals.len(), len);
            assert_eq!(batch.outputs.tangents.as_ref().unwrap().len(), len);
            assert!(batch.outputs.bitangents.is_none());
        }
    }

    #[test]
    fn test_empty_outputs() {
        let mut attrs = create_attrs(0);
        let outputs = VertexOutputs::new(&mut attrs);
        assert!(outputs.is_empty());
        assert!(split_batches(outputs, 8).is_empty());
    }

    #[test]
    fn test_dispatch_writes_every_vertex_once() {
        let mut attrs = create_attrs(1_003);
        let calls = AtomicUsize::new(0);

        let batches = dispatch(
            VertexOutputs::new(&mut attrs),
            &SkinningConfig::default().with_vertices_per_batch(100),
            |batch| {
                calls.fetch_add(1, Ordering::Relaxed);
                for (offset, p) in batch.outputs.positions.iter_mut().enumerate() {
                    *p += Vec3::new((batch.start + offset) as f32, 1.0, 0.0);
                }
            },
        );

        assert_eq!(batches, 11);
        assert_eq!(calls.load(Ordering::Relaxed), 11);
        for (i, p) in attrs.positions.iter().enumerate() {
            assert_eq!(*p, Vec3::new(i as f32, 1.0, 0.0));
        }
    }

    #[test]
    fn test_dispatch_inline() {
        let mut attrs = create_attrs(10);
        let thread = std::thread::current().id();

        let batches = dispatch(VertexOutputs::new(&mut attrs), &SkinningConfig::sequential(), |batch| {
            assert_eq!(std::thread::current().id(), thread);
            batch.outputs.positions.fill(Vec3::ONE);
        });

        assert_eq!(batches, 1);
        assert!(attrs.positions.iter().all(|p| *p == Vec3::ONE));
    }
}
