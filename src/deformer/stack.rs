//! Ordered collection of deformers applied to one mesh

use super::MeshDeformer;
use crate::animation::SkeletonPose;
use crate::core::{NodeId, Result};
use crate::mesh::MeshHandle;

/// Deformers run in insertion order on each update.
pub struct MeshDeformerStack {
    mesh: MeshHandle,
    deformers: Vec<Box<dyn MeshDeformer>>,
}

impl MeshDeformerStack {
    pub fn new(mesh: MeshHandle) -> Self {
        Self {
            mesh,
            deformers: Vec::new(),
        }
    }

    pub fn mesh(&self) -> &MeshHandle {
        &self.mesh
    }

    pub fn add_deformer(&mut self, deformer: Box<dyn MeshDeformer>) {
        self.deformers.push(deformer);
    }

    /// Insert at `index`, clamped to the end of the stack
    pub fn insert_deformer(&mut self, index: usize, deformer: Box<dyn MeshDeformer>) {
        let index = index.min(self.deformers.len());
        self.deformers.insert(index, deformer);
    }

    /// Remove every deformer of the given type. Returns how many were removed.
    pub fn remove_deformers_of_type(&mut self, deformer_type: u32) -> usize {
        let before = self.deformers.len();
        self.deformers.retain(|d| d.deformer_type() != deformer_type);
        before - self.deformers.len()
    }

    pub fn has_deformer_of_type(&self, deformer_type: u32) -> bool {
        self.deformers.iter().any(|d| d.deformer_type() == deformer_type)
    }

    pub fn find_deformer(&self, deformer_type: u32, sub_type: u32) -> Option<&dyn MeshDeformer> {
        self.deformers
            .iter()
            .find(|d| d.deformer_type() == deformer_type && d.sub_type() == sub_type)
            .map(|d| d.as_ref())
    }

    pub fn find_deformer_mut(&mut self, deformer_type: u32, sub_type: u32) -> Option<&mut Box<dyn MeshDeformer>> {
        self.deformers
            .iter_mut()
            .find(|d| d.deformer_type() == deformer_type && d.sub_type() == sub_type)
    }

    pub fn deformer_count(&self) -> usize {
        self.deformers.len()
    }

    pub fn deformers(&self) -> &[Box<dyn MeshDeformer>] {
        &self.deformers
    }

    /// Run every enabled deformer. Stops at the first error.
    pub fn update(&mut self, pose: &dyn SkeletonPose, node: NodeId, time_delta: f32) -> Result<()> {
        for deformer in self.deformers.iter_mut().filter(|d| d.is_enabled()) {
            deformer.update(pose, node, time_delta)?;
        }
        Ok(())
    }

    /// Reinitialize every deformer, enabled or not
    pub fn reinitialize(&mut self, pose: &dyn SkeletonPose, node: NodeId, lod_level: usize) -> Result<()> {
        for deformer in &mut self.deformers {
            deformer.reinitialize(pose, node, lod_level)?;
        }
        log::debug!("Reinitialized {} deformers for node {}", self.deformers.len(), node);
        Ok(())
    }

    /// Clone the stack for another mesh, cloning each deformer in order
    pub fn clone_for(&self, mesh: MeshHandle) -> Self {
        let deformers = self.deformers.iter().map(|d| d.clone_for(mesh.clone())).collect();
        Self { mesh, deformers }
    }
}
