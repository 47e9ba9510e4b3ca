//! Skeleton pose providers consumed by mesh deformers

use std::sync::Arc;

use super::Skeleton;
use crate::core::{Error, Mat4, NodeId, Result};

/// Source of per-node transforms for skinning.
///
/// `global_transform(node) * inverse_bind_transform(node)` is the skinning
/// transform of a node. Both return `None` for nodes the provider cannot
/// resolve.
pub trait SkeletonPose: Sync {
    /// Number of nodes the provider knows about
    fn node_count(&self) -> usize;

    /// Current world-space transform of a node
    fn global_transform(&self, node: NodeId) -> Option<Mat4>;

    /// Inverse of the node's world-space bind pose
    fn inverse_bind_transform(&self, node: NodeId) -> Option<Mat4>;

    /// Skinning matrix of a node, `global * inverse_bind`
    fn skinning_matrix(&self, node: NodeId) -> Option<Mat4> {
        Some(self.global_transform(node)? * self.inverse_bind_transform(node)?)
    }
}

/// A posed instance of a shared skeleton
#[derive(Clone, Debug)]
pub struct SkeletonInstance {
    skeleton: Arc<Skeleton>,
    local_transforms: Vec<Mat4>,
    world_transforms: Vec<Mat4>,
}

impl SkeletonInstance {
    /// Create an instance in bind pose
    pub fn new(skeleton: Arc<Skeleton>) -> Self {
        let local_transforms = skeleton.bind_local_transforms();
        let world_transforms = skeleton.calculate_world_transforms(&local_transforms);
        Self {
            skeleton,
            local_transforms,
            world_transforms,
        }
    }

    /// The shared skeleton
    pub fn skeleton(&self) -> &Arc<Skeleton> {
        &self.skeleton
    }

    /// Set the local transform of a bone.
    /// World transforms are stale until `update_world_transforms` is called.
    pub fn set_local_transform(&mut self, node: NodeId, transform: Mat4) -> Result<()> {
        let slot = self
            .local_transforms
            .get_mut(node)
            .ok_or_else(|| Error::Skeleton(format!("node {} out of range", node)))?;
        *slot = transform;
        Ok(())
    }

    /// Current local transforms, in node order
    pub fn local_transforms(&self) -> &[Mat4] {
        &self.local_transforms
    }

    /// World transforms as of the last update
    pub fn world_transforms(&self) -> &[Mat4] {
        &self.world_transforms
    }

    /// Return every bone to its bind pose
    pub fn reset_to_bind_pose(&mut self) {
        self.local_transforms = self.skeleton.bind_local_transforms();
        self.update_world_transforms();
    }

    /// Recompute world transforms from the local pose
    pub fn update_world_transforms(&mut self) {
        self.world_transforms = self.skeleton.calculate_world_transforms(&self.local_transforms);
    }
}

impl SkeletonPose for SkeletonInstance {
    fn node_count(&self) -> usize {
        self.skeleton.bone_count()
    }

    fn global_transform(&self, node: NodeId) -> Option<Mat4> {
        self.world_transforms.get(node).copied()
    }

    fn inverse_bind_transform(&self, node: NodeId) -> Option<Mat4> {
        self.skeleton.get_bone(node).map(|bone| bone.inverse_bind_pose)
    }
}
