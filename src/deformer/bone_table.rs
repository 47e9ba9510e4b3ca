//! Local bone table: the distinct skeleton nodes a skinned mesh references,
//! each with its precomputed skinning transform.
//!
//! The table is rebuilt wholesale on reinitialize (first-seen order over the
//! mesh's influences) and only has its transforms overwritten on update. The
//! position of an entry is the local bone index stored in the mesh influences.

use crate::animation::SkeletonPose;
use crate::core::{Mat4, NodeId};
use crate::math::DualQuat;
use crate::mesh::SkinningLayer;

/// A transform representation a bone table can precompute from a skinning
/// matrix (`global * inverse_bind`).
pub trait SkinningTransform: Copy + Send + Sync + std::fmt::Debug + PartialEq {
    fn from_skinning_matrix(matrix: Mat4) -> Self;
}

impl SkinningTransform for DualQuat {
    fn from_skinning_matrix(matrix: Mat4) -> Self {
        DualQuat::from_mat4(matrix)
    }
}

impl SkinningTransform for Mat4 {
    fn from_skinning_matrix(matrix: Mat4) -> Self {
        matrix
    }
}

/// A skeleton node referenced by the mesh and its skinning transform
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoneEntry<T = DualQuat> {
    pub node: NodeId,
    pub transform: T,
}

/// Outcome of a table rebuild
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RebuildStats {
    pub bone_count: usize,
    pub vertex_count: usize,
    /// Influences whose node the pose could not resolve
    pub skipped_influences: usize,
}

/// Ordered, node-unique list of bone entries
#[derive(Clone, Debug, PartialEq)]
pub struct BoneTable<T = DualQuat> {
    entries: Vec<BoneEntry<T>>,
}

impl<T: SkinningTransform> BoneTable<T> {
    /// Create an empty table
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Reserve room for `additional` more bones. Length is unchanged.
    pub fn reserve(&mut self, additional: usize) {
        self.entries.reserve(additional);
    }

    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// All entries in local bone order
    pub fn entries(&self) -> &[BoneEntry<T>] {
        &self.entries
    }

    pub fn get(&self, local_bone: usize) -> Option<&BoneEntry<T>> {
        self.entries.get(local_bone)
    }

    /// Skeleton node of a local bone
    pub fn node(&self, local_bone: usize) -> Option<NodeId> {
        self.entries.get(local_bone).map(|entry| entry.node)
    }

    /// Local bone index of a skeleton node (linear search)
    pub fn find_local_bone_index(&self, node: NodeId) -> Option<usize> {
        self.entries.iter().position(|entry| entry.node == node)
    }

    /// Append an entry for `node` unless one exists.
    /// Returns the local bone index; an existing entry is left untouched.
    pub fn insert(&mut self, node: NodeId, transform: T) -> usize {
        if let Some(index) = self.find_local_bone_index(node) {
            return index;
        }
        self.entries.push(BoneEntry { node, transform });
        self.entries.len() - 1
    }

    /// Clear and rebuild from the mesh influences, writing each influence's
    /// local bone index back into the layer.
    ///
    /// Influences whose node the pose cannot resolve get `local_bone = None`
    /// and are skipped by skinning. Remaining weights are not renormalized.
    pub fn rebuild(&mut self, pose: &dyn SkeletonPose, skin: &mut SkinningLayer) -> RebuildStats {
        self.clear();

        let vertex_count = skin.vertex_count();
        let mut skipped_influences = 0;

        for influence in skin.all_influences_mut() {
            influence.local_bone = match self.find_local_bone_index(influence.node) {
                Some(index) => Some(index as u32),
                None => match pose.skinning_matrix(influence.node) {
                    Some(matrix) => {
                        self.entries.push(BoneEntry {
                            node: influence.node,
                            transform: T::from_skinning_matrix(matrix),
                        });
                        Some((self.entries.len() - 1) as u32)
                    }
                    None => {
                        skipped_influences += 1;
                        None
                    }
                },
            };
        }

        RebuildStats {
            bone_count: self.entries.len(),
            vertex_count,
            skipped_influences,
        }
    }

    /// Recompute every entry's skinning transform from the current pose.
    ///
    /// Entries the pose can no longer resolve keep their previous transform.
    /// Returns how many entries were left stale.
    pub fn refresh(&mut self, pose: &dyn SkeletonPose) -> usize {
        let mut stale = 0;
        for entry in &mut self.entries {
            match pose.skinning_matrix(entry.node) {
                Some(matrix) => entry.transform = T::from_skinning_matrix(matrix),
                None => stale += 1,
            }
        }
        stale
    }
}

impl<T: SkinningTransform> Default for BoneTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{SkeletonBuilder, SkeletonInstance};
    use crate::core::{Quat, Vec3};
    use std::sync::Arc;

    // Nodes: a=0, b=1, c=2, d=3
    fn create_test_pose() -> SkeletonInstance {
        let skeleton = SkeletonBuilder::new()
            .add_root("a", Mat4::IDENTITY)
            .add_bone("b", "a", Mat4::from_translation(Vec3::Y))
            .add_bone("c", "b", Mat4::from_translation(Vec3::Y))
            .add_bone("d", "c", Mat4::from_translation(Vec3::Y))
            .build()
            .unwrap();
        SkeletonInstance::new(Arc::new(skeleton))
    }

    #[test]
    fn test_growth_order_and_uniqueness() {
        let pose = create_test_pose();
        let mut skin = SkinningLayer::from_weights(vec![
            vec![(0, 1.0)],
            vec![(1, 0.5), (2, 0.5)],
            vec![(0, 1.0)],
            vec![(3, 1.0)],
        ]);

        let mut table = BoneTable::<DualQuat>::new();
        let stats = table.rebuild(&pose, &mut skin);

        let nodes: Vec<NodeId> = table.entries().iter().map(|e| e.node).collect();
        assert_eq!(nodes, vec![0, 1, 2, 3]);
        assert_eq!(stats.bone_count, 4);
        assert_eq!(stats.vertex_count, 4);
        assert_eq!(stats.skipped_influences, 0);
    }

    #[test]
    fn test_first_seen_order_differs_from_node_order() {
        let pose = create_test_pose();
        let mut skin = SkinningLayer::from_weights(vec![
            vec![(2, 1.0)],
            vec![(0, 0.5), (2, 0.5)],
            vec![(3, 1.0)],
        ]);

        let mut table = BoneTable::<Mat4>::new();
        table.rebuild(&pose, &mut skin);

        assert_eq!(table.node(0), Some(2));
        assert_eq!(table.node(1), Some(0));
        assert_eq!(table.node(2), Some(3));
        assert_eq!(skin.influences(1)[0].local_bone, Some(1));
        assert_eq!(skin.influences(1)[1].local_bone, Some(0));
        assert_eq!(skin.influences(2)[0].local_bone, Some(2));
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let pose = create_test_pose();
        let mut skin = SkinningLayer::from_weights(vec![vec![(3, 0.5), (1, 0.5)], vec![(0, 1.0)]]);

        let mut table = BoneTable::<DualQuat>::new();
        table.rebuild(&pose, &mut skin);
        let first = table.clone();
        let first_skin = skin.clone();

        table.rebuild(&pose, &mut skin);
        assert_eq!(table, first);
        assert_eq!(skin, first_skin);
    }

    #[test]
    fn test_rebuild_clears_previous_contents() {
        let pose = create_test_pose();
        let mut table = BoneTable::<DualQuat>::new();
        table.insert(3, DualQuat::IDENTITY);
        table.insert(2, DualQuat::IDENTITY);

        let mut skin = SkinningLayer::from_weights(vec![vec![(1, 1.0)]]);
        table.rebuild(&pose, &mut skin);
        assert_eq!(table.len(), 1);
        assert_eq!(table.node(0), Some(1));
    }

    #[test]
    fn test_unresolved_nodes_are_skipped() {
        let pose = create_test_pose();
        let mut skin = SkinningLayer::from_weights(vec![vec![(1, 0.6), (42, 0.4)], vec![(42, 1.0)]]);

        let mut table = BoneTable::<DualQuat>::new();
        let stats = table.rebuild(&pose, &mut skin);

        assert_eq!(stats.bone_count, 1);
        assert_eq!(stats.skipped_influences, 2);
        assert_eq!(table.find_local_bone_index(42), None);
        assert_eq!(skin.influences(0)[0].local_bone, Some(0));
        assert_eq!(skin.influences(0)[1].local_bone, None);
        // Weights are left as authored
        assert_eq!(skin.influences(0)[0].weight, 0.6);
    }

    #[test]
    fn test_find_local_bone_index() {
        let mut table = BoneTable::<DualQuat>::new();
        assert_eq!(table.find_local_bone_index(5), None);

        assert_eq!(table.insert(5, DualQuat::IDENTITY), 0);
        assert_eq!(table.insert(9, DualQuat::IDENTITY), 1);
        assert_eq!(table.insert(5, DualQuat::ZERO), 0);

        assert_eq!(table.len(), 2);
        assert_eq!(table.find_local_bone_index(9), Some(1));
        assert_eq!(table.get(0).unwrap().transform, DualQuat::IDENTITY);
        assert_eq!(table.node(7), None);
    }

    #[test]
    fn test_reserve_keeps_length() {
        let mut table = BoneTable::<Mat4>::new();
        table.reserve(128);
        assert!(table.capacity() >= 128);
        assert_eq!(table.len(), 0);
        assert!(table.is_empty());
    }

    #[test]
    fn test_refresh_follows_pose() {
        let mut pose = create_test_pose();
        let mut skin = SkinningLayer::from_weights(vec![vec![(2, 1.0)]]);
        let mut table = BoneTable::<DualQuat>::new();
        table.rebuild(&pose, &mut skin);
        assert!((table.entries()[0].transform.translation()).length() < 1e-5);

        pose.set_local_transform(0, Mat4::from_translation(Vec3::new(3.0, 0.0, 0.0))).unwrap();
        pose.update_world_transforms();
        assert_eq!(table.refresh(&pose), 0);

        let dq = table.entries()[0].transform;
        assert!((dq.translation() - Vec3::new(3.0, 0.0, 0.0)).length() < 1e-5);
        assert!((dq.rotation().dot(Quat::IDENTITY).abs() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_refresh_keeps_stale_entries() {
        let pose = create_test_pose();
        let mut table = BoneTable::<Mat4>::new();
        let marker = Mat4::from_translation(Vec3::splat(7.0));
        table.insert(100, marker);
        table.insert(1, marker);

        assert_eq!(table.refresh(&pose), 1);
        assert_eq!(table.entries()[0].transform, marker);
        assert!(table.entries()[1].transform.abs_diff_eq(Mat4::IDENTITY, 1e-5));
    }
}
