//! Mesh deformers
//!
//! A deformer rewrites a mesh's deformed attributes from its bind-pose
//! attributes each frame. Skinning deformers resolve the mesh's influences
//! against a skeleton pose once on [`MeshDeformer::reinitialize`] and then
//! blend per-vertex on every [`MeshDeformer::update`].

pub mod batch;
pub mod bone_table;
pub mod config;
pub mod dual_quat_skin;
pub mod soft_skin;
pub mod stack;

pub use bone_table::{BoneEntry, BoneTable, RebuildStats, SkinningTransform};
pub use config::{SkinningConfig, SkinningMethod, DEFAULT_VERTICES_PER_BATCH};
pub use dual_quat_skin::DualQuatSkinDeformer;
pub use soft_skin::SoftSkinDeformer;
pub use stack::MeshDeformerStack;

use crate::animation::SkeletonPose;
use crate::core::{NodeId, Result};
use crate::mesh::MeshHandle;

/// A deformer attached to one mesh.
///
/// `node` identifies the scene node the mesh is attached to and is only
/// used for diagnostics by the skinning deformers.
pub trait MeshDeformer: Send + Sync {
    /// Deform the mesh for the current pose
    fn update(&mut self, pose: &dyn SkeletonPose, node: NodeId, time_delta: f32) -> Result<()>;

    /// Rebuild internal state after the mesh or skeleton changed
    fn reinitialize(&mut self, pose: &dyn SkeletonPose, node: NodeId, lod_level: usize) -> Result<()>;

    /// Create an equivalent deformer for another mesh.
    /// The clone keeps settings but must be reinitialized before use.
    fn clone_for(&self, mesh: MeshHandle) -> Box<dyn MeshDeformer>;

    fn deformer_type(&self) -> u32;

    fn sub_type(&self) -> u32;

    fn mesh(&self) -> &MeshHandle;

    fn is_enabled(&self) -> bool;

    fn set_enabled(&mut self, enabled: bool);

    /// Number of distinct bones referenced by the mesh after the last reinitialize
    fn num_local_bones(&self) -> usize;
}

/// Create the skinning deformer selected by `config.method`.
/// Fails with `Error::Config` if `config` does not validate.
pub fn create_skin_deformer(mesh: MeshHandle, config: SkinningConfig) -> Result<Box<dyn MeshDeformer>> {
    Ok(match config.method {
        SkinningMethod::Linear => Box::new(SoftSkinDeformer::with_config(mesh, config)?),
        SkinningMethod::DualQuaternion => Box::new(DualQuatSkinDeformer::with_config(mesh, config)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Vec3;
    use crate::mesh::{Mesh, VertexAttributes};

    fn create_test_handle() -> MeshHandle {
        Mesh::new("quad", VertexAttributes::new(vec![Vec3::ZERO; 4], vec![Vec3::Z; 4]))
            .unwrap()
            .into_handle()
    }

    #[test]
    fn test_factory_selects_method() {
        let deformer = create_skin_deformer(create_test_handle(), SkinningConfig::default()).unwrap();
        assert_eq!(deformer.deformer_type(), DualQuatSkinDeformer::TYPE_ID);
        assert_eq!(deformer.sub_type(), DualQuatSkinDeformer::SUBTYPE_ID);

        let config = SkinningConfig::default().with_method(SkinningMethod::Linear);
        let deformer = create_skin_deformer(create_test_handle(), config).unwrap();
        assert_eq!(deformer.deformer_type(), SoftSkinDeformer::TYPE_ID);
        assert_eq!(deformer.sub_type(), SoftSkinDeformer::SUBTYPE_ID);
    }

    #[test]
    fn test_factory_rejects_invalid_config() {
        for method in [SkinningMethod::Linear, SkinningMethod::DualQuaternion] {
            let config = SkinningConfig::default().with_method(method).with_vertices_per_batch(0);
            assert!(matches!(
                create_skin_deformer(create_test_handle(), config),
                Err(crate::core::Error::Config(_))
            ));
        }
    }

    #[test]
    fn test_new_deformer_is_enabled_and_empty() {
        let handle = create_test_handle();
        let deformer = create_skin_deformer(handle.clone(), SkinningConfig::sequential()).unwrap();
        assert!(deformer.is_enabled());
        assert_eq!(deformer.num_local_bones(), 0);
        assert!(std::sync::Arc::ptr_eq(deformer.mesh(), &handle));
    }
}
