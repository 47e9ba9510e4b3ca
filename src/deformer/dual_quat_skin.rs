//! Dual-quaternion skinning deformer
//!
//! Each frame the bone table's dual quaternions are refreshed from the pose,
//! then every vertex blends the dual quaternions of its influences,
//! normalizes the blend and applies it to the bind-pose attributes. Blending
//! dual quaternions instead of matrices keeps twisted joints from collapsing
//! ("candy-wrapper" artifacts of linear blend skinning).

use super::batch::{self, VertexBatch, VertexOutputs};
use super::bone_table::{BoneEntry, BoneTable};
use super::{MeshDeformer, SkinningConfig};
use crate::animation::SkeletonPose;
use crate::core::{NodeId, Result};
use crate::math::DualQuat;
use crate::mesh::{self, MeshHandle, SkinInfluence, SkinningLayer, VertexAttributes};

/// Blend the influences of one vertex into a unit dual quaternion.
///
/// Each bone's dual quaternion is flipped into the hemisphere of the first
/// resolved influence before being weighted, since `q` and `-q` encode the
/// same transform but cancel when added. Unresolved influences are skipped
/// without renormalizing the remaining weights. A vertex with no resolved
/// weight produces a non-finite result.
#[inline]
pub fn blend_vertex(bones: &[BoneEntry<DualQuat>], influences: &[SkinInfluence]) -> DualQuat {
    let mut blended = DualQuat::ZERO;
    let mut pivot = None;

    for influence in influences {
        let Some(bone) = influence.local_bone.and_then(|i| bones.get(i as usize)) else {
            continue;
        };
        let dq = bone.transform;
        let reference = *pivot.get_or_insert(dq.real);
        let weight = if reference.dot(dq.real) < 0.0 {
            -influence.weight
        } else {
            influence.weight
        };
        blended = blended + dq * weight;
    }

    blended.normalize()
}

/// Skin one batch of vertices
fn skin_batch(
    bones: &[BoneEntry<DualQuat>],
    skin: &SkinningLayer,
    source: &VertexAttributes,
    batch: VertexBatch<'_>,
) {
    let VertexBatch { start, outputs } = batch;
    let VertexOutputs { positions, normals, mut tangents, mut bitangents } = outputs;

    for (offset, (position, normal)) in positions.iter_mut().zip(normals.iter_mut()).enumerate() {
        let vertex = start + offset;
        let dq = blend_vertex(bones, skin.influences(vertex));

        *position = dq.transform_point(source.positions[vertex]);
        *normal = dq.transform_vector(source.normals[vertex]);

        if let (Some(out), Some(src)) = (tangents.as_deref_mut(), source.tangents.as_deref()) {
            out[offset] = dq.transform_tangent(src[vertex]);
        }
        if let (Some(out), Some(src)) = (bitangents.as_deref_mut(), source.bitangents.as_deref()) {
            out[offset] = dq.transform_vector(src[vertex]);
        }
    }
}

/// Skin every vertex of `source` into `outputs`, batched per `config`.
/// Returns the number of batches dispatched.
pub fn skin_vertices(
    bones: &BoneTable<DualQuat>,
    skin: &SkinningLayer,
    source: &VertexAttributes,
    outputs: VertexOutputs<'_>,
    config: &SkinningConfig,
) -> usize {
    let bones = bones.entries();
    batch::dispatch(outputs, config, |batch| skin_batch(bones, skin, source, batch))
}

/// Mesh deformer applying dual-quaternion skinning
#[derive(Debug)]
pub struct DualQuatSkinDeformer {
    mesh: MeshHandle,
    bones: BoneTable<DualQuat>,
    config: SkinningConfig,
    lod_level: usize,
    enabled: bool,
}

impl DualQuatSkinDeformer {
    pub const TYPE_ID: u32 = 0x0000_0003;
    pub const SUBTYPE_ID: u32 = 0x0000_0002;

    /// Create a deformer for `mesh` with default settings.
    /// The bone table is empty until `reinitialize`.
    pub fn create(mesh: MeshHandle) -> Self {
        Self::from_valid_config(mesh, SkinningConfig::default())
    }

    /// Create with explicit settings, rejecting invalid ones
    pub fn with_config(mesh: MeshHandle, config: SkinningConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(mesh, config))
    }

    fn from_valid_config(mesh: MeshHandle, config: SkinningConfig) -> Self {
        Self {
            mesh,
            bones: BoneTable::new(),
            config,
            lod_level: 0,
            enabled: true,
        }
    }

    pub fn config(&self) -> &SkinningConfig {
        &self.config
    }

    /// Replace the settings, rejecting invalid ones
    pub fn set_config(&mut self, config: SkinningConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// LOD level of the last reinitialize
    pub fn lod_level(&self) -> usize {
        self.lod_level
    }

    pub fn bone_table(&self) -> &BoneTable<DualQuat> {
        &self.bones
    }

    /// Skeleton node of a local bone
    pub fn local_bone(&self, index: usize) -> Option<NodeId> {
        self.bones.node(index)
    }

    /// Pre-allocate room for `count` local bones
    pub fn reserve_local_bones(&mut self, count: usize) {
        self.bones.reserve(count);
    }

    /// Local bone index of a skeleton node
    pub fn find_local_bone_index(&self, node: NodeId) -> Option<usize> {
        self.bones.find_local_bone_index(node)
    }
}

impl MeshDeformer for DualQuatSkinDeformer {
    fn update(&mut self, pose: &dyn SkeletonPose, node: NodeId, time_delta: f32) -> Result<()> {
        let stale = self.bones.refresh(pose);
        if stale > 0 {
            log::debug!("{} local bones unresolved by pose, keeping previous transforms", stale);
        }

        let mut mesh = mesh::write_mesh(&self.mesh)?;
        let (source, deformed, skin) = mesh.skinning_parts_mut()?;
        let vertex_count = source.vertex_count();
        let batches = skin_vertices(&self.bones, skin, source, VertexOutputs::new(deformed), &self.config);

        log::trace!(
            "Dual quat skinned {} vertices in {} batches (node {}, dt {:.4})",
            vertex_count, batches, node, time_delta
        );
        Ok(())
    }

    fn reinitialize(&mut self, pose: &dyn SkeletonPose, node: NodeId, lod_level: usize) -> Result<()> {
        let mut mesh = mesh::write_mesh(&self.mesh)?;
        let mesh_name = mesh.name().to_string();
        let stats = self.bones.rebuild(pose, mesh.require_skin_mut()?);
        self.lod_level = lod_level;

        log::debug!(
            "Rebuilt bone table for '{}' (node {}, lod {}): {} bones over {} vertices",
            mesh_name, node, lod_level, stats.bone_count, stats.vertex_count
        );
        if stats.skipped_influences > 0 {
            log::warn!(
                "Skipped {} influences in '{}' referencing nodes the skeleton cannot resolve",
                stats.skipped_influences, mesh_name
            );
        }
        Ok(())
    }

    fn clone_for(&self, mesh: MeshHandle) -> Box<dyn MeshDeformer> {
        let mut clone = Self::from_valid_config(mesh, self.config.clone());
        clone.enabled = self.enabled;
        Box::new(clone)
    }

    fn deformer_type(&self) -> u32 {
        Self::TYPE_ID
    }

    fn sub_type(&self) -> u32 {
        Self::SUBTYPE_ID
    }

    fn mesh(&self) -> &MeshHandle {
        &self.mesh
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn num_local_bones(&self) -> usize {
        self.bones.len()
    }
}
