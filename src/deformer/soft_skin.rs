//! Linear blend skinning deformer
//!
//! Weighted sum of skinning matrices per vertex. Cheaper than dual-quaternion
//! blending but loses volume around twisting joints.

use super::batch::{self, VertexBatch, VertexOutputs};
use super::bone_table::{BoneEntry, BoneTable};
use super::{MeshDeformer, SkinningConfig};
use crate::animation::SkeletonPose;
use crate::core::{Mat4, NodeId, Result, Vec3, Vec4};
use crate::mesh::{self, MeshHandle, SkinningLayer, VertexAttributes};

/// Skin one batch of vertices
fn skin_batch(
    bones: &[BoneEntry<Mat4>],
    skin: &SkinningLayer,
    source: &VertexAttributes,
    batch: VertexBatch<'_>,
) {
    let VertexBatch { start, outputs } = batch;
    let VertexOutputs { positions, normals, mut tangents, mut bitangents } = outputs;

    for (offset, (position, normal)) in positions.iter_mut().zip(normals.iter_mut()).enumerate() {
        let vertex = start + offset;
        let mut skinned_position = Vec3::ZERO;
        let mut skinned_normal = Vec3::ZERO;
        let mut skinned_tangent = Vec3::ZERO;
        let mut skinned_bitangent = Vec3::ZERO;

        let tangent = source.tangents.as_deref().map_or(Vec4::ZERO, |t| t[vertex]);
        let bitangent = source.bitangents.as_deref().map_or(Vec3::ZERO, |b| b[vertex]);

        for influence in skin.influences(vertex) {
            let Some(bone) = influence.local_bone.and_then(|i| bones.get(i as usize)) else {
                continue;
            };
            let m = bone.transform;
            let w = influence.weight;
            skinned_position += m.transform_point3(source.positions[vertex]) * w;
            skinned_normal += m.transform_vector3(source.normals[vertex]) * w;
            skinned_tangent += m.transform_vector3(tangent.truncate()) * w;
            skinned_bitangent += m.transform_vector3(bitangent) * w;
        }

        *position = skinned_position;
        *normal = skinned_normal;
        if let Some(out) = tangents.as_deref_mut() {
            out[offset] = skinned_tangent.extend(tangent.w);
        }
        if let Some(out) = bitangents.as_deref_mut() {
            out[offset] = skinned_bitangent;
        }
    }
}

/// Skin every vertex of `source` into `outputs`, batched per `config`.
/// Returns the number of batches dispatched.
pub fn skin_vertices(
    bones: &BoneTable<Mat4>,
    skin: &SkinningLayer,
    source: &VertexAttributes,
    outputs: VertexOutputs<'_>,
    config: &SkinningConfig,
) -> usize {
    let bones = bones.entries();
    batch::dispatch(outputs, config, |batch| skin_batch(bones, skin, source, batch))
}

/// Mesh deformer applying linear blend skinning
#[derive(Debug)]
pub struct SoftSkinDeformer {
    mesh: MeshHandle,
    bones: BoneTable<Mat4>,
    config: SkinningConfig,
    enabled: bool,
}

impl SoftSkinDeformer {
    pub const TYPE_ID: u32 = 0x0000_0002;
    pub const SUBTYPE_ID: u32 = 0x0000_0001;

    /// Create a deformer for `mesh` with default settings
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

    pub fn bone_table(&self) -> &BoneTable<Mat4> {
        &self.bones
    }

    pub fn local_bone(&self, index: usize) -> Option<NodeId> {
        self.bones.node(index)
    }

    pub fn reserve_local_bones(&mut self, count: usize) {
        self.bones.reserve(count);
    }

    pub fn find_local_bone_index(&self, node: NodeId) -> Option<usize> {
        self.bones.find_local_bone_index(node)
    }
}

impl MeshDeformer for SoftSkinDeformer {
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
            "Linear skinned {} vertices in {} batches (node {}, dt {:.4})",
            vertex_count, batches, node, time_delta
        );
        Ok(())
    }

    fn reinitialize(&mut self, pose: &dyn SkeletonPose, node: NodeId, lod_level: usize) -> Result<()> {
        let mut mesh = mesh::write_mesh(&self.mesh)?;
        let mesh_name = mesh.name().to_string();
        let stats = self.bones.rebuild(pose, mesh.require_skin_mut()?);

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
