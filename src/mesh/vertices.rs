//! Per-vertex attribute buffers

use crate::core::{Error, Result, Vec3, Vec4};

/// Parallel per-vertex attribute arrays, indexed 1:1 by vertex.
///
/// Used both for the bind-pose source data and for deformed output.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VertexAttributes {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    /// xyz = tangent direction, w = bitangent handedness
    pub tangents: Option<Vec<Vec4>>,
    pub bitangents: Option<Vec<Vec3>>,
}

impl VertexAttributes {
    /// Create from positions and normals
    pub fn new(positions: Vec<Vec3>, normals: Vec<Vec3>) -> Self {
        Self {
            positions,
            normals,
            tangents: None,
            bitangents: None,
        }
    }

    /// Attach tangents
    pub fn with_tangents(mut self, tangents: Vec<Vec4>) -> Self {
        self.tangents = Some(tangents);
        self
    }

    /// Attach bitangents
    pub fn with_bitangents(mut self, bitangents: Vec<Vec3>) -> Self {
        self.bitangents = Some(bitangents);
        self
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Check that every present array has one entry per vertex
    pub fn validate(&self) -> Result<()> {
        let count = self.positions.len();
        let mismatch = |what: &str, len: usize| {
            Err(Error::Mesh(format!("{} has {} entries, expected {}", what, len, count)))
        };

        if self.normals.len() != count {
            return mismatch("normals", self.normals.len());
        }
        if let Some(tangents) = &self.tangents {
            if tangents.len() != count {
                return mismatch("tangents", tangents.len());
            }
        }
        if let Some(bitangents) = &self.bitangents {
            if bitangents.len() != count {
                return mismatch("bitangents", bitangents.len());
            }
        }
        Ok(())
    }

    /// Positions as raw bytes for buffer upload
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    /// Normals as raw bytes for buffer upload
    pub fn normal_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.normals)
    }
}
