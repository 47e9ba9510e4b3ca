//! Skinned mesh data: bind-pose source, deformed output and skin influences

pub mod skin;
pub mod vertices;

pub use skin::{SkinInfluence, SkinningLayer};
pub use vertices::VertexAttributes;

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::core::{Error, Result};

/// Shared, lockable mesh used by deformers
pub type MeshHandle = Arc<RwLock<Mesh>>;

/// A mesh with bind-pose attributes, deformed output and optional skinning
#[derive(Clone, Debug)]
pub struct Mesh {
    name: String,
    bind: VertexAttributes,
    deformed: VertexAttributes,
    skin: Option<SkinningLayer>,
}

impl Mesh {
    /// Create a mesh. Output buffers start as a copy of the bind pose.
    pub fn new(name: impl Into<String>, bind: VertexAttributes) -> Result<Self> {
        bind.validate()?;
        Ok(Self {
            name: name.into(),
            deformed: bind.clone(),
            bind,
            skin: None,
        })
    }

    /// Attach a skinning layer
    pub fn with_skin(mut self, skin: SkinningLayer) -> Result<Self> {
        self.set_skin(skin)?;
        Ok(self)
    }

    /// Replace the skinning layer.
    ///
    /// Local bone indices in `skin` are cleared; deformers must be
    /// reinitialized before the new layer contributes to skinning.
    pub fn set_skin(&mut self, mut skin: SkinningLayer) -> Result<()> {
        if skin.vertex_count() != self.vertex_count() {
            return Err(Error::Mesh(format!(
                "skinning layer has {} vertices, mesh '{}' has {}",
                skin.vertex_count(),
                self.name,
                self.vertex_count()
            )));
        }
        for influence in skin.all_influences_mut() {
            influence.local_bone = None;
        }
        self.skin = Some(skin);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertex_count(&self) -> usize {
        self.bind.vertex_count()
    }

    /// Bind-pose source attributes
    pub fn bind(&self) -> &VertexAttributes {
        &self.bind
    }

    /// Deformed output attributes
    pub fn deformed(&self) -> &VertexAttributes {
        &self.deformed
    }

    pub fn skin(&self) -> Option<&SkinningLayer> {
        self.skin.as_ref()
    }

    /// Detach the skinning layer. Deformers fail until a new one is set.
    pub fn take_skin(&mut self) -> Option<SkinningLayer> {
        self.skin.take()
    }

    /// Skinning layer, or an error naming the mesh if it has none.
    /// Crate-internal so the layer cannot be swapped past `set_skin`'s check.
    pub(crate) fn require_skin_mut(&mut self) -> Result<&mut SkinningLayer> {
        match self.skin.as_mut() {
            Some(skin) => Ok(skin),
            None => Err(Error::Mesh(format!("mesh '{}' has no skinning layer", self.name))),
        }
    }

    /// Deformed output attributes, mutably
    pub fn deformed_mut(&mut self) -> &mut VertexAttributes {
        &mut self.deformed
    }

    /// Copy the bind pose into the output buffers
    pub fn reset_deformed(&mut self) {
        self.deformed.clone_from(&self.bind);
    }

    /// Borrow source, output and skin at once for skinning.
    ///
    /// Fails if the skinning layer or any output array no longer has one
    /// entry per bind-pose vertex.
    pub fn skinning_parts_mut(
        &mut self,
    ) -> Result<(&VertexAttributes, &mut VertexAttributes, &SkinningLayer)> {
        let Some(skin) = &self.skin else {
            return Err(Error::Mesh(format!("mesh '{}' has no skinning layer", self.name)));
        };

        let vertex_count = self.bind.vertex_count();
        if skin.vertex_count() != vertex_count {
            return Err(Error::Mesh(format!(
                "skinning layer has {} vertices, mesh '{}' has {}",
                skin.vertex_count(),
                self.name,
                vertex_count
            )));
        }
        if self.deformed.vertex_count() != vertex_count {
            return Err(Error::Mesh(format!(
                "deformed output of '{}' has {} vertices, bind pose has {}",
                self.name,
                self.deformed.vertex_count(),
                vertex_count
            )));
        }
        self.deformed.validate()?;

        Ok((&self.bind, &mut self.deformed, skin))
    }

    /// Wrap in a shared handle
    pub fn into_handle(self) -> MeshHandle {
        Arc::new(RwLock::new(self))
    }
}

/// Read-lock a shared mesh
pub fn read_mesh(mesh: &MeshHandle) -> Result<RwLockReadGuard<'_, Mesh>> {
    mesh.read()
        .map_err(|_| Error::Mesh("mesh lock poisoned".into()))
}

/// Write-lock a shared mesh
pub fn write_mesh(mesh: &MeshHandle) -> Result<RwLockWriteGuard<'_, Mesh>> {
    mesh.write()
        .map_err(|_| Error::Mesh("mesh lock poisoned".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Vec3;

    fn create_test_mesh() -> Mesh {
        let bind = VertexAttributes::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            vec![Vec3::Z; 3],
        );
        Mesh::new("tri", bind).unwrap()
    }

    #[test]
    fn test_mesh_creation() {
        let mesh = create_test_mesh();
        assert_eq!(mesh.name(), "tri");
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.deformed(), mesh.bind());
        assert!(mesh.skin().is_none());
    }

    #[test]
    fn test_invalid_attributes_rejected() {
        let bind = VertexAttributes::new(vec![Vec3::ZERO; 2], vec![Vec3::Z; 1]);
        assert!(Mesh::new("bad", bind).is_err());
    }

    #[test]
    fn test_skin_vertex_count_must_match() {
        let mesh = create_test_mesh();
        let layer = SkinningLayer::from_weights(vec![vec![(0, 1.0)]; 2]);
        assert!(matches!(mesh.with_skin(layer), Err(Error::Mesh(_))));

        let layer = SkinningLayer::from_weights(vec![vec![(0, 1.0)]; 3]);
        let mesh = create_test_mesh().with_skin(layer).unwrap();
        assert_eq!(mesh.skin().unwrap().vertex_count(), 3);
    }

    #[test]
    fn test_reset_deformed() {
        let mut mesh = create_test_mesh();
        mesh.deformed_mut().positions[1] = Vec3::splat(9.0);
        assert_ne!(mesh.deformed(), mesh.bind());

        mesh.reset_deformed();
        assert_eq!(mesh.deformed(), mesh.bind());
    }

    #[test]
    fn test_missing_skin_is_an_error() {
        let mut mesh = create_test_mesh();
        assert!(mesh.require_skin_mut().is_err());
        assert!(mesh.skinning_parts_mut().is_err());

        let mut mesh = mesh.with_skin(SkinningLayer::from_weights(vec![vec![(0, 1.0)]; 3])).unwrap();
        assert!(mesh.require_skin_mut().is_ok());
        let (bind, deformed, skin) = mesh.skinning_parts_mut().unwrap();
        assert_eq!(bind.vertex_count(), deformed.vertex_count());
        assert_eq!(skin.vertex_count(), 3);
    }

    #[test]
    fn test_resized_outputs_are_an_error() {
        let layer = SkinningLayer::from_weights(vec![vec![(0, 1.0)]; 3]);
        let mut mesh = create_test_mesh().with_skin(layer).unwrap();

        mesh.deformed_mut().normals.pop();
        assert!(matches!(mesh.skinning_parts_mut(), Err(Error::Mesh(_))));

        mesh.reset_deformed();
        mesh.deformed_mut().positions.push(Vec3::ZERO);
        mesh.deformed_mut().normals.push(Vec3::Z);
        assert!(matches!(mesh.skinning_parts_mut(), Err(Error::Mesh(_))));

        mesh.reset_deformed();
        assert!(mesh.skinning_parts_mut().is_ok());
    }

    #[test]
    fn test_set_skin_clears_local_bones() {
        let mut layer = SkinningLayer::from_weights(vec![vec![(4, 1.0)]; 3]);
        for influence in layer.all_influences_mut() {
            influence.local_bone = Some(7);
        }
        let mesh = create_test_mesh().with_skin(layer).unwrap();
        assert!(mesh.skin().unwrap().all_influences().iter().all(|i| i.local_bone.is_none()));
    }

    #[test]
    fn test_take_skin() {
        let layer = SkinningLayer::from_weights(vec![vec![(0, 1.0)]; 3]);
        let mut mesh = create_test_mesh().with_skin(layer).unwrap();
        assert_eq!(mesh.take_skin().map(|s| s.vertex_count()), Some(3));
        assert!(mesh.skinning_parts_mut().is_err());
    }

    #[test]
    fn test_handle_locks() {
        let handle = create_test_mesh().into_handle();
        assert_eq!(read_mesh(&handle).unwrap().vertex_count(), 3);
        write_mesh(&handle).unwrap().reset_deformed();
    }
}
