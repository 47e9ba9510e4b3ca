//! Bone hierarchy and bind pose

use std::collections::HashMap;

use crate::core::{Error, Mat4, NodeId, Result};

/// A single bone in a skeletal hierarchy
#[derive(Clone, Debug)]
pub struct Bone {
    pub name: String,
    pub parent_index: Option<NodeId>,
    pub local_bind_pose: Mat4,
    pub inverse_bind_pose: Mat4,
}

impl Bone {
    /// Create a new bone with the given local transform
    /// The inverse_bind_pose will be calculated when the bone is added to a skeleton
    pub fn new(name: impl Into<String>, parent_index: Option<NodeId>, local_transform: Mat4) -> Self {
        Self {
            name: name.into(),
            parent_index,
            local_bind_pose: local_transform,
            inverse_bind_pose: Mat4::IDENTITY,
        }
    }
}

/// A hierarchical skeleton composed of bones, indexed by node id
#[derive(Clone, Debug, Default)]
pub struct Skeleton {
    bones: Vec<Bone>,
    bone_names: HashMap<String, NodeId>,
}

impl Skeleton {
    /// Create an empty skeleton
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bone to the skeleton. Parents must be added before children.
    /// Returns the node id of the new bone.
    pub fn add_bone(&mut self, mut bone: Bone) -> Result<NodeId> {
        if let Some(parent) = bone.parent_index {
            if parent >= self.bones.len() {
                return Err(Error::Skeleton(format!(
                    "invalid parent index {} for bone '{}'",
                    parent, bone.name
                )));
            }
        }

        if self.bone_names.contains_key(&bone.name) {
            return Err(Error::Skeleton(format!("bone name '{}' already exists", bone.name)));
        }

        let world_bind_pose = match bone.parent_index {
            Some(parent) => self.world_bind_pose(parent) * bone.local_bind_pose,
            None => bone.local_bind_pose,
        };
        bone.inverse_bind_pose = world_bind_pose.inverse();

        let index = self.bones.len();
        self.bone_names.insert(bone.name.clone(), index);
        self.bones.push(bone);

        Ok(index)
    }

    /// Get the number of bones in the skeleton
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    /// Get a bone by node id
    pub fn get_bone(&self, node: NodeId) -> Option<&Bone> {
        self.bones.get(node)
    }

    /// Find a node id by bone name
    pub fn find_bone(&self, name: &str) -> Option<NodeId> {
        self.bone_names.get(name).copied()
    }

    /// Get the parent of a bone
    pub fn parent_index(&self, node: NodeId) -> Option<NodeId> {
        self.bones.get(node)?.parent_index
    }

    /// Get all children of a bone
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.bones
            .iter()
            .enumerate()
            .filter_map(|(idx, bone)| (bone.parent_index == Some(node)).then_some(idx))
            .collect()
    }

    /// Local bind transforms of every bone, in node order
    pub fn bind_local_transforms(&self) -> Vec<Mat4> {
        self.bones.iter().map(|bone| bone.local_bind_pose).collect()
    }

    /// Calculate world-space transforms for all bones given local transforms
    pub fn calculate_world_transforms(&self, local_transforms: &[Mat4]) -> Vec<Mat4> {
        assert_eq!(
            local_transforms.len(),
            self.bones.len(),
            "Local transforms array must match bone count"
        );

        let mut world_transforms = vec![Mat4::IDENTITY; self.bones.len()];

        // Parents always precede children
        for (index, bone) in self.bones.iter().enumerate() {
            world_transforms[index] = match bone.parent_index {
                Some(parent) => world_transforms[parent] * local_transforms[index],
                None => local_transforms[index],
            };
        }

        world_transforms
    }

    /// World-space bind pose of a single bone
    fn world_bind_pose(&self, node: NodeId) -> Mat4 {
        let mut chain = Vec::new();
        let mut current = Some(node);
        while let Some(idx) = current {
            chain.push(idx);
            current = self.bones[idx].parent_index;
        }

        chain
            .iter()
            .rev()
            .fold(Mat4::IDENTITY, |transform, &idx| transform * self.bones[idx].local_bind_pose)
    }
}

/// Builder for easier skeleton construction
#[derive(Default)]
pub struct SkeletonBuilder {
    skeleton: Skeleton,
    last_error: Option<Error>,
}

impl SkeletonBuilder {
    /// Create a new skeleton builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a root bone (no parent)
    pub fn add_root(mut self, name: &str, transform: Mat4) -> Self {
        if self.last_error.is_some() {
            return self;
        }

        if let Err(e) = self.skeleton.add_bone(Bone::new(name, None, transform)) {
            self.last_error = Some(e);
        }
        self
    }

    /// Add a bone with a parent
    pub fn add_bone(mut self, name: &str, parent: &str, transform: Mat4) -> Self {
        if self.last_error.is_some() {
            return self;
        }

        let Some(parent_index) = self.skeleton.find_bone(parent) else {
            self.last_error = Some(Error::Skeleton(format!("parent bone '{}' not found", parent)));
            return self;
        };

        if let Err(e) = self.skeleton.add_bone(Bone::new(name, Some(parent_index), transform)) {
            self.last_error = Some(e);
        }
        self
    }

    /// Build the final skeleton
    pub fn build(self) -> Result<Skeleton> {
        if let Some(error) = self.last_error {
            Err(error)
        } else if self.skeleton.bones.is_empty() {
            Err(Error::Skeleton("skeleton must have at least one bone".into()))
        } else {
            Ok(self.skeleton)
        }
    }
}
