//! Dqskin - Dual-quaternion skinning for animated meshes

pub mod core;
pub mod math;
pub mod animation;
pub mod mesh;
pub mod deformer;
