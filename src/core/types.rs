//! Core type aliases and re-exports

pub use glam::{
    Vec3, Vec4,
    Mat4,
    Quat,
};

/// Identifier of a node in the external skeleton
pub type NodeId = usize;

/// Standard Result type for the crate
pub type Result<T> = std::result::Result<T, crate::core::error::Error>;
