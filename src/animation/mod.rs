//! Skeleton hierarchy and pose providers

pub mod skeleton;
pub mod pose;

pub use skeleton::{Bone, Skeleton, SkeletonBuilder};
pub use pose::{SkeletonInstance, SkeletonPose};
