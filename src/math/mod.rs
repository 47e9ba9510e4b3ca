//! Mathematical utilities and data structures

pub mod dual_quat;

pub use dual_quat::DualQuat;
