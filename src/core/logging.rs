//! env_logger bootstrap
//!
//! Deformers log through the `log` facade: bone table rebuilds at `debug`,
//! skipped influences at `warn`, per-frame skinning at `trace`.

/// Install env_logger for an application embedding the deformers.
///
/// Filters at `info` unless `RUST_LOG` says otherwise, e.g.
/// `RUST_LOG=dqskin::deformer=trace` to see per-frame batch counts.
///
/// # Example
/// ```
/// use dqskin::deformer::{create_skin_deformer, SkinningConfig};
/// use dqskin::mesh::{Mesh, VertexAttributes};
/// use glam::Vec3;
///
/// dqskin::core::logging::init();
///
/// let bind = VertexAttributes::new(vec![Vec3::ZERO], vec![Vec3::Y]);
/// let mesh = Mesh::new("hand", bind).unwrap().into_handle();
/// let deformer = create_skin_deformer(mesh, SkinningConfig::default()).unwrap();
/// log::info!("{} local bones before reinitialize", deformer.num_local_bones());
/// ```
pub fn init() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    ).init();
}

/// Install a test-capturing logger. Safe to call from every test.
pub fn init_for_tests() {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("debug")
    )
    .is_test(true)
    .try_init();
}
