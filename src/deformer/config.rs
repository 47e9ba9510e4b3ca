//! Skinning configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};

/// Default number of vertices per skinning batch
pub const DEFAULT_VERTICES_PER_BATCH: usize = 10_000;

/// How per-bone transforms are blended per vertex
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkinningMethod {
    /// Linear blend of skinning matrices
    Linear,
    /// Blend of unit dual quaternions
    #[default]
    DualQuaternion,
}

/// Runtime tuning for a skinning deformer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkinningConfig {
    /// Deformer variant created by `create_skin_deformer`
    pub method: SkinningMethod,
    /// Upper bound on vertices handled by one unit of work. Must be non-zero.
    pub vertices_per_batch: usize,
    /// Dispatch batches to the rayon pool. Off = all batches run inline.
    pub parallel: bool,
}

impl Default for SkinningConfig {
    fn default() -> Self {
        Self {
            method: SkinningMethod::default(),
            vertices_per_batch: DEFAULT_VERTICES_PER_BATCH,
            parallel: true,
        }
    }
}

impl SkinningConfig {
    /// Single-threaded, one batch per `vertices_per_batch` vertices
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            ..Self::default()
        }
    }

    /// Builder-style batch size override
    pub fn with_vertices_per_batch(mut self, vertices_per_batch: usize) -> Self {
        self.vertices_per_batch = vertices_per_batch;
        self
    }

    /// Builder-style method override
    pub fn with_method(mut self, method: SkinningMethod) -> Self {
        self.method = method;
        self
    }

    /// Reject settings the deformers cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.vertices_per_batch == 0 {
            return Err(Error::Config("vertices_per_batch must be greater than zero".into()));
        }
        Ok(())
    }

    /// Parse and validate a JSON config. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}
