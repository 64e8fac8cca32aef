//! # Interop Configuration
//!
//! Loaded once at startup from TOML:
//!
//! ```toml
//! interop_enabled = true
//! map_type = "write_discard"
//! batch_capacity = 256
//! pool_capacity = 64
//! ```
//!
//! Every key is optional.

use std::path::Path;

use serde::Deserialize;

use crate::error::{InteropError, InteropResult};
use crate::storage::{InteropMode, RenderMapType};

/// Runtime configuration of the interop layer.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InteropConfig {
    /// Whether the GPU interop path is available at all. When `false`,
    /// every entity is created in `NoInterop` mode.
    pub interop_enabled: bool,
    /// Map type used for CPU mapping.
    pub map_type: RenderMapType,
    /// Initial capacity of the coordinator's handle buffers.
    pub batch_capacity: usize,
    /// Number of retired backends kept by a recycling destroy policy.
    pub pool_capacity: usize,
}

impl Default for InteropConfig {
    fn default() -> Self {
        Self {
            interop_enabled: true,
            map_type: RenderMapType::WriteDiscard,
            batch_capacity: 256,
            pool_capacity: 64,
        }
    }
}

impl InteropConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` on malformed TOML, unknown keys, or zero capacities.
    pub fn from_toml_str(source: &str) -> InteropResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| InteropError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `Io` when the file cannot be read, otherwise as [`Self::from_toml_str`].
    pub fn load<P: AsRef<Path>>(path: P) -> InteropResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| InteropError::Io(format!("{}: {e}", path.display())))?;
        let config = Self::from_toml_str(&source)?;
        tracing::debug!(path = %path.display(), ?config, "interop config loaded");
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` naming the first offending key.
    pub fn validate(&self) -> InteropResult<()> {
        if self.batch_capacity == 0 {
            return Err(InteropError::InvalidConfig(
                "batch_capacity must be greater than zero".into(),
            ));
        }
        if self.pool_capacity == 0 {
            return Err(InteropError::InvalidConfig(
                "pool_capacity must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Interop mode an entity actually gets when `requested` is asked for.
    #[must_use]
    pub const fn resolve_mode(&self, requested: InteropMode) -> InteropMode {
        if self.interop_enabled {
            requested
        } else {
            InteropMode::NoInterop
        }
    }
}
