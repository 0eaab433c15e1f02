//! Core orchestration layer for rbxlx-build.

use rbxlx_config::Config;
use rbxlx_ops::{Operations, SourceReader};
use tracing::debug;

/// Entry point for higher-level consumers such as the CLI.
pub struct PlaceBuild {
    ops: Operations,
}

impl PlaceBuild {
    /// Bootstrap the engine from configuration, reading sources from disk.
    pub fn bootstrap(config: Config) -> Self {
        debug!(
            place = %config.place.name,
            services = config.catalog.services().len(),
            scripts = config.manifest.len(),
            "bootstrapping place build"
        );
        Self {
            ops: Operations::new(config),
        }
    }

    /// Same as [`PlaceBuild::bootstrap`] with a custom source reader.
    pub fn with_reader(config: Config, reader: impl SourceReader + 'static) -> Self {
        Self {
            ops: Operations::with_reader(config, reader),
        }
    }

    /// Access the operation bundle.
    pub fn operations(&self) -> &Operations {
        &self.ops
    }
}
