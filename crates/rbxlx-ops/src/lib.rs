//! Place assembly operations: script nodes, hierarchy, build driver, verifier.

mod assemble;
mod build;
mod error;
mod script;
mod source;
mod verify;

use rbxlx_config::Config;

pub use assemble::{AssembleError, HierarchyAssembler};
pub use build::{BuildOptions, BuildOutcome};
pub use error::{ExitCode, OperationError};
pub use script::{build_script_node, ScriptNode};
pub use source::{FsSourceReader, MemorySourceReader, SourceReader};
pub use verify::{verify_document, VerifyOptions, VerifyOutcome};

/// Operation bundle bound to one resolved configuration.
pub struct Operations {
    config: Config,
    reader: Box<dyn SourceReader>,
}

impl Operations {
    /// Operations reading script sources from disk.
    pub fn new(config: Config) -> Self {
        Self::with_reader(config, FsSourceReader)
    }

    pub fn with_reader(config: Config, reader: impl SourceReader + 'static) -> Self {
        Self {
            config,
            reader: Box::new(reader),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
