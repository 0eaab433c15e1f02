use std::path::PathBuf;

use rbxlx_dom::{find_invalid_char, PlaceDocument, ReferentGenerator};
use rbxlx_format::{render_build, BuildReport, OutputFormat, ScriptSummary};
use rbxlx_utils::atomic_write;
use tracing::{debug, info};

use crate::assemble::HierarchyAssembler;
use crate::error::{ExitCode, OperationError};
use crate::script::build_script_node;
use crate::Operations;

/// Inputs for [`Operations::build`].
#[derive(Clone, Debug)]
pub struct BuildOptions {
    /// Replaces `place.output` from configuration.
    pub output_path: Option<PathBuf>,
    pub write_to_disk: bool,
    pub format: OutputFormat,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            output_path: None,
            write_to_disk: true,
            format: OutputFormat::Plain,
        }
    }
}

#[derive(Clone, Debug)]
pub struct BuildOutcome {
    /// Serialized place file.
    pub document: String,
    pub report: BuildReport,
    pub rendered: String,
    pub exit_code: i32,
}

impl Operations {
    /// Reads every manifest source, assembles the place and (optionally)
    /// writes it. Nothing touches the output path unless every step succeeded.
    pub fn build(&self, options: BuildOptions) -> Result<BuildOutcome, OperationError> {
        let config = &self.config;
        let output = options
            .output_path
            .unwrap_or_else(|| config.place.output.clone());

        let assembler = HierarchyAssembler::new(&config.catalog);
        assembler.check_targets(config.manifest.iter())?;
        for entry in config.manifest.iter() {
            check_text(&entry.name, "name", &entry.name)?;
            check_text(&entry.name, "class", &entry.class_name)?;
        }

        let mut generator = ReferentGenerator::reserving(config.catalog.referents());
        let mut nodes = Vec::with_capacity(config.manifest.len());
        let mut report = BuildReport::new(config.place.name.clone(), output.clone());

        for entry in config.manifest.iter() {
            let source = self.reader.read_source(&entry.path).map_err(|source| {
                OperationError::SourceUnavailable {
                    script: entry.name.clone(),
                    path: entry.path.clone(),
                    source,
                }
            })?;
            check_text(&entry.name, "source", &source)?;
            let node = build_script_node(entry, source, &mut generator);
            info!(
                script = %entry.name,
                path = %entry.path.display(),
                chars = node.chars(),
                "read source"
            );
            report.scripts.push(ScriptSummary {
                name: node.name.clone(),
                class_name: node.class_name.clone(),
                parent: node.parent.clone(),
                referent: node.referent.to_string(),
                path: entry.path.clone(),
                chars: node.chars(),
            });
            nodes.push(node);
        }

        let items = assembler.assemble(nodes)?;
        report.services = items.len();
        let document = PlaceDocument::new(items).to_xml();
        report.bytes = document.len();
        debug!(bytes = report.bytes, "serialized place");

        report.written = options.write_to_disk;
        let rendered = render_build(&report, options.format)?;

        if options.write_to_disk {
            atomic_write(&output, &document).map_err(|source| OperationError::Io {
                path: output.clone(),
                source,
            })?;
            info!(bytes = report.bytes, path = %output.display(), "wrote place file");
        }

        Ok(BuildOutcome {
            document,
            report,
            rendered,
            exit_code: ExitCode::Success.code(),
        })
    }
}

/// Rejects text XML cannot represent, even inside CDATA or as a reference.
fn check_text(script: &str, field: &'static str, text: &str) -> Result<(), OperationError> {
    match find_invalid_char(text) {
        Some((offset, character)) => Err(OperationError::InvalidText {
            script: script.to_string(),
            field,
            offset,
            character,
        }),
        None => Ok(()),
    }
}
