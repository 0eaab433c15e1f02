//! Report types and renderers for rbxlx-build commands.
//!
//! Operations produce [`BuildReport`] and [`VerifyReport`] values; the CLI
//! picks an [`OutputFormat`] and prints whatever the renderers return.

use std::fmt::Write as _;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Output style shared by every command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Plain,
    Json,
}

/// One embedded script as it landed in the document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScriptSummary {
    pub name: String,
    pub class_name: String,
    pub parent: String,
    pub referent: String,
    pub path: PathBuf,
    /// Length of the source in characters, not bytes.
    pub chars: usize,
}

/// Summary of one build invocation.
#[derive(Clone, Debug, Serialize)]
pub struct BuildReport {
    pub place: String,
    pub output: PathBuf,
    /// `false` for dry runs and `--stdout` builds.
    pub written: bool,
    pub bytes: usize,
    pub services: usize,
    pub scripts: Vec<ScriptSummary>,
    pub generated_at: DateTime<Utc>,
}

impl BuildReport {
    pub fn new(place: impl Into<String>, output: PathBuf) -> Self {
        Self {
            place: place.into(),
            output,
            written: false,
            bytes: 0,
            services: 0,
            scripts: Vec::new(),
            generated_at: Utc::now(),
        }
    }
}

/// Category of a structural problem found by `verify`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FindingKind {
    Malformed,
    Root,
    External,
    Referent,
    Item,
}

impl FindingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingKind::Malformed => "malformed",
            FindingKind::Root => "root",
            FindingKind::External => "external",
            FindingKind::Referent => "referent",
            FindingKind::Item => "item",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VerifyFinding {
    pub kind: FindingKind,
    pub message: String,
}

impl VerifyFinding {
    pub fn new(kind: FindingKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Outcome of checking an existing place file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub path: PathBuf,
    pub items: usize,
    pub scripts: usize,
    pub findings: Vec<VerifyFinding>,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

pub fn render_build(report: &BuildReport, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(report),
        OutputFormat::Plain => Ok(render_build_plain(report)),
    }
}

pub fn render_verify(report: &VerifyReport, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(report),
        OutputFormat::Plain => Ok(render_verify_plain(report)),
    }
}

fn render_build_plain(report: &BuildReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Assembled {} ({} services, {} scripts)",
        report.place,
        report.services,
        report.scripts.len()
    );
    for script in &report.scripts {
        let _ = writeln!(
            out,
            "  {} {} -> {} ({} chars)",
            script.class_name, script.name, script.parent, script.chars
        );
    }
    if report.written {
        let _ = write!(
            out,
            "Written {} bytes to {}",
            report.bytes,
            report.output.display()
        );
    } else {
        let _ = write!(
            out,
            "{} bytes (not written, target {})",
            report.bytes,
            report.output.display()
        );
    }
    out
}

fn render_verify_plain(report: &VerifyReport) -> String {
    let mut out = String::new();
    if report.is_clean() {
        let _ = write!(
            out,
            "{}: ok ({} items, {} scripts)",
            report.path.display(),
            report.items,
            report.scripts
        );
        return out;
    }

    for finding in &report.findings {
        let _ = writeln!(
            out,
            "{}: [{}] {}",
            report.path.display(),
            finding.kind.as_str(),
            finding.message
        );
    }
    let _ = write!(out, "{} finding(s)", report.findings.len());
    out
}
