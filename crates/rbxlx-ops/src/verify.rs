use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use rbxlx_dom::{parse, PlaceDocument, EXTERNAL_PLACEHOLDERS, FORMAT_VERSION, ROOT_ELEMENT};
use rbxlx_format::{render_verify, FindingKind, OutputFormat, VerifyFinding, VerifyReport};
use tracing::debug;

use crate::error::{ExitCode, OperationError};
use crate::Operations;

#[derive(Clone, Debug)]
pub struct VerifyOptions {
    pub path: PathBuf,
    pub format: OutputFormat,
}

#[derive(Clone, Debug)]
pub struct VerifyOutcome {
    pub report: VerifyReport,
    pub rendered: String,
    pub exit_code: i32,
}

impl Operations {
    /// Checks a place file on disk. Structural problems become findings;
    /// only an unreadable file is an error.
    pub fn verify(&self, options: VerifyOptions) -> Result<VerifyOutcome, OperationError> {
        let path = if options.path.is_absolute() {
            options.path
        } else {
            self.config.sources.working_directory.join(&options.path)
        };
        let contents = fs::read_to_string(&path).map_err(|source| OperationError::Io {
            path: path.clone(),
            source,
        })?;

        let report = verify_document(&path, &contents);
        let exit_code = if report.is_clean() {
            ExitCode::Success
        } else {
            ExitCode::Findings
        };
        let rendered = render_verify(&report, options.format)?;
        Ok(VerifyOutcome {
            report,
            rendered,
            exit_code: exit_code.code(),
        })
    }
}

/// Runs every structural check against `contents`.
pub fn verify_document(path: &Path, contents: &str) -> VerifyReport {
    let mut report = VerifyReport {
        path: path.to_path_buf(),
        ..VerifyReport::default()
    };

    let parsed = match parse(contents) {
        Ok(parsed) => parsed,
        Err(err) => {
            report
                .findings
                .push(VerifyFinding::new(FindingKind::Malformed, err.to_string()));
            return report;
        }
    };

    let root = &parsed.root;
    if root.name != ROOT_ELEMENT {
        report.findings.push(VerifyFinding::new(
            FindingKind::Root,
            format!("root element is <{}>, expected <{ROOT_ELEMENT}>", root.name),
        ));
        return report;
    }
    match root.attribute("version") {
        Some(FORMAT_VERSION) => {}
        Some(other) => report.findings.push(VerifyFinding::new(
            FindingKind::Root,
            format!("version is \"{other}\", expected \"{FORMAT_VERSION}\""),
        )),
        None => report.findings.push(VerifyFinding::new(
            FindingKind::Root,
            "missing version attribute",
        )),
    }

    let externals: Vec<String> = root
        .elements_named("External")
        .map(|element| element.text())
        .collect();
    if externals != EXTERNAL_PLACEHOLDERS {
        report.findings.push(VerifyFinding::new(
            FindingKind::External,
            format!(
                "expected <External> placeholders {:?}, found {:?}",
                EXTERNAL_PLACEHOLDERS, externals
            ),
        ));
    }

    let document = match PlaceDocument::from_xml(&parsed) {
        Ok(document) => document,
        Err(err) => {
            report
                .findings
                .push(VerifyFinding::new(FindingKind::Item, err.to_string()));
            return report;
        }
    };

    let items = document.walk();
    report.items = items.len();
    report.scripts = items
        .iter()
        .filter(|item| item.protected_string("Source").is_some())
        .count();

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for item in &items {
        *counts.entry(item.referent.as_str()).or_default() += 1;
    }
    for (referent, count) in counts {
        if count > 1 {
            report.findings.push(VerifyFinding::new(
                FindingKind::Referent,
                format!("referent {referent} appears {count} times"),
            ));
        }
    }

    debug!(
        items = report.items,
        findings = report.findings.len(),
        "verified place file"
    );
    report
}
