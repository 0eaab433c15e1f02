use std::path::PathBuf;

use crate::ConfigSource;

/// One script to embed: where its source lives and where it goes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptEntry {
    /// Locator as written in configuration.
    pub source: String,
    /// `source` resolved against the place's source root.
    pub path: PathBuf,
    /// Emitted verbatim as the item class (`ModuleScript`, `Script`, `LocalScript`, ...).
    pub class_name: String,
    pub name: String,
    /// Name of the catalog container the script is placed under.
    pub parent: String,
    pub origin: ConfigSource,
}

impl ScriptEntry {
    /// Entry declared in code rather than a config file; `source` is used as
    /// the path unchanged.
    pub fn new(
        source: impl Into<String>,
        class_name: impl Into<String>,
        name: impl Into<String>,
        parent: impl Into<String>,
    ) -> Self {
        let source = source.into();
        Self {
            path: PathBuf::from(&source),
            source,
            class_name: class_name.into(),
            name: name.into(),
            parent: parent.into(),
            origin: ConfigSource::builtin(PathBuf::from(".")),
        }
    }
}

/// Scripts in declaration order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<ScriptEntry>,
}

impl Manifest {
    pub fn new(entries: Vec<ScriptEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[ScriptEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScriptEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
