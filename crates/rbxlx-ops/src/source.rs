use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Capability to load script source text.
pub trait SourceReader: Send + Sync {
    fn read_source(&self, path: &Path) -> io::Result<String>;
}

/// Reads sources from the filesystem as UTF-8.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsSourceReader;

impl SourceReader for FsSourceReader {
    fn read_source(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }
}

/// Fixed set of in-memory sources keyed by resolved path.
#[derive(Clone, Debug, Default)]
pub struct MemorySourceReader {
    files: HashMap<PathBuf, String>,
}

impl MemorySourceReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        self.insert(path, contents);
        self
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        self.files.insert(path.into(), contents.into());
    }
}

impl SourceReader for MemorySourceReader {
    fn read_source(&self, path: &Path) -> io::Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no in-memory source for {}", path.display()),
            )
        })
    }
}
