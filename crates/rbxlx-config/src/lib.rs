//! Configuration primitives and loader for rbxlx-build.
//!
//! The loader resolves configuration using the precedence stack
//! override flag → working directory → git root → built-in defaults.
//! Parsed settings are normalised into typed structures (the place settings,
//! the service [`Catalog`], and the script [`Manifest`]) so downstream crates
//! never touch raw TOML.

mod catalog;
mod manifest;

use std::collections::{HashMap, HashSet};
use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rbxlx_dom::Referent;
use serde::Deserialize;
use thiserror::Error;

pub use catalog::{
    Catalog, ContainerDescriptor, ContainerLocation, ServiceEntry, STANDARD_SERVICES,
    STANDARD_SUB_CONTAINERS,
};
pub use manifest::{Manifest, ScriptEntry};

pub const CONFIG_FILE_NAME: &str = ".rbxlx-build.toml";
pub const PLACE_EXTENSION: &str = "rbxlx";
const DEFAULT_PLACE_NAME: &str = "Place";

/// Complete configuration resolved from defaults and on-disk overrides.
#[derive(Clone, Debug)]
pub struct Config {
    pub place: PlaceSettings,
    pub catalog: Catalog,
    pub manifest: Manifest,
    pub sources: ConfigSources,
}

/// Settings describing the place file being produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaceSettings {
    pub name: String,
    pub output: PathBuf,
    pub source_root: PathBuf,
}

/// Provenance information for resolved configuration.
#[derive(Clone, Debug)]
pub struct ConfigSources {
    pub working_directory: PathBuf,
    pub layers: Vec<ConfigSource>,
}

/// Specific layer of configuration (default/git/local/override).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConfigSource {
    pub kind: ConfigSourceKind,
    pub path: Option<PathBuf>,
    pub base_dir: PathBuf,
}

impl ConfigSource {
    /// The built-in defaults layer, resolving relative paths against `base_dir`.
    pub fn builtin(base_dir: PathBuf) -> Self {
        ConfigSource {
            kind: ConfigSourceKind::Default,
            path: None,
            base_dir,
        }
    }

    fn for_file(kind: ConfigSourceKind, path: PathBuf) -> Self {
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        ConfigSource {
            kind,
            path: Some(path),
            base_dir,
        }
    }

    pub fn describe(&self) -> String {
        match (&self.kind, &self.path) {
            (ConfigSourceKind::Default, _) => "built-in defaults".to_owned(),
            (kind, Some(path)) => format!("{} at {}", kind, path.display()),
            (kind, None) => kind.to_string(),
        }
    }
}

/// Kinds of configuration sources, ordered from lowest to highest precedence.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConfigSourceKind {
    Default,
    GitRoot,
    Local,
    Override,
}

impl fmt::Display for ConfigSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConfigSourceKind::Default => "defaults",
            ConfigSourceKind::GitRoot => "git-root config",
            ConfigSourceKind::Local => "local config",
            ConfigSourceKind::Override => "override config",
        };
        f.write_str(label)
    }
}

/// Loader options, typically supplied by the CLI layer.
#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub override_path: Option<PathBuf>,
    pub working_dir: Option<PathBuf>,
}

impl LoadOptions {
    pub fn with_override_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.override_path = Some(path.into());
        self
    }

    pub fn with_working_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(path.into());
        self
    }
}

/// Errors surfaced while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to resolve working directory {attempted}: {source}")]
    WorkingDirectory {
        attempted: PathBuf,
        source: io::Error,
    },
    #[error("override config {path} not found")]
    OverrideNotFound { path: PathBuf },
    #[error("failed to read config {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("configuration validation failed:\n{0}")]
    Validation(ConfigValidationErrors),
}

impl Config {
    /// Loads configuration using the precedence rules and returns typed settings.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let working_dir = resolve_working_dir(options.working_dir)?;
        let override_path = options
            .override_path
            .map(|path| make_absolute(&path, &working_dir));

        if let Some(path) = &override_path {
            if !path.exists() {
                return Err(ConfigError::OverrideNotFound { path: path.clone() });
            }
        }

        let default_source = ConfigSource::builtin(working_dir.clone());
        let mut merged = PartialConfig::default();
        merged.merge(defaults_layer(default_source.clone()));

        let mut source_layers = vec![default_source];

        let git_root = find_git_root(&working_dir);
        let git_config_path = git_root.as_ref().map(|root| root.join(CONFIG_FILE_NAME));
        let local_config_path = working_dir.join(CONFIG_FILE_NAME);

        if let Some(path) = git_config_path.as_ref() {
            if path.exists() && Some(path) != override_path.as_ref() && path != &local_config_path {
                let source = ConfigSource::for_file(ConfigSourceKind::GitRoot, path.clone());
                merged.merge(load_layer(path, source.clone())?);
                source_layers.push(source);
            }
        }

        if local_config_path.exists() && Some(&local_config_path) != override_path.as_ref() {
            let source = ConfigSource::for_file(ConfigSourceKind::Local, local_config_path.clone());
            merged.merge(load_layer(&local_config_path, source.clone())?);
            source_layers.push(source);
        }

        if let Some(path) = override_path {
            let source = ConfigSource::for_file(ConfigSourceKind::Override, path.clone());
            merged.merge(load_layer(&path, source.clone())?);
            source_layers.push(source);
        }

        let resolved = merged.finalize().map_err(ConfigError::Validation)?;
        Ok(Config {
            place: resolved.place,
            catalog: resolved.catalog,
            manifest: resolved.manifest,
            sources: ConfigSources {
                working_directory: working_dir,
                layers: source_layers,
            },
        })
    }

    /// Built-in defaults only, without consulting the filesystem.
    pub fn builtin(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let source = ConfigSource::builtin(base_dir.clone());
        let resolved = defaults_layer(source.clone())
            .finalize()
            .unwrap_or_else(|err| panic!("built-in rbxlx-build defaults are invalid: {err}"));
        Config {
            place: resolved.place,
            catalog: resolved.catalog,
            manifest: resolved.manifest,
            sources: ConfigSources {
                working_directory: base_dir,
                layers: vec![source],
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::builtin(".")
    }
}

fn resolve_working_dir(override_dir: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
    match override_dir {
        Some(path) => fs::canonicalize(&path).map_err(|source| ConfigError::WorkingDirectory {
            attempted: path,
            source,
        }),
        None => env::current_dir().map_err(|source| ConfigError::WorkingDirectory {
            attempted: PathBuf::from("."),
            source,
        }),
    }
}

fn make_absolute(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn load_layer(path: &Path, source: ConfigSource) -> Result<PartialConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.into(),
        source,
    })?;
    let raw: RawConfig = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.into(),
        source,
    })?;
    Ok(raw.into_partial(source))
}

fn defaults_layer(source: ConfigSource) -> PartialConfig {
    let place = PlacePartial {
        name: Some(Located::new(DEFAULT_PLACE_NAME.into(), source.clone())),
        output: None,
        source_root: Some(Located::new(source.base_dir.clone(), source.clone())),
    };

    let services = STANDARD_SERVICES
        .iter()
        .map(|(name, referent)| RawService {
            name: (*name).into(),
            referent: (*referent).into(),
            children: STANDARD_SUB_CONTAINERS
                .iter()
                .filter(|(parent, _, _)| parent == name)
                .map(|(_, child, referent)| RawContainer {
                    name: (*child).into(),
                    referent: (*referent).into(),
                })
                .collect(),
        })
        .collect();

    PartialConfig {
        place: Some(place),
        services: Some(Located::new(services, source)),
        scripts: Vec::new(),
    }
}

fn find_git_root(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        if dir.join(".git").exists() {
            return Some(dir.to_path_buf());
        }
        current = dir.parent();
    }
    None
}

#[derive(Clone, Debug, Default)]
struct PartialConfig {
    place: Option<PlacePartial>,
    services: Option<Located<Vec<RawService>>>,
    scripts: Vec<Located<RawScript>>,
}

impl PartialConfig {
    fn merge(&mut self, mut other: PartialConfig) {
        if let Some(other_place) = other.place.take() {
            match &mut self.place {
                Some(place) => place.merge(other_place),
                None => self.place = Some(other_place),
            }
        }

        if other.services.is_some() {
            self.services = other.services;
        }

        self.scripts.extend(other.scripts);
    }

    fn finalize(self) -> Result<ResolvedConfig, ConfigValidationErrors> {
        let mut errors = Vec::new();
        let fallback = ConfigSource::builtin(PathBuf::from("."));

        let place_partial = self.place.unwrap_or_default();
        let name = place_partial
            .name
            .unwrap_or_else(|| Located::new(DEFAULT_PLACE_NAME.into(), fallback.clone()));
        if name.value.trim().is_empty() {
            errors.push(
                ConfigValidationError::new(Some(name.source.clone()), "cannot be empty".into())
                    .with_context("place.name"),
            );
        }

        let output = match &place_partial.output {
            Some(output) => resolve_path(output),
            None => name
                .source
                .base_dir
                .join(format!("{}.{PLACE_EXTENSION}", name.value)),
        };

        let source_root = place_partial
            .source_root
            .map(|located| resolve_path(&located))
            .unwrap_or_else(|| fallback.base_dir.clone());

        let services = self
            .services
            .unwrap_or_else(|| Located::new(Vec::new(), fallback.clone()));
        let catalog = finalize_catalog(services, &mut errors);
        let manifest = finalize_manifest(self.scripts, &source_root, &mut errors);

        if !errors.is_empty() {
            return Err(ConfigValidationErrors(errors));
        }

        Ok(ResolvedConfig {
            place: PlaceSettings {
                name: name.value,
                output,
                source_root,
            },
            catalog,
            manifest,
        })
    }
}

#[derive(Clone, Debug, Default)]
struct PlacePartial {
    name: Option<Located<String>>,
    output: Option<Located<PathBuf>>,
    source_root: Option<Located<PathBuf>>,
}

impl PlacePartial {
    fn merge(&mut self, other: PlacePartial) {
        if other.name.is_some() {
            self.name = other.name;
        }
        if other.output.is_some() {
            self.output = other.output;
        }
        if other.source_root.is_some() {
            self.source_root = other.source_root;
        }
    }
}

#[derive(Clone, Debug)]
struct Located<T> {
    value: T,
    source: ConfigSource,
}

impl<T> Located<T> {
    fn new(value: T, source: ConfigSource) -> Self {
        Located { value, source }
    }
}

fn resolve_path(located: &Located<PathBuf>) -> PathBuf {
    let path = &located.value;
    if path.is_absolute() {
        path.clone()
    } else {
        located.source.base_dir.join(path)
    }
}

fn finalize_catalog(
    located: Located<Vec<RawService>>,
    errors: &mut Vec<ConfigValidationError>,
) -> Catalog {
    let Located { value, source } = located;
    if value.is_empty() {
        errors.push(
            ConfigValidationError::new(
                Some(source.clone()),
                "at least one service is required".into(),
            )
            .with_context("services"),
        );
    }

    let mut names = HashSet::new();
    let mut referents: HashMap<Referent, String> = HashMap::new();
    let mut services = Vec::new();

    for (idx, raw) in value.into_iter().enumerate() {
        let context = format!("services[{idx}]");
        let Some(container) = finalize_container(
            &raw.name,
            &raw.referent,
            &context,
            &source,
            &mut names,
            &mut referents,
            errors,
        ) else {
            continue;
        };

        let mut entry = ServiceEntry::new(container);
        for (child_idx, child) in raw.children.iter().enumerate() {
            let child_context = format!("{context}.children[{child_idx}]");
            if let Some(container) = finalize_container(
                &child.name,
                &child.referent,
                &child_context,
                &source,
                &mut names,
                &mut referents,
                errors,
            ) {
                entry.children.push(container);
            }
        }
        services.push(entry);
    }

    Catalog::new(services)
}

fn finalize_container(
    name: &str,
    referent: &str,
    context: &str,
    source: &ConfigSource,
    names: &mut HashSet<String>,
    referents: &mut HashMap<Referent, String>,
    errors: &mut Vec<ConfigValidationError>,
) -> Option<ContainerDescriptor> {
    let mut valid = true;

    if name.trim().is_empty() {
        errors.push(
            ConfigValidationError::new(Some(source.clone()), "name cannot be empty".into())
                .with_context(context),
        );
        valid = false;
    } else if !names.insert(name.to_string()) {
        errors.push(
            ConfigValidationError::new(
                Some(source.clone()),
                format!("duplicate container name '{name}'"),
            )
            .with_context(context),
        );
        valid = false;
    }

    let referent = match Referent::parse(referent) {
        Ok(referent) => {
            if let Some(owner) = referents.get(&referent) {
                errors.push(
                    ConfigValidationError::new(
                        Some(source.clone()),
                        format!("referent '{referent}' is already used by '{owner}'"),
                    )
                    .with_context(context),
                );
                valid = false;
            } else {
                referents.insert(referent.clone(), name.to_string());
            }
            referent
        }
        Err(err) => {
            errors.push(
                ConfigValidationError::new(Some(source.clone()), err.to_string())
                    .with_context(context),
            );
            return None;
        }
    };

    valid.then(|| ContainerDescriptor::new(name, referent))
}

fn finalize_manifest(
    scripts: Vec<Located<RawScript>>,
    source_root: &Path,
    errors: &mut Vec<ConfigValidationError>,
) -> Manifest {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut entries = Vec::new();

    for (idx, Located { value, source }) in scripts.into_iter().enumerate() {
        let context = format!("scripts[{idx}]");
        let mut valid = true;

        for (field, text) in [
            ("source", &value.source),
            ("class", &value.class),
            ("name", &value.name),
            ("parent", &value.parent),
        ] {
            if text.trim().is_empty() {
                errors.push(
                    ConfigValidationError::new(
                        Some(source.clone()),
                        format!("{field} cannot be empty"),
                    )
                    .with_context(context.clone()),
                );
                valid = false;
            }
        }

        if valid && !seen.insert((value.parent.clone(), value.name.clone())) {
            errors.push(
                ConfigValidationError::new(
                    Some(source.clone()),
                    format!(
                        "duplicate script name '{}' under '{}'",
                        value.name, value.parent
                    ),
                )
                .with_context(context),
            );
            valid = false;
        }

        if !valid {
            continue;
        }

        entries.push(ScriptEntry {
            path: source_root.join(&value.source),
            source: value.source,
            class_name: value.class,
            name: value.name,
            parent: value.parent,
            origin: source,
        });
    }

    Manifest::new(entries)
}

#[derive(Clone, Debug)]
struct ResolvedConfig {
    place: PlaceSettings,
    catalog: Catalog,
    manifest: Manifest,
}

/// Container for validation failures, formatted as a bullet list.
#[derive(Debug)]
pub struct ConfigValidationErrors(pub Vec<ConfigValidationError>);

impl fmt::Display for ConfigValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, err) in self.0.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "- {err}")?;
        }
        Ok(())
    }
}

impl ConfigValidationErrors {
    pub fn iter(&self) -> impl Iterator<Item = &ConfigValidationError> {
        self.0.iter()
    }
}

/// Validation failure with optional provenance.
#[derive(Clone, Debug)]
pub struct ConfigValidationError {
    pub source: Option<ConfigSource>,
    pub message: String,
    pub context: Option<String>,
}

impl ConfigValidationError {
    fn new(source: Option<ConfigSource>, message: String) -> Self {
        ConfigValidationError {
            source,
            message,
            context: None,
        }
    }

    fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(context) = &self.context {
            write!(f, "{}: {}", context, self.message)?;
        } else {
            write!(f, "{}", self.message)?;
        }
        if let Some(source) = &self.source {
            write!(f, " ({})", source.describe())?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    place: Option<RawPlace>,
    #[serde(default)]
    services: Option<Vec<RawService>>,
    #[serde(default)]
    scripts: Vec<RawScript>,
}

impl RawConfig {
    fn into_partial(self, source: ConfigSource) -> PartialConfig {
        PartialConfig {
            place: self.place.map(|place| place.into_partial(source.clone())),
            services: self
                .services
                .map(|services| Located::new(services, source.clone())),
            scripts: self
                .scripts
                .into_iter()
                .map(|script| Located::new(script, source.clone()))
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawPlace {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    output: Option<PathBuf>,
    #[serde(default)]
    source_root: Option<PathBuf>,
}

impl RawPlace {
    fn into_partial(self, source: ConfigSource) -> PlacePartial {
        PlacePartial {
            name: self.name.map(|value| Located::new(value, source.clone())),
            output: self.output.map(|value| Located::new(value, source.clone())),
            source_root: self.source_root.map(|value| Located::new(value, source)),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
struct RawService {
    name: String,
    referent: String,
    #[serde(default)]
    children: Vec<RawContainer>,
}

#[derive(Clone, Debug, Deserialize)]
struct RawContainer {
    name: String,
    referent: String,
}

#[derive(Clone, Debug, Deserialize)]
struct RawScript {
    source: String,
    class: String,
    name: String,
    parent: String,
}
