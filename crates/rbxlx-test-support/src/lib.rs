//! Shared test harness utilities for rbxlx-build crates.

use std::fs;
use std::path::Path;

use rbxlx_config::{Config, Manifest, ScriptEntry};

/// `(source, class, name, parent)` for the sample fighting-game place.
pub const PIXEL_BRAWL_SCRIPTS: &[(&str, &str, &str, &str)] = &[
    (
        "ReplicatedStorage/FightConfig.lua",
        "ModuleScript",
        "FightConfig",
        "ReplicatedStorage",
    ),
    (
        "ServerScriptService/FightServer.server.lua",
        "Script",
        "FightServer",
        "ServerScriptService",
    ),
    (
        "StarterPlayerScripts/FightClient.client.lua",
        "LocalScript",
        "FightClient",
        "StarterPlayerScripts",
    ),
    (
        "StarterGui/FightHUD.client.lua",
        "LocalScript",
        "FightHUD",
        "StarterGui",
    ),
];

/// Returns a baseline configuration for tests.
pub fn test_config() -> Config {
    Config::default()
}

/// Standard catalog with `scripts` resolved under `root`.
pub fn config_with_scripts(root: &Path, scripts: &[(&str, &str, &str, &str)]) -> Config {
    let mut config = Config::builtin(root);
    config.place.name = "PixelBrawl".to_string();
    config.place.output = root.join("PixelBrawl.rbxlx");
    config.place.source_root = root.to_path_buf();
    config.manifest = Manifest::new(
        scripts
            .iter()
            .map(|(source, class, name, parent)| {
                let mut entry = ScriptEntry::new(*source, *class, *name, *parent);
                entry.path = root.join(source);
                entry
            })
            .collect(),
    );
    config
}

/// Writes a small Luau body for every script.
pub fn write_sources(root: &Path, scripts: &[(&str, &str, &str, &str)]) {
    for (source, _, name, _) in scripts {
        write_file(&root.join(source), &format!("-- {name}\nreturn {{}}\n"));
    }
}

pub fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create fixture dirs");
    }
    fs::write(path, contents).expect("write fixture");
}
