use std::fs;
use std::io::Write;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn setup_file(dir: &Path, relative: &str, contents: &str) {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent directory");
    }
    let mut file = fs::File::create(&path).expect("create file");
    file.write_all(contents.as_bytes()).expect("write file");
}

const PIXEL_BRAWL: &str = r#"
[place]
name = "PixelBrawl"
source_root = "roblox"

[[scripts]]
source = "ReplicatedStorage/FightConfig.lua"
class = "ModuleScript"
name = "FightConfig"
parent = "ReplicatedStorage"

[[scripts]]
source = "ServerScriptService/FightServer.server.lua"
class = "Script"
name = "FightServer"
parent = "ServerScriptService"

[[scripts]]
source = "StarterPlayerScripts/FightClient.client.lua"
class = "LocalScript"
name = "FightClient"
parent = "StarterPlayerScripts"
"#;

fn pixel_brawl_project() -> TempDir {
    let temp = TempDir::new().expect("tempdir");
    setup_file(temp.path(), ".rbxlx-build.toml", PIXEL_BRAWL);
    setup_file(
        temp.path(),
        "roblox/ReplicatedStorage/FightConfig.lua",
        "return { Damage = 10 }\n",
    );
    setup_file(
        temp.path(),
        "roblox/ServerScriptService/FightServer.server.lua",
        "local hits = {}\nif hits[1]]>0 then end\n",
    );
    setup_file(
        temp.path(),
        "roblox/StarterPlayerScripts/FightClient.client.lua",
        "print('client')\n",
    );
    temp
}

fn binary() -> Command {
    Command::cargo_bin("rbxlx-build").expect("binary")
}

#[test]
fn build_writes_place_and_prints_summary() {
    let temp = pixel_brawl_project();

    binary()
        .current_dir(temp.path())
        .arg("build")
        .assert()
        .success()
        .stdout(predicate::str::contains("Assembled PixelBrawl (15 services, 3 scripts)"))
        .stdout(predicate::str::contains(
            "LocalScript FightClient -> StarterPlayerScripts",
        ))
        .stderr(predicate::str::contains("read source"));

    let place = fs::read_to_string(temp.path().join("PixelBrawl.rbxlx")).expect("place file");
    assert!(place.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<roblox "));
    assert!(place.contains("<![CDATA[local hits = {}\nif hits[1]]]]><![CDATA[>0 then end\n]]>"));
}

#[test]
fn built_place_verifies_clean() {
    let temp = pixel_brawl_project();
    binary()
        .current_dir(temp.path())
        .args(["-q", "build"])
        .assert()
        .success();

    binary()
        .current_dir(temp.path())
        .args(["verify", "PixelBrawl.rbxlx"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PixelBrawl.rbxlx: ok (20 items, 3 scripts)"));
}

#[test]
fn stdout_mode_prints_document_without_writing() {
    let temp = pixel_brawl_project();

    let output = binary()
        .current_dir(temp.path())
        .args(["build", "--stdout"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let stdout = String::from_utf8(output).expect("stdout utf8");
    assert!(stdout.contains("<Item class=\"ModuleScript\" referent=\"RBX00000065\">"));
    assert!(stdout.ends_with("</roblox>\n"));
    assert!(!temp.path().join("PixelBrawl.rbxlx").exists());
}

#[test]
fn dry_run_json_reports_without_writing() {
    let temp = pixel_brawl_project();

    let output = binary()
        .current_dir(temp.path())
        .args(["build", "--dry-run", "--format", "json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let payload: serde_json::Value = serde_json::from_slice(&output).expect("json payload");
    assert_eq!(payload["place"], "PixelBrawl");
    assert_eq!(payload["written"], false);
    assert_eq!(payload["scripts"].as_array().map(Vec::len), Some(3));
    assert!(!temp.path().join("PixelBrawl.rbxlx").exists());
}

#[test]
fn working_dir_flag_and_output_override() {
    let temp = pixel_brawl_project();
    let elsewhere = TempDir::new().expect("tempdir");

    binary()
        .current_dir(elsewhere.path())
        .arg("-C")
        .arg(temp.path())
        .args(["build", "-o", "dist/game.rbxlx"])
        .assert()
        .success()
        .stdout(predicate::str::contains("game.rbxlx"));

    assert!(temp.path().join("dist/game.rbxlx").exists());
}

#[test]
fn unknown_target_exits_with_code_four() {
    let temp = pixel_brawl_project();
    setup_file(
        temp.path(),
        "extra.toml",
        r#"
        [[scripts]]
        source = "Lost.lua"
        class = "Script"
        name = "Lost"
        parent = "ServerScripts"
        "#,
    );

    binary()
        .current_dir(temp.path())
        .args(["build", "--config", "extra.toml"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains(
            "script 'Lost' targets unknown container 'ServerScripts'",
        ));
    assert!(!temp.path().join("PixelBrawl.rbxlx").exists());
}

#[test]
fn missing_source_exits_with_code_three() {
    let temp = pixel_brawl_project();
    fs::remove_file(temp.path().join("roblox/StarterPlayerScripts/FightClient.client.lua"))
        .expect("remove source");

    binary()
        .current_dir(temp.path())
        .arg("build")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("cannot read source for script 'FightClient'"));
}

#[test]
fn control_character_in_source_exits_with_code_six() {
    let temp = pixel_brawl_project();
    setup_file(
        temp.path(),
        "roblox/ReplicatedStorage/FightConfig.lua",
        "print(\"\u{1b}[31mred\")\u{c}\nreturn {}",
    );

    binary()
        .current_dir(temp.path())
        .arg("build")
        .assert()
        .code(6)
        .stderr(predicate::str::contains(
            "script 'FightConfig' source has character '\\u{1b}' at byte 7",
        ));
    assert!(!temp.path().join("PixelBrawl.rbxlx").exists());
}

#[test]
fn verify_flags_control_characters_in_place_file() {
    let temp = TempDir::new().expect("tempdir");
    setup_file(
        temp.path(),
        "tainted.rbxlx",
        concat!(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n",
            "<roblox version=\"4\">\n",
            "  <External>null</External>\n",
            "  <External>nil</External>\n",
            "  <Item class=\"Script\" referent=\"RBX1\"><Properties>",
            "<ProtectedString name=\"Source\"><![CDATA[\u{c}]]></ProtectedString>",
            "</Properties></Item>\n",
            "</roblox>\n",
        ),
    );

    binary()
        .current_dir(temp.path())
        .args(["verify", "tainted.rbxlx"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("[malformed]"))
        .stdout(predicate::str::contains("is not allowed in XML"));
}

#[test]
fn crlf_sources_survive_build_and_verify() {
    let temp = pixel_brawl_project();
    setup_file(
        temp.path(),
        "roblox/ReplicatedStorage/FightConfig.lua",
        "local a = 1\r\nreturn a\r\n",
    );

    binary()
        .current_dir(temp.path())
        .args(["-q", "build"])
        .assert()
        .success();
    let place = fs::read_to_string(temp.path().join("PixelBrawl.rbxlx")).expect("place file");
    assert!(!place.contains('\r'));
    assert!(place.contains("<![CDATA[local a = 1]]>&#13;<![CDATA[\nreturn a]]>&#13;<![CDATA[\n]]>"));

    binary()
        .current_dir(temp.path())
        .args(["verify", "PixelBrawl.rbxlx"])
        .assert()
        .success();
}

#[test]
fn invalid_config_exits_with_code_two() {
    let temp = TempDir::new().expect("tempdir");
    setup_file(
        temp.path(),
        ".rbxlx-build.toml",
        r#"
        [[services]]
        name = "Workspace"
        referent = "not-a-referent"
        "#,
    );

    binary()
        .current_dir(temp.path())
        .arg("build")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("configuration validation failed"));
}

#[test]
fn verify_flags_tampered_document() {
    let temp = TempDir::new().expect("tempdir");
    setup_file(
        temp.path(),
        "broken.rbxlx",
        concat!(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n",
            "<roblox version=\"4\">\n",
            "  <External>null</External>\n",
            "  <Item class=\"Workspace\" referent=\"RBX1\"></Item>\n",
            "  <Item class=\"Lighting\" referent=\"RBX1\"></Item>\n",
            "</roblox>\n",
        ),
    );

    binary()
        .current_dir(temp.path())
        .args(["verify", "broken.rbxlx"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("[external]"))
        .stdout(predicate::str::contains("referent RBX1 appears 2 times"))
        .stdout(predicate::str::contains("2 finding(s)"));
}

#[test]
fn verify_missing_file_is_an_io_failure() {
    let temp = TempDir::new().expect("tempdir");

    binary()
        .current_dir(temp.path())
        .args(["verify", "absent.rbxlx"])
        .assert()
        .code(5)
        .stderr(predicate::str::contains("absent.rbxlx"));
}
