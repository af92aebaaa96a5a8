//! End-to-end runs of the `hangar` binary with an isolated home directory.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::{TempDir, tempdir};
use zip::write::SimpleFileOptions;

fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, contents) in entries {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(contents.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

struct Sandbox {
    home: TempDir,
    game: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            home: tempdir().unwrap(),
            game: tempdir().unwrap(),
        }
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_hangar"))
            .args(args)
            .env("HANGAR_HOME", self.home.path())
            .env("HANGAR_GAME_DIR", self.game.path())
            .env_remove("HANGAR_GAME_VERSION")
            .env_remove("RUST_LOG")
            .output()
            .unwrap()
    }

    fn game_file(&self, relative: &str) -> std::path::PathBuf {
        self.game.path().join(relative)
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_help_lists_commands() {
    let sandbox = Sandbox::new();
    let output = sandbox.run(&["--help"]);
    assert!(output.status.success());
    let text = stdout(&output);
    for command in ["update", "list", "info", "install", "remove", "status", "config"] {
        assert!(text.contains(command), "missing {command} in help");
    }
}

#[test]
fn test_config_persists_settings() {
    let sandbox = Sandbox::new();
    let output = sandbox.run(&["config", "--game-version", "1.12.5", "--resolve-timeout", "7"]);
    assert!(output.status.success(), "{}", stderr(&output));

    let saved = std::fs::read_to_string(sandbox.home.path().join("settings.toml")).unwrap();
    assert!(saved.contains("1.12.5"));
    assert!(saved.contains("resolve_timeout_secs = 7"));

    let status = sandbox.run(&["status"]);
    assert!(status.status.success(), "{}", stderr(&status));
    assert!(stdout(&status).contains("1.12.5"));
}

#[test]
fn test_install_requires_catalog() {
    let sandbox = Sandbox::new();
    let output = sandbox.run(&["install", "Anything", "--yes"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("hangar update"));
}

#[test]
fn test_completions() {
    let sandbox = Sandbox::new();
    let output = sandbox.run(&["completions", "bash"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("hangar"));
}

fn serve_repository(server: &mut mockito::Server) {
    let url = server.url();
    let engine = format!(
        r#"{{"identifier":"Engine","name":"Engine Pack","abstract":"Big engines","version":"1.0","ksp_version":"1.4","download":"{url}/engine.zip","depends":[{{"name":"Core"}}]}}"#
    );
    let core = format!(
        r#"{{"identifier":"Core","version":"2.0","ksp_version_min":"1.3","download":"{url}/core.zip"}}"#
    );
    let legacy = format!(
        r#"{{"identifier":"Legacy","version":"0.9","ksp_version":"1.0","download":"{url}/legacy.zip"}}"#
    );
    let bundle = zip_bytes(&[
        ("CKAN-meta-master/Engine/Engine-1.0.ckan", &engine),
        ("CKAN-meta-master/Core/Core-2.0.ckan", &core),
        ("CKAN-meta-master/Legacy/Legacy-0.9.ckan", &legacy),
        ("CKAN-meta-master/builds.json", r#"{"builds":{}}"#),
    ]);

    server
        .mock("GET", "/master.zip")
        .with_status(200)
        .with_body(bundle)
        .create();
    server
        .mock("GET", "/engine.zip")
        .with_status(200)
        .with_body(zip_bytes(&[("GameData/Engine/engine.cfg", "engine")]))
        .create();
    server
        .mock("GET", "/core.zip")
        .with_status(200)
        .with_body(zip_bytes(&[("Core-2.0/GameData/Core/core.dll", "core")]))
        .create();
}

#[test]
fn test_update_install_remove() {
    let mut server = mockito::Server::new();
    serve_repository(&mut server);
    let sandbox = Sandbox::new();
    let repository = format!("{}/master.zip", server.url());

    let update = sandbox.run(&["update", "--url", &repository]);
    assert!(update.status.success(), "{}", stderr(&update));
    assert!(stdout(&update).contains("3 mods"));

    // Default game version 1.4.1 hides Legacy.
    let list = sandbox.run(&["list"]);
    let listed = stdout(&list);
    assert!(listed.contains("Engine Pack"));
    assert!(listed.contains("Core"));
    assert!(!listed.contains("Legacy"));
    assert!(stdout(&sandbox.run(&["list", "--all"])).contains("Legacy"));

    let info = sandbox.run(&["info", "Engine"]);
    assert!(info.status.success(), "{}", stderr(&info));
    assert!(stdout(&info).contains("Core"));

    let install = sandbox.run(&["install", "Engine", "--yes"]);
    assert!(install.status.success(), "{}", stderr(&install));
    assert_eq!(
        std::fs::read_to_string(sandbox.game_file("GameData/Engine/engine.cfg")).unwrap(),
        "engine"
    );
    assert!(sandbox.game_file("GameData/Core/core.dll").exists());

    let installed = stdout(&sandbox.run(&["list", "--installed"]));
    assert!(installed.contains("Engine---1.0"));
    assert!(installed.contains("Core---2.0"));

    let remove = sandbox.run(&["remove", "Engine", "--yes"]);
    assert!(remove.status.success(), "{}", stderr(&remove));
    assert!(!sandbox.game_file("GameData/Engine").exists());
    assert!(sandbox.game_file("GameData/Core/core.dll").exists());
    assert!(Path::new(sandbox.game.path()).exists());
}

#[test]
fn test_install_incompatible_mod_fails() {
    let mut server = mockito::Server::new();
    serve_repository(&mut server);
    let sandbox = Sandbox::new();
    let repository = format!("{}/master.zip", server.url());
    assert!(sandbox.run(&["update", "--url", &repository]).status.success());

    let output = sandbox.run(&["install", "Legacy", "--yes"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Legacy"));
}
