//! CLI integration tests for model-tool

use assert_cmd::Command;
use frame_models::fixtures::{DmdBuilder, FrameSpec, KvxBuilder, Md2Builder};
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn model_tool() -> Command {
    Command::cargo_bin("model-tool").unwrap()
}

fn write_models(dir: &Path) {
    fs::create_dir_all(dir.join("models/imp")).unwrap();
    fs::create_dir_all(dir.join("voxels")).unwrap();

    let mut imp = DmdBuilder::new(6, 4).skin("imp.png");
    for name in ["idle", "walk1", "walk2"] {
        imp = imp.frame(FrameSpec::new(name));
    }
    fs::write(dir.join("models/imp/imp.dmd"), imp.build()).unwrap();
    fs::write(dir.join("models/imp/imp.png"), [0u8; 8]).unwrap();
    fs::write(
        dir.join("models/imp/broken.md2"),
        Md2Builder::new(3, 1)
            .gl_commands(0)
            .frame(FrameSpec::new("a"))
            .build(),
    )
    .unwrap();
    fs::write(
        dir.join("voxels/barrel.kvx"),
        KvxBuilder::new([1, 1, 1]).slab(0, 0, 0, 0x3f, &[7]).build(),
    )
    .unwrap();
}

const MANIFEST: &str = r#"{
    "classes": ["DoomImp", "ExplosiveBarrel"],
    "sprites": [
        { "name": "TROO", "frames": [{}, {}, {}] },
        { "name": "BAR1", "frames": [{ "voxel": 0 }] }
    ],
    "voxels": [{ "file": "voxels/barrel.kvx", "placed_spin": 30 }],
    "definitions": [{
        "class": "DoomImp",
        "path": "models/imp",
        "models": [{ "slot": 0, "file": "imp.dmd" }],
        "flags": "INTERPOLATE_DOUBLED_FRAMES",
        "frames": [
            { "sprite": "TROO", "frames": "A", "slot": 0, "target": "idle" },
            { "sprite": "TROO", "frames": "BC", "slot": 0, "target": 2 }
        ]
    }]
}"#;

#[test]
fn test_info_reports_header() {
    let dir = TempDir::new().unwrap();
    write_models(dir.path());

    model_tool()
        .arg("info")
        .arg(dir.path().join("models/imp/imp.dmd"))
        .arg("--skins")
        .assert()
        .success()
        .stdout(predicate::str::contains("Format: DMD"))
        .stdout(predicate::str::contains("Frames: 3"))
        .stdout(predicate::str::contains("Triangles: 4"))
        .stdout(predicate::str::contains("imp.png"));
}

#[test]
fn test_frames_with_filter() {
    let dir = TempDir::new().unwrap();
    write_models(dir.path());

    model_tool()
        .args(["frames", "--filter", "WALK"])
        .arg(dir.path().join("models/imp/imp.dmd"))
        .assert()
        .success()
        .stdout(predicate::str::contains("walk2"))
        .stdout(predicate::str::contains("idle").not())
        .stdout(predicate::str::contains("2 of 3 frames"));
}

#[test]
fn test_build_reports_vertex_counts() {
    let dir = TempDir::new().unwrap();
    write_models(dir.path());

    model_tool()
        .arg("build")
        .arg("--root")
        .arg(dir.path())
        .args(["models/imp/imp.dmd", "voxels/barrel.kvx"])
        .assert()
        .success()
        // 3 frames of 4 triangles
        .stdout(predicate::str::contains("36"))
        // one voxel, six faces
        .stdout(predicate::str::contains("KVX"));
}

#[test]
fn test_invalid_command_count_fails() {
    let dir = TempDir::new().unwrap();
    write_models(dir.path());

    model_tool()
        .arg("info")
        .arg(dir.path().join("models/imp/broken.md2"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid GL command count"));
}

#[test]
fn test_resolve_manifest() {
    let dir = TempDir::new().unwrap();
    write_models(dir.path());
    let manifest = dir.path().join("manifest.json");
    fs::write(&manifest, MANIFEST).unwrap();

    model_tool()
        .arg("resolve")
        .arg(&manifest)
        .args(["--class", "doomimp", "--sprite", "TROO"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 meshes"))
        .stdout(predicate::str::contains("models/imp/imp.dmd"))
        .stdout(predicate::str::contains("interpolate_doubled_frames"))
        .stdout(predicate::str::contains("0:2"));

    model_tool()
        .arg("resolve")
        .arg(&manifest)
        .args(["--class", "ExplosiveBarrel", "--no-voxels"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No model associations"));

    model_tool()
        .arg("resolve")
        .arg(&manifest)
        .args(["--class", "ExplosiveBarrel"])
        .assert()
        .success()
        .stdout(predicate::str::contains("voxels/barrel.kvx"))
        .stdout(predicate::str::contains("rotating"));
}

#[test]
fn test_resolve_unknown_class() {
    let dir = TempDir::new().unwrap();
    write_models(dir.path());
    let manifest = dir.path().join("manifest.json");
    fs::write(&manifest, MANIFEST).unwrap();

    model_tool()
        .arg("resolve")
        .arg(&manifest)
        .args(["--class", "Cyberdemon"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown actor class"));
}
