use assert_cmd::prelude::*; // Add methods on commands
use image::{ImageFormat, Rgb, RgbImage};
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;

struct Workspace {
    _root: tempfile::TempDir,
    config: PathBuf,
    images: PathBuf,
    artifact: PathBuf,
    static_dir: PathBuf,
}

fn workspace() -> Workspace {
    let root = tempfile::tempdir().unwrap();
    let images = root.path().join("images");
    let artifact = root.path().join("artifacts").join("catalog.bin");
    let static_dir = root.path().join("static");
    std::fs::create_dir_all(&images).unwrap();

    let config = root.path().join("lookalike.toml");
    std::fs::write(
        &config,
        format!(
            "artifact_path = '{}'\nsource_dir = '{}'\nstatic_dir = '{}'\ndefault_top_k = 2\n\n[embedding]\nbins_per_channel = 4\ninput_size = 32\n",
            artifact.display(),
            images.display(),
            static_dir.display()
        ),
    )
    .unwrap();

    Workspace {
        _root: root,
        config,
        images,
        artifact,
        static_dir,
    }
}

fn write_png(dir: &Path, name: &str, color: [u8; 3]) {
    RgbImage::from_pixel(20, 20, Rgb(color))
        .save_with_format(dir.join(name), ImageFormat::Png)
        .unwrap();
}

fn lookalike(ws: &Workspace) -> Command {
    let mut cmd = Command::cargo_bin("lookalike").expect("binary built");
    cmd.arg("--config").arg(&ws.config);
    cmd
}

fn seed(ws: &Workspace) {
    write_png(&ws.images, "10000.png", [240, 20, 20]);
    write_png(&ws.images, "10001.png", [20, 240, 20]);
    write_png(&ws.images, "10002.png", [20, 20, 240]);
}

#[test]
fn health_without_artifact_reports_degraded() {
    let ws = workspace();
    let output = lookalike(&ws).args(["health", "--json"]).output().unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["status"], "degraded");
    assert_eq!(report["entries"], 0);
    assert!(report["last_reload_error"].is_string());
}

#[test]
fn build_then_recommend() {
    let ws = workspace();
    seed(&ws);

    lookalike(&ws)
        .arg("build")
        .assert()
        .success()
        .stdout(predicate::str::contains("Catalog published"));
    assert!(ws.artifact.is_file());

    let output = lookalike(&ws)
        .arg("recommend")
        .arg(ws.images.join("10001.png"))
        .args(["-k", "1", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let matches = result["matches"].as_array().unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0]["file_name"], "10001.png");
    assert_eq!(matches[0]["rank"], 1);

    let output = lookalike(&ws).args(["health", "--json"]).output().unwrap();
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["status"], "healthy");
    assert_eq!(report["entries"], 3);
}

#[test]
fn recommend_uses_configured_default_k() {
    let ws = workspace();
    seed(&ws);
    lookalike(&ws).arg("build").assert().success();

    let output = lookalike(&ws)
        .arg("recommend")
        .arg(ws.images.join("10000.png"))
        .arg("--json")
        .output()
        .unwrap();
    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["matches"].as_array().unwrap().len(), 2);
}

#[test]
fn zero_k_is_rejected() {
    let ws = workspace();
    seed(&ws);
    lookalike(&ws).arg("build").assert().success();

    lookalike(&ws)
        .arg("recommend")
        .arg(ws.images.join("10000.png"))
        .args(["-k", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid argument"));
}

#[test]
fn build_with_broken_image_fails_without_artifact() {
    let ws = workspace();
    seed(&ws);
    std::fs::write(ws.images.join("10003.png"), b"not really a png").unwrap();

    lookalike(&ws)
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("10003.png"));
    assert!(!ws.artifact.exists());
}

#[test]
fn mirror_copies_catalog_images() {
    let ws = workspace();
    seed(&ws);
    lookalike(&ws).arg("build").assert().success();

    lookalike(&ws)
        .arg("mirror")
        .assert()
        .success()
        .stdout(predicate::str::contains("3 copied"));
    assert!(ws.static_dir.join("10002.png").is_file());
}

#[test]
fn missing_config_file_fails() {
    let mut cmd = Command::cargo_bin("lookalike").expect("binary built");
    cmd.args(["--config", "/no/such/lookalike.toml", "health"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}
