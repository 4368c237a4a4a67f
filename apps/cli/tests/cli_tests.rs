//! CLI 集成测试（不需要硬件）

use assert_cmd::Command;
use predicates::prelude::*;

fn cli() -> Command {
    Command::cargo_bin("uarm-cli").unwrap()
}

#[test]
fn test_help_lists_commands() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("move-xyz"))
        .stdout(predicate::str::contains("positions"));
}

#[test]
fn test_positions_reads_config_and_file() {
    let dir = tempfile::tempdir().unwrap();
    let positions = dir.path().join("Positions.txt");
    std::fs::write(&positions, "Field positions\nB2: 3 250\n").unwrap();
    let config = dir.path().join("uarm.toml");
    std::fs::write(
        &config,
        format!("positions_file = {:?}\n", positions.display().to_string()),
    )
    .unwrap();

    cli()
        .arg("--config")
        .arg(&config)
        .arg("positions")
        .assert()
        .success()
        .stdout(predicate::str::contains("B2:     3   250    60"))
        .stdout(predicate::str::contains("P1:  -131    39    60"));
}

#[test]
fn test_positions_write_exports_table() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("uarm.toml");
    let positions = dir.path().join("Positions.txt");
    std::fs::write(
        &config,
        format!("positions_file = {:?}\n", positions.display().to_string()),
    )
    .unwrap();
    let out = dir.path().join("export.txt");

    cli()
        .arg("--config")
        .arg(&config)
        .args(["positions", "--write"])
        .arg(&out)
        .assert()
        .success();

    // 不存在的位置文件会被创建
    assert!(positions.exists());
    let text = std::fs::read_to_string(&out).unwrap();
    assert!(text.starts_with("This file contains"));
    assert!(text.contains("R5: -121 300"));
}

#[test]
fn test_missing_port_fails_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("uarm.toml");
    std::fs::write(&config, "positions_file = \"unused.txt\"\n").unwrap();

    cli()
        .current_dir(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["--port", "/dev/this-port-does-not-exist-uarm", "position"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("/dev/this-port-does-not-exist-uarm"));
}

#[test]
fn test_invalid_config_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("uarm.toml");
    std::fs::write(&config, "baud_rate = \"fast\"\n").unwrap();

    cli()
        .arg("--config")
        .arg(&config)
        .arg("positions")
        .assert()
        .failure();
}
