use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn randshade(config_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_randshade"))
        .env("RANDSHADE_CONFIG_DIR", config_dir)
        .env_remove("RANDSHADE_CONFIG")
        .env("RUST_LOG", "warn")
        .args(args)
        .output()
        .expect("failed to run randshade")
}

#[test]
fn seeded_generate_is_reproducible() {
    let root = TempDir::new().unwrap();

    let first = randshade(root.path(), &["generate", "--seed", "7"]);
    let second = randshade(root.path(), &["generate", "--seed", "7"]);

    assert!(first.status.success());
    assert!(second.status.success());
    assert_eq!(first.stdout, second.stdout);

    let stdout = String::from_utf8(first.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("red:"));
    assert!(lines[1].starts_with("green:"));
    assert!(lines[2].starts_with("blue:"));
    assert!(!stdout.contains('$'));
}

#[test]
fn generated_source_validates() {
    let root = TempDir::new().unwrap();

    let output = randshade(
        root.path(),
        &["generate", "--seed", "3", "--depth", "4", "--source", "--validate"],
    );

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let source = String::from_utf8(output.stdout).unwrap();
    assert!(source.starts_with("#version 450"));
    assert!(source.contains("fragColor = vec4(red, green, blue, 1.0);"));
}

#[test]
fn config_in_config_dir_is_picked_up() {
    let root = TempDir::new().unwrap();
    fs::write(
        root.path().join("randshade.toml"),
        "[generator]\ndepth = 1\nseed = 4\ntemplates = [\"abs($)\"]\n",
    )
    .unwrap();

    let output = randshade(root.path(), &["generate"]);

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    for line in stdout.lines() {
        let (_, expr) = line.split_once(':').unwrap();
        assert!(expr.trim().starts_with("abs("), "unexpected line {line}");
    }
}

#[test]
fn invalid_config_is_rejected() {
    let root = TempDir::new().unwrap();
    let config = root.path().join("broken.toml");
    fs::write(&config, "[generator]\ndepth = 99\n").unwrap();

    let output = randshade(
        root.path(),
        &["generate", "--config", config.to_str().unwrap()],
    );

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("depth"), "stderr: {stderr}");
}

#[test]
fn missing_explicit_config_is_an_error() {
    let root = TempDir::new().unwrap();
    let missing = root.path().join("nope.toml");

    let output = randshade(
        root.path(),
        &["generate", "--config", missing.to_str().unwrap()],
    );

    assert!(!output.status.success());
}
