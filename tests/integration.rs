use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn harvest_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("harvest");
    path
}

fn write_config(root: &Path, body: &str) -> PathBuf {
    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let path = config_dir.join("harvest.toml");
    fs::write(&path, body).unwrap();
    path
}

fn valid_config(root: &Path) -> String {
    format!(
        r#"[primary]
url = "postgres://harvest@localhost/profiles"

[secondary]
url = "postgres://harvest@localhost/reference"

[extract]
batch_size = 500

[output]
path = "{}/data/data.json"

[payload]
separator = "."
"#,
        root.display()
    )
}

fn run_harvest(config: &Path, args: &[&str]) -> std::process::Output {
    Command::new(harvest_binary())
        .arg("--config")
        .arg(config)
        .args(args)
        .output()
        .expect("failed to run harvest binary")
}

#[test]
fn test_entities_lists_registry() {
    let tmp = TempDir::new().unwrap();
    let output = run_harvest(&tmp.path().join("missing.toml"), &["entities"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("preferred_work_locations"));
    assert!(stdout.contains("user_work_experiences"));
    assert!(stdout.contains("lookup: subject_id -> subjects.name as subject"));
    assert!(stdout.contains("15 entities"));
}

#[test]
fn test_payload_from_artifact() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    let config = write_config(root, &valid_config(root));
    fs::create_dir_all(root.join("data")).unwrap();
    fs::write(
        root.join("data/data.json"),
        r#"[{"user_id":1,"user_skills":[{"skill_name":"Algebra"}]},{"user_id":2,"user_skills":[]}][{"user_id":3,"user_awards":[{"title":"Best Teacher","issuer":"CBSE"}]}]"#,
    )
    .unwrap();

    let out = root.join("payload.jsonl");
    let output = run_harvest(&config, &["payload", "--output", out.to_str().unwrap()]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let content = fs::read_to_string(&out).unwrap();
    let lines: Vec<serde_json::Value> = content
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[0]["text"],
        "user_id: 1 user_skills.0.skill_name: Algebra"
    );
    assert_eq!(lines[1]["text"], "user_id: 2");
    assert_eq!(lines[2]["user_id"], 3);
    assert_eq!(
        lines[2]["text"],
        "user_id: 3 user_awards.0.title: Best Teacher user_awards.0.issuer: CBSE"
    );
}

#[test]
fn test_payload_to_stdout_without_config() {
    let tmp = TempDir::new().unwrap();
    let artifact = tmp.path().join("export.json");
    fs::write(&artifact, r#"[{"user_id":"x","user_profiles":[{"gender":"FEMALE"}]}]"#).unwrap();

    let output = run_harvest(
        &tmp.path().join("missing.toml"),
        &["payload", "--input", artifact.to_str().unwrap()],
    );
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim(),
        r#"{"user_id":"x","text":"user_id: x user_profiles_0_gender: FEMALE"}"#
    );
}

#[test]
fn test_payload_rejects_malformed_artifact() {
    let tmp = TempDir::new().unwrap();
    let artifact = tmp.path().join("export.json");
    fs::write(&artifact, r#"{"user_id":1}"#).unwrap();

    let output = run_harvest(
        &tmp.path().join("missing.toml"),
        &["payload", "--input", artifact.to_str().unwrap()],
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("not a JSON array"));
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let output = run_harvest(&tmp.path().join("missing.toml"), &["check"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to read config file"));
}

#[test]
fn test_invalid_url_rejected() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    let body = valid_config(root).replace(
        "postgres://harvest@localhost/reference",
        "mysql://harvest@localhost/reference",
    );
    let config = write_config(root, &body);

    let output = run_harvest(&config, &["run", "--dry-run"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("secondary.url"));
}

#[test]
fn test_zero_batch_size_rejected() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    let body = valid_config(root).replace("batch_size = 500", "batch_size = 0");
    let config = write_config(root, &body);

    let output = run_harvest(&config, &["users"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("extract.batch_size must be > 0"));
}

#[test]
fn test_entities_single_and_unknown() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("missing.toml");

    let output = run_harvest(&config, &["entities", "user_languages"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("user_languages\n"));
    assert!(stdout.contains("lookup: language_id -> languages.name as language"));
    assert!(!stdout.contains("user_skills"));
    assert!(!stdout.contains("entities"));

    let output = run_harvest(&config, &["entities", "user_hobbies"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown entity type: user_hobbies"));
}

#[test]
fn test_payload_invalid_config_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    let body = valid_config(root).replace("separator = \".\"", "separator = \"\"");
    let config = write_config(root, &body);
    let artifact = root.join("export.json");
    fs::write(&artifact, r#"[{"user_id":1,"user_skills":[{"skill_name":"Algebra"}]}]"#).unwrap();

    let output = run_harvest(&config, &["payload", "--input", artifact.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("payload.separator must not be empty"));
}
