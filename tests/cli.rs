use std::fs;
use std::str;

use anyhow::Result;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

fn credscope(root: &TempDir) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("credscope");
    cmd.env_remove("RUST_LOG")
        .env_remove("CREDSCOPE_ROOT")
        .env_remove("CREDSCOPE_HOST")
        .env("NO_COLOR", "1")
        .arg("--root")
        .arg(root.path())
        .arg("--host")
        .arg("test-box")
        .arg("--non-interactive");
    cmd
}

#[test]
fn show_with_nothing_configured_gives_guidance() -> Result<()> {
    let root = TempDir::new()?;
    credscope(&root)
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("No usable credentials for host test-box"))
        .stdout(predicate::str::contains("credscope set-personal"));
    Ok(())
}

#[test]
fn set_personal_then_show_reports_personal_scope() -> Result<()> {
    let root = TempDir::new()?;
    credscope(&root)
        .args(["set-personal", "--username", "alice", "--password-stdin"])
        .write_stdin("alice-secret\n")
        .assert()
        .success();

    assert!(root.path().join("config/hosts/test-box/auth.enc").is_file());

    let assert = credscope(&root).arg("show").assert().success();
    let stdout = str::from_utf8(&assert.get_output().stdout)?;
    assert!(stdout.contains("Active: personal credentials"));
    assert!(stdout.contains("user: alice"));
    assert!(!stdout.contains("alice-secret"));
    Ok(())
}

#[test]
fn remove_personal_falls_back_to_project() -> Result<()> {
    let root = TempDir::new()?;
    credscope(&root)
        .args(["set-project", "--yes", "--username", "bot", "--password-stdin"])
        .write_stdin("bot-secret")
        .assert()
        .success();
    credscope(&root)
        .args(["set-personal", "--username", "alice", "--password-stdin"])
        .write_stdin("alice-secret")
        .assert()
        .success();

    credscope(&root)
        .arg("remove-personal")
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed personal credentials for host test-box"))
        .stdout(predicate::str::contains("Active: project credentials"));
    Ok(())
}

#[test]
fn set_project_requires_yes_when_non_interactive() -> Result<()> {
    let root = TempDir::new()?;
    credscope(&root)
        .args(["set-project", "--username", "bot", "--password-stdin"])
        .write_stdin("bot-secret")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--yes"));
    assert!(!root.path().join("config/auth.enc").exists());
    Ok(())
}

#[test]
fn set_personal_requires_username_when_non_interactive() -> Result<()> {
    let root = TempDir::new()?;
    credscope(&root)
        .args(["set-personal", "--password-stdin"])
        .write_stdin("secret")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--username"));
    Ok(())
}

#[test]
fn empty_password_is_rejected() -> Result<()> {
    let root = TempDir::new()?;
    credscope(&root)
        .args(["set-personal", "--username", "alice", "--password-stdin"])
        .write_stdin("\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("password is empty"));
    Ok(())
}

#[test]
fn show_json_contains_no_password() -> Result<()> {
    let root = TempDir::new()?;
    fs::write(
        root.path().join("config.yaml"),
        "basic:\n  username: plain-user\n  password: plain-secret\n",
    )?;

    let assert = credscope(&root)
        .args(["show", "--format", "json"])
        .assert()
        .success();
    let stdout = str::from_utf8(&assert.get_output().stdout)?;
    let report: serde_json::Value = serde_json::from_str(stdout)?;
    assert_eq!(report["active"]["scope"], "plaintext");
    assert_eq!(report["active"]["insecure"], true);
    assert_eq!(report["host"], "test-box");
    assert!(!stdout.contains("plain-secret"));
    Ok(())
}

#[test]
fn audit_log_records_mutations() -> Result<()> {
    let root = TempDir::new()?;
    credscope(&root)
        .args(["set-personal", "--username", "alice", "--password-stdin"])
        .write_stdin("alice-secret")
        .assert()
        .success();
    credscope(&root).arg("remove-personal").assert().success();

    credscope(&root)
        .args(["audit", "log"])
        .assert()
        .success()
        .stdout(predicate::str::contains("set-personal"))
        .stdout(predicate::str::contains("remove-personal"));
    credscope(&root)
        .args(["audit", "verify"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Audit chain ok (2 entries)"));

    let log = fs::read_to_string(root.path().join("config/audit.log"))?;
    assert!(!log.contains("alice-secret"));
    Ok(())
}

#[test]
fn invalid_host_is_rejected() -> Result<()> {
    let root = TempDir::new()?;
    let mut cmd = cargo_bin_cmd!("credscope");
    cmd.arg("--root")
        .arg(root.path())
        .args(["--host", "../escape", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("path traversal"));
    Ok(())
}
