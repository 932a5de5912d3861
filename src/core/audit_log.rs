//! Append-only, hash-chained audit trail for credential mutations.
//!
//! Entries carry metadata only; secrets never reach this file.

use crate::constants;
use crate::core::file_lock::FileLock;
use crate::core::paths::ProjectPaths;
use crate::models::credential::Scope;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub actor: String,
    pub scope: Scope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_hash: Option<String>,
}

fn detect_actor() -> String {
    if let Ok(user) = std::env::var("SUDO_USER") {
        if !user.is_empty() {
            return format!("{}(sudo)", user);
        }
    }
    std::env::var("USER").unwrap_or_else(|_| "unknown".to_string())
}

/// Log an action with auto-detected actor.
pub fn log(paths: &ProjectPaths, action: &str, scope: Scope, host: Option<&str>) -> Result<()> {
    log_action(paths, action, scope, host, &detect_actor())
}

pub fn log_action(
    paths: &ProjectPaths,
    action: &str,
    scope: Scope,
    host: Option<&str>,
    actor: &str,
) -> Result<()> {
    fs::create_dir_all(&paths.config_dir)
        .with_context(|| format!("create {}", paths.config_dir.display()))?;
    let _lock = FileLock::exclusive(&paths.audit_lock)?;
    let prev_hash = last_entry_hash(&paths.audit_log)?;

    let mut entry = AuditEntry {
        timestamp: Utc::now(),
        action: action.to_string(),
        actor: actor.to_string(),
        scope,
        host: host.map(str::to_string),
        prev_hash,
        entry_hash: None,
    };
    entry.entry_hash = Some(compute_entry_hash(&entry)?);

    let line = serde_json::to_string(&entry).context("serialize audit entry")?;
    append_line(&paths.audit_log, &line)
}

/// Canonical hash of an entry, excluding its own `entry_hash`.
fn compute_entry_hash(entry: &AuditEntry) -> Result<String> {
    let mut value = serde_json::to_value(entry).context("serialize for hash")?;
    if let Some(obj) = value.as_object_mut() {
        obj.remove("entry_hash");
    }
    let canonical = canonicalize_value(&value);
    let canonical_str = serde_json::to_string(&canonical).context("serialize canonical json")?;
    Ok(format!("{:x}", Sha256::digest(canonical_str.as_bytes())))
}

/// Recursively sort object keys so hashing is independent of field order.
fn canonicalize_value(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = serde_json::Map::new();
            for k in keys {
                out.insert(k.clone(), canonicalize_value(&map[k]));
            }
            serde_json::Value::Object(out)
        }
        serde_json::Value::Array(arr) => {
            serde_json::Value::Array(arr.iter().map(canonicalize_value).collect())
        }
        other => other.clone(),
    }
}

fn append_line(audit_path: &Path, line: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(audit_path)
        .with_context(|| format!("open audit log {}", audit_path.display()))?;
    writeln!(file, "{}", line).context("write audit entry")?;

    #[cfg(unix)]
    {
        let perm = fs::Permissions::from_mode(constants::AUDIT_LOG_MODE);
        fs::set_permissions(audit_path, perm).context("set audit log permissions")?;
    }

    Ok(())
}

fn last_entry_hash(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("read audit log {}", path.display()))?;
    let Some(last) = content.lines().rev().find(|l| !l.trim().is_empty()) else {
        return Ok(None);
    };
    if let Ok(entry) = serde_json::from_str::<AuditEntry>(last) {
        if let Some(hash) = entry.entry_hash {
            return Ok(Some(hash));
        }
    }
    // Unparseable tail: chain onto the raw line so verification still links.
    Ok(Some(format!("{:x}", Sha256::digest(last.trim().as_bytes()))))
}

/// Read audit entries, keeping the last `limit` when given.
pub fn read_log(paths: &ProjectPaths, limit: Option<usize>) -> Result<Vec<AuditEntry>> {
    if !paths.audit_log.exists() {
        return Ok(Vec::new());
    }

    let file = fs::File::open(&paths.audit_log)
        .with_context(|| format!("open audit log {}", paths.audit_log.display()))?;
    let reader = BufReader::new(file);
    let mut entries = Vec::new();
    let mut malformed = 0usize;

    for line in reader.lines() {
        let line = line.context("read audit log line")?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<AuditEntry>(trimmed) {
            Ok(entry) => entries.push(entry),
            Err(_) => malformed += 1,
        }
    }

    if malformed > 0 {
        tracing::warn!(malformed, "skipped malformed audit entries");
    }

    if let Some(limit) = limit {
        if entries.len() > limit {
            entries = entries.split_off(entries.len() - limit);
        }
    }

    Ok(entries)
}

/// Verify the integrity of the audit chain. Returns (total, errors).
pub fn verify_chain(paths: &ProjectPaths) -> Result<(usize, Vec<String>)> {
    let entries = read_log(paths, None)?;
    let mut errors = Vec::new();
    let mut prev_entry_hash: Option<String> = None;

    for (i, entry) in entries.iter().enumerate() {
        if i > 0 && entry.prev_hash != prev_entry_hash {
            errors.push(format!(
                "entry {}: prev_hash mismatch (expected {:?}, got {:?})",
                i + 1,
                prev_entry_hash,
                entry.prev_hash
            ));
        }

        match (&entry.entry_hash, compute_entry_hash(entry)) {
            (Some(stored), Ok(computed)) if *stored != computed => {
                errors.push(format!("entry {}: entry_hash mismatch (tampered?)", i + 1));
            }
            (None, _) => errors.push(format!("entry {}: entry_hash missing", i + 1)),
            (_, Err(e)) => errors.push(format!("entry {}: cannot compute hash: {}", i + 1, e)),
            _ => {}
        }

        prev_entry_hash = entry.entry_hash.clone();
    }

    Ok((entries.len(), errors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_paths() -> (TempDir, ProjectPaths) {
        let dir = TempDir::new().unwrap();
        let paths = ProjectPaths::from_root(dir.path().to_path_buf());
        (dir, paths)
    }

    #[test]
    fn test_log_and_read() {
        let (_dir, paths) = test_paths();
        log_action(&paths, "set-personal", Scope::Personal, Some("box"), "tester").unwrap();
        let entries = read_log(&paths, None).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, "set-personal");
        assert_eq!(entries[0].scope, Scope::Personal);
        assert_eq!(entries[0].host.as_deref(), Some("box"));
        assert!(entries[0].prev_hash.is_none());
        assert!(entries[0].entry_hash.is_some());
    }

    #[test]
    fn test_entries_are_chained() {
        let (_dir, paths) = test_paths();
        log_action(&paths, "set-project", Scope::Project, None, "tester").unwrap();
        log_action(&paths, "remove-project", Scope::Project, None, "tester").unwrap();
        let entries = read_log(&paths, None).unwrap();
        assert_eq!(entries[1].prev_hash, entries[0].entry_hash);
    }

    #[test]
    fn test_read_log_with_limit() {
        let (_dir, paths) = test_paths();
        for i in 0..5 {
            log_action(&paths, &format!("action_{}", i), Scope::Project, None, "tester").unwrap();
        }
        let entries = read_log(&paths, Some(2)).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].action, "action_4");
    }

    #[test]
    fn test_read_log_nonexistent() {
        let (_dir, paths) = test_paths();
        assert!(read_log(&paths, None).unwrap().is_empty());
    }

    #[test]
    fn test_canonical_json_deterministic() {
        let c1 = canonicalize_value(&serde_json::json!({"b": 1, "a": {"d": 2, "c": 3}}));
        let c2 = canonicalize_value(&serde_json::json!({"a": {"c": 3, "d": 2}, "b": 1}));
        let s1 = serde_json::to_string(&c1).unwrap();
        assert_eq!(s1, serde_json::to_string(&c2).unwrap());
        assert_eq!(s1, r#"{"a":{"c":3,"d":2},"b":1}"#);
    }

    #[test]
    fn test_verify_chain_ok() {
        let (_dir, paths) = test_paths();
        log_action(&paths, "set-personal", Scope::Personal, Some("box"), "tester").unwrap();
        log_action(&paths, "set-project", Scope::Project, None, "tester").unwrap();
        log_action(&paths, "remove-personal", Scope::Personal, Some("box"), "tester").unwrap();
        let (total, errors) = verify_chain(&paths).unwrap();
        assert_eq!(total, 3);
        assert!(errors.is_empty(), "errors: {:?}", errors);
    }

    #[test]
    fn test_verify_chain_detects_tamper() {
        let (_dir, paths) = test_paths();
        log_action(&paths, "set-project", Scope::Project, None, "alice").unwrap();
        log_action(&paths, "remove-project", Scope::Project, None, "alice").unwrap();

        let content = fs::read_to_string(&paths.audit_log).unwrap();
        fs::write(&paths.audit_log, content.replace("alice", "mallory")).unwrap();

        let (total, errors) = verify_chain(&paths).unwrap();
        assert_eq!(total, 2);
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_verify_chain_detects_removed_entry() {
        let (_dir, paths) = test_paths();
        for action in ["set-project", "set-personal", "remove-personal"] {
            log_action(&paths, action, Scope::Project, None, "tester").unwrap();
        }
        let content = fs::read_to_string(&paths.audit_log).unwrap();
        let kept: Vec<&str> = content
            .lines()
            .enumerate()
            .filter(|(i, _)| *i != 1)
            .map(|(_, l)| l)
            .collect();
        fs::write(&paths.audit_log, kept.join("\n") + "\n").unwrap();

        let (total, errors) = verify_chain(&paths).unwrap();
        assert_eq!(total, 2);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("prev_hash mismatch"));
    }
}
