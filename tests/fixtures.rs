//! Shared fixtures for the workspace integration tests.

#![allow(dead_code)]

use lineage_core::plan::{InputPattern, OutputPattern, Plan};
use std::path::PathBuf;

/// Fresh scratch directory under the system temp dir.
pub fn temp_dir(label: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "lineage-it-{}-{}-{}",
        label,
        std::process::id(),
        nanos
    ));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

pub fn plan(command: &str, inputs: &[&str], outputs: &[&str]) -> Plan {
    Plan::new(
        command,
        vec![],
        inputs.iter().map(|p| InputPattern::new(p)).collect(),
        outputs.iter().map(|p| OutputPattern::new(p)).collect(),
        vec![],
    )
}

/// A single-command record reading `inputs` and writing `outputs`.
pub fn command_record(command: &str, inputs: &[&str], outputs: &[&str]) -> String {
    let mut yaml = format!("kind: command\ncommand: {command}\n");
    if !inputs.is_empty() {
        yaml.push_str("inputs:\n");
        for p in inputs {
            yaml.push_str(&format!("  - consumes: {p}\n"));
        }
        yaml.push_str("usages:\n");
        for p in inputs {
            yaml.push_str(&format!("  - path: {p}\n"));
        }
    }
    if !outputs.is_empty() {
        yaml.push_str("outputs:\n");
        for p in outputs {
            yaml.push_str(&format!("  - produces: {p}\n"));
        }
        yaml.push_str("generations:\n");
        for p in outputs {
            yaml.push_str(&format!("  - path: {p}\n"));
        }
    }
    yaml
}

pub fn strings(items: &[&str]) -> std::collections::BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}
