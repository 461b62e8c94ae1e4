//! Raw execution records.
//!
//! A run leaves one YAML record under the workflow directory. References in
//! it carry a path and role but only an approximate revision.
//!
//! Single command:
//! ```yaml
//! kind: command
//! command: python
//! arguments: [{ value: "clean.py" }]
//! inputs: [{ consumes: "data/raw.csv" }]
//! outputs: [{ produces: "data/clean.csv" }]
//! usages: [{ path: "data/raw.csv", role: "input-1" }]
//! generations: [{ path: "data/clean.csv", role: "output-1" }]
//! ```
//!
//! Workflow:
//! ```yaml
//! kind: workflow
//! steps:
//!   - index: 2
//!     command: wc
//!     ...
//!   - index: 1
//!     command: sort
//!     ...
//! ```

use serde::{Deserialize, Serialize};

use lineage_core::activity::Agent;
use lineage_core::error::{Error, Result};
use lineage_core::plan::{Argument, InputPattern, OutputPattern, Plan};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum RawRecord {
    #[serde(rename = "command")]
    Command(RawRun),

    #[serde(rename = "workflow")]
    Workflow {
        #[serde(default)]
        name: Option<String>,
        steps: Vec<RawStep>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawStep {
    #[serde(default)]
    pub index: Option<u32>,
    #[serde(flatten)]
    pub run: RawRun,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRun {
    #[serde(default)]
    pub name: Option<String>,
    pub command: String,
    #[serde(default)]
    pub arguments: Vec<Argument>,
    #[serde(default)]
    pub inputs: Vec<InputPattern>,
    #[serde(default)]
    pub outputs: Vec<OutputPattern>,
    #[serde(default)]
    pub success_codes: Vec<i32>,
    #[serde(default)]
    pub agents: Vec<Agent>,
    #[serde(default)]
    pub started_ms: Option<u64>,
    #[serde(default)]
    pub ended_ms: Option<u64>,
    #[serde(default)]
    pub usages: Vec<RawReference>,
    #[serde(default)]
    pub generations: Vec<RawReference>,
    #[serde(default)]
    pub invalidations: Vec<RawReference>,
}

/// A path reference with an approximate revision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawReference {
    pub path: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub revision: Option<String>,
}

/// Parse a YAML record. Malformed input is an `Error::Record`.
pub fn parse_record(yaml_src: &str) -> Result<RawRecord> {
    let record: RawRecord =
        serde_yaml::from_str(yaml_src).map_err(|e| Error::Record(e.to_string()))?;
    record.validate()?;
    Ok(record)
}

impl RawRecord {
    /// Runs in execution order: steps sort by `index`, falling back to their
    /// position in the document.
    pub fn runs(&self) -> Vec<&RawRun> {
        match self {
            RawRecord::Command(run) => vec![run],
            RawRecord::Workflow { steps, .. } => {
                let mut ordered: Vec<(u64, &RawRun)> = steps
                    .iter()
                    .enumerate()
                    .map(|(pos, s)| (s.index.map(u64::from).unwrap_or(pos as u64), &s.run))
                    .collect();
                ordered.sort_by_key(|(key, _)| *key);
                ordered.into_iter().map(|(_, run)| run).collect()
            }
        }
    }

    fn validate(&self) -> Result<()> {
        let runs = self.runs();
        if runs.is_empty() {
            return Err(Error::Record("workflow has no steps".into()));
        }
        for run in runs {
            if run.command.trim().is_empty() {
                return Err(Error::Record("run has an empty command".into()));
            }
            if let (Some(start), Some(end)) = (run.started_ms, run.ended_ms) {
                if end < start {
                    return Err(Error::Record(format!(
                        "'{}' ends ({end}) before it starts ({start})",
                        run.command
                    )));
                }
            }
        }
        Ok(())
    }
}

impl RawRun {
    /// The recipe template of this run.
    pub fn to_plan(&self) -> Plan {
        let plan = Plan::new(
            self.command.clone(),
            self.arguments.clone(),
            self.inputs.clone(),
            self.outputs.clone(),
            self.success_codes.clone(),
        );
        match &self.name {
            Some(name) => plan.with_name(name.clone()),
            None => plan,
        }
    }
}

impl RawReference {
    /// Explicit role, or `<prefix>-<n>` (1-based) when the record omits it.
    pub fn role_or(&self, prefix: &str, position: usize) -> String {
        self.role
            .clone()
            .unwrap_or_else(|| format!("{prefix}-{}", position + 1))
    }
}
