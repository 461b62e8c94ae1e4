//! Execution-recipe templates.
//!
//! A `Plan` describes *how* a command is invoked (command, arguments, input
//! and output path patterns, accepted exit codes), independent of any single
//! run. Plans are deduplicated by structural similarity, not by id.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::id::PlanId;
use crate::path::normalize;

/// Standard stream a pattern is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd)]
#[serde(rename_all = "lowercase")]
pub enum MappedStream {
    Stdin,
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Argument {
    pub value: String,
    #[serde(default)]
    pub position: Option<i64>,
    #[serde(default)]
    pub prefix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputPattern {
    pub consumes: String,
    #[serde(default)]
    pub position: Option<i64>,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub mapped_to: Option<MappedStream>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputPattern {
    pub produces: String,
    #[serde(default)]
    pub position: Option<i64>,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub mapped_to: Option<MappedStream>,
    #[serde(default)]
    pub create_folder: bool,
}

impl InputPattern {
    pub fn new(consumes: &str) -> Self {
        Self {
            consumes: normalize(consumes),
            position: None,
            prefix: None,
            mapped_to: None,
        }
    }
}

impl OutputPattern {
    pub fn new(produces: &str) -> Self {
        Self {
            produces: normalize(produces),
            position: None,
            prefix: None,
            mapped_to: None,
            create_folder: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    pub name: String,
    pub command: String,
    pub arguments: Vec<Argument>,
    pub inputs: Vec<InputPattern>,
    pub outputs: Vec<OutputPattern>,
    pub success_codes: Vec<i32>,
}

impl Plan {
    /// New plan with a fresh id; pattern paths are normalized.
    pub fn new(
        command: impl Into<String>,
        arguments: Vec<Argument>,
        inputs: Vec<InputPattern>,
        outputs: Vec<OutputPattern>,
        success_codes: Vec<i32>,
    ) -> Self {
        let id = PlanId::generate();
        let command = command.into();
        let name = default_name(&command, id);
        let inputs = inputs
            .into_iter()
            .map(|mut i| {
                i.consumes = normalize(&i.consumes);
                i
            })
            .collect();
        let outputs = outputs
            .into_iter()
            .map(|mut o| {
                o.produces = normalize(&o.produces);
                o
            })
            .collect();
        let success_codes = if success_codes.is_empty() {
            vec![0]
        } else {
            success_codes
        };
        Self {
            id,
            name,
            command,
            arguments,
            inputs,
            outputs,
            success_codes,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_id(mut self, id: PlanId) -> Self {
        self.id = id;
        self
    }

    pub fn input_paths(&self) -> impl Iterator<Item = &str> {
        self.inputs.iter().map(|i| i.consumes.as_str())
    }

    pub fn output_paths(&self) -> impl Iterator<Item = &str> {
        self.outputs.iter().map(|o| o.produces.as_str())
    }

    /// Structural equivalence used for deduplication: same command, success
    /// codes, input/output pattern sets and arguments. Ids and names are
    /// ignored.
    pub fn is_similar_to(&self, other: &Plan) -> bool {
        fn inputs(p: &Plan) -> BTreeSet<&str> {
            p.input_paths().collect()
        }
        fn outputs(p: &Plan) -> BTreeSet<&str> {
            p.output_paths().collect()
        }
        fn arguments(p: &Plan) -> BTreeSet<(Option<i64>, Option<&str>, &str)> {
            p.arguments
                .iter()
                .map(|a| (a.position, a.prefix.as_deref(), a.value.as_str()))
                .collect()
        }
        fn codes(p: &Plan) -> BTreeSet<i32> {
            p.success_codes.iter().copied().collect()
        }

        self.command == other.command
            && codes(self) == codes(other)
            && inputs(self) == inputs(other)
            && outputs(self) == outputs(other)
            && arguments(self) == arguments(other)
    }
}

/// `<sanitized-command>-<uuid-hex>`.
fn default_name(command: &str, id: PlanId) -> String {
    let sanitized: String = command
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let sanitized = sanitized.trim_matches(|c| c == '.' || c == '_');
    if sanitized.is_empty() {
        format!("plan-{}", id.simple())
    } else {
        format!("{}-{}", sanitized, id.simple())
    }
}
