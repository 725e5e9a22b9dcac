//! Parsed configuration consumed by the deployment core.
//!
//! Loading and parsing configuration files is a collaborator concern; these
//! types are the already-parsed shape the orchestrator works against.

mod paths;

pub use paths::Paths;

use std::collections::BTreeMap;

use serde::Deserialize;

/// One command or an ordered list of commands.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CommandList {
    Single(String),
    Many(Vec<String>),
}

impl CommandList {
    /// The commands in execution order.
    pub fn commands(&self) -> Vec<&str> {
        match self {
            CommandList::Single(cmd) => vec![cmd.as_str()],
            CommandList::Many(cmds) => cmds.iter().map(String::as_str).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CommandList::Single(_) => false,
            CommandList::Many(cmds) => cmds.is_empty(),
        }
    }
}

impl Default for CommandList {
    fn default() -> Self {
        CommandList::Many(Vec::new())
    }
}

/// Per-branch configuration mapping.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BranchConfig {
    /// Environment overrides. Values may reference `$VARS`; entries are
    /// applied in key order, each against the environment built so far.
    pub env: BTreeMap<String, String>,
    /// Named lifecycle hooks (`build`, ...), each one command or a list.
    pub hooks: BTreeMap<String, CommandList>,
    /// Operator-invocable commands run inside the checkout.
    pub custom_cmds: BTreeMap<String, String>,
    /// Commands prepended to every generated run script.
    pub before_cmds: CommandList,
    /// Runner configurations keyed by runner name.
    pub runners: BTreeMap<String, RunnerConfig>,
}

/// Configuration for one runner.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Command the generated run script `exec`s. Required at configure time.
    pub cmd: Option<String>,
    /// Number of service instances to run.
    pub process_count: usize,
    /// Override for the run-script template.
    pub run_template: Option<String>,
    /// Override for the log-script template.
    pub log_template: Option<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            cmd: None,
            process_count: 1,
            run_template: None,
            log_template: None,
        }
    }
}
