//! Repository and branch deployment context.

use std::path::PathBuf;

use crate::checkout::Checkout;
use crate::config::{BranchConfig, RunnerConfig};
use crate::error::{Error, Result};

/// A registered source repository. Immutable once registered.
#[derive(Debug, Clone)]
pub struct Repo {
    pub name: String,
    /// Canonical on-disk git repository path.
    pub path: PathBuf,
}

impl Repo {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// A deployable branch of a repository.
#[derive(Debug, Clone)]
pub struct Branch {
    pub repo: Repo,
    pub name: String,
    pub config: BranchConfig,
    /// The checkout serving traffic right now, if any. Updated by deploys.
    pub current_checkout: Option<Checkout>,
}

impl Branch {
    pub fn new(repo: Repo, name: impl Into<String>, config: BranchConfig) -> Self {
        Self {
            repo,
            name: name.into(),
            config,
            current_checkout: None,
        }
    }

    /// Configuration for a named runner.
    pub fn runner_config(&self, name: &str) -> Result<&RunnerConfig> {
        self.config.runners.get(name).ok_or_else(|| Error::MissingConfig {
            key: format!("runners.{name}"),
        })
    }

    /// The checkout runners should point services at.
    pub fn checkout(&self) -> Result<&Checkout> {
        self.current_checkout
            .as_ref()
            .ok_or_else(|| Error::MissingCheckout {
                branch: self.name.clone(),
            })
    }
}
