//! Checkout lifecycle: cloned-and-built snapshots of a branch at a commit.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{info, warn};

use crate::config::{BranchConfig, CommandList, Paths};
use crate::envsubst;
use crate::error::{Error, Result};
use crate::exec;
use crate::repo::Branch;

/// Length of the commit prefix embedded in checkout directory names.
const COMMIT_PREFIX_LEN: usize = 11;

/// Build fallback when the branch configures no `build` hook.
const DEFAULT_BUILD_CMD: &str = "if [ -f ./.build.sh ]; then ./.build.sh; fi";

/// An immutable on-disk snapshot of a branch at a pinned commit.
///
/// Identity is the `(branch, commit, name)` triple, where `name` is the
/// creation timestamp; the filesystem path is derived from the triple and
/// never stored. The working tree carries no VCS metadata once created.
#[derive(Debug, Clone)]
pub struct Checkout {
    paths: Paths,
    repo: String,
    branch: String,
    /// Creation timestamp, second granularity. Timestamps keep directory
    /// listings in creation order without separate bookkeeping; same-second
    /// collisions are excluded by the one-deploy-at-a-time contract.
    pub name: String,
    /// Pinned commit. Full hash for created checkouts; checkouts rebuilt by
    /// [`Checkout::all_for_branch`] carry the abbreviated prefix their
    /// directory name preserves and serve as handles for removal only.
    pub commit: String,
}

impl Checkout {
    pub fn new(
        paths: &Paths,
        branch: &Branch,
        commit: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            paths: paths.clone(),
            repo: branch.repo.name.clone(),
            branch: branch.name.clone(),
            name: name.into(),
            commit: commit.into(),
        }
    }

    /// Directory of this checkout:
    /// `<base>/checkouts/<repo>/<branch>/<name>-<commit-prefix>`.
    pub fn path(&self) -> PathBuf {
        let prefix: String = self.commit.chars().take(COMMIT_PREFIX_LEN).collect();
        self.paths
            .branch_dir(&self.repo, &self.branch)
            .join(format!("{}-{}", self.name, prefix))
    }

    /// Clone `branch`'s repository, pin `commit`, and strip VCS metadata.
    ///
    /// The clone runs from the neutral base directory with a cleared
    /// environment, so neither credentials nor git configuration leak from
    /// the calling process into the new working tree.
    pub fn create(paths: &Paths, branch: &Branch, commit: &str) -> Result<Self> {
        let name = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        let checkout = Self::new(paths, branch, commit, name);
        let dest = checkout.path();

        std::fs::create_dir_all(paths.base()).map_err(Error::fs(paths.base()))?;
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(Error::fs(parent))?;
        }

        info!(
            repo = %checkout.repo,
            branch = %checkout.branch,
            commit = %commit,
            "creating checkout"
        );
        let mut clone = Command::new("git");
        clone
            .args(["clone", "-q"])
            .arg(&branch.repo.path)
            .arg(&dest)
            .current_dir(paths.base())
            .env_clear();
        exec::run(&mut clone)?;
        git_in(&dest, &["config", "advice.detachedHead", "false"])?;
        git_in(&dest, &["checkout", commit])?;
        git_in(&dest, &["submodule", "update", "--init", "--recursive"])?;
        strip_vcs_metadata(&dest)?;
        Ok(checkout)
    }

    /// Environment for commands run inside the checkout.
    ///
    /// Recomputed on every call, never cached: the process environment, then
    /// the branch's `env` entries (each value expanded against the map built
    /// so far), then `GIT_COMMIT` pinned to the checkout's commit.
    pub fn cmd_env(&self, config: &BranchConfig) -> Result<BTreeMap<String, String>> {
        let mut env: BTreeMap<String, String> = std::env::vars().collect();
        for (key, template) in &config.env {
            let value = envsubst::expand(template, &env)?;
            env.insert(key.clone(), value);
        }
        env.insert("GIT_COMMIT".to_string(), self.commit.clone());
        Ok(env)
    }

    /// Run the hook `name`, falling back to `default`.
    ///
    /// An absent hook is a no-op. Each command runs through the shell inside
    /// the checkout with its environment; the first failure aborts the rest.
    pub fn run_hook_cmd(
        &self,
        config: &BranchConfig,
        name: &str,
        default: Option<&str>,
    ) -> Result<()> {
        let fallback = default.map(|cmd| CommandList::Single(cmd.to_string()));
        let hook = match config.hooks.get(name).or(fallback.as_ref()) {
            Some(hook) => hook,
            None => return Ok(()),
        };
        for command in hook.commands() {
            self.run_in(config, command)?;
        }
        Ok(())
    }

    /// Run a configured custom command inside the checkout.
    pub fn run_custom_cmd(&self, config: &BranchConfig, name: &str) -> Result<()> {
        let command = config
            .custom_cmds
            .get(name)
            .ok_or_else(|| Error::MissingConfig {
                key: format!("custom_cmds.{name}"),
            })?;
        self.run_in(config, command)
    }

    /// Run the branch's build step (`./.build.sh` when no hook is set).
    pub fn build(&self, config: &BranchConfig) -> Result<()> {
        self.run_hook_cmd(config, "build", Some(DEFAULT_BUILD_CMD))
    }

    /// Delete the checkout's working tree. Missing trees are an error.
    pub fn remove(&self) -> Result<()> {
        let path = self.path();
        info!(path = %path.display(), "removing checkout");
        std::fs::remove_dir_all(&path).map_err(Error::fs(&path))
    }

    /// Every checkout currently on disk for `branch`, oldest first.
    ///
    /// A branch that has never been deployed yields an empty list.
    /// Non-directories are skipped, as are directory names that do not split
    /// into `(name, commit-prefix)` on a single `-`.
    pub fn all_for_branch(paths: &Paths, branch: &Branch) -> Result<Vec<Checkout>> {
        let dir = paths.branch_dir(&branch.repo.name, &branch.name);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(Error::Filesystem {
                    path: dir,
                    source: err,
                });
            }
        };

        let mut checkouts = Vec::new();
        for entry in entries {
            let entry = entry.map_err(Error::fs(&dir))?;
            let file_type = entry.file_type().map_err(Error::fs(entry.path()))?;
            if !file_type.is_dir() {
                continue;
            }
            let basename = entry.file_name().to_string_lossy().into_owned();
            match split_basename(&basename) {
                Some((name, commit)) => checkouts.push(Self::new(paths, branch, commit, name)),
                None => warn!(entry = %basename, "skipping unparseable checkout directory"),
            }
        }
        checkouts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(checkouts)
    }

    /// Run one shell command inside the checkout with its environment.
    fn run_in(&self, config: &BranchConfig, command: &str) -> Result<()> {
        let env = self.cmd_env(config)?;
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .current_dir(self.path())
            .env_clear()
            .envs(&env);
        exec::run(&mut cmd).map(drop)
    }
}

/// Run a git subcommand in `cwd` with a cleared environment.
fn git_in(cwd: &Path, args: &[&str]) -> Result<String> {
    let mut cmd = Command::new("git");
    cmd.args(args).current_dir(cwd).env_clear();
    exec::run(&mut cmd)
}

/// Split `name-commitprefix`. Timestamps never contain `-`, so a valid
/// basename has exactly one, and the commit half is dash-free hex.
fn split_basename(basename: &str) -> Option<(&str, &str)> {
    let (name, commit) = basename.split_once('-')?;
    if name.is_empty() || commit.is_empty() || commit.contains('-') {
        return None;
    }
    Some((name, commit))
}

/// Remove every `.git` entry under `root`.
///
/// The clone exists only to fetch content; its history is discarded.
/// Submodules leave both `.git` directories and gitlink files behind, and
/// neither survives.
fn strip_vcs_metadata(root: &Path) -> Result<()> {
    let mut found = Vec::new();
    collect_vcs_entries(root, &mut found)?;
    for path in found {
        let meta = std::fs::symlink_metadata(&path).map_err(Error::fs(&path))?;
        if meta.is_dir() {
            std::fs::remove_dir_all(&path).map_err(Error::fs(&path))?;
        } else {
            std::fs::remove_file(&path).map_err(Error::fs(&path))?;
        }
    }
    Ok(())
}

fn collect_vcs_entries(dir: &Path, found: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir).map_err(Error::fs(dir))? {
        let entry = entry.map_err(Error::fs(dir))?;
        let path = entry.path();
        if entry.file_name() == ".git" {
            found.push(path);
        } else if entry.file_type().map_err(Error::fs(&path))?.is_dir() {
            collect_vcs_entries(&path, found)?;
        }
    }
    Ok(())
}
