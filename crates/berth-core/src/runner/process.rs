//! The supervised-process runner kind.

use std::os::unix::fs::symlink;
use std::path::Path;

use tracing::info;

use crate::config::{Paths, RunnerConfig};
use crate::error::{Error, Result};
use crate::fs::replace_file;
use crate::repo::Branch;
use crate::runner::script::{
    DEFAULT_LOG_TEMPLATE, DEFAULT_RUN_TEMPLATE, ScriptContext, ScriptTemplate,
};
use crate::runner::supervise::{Supervisor, WaitPolicy, wait_supervised};
use crate::runner::{Runner, destroy_service};

/// Mode bits for published scripts.
const SCRIPT_MODE: u32 = 0o755;

/// Runs a branch's current checkout as `process_count` supervised services.
///
/// A service has no persistent in-memory state: its identity and desired
/// configuration are recomputed from the runner's config on every operation,
/// and its actual state lives in the control directory and the daemon's
/// process table.
pub struct ProcessRunner<'a> {
    name: String,
    branch: &'a Branch,
    config: &'a RunnerConfig,
    paths: &'a Paths,
    supervisor: &'a dyn Supervisor,
    wait: WaitPolicy,
}

impl<'a> ProcessRunner<'a> {
    pub fn new(
        name: impl Into<String>,
        branch: &'a Branch,
        config: &'a RunnerConfig,
        paths: &'a Paths,
        supervisor: &'a dyn Supervisor,
    ) -> Self {
        Self {
            name: name.into(),
            branch,
            config,
            paths,
            supervisor,
            wait: WaitPolicy::default(),
        }
    }

    /// Construct from the branch's own runner table.
    pub fn for_branch(
        name: &str,
        branch: &'a Branch,
        paths: &'a Paths,
        supervisor: &'a dyn Supervisor,
    ) -> Result<Self> {
        let config = branch.runner_config(name)?;
        Ok(Self::new(name, branch, config, paths, supervisor))
    }

    pub fn with_wait_policy(mut self, wait: WaitPolicy) -> Self {
        self.wait = wait;
        self
    }

    /// Service names for a configuration, without a branch in hand.
    ///
    /// `cleanup` callers use this to assemble the expected-service set from
    /// every registered runner config.
    pub fn service_names_for(runner_name: &str, config: &RunnerConfig) -> Vec<String> {
        (0..config.process_count)
            .map(|idx| format!("{runner_name}-{idx}"))
            .collect()
    }

    fn run_command(&self) -> Result<&str> {
        self.config.cmd.as_deref().ok_or_else(|| Error::MissingConfig {
            key: format!("runners.{}.cmd", self.name),
        })
    }

    /// Render the run and log scripts for the branch's current checkout.
    fn render_scripts(&self) -> Result<(String, String)> {
        let checkout = self.branch.checkout()?;
        let env = checkout.cmd_env(&self.branch.config)?;
        let ctx = ScriptContext {
            checkout_path: checkout.path().to_string_lossy().into_owned(),
            before_cmds: self
                .branch
                .config
                .before_cmds
                .commands()
                .iter()
                .map(|cmd| cmd.to_string())
                .collect(),
            env: env.into_iter().collect(),
            cmd: self.run_command()?.to_string(),
        };

        let run_template = self.config.run_template.as_deref().unwrap_or(DEFAULT_RUN_TEMPLATE);
        let log_template = self.config.log_template.as_deref().unwrap_or(DEFAULT_LOG_TEMPLATE);
        let run = ScriptTemplate::new(run_template).render(&ctx)?;
        let log = ScriptTemplate::new(log_template).render(&ctx)?;
        Ok((run, log))
    }

    /// First configure pass: publish scripts and registration for every
    /// service. Starting happens in a separate pass so script generation for
    /// later services is not delayed by the first service's startup latency.
    fn publish_services(&self) -> Result<()> {
        let services_root = self.paths.services_dir();
        std::fs::create_dir_all(&services_root).map_err(Error::fs(&services_root))?;
        let control_root = self.paths.control_dir();
        std::fs::create_dir_all(&control_root).map_err(Error::fs(&control_root))?;

        let (run_script, log_script) = self.render_scripts()?;

        for service in self.service_names() {
            let control = self.paths.service_control(&service);
            let log_dir = control.join("log");
            std::fs::create_dir_all(&log_dir).map_err(Error::fs(&log_dir))?;

            replace_file(&log_dir.join("run"), &log_script, Some(SCRIPT_MODE))?;
            replace_file(&control.join("run"), &run_script, Some(SCRIPT_MODE))?;
            register(&control, &self.paths.service_link(&service))?;
        }
        Ok(())
    }
}

impl Runner for ProcessRunner<'_> {
    fn service_names(&self) -> Vec<String> {
        Self::service_names_for(&self.name, self.config)
    }

    fn configure(&self) -> Result<()> {
        self.publish_services()?;
        for service in self.service_names() {
            let link = self.paths.service_link(&service);
            wait_supervised(self.supervisor, &service, &link, self.wait)?;
            info!(service = %service, "starting service");
            self.supervisor.start(&link)?;
        }
        Ok(())
    }

    fn deconfigure(&self) -> Result<()> {
        for service in self.service_names() {
            if self.paths.service_control(&service).is_dir() {
                destroy_service(self.paths, self.supervisor, &service)?;
            }
        }
        Ok(())
    }

    fn enable_maintenance(&self) -> Result<()> {
        for service in self.service_names() {
            info!(service = %service, "stopping service for maintenance");
            self.supervisor.stop(&self.paths.service_link(&service))?;
        }
        Ok(())
    }

    fn disable_maintenance(&self) -> Result<()> {
        self.configure()
    }
}

/// Create the daemon-visible registration symlink, tolerating
/// re-registration of an already-registered service.
fn register(control: &Path, link: &Path) -> Result<()> {
    match symlink(control, link) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
        Err(err) => Err(Error::Filesystem {
            path: link.to_path_buf(),
            source: err,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunnerConfig;

    #[test]
    fn service_names_follow_the_index_scheme() {
        let config = RunnerConfig {
            cmd: Some("bin/web".to_string()),
            process_count: 3,
            ..RunnerConfig::default()
        };
        assert_eq!(
            ProcessRunner::service_names_for("web", &config),
            vec!["web-0", "web-1", "web-2"]
        );
    }

    #[test]
    fn zero_processes_means_no_services() {
        let config = RunnerConfig {
            process_count: 0,
            ..RunnerConfig::default()
        };
        assert!(ProcessRunner::service_names_for("web", &config).is_empty());
    }
}
