//! Runners translate a branch's current checkout into supervised services.

mod process;
mod script;
mod supervise;

pub use process::ProcessRunner;
pub use script::{DEFAULT_LOG_TEMPLATE, DEFAULT_RUN_TEMPLATE, ScriptContext, ScriptTemplate};
pub use supervise::{Daemontools, Supervisor, WaitPolicy, wait_supervised};

use std::collections::BTreeSet;
use std::path::Path;

use tracing::{info, warn};

use crate::config::Paths;
use crate::error::{Error, Result};

/// Lifecycle operations every runner kind provides.
pub trait Runner {
    /// Names of the services this runner manages, in index order.
    fn service_names(&self) -> Vec<String>;

    /// Write service state and start (or restart) every service. Idempotent:
    /// rerunning with unchanged configuration regenerates identical scripts
    /// and re-registers already-registered services without side effects
    /// beyond a fresh start.
    fn configure(&self) -> Result<()>;

    /// Destroy every service and its on-disk state. Idempotent: services
    /// that are already absent are skipped silently.
    fn deconfigure(&self) -> Result<()>;

    /// Stop services while keeping them registered and configured.
    fn enable_maintenance(&self) -> Result<()>;

    /// Leave maintenance mode by reconfiguring from scratch.
    fn disable_maintenance(&self) -> Result<()>;
}

/// Read-only view of every service name the current configuration expects.
///
/// [`cleanup`] reconciles the daemon's on-disk state against this set;
/// whoever owns repo/branch registration implements the query, keeping the
/// supervision layer decoupled from configuration storage.
pub trait ServiceQuery {
    fn expected_services(&self) -> BTreeSet<String>;
}

impl ServiceQuery for BTreeSet<String> {
    fn expected_services(&self) -> BTreeSet<String> {
        self.clone()
    }
}

/// Destroy every registered service the current configuration no longer
/// expects, returning the names that were destroyed.
///
/// Safe to run at any time; a missing control root means nothing is
/// registered and nothing happens.
pub fn cleanup(
    paths: &Paths,
    supervisor: &dyn Supervisor,
    query: &dyn ServiceQuery,
) -> Result<Vec<String>> {
    let control_root = paths.control_dir();
    let entries = match std::fs::read_dir(&control_root) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(Error::Filesystem {
                path: control_root,
                source: err,
            });
        }
    };

    let expected = query.expected_services();
    let mut destroyed = Vec::new();
    for entry in entries {
        let entry = entry.map_err(Error::fs(&control_root))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if expected.contains(&name) {
            continue;
        }
        warn!(service = %name, "destroying orphaned service");
        destroy_service(paths, supervisor, &name)?;
        destroyed.push(name);
    }
    Ok(destroyed)
}

/// Tear one service out of the supervision daemon and delete its state.
///
/// Order matters: the registration symlink goes first so the daemon's scanner
/// stops resurrecting the service, then the run scripts, then the logger and
/// the process supervisor are told to exit, then the control directory is
/// deleted.
pub(crate) fn destroy_service(
    paths: &Paths,
    supervisor: &dyn Supervisor,
    service: &str,
) -> Result<()> {
    info!(service = %service, "destroying service");
    let control = paths.service_control(service);

    remove_if_exists(&paths.service_link(service))?;
    remove_if_exists(&control.join("run"))?;
    remove_if_exists(&control.join("log").join("run"))?;

    supervisor.exit(&control.join("log"))?;
    supervisor.exit(&control)?;

    std::fs::remove_dir_all(&control).map_err(Error::fs(&control))
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(Error::Filesystem {
            path: path.to_path_buf(),
            source: err,
        }),
    }
}
