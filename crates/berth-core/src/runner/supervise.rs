//! Supervision-daemon control primitives.

use std::path::Path;
use std::process::Command;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{Error, Result};
use crate::exec;

/// Status fragments that mean "not yet under supervision".
const NOT_SUPERVISED: [&str; 2] = ["supervise not running", "unable to control"];

/// Control interface to the process-supervision daemon.
///
/// Services are addressed by directory (registration symlink or control
/// directory), matching the daemon's own utilities.
pub trait Supervisor {
    /// Bring the service up and keep it up.
    fn start(&self, service_dir: &Path) -> Result<()>;

    /// Bring the service down, leaving it supervised.
    fn stop(&self, service_dir: &Path) -> Result<()>;

    /// Bring the service down and make its supervisor process exit.
    fn exit(&self, service_dir: &Path) -> Result<()>;

    /// Textual status as reported by the daemon.
    fn status(&self, service_dir: &Path) -> Result<String>;
}

/// The daemontools implementation, shelling out to `svc` and `svstat`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Daemontools;

impl Supervisor for Daemontools {
    fn start(&self, service_dir: &Path) -> Result<()> {
        svc("-u", service_dir)
    }

    fn stop(&self, service_dir: &Path) -> Result<()> {
        svc("-d", service_dir)
    }

    fn exit(&self, service_dir: &Path) -> Result<()> {
        svc("-dx", service_dir)
    }

    fn status(&self, service_dir: &Path) -> Result<String> {
        let mut cmd = Command::new("svstat");
        cmd.arg(service_dir);
        exec::run(&mut cmd)
    }
}

fn svc(flag: &str, service_dir: &Path) -> Result<()> {
    let mut cmd = Command::new("svc");
    cmd.arg(flag).arg(service_dir);
    exec::run(&mut cmd).map(drop)
}

/// Bounds for the service-readiness poll.
#[derive(Debug, Clone, Copy)]
pub struct WaitPolicy {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            interval: Duration::from_millis(50),
        }
    }
}

/// Poll until the daemon reports `service_dir` under active supervision.
///
/// The daemon notices new registrations asynchronously; starting a service
/// before its supervisor exists would be lost. Exhausting the policy's
/// timeout is an [`Error::SuperviseTimeout`].
pub fn wait_supervised(
    supervisor: &dyn Supervisor,
    service: &str,
    service_dir: &Path,
    policy: WaitPolicy,
) -> Result<()> {
    let deadline = Instant::now() + policy.timeout;
    loop {
        let status = supervisor.status(service_dir)?;
        if !NOT_SUPERVISED.iter().any(|needle| status.contains(needle)) {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(Error::SuperviseTimeout {
                service: service.to_string(),
                timeout: policy.timeout,
            });
        }
        debug!(service = %service, "waiting for supervision");
        std::thread::sleep(policy.interval);
    }
}
