use std::cell::RefCell;
use std::path::{Path, PathBuf};

use berth_core::error::Result;
use berth_core::runner::Supervisor;

/// In-memory stand-in for the daemontools control utilities, recording every
/// call in invocation order.
pub struct FakeSupervisor {
    calls: RefCell<Vec<(&'static str, PathBuf)>>,
    status: String,
}

impl FakeSupervisor {
    pub fn new() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            status: "up (pid 4242) 17 seconds".to_string(),
        }
    }

    /// A daemon that never picks the service up.
    pub fn never_supervised() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            status: "supervise not running".to_string(),
        }
    }

    pub fn calls(&self) -> Vec<(&'static str, PathBuf)> {
        self.calls.borrow().clone()
    }

    pub fn calls_of(&self, op: &str) -> Vec<PathBuf> {
        self.calls
            .borrow()
            .iter()
            .filter(|(name, _)| *name == op)
            .map(|(_, dir)| dir.clone())
            .collect()
    }

    fn record(&self, op: &'static str, dir: &Path) {
        self.calls.borrow_mut().push((op, dir.to_path_buf()));
    }
}

impl Default for FakeSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl Supervisor for FakeSupervisor {
    fn start(&self, service_dir: &Path) -> Result<()> {
        self.record("start", service_dir);
        Ok(())
    }

    fn stop(&self, service_dir: &Path) -> Result<()> {
        self.record("stop", service_dir);
        Ok(())
    }

    fn exit(&self, service_dir: &Path) -> Result<()> {
        self.record("exit", service_dir);
        Ok(())
    }

    fn status(&self, service_dir: &Path) -> Result<String> {
        self.record("status", service_dir);
        Ok(self.status.clone())
    }
}
