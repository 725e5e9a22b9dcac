//! On-disk layout for checkouts and service directories.

use std::path::{Path, PathBuf};

/// Root directory layout used by checkouts and runners.
///
/// Everything the orchestrator touches lives under one base directory:
/// `checkouts/<repo>/<branch>/…` for working copies, `services/` for the
/// supervision daemon's registration symlinks, and `services-real/` for the
/// private control directories those symlinks point at.
#[derive(Debug, Clone)]
pub struct Paths {
    base: PathBuf,
}

impl Paths {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Default layout under the invoking user's home directory.
    pub fn from_home() -> Option<Self> {
        dirs::home_dir().map(Self::new)
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn checkouts_dir(&self) -> PathBuf {
        self.base.join("checkouts")
    }

    pub fn branch_dir(&self, repo: &str, branch: &str) -> PathBuf {
        self.checkouts_dir().join(repo).join(branch)
    }

    /// Registration root scanned by the supervision daemon.
    pub fn services_dir(&self) -> PathBuf {
        self.base.join("services")
    }

    /// Control-directory root owned by this orchestrator.
    pub fn control_dir(&self) -> PathBuf {
        self.base.join("services-real")
    }

    pub fn service_link(&self, service: &str) -> PathBuf {
        self.services_dir().join(service)
    }

    pub fn service_control(&self, service: &str) -> PathBuf {
        self.control_dir().join(service)
    }
}
