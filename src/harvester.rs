// src/harvester.rs
use crate::error::Result;
use crate::types::HarvesterConfig;
use log::{debug, info, warn};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Changes the process working directory and restores the previous one when
/// dropped, whether the guarded work succeeded or not.
pub struct WorkingDirGuard {
    previous: PathBuf,
}

impl WorkingDirGuard {
    pub fn enter(dir: &Path) -> io::Result<Self> {
        let previous = env::current_dir()?;
        env::set_current_dir(dir)?;
        Ok(Self { previous })
    }
}

impl Drop for WorkingDirGuard {
    fn drop(&mut self) {
        if let Err(e) = env::set_current_dir(&self.previous) {
            warn!(
                "Failed to restore working directory {}: {}",
                self.previous.display(),
                e
            );
        }
    }
}

pub struct Harvester {
    config: HarvesterConfig,
}

impl Harvester {
    pub fn new(config: HarvesterConfig) -> Self {
        Self { config }
    }

    /// Where the report for this run lands, inside `output_dir`.
    pub fn report_path(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(format!("{}.xml", self.config.temp_filename))
    }

    pub fn command(&self, domain: &str, report: &Path) -> Command {
        let mut cmd = Command::new(self.config.path.join(&self.config.executable));
        cmd.arg("-d")
            .arg(domain)
            .arg("-b")
            .arg(&self.config.source)
            .arg("-f")
            .arg(report);
        cmd
    }

    /// Runs the tool for one domain and returns the path its report should be
    /// at. Tool failures are logged and leave the report missing.
    pub async fn run(&self, domain: &str) -> Result<PathBuf> {
        let report = self.report_path(&env::current_dir()?);
        match fs::remove_file(&report) {
            Ok(()) => debug!("Removed stale report {}", report.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not remove stale report {}: {}", report.display(), e),
        }

        info!("Running theHarvester against {} ({})", domain, self.config.source);
        let _guard = WorkingDirGuard::enter(&self.config.path)?;
        match self.command(domain, &report).output().await {
            Ok(output) if output.status.success() => {
                debug!("theHarvester finished for {}", domain);
            }
            Ok(output) => {
                warn!(
                    "theHarvester exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                );
            }
            Err(e) => {
                warn!(
                    "Failed to launch {}: {}",
                    self.config.path.join(&self.config.executable).display(),
                    e
                );
            }
        }

        Ok(report)
    }
}
