// src/output.rs
use crate::types::{AutoReconError, RunSummary, StageStatus};
use std::io::Write;

pub struct SummaryWriter {
    verbose: bool,
}

impl SummaryWriter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    pub fn print(&self, summary: &RunSummary) -> Result<(), AutoReconError> {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        self.write_summary(&mut handle, summary)
    }

    pub fn write_summary<W: Write>(&self, writer: &mut W, summary: &RunSummary) -> Result<(), AutoReconError> {
        writeln!(writer, "\n[*] Workspace: {}", summary.workspace)?;
        writeln!(writer, "[*] Domains: {}", summary.domains)?;

        let completed = summary
            .stages
            .iter()
            .filter(|s| s.status == StageStatus::Completed)
            .count();
        writeln!(writer, "[*] Stages completed: {}/{}", completed, summary.stages.len())?;

        for stage in &summary.stages {
            match &stage.status {
                StageStatus::Completed if self.verbose => {
                    writeln!(writer, "    [+] {}", stage.stage)?;
                }
                StageStatus::Completed => {}
                StageStatus::Skipped(reason) => {
                    writeln!(writer, "    [-] {} skipped: {}", stage.stage, reason)?;
                }
                StageStatus::Failed(reason) => {
                    writeln!(writer, "    [!] {} failed: {}", stage.stage, reason)?;
                }
            }
        }

        match &summary.export_path {
            Some(path) => writeln!(writer, "[*] Results exported to: {}", path.display())?,
            None => writeln!(writer, "[!] Results were not exported")?,
        }

        Ok(())
    }
}
