// src/session.rs
use crate::error::Result;
use crate::framework::{Framework, ModuleHandle, ModuleResolution, Record};
use crate::types::{AutoReconError, ReconConfig};
use async_trait::async_trait;
use log::{debug, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::process::Output;
use tokio::process::Command;

/// A recon-ng session driven through `recon-cli`, bound to one workspace.
pub struct ReconSession {
    program: PathBuf,
    install_dir: PathBuf,
    extra_args: Vec<String>,
    workspace: String,
    module_cache: Option<BTreeSet<String>>,
}

impl ReconSession {
    pub fn new(config: &ReconConfig, workspace: impl Into<String>) -> Self {
        Self {
            program: config.path.join(&config.executable),
            install_dir: config.path.clone(),
            extra_args: config.extra_args.clone(),
            workspace: workspace.into(),
            module_cache: None,
        }
    }

    /// Argument list for one `recon-cli` call in this session's workspace.
    pub fn args<I, S>(&self, rest: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args = self.extra_args.clone();
        args.push("-w".to_string());
        args.push(self.workspace.clone());
        args.extend(rest.into_iter().map(Into::into));
        args
    }

    async fn exec(&self, args: Vec<String>) -> Result<Output> {
        debug!("{} {}", self.program.display(), args.join(" "));
        let output = Command::new(&self.program)
            .args(&args)
            .current_dir(&self.install_dir)
            .output()
            .await
            .map_err(|e| AutoReconError::ProcessError {
                program: self.program.display().to_string(),
                message: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines().filter(|l| l.trim_start().starts_with("[!]")) {
            warn!("recon-ng: {}", line.trim());
        }
        Ok(output)
    }

    /// Runs a global-context command and fails on a non-zero exit.
    async fn command(&self, command: String) -> Result<String> {
        let output = self.exec(self.args(["-C".to_string(), command.clone()])).await?;
        if !output.status.success() {
            return Err(AutoReconError::FrameworkError(format!(
                "`{}` exited with {}: {}",
                command,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn module_list(&mut self) -> Result<&BTreeSet<String>> {
        if self.module_cache.is_none() {
            let output = self.exec(self.args(["-M"])).await?;
            let modules = parse_module_list(&String::from_utf8_lossy(&output.stdout));
            debug!("recon-ng reports {} installed modules", modules.len());
            self.module_cache = Some(modules);
        }
        Ok(self.module_cache.get_or_insert_with(BTreeSet::new))
    }
}

#[async_trait]
impl Framework for ReconSession {
    fn workspace(&self) -> &str {
        &self.workspace
    }

    /// `-w` creates the workspace on first use, so any command opens it.
    async fn start(&mut self) -> Result<()> {
        self.command("workspaces list".to_string()).await?;
        debug!("Workspace {} is open", self.workspace);
        Ok(())
    }

    async fn set_global_option(&mut self, name: &str, value: &str) -> Result<()> {
        let output = self
            .exec(self.args(["-g".to_string(), format!("{}={}", name, value)]))
            .await?;
        if !output.status.success() {
            return Err(AutoReconError::FrameworkError(format!(
                "Failed to set {} in workspace {}",
                name, self.workspace
            )));
        }
        Ok(())
    }

    async fn keys(&mut self) -> Result<BTreeMap<String, String>> {
        let stdout = self.command("keys list".to_string()).await?;
        Ok(parse_key_table(&stdout))
    }

    async fn add_key(&mut self, name: &str, value: &str) -> Result<()> {
        self.command(format!("keys add {} {}", name, value)).await?;
        Ok(())
    }

    async fn insert(&mut self, record: &Record) -> Result<()> {
        let values = record.values().join("~");
        let stdout = self
            .command(format!("db insert {} {}", record.table(), values))
            .await?;
        debug!("insert into {}: {}", record.table(), stdout.trim());
        Ok(())
    }

    async fn resolve_module(&mut self, path: &str) -> Result<ModuleResolution> {
        if self.module_list().await?.contains(path) {
            Ok(ModuleResolution::Loaded(ModuleHandle {
                path: path.to_string(),
            }))
        } else {
            Ok(ModuleResolution::NotFound)
        }
    }

    async fn install_module(&mut self, path: &str) -> Result<()> {
        self.command(format!("marketplace install {}", path)).await?;
        Ok(())
    }

    async fn reload_modules(&mut self) -> Result<()> {
        self.module_cache = None;
        self.module_list().await?;
        Ok(())
    }

    async fn run_module(&mut self, module: &ModuleHandle, options: &[(String, String)]) -> Result<()> {
        let mut rest = vec!["-m".to_string(), module.path.clone()];
        for (name, value) in options {
            rest.push("-o".to_string());
            rest.push(format!("{}={}", name, value));
        }
        rest.push("-x".to_string());

        let output = self.exec(self.args(rest)).await?;
        if !output.status.success() {
            return Err(AutoReconError::ModuleFailed {
                module: module.path.clone(),
                message: format!(
                    "exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        Ok(())
    }
}

/// Parses the `| name | value |` rows printed by `keys list`.
pub fn parse_key_table(output: &str) -> BTreeMap<String, String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with('|'))
        .filter_map(|line| {
            let cells: Vec<&str> = line.trim_matches('|').split('|').map(str::trim).collect();
            match cells.as_slice() {
                [name, value] if !name.is_empty() && !name.eq_ignore_ascii_case("name") => {
                    Some((name.to_string(), value.to_string()))
                }
                _ => None,
            }
        })
        .collect()
}

/// Parses the module paths listed by `recon-cli -M`.
pub fn parse_module_list(output: &str) -> BTreeSet<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| {
            line.contains('/')
                && !line.starts_with('[')
                && !line.chars().any(char::is_whitespace)
        })
        .map(str::to_string)
        .collect()
}
