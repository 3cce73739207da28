// src/types.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_MODULES: &[&str] = &[
    "recon/companies-multi/whois_miner",
    "recon/domains-hosts/hackertarget",
    "recon/domains-hosts/brute_hosts",
    "recon/domains-hosts/binaryedge",
    "recon/hosts-hosts/ipinfodb",
    "recon/hosts-ports/shodan_ip",
    "recon/hosts-ports/binaryedge",
    "recon/contacts-credentials/hibp_breach",
    "recon/contacts-credentials/hibp_paste",
];

pub const DEFAULT_PACKAGES: &[&str] = &["dnspython", "lxml", "shodan"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "recon-ng")]
    pub recon: ReconConfig,
    #[serde(rename = "theharvester")]
    pub harvester: HarvesterConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub setup: SetupConfig,
    #[serde(default)]
    pub api_keys: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconConfig {
    pub path: PathBuf,
    #[serde(default = "default_recon_executable")]
    pub executable: String,
    #[serde(default = "default_extra_args")]
    pub extra_args: Vec<String>,
    #[serde(default = "default_timeout")]
    pub timeout: u32,
    #[serde(default = "default_true")]
    pub key_auto_update: bool,
    #[serde(default)]
    pub key_override: bool,
    #[serde(default)]
    pub key_authority: KeyAuthority,
}

/// Which store wins when both hold a different, non-empty value for a key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyAuthority {
    #[default]
    Config,
    Framework,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvesterConfig {
    pub path: PathBuf,
    #[serde(default = "default_harvester_executable")]
    pub executable: String,
    #[serde(default = "default_harvester_source")]
    pub source: String,
    #[serde(default = "default_temp_filename")]
    pub temp_filename: String,
    #[serde(default)]
    pub always_run: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_modules")]
    pub modules: Vec<String>,
    #[serde(default = "default_linkedin_limit")]
    pub linkedin_limit: u32,
    #[serde(default = "default_mangle_max_length")]
    pub mangle_max_length: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            modules: default_modules(),
            linkedin_limit: default_linkedin_limit(),
            mangle_max_length: default_mangle_max_length(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupConfig {
    #[serde(default = "default_python")]
    pub python: String,
    #[serde(default = "default_packages")]
    pub packages: Vec<String>,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            python: default_python(),
            packages: default_packages(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_recon_executable() -> String {
    "recon-cli".to_string()
}

fn default_extra_args() -> Vec<String> {
    vec!["--no-version".to_string()]
}

fn default_timeout() -> u32 {
    100
}

fn default_harvester_executable() -> String {
    "theHarvester.py".to_string()
}

fn default_harvester_source() -> String {
    "google,yahoo,duckduckgo,bing".to_string()
}

fn default_temp_filename() -> String {
    "harvester_temp".to_string()
}

fn default_modules() -> Vec<String> {
    DEFAULT_MODULES.iter().map(|m| m.to_string()).collect()
}

fn default_linkedin_limit() -> u32 {
    1
}

fn default_mangle_max_length() -> u32 {
    60
}

fn default_python() -> String {
    "python3".to_string()
}

fn default_packages() -> Vec<String> {
    DEFAULT_PACKAGES.iter().map(|p| p.to_string()).collect()
}

/// Everything a single pipeline run was asked to do.
#[derive(Debug, Clone, Default)]
pub struct RunPlan {
    pub domains: Vec<String>,
    pub workspace: Option<String>,
    pub pattern: Option<String>,
    pub companies: Vec<String>,
    pub export: String,
    pub run_harvester: bool,
    pub harvest_report: Option<PathBuf>,
    pub email_file: Option<PathBuf>,
    pub host_file: Option<PathBuf>,
}

impl RunPlan {
    /// True when a harvesting, import or company step feeds contacts into the workspace.
    pub fn gathers_contacts(&self) -> bool {
        self.run_harvester
            || self.harvest_report.is_some()
            || self.email_file.is_some()
            || self.host_file.is_some()
            || !self.companies.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageStatus {
    Completed,
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct StageReport {
    pub stage: String,
    pub status: StageStatus,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub workspace: String,
    pub domains: usize,
    pub stages: Vec<StageReport>,
    pub export_path: Option<PathBuf>,
}

impl RunSummary {
    pub fn record(&mut self, stage: impl Into<String>, status: StageStatus) {
        self.stages.push(StageReport {
            stage: stage.into(),
            status,
        });
    }

    pub fn status_of(&self, stage: &str) -> Option<&StageStatus> {
        self.stages
            .iter()
            .find(|s| s.stage == stage)
            .map(|s| &s.status)
    }
}

#[derive(Debug, Error)]
pub enum AutoReconError {
    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Harvest report not found: {0}")]
    ReportNotFound(PathBuf),

    #[error("Failed to parse harvest report {path}: {message}")]
    ReportParse { path: PathBuf, message: String },

    #[error("Import file not found: {0}")]
    ImportNotFound(PathBuf),

    #[error("Malformed import file {path}: {message}")]
    MalformedImport { path: PathBuf, message: String },

    #[error("Module {0} is not installed and automatic installation failed")]
    ModuleUnavailable(String),

    #[error("Module {module} failed: {message}")]
    ModuleFailed { module: String, message: String },

    #[error("Framework error: {0}")]
    FrameworkError(String),

    #[error("Failed to run {program}: {message}")]
    ProcessError { program: String, message: String },

    #[error("Invalid name pattern: {0}")]
    InvalidPattern(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
