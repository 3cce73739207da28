use crate::types::RunPlan;
use crate::utils::normalize_export_name;
use clap::Parser;
use std::path::PathBuf;

pub const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_HASH"),
    ", built ",
    env!("BUILD_TIME"),
    ")"
);

#[derive(Parser, Debug, Clone)]
#[command(
    name = "autorecon",
    version,
    long_version = LONG_VERSION,
    about = "Automation wrapper for recon-ng",
    long_about = "autorecon drives recon-ng (and optionally theHarvester) through a fixed pipeline:\nadd domains, harvest contacts and hosts, run a list of recon modules and export the workspace to a spreadsheet."
)]
pub struct Args {
    /// One or more target domains
    #[arg(value_name = "DOMAINS")]
    pub domains: Vec<String>,

    /// Name of the workspace inside recon-ng
    #[arg(short = 'w', long = "workspace", value_name = "NAME")]
    pub workspace: Option<String>,

    /// Input file of domains (one per line)
    #[arg(short = 'd', value_name = "FILE")]
    pub domains_file: Option<PathBuf>,

    /// Mangle pattern built from <fi>,<fn>,<mi>,<mn>,<li>,<ln>
    #[arg(short = 'p', value_name = "PATTERN")]
    pub pattern: Option<String>,

    /// Name of a company (repeatable)
    #[arg(short = 'c', long = "company", value_name = "NAME")]
    pub companies: Vec<String>,

    /// Name of the export file
    #[arg(short = 'E', long = "export", value_name = "FILE", default_value = "output.xlsx")]
    pub export: String,

    /// Run theHarvester against the first domain
    #[arg(long = "theHarvester", help_heading = "theHarvester")]
    pub the_harvester: bool,

    /// XML report produced by theHarvester
    #[arg(short = 'H', long = "harvest", value_name = "FILE", help_heading = "theHarvester")]
    pub harvest_file: Option<PathBuf>,

    /// Input file of emails from theHarvester
    #[arg(short = 'e', value_name = "FILE", help_heading = "theHarvester")]
    pub email_file: Option<PathBuf>,

    /// Input file of hosts (hostname,ip) from theHarvester
    #[arg(short = 'i', value_name = "FILE", help_heading = "theHarvester")]
    pub host_file: Option<PathBuf>,

    /// Sync the API keys between the config file and recon-ng
    #[arg(short = 'k', long = "keys", help_heading = "Optional Setup")]
    pub keys: bool,

    /// Install the Python packages the recon-ng modules need
    #[arg(long = "pip", help_heading = "Optional Setup")]
    pub pip: bool,

    /// Configuration file path
    #[arg(long = "config", value_name = "FILE", default_value = "config.toml")]
    pub config_path: PathBuf,

    /// Verbose mode
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Silent mode (no banner, progress or summary)
    #[arg(long = "silent")]
    pub silent: bool,
}

impl Args {
    /// Builds the run plan for the given domain list. `always_run` is the
    /// config switch that forces theHarvester on.
    pub fn plan(&self, domains: Vec<String>, always_run: bool) -> RunPlan {
        RunPlan {
            domains,
            workspace: self.workspace.clone(),
            pattern: self.pattern.clone(),
            companies: self.companies.clone(),
            export: normalize_export_name(&self.export),
            run_harvester: self.the_harvester || always_run,
            harvest_report: self.harvest_file.clone(),
            email_file: self.email_file.clone(),
            host_file: self.host_file.clone(),
        }
    }

    /// True when the invocation asks for any work at all.
    pub fn has_work(&self, domains: &[String]) -> bool {
        !domains.is_empty() || self.keys || self.pip
    }
}
