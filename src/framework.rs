// src/framework.rs
use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// A row inserted into one of the framework's workspace tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Domain(String),
    Company(String),
    Contact { email: String },
    Host { host: String, ip: Option<String> },
}

impl Record {
    pub fn table(&self) -> &'static str {
        match self {
            Record::Domain(_) => "domains",
            Record::Company(_) => "companies",
            Record::Contact { .. } => "contacts",
            Record::Host { .. } => "hosts",
        }
    }

    /// One value per insertable column of the table, in column order.
    pub fn values(&self) -> Vec<String> {
        match self {
            // domain, notes
            Record::Domain(domain) => vec![domain.clone(), String::new()],
            // company, description, notes
            Record::Company(company) => vec![company.clone(), String::new(), String::new()],
            // first_name, middle_name, last_name, email, title, region, country, phone, notes
            Record::Contact { email } => {
                let mut values = vec![String::new(); 9];
                values[3] = email.clone();
                values
            }
            // host, ip_address, region, country, latitude, longitude, notes
            Record::Host { host, ip } => {
                let mut values = vec![String::new(); 7];
                values[0] = host.clone();
                values[1] = ip.clone().unwrap_or_default();
                values
            }
        }
    }
}

/// A module the framework has on disk and can run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleHandle {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleResolution {
    Loaded(ModuleHandle),
    NotFound,
}

/// A module path plus its ordered option assignments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInvocation {
    pub module: String,
    pub options: Vec<(String, String)>,
}

impl ModuleInvocation {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            options: Vec::new(),
        }
    }

    pub fn option(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.options.push((name.into(), value.to_string()));
        self
    }
}

/// The reconnaissance framework as seen by the pipeline. Each run holds one
/// session bound to a single workspace.
#[async_trait]
pub trait Framework: Send {
    fn workspace(&self) -> &str;

    async fn start(&mut self) -> Result<()>;
    async fn set_global_option(&mut self, name: &str, value: &str) -> Result<()>;

    async fn keys(&mut self) -> Result<BTreeMap<String, String>>;
    async fn add_key(&mut self, name: &str, value: &str) -> Result<()>;

    async fn insert(&mut self, record: &Record) -> Result<()>;

    async fn resolve_module(&mut self, path: &str) -> Result<ModuleResolution>;
    async fn install_module(&mut self, path: &str) -> Result<()>;
    async fn reload_modules(&mut self) -> Result<()>;
    async fn run_module(&mut self, module: &ModuleHandle, options: &[(String, String)]) -> Result<()>;
}
