// src/modules.rs
use crate::error::Result;
use crate::framework::{Framework, ModuleHandle, ModuleInvocation, ModuleResolution};
use crate::types::AutoReconError;
use log::{debug, info, warn};
use std::path::Path;

pub const IMPORT_CSV: &str = "import/csv";
pub const IMPORT_LIST: &str = "import/list";
pub const LINKEDIN_CACHE: &str = "recon/companies-contacts/bing_linkedin_cache";
pub const MANGLE: &str = "recon/contacts-contacts/mangle";
pub const EXPORT_XLSX: &str = "reporting/xlsx";

/// Resolves a module, installing it and reloading the module list once when
/// the framework does not have it yet.
pub async fn load_module(framework: &mut dyn Framework, path: &str) -> Result<ModuleHandle> {
    if let ModuleResolution::Loaded(handle) = framework.resolve_module(path).await? {
        return Ok(handle);
    }

    info!("Module {} not found, attempting automatic installation", path);
    if let Err(e) = framework.install_module(path).await {
        warn!("Installation of {} failed: {}", path, e);
    }
    framework.reload_modules().await?;

    match framework.resolve_module(path).await? {
        ModuleResolution::Loaded(handle) => {
            info!("Installed module {}", path);
            Ok(handle)
        }
        ModuleResolution::NotFound => {
            warn!(
                "Automatic installation of module {} failed. Please install the module manually",
                path
            );
            Err(AutoReconError::ModuleUnavailable(path.to_string()))
        }
    }
}

/// Loads the invocation's module and runs it with its options.
pub async fn run_invocation(framework: &mut dyn Framework, invocation: &ModuleInvocation) -> Result<()> {
    let handle = load_module(framework, &invocation.module).await?;
    debug!(
        "Running {} with {} option(s)",
        invocation.module,
        invocation.options.len()
    );
    framework.run_module(&handle, &invocation.options).await
}

pub fn import_hosts(file: &Path) -> ModuleInvocation {
    ModuleInvocation::new(IMPORT_CSV)
        .option("FILENAME", file.display())
        .option("HAS-HEADER", "false")
        .option("CSV-0", "hostname")
        .option("CSV-1", "ip_address")
        .option("TABLE", "hosts")
}

pub fn import_emails(file: &Path) -> ModuleInvocation {
    ModuleInvocation::new(IMPORT_LIST)
        .option("FILENAME", file.display())
        .option("TABLE", "contacts")
        .option("COLUMN", "email")
}

pub fn linkedin_lookup(limit: u32) -> ModuleInvocation {
    ModuleInvocation::new(LINKEDIN_CACHE).option("LIMIT", limit)
}

pub fn mangle(domain: &str, pattern: &str, max_length: u32) -> ModuleInvocation {
    ModuleInvocation::new(MANGLE)
        .option("DOMAIN", domain)
        .option("PATTERN", pattern)
        .option("MAX-LENGTH", max_length)
}

pub fn export_xlsx(file: &Path) -> ModuleInvocation {
    ModuleInvocation::new(EXPORT_XLSX).option("FILENAME", file.display())
}
