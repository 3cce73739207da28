// src/imports.rs
use crate::error::Result;
use crate::framework::Framework;
use crate::modules::{import_emails, import_hosts, run_invocation};
use crate::types::AutoReconError;
use crate::utils::absolute_path;
use log::info;
use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Checks that every row of a headerless list has `columns` non-empty fields
/// and returns the number of rows.
pub fn validate_list(path: &Path, columns: usize) -> Result<usize> {
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => AutoReconError::ImportNotFound(path.to_path_buf()),
        _ => AutoReconError::Io(e),
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut rows = 0;
    for (index, row) in reader.records().enumerate() {
        let row = row.map_err(|e| malformed(path, format!("line {}: {}", index + 1, e)))?;
        if row.len() == 1 && row.get(0).map_or(true, str::is_empty) {
            continue;
        }
        if row.len() != columns {
            return Err(malformed(
                path,
                format!("line {}: expected {} column(s), found {}", index + 1, columns, row.len()),
            ));
        }
        if row.iter().any(str::is_empty) {
            return Err(malformed(path, format!("line {}: empty field", index + 1)));
        }
        rows += 1;
    }

    Ok(rows)
}

fn malformed(path: &Path, message: String) -> AutoReconError {
    AutoReconError::MalformedImport {
        path: path.to_path_buf(),
        message,
    }
}

fn resolve(path: &Path) -> Result<PathBuf> {
    Ok(absolute_path(path)?)
}

/// Imports a `hostname,ip_address` list into the hosts table.
pub async fn load_hosts(framework: &mut dyn Framework, path: &Path) -> Result<usize> {
    let path = resolve(path)?;
    let rows = validate_list(&path, 2)?;
    run_invocation(framework, &import_hosts(&path)).await?;
    info!("Imported {} host(s) from {}", rows, path.display());
    Ok(rows)
}

/// Imports a one-email-per-line list into the contacts table.
pub async fn load_emails(framework: &mut dyn Framework, path: &Path) -> Result<usize> {
    let path = resolve(path)?;
    let rows = validate_list(&path, 1)?;
    run_invocation(framework, &import_emails(&path)).await?;
    info!("Imported {} email(s) from {}", rows, path.display());
    Ok(rows)
}
