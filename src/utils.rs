// src/utils.rs
use crate::types::AutoReconError;
use regex::Regex;
use std::env;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

pub const EXPORT_EXTENSION: &str = ".xlsx";

/// Reads lines from a file into a vector of strings.
pub fn read_lines(path: &Path) -> io::Result<Vec<String>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    reader.lines().collect()
}

/// Reads a newline-delimited domain list. Lines are trimmed and blank lines
/// are skipped; order is preserved and duplicates are kept.
pub fn read_domain_list(path: &Path) -> io::Result<Vec<String>> {
    Ok(read_lines(path)?
        .into_iter()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect())
}

/// Check if a string is a valid domain
pub fn is_valid_domain(domain: &str) -> bool {
    if domain.is_empty() || domain.len() > 253 {
        return false;
    }

    let parts: Vec<&str> = domain.split('.').collect();
    if parts.len() < 2 {
        return false;
    }

    for part in parts {
        if part.is_empty() || part.len() > 63 {
            return false;
        }

        if !part.chars().all(|c| c.is_alphanumeric() || c == '-') {
            return false;
        }

        if part.starts_with('-') || part.ends_with('-') {
            return false;
        }
    }

    true
}

/// Appends `.xlsx` unless the name already carries it.
pub fn normalize_export_name(name: &str) -> String {
    if name.to_lowercase().ends_with(EXPORT_EXTENSION) {
        name.to_string()
    } else {
        format!("{}{}", name, EXPORT_EXTENSION)
    }
}

/// Expands a leading `~` against `$HOME`.
pub fn expand_home(path: &Path) -> PathBuf {
    let home = match env::var_os("HOME") {
        Some(home) => PathBuf::from(home),
        None => return path.to_path_buf(),
    };

    match path.strip_prefix("~") {
        Ok(rest) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}

/// Resolves a path against the current directory. Paths handed to the
/// framework must be absolute because it runs from its own install directory.
pub fn absolute_path(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(env::current_dir()?.join(path))
    }
}

/// Checks a mangle pattern: `<fi>`, `<fn>`, `<mi>`, `<mn>`, `<li>`, `<ln>`
/// tokens joined by literal separators, with at least one token.
pub fn validate_name_pattern(pattern: &str) -> Result<(), AutoReconError> {
    let token = Regex::new(r"<(?:fi|fn|mi|mn|li|ln)>")
        .map_err(|e| AutoReconError::InvalidPattern(format!("Regex error: {}", e)))?;
    let whole = Regex::new(r"^(?:<(?:fi|fn|mi|mn|li|ln)>|[^<>\s])+$")
        .map_err(|e| AutoReconError::InvalidPattern(format!("Regex error: {}", e)))?;

    if !token.is_match(pattern) {
        return Err(AutoReconError::InvalidPattern(format!(
            "{} contains no name token",
            pattern
        )));
    }
    if !whole.is_match(pattern) {
        return Err(AutoReconError::InvalidPattern(format!(
            "{} contains an unknown token; use <fi>,<fn>,<mi>,<mn>,<li>,<ln>",
            pattern
        )));
    }
    Ok(())
}
