// src/report.rs
use crate::error::Result;
use crate::framework::{Framework, Record};
use crate::types::AutoReconError;
use log::{debug, info};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// A record harvested from a theHarvester XML report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarvestedRecord {
    Email(String),
    Host(String),
}

impl HarvestedRecord {
    pub fn to_record(&self) -> Record {
        match self {
            HarvestedRecord::Email(email) => Record::Contact {
                email: email.clone(),
            },
            HarvestedRecord::Host(host) => Record::Host {
                host: host.clone(),
                ip: None,
            },
        }
    }
}

/// Extracts `email` and `hostname` elements in document order.
pub fn parse_report(xml: &str, path: &Path) -> Result<Vec<HarvestedRecord>> {
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    };
    let doc = roxmltree::Document::parse_with_options(xml, options).map_err(|e| AutoReconError::ReportParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let records = doc
        .descendants()
        .filter(|node| node.is_element())
        .filter_map(|node| {
            let text = node.text().map(str::trim).unwrap_or("");
            if text.is_empty() {
                return None;
            }
            match node.tag_name().name() {
                "email" => Some(HarvestedRecord::Email(text.to_string())),
                "hostname" => Some(HarvestedRecord::Host(text.to_string())),
                _ => None,
            }
        })
        .collect();

    Ok(records)
}

pub fn read_report(path: &Path) -> Result<Vec<HarvestedRecord>> {
    let xml = fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => AutoReconError::ReportNotFound(path.to_path_buf()),
        _ => AutoReconError::ReportParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        },
    })?;
    parse_report(&xml, path)
}

/// Parses a report and inserts each record into the framework, one call per
/// record. Returns the number of records inserted.
pub async fn ingest_report(framework: &mut dyn Framework, path: &Path) -> Result<usize> {
    let records = read_report(path)?;
    debug!("{} records in {}", records.len(), path.display());

    for record in &records {
        framework.insert(&record.to_record()).await?;
    }

    let emails = records
        .iter()
        .filter(|r| matches!(r, HarvestedRecord::Email(_)))
        .count();
    info!(
        "Imported {} email(s) and {} host(s) from {}",
        emails,
        records.len() - emails,
        path.display()
    );
    Ok(records.len())
}
