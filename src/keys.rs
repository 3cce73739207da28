// src/keys.rs
//! API key reconciliation between the local configuration store and the
//! framework's key store.
//!
//! A key missing on one side counts as an empty value there. Per key name:
//! equal values are left alone, an empty side receives the other side's
//! value, and a conflict of two different non-empty values is settled by the
//! configured [`KeyAuthority`] only when overrides are allowed. An empty
//! framework store is seeded from the local values.

use crate::config::save_api_keys;
use crate::error::Result;
use crate::framework::Framework;
use crate::types::{AutoReconError, KeyAuthority};
use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPolicy {
    pub allow_override: bool,
    pub authority: KeyAuthority,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySyncPlan {
    pub to_framework: Vec<(String, String)>,
    pub to_local: Vec<(String, String)>,
    pub conflicts: Vec<String>,
}

impl KeySyncPlan {
    pub fn is_noop(&self) -> bool {
        self.to_framework.is_empty() && self.to_local.is_empty()
    }
}

pub fn plan_key_sync(
    local: &BTreeMap<String, String>,
    remote: &BTreeMap<String, String>,
    policy: KeyPolicy,
) -> KeySyncPlan {
    let mut plan = KeySyncPlan::default();

    if remote.is_empty() {
        plan.to_framework = local
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        return plan;
    }

    let names: BTreeSet<&String> = local.keys().chain(remote.keys()).collect();
    for name in names {
        let local_value = local.get(name).map(String::as_str).unwrap_or("");
        let remote_value = remote.get(name).map(String::as_str).unwrap_or("");

        match (local_value.is_empty(), remote_value.is_empty()) {
            (true, true) => {}
            (false, true) => plan
                .to_framework
                .push((name.clone(), local_value.to_string())),
            (true, false) => plan.to_local.push((name.clone(), remote_value.to_string())),
            (false, false) if local_value == remote_value => {}
            (false, false) => {
                if !policy.allow_override {
                    plan.conflicts.push(name.clone());
                    continue;
                }
                match policy.authority {
                    KeyAuthority::Config => plan
                        .to_framework
                        .push((name.clone(), local_value.to_string())),
                    KeyAuthority::Framework => {
                        plan.to_local.push((name.clone(), remote_value.to_string()))
                    }
                }
            }
        }
    }

    plan
}

/// Applies the local half of a plan. Returns whether `local` changed.
pub fn apply_local(plan: &KeySyncPlan, local: &mut BTreeMap<String, String>) -> bool {
    let mut changed = false;
    for (name, value) in &plan.to_local {
        if local.get(name) != Some(value) {
            local.insert(name.clone(), value.clone());
            changed = true;
        }
    }
    changed
}

/// Pushes the framework half of a plan. Every key is attempted; rejected
/// writes are logged and reported together.
pub async fn push_framework_keys(plan: &KeySyncPlan, framework: &mut dyn Framework) -> Result<()> {
    let mut failed = Vec::new();
    for (name, value) in &plan.to_framework {
        debug!("Adding key {} to the framework", name);
        if let Err(e) = framework.add_key(name, value).await {
            warn!("Failed to add key {} to the framework: {}", name, e);
            failed.push(name.as_str());
        }
    }

    if !failed.is_empty() {
        return Err(AutoReconError::FrameworkError(format!(
            "{} of {} key write(s) failed: {}",
            failed.len(),
            plan.to_framework.len(),
            failed.join(", ")
        )));
    }
    Ok(())
}

/// Reconciles both stores. The local side is applied and flushed to
/// `config_path` before the framework is written, so a rejected framework
/// write never loses values pulled from it.
pub async fn sync_keys(
    framework: &mut dyn Framework,
    local: &mut BTreeMap<String, String>,
    policy: KeyPolicy,
    config_path: &Path,
) -> Result<KeySyncPlan> {
    let remote = framework.keys().await?;
    let plan = plan_key_sync(local, &remote, policy);

    for name in &plan.conflicts {
        warn!(
            "Key {} differs between the config file and the framework; enable key_override to resolve it",
            name
        );
    }
    if plan.is_noop() {
        debug!("API keys already in sync");
        return Ok(plan);
    }

    if apply_local(&plan, local) {
        save_api_keys(config_path, local)?;
    }
    push_framework_keys(&plan, framework).await?;

    info!(
        "Key sync: {} pushed to the framework, {} written to the config, {} conflict(s)",
        plan.to_framework.len(),
        plan.to_local.len(),
        plan.conflicts.len()
    );
    Ok(plan)
}
