use crate::types::SetupConfig;
use log::{error, info};
use tokio::process::Command;

/// Installs the Python packages the framework modules import. Each package
/// is attempted even if an earlier one failed; returns the failed names.
pub async fn install_packages(config: &SetupConfig) -> Vec<String> {
    let mut failed = Vec::new();

    for package in &config.packages {
        info!("Installing {} with {} -m pip", package, config.python);
        let status = pip_command(&config.python, package).status().await;
        match status {
            Ok(status) if status.success() => {}
            Ok(status) => {
                error!("pip install {} exited with {}", package, status);
                failed.push(package.clone());
            }
            Err(e) => {
                error!("Failed to run {}: {}", config.python, e);
                failed.push(package.clone());
            }
        }
    }

    if failed.is_empty() {
        info!("Installed {} package(s)", config.packages.len());
    }
    failed
}

fn pip_command(python: &str, package: &str) -> Command {
    let mut cmd = Command::new(python);
    cmd.args(["-m", "pip", "install", package]);
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pip_command() {
        let cmd = pip_command("python3", "shodan");
        let std_cmd = cmd.as_std();
        assert_eq!(std_cmd.get_program(), "python3");
        let args: Vec<_> = std_cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, vec!["-m", "pip", "install", "shodan"]);
    }

    #[tokio::test]
    async fn test_missing_interpreter_reports_every_package() {
        let config = SetupConfig {
            python: "/nonexistent/python-for-tests".to_string(),
            packages: vec!["lxml".to_string(), "shodan".to_string()],
        };
        assert_eq!(install_packages(&config).await, vec!["lxml", "shodan"]);
    }
}
