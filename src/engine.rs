use crate::error::Result;
use crate::framework::{Framework, ModuleInvocation, Record};
use crate::harvester::Harvester;
use crate::imports::{load_emails, load_hosts};
use crate::keys::{sync_keys, KeyPolicy, KeySyncPlan};
use crate::modules::{export_xlsx, linkedin_lookup, mangle, run_invocation, MANGLE as MANGLE_MODULE};
use crate::report::ingest_report;
use crate::types::{AutoReconError, Config, RunPlan, RunSummary, StageStatus};
use crate::utils::{absolute_path, is_valid_domain, validate_name_pattern};
use chrono::{DateTime, Local};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;

pub const STAGE_INIT: &str = "init";
pub const STAGE_KEYS: &str = "key sync";
pub const STAGE_DOMAINS: &str = "domains";
pub const STAGE_HARVESTER: &str = "theHarvester";
pub const STAGE_HARVEST_REPORT: &str = "harvest report";
pub const STAGE_HOST_IMPORT: &str = "host import";
pub const STAGE_EMAIL_IMPORT: &str = "email import";
pub const STAGE_COMPANIES: &str = "companies";
pub const STAGE_MANGLE: &str = "mangle";
pub const STAGE_EXPORT: &str = "export";

pub struct ReconEngine {
    config: Config,
    config_path: PathBuf,
    silent: bool,
}

impl ReconEngine {
    pub fn new(config: Config, config_path: PathBuf) -> Self {
        Self {
            config,
            config_path,
            silent: false,
        }
    }

    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn key_policy(&self) -> KeyPolicy {
        KeyPolicy {
            allow_override: self.config.recon.key_override,
            authority: self.config.recon.key_authority,
        }
    }

    /// The explicit workspace, or `<first domain>-<YYYY_MM_DD-HHMM>`.
    pub fn workspace_name(plan: &RunPlan, now: DateTime<Local>) -> Result<String> {
        if let Some(workspace) = &plan.workspace {
            return Ok(workspace.clone());
        }
        let first = plan.domains.first().ok_or_else(|| {
            AutoReconError::ConfigError("No domains provided".to_string())
        })?;
        Ok(format!("{}-{}", first, now.format("%Y_%m_%d-%H%M")))
    }

    pub async fn sync_keys(&mut self, framework: &mut dyn Framework) -> Result<KeySyncPlan> {
        let policy = self.key_policy();
        sync_keys(framework, &mut self.config.api_keys, policy, &self.config_path).await
    }

    pub async fn run(&mut self, framework: &mut dyn Framework, plan: &RunPlan) -> Result<RunSummary> {
        if plan.domains.is_empty() {
            return Err(AutoReconError::ConfigError(
                "No domains provided".to_string(),
            ));
        }

        let start_time = Instant::now();
        let mut summary = RunSummary {
            workspace: framework.workspace().to_string(),
            domains: plan.domains.len(),
            ..Default::default()
        };
        info!(
            "Starting recon for {} domain(s) in workspace {}",
            plan.domains.len(),
            summary.workspace
        );

        let status = outcome(STAGE_INIT, self.start_session(framework).await);
        summary.record(STAGE_INIT, status);

        if self.config.recon.key_auto_update {
            let status = outcome(STAGE_KEYS, self.sync_keys(framework).await);
            summary.record(STAGE_KEYS, status);
        }

        let status = outcome(STAGE_DOMAINS, ingest_domains(framework, &plan.domains).await);
        summary.record(STAGE_DOMAINS, status);

        self.run_harvesting(framework, plan, &mut summary).await;

        if !plan.companies.is_empty() {
            let status = outcome(
                STAGE_COMPANIES,
                self.run_company_lookup(framework, &plan.companies).await,
            );
            summary.record(STAGE_COMPANIES, status);
        }

        if let Some(pattern) = &plan.pattern {
            let status = if plan.gathers_contacts() {
                outcome(
                    STAGE_MANGLE,
                    self.run_mangle(framework, &plan.domains, pattern).await,
                )
            } else {
                skipped(STAGE_MANGLE, "no harvesting, import or company step ran")
            };
            summary.record(STAGE_MANGLE, status);
        }

        self.run_module_sweep(framework, &mut summary).await;

        match self.export(framework, Path::new(&plan.export)).await {
            Ok(path) => {
                info!("Exported workspace to {}", path.display());
                summary.export_path = Some(path);
                summary.record(STAGE_EXPORT, StageStatus::Completed);
            }
            Err(e) => {
                let status = outcome::<()>(STAGE_EXPORT, Err(e));
                summary.record(STAGE_EXPORT, status);
            }
        }

        info!(
            "Recon for workspace {} finished in {:.2}s",
            summary.workspace,
            start_time.elapsed().as_secs_f64()
        );
        Ok(summary)
    }

    /// Opens the workspace and applies the global timeout.
    async fn start_session(&self, framework: &mut dyn Framework) -> Result<()> {
        framework.start().await?;
        let timeout = self.config.recon.timeout.to_string();
        framework.set_global_option("TIMEOUT", &timeout).await
    }

    async fn run_harvesting(&self, framework: &mut dyn Framework, plan: &RunPlan, summary: &mut RunSummary) {
        if plan.run_harvester {
            let harvester = Harvester::new(self.config.harvester.clone());
            let status = match harvester.run(&plan.domains[0]).await {
                Ok(report) => match ingest_report(framework, &report).await {
                    Err(AutoReconError::ReportNotFound(path)) => skipped(
                        STAGE_HARVESTER,
                        &format!("no report at {}, treating as zero results", path.display()),
                    ),
                    result => outcome(STAGE_HARVESTER, result),
                },
                Err(e) => outcome::<()>(STAGE_HARVESTER, Err(e)),
            };
            summary.record(STAGE_HARVESTER, status);
        }

        if let Some(report) = &plan.harvest_report {
            let status = outcome(STAGE_HARVEST_REPORT, ingest_report(framework, report).await);
            summary.record(STAGE_HARVEST_REPORT, status);
        }

        if let Some(hosts) = &plan.host_file {
            let status = outcome(STAGE_HOST_IMPORT, load_hosts(framework, hosts).await);
            summary.record(STAGE_HOST_IMPORT, status);
        }

        if let Some(emails) = &plan.email_file {
            let status = outcome(STAGE_EMAIL_IMPORT, load_emails(framework, emails).await);
            summary.record(STAGE_EMAIL_IMPORT, status);
        }
    }

    async fn run_company_lookup(&self, framework: &mut dyn Framework, companies: &[String]) -> Result<()> {
        for company in companies {
            framework.insert(&Record::Company(company.clone())).await?;
        }
        run_invocation(framework, &linkedin_lookup(self.config.pipeline.linkedin_limit)).await
    }

    async fn run_mangle(&self, framework: &mut dyn Framework, domains: &[String], pattern: &str) -> Result<()> {
        validate_name_pattern(pattern)?;

        let mut failed = 0;
        for domain in domains {
            let invocation = mangle(domain, pattern, self.config.pipeline.mangle_max_length);
            match run_invocation(framework, &invocation).await {
                Ok(()) => {}
                // Nothing to retry per domain once the module itself is missing.
                Err(e @ AutoReconError::ModuleUnavailable(_)) => return Err(e),
                Err(e) => {
                    warn!("Mangle for {} failed: {}", domain, e);
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            return Err(AutoReconError::ModuleFailed {
                module: MANGLE_MODULE.to_string(),
                message: format!("{} of {} domain(s) failed", failed, domains.len()),
            });
        }
        Ok(())
    }

    async fn run_module_sweep(&self, framework: &mut dyn Framework, summary: &mut RunSummary) {
        let modules = &self.config.pipeline.modules;
        let progress = if self.silent {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::new(modules.len() as u64);
            bar.set_style(
                ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=> "),
            );
            bar
        };

        for module in modules {
            progress.set_message(module.clone());
            let stage = format!("module {}", module);
            let status = outcome(
                &stage,
                run_invocation(framework, &ModuleInvocation::new(module.as_str())).await,
            );
            summary.record(stage, status);
            progress.inc(1);
        }
        progress.finish_and_clear();
    }

    async fn export(&self, framework: &mut dyn Framework, export: &Path) -> Result<PathBuf> {
        let path = absolute_path(export)?;
        run_invocation(framework, &export_xlsx(&path)).await?;
        Ok(path)
    }
}

/// Inserts every domain in order. Output of the individual inserts stays at
/// debug level.
pub async fn ingest_domains(framework: &mut dyn Framework, domains: &[String]) -> Result<()> {
    let mut failed = 0;
    for domain in domains {
        if !is_valid_domain(domain) {
            warn!("{} does not look like a domain, adding it anyway", domain);
        }
        if let Err(e) = framework.insert(&Record::Domain(domain.clone())).await {
            warn!("Failed to add domain {}: {}", domain, e);
            failed += 1;
        }
    }

    if failed > 0 {
        return Err(AutoReconError::FrameworkError(format!(
            "{} of {} domain insert(s) failed",
            failed,
            domains.len()
        )));
    }
    info!("Added {} domain(s)", domains.len());
    Ok(())
}

fn skipped(stage: &str, reason: &str) -> StageStatus {
    warn!("Skipping {}: {}", stage, reason);
    StageStatus::Skipped(reason.to_string())
}

fn outcome<T>(stage: &str, result: Result<T>) -> StageStatus {
    match result {
        Ok(_) => StageStatus::Completed,
        Err(AutoReconError::ModuleUnavailable(module)) => {
            skipped(stage, &format!("module {} is unavailable", module))
        }
        Err(e) => {
            error!("{} failed: {}", stage, e);
            StageStatus::Failed(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::fake::{Call, RecordingFramework};
    use crate::modules::{EXPORT_XLSX, IMPORT_CSV, IMPORT_LIST, LINKEDIN_CACHE, MANGLE};
    use crate::types::{
        HarvesterConfig, KeyAuthority, PipelineConfig, ReconConfig, SetupConfig, DEFAULT_MODULES,
    };
    use crate::utils::read_domain_list;
    use chrono::TimeZone;
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::TempDir;

    fn test_config() -> Config {
        Config {
            recon: ReconConfig {
                path: PathBuf::from("/opt/recon-ng"),
                executable: "recon-cli".to_string(),
                extra_args: Vec::new(),
                timeout: 100,
                key_auto_update: false,
                key_override: false,
                key_authority: KeyAuthority::Config,
            },
            harvester: HarvesterConfig {
                path: PathBuf::from("/opt/theHarvester"),
                executable: "theHarvester.py".to_string(),
                source: "bing".to_string(),
                temp_filename: "harvester_temp".to_string(),
                always_run: false,
            },
            pipeline: PipelineConfig::default(),
            setup: SetupConfig::default(),
            api_keys: BTreeMap::new(),
        }
    }

    fn all_modules() -> Vec<String> {
        DEFAULT_MODULES
            .iter()
            .copied()
            .chain([IMPORT_CSV, IMPORT_LIST, LINKEDIN_CACHE, MANGLE, EXPORT_XLSX])
            .map(str::to_string)
            .collect()
    }

    fn engine(dir: &TempDir) -> ReconEngine {
        ReconEngine::new(test_config(), dir.path().join("config.toml")).silent(true)
    }

    fn plan(dir: &TempDir, domains: &[&str]) -> RunPlan {
        RunPlan {
            domains: domains.iter().map(|d| d.to_string()).collect(),
            export: dir.path().join("output.xlsx").display().to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_workspace_name() {
        let now = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();
        let mut run = RunPlan {
            domains: vec!["example.com".to_string(), "acme.org".to_string()],
            ..Default::default()
        };
        assert_eq!(
            ReconEngine::workspace_name(&run, now).unwrap(),
            "example.com-2024_03_09-1405"
        );

        run.workspace = Some("engagement".to_string());
        assert_eq!(ReconEngine::workspace_name(&run, now).unwrap(), "engagement");

        assert!(ReconEngine::workspace_name(&RunPlan::default(), now).is_err());
    }

    #[tokio::test]
    async fn test_minimal_run_sweeps_and_exports() {
        let dir = TempDir::new().unwrap();
        let mut fw = RecordingFramework::new("ws").with_modules(all_modules());
        let summary = engine(&dir)
            .run(&mut fw, &plan(&dir, &["example.com", "acme.org"]))
            .await
            .unwrap();

        assert_eq!(fw.calls[0], Call::Start);
        assert_eq!(fw.calls[1], Call::SetOption("TIMEOUT".to_string(), "100".to_string()));
        assert_eq!(
            fw.inserts(),
            vec![
                &Record::Domain("example.com".to_string()),
                &Record::Domain("acme.org".to_string()),
            ]
        );

        let mut expected: Vec<&str> = DEFAULT_MODULES.to_vec();
        expected.push(EXPORT_XLSX);
        assert_eq!(fw.run_paths(), expected);

        let export = fw.runs().last().unwrap().options[0].1.clone();
        assert_eq!(export, dir.path().join("output.xlsx").display().to_string());
        assert_eq!(summary.export_path, Some(dir.path().join("output.xlsx")));
        assert_eq!(summary.status_of(STAGE_MANGLE), None);
        assert_eq!(summary.status_of(STAGE_KEYS), None);
    }

    #[tokio::test]
    async fn test_failed_and_missing_modules_do_not_stop_the_run() {
        let dir = TempDir::new().unwrap();
        let broken = "recon/hosts-ports/shodan_ip";
        let missing = "recon/domains-hosts/brute_hosts";

        let modules: Vec<String> = all_modules().into_iter().filter(|m| m != missing).collect();
        let mut fw = RecordingFramework::new("ws").with_modules(modules);
        fw.failing.insert(broken.to_string());

        let summary = engine(&dir)
            .run(&mut fw, &plan(&dir, &["example.com"]))
            .await
            .unwrap();

        assert!(fw.calls.contains(&Call::Install(missing.to_string())));
        assert!(!fw.run_paths().contains(&missing));
        assert_eq!(fw.run_paths().last(), Some(&EXPORT_XLSX));
        assert_eq!(fw.run_paths().len(), DEFAULT_MODULES.len());

        assert!(matches!(
            summary.status_of(&format!("module {}", missing)),
            Some(StageStatus::Skipped(_))
        ));
        assert!(matches!(
            summary.status_of(&format!("module {}", broken)),
            Some(StageStatus::Failed(_))
        ));
        assert_eq!(summary.status_of(STAGE_EXPORT), Some(&StageStatus::Completed));
    }

    #[tokio::test]
    async fn test_companies_and_mangle_per_domain() {
        let dir = TempDir::new().unwrap();
        let mut fw = RecordingFramework::new("ws").with_modules(all_modules());
        let mut run = plan(&dir, &["example.com", "acme.org"]);
        run.companies = vec!["Example Inc".to_string()];
        run.pattern = Some("<fi><ln>".to_string());

        let summary = engine(&dir).run(&mut fw, &run).await.unwrap();

        assert!(fw.inserts().contains(&&Record::Company("Example Inc".to_string())));
        let runs = fw.runs();
        assert_eq!(runs[0].module, LINKEDIN_CACHE);
        assert_eq!(runs[0].options, vec![("LIMIT".to_string(), "1".to_string())]);
        assert_eq!(runs[1], &mangle("example.com", "<fi><ln>", 60));
        assert_eq!(runs[2], &mangle("acme.org", "<fi><ln>", 60));
        assert_eq!(summary.status_of(STAGE_MANGLE), Some(&StageStatus::Completed));
    }

    #[tokio::test]
    async fn test_failing_mangle_still_covers_every_domain() {
        let dir = TempDir::new().unwrap();
        let mut fw = RecordingFramework::new("ws").with_modules(all_modules());
        fw.failing.insert(MANGLE.to_string());
        let domains = vec!["a.com".to_string(), "b.com".to_string()];

        let result = engine(&dir).run_mangle(&mut fw, &domains, "<fi><ln>").await;

        assert!(matches!(result, Err(AutoReconError::ModuleFailed { .. })));
        assert_eq!(
            fw.runs(),
            vec![&mangle("a.com", "<fi><ln>", 60), &mangle("b.com", "<fi><ln>", 60)]
        );

        let mut fw = RecordingFramework::new("ws").with_modules(all_modules());
        fw.failing.insert(MANGLE.to_string());
        let mut run = plan(&dir, &["a.com", "b.com"]);
        run.companies = vec!["Example Inc".to_string()];
        run.pattern = Some("<fi><ln>".to_string());

        let summary = engine(&dir).run(&mut fw, &run).await.unwrap();
        let mangles = fw.run_paths().iter().filter(|p| **p == MANGLE).count();
        assert_eq!(mangles, 2);
        assert!(matches!(summary.status_of(STAGE_MANGLE), Some(StageStatus::Failed(_))));
        assert_eq!(summary.status_of(STAGE_EXPORT), Some(&StageStatus::Completed));
    }

    #[tokio::test]
    async fn test_init_applies_configured_timeout() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config();
        config.recon.timeout = 250;
        let mut fw = RecordingFramework::new("ws").with_modules(all_modules());

        let mut engine = ReconEngine::new(config, dir.path().join("config.toml")).silent(true);
        let summary = engine.run(&mut fw, &plan(&dir, &["example.com"])).await.unwrap();

        assert!(fw
            .calls
            .contains(&Call::SetOption("TIMEOUT".to_string(), "250".to_string())));
        assert_eq!(summary.status_of(STAGE_INIT), Some(&StageStatus::Completed));
    }

    #[tokio::test]
    async fn test_mangle_needs_a_gathering_step() {
        let dir = TempDir::new().unwrap();
        let mut fw = RecordingFramework::new("ws").with_modules(all_modules());
        let mut run = plan(&dir, &["example.com"]);
        run.pattern = Some("<fi><ln>".to_string());

        let summary = engine(&dir).run(&mut fw, &run).await.unwrap();

        assert!(!fw.run_paths().contains(&MANGLE));
        assert!(matches!(summary.status_of(STAGE_MANGLE), Some(StageStatus::Skipped(_))));
    }

    #[tokio::test]
    async fn test_invalid_pattern_runs_no_mangle() {
        let dir = TempDir::new().unwrap();
        let mut fw = RecordingFramework::new("ws").with_modules(all_modules());
        let mut run = plan(&dir, &["example.com"]);
        run.companies = vec!["Example Inc".to_string()];
        run.pattern = Some("<zz>".to_string());

        let summary = engine(&dir).run(&mut fw, &run).await.unwrap();

        assert!(!fw.run_paths().contains(&MANGLE));
        assert!(matches!(summary.status_of(STAGE_MANGLE), Some(StageStatus::Failed(_))));
        assert_eq!(summary.status_of(STAGE_EXPORT), Some(&StageStatus::Completed));
    }

    #[tokio::test]
    async fn test_harvest_report_and_imports() {
        let dir = TempDir::new().unwrap();
        let report = dir.path().join("report.xml");
        fs::write(
            &report,
            "<theHarvester><email>a@b.com</email><hostname>h.example.com</hostname></theHarvester>",
        )
        .unwrap();
        let hosts = dir.path().join("hosts.csv");
        fs::write(&hosts, "h.example.com,10.0.0.1\n").unwrap();
        let emails = dir.path().join("emails.txt");
        fs::write(&emails, "not,an,email,list\n").unwrap();

        let mut fw = RecordingFramework::new("ws").with_modules(all_modules());
        let mut run = plan(&dir, &["example.com"]);
        run.harvest_report = Some(report);
        run.host_file = Some(hosts);
        run.email_file = Some(emails);

        let summary = engine(&dir).run(&mut fw, &run).await.unwrap();

        assert_eq!(fw.inserts().len(), 3);
        assert_eq!(fw.run_paths()[0], IMPORT_CSV);
        assert!(!fw.run_paths().contains(&IMPORT_LIST));
        assert_eq!(summary.status_of(STAGE_HARVEST_REPORT), Some(&StageStatus::Completed));
        assert_eq!(summary.status_of(STAGE_HOST_IMPORT), Some(&StageStatus::Completed));
        assert!(matches!(summary.status_of(STAGE_EMAIL_IMPORT), Some(StageStatus::Failed(_))));
    }

    #[tokio::test]
    async fn test_malformed_report_fails_stage_only() {
        let dir = TempDir::new().unwrap();
        let report = dir.path().join("report.xml");
        fs::write(&report, "<theHarvester><email>a@b.com</theHarvester>").unwrap();

        let mut fw = RecordingFramework::new("ws").with_modules(all_modules());
        let mut run = plan(&dir, &["example.com"]);
        run.harvest_report = Some(report);

        let summary = engine(&dir).run(&mut fw, &run).await.unwrap();
        assert!(matches!(
            summary.status_of(STAGE_HARVEST_REPORT),
            Some(StageStatus::Failed(_))
        ));
        assert_eq!(summary.status_of(STAGE_EXPORT), Some(&StageStatus::Completed));
    }

    #[tokio::test]
    async fn test_domain_file_with_blank_line() {
        let dir = TempDir::new().unwrap();
        let list = dir.path().join("domains.txt");
        fs::write(&list, "example.com\n\nacme.org\n").unwrap();

        let domains = read_domain_list(&list).unwrap();
        let refs: Vec<&str> = domains.iter().map(String::as_str).collect();
        let mut fw = RecordingFramework::new("ws").with_modules(all_modules());
        engine(&dir).run(&mut fw, &plan(&dir, &refs)).await.unwrap();

        assert_eq!(
            fw.inserts(),
            vec![
                &Record::Domain("example.com".to_string()),
                &Record::Domain("acme.org".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_key_sync_runs_before_domains() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config();
        config.recon.key_auto_update = true;
        config.api_keys.insert("shodan_api".to_string(), "S".to_string());

        let mut fw = RecordingFramework::new("ws").with_modules(all_modules());
        let mut engine = ReconEngine::new(config, dir.path().join("config.toml")).silent(true);
        let summary = engine.run(&mut fw, &plan(&dir, &["example.com"])).await.unwrap();

        assert_eq!(fw.calls[2], Call::AddKey("shodan_api".to_string(), "S".to_string()));
        assert!(matches!(fw.calls[3], Call::Insert(Record::Domain(_))));
        assert_eq!(summary.status_of(STAGE_KEYS), Some(&StageStatus::Completed));
    }

    #[tokio::test]
    async fn test_empty_domain_list_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut fw = RecordingFramework::new("ws");
        assert!(engine(&dir).run(&mut fw, &plan(&dir, &[])).await.is_err());
        assert!(fw.calls.is_empty());
    }
}
