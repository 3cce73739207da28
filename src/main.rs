use anyhow::Result;
use autorecon::config::load_config;
use autorecon::output::SummaryWriter;
use autorecon::{setup, utils, Args, ReconEngine, ReconSession};
use chrono::Local;
use clap::Parser;
use log::{error, info, warn};
use std::process;

const BANNER: &str = r#"
   ___       __       ___
  / _ |__ __/ /____  / _ \___ _______  ___
 / __ / // / __/ _ \/ , _/ -_) __/ _ \/ _ \
/_/ |_\_,_/\__/\___/_/|_|\__/\__/\___/_//_/

        recon-ng pipeline automation
"#;

/// Workspace used when keys are synced outside a pipeline run.
const DEFAULT_WORKSPACE: &str = "default";

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .parse_default_env()
        .target(env_logger::Target::Stdout)
        .init();

    if !args.silent {
        println!("{}", BANNER);
    }

    let config = match load_config(&args.config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            error!("A readable configuration file is required, exiting...");
            process::exit(1);
        }
    };

    let domains = get_domains_from_args(&args);
    if !args.has_work(&domains) {
        warn!("Nothing to do. Pass one or more domains, -d <file>, -k or --pip");
        return Ok(());
    }

    let mut engine = ReconEngine::new(config, args.config_path.clone()).silent(args.silent);

    if args.keys {
        let mut session = ReconSession::new(&engine.config().recon, DEFAULT_WORKSPACE);
        match engine.sync_keys(&mut session).await {
            Ok(plan) if plan.conflicts.is_empty() => info!("API keys are in sync"),
            Ok(plan) => warn!("{} key conflict(s) left unresolved", plan.conflicts.len()),
            Err(e) => error!("Key sync failed: {}", e),
        }
    }

    if args.pip {
        let failed = setup::install_packages(&engine.config().setup).await;
        if !failed.is_empty() {
            warn!("Failed to install: {}", failed.join(", "));
        }
    }

    if !domains.is_empty() {
        let plan = args.plan(domains, engine.config().harvester.always_run);
        let workspace = ReconEngine::workspace_name(&plan, Local::now())?;
        let mut session = ReconSession::new(&engine.config().recon, workspace);

        let summary = engine.run(&mut session, &plan).await?;
        if !args.silent {
            SummaryWriter::new(args.verbose).print(&summary)?;
        }
    }

    Ok(())
}

fn get_domains_from_args(args: &Args) -> Vec<String> {
    let mut domains = args.domains.clone();

    if let Some(file_path) = &args.domains_file {
        match utils::read_domain_list(file_path) {
            Ok(lines) => domains.extend(lines),
            Err(e) => {
                error!("Failed to read domains from file {:?}: {}", file_path, e);
            }
        }
    }

    domains
}
