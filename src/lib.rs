// src/lib.rs
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod framework;
pub mod harvester;
pub mod imports;
pub mod keys;
pub mod modules;
pub mod output;
pub mod report;
pub mod session;
pub mod setup;
pub mod types;
pub mod utils;

pub use cli::Args;
pub use engine::ReconEngine;
pub use framework::{Framework, ModuleResolution, Record};
pub use session::ReconSession;
pub use types::{AutoReconError, Config, RunPlan, RunSummary};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
