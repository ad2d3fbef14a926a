use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use tracing::info;

use decor::app::{App, AppOptions, Menu, MenuItem};
use decor::backend::SystemBackend;
use decor::config::Config;
use decor::executor::Executor;
use decor::logging::init_tracing;
use decor::platform::Platform;
use decor::toolchain::{InstallEnv, LatestVersions, Registry};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to config.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log every command instead of running it
    #[arg(long)]
    dry_run: bool,

    /// Write logs here instead of the cache directory
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Comma separated toolchains to process, skipping the menu (e.g. go,python)
    #[arg(long)]
    select: Option<String>,
}

fn main() {
    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let config = match args.config.as_ref() {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };

    let latest = LatestVersions::with_overrides(&config.latest_versions);
    let registry = Registry::builtin(&latest);

    let preselected = match args.select.as_deref() {
        Some(list) => match registry.parse_selection(list) {
            Ok(selection) => Some(selection),
            Err(message) => Args::command().error(ErrorKind::InvalidValue, message).exit(),
        },
        None => None,
    };

    let log_file = match args.log_file {
        Some(path) => path,
        None => config.log_file()?,
    };
    init_tracing(&log_file, config.log_level.as_deref())?;

    let dry_run = args.dry_run || config.dry_run;
    let platform = Platform::detect();
    info!(os = %platform.os, pkg_manager = %platform.pkg_manager, dry_run, "decor starting");

    let env = InstallEnv {
        platform: platform.clone(),
        go_root: config.go_root()?,
        download_dir: config.download_dir()?,
        use_sudo: config.use_sudo,
    };
    let executor =
        Executor::new(dry_run, config.step_delay()).context("failed to build HTTP client")?;

    let menu = Menu::new(
        registry
            .iter()
            .map(|toolchain| MenuItem {
                id: toolchain.id(),
                name: toolchain.display_name(),
            })
            .collect(),
    );
    let backend = Arc::new(SystemBackend::new(registry, latest, env, executor));

    let mut app = App::new(
        menu,
        backend,
        AppOptions {
            platform,
            poll_interval: config.poll_interval(),
            dry_run,
            use_sudo: config.use_sudo,
            preselected,
        },
    );
    app.run()
}
