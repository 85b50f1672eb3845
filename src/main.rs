mod backend;
mod catalog;
mod config;
mod credentials;
mod database;
mod errors;
mod java_manager;
mod launcher;
mod library_manager;
mod logging;
mod models;
mod progress;
mod remember;
mod session;
mod settings;
mod stats;
mod utils;
mod worker;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::{Color, Term, style};
use dialoguer::{Input, Password, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::{error, info, warn};

use crate::backend::GameBackend;
use crate::catalog::{find_entry, load_catalog};
use crate::config::LauncherConfig;
use crate::database::Database;
use crate::errors::SessionError;
use crate::launcher::MinecraftLauncher;
use crate::remember::RememberFile;
use crate::session::{SessionController, Submission};
use crate::settings::Settings;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Login to pre-fill
    #[arg(short, long)]
    username: Option<String>,

    /// Version to preselect, by label ("Fabric 1.20.1") or id
    #[arg(short, long, value_name = "MINECRAFT_VERSION")]
    minecraft_version: Option<String>,

    /// RAM in MB
    #[arg(short, long)]
    ram: Option<u32>,

    /// Launcher directory (default: ~/.rowdylauncher)
    #[arg(long, value_name = "DIR")]
    launcher_dir: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Do not keep the login on disk
    #[arg(long)]
    no_remember: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Log in and launch a version (default)
    Play,
    /// Show launch statistics
    Stats {
        /// Only versions whose label contains this text
        #[arg(short, long, default_value = "")]
        filter: String,
    },
}

type Controller = SessionController<MinecraftLauncher>;

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.launcher_dir {
        Some(dir) => LauncherConfig::with_dir(dir),
        None => LauncherConfig::new()?,
    };
    let rt = Arc::new(Runtime::new().context("Failed to start the async runtime")?);
    rt.block_on(config.ensure_directories())?;
    let _log_guard = logging::init(&config.logs_dir, args.verbose)?;
    info!("Launcher directory: {}", config.launcher_dir.display());

    let mut settings = rt.block_on(Settings::load(&config.launcher_dir));
    if let Some(ram) = args.ram {
        settings.ram_mb = ram;
    }
    if args.no_remember {
        settings.remember_credentials = false;
    }

    let db = Arc::new(Database::open(&config.database_path())?);
    let backend = Arc::new(MinecraftLauncher::new(config.clone(), rt.clone(), settings.ram_mb));
    let remember = RememberFile::new(config.remember_path());

    if let Some(Commands::Stats { filter }) = &args.command {
        let controller = SessionController::new(db, backend, Vec::new(), remember);
        print_statistics(&controller, filter)?;
        return Ok(());
    }

    let term = Term::stdout();
    term.clear_screen()?;
    println!(
        "{}",
        style(format!("RowdyLauncher v{}", env!("CARGO_PKG_VERSION")))
            .fg(Color::Yellow)
            .bold()
    );

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {wide_msg}")?);
    spinner.set_message("Loading version list...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    let entries = load_catalog(backend.as_ref()).context("Could not load the version list");
    spinner.finish_and_clear();
    let entries = entries?;

    let mut controller = SessionController::new(db, backend, entries, remember);
    controller.set_remember(settings.remember_credentials);
    controller.prefill();
    if let Some(login) = &args.username {
        controller.set_login(login.clone());
    }
    let preselect = args.minecraft_version.as_deref().or(settings.last_version.as_deref());
    if let Some(query) = preselect {
        match find_entry(controller.entries(), query) {
            Some(index) => {
                controller.select(index);
            }
            None => println!("{}", style(format!("Unknown version: {}", query)).yellow()),
        }
    }

    loop {
        let choice = Select::new()
            .with_prompt(style("What now?").fg(Color::Green).to_string())
            .items(&["Play", "Statistics", "Quit"])
            .default(0)
            .interact()?;

        let result = match choice {
            0 => play(&mut controller, &mut settings, &config, &rt),
            1 => statistics(&controller),
            _ => break,
        };

        if let Err(e) = result {
            error!("{:#}", e);
            println!("{}", style(format!("Error: {:#}", e)).red());
        }
    }

    Ok(())
}

fn play(controller: &mut Controller, settings: &mut Settings, config: &LauncherConfig, rt: &Runtime) -> Result<()> {
    if controller.entries().is_empty() {
        println!("{}", style("No versions available").red());
        return Ok(());
    }

    if !controller.form().locked {
        let login: String = Input::new()
            .with_prompt("Login")
            .with_initial_text(controller.form().login.clone())
            .allow_empty(true)
            .interact_text()?;
        controller.set_login(login.trim());

        let saved = !controller.form().password.is_empty();
        let prompt = if saved { "Password (empty keeps the saved one)" } else { "Password" };
        let password = Password::new()
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()?;
        if !saved || !password.is_empty() {
            controller.set_password(password);
        }
    } else {
        println!("Logged in as {}", style(&controller.form().login).bold());
    }

    let labels: Vec<&str> = controller.entries().iter().map(|e| e.label.as_str()).collect();
    let index = Select::new()
        .with_prompt("Version")
        .items(&labels)
        .default(controller.selected_index().unwrap_or(0))
        .max_length(15)
        .interact()?;
    controller.select(index);

    match controller.submit() {
        Ok(Submission::Started(_)) => {
            println!("{}", style(controller.status()).green());
            settings.last_version = controller.selected_entry().map(|e| e.label.clone());
            if let Err(e) = rt.block_on(settings.save(&config.launcher_dir)) {
                warn!("Could not save settings: {}", e);
            }
            follow_launch(controller)?;
            let status = style(controller.status().to_string());
            if controller.status().starts_with("Launch failed") {
                println!("{}", status.red());
            } else {
                println!("{}", status.green());
            }
        }
        Ok(Submission::Busy) | Ok(Submission::Invalid(_)) => {
            println!("{}", style(controller.status()).yellow());
        }
        Ok(Submission::Denied(_)) => println!("{}", style(controller.status()).red()),
        Err(SessionError::Launch(_)) => println!("{}", style(controller.status()).red()),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// Shows worker progress until the game has exited.
fn follow_launch<B: GameBackend>(controller: &mut SessionController<B>) -> Result<()> {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {wide_msg}")?
            .progress_chars("=>-"),
    );
    bar.enable_steady_tick(Duration::from_millis(100));

    while controller.is_busy() {
        if controller.next_event_timeout(Duration::from_millis(200)).is_none() {
            continue;
        }
        if let Some(progress) = controller.progress() {
            bar.set_length(progress.max);
            bar.set_position(progress.current);
        }
        let stage = controller.stage().map(|s| s.label()).unwrap_or_default();
        let detail = controller.progress().map(|p| p.label.as_str()).unwrap_or_default();
        bar.set_message(format!("{} {}", stage, detail));
    }
    controller.poll_events();
    bar.finish_and_clear();
    Ok(())
}

fn statistics<B: GameBackend>(controller: &SessionController<B>) -> Result<()> {
    let filter: String = Input::new()
        .with_prompt("Filter (empty for all)")
        .allow_empty(true)
        .interact_text()?;
    print_statistics(controller, &filter)
}

fn print_statistics<B: GameBackend>(controller: &SessionController<B>, filter: &str) -> Result<()> {
    let stats = controller.statistics(filter)?;
    if stats.is_empty() {
        println!("{}", style("No launches recorded").yellow());
        return Ok(());
    }
    println!(
        "{}",
        style(format!("{:<36} {:>8}  {}", "Version", "Launches", "Release")).bold()
    );
    for stat in stats {
        println!("{:<36} {:>8}  {}", stat.version_label, stat.launch_count, stat.release_marker);
    }
    Ok(())
}
