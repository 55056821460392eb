mod backup;
mod context;
mod import;
mod install;
mod manage;
mod mods;
mod outdated;
mod progress;
mod remove;
mod update;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use context::CliContext;

#[derive(Parser, Debug)]
#[command(name = "ucload")]
#[command(about = "Install and manage userChrome.css mods")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Browser profile chrome directory (overrides UCLOAD_CHROME_DIR and config.json)
    #[arg(long, global = true, value_name = "DIR")]
    chrome_dir: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Never prompt; answer every question with its default
    #[arg(short = 'n', long, global = true)]
    no_interaction: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download a mod and import it into userChrome.css
    #[command(visible_alias = "add")]
    Install(install::InstallArgs),

    /// Import a stylesheet or mod folder from the local disk
    Import(import::ImportArgs),

    /// List the imports of userChrome.css
    List,

    /// Enable a disabled import
    Enable(manage::IndexArgs),

    /// Disable an import by commenting it out
    Disable(manage::IndexArgs),

    /// Flip an import between enabled and disabled
    Toggle(manage::IndexArgs),

    /// Remove an import and delete the files it references
    Remove(remove::RemoveArgs),

    /// Check registered mods for newer versions
    Outdated,

    /// Reinstall registered mods that have newer versions
    Update(update::UpdateArgs),

    /// Show the registered mods
    Mods(mods::ModsArgs),

    /// Back up userChrome.css
    Backup,
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

fn run() -> Result<i32> {
    let args = Args::parse();
    init_logging(args.verbose);

    let ctx = CliContext::new(args.chrome_dir.as_deref(), !args.no_interaction)?;

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| anyhow::anyhow!("Failed to create async runtime: {}", e))?;

    match args.command {
        Commands::Install(install_args) => rt.block_on(install::execute(install_args, &ctx)),
        Commands::Import(import_args) => rt.block_on(import::execute(import_args, &ctx)),
        Commands::List => manage::list(&ctx),
        Commands::Enable(index) => manage::set_state(index, Some(true), &ctx),
        Commands::Disable(index) => manage::set_state(index, Some(false), &ctx),
        Commands::Toggle(index) => manage::set_state(index, None, &ctx),
        Commands::Remove(remove_args) => rt.block_on(remove::execute(remove_args, &ctx)),
        Commands::Outdated => rt.block_on(outdated::execute(&ctx)),
        Commands::Update(update_args) => rt.block_on(update::execute(update_args, &ctx)),
        Commands::Mods(mods_args) => rt.block_on(mods::execute(mods_args, &ctx)),
        Commands::Backup => backup::execute(&ctx),
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            eprintln!("{} {}", console::style("Error:").red().bold(), e);
            for cause in e.chain().skip(1) {
                eprintln!("  Caused by: {}", cause);
            }
            ExitCode::FAILURE
        }
    }
}
