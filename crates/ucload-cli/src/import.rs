//! Import command - install a stylesheet or mod folder from the local disk.

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use std::path::PathBuf;

use ucload_pm::ModInstaller;

use crate::context::{CliContext, PlacementArgs};
use crate::install::{offer_backup, print_import, resolve_options, ConflictArgs};

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// A .css file or a folder containing userChrome.css or mod.css
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    #[command(flatten)]
    pub placement: PlacementArgs,

    #[command(flatten)]
    pub conflicts: ConflictArgs,
}

pub async fn execute(args: ImportArgs, ctx: &CliContext) -> Result<i32> {
    if !args.path.exists() {
        eprintln!(
            "{} {} does not exist",
            style("Error:").red().bold(),
            args.path.display()
        );
        return Ok(1);
    }

    let installer = ModInstaller::new(ctx.chrome_dir()?);
    let plan = installer
        .plan_local(&args.path, args.placement.organization(ctx.config.organization))
        .with_context(|| format!("Cannot import {}", args.path.display()))?;

    let Some(options) = resolve_options(&plan, &args.conflicts, ctx.interactive)? else {
        println!("{}", style("Command aborted").red());
        return Ok(1);
    };

    let outcome = installer
        .execute(&plan, &options)
        .context("Failed to copy mod files")?;

    let ledger = ctx.ledger()?;
    offer_backup(&ledger, ctx.interactive)?;
    let added = ledger
        .add_import(&outcome.import_line)
        .context("Failed to update userChrome.css")?;
    print_import(&outcome, &added);

    println!(
        "{} Imported {} file(s) from {}",
        style("Success:").green().bold(),
        outcome.files.len(),
        args.path.display()
    );
    Ok(0)
}
