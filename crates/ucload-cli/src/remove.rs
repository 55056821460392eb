//! Remove command - drop imports and delete the files they reference.

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use dialoguer::Confirm;

use ucload_pm::installer::prune_empty_dirs;
use ucload_pm::{ImportLedger, ModRegistry};

use crate::context::{zero_based, CliContext};

#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Import number as shown by `ucload list`
    #[arg(value_name = "N", required_unless_present = "all", conflicts_with = "all")]
    pub index: Option<usize>,

    /// Remove every import
    #[arg(long)]
    pub all: bool,

    /// Do not ask for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

pub async fn execute(args: RemoveArgs, ctx: &CliContext) -> Result<i32> {
    let ledger = ctx.ledger()?;
    let registry = ctx.registry().await?;
    let ask = ctx.interactive && !args.yes;

    let code = match args.index {
        Some(number) => remove_one(&ledger, &registry, number, ask).await?,
        None => remove_all(&ledger, &registry, ask).await?,
    };

    let pruned = prune_empty_dirs(ledger.chrome_dir())?;
    if pruned > 0 {
        log::info!("Pruned {} empty folder(s)", pruned);
    }
    Ok(code)
}

async fn remove_one(ledger: &ImportLedger, registry: &ModRegistry, number: usize, ask: bool) -> Result<i32> {
    let index = zero_based(number)?;
    let imports = ledger.list_imports().context("Failed to read userChrome.css")?;
    let Some(import) = imports.get(index) else {
        eprintln!(
            "{} No import number {} ({} imports)",
            style("Error:").red().bold(),
            number,
            imports.len()
        );
        return Ok(1);
    };

    if ask {
        let confirmed = Confirm::new()
            .with_prompt(format!("Remove {} and delete its files?", import.display_text()))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("{}", style("Command aborted").red());
            return Ok(1);
        }
    }

    let removed = ledger
        .remove_one(index)
        .context("Failed to update userChrome.css")?;
    if let Some(ref path) = removed.import.path {
        forget(registry, path).await?;
    }

    println!("  {} {}", style("-").red(), removed.import.display_text());
    if let Some(deleted) = removed.deleted {
        println!("  {} Deleted {}", style("✓").green(), deleted.display());
    }
    if let Some((path, reason)) = removed.failure {
        eprintln!(
            "  {} Could not delete {}: {}",
            style("!").yellow(),
            path.display(),
            reason
        );
        return Ok(1);
    }
    Ok(0)
}

async fn remove_all(ledger: &ImportLedger, registry: &ModRegistry, ask: bool) -> Result<i32> {
    let count = ledger.list_imports().context("Failed to read userChrome.css")?.len();
    if count == 0 {
        println!("{} Nothing to remove", style("Info:").cyan());
        return Ok(0);
    }

    if ask {
        let confirmed = Confirm::new()
            .with_prompt(format!("Remove all {} imports and delete their files?", count))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("{}", style("Command aborted").red());
            return Ok(1);
        }
    }

    let report = ledger.remove_all()?;
    for import in &report.removed {
        println!("  {} {}", style("-").red(), import.display_text());
        if let Some(ref path) = import.path {
            forget(registry, path).await?;
        }
    }
    for (path, reason) in &report.failures {
        eprintln!(
            "  {} Could not delete {}: {}",
            style("!").yellow(),
            path.display(),
            reason
        );
    }

    println!(
        "{} Removed {} import(s), deleted {} path(s)",
        style("Success:").green().bold(),
        report.removed.len(),
        report.deleted.len()
    );
    Ok(if report.is_clean() { 0 } else { 1 })
}

/// Drop the registry record that owns `import_path`, if any
async fn forget(registry: &ModRegistry, import_path: &str) -> Result<()> {
    if let Some(record) = registry.find_by_import_path(import_path).await {
        registry
            .remove(&record.url)
            .await
            .context("Failed to update mod registry")?;
        log::debug!("Unregistered {}", record.url);
    }
    Ok(())
}
