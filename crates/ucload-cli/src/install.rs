//! Install command - download a mod and import it into userChrome.css.

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use dialoguer::{Confirm, Select};
use std::path::Path;

use ucload_pm::downloader::{SkipReason, SkippedEntry};
use ucload_pm::installer::InstallPlan;
use ucload_pm::{
    AcquisitionResult, AddOutcome, DownloadManager, ExistingFiles, ImportLedger, InstallOptions,
    InstallOutcome, ModInstaller, ModRecord, ModRegistry,
};

use crate::context::{CliContext, PlacementArgs};
use crate::progress;

/// How to treat files that already exist at the destination
#[derive(Args, Debug, Clone, Default)]
pub struct ConflictArgs {
    /// Replace existing files without asking
    #[arg(long, conflicts_with = "skip_existing")]
    pub replace: bool,

    /// Keep existing files and copy only new ones
    #[arg(long)]
    pub skip_existing: bool,
}

#[derive(Args, Debug)]
pub struct InstallArgs {
    /// GitHub, GitLab or direct URL of the mod
    #[arg(value_name = "URL")]
    pub url: String,

    #[command(flatten)]
    pub placement: PlacementArgs,

    #[command(flatten)]
    pub conflicts: ConflictArgs,
}

pub async fn execute(args: InstallArgs, ctx: &CliContext) -> Result<i32> {
    let chrome_dir = ctx.chrome_dir()?;
    let manager = ctx.download_manager()?;
    let url = args.url.trim();

    println!("{} Installing {}", style("ucload").green().bold(), style(url).white().bold());

    let result = fetch(&manager, url).await?;
    let installer = ModInstaller::new(&chrome_dir);
    let plan = installer.plan(&result, args.placement.organization(ctx.config.organization))?;

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

    let registry = ctx.registry().await?;
    register(&registry, record_for(url, &result, &outcome), &chrome_dir).await?;

    println!(
        "{} Installed {} file(s) to {}",
        style("Success:").green().bold(),
        outcome.files.len(),
        outcome.install_path.display()
    );
    Ok(0)
}

/// Download and validate `url` behind a progress bar
pub async fn fetch(manager: &DownloadManager, url: &str) -> Result<AcquisitionResult> {
    let bar = progress::download_bar();
    let result = manager
        .acquire_with_progress(url, Some(progress::tracker(&bar)))
        .await;
    bar.finish_and_clear();

    let result = result.with_context(|| format!("Failed to fetch {}", url))?;
    report_skipped(&result.skipped);
    Ok(result)
}

fn report_skipped(skipped: &[SkippedEntry]) {
    let mut ignored = 0;
    for entry in skipped {
        match &entry.reason {
            SkipReason::DisallowedExtension => ignored += 1,
            SkipReason::UnsafePath => println!(
                "  {} Skipped unsafe archive entry {}",
                style("!").yellow(),
                entry.name
            ),
            SkipReason::Failed(reason) => println!(
                "  {} Could not extract {}: {}",
                style("!").yellow(),
                entry.name,
                reason
            ),
        }
    }
    if ignored > 0 {
        log::info!("Ignored {} file(s) that are not stylesheets or assets", ignored);
    }
}

/// Turn the plan's conflicts into install options, asking the user when allowed.
///
/// Returns `None` when the user cancels.
pub fn resolve_options(
    plan: &InstallPlan,
    conflicts: &ConflictArgs,
    interactive: bool,
) -> Result<Option<InstallOptions>> {
    let mut options = InstallOptions::default().with_organization(plan.organization);
    if conflicts.skip_existing {
        options = options.with_existing_files(ExistingFiles::Skip);
    }
    if !plan.has_conflicts() || !interactive || conflicts.replace {
        return Ok(Some(options));
    }

    if plan.entry_conflict {
        let replace = Confirm::new()
            .with_prompt(format!(
                "{} already exists in {}. Replace it?",
                plan.entry_name,
                plan.destination.display()
            ))
            .default(true)
            .interact()?;
        options = options.with_replace_entry(replace);
    }

    if !plan.conflicts.is_empty() && !conflicts.skip_existing {
        println!(
            "{} {} file(s) already exist in {}:",
            style("Warning:").yellow().bold(),
            plan.conflicts.len(),
            plan.destination.display()
        );
        for name in plan.conflicts.iter().take(10) {
            println!("  {} {}", style("!").yellow(), name);
        }
        if plan.conflicts.len() > 10 {
            println!("  ... and {} more", plan.conflicts.len() - 10);
        }

        let choice = Select::new()
            .with_prompt("What should happen to them?")
            .items(&["Replace all", "Skip existing", "Cancel"])
            .default(0)
            .interact()?;
        options = match choice {
            0 => options.with_existing_files(ExistingFiles::ReplaceAll),
            1 => options.with_existing_files(ExistingFiles::Skip),
            _ => return Ok(None),
        };
    }

    Ok(Some(options))
}

/// Offer a backup before the first write to a stylesheet that holds hand-written rules
pub fn offer_backup(ledger: &ImportLedger, interactive: bool) -> Result<()> {
    if !interactive || !ledger.has_foreign_content()? {
        return Ok(());
    }
    let backup = Confirm::new()
        .with_prompt("userChrome.css contains your own rules. Back it up first?")
        .default(true)
        .interact()?;
    if backup {
        let path = ledger.backup().context("Failed to back up userChrome.css")?;
        println!("  {} Backed up to {}", style("✓").green(), path.display());
    }
    Ok(())
}

pub fn print_import(outcome: &InstallOutcome, added: &AddOutcome) {
    match added {
        AddOutcome::Added { .. } => {
            println!("  {} {}", style("+").green(), outcome.import_line)
        }
        AddOutcome::Replaced { .. } => {
            println!("  {} {}", style("~").cyan(), outcome.import_line)
        }
        AddOutcome::AlreadyPresent { .. } => println!(
            "  {} {} is already imported",
            style("=").dim(),
            outcome.import_path
        ),
    }
}

/// Save `record` once its install path is confirmed to lie inside `chrome_dir`
pub async fn register(registry: &ModRegistry, record: ModRecord, chrome_dir: &Path) -> Result<()> {
    record
        .validate_under(chrome_dir)
        .context("Refusing to register mod")?;
    registry.save(record).await.context("Failed to update mod registry")
}

pub fn record_for(url: &str, result: &AcquisitionResult, outcome: &InstallOutcome) -> ModRecord {
    ModRecord::new(url, outcome.install_path.clone(), result.source.source_type)
        .with_version(result.source.metadata.get("branch").cloned())
        .with_etag(result.etag.clone())
        .with_import_path(outcome.import_path.clone())
        .with_metadata(result.source.metadata.clone())
}
