//! Update command - reinstall registered mods whose source has changed.

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use dialoguer::Confirm;

use ucload_pm::{
    DownloadManager, ExistingFiles, ImportLedger, InstallOptions, ModInstaller, ModRecord, ModRegistry,
    Organization, UpdateCheck,
};

use crate::context::CliContext;
use crate::install::{fetch, print_import, record_for, register};
use crate::outdated::format_report;
use crate::progress;

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Mods to update, by source URL (all registered mods if omitted)
    #[arg(value_name = "URLS")]
    pub urls: Vec<String>,

    /// Do not ask for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

pub async fn execute(args: UpdateArgs, ctx: &CliContext) -> Result<i32> {
    let registry = ctx.registry().await?;
    let records = select_records(registry.list().await, &args.urls);
    if records.is_empty() {
        println!("{} No registered mods to update", style("Info:").cyan());
        return Ok(if args.urls.is_empty() { 0 } else { 1 });
    }

    let manager = ctx.download_manager()?;
    let spinner = progress::spinner(&format!("Checking {} mod(s)...", records.len()));
    let reports = manager.check_updates(records).await;
    spinner.finish_and_clear();

    let mut pending = Vec::new();
    for report in reports {
        if report.result.is_err() {
            println!("{}", format_report(&report));
        } else if report.has_update() {
            if let Ok(check) = report.result {
                pending.push((report.record, check));
            }
        }
    }

    if pending.is_empty() {
        println!("{} All mods are up to date", style("Success:").green().bold());
        return Ok(0);
    }

    println!("{} Updates available:", style("ucload").green().bold());
    for (record, check) in &pending {
        let version = check.remote.version.as_deref().unwrap_or("latest");
        println!("  {} {} ({})", style("↑").yellow().bold(), record.url, version);
    }

    if ctx.interactive && !args.yes {
        let confirmed = Confirm::new()
            .with_prompt(format!("Update {} mod(s)?", pending.len()))
            .default(true)
            .interact()?;
        if !confirmed {
            println!("{}", style("Command aborted").red());
            return Ok(1);
        }
    }

    let ledger = ctx.ledger()?;
    let installer = ModInstaller::new(ctx.chrome_dir()?);
    let mut failed = 0;

    for (record, check) in pending {
        match apply_update(&manager, &installer, &ledger, &registry, &record, check).await {
            Ok(()) => {}
            Err(e) => {
                failed += 1;
                eprintln!("  {} {}: {:#}", style("✗").red(), record.url, e);
            }
        }
    }

    if failed > 0 {
        println!("{} {} update(s) failed", style("Warning:").yellow().bold(), failed);
        return Ok(1);
    }
    println!("{} All updates applied", style("Success:").green().bold());
    Ok(0)
}

/// Keep the records named by `urls`, or all of them when none are given
fn select_records(records: Vec<ModRecord>, urls: &[String]) -> Vec<ModRecord> {
    if urls.is_empty() {
        return records;
    }
    for url in urls {
        if !records.iter().any(|r| r.url == url.trim()) {
            log::warn!("{} is not a registered mod", url);
        }
    }
    records
        .into_iter()
        .filter(|r| urls.iter().any(|u| u.trim() == r.url))
        .collect()
}

/// A mod keeps the placement it was first installed with
fn organization_of(record: &ModRecord) -> Organization {
    if record.install_path.is_dir() {
        Organization::Subfolder
    } else {
        Organization::Flat
    }
}

async fn apply_update(
    manager: &DownloadManager,
    installer: &ModInstaller,
    ledger: &ImportLedger,
    registry: &ModRegistry,
    record: &ModRecord,
    check: UpdateCheck,
) -> Result<()> {
    let result = fetch(manager, &record.url).await?;
    let plan = installer.plan(&result, organization_of(record))?;
    let options = InstallOptions::default()
        .with_organization(plan.organization)
        .with_replace_entry(true)
        .with_existing_files(ExistingFiles::ReplaceAll);
    let outcome = installer
        .execute(&plan, &options)
        .context("Failed to copy mod files")?;

    let old_path = record.import_path.as_deref().unwrap_or(&outcome.import_path);
    let added = ledger
        .replace_import(old_path, &outcome.import_line)
        .context("Failed to update userChrome.css")?;
    print_import(&outcome, &added);

    let mut updated = record_for(&record.url, &result, &outcome);
    if check.remote.version.is_some() {
        updated.version = check.remote.version;
    }
    if updated.etag.is_none() {
        updated.etag = check.remote.etag;
    }
    register(registry, updated, installer.chrome_dir()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use ucload_pm::source::SourceType;

    #[test]
    fn test_select_records_filters_by_url() {
        let records = vec![
            ModRecord::new("https://github.com/acme/a", "/chrome/a", SourceType::Github),
            ModRecord::new("https://github.com/acme/b", "/chrome/b", SourceType::Github),
        ];
        assert_eq!(select_records(records.clone(), &[]).len(), 2);

        let picked = select_records(records, &[" https://github.com/acme/b ".to_string()]);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].url, "https://github.com/acme/b");
    }

    #[test]
    fn test_organization_follows_install_path() {
        let chrome = TempDir::new().unwrap();
        let folder = ModRecord::new("https://github.com/acme/a", chrome.path(), SourceType::Github);
        assert_eq!(organization_of(&folder), Organization::Subfolder);

        let file = ModRecord::new(
            "https://example.com/mod.css",
            chrome.path().join("mod.css"),
            SourceType::Direct,
        );
        assert_eq!(organization_of(&file), Organization::Flat);
    }
}
