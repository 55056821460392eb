//! Outdated command - check every registered mod for a newer remote version.

use anyhow::Result;
use console::style;

use ucload_pm::{ErrorKind, UpdateReport};

use crate::context::CliContext;
use crate::progress;

pub async fn execute(ctx: &CliContext) -> Result<i32> {
    let registry = ctx.registry().await?;
    let records = registry.list().await;
    if records.is_empty() {
        println!("{} No registered mods", style("Info:").cyan());
        return Ok(0);
    }

    let manager = ctx.download_manager()?;
    let spinner = progress::spinner(&format!("Checking {} mod(s)...", records.len()));
    let reports = manager.check_updates(records).await;
    spinner.finish_and_clear();

    let mut outdated = 0;
    for report in &reports {
        println!("{}", format_report(report));
        if report.has_update() {
            outdated += 1;
        }
    }

    println!();
    if outdated == 0 {
        println!("{} All mods are up to date", style("Success:").green().bold());
    } else {
        println!(
            "{} {} mod(s) can be updated with `ucload update`",
            style("Info:").cyan(),
            outdated
        );
    }
    Ok(0)
}

pub fn format_report(report: &UpdateReport) -> String {
    let url = &report.record.url;
    match &report.result {
        Ok(check) if check.has_update => {
            let version = check
                .remote
                .version
                .as_deref()
                .map(|v| format!(" ({})", v))
                .unwrap_or_default();
            format!("  {} {}{}", style("↑").yellow().bold(), url, version)
        }
        Ok(_) => format!("  {} {}", style("✓").green(), url),
        Err(e) if e.kind() == ErrorKind::UnsupportedUrl => {
            format!("  {} {} (unsupported source)", style("?").dim(), url)
        }
        Err(e) => format!("  {} {}: {}", style("✗").red(), url, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ucload_pm::source::{RemoteMeta, SourceType};
    use ucload_pm::{ModError, ModRecord, UpdateCheck};

    fn record() -> ModRecord {
        ModRecord::new("https://github.com/acme/theme", "/chrome/theme", SourceType::Github)
    }

    #[test]
    fn test_format_update_shows_version() {
        let report = UpdateReport {
            record: record(),
            result: Ok(UpdateCheck {
                has_update: true,
                remote: RemoteMeta {
                    version: Some("main".to_string()),
                    ..RemoteMeta::default()
                },
            }),
        };
        let line = console::strip_ansi_codes(&format_report(&report)).into_owned();
        assert!(line.ends_with("https://github.com/acme/theme (main)"));
    }

    #[test]
    fn test_format_error() {
        let report = UpdateReport {
            record: record(),
            result: Err(ModError::Http {
                code: 500,
                url: "https://api.github.com/repos/acme/theme".to_string(),
            }),
        };
        let line = console::strip_ansi_codes(&format_report(&report)).into_owned();
        assert!(line.contains("HTTP 500"));
    }
}
