//! List, enable, disable and toggle imports of the master stylesheet.

use anyhow::{Context, Result};
use clap::Args;
use console::style;

use ucload_pm::ImportLine;

use crate::context::{zero_based, CliContext};

#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Import number as shown by `ucload list`
    #[arg(value_name = "N")]
    pub index: usize,
}

pub fn list(ctx: &CliContext) -> Result<i32> {
    let ledger = ctx.ledger()?;
    let imports = ledger.list_imports().context("Failed to read userChrome.css")?;

    if imports.is_empty() {
        println!("{} No imports in {}", style("Info:").cyan(), ledger.master_path().display());
        return Ok(0);
    }

    for import in &imports {
        println!("{}", format_import(import));
    }
    Ok(0)
}

fn format_import(import: &ImportLine) -> String {
    let state = if import.enabled {
        style("enabled ").green()
    } else {
        style("disabled").dim()
    };
    format!("{:>3}. [{}] {}", import.index + 1, state, import.display_text())
}

/// Enable (`Some(true)`), disable (`Some(false)`) or flip (`None`) one import
pub fn set_state(args: IndexArgs, enable: Option<bool>, ctx: &CliContext) -> Result<i32> {
    let index = zero_based(args.index)?;
    let ledger = ctx.ledger()?;

    let enable = match enable {
        Some(enable) => enable,
        None => {
            let imports = ledger.list_imports().context("Failed to read userChrome.css")?;
            let current = imports
                .get(index)
                .ok_or_else(|| anyhow::anyhow!("No import number {} ({} imports)", args.index, imports.len()))?;
            !current.enabled
        }
    };

    let changed = ledger.toggle(index, enable)?;
    let verb = if enable { "Enabled" } else { "Disabled" };
    if changed {
        println!("{} {} import {}", style("Success:").green().bold(), verb, args.index);
    } else {
        println!(
            "{} Import {} is already {}",
            style("Info:").cyan(),
            args.index,
            verb.to_lowercase()
        );
    }
    Ok(0)
}
