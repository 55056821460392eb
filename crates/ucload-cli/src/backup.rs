use anyhow::{Context, Result};
use console::style;

use crate::context::CliContext;

pub fn execute(ctx: &CliContext) -> Result<i32> {
    let ledger = ctx.ledger()?;
    if !ledger.master_path().exists() {
        eprintln!(
            "{} {} does not exist",
            style("Error:").red().bold(),
            ledger.master_path().display()
        );
        return Ok(1);
    }

    let backup = ledger.backup().context("Failed to back up userChrome.css")?;
    println!("{} Backed up to {}", style("Success:").green().bold(), backup.display());
    Ok(0)
}
