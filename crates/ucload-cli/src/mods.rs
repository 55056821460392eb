//! Mods command - show the registry of remotely installed mods.

use anyhow::Result;
use clap::Args;
use console::style;

use ucload_pm::ModRecord;

use crate::context::CliContext;

#[derive(Args, Debug)]
pub struct ModsArgs {
    /// Print the records as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: ModsArgs, ctx: &CliContext) -> Result<i32> {
    let registry = ctx.registry().await?;
    let records = registry.list().await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(0);
    }

    if records.is_empty() {
        println!("{} No registered mods", style("Info:").cyan());
        return Ok(0);
    }

    for record in &records {
        print_record(record);
    }
    Ok(0)
}

fn print_record(record: &ModRecord) {
    println!(
        "{} {}",
        style(&record.url).white().bold(),
        style(format!("[{}]", record.source_type.as_str())).dim()
    );
    println!("    path     {}", record.install_path.display());
    if let Some(ref import) = record.import_path {
        println!("    import   {}", import);
    }
    if let Some(ref version) = record.version {
        println!("    version  {}", version);
    }
    println!("    fetched  {}", record.last_checked.format("%Y-%m-%d %H:%M UTC"));
}
