//! Status command

use anyhow::Result;
use crossterm::style::Stylize;

use crate::ops::Context;
use crate::ui::list::print_field;

/// Show settings, catalog size and install records
pub async fn status(ctx: &Context) -> Result<()> {
    let catalog_size = ctx.open_catalog()?.catalog_size()?;
    let installs = ctx.db.list_installs().await?;
    let (pending, committed): (Vec<_>, Vec<_>) = installs.iter().partition(|r| r.is_pending());

    println!();
    println!("  {} {}", "hangar".white().bold(), env!("CARGO_PKG_VERSION").dark_grey());
    println!();
    print_field("home", &ctx.home.display().to_string());
    print_field("game dir", &ctx.settings.game.dir.display().to_string());
    print_field("game version", &ctx.settings.game.version);
    print_field("repository", &ctx.settings.repository.url);
    print_field("catalog", &format!("{catalog_size} mod versions"));
    print_field("installed", &committed.len().to_string());

    if !ctx.settings.game.dir.exists() {
        println!();
        ctx.reporter.warning("Game directory does not exist yet");
    }
    if catalog_size == 0 {
        println!();
        ctx.reporter.info("Run 'hangar update' to fetch the catalog");
    }
    if !pending.is_empty() {
        println!();
        ctx.reporter
            .warning(&format!("{} interrupted installs:", pending.len()));
        for record in &pending {
            println!("    {}", record.id.as_str().yellow());
        }
        ctx.reporter
            .info("Run 'hangar remove <id>' to clear them before reinstalling");
    }
    println!();
    Ok(())
}
