//! List command

use std::collections::HashSet;

use anyhow::{Context as _, Result};
use hangar_core::compat::compatible_only;
use hangar_core::{CatalogStore, ModFilter, latest_per_identifier};
use hangar_schema::ModId;

use crate::ops::Context;
use crate::ui::list::{print_install_row, print_list_footer, print_list_header, print_mod_row};

/// List the catalog, or install records with `installed`
pub async fn list(ctx: &Context, all: bool, installed: bool) -> Result<()> {
    if installed {
        return list_installed(ctx).await;
    }

    let catalog = ctx.open_catalog()?;
    let records = catalog.find(&ModFilter::All).context("Failed to read catalog")?;
    if records.is_empty() {
        ctx.reporter
            .info("The catalog is empty. Run 'hangar update' first.");
        return Ok(());
    }

    let target = &ctx.settings.game.version;
    let (title, shown) = if all {
        ("All mod versions".to_string(), records)
    } else {
        (
            format!("Mods compatible with KSP {target}"),
            latest_per_identifier(compatible_only(records, target)),
        )
    };

    let installed_ids: HashSet<ModId> = ctx
        .db
        .list_installs()
        .await?
        .into_iter()
        .filter(|r| !r.is_pending())
        .map(|r| r.id)
        .collect();

    print_list_header(&title);
    for record in &shown {
        print_mod_row(
            record.display_name(),
            &record.version,
            record.summary.as_deref().unwrap_or_default(),
            installed_ids.contains(&record.id()),
        );
    }
    print_list_footer(shown.len(), "mods");
    Ok(())
}

async fn list_installed(ctx: &Context) -> Result<()> {
    let installs = ctx.db.list_installs().await?;
    if installs.is_empty() {
        ctx.reporter.info("No mods installed");
        return Ok(());
    }

    print_list_header(&format!("Installed in {}", ctx.settings.game.dir.display()));
    for install in &installs {
        let date = install
            .installed_at
            .and_then(|t| chrono::DateTime::from_timestamp(t, 0))
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        print_install_row(install.id.as_str(), install.files.as_ref().map(Vec::len), &date);
    }
    print_list_footer(installs.len(), "installs");
    Ok(())
}
