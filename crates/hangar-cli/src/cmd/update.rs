//! Update command

use anyhow::{Context as _, Result};
use hangar_core::CatalogStore;
use hangar_core::io::HttpDownloader;
use hangar_core::repo::fetch_repository;

use crate::ops::Context;

/// Refresh the catalog from the repository bundle
pub async fn update(ctx: &Context, url: Option<&str>) -> Result<()> {
    let url = url.unwrap_or(&ctx.settings.repository.url);
    ctx.reporter.section("Refreshing repository");

    let downloader = HttpDownloader::with_default_client()?;
    let bundle = fetch_repository(&downloader, url, &ctx.reporter)
        .await
        .with_context(|| format!("Failed to refresh repository from {url}"))?;

    let count = bundle.records.len();
    let catalog = ctx.open_catalog()?;
    catalog
        .replace_all(bundle.records)
        .context("Failed to store catalog")?;

    ctx.reporter.success(&format!(
        "Catalog updated: {count} mods ({} entries skipped)",
        bundle.rejected
    ));
    Ok(())
}
