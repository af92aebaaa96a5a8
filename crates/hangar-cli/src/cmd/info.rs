//! Info command

use anyhow::{Context as _, Result, bail};
use crossterm::style::Stylize;
use hangar_core::{CatalogStore, ModFilter, is_compatible, latest_per_identifier};
use hangar_schema::{ModRecord, Relationship};

use crate::ops::Context;
use crate::ui::format_size;
use crate::ui::list::print_field;

/// Show a mod's details, compatibility and relationships
pub async fn info(ctx: &Context, reference: &str) -> Result<()> {
    let catalog = ctx.open_catalog()?;
    let filter = ModFilter::parse(reference);
    let versions = catalog.find(&filter).context("Failed to read catalog")?;

    let Some(record) = latest_per_identifier(versions.clone()).into_iter().next() else {
        bail!("Mod '{reference}' not found. Run 'hangar update' to refresh the catalog.");
    };

    let target = &ctx.settings.game.version;
    println!();
    println!(
        "  {} {}",
        record.display_name().white().bold(),
        record.version.as_str().dark_grey()
    );
    if let Some(summary) = &record.summary {
        println!("  {summary}");
    }
    println!();

    print_field("id", record.id().as_str());
    if !record.author.is_empty() {
        print_field("author", &record.author.join(", "));
    }
    if !record.license.is_empty() {
        print_field("license", &record.license.join(", "));
    }
    print_field("ksp", &compatibility_range(&record));
    let verdict = if is_compatible(&record, target) {
        format!("yes (KSP {target})").green().to_string()
    } else {
        format!("no (KSP {target})").red().to_string()
    };
    print_field("compatible", &verdict);
    if record.is_metapackage() {
        print_field("kind", "metapackage");
    }

    print_relationships("depends", &record.depends);
    print_relationships("recommends", &record.recommends);
    print_relationships("suggests", &record.suggests);
    print_relationships("provides", &record.provides);

    if let Some(size) = record.download_size {
        print_field("download", &format_size(size));
    }
    for (name, value) in &record.resources {
        if let Some(link) = value.as_str() {
            print_field(name, link);
        }
    }

    let mut others: Vec<&str> = versions
        .iter()
        .filter(|v| v.version != record.version)
        .map(|v| v.version.as_str())
        .collect();
    others.dedup();
    if !others.is_empty() {
        print_field("versions", &others.join(", "));
    }

    if let Some(install) = ctx.db.get_install(record.id()).await? {
        let state = match &install.files {
            Some(files) => format!("installed ({} files)", files.len()),
            None => "interrupted install".to_string(),
        };
        print_field("status", &state);
    }
    println!();
    Ok(())
}

fn compatibility_range(record: &ModRecord) -> String {
    if let Some(exact) = &record.ksp_version {
        return exact.clone();
    }
    match (&record.ksp_version_min, &record.ksp_version_max) {
        (None, None) => "any".to_string(),
        (min, max) => format!(
            "{} - {}",
            min.as_deref().unwrap_or("any"),
            max.as_deref().unwrap_or("any")
        ),
    }
}

fn print_relationships(label: &str, relationships: &[Relationship]) {
    if relationships.is_empty() {
        return;
    }
    let names: Vec<&str> = relationships.iter().map(|r| r.name.as_str()).collect();
    print_field(label, &names.join(", "));
}
