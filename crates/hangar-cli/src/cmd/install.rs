//! Install command

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context as _, Result, bail};
use crossterm::style::Stylize;
use hangar_core::io::HttpDownloader;
use hangar_core::{DependencyNode, DependencyResolution, Flattened, ModFilter, Selections};
use hangar_schema::ModId;

use crate::ops::{Context, FailurePolicy, InstallExecutor, ResolverHandle};
use crate::ui::confirm;

/// Resolve `reference`, settle every ambiguous dependency, then install the
/// whole queue.
pub async fn install(
    ctx: &Context,
    reference: &str,
    choose: &[String],
    yes: bool,
    clean_on_failure: bool,
) -> Result<()> {
    let catalog = ctx.open_catalog()?;
    if catalog.catalog_size()? == 0 {
        bail!("The catalog is empty. Run 'hangar update' first.");
    }

    let target = ctx.settings.game.version.clone();
    ctx.reporter
        .section(&format!("Resolving {reference} for KSP {target}"));

    let resolver = ResolverHandle::spawn(ctx.open_catalog()?);
    let resolution = resolver
        .resolve(
            ModFilter::parse(reference),
            &target,
            ctx.settings.resolve_timeout(),
        )
        .await;
    resolver.shutdown();
    let resolution = resolution.with_context(|| format!("Failed to resolve '{reference}'"))?;

    let selections = parse_choices(choose)?;
    let flattened = settle(&resolution, selections, yes)?;
    show_optional(ctx, &resolution);

    ctx.reporter.section("Install queue");
    for id in &flattened.install_queue {
        println!("  {}", id.as_str().cyan());
    }
    if !yes && !confirm(&format!("Install {} mods?", flattened.install_queue.len()), true)? {
        ctx.reporter.info("Installation cancelled");
        return Ok(());
    }

    let downloader = HttpDownloader::with_default_client()?;
    let mut executor = InstallExecutor::from_context(ctx, Arc::new(downloader));
    if clean_on_failure {
        executor = executor.with_policy(FailurePolicy::RemoveCopiedFiles);
    }

    ctx.reporter.section("Installing");
    let report = executor
        .install_mods(&catalog, &flattened.install_queue)
        .await;

    if !report.skipped.is_empty() {
        ctx.reporter
            .info(&format!("{} already installed", report.skipped.len()));
    }
    if !report.is_success() {
        for failure in &report.failed {
            ctx.reporter.error(&format!(
                "{} failed while {}: {}",
                failure.id, failure.phase, failure.error
            ));
        }
        bail!("{} of {} mods failed to install", report.failed.len(), flattened.install_queue.len());
    }
    Ok(())
}

/// Parse `NAME=identifier---version` pairs.
fn parse_choices(choose: &[String]) -> Result<Selections> {
    let mut selections = Selections::new();
    for pair in choose {
        let Some((name, id)) = pair.split_once('=') else {
            bail!("Invalid --choose '{pair}': expected NAME=identifier---version");
        };
        if !ModId::looks_like_id(id) {
            bail!("Invalid --choose '{pair}': '{id}' is not an identifier---version id");
        }
        selections.insert(name.trim().to_string(), ModId::from_raw(id.trim()));
    }
    Ok(selections)
}

/// Flatten until no choice is left, asking the operator for each ambiguous
/// node. With `yes` an ambiguous node is an error.
fn settle(resolution: &DependencyResolution, mut selections: Selections, yes: bool) -> Result<Flattened> {
    loop {
        let flattened = resolution.flatten(&selections);
        if !flattened.unresolved.is_empty() {
            bail!(
                "No compatible mod provides: {}",
                flattened.unresolved.join(", ")
            );
        }

        let Some(node) = flattened.choices.first() else {
            return Ok(flattened);
        };
        if yes {
            bail!(
                "'{}' can be satisfied by several mods; pass --choose {}=<id> with one of: {}",
                node.name,
                node.name,
                node.choices
                    .iter()
                    .map(|c| c.id.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        let picked = prompt_choice(node)?;
        selections = flattened.selected;
        selections.insert(node.name.clone(), picked);
    }
}

fn prompt_choice(node: &DependencyNode) -> Result<ModId> {
    println!();
    println!("  {} is provided by several mods:", node.name.as_str().bold());
    for (i, choice) in node.choices.iter().enumerate() {
        println!("    {}) {}", i + 1, choice.label);
    }

    loop {
        print!("  Choose 1-{}: ", node.choices.len());
        io::stdout().flush()?;
        let mut input = String::new();
        if io::stdin().lock().read_line(&mut input)? == 0 {
            bail!("No choice made for '{}'", node.name);
        }
        if let Some(choice) = pick(node, &input) {
            return Ok(choice);
        }
    }
}

fn pick(node: &DependencyNode, input: &str) -> Option<ModId> {
    let index: usize = input.trim().parse().ok()?;
    node.choices
        .get(index.checked_sub(1)?)
        .map(|choice| choice.id.clone())
}

fn show_optional(ctx: &Context, resolution: &DependencyResolution) {
    for (kind, nodes) in [
        ("Recommended", &resolution.recommendations),
        ("Suggested", &resolution.suggestions),
    ] {
        for node in nodes {
            let options: Vec<&str> = node.choices.iter().map(|c| c.label.as_str()).collect();
            ctx.reporter
                .info(&format!("{kind}: {} ({})", node.name, options.join(", ")));
        }
    }
}
