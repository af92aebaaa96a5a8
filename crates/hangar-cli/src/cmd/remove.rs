//! Remove command

use anyhow::{Result, bail};
use crossterm::style::Stylize;
use hangar_schema::{InstallRecord, ModId};

use crate::ops::{Context, remove_mods};
use crate::ui::confirm;

/// Remove installed mods by identifier or full id
pub async fn remove(ctx: &Context, mods: &[String], yes: bool) -> Result<()> {
    let installs = ctx.db.list_installs().await?;

    let mut ids = Vec::new();
    for reference in mods {
        let matched = match_installs(&installs, reference);
        if matched.is_empty() {
            ctx.reporter.warning(&format!("{reference} is not installed"));
        }
        for id in matched {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
    if ids.is_empty() {
        bail!("Nothing to remove");
    }

    println!();
    for id in &ids {
        println!("  {}", id.as_str().cyan());
    }
    if !yes && !confirm(&format!("Remove {} mods?", ids.len()), false)? {
        ctx.reporter.info("Removal cancelled");
        return Ok(());
    }

    ctx.reporter.section("Removing");
    let start_time = std::time::Instant::now();
    let report = remove_mods(&ctx.db, ctx.reporter.as_ref(), &ctx.settings.game.dir, &ids).await?;

    for file in &report.leftover {
        ctx.reporter.warning(&format!("Could not delete {file}"));
    }
    ctx.reporter.summary(
        report.removed.len(),
        "removed",
        start_time.elapsed().as_secs_f64(),
    );
    Ok(())
}

/// Install records named by `reference`: an exact id, or every installed
/// version of an identifier.
fn match_installs(installs: &[InstallRecord], reference: &str) -> Vec<ModId> {
    installs
        .iter()
        .filter(|r| {
            if ModId::looks_like_id(reference) {
                r.id.as_str() == reference
            } else {
                r.id.identifier() == reference
            }
        })
        .map(|r| r.id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn installed(id: &str) -> InstallRecord {
        InstallRecord {
            id: ModId::from_raw(id),
            files: Some(Vec::new()),
            installed_at: Some(0),
        }
    }

    #[test]
    fn test_match_installs() {
        let installs = vec![installed("A---1.0"), installed("A---2.0"), installed("B---1.0")];

        assert_eq!(match_installs(&installs, "A").len(), 2);
        assert_eq!(
            match_installs(&installs, "A---2.0"),
            vec![ModId::from_raw("A---2.0")]
        );
        assert!(match_installs(&installs, "C").is_empty());
    }
}
