//! Uninstall.

use std::io::ErrorKind;
use std::path::Path;

use hangar_core::Reporter;
use hangar_schema::ModId;
use tracing::{debug, info, warn};

use crate::ops::InstallError;
use crate::store::DbHandle;

/// Outcome of one removal batch.
#[derive(Debug, Default)]
pub struct RemoveReport {
    pub removed: Vec<ModId>,
    /// Ids with no install record.
    pub missing: Vec<ModId>,
    /// Files that could not be deleted.
    pub leftover: Vec<String>,
}

/// Delete the files of each installed mod, prune directories left empty
/// inside `game_dir`, then drop the install record.
///
/// A pending record is dropped without touching any file.
pub async fn remove_mods(
    db: &DbHandle,
    reporter: &dyn Reporter,
    game_dir: &Path,
    ids: &[ModId],
) -> Result<RemoveReport, InstallError> {
    let mut report = RemoveReport::default();

    for id in ids {
        let Some(record) = db.get_install(id.clone()).await? else {
            reporter.warning(&format!("{id} is not installed"));
            report.missing.push(id.clone());
            continue;
        };

        reporter.removing(id);
        for file in record.files.as_deref().unwrap_or_default() {
            let path = Path::new(file);
            match tokio::fs::remove_file(path).await {
                Ok(()) => prune_empty_parents(path, game_dir).await,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!(path = file, "Already gone");
                }
                Err(e) => {
                    warn!(path = file, error = %e, "Failed to remove file");
                    report.leftover.push(file.clone());
                }
            }
        }

        db.remove_install(id.clone()).await?;
        info!(mod_id = %id, pending = record.is_pending(), "Removed");
        reporter.done(id, "removed");
        report.removed.push(id.clone());
    }

    Ok(report)
}

/// Remove empty ancestors of `path` up to, not including, `stop`.
async fn prune_empty_parents(path: &Path, stop: &Path) {
    let mut dir = path.parent();
    while let Some(current) = dir {
        if current == stop || !current.starts_with(stop) {
            break;
        }
        // Fails on non-empty directories, which ends the walk.
        if tokio::fs::remove_dir(current).await.is_err() {
            break;
        }
        dir = current.parent();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hangar_core::NullReporter;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_remove_deletes_files_and_prunes() {
        let home = tempdir().unwrap();
        let game = tempdir().unwrap();
        let db = DbHandle::spawn(home.path()).unwrap();

        let kept = game.path().join("GameData/Shared/keep.cfg");
        let owned = game.path().join("GameData/Foo/Parts/part.cfg");
        for path in [&kept, &owned] {
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, "x").unwrap();
        }
        let id = ModId::from_raw("Foo---1.0");
        db.insert_pending(id.clone()).await.unwrap();
        db.commit_install(
            id.clone(),
            vec![
                owned.to_string_lossy().into_owned(),
                game.path().join("GameData/Foo/gone.cfg").to_string_lossy().into_owned(),
            ],
        )
        .await
        .unwrap();

        let report = remove_mods(&db, &NullReporter, game.path(), &[id.clone()])
            .await
            .unwrap();

        assert_eq!(report.removed, vec![id.clone()]);
        assert!(report.leftover.is_empty());
        assert!(!game.path().join("GameData/Foo").exists());
        assert!(kept.exists());
        assert!(game.path().exists());
        assert!(db.get_install(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove_unknown_and_pending() {
        let home = tempdir().unwrap();
        let game = tempdir().unwrap();
        let db = DbHandle::spawn(home.path()).unwrap();

        let pending = ModId::from_raw("Half---1.0");
        db.insert_pending(pending.clone()).await.unwrap();
        let unknown = ModId::from_raw("Ghost---1.0");

        let report = remove_mods(
            &db,
            &NullReporter,
            game.path(),
            &[pending.clone(), unknown.clone()],
        )
        .await
        .unwrap();

        assert_eq!(report.removed, vec![pending]);
        assert_eq!(report.missing, vec![unknown]);
    }
}
