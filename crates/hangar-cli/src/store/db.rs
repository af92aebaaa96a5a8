//! SQLite state database
//!
//! Holds the mod catalog and the install records.

use std::path::Path;

use hangar_core::{CatalogError, CatalogStore, ModFilter, db_path};
use hangar_schema::{InstallRecord, ModId, ModRecord};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Stored record is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Install record already exists: {0}")]
    AlreadyRecorded(String),

    #[error("No install record for {0}")]
    NotRecorded(String),

    #[error("Database actor stopped")]
    ActorDied,
}

impl From<DbError> for CatalogError {
    fn from(e: DbError) -> Self {
        Self::Backend(e.to_string())
    }
}

const STATE_PENDING: &str = "pending";
const STATE_COMMITTED: &str = "committed";

/// State database for the catalog and installs
pub struct StateDb {
    conn: Connection,
}

impl std::fmt::Debug for StateDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateDb").finish_non_exhaustive()
    }
}

impl StateDb {
    /// Open or create the state database under `home`
    pub fn open(home: &Path) -> Result<Self, DbError> {
        std::fs::create_dir_all(home).ok();
        Self::open_at(&db_path(home))
    }

    /// Open database at a specific path (for testing)
    pub fn open_at(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")?;

        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS mods (
                id TEXT PRIMARY KEY,
                identifier TEXT NOT NULL,
                name TEXT NOT NULL,
                record TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_mods_identifier ON mods(identifier);

            CREATE TABLE IF NOT EXISTS mod_provides (
                name TEXT NOT NULL,
                mod_id TEXT NOT NULL REFERENCES mods(id) ON DELETE CASCADE,
                PRIMARY KEY (name, mod_id)
            );

            CREATE TABLE IF NOT EXISTS installs (
                id TEXT PRIMARY KEY,
                state TEXT NOT NULL,
                installed_at INTEGER
            );

            CREATE TABLE IF NOT EXISTS install_files (
                install_id TEXT NOT NULL REFERENCES installs(id) ON DELETE CASCADE,
                path TEXT NOT NULL,
                PRIMARY KEY (install_id, path)
            );
            ",
        )?;
        Ok(())
    }

    // --- Catalog ---

    /// Number of records in the catalog.
    pub fn catalog_size(&self) -> Result<usize, DbError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM mods", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    fn query_records(
        &self,
        sql: &str,
        param: Option<&str>,
    ) -> Result<Vec<ModRecord>, DbError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = match param {
            Some(p) => stmt
                .query_map(params![p], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?,
            None => stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?,
        };

        rows.iter()
            .map(|json| serde_json::from_str(json).map_err(DbError::from))
            .collect()
    }

    fn find_records(&self, filter: &ModFilter) -> Result<Vec<ModRecord>, DbError> {
        match filter {
            ModFilter::All => {
                self.query_records("SELECT record FROM mods ORDER BY name, rowid", None)
            }
            ModFilter::Id(id) => self.query_records(
                "SELECT record FROM mods WHERE id = ?1",
                Some(id.as_str()),
            ),
            ModFilter::Identifier(identifier) => self.query_records(
                "SELECT record FROM mods WHERE identifier = ?1 ORDER BY rowid",
                Some(identifier),
            ),
            ModFilter::Provides(name) => self.query_records(
                "SELECT m.record FROM mods m
                 JOIN mod_provides p ON p.mod_id = m.id
                 WHERE p.name = ?1 ORDER BY m.rowid",
                Some(name),
            ),
        }
    }

    /// Replace the whole catalog in one transaction. The first record wins
    /// when two share an id.
    pub fn replace_catalog(&self, records: &[ModRecord]) -> Result<usize, DbError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM mod_provides", [])?;
        tx.execute("DELETE FROM mods", [])?;

        let mut stored = 0;
        {
            let mut insert_mod = tx.prepare(
                "INSERT OR IGNORE INTO mods (id, identifier, name, record) VALUES (?1, ?2, ?3, ?4)",
            )?;
            let mut insert_provides =
                tx.prepare("INSERT OR IGNORE INTO mod_provides (name, mod_id) VALUES (?1, ?2)")?;

            for record in records {
                let id = record.id();
                let json = serde_json::to_string(record)?;
                let inserted = insert_mod.execute(params![
                    id.as_str(),
                    record.identifier,
                    record.display_name(),
                    json
                ])?;
                if inserted == 0 {
                    continue;
                }
                stored += 1;
                for provided in &record.provides {
                    insert_provides.execute(params![provided.name, id.as_str()])?;
                }
            }
        }

        tx.commit()?;
        Ok(stored)
    }

    // --- Installs ---

    /// Record that `id` is being installed.
    ///
    /// Fails with [`DbError::AlreadyRecorded`] if any record exists for `id`.
    pub fn insert_pending(&self, id: &ModId) -> Result<(), DbError> {
        let result = self.conn.execute(
            "INSERT INTO installs (id, state, installed_at) VALUES (?1, ?2, NULL)",
            params![id.as_str(), STATE_PENDING],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(DbError::AlreadyRecorded(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Turn the pending record for `id` into a committed one listing `files`.
    pub fn commit_install(&self, id: &ModId, files: &[String]) -> Result<(), DbError> {
        let now = chrono::Utc::now().timestamp();
        let tx = self.conn.unchecked_transaction()?;

        let updated = tx.execute(
            "UPDATE installs SET state = ?2, installed_at = ?3 WHERE id = ?1",
            params![id.as_str(), STATE_COMMITTED, now],
        )?;
        if updated == 0 {
            return Err(DbError::NotRecorded(id.to_string()));
        }

        tx.execute(
            "DELETE FROM install_files WHERE install_id = ?1",
            params![id.as_str()],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO install_files (install_id, path) VALUES (?1, ?2)",
            )?;
            for file in files {
                stmt.execute(params![id.as_str(), file])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Delete the record for `id`, returning it as it was.
    pub fn remove_install(&self, id: &ModId) -> Result<Option<InstallRecord>, DbError> {
        let Some(record) = self.get_install(id)? else {
            return Ok(None);
        };

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM install_files WHERE install_id = ?1",
            params![id.as_str()],
        )?;
        tx.execute("DELETE FROM installs WHERE id = ?1", params![id.as_str()])?;
        tx.commit()?;

        Ok(Some(record))
    }

    /// Get the install record for `id`
    pub fn get_install(&self, id: &ModId) -> Result<Option<InstallRecord>, DbError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, state, installed_at FROM installs WHERE id = ?1",
                params![id.as_str()],
                install_row,
            )
            .optional()?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row)?)),
            None => Ok(None),
        }
    }

    /// List every install record, pending ones included
    pub fn list_installs(&self) -> Result<Vec<InstallRecord>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, state, installed_at FROM installs ORDER BY id")?;
        let rows = stmt
            .query_map([], install_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(|row| self.hydrate(row)).collect()
    }

    fn install_files(&self, id: &str) -> Result<Vec<String>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT path FROM install_files WHERE install_id = ?1 ORDER BY rowid")?;
        let files = stmt.query_map(params![id], |row| row.get(0))?;
        files.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    fn hydrate(&self, row: InstallRow) -> Result<InstallRecord, DbError> {
        let files = if row.state == STATE_COMMITTED {
            Some(self.install_files(&row.id)?)
        } else {
            None
        };
        Ok(InstallRecord {
            id: ModId::from_raw(row.id),
            files,
            installed_at: row.installed_at,
        })
    }
}

struct InstallRow {
    id: String,
    state: String,
    installed_at: Option<i64>,
}

fn install_row(row: &Row<'_>) -> rusqlite::Result<InstallRow> {
    Ok(InstallRow {
        id: row.get(0)?,
        state: row.get(1)?,
        installed_at: row.get(2)?,
    })
}

impl CatalogStore for StateDb {
    fn find(&self, filter: &ModFilter) -> Result<Vec<ModRecord>, CatalogError> {
        self.find_records(filter).map_err(|e| match e {
            DbError::Json(e) => CatalogError::Corrupt {
                id: filter.to_string(),
                reason: e.to_string(),
            },
            other => other.into(),
        })
    }

    fn replace_all(&self, records: Vec<ModRecord>) -> Result<(), CatalogError> {
        self.replace_catalog(&records)?;
        Ok(())
    }
}
