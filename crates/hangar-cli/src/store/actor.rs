//! Install-record actor.
//!
//! A SQLite connection is not `Sync`, so the install executor's concurrent
//! tasks reach the install records through one connection hosted on a
//! dedicated thread. Each request carries a oneshot for its answer.

use std::fmt;
use std::path::Path;
use std::sync::mpsc;
use std::thread;

use hangar_schema::{InstallRecord, ModId};
use tokio::sync::oneshot;
use tracing::debug;

use super::db::{DbError, StateDb};

type Reply<T> = oneshot::Sender<Result<T, DbError>>;

/// Events that can be sent to the DB actor
pub enum DbEvent {
    GetInstall {
        id: ModId,
        resp: Reply<Option<InstallRecord>>,
    },
    ListInstalls {
        resp: Reply<Vec<InstallRecord>>,
    },
    InsertPending {
        id: ModId,
        resp: Reply<()>,
    },
    CommitInstall {
        id: ModId,
        files: Vec<String>,
        resp: Reply<()>,
    },
    RemoveInstall {
        id: ModId,
        resp: Reply<Option<InstallRecord>>,
    },
    /// Shutdown the actor
    Shutdown,
}

impl fmt::Debug for DbEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GetInstall { id, .. } => f
                .debug_struct("GetInstall")
                .field("id", id)
                .finish_non_exhaustive(),
            Self::ListInstalls { .. } => f.debug_struct("ListInstalls").finish_non_exhaustive(),
            Self::InsertPending { id, .. } => f
                .debug_struct("InsertPending")
                .field("id", id)
                .finish_non_exhaustive(),
            Self::CommitInstall { id, files, .. } => f
                .debug_struct("CommitInstall")
                .field("id", id)
                .field("files", &files.len())
                .finish_non_exhaustive(),
            Self::RemoveInstall { id, .. } => f
                .debug_struct("RemoveInstall")
                .field("id", id)
                .finish_non_exhaustive(),
            Self::Shutdown => write!(f, "Shutdown"),
        }
    }
}

/// A handle to the Database Actor that is Send + Sync and Clone.
#[derive(Clone)]
pub struct DbHandle {
    sender: mpsc::Sender<DbEvent>,
}

impl fmt::Debug for DbHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbHandle").finish_non_exhaustive()
    }
}

impl DbHandle {
    /// Spawn a DB actor over the state database under `home`
    pub fn spawn(home: &Path) -> Result<Self, DbError> {
        Ok(Self::spawn_with(StateDb::open(home)?))
    }

    /// Spawn a DB actor over an already opened database
    pub fn spawn_with(db: StateDb) -> Self {
        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || run_db_event_loop(db, receiver));
        Self { sender }
    }

    /// Helper to send a request and wait for the response
    async fn request<T, F>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(Reply<T>) -> DbEvent,
    {
        let (tx, rx) = oneshot::channel();
        self.sender.send(f(tx)).map_err(|_| DbError::ActorDied)?;
        rx.await.map_err(|_| DbError::ActorDied)?
    }

    pub async fn get_install(&self, id: ModId) -> Result<Option<InstallRecord>, DbError> {
        self.request(|resp| DbEvent::GetInstall { id, resp }).await
    }

    pub async fn list_installs(&self) -> Result<Vec<InstallRecord>, DbError> {
        self.request(|resp| DbEvent::ListInstalls { resp }).await
    }

    pub async fn insert_pending(&self, id: ModId) -> Result<(), DbError> {
        self.request(|resp| DbEvent::InsertPending { id, resp })
            .await
    }

    pub async fn commit_install(&self, id: ModId, files: Vec<String>) -> Result<(), DbError> {
        self.request(|resp| DbEvent::CommitInstall { id, files, resp })
            .await
    }

    pub async fn remove_install(&self, id: ModId) -> Result<Option<InstallRecord>, DbError> {
        self.request(|resp| DbEvent::RemoveInstall { id, resp })
            .await
    }

    /// Ask the actor thread to exit once queued requests are answered
    pub fn shutdown(&self) {
        let _ = self.sender.send(DbEvent::Shutdown);
    }
}

// The db and receiver are moved into this thread for exclusive ownership.
#[allow(clippy::needless_pass_by_value)]
fn run_db_event_loop(db: StateDb, receiver: mpsc::Receiver<DbEvent>) {
    while let Ok(event) = receiver.recv() {
        match event {
            DbEvent::GetInstall { id, resp } => {
                let _ = resp.send(db.get_install(&id));
            }
            DbEvent::ListInstalls { resp } => {
                let _ = resp.send(db.list_installs());
            }
            DbEvent::InsertPending { id, resp } => {
                let _ = resp.send(db.insert_pending(&id));
            }
            DbEvent::CommitInstall { id, files, resp } => {
                let _ = resp.send(db.commit_install(&id, &files));
            }
            DbEvent::RemoveInstall { id, resp } => {
                let _ = resp.send(db.remove_install(&id));
            }
            DbEvent::Shutdown => break,
        }
    }
    debug!("DB actor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_handle_round_trips_through_actor() {
        let dir = tempdir().unwrap();
        let handle = DbHandle::spawn(dir.path()).unwrap();
        let id = ModId::from_raw("A---1.0");

        handle.insert_pending(id.clone()).await.unwrap();
        handle
            .commit_install(id.clone(), vec!["/ksp/GameData/A/a.cfg".into()])
            .await
            .unwrap();

        let installs = handle.list_installs().await.unwrap();
        assert_eq!(installs.len(), 1);
        assert!(!installs[0].is_pending());

        assert!(handle.remove_install(id.clone()).await.unwrap().is_some());
        assert!(handle.get_install(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_requests_after_shutdown_fail() {
        let dir = tempdir().unwrap();
        let handle = DbHandle::spawn(dir.path()).unwrap();
        handle.shutdown();

        let err = loop {
            match handle.list_installs().await {
                Err(e) => break e,
                Ok(_) => tokio::task::yield_now().await,
            }
        };
        assert!(matches!(err, DbError::ActorDied));
    }
}
