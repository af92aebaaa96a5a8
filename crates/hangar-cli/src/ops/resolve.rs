//! Dependency resolution off the async runtime.
//!
//! Resolution walks the catalog synchronously and can take a while on a large
//! catalog, so it runs on a dedicated thread that owns its own catalog
//! connection. Callers wait with a deadline; a request that times out is
//! forgotten and its late answer is dropped.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, mpsc};
use std::thread;
use std::time::Duration;

use hangar_core::{
    CatalogStore, DependencyResolution, ModFilter, ResolveError, resolve_dependencies,
};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::ops::ResolutionError;

type Reply = Result<DependencyResolution, ResolveError>;
type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Reply>>>>;

enum ResolveEvent {
    Resolve {
        request_id: u64,
        filter: ModFilter,
        target: String,
    },
    Shutdown,
}

/// Handle to the resolver thread. Cheap to clone.
#[derive(Clone)]
pub struct ResolverHandle {
    sender: mpsc::Sender<ResolveEvent>,
    pending: Pending,
    next_id: Arc<AtomicU64>,
}

impl fmt::Debug for ResolverHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverHandle")
            .field("pending", &self.pending_requests())
            .finish_non_exhaustive()
    }
}

impl ResolverHandle {
    /// Move `catalog` onto a new resolver thread.
    pub fn spawn<C>(catalog: C) -> Self
    where
        C: CatalogStore + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel();
        let pending: Pending = Arc::default();

        let loop_pending = Arc::clone(&pending);
        thread::spawn(move || run_resolver_loop(catalog, receiver, loop_pending));

        Self {
            sender,
            pending,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Resolve the mod named by `filter` against `target`, waiting at most
    /// `timeout`.
    pub async fn resolve(
        &self,
        filter: ModFilter,
        target: &str,
        timeout: Duration,
    ) -> Result<DependencyResolution, ResolutionError> {
        let request_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.lock().insert(request_id, tx);

        let event = ResolveEvent::Resolve {
            request_id,
            filter,
            target: target.to_string(),
        };
        if self.sender.send(event).is_err() {
            self.lock().remove(&request_id);
            return Err(ResolutionError::ActorDied);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(reply)) => reply.map_err(Into::into),
            Ok(Err(_)) => Err(ResolutionError::ActorDied),
            Err(_) => {
                self.lock().remove(&request_id);
                warn!(request_id, ?timeout, "Dependency resolution timed out");
                Err(ResolutionError::Timeout(timeout))
            }
        }
    }

    /// Requests still waiting for an answer.
    pub fn pending_requests(&self) -> usize {
        self.lock().len()
    }

    pub fn shutdown(&self) {
        let _ = self.sender.send(ResolveEvent::Shutdown);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u64, oneshot::Sender<Reply>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[allow(clippy::needless_pass_by_value)]
fn run_resolver_loop<C>(catalog: C, receiver: mpsc::Receiver<ResolveEvent>, pending: Pending)
where
    C: CatalogStore,
{
    while let Ok(event) = receiver.recv() {
        match event {
            ResolveEvent::Resolve {
                request_id,
                filter,
                target,
            } => {
                let result = resolve_dependencies(&catalog, &filter, &target);
                let waiter = pending
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&request_id);
                match waiter {
                    Some(tx) => {
                        let _ = tx.send(result);
                    }
                    None => debug!(request_id, "Dropping late resolution"),
                }
            }
            ResolveEvent::Shutdown => break,
        }
    }

    // Registered waiters see ActorDied.
    drop(receiver);
    pending
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clear();
}
