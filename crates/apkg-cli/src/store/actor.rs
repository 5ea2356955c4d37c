//! Ledger Actor - single-writer access to installed state
//!
//! The ledger and manifests are plain files with no locking of their own.
//! Hosting the [`LedgerStore`] on one background thread and talking to it
//! by message passing keeps every read and write serialized, even while
//! downloads and extraction run on the async runtime.

use std::fmt;
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

use apkg_core::{Installed, LedgerError, LedgerStore};
use apkg_schema::PackageName;
use thiserror::Error;
use tokio::sync::oneshot;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("ledger actor is no longer running")]
    ActorDied,
}

type Reply<T> = oneshot::Sender<Result<T, LedgerError>>;

/// Events that can be sent to the ledger actor
pub enum LedgerEvent {
    /// Read the whole ledger
    Load { resp: Reply<Installed> },
    /// Replace the whole ledger
    Save {
        installed: Installed,
        resp: Reply<()>,
    },
    /// Read one package's manifest (`None` when unknown)
    LoadManifest {
        name: PackageName,
        resp: Reply<Option<Vec<PathBuf>>>,
    },
    /// Replace one package's manifest
    SaveManifest {
        name: PackageName,
        paths: Vec<PathBuf>,
        resp: Reply<()>,
    },
    /// Forget one package's manifest
    DeleteManifest { name: PackageName, resp: Reply<()> },
    /// Shutdown the actor
    Shutdown,
}

impl fmt::Debug for LedgerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load { .. } => f.debug_struct("Load").finish_non_exhaustive(),
            Self::Save { installed, .. } => f
                .debug_struct("Save")
                .field("packages", &installed.len())
                .finish_non_exhaustive(),
            Self::LoadManifest { name, .. } => f
                .debug_struct("LoadManifest")
                .field("name", name)
                .finish_non_exhaustive(),
            Self::SaveManifest { name, paths, .. } => f
                .debug_struct("SaveManifest")
                .field("name", name)
                .field("paths", &paths.len())
                .finish_non_exhaustive(),
            Self::DeleteManifest { name, .. } => f
                .debug_struct("DeleteManifest")
                .field("name", name)
                .finish_non_exhaustive(),
            Self::Shutdown => write!(f, "Shutdown"),
        }
    }
}

/// A handle to the ledger actor that is Send + Sync and Clone.
#[derive(Clone)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerEvent>,
}

impl fmt::Debug for LedgerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerHandle").finish_non_exhaustive()
    }
}

impl LedgerHandle {
    /// Spawn the actor thread owning `store`.
    pub fn spawn(store: LedgerStore) -> Self {
        let (sender, receiver) = mpsc::channel();

        thread::spawn(move || {
            run_ledger_event_loop(&store, &receiver);
        });

        Self { sender }
    }

    /// Helper to send a request and wait for the response
    async fn request<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(Reply<T>) -> LedgerEvent,
    {
        let (tx, rx) = oneshot::channel();
        self.sender.send(f(tx)).map_err(|_| StoreError::ActorDied)?;
        Ok(rx.await.map_err(|_| StoreError::ActorDied)??)
    }

    pub async fn load(&self) -> Result<Installed, StoreError> {
        self.request(|resp| LedgerEvent::Load { resp }).await
    }

    pub async fn save(&self, installed: Installed) -> Result<(), StoreError> {
        self.request(|resp| LedgerEvent::Save { installed, resp })
            .await
    }

    pub async fn load_manifest(&self, name: PackageName) -> Result<Option<Vec<PathBuf>>, StoreError> {
        self.request(|resp| LedgerEvent::LoadManifest { name, resp })
            .await
    }

    pub async fn save_manifest(
        &self,
        name: PackageName,
        paths: Vec<PathBuf>,
    ) -> Result<(), StoreError> {
        self.request(|resp| LedgerEvent::SaveManifest { name, paths, resp })
            .await
    }

    pub async fn delete_manifest(&self, name: PackageName) -> Result<(), StoreError> {
        self.request(|resp| LedgerEvent::DeleteManifest { name, resp })
            .await
    }

    /// Ask the actor to stop. Requests sent afterwards fail with `ActorDied`.
    pub fn shutdown(&self) {
        self.sender.send(LedgerEvent::Shutdown).ok();
    }
}

fn run_ledger_event_loop(store: &LedgerStore, receiver: &mpsc::Receiver<LedgerEvent>) {
    while let Ok(event) = receiver.recv() {
        tracing::trace!(?event, "ledger event");
        match event {
            LedgerEvent::Load { resp } => {
                let _ = resp.send(store.load());
            }
            LedgerEvent::Save { installed, resp } => {
                let _ = resp.send(store.save(&installed));
            }
            LedgerEvent::LoadManifest { name, resp } => {
                let _ = resp.send(store.load_manifest(&name));
            }
            LedgerEvent::SaveManifest { name, paths, resp } => {
                let _ = resp.send(store.save_manifest(&name, &paths));
            }
            LedgerEvent::DeleteManifest { name, resp } => {
                let _ = resp.send(store.delete_manifest(&name));
            }
            LedgerEvent::Shutdown => break,
        }
    }
}
