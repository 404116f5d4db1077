//! Backend selection with one-way fallback.
//!
//! [`FallbackStore`] is the handle the rest of the crate holds. It always
//! owns a [`DiskStore`] and may additionally own a network store once
//! [`FallbackStore::connect_network`] succeeds.
//!
//! ```text
//!  Uninitialized ──start──▶ DiskActive ──connected──▶ NetworkActive
//!                               ▲                          │
//!                               └────────network error─────┘
//! ```
//!
//! A store is usable the moment it is constructed: it starts on disk. The
//! network connection is attempted at most once per store. After a network
//! error the store stays on disk for the rest of its life; recovering the
//! network backend takes a new process.

use super::{DiskStore, MetadataStore, StoreError};
use async_trait::async_trait;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{info, warn};

/// Key written once to prove a fresh network connection accepts writes.
pub const VERIFICATION_KEY: &str = "test:connection";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendState {
    Uninitialized,
    NetworkActive,
    DiskActive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The store was constructed.
    Start,
    /// A network connection was established and verified.
    Connected,
    /// The network backend returned an error.
    NetworkFailed,
}

impl BackendState {
    pub fn next(self, transition: Transition) -> BackendState {
        match (self, transition) {
            (BackendState::Uninitialized, Transition::Start) => BackendState::DiskActive,
            (BackendState::DiskActive, Transition::Connected) => BackendState::NetworkActive,
            (BackendState::NetworkActive, Transition::NetworkFailed) => BackendState::DiskActive,
            (state, _) => state,
        }
    }
}

struct Selection {
    state: BackendState,
    network: Option<Arc<dyn MetadataStore>>,
}

pub struct FallbackStore {
    disk: DiskStore,
    selection: RwLock<Selection>,
    attempted: AtomicBool,
}

impl FallbackStore {
    pub fn new(disk: DiskStore) -> Self {
        Self {
            disk,
            selection: RwLock::new(Selection {
                state: BackendState::Uninitialized.next(Transition::Start),
                network: None,
            }),
            attempted: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> BackendState {
        self.selection
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .state
    }

    pub fn disk(&self) -> &DiskStore {
        &self.disk
    }

    /// Try to switch to a network backend.
    ///
    /// `connect` is raced against `timeout`; the resulting store must then
    /// accept a write of [`VERIFICATION_KEY`]. On any failure the store stays
    /// on disk. Only the first call per store does anything; later calls just
    /// report the current state.
    pub async fn connect_network<F>(&self, connect: F, timeout: Duration) -> BackendState
    where
        F: Future<Output = Result<Arc<dyn MetadataStore>, StoreError>>,
    {
        if self.attempted.swap(true, Ordering::SeqCst) {
            return self.state();
        }

        let network = match tokio::time::timeout(timeout, connect).await {
            Ok(Ok(network)) => network,
            Ok(Err(e)) => {
                warn!(error = %e, "network store unavailable, using file storage");
                return self.state();
            }
            Err(_) => {
                warn!(error = %StoreError::Timeout(timeout), "network store unavailable, using file storage");
                return self.state();
            }
        };

        if let Err(e) = network
            .set(VERIFICATION_KEY, "ok", Some(Duration::from_secs(60)))
            .await
        {
            warn!(error = %e, "network store failed verification, using file storage");
            return self.state();
        }

        let mut selection = self.selection.write().unwrap_or_else(|e| e.into_inner());
        selection.state = selection.state.next(Transition::Connected);
        if selection.state == BackendState::NetworkActive {
            info!(backend = network.kind(), "network store connected");
            selection.network = Some(network);
        }
        selection.state
    }

    fn active_network(&self) -> Option<Arc<dyn MetadataStore>> {
        self.selection
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .network
            .clone()
    }

    fn fall_back(&self, error: &StoreError) {
        let mut selection = self.selection.write().unwrap_or_else(|e| e.into_inner());
        if selection.state == BackendState::NetworkActive {
            warn!(%error, "network store failed, switching to file storage");
        }
        selection.state = selection.state.next(Transition::NetworkFailed);
        selection.network = None;
    }
}

#[async_trait]
impl MetadataStore for FallbackStore {
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        if let Some(network) = self.active_network() {
            match network.set(key, value, ttl).await {
                Ok(()) => return Ok(()),
                Err(e) => self.fall_back(&e),
            }
        }
        self.disk.set(key, value, ttl).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if let Some(network) = self.active_network() {
            match network.get(key).await {
                Ok(value) => return Ok(value),
                Err(e) => self.fall_back(&e),
            }
        }
        self.disk.get(key).await
    }

    fn kind(&self) -> &'static str {
        match self.active_network() {
            Some(network) => network.kind(),
            None => self.disk.kind(),
        }
    }
}
