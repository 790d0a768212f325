//! [`Engine`]: sole owner of the working set.
//!
//! The serving layer reaches the working set only through
//! [`Engine::working_set`], which hands out an exclusive guard. Every
//! reconciliation pass takes the same lock for its whole duration, so a pass
//! never observes a half-applied request and two passes never overlap.

use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};
use tracing::{info, warn};
use tutorly_core::{catalog::Catalog, store::Store, working_set::WorkingSet};

use crate::{Error, Result, SyncOptions, SyncReport, loader, reconcile};

struct State {
  working: WorkingSet,
  catalog: Catalog,
}

pub struct Engine<S: Store> {
  store:   S,
  options: SyncOptions,
  state:   Mutex<State>,
}

impl<S: Store> Engine<S> {
  /// Connect to `store` and load the working set, converging it onto
  /// `catalog`.
  ///
  /// A store that cannot be opened is fatal: without it there is no working
  /// set to serve.
  pub async fn start(
    store: S,
    catalog: Catalog,
    options: SyncOptions,
  ) -> Result<Self> {
    store.connect().await.map_err(Error::connection)?;
    let working = loader::load(&store, &catalog).await?;
    Ok(Self { store, options, state: Mutex::new(State { working, catalog }) })
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn options(&self) -> SyncOptions { self.options }

  /// Exclusive access to the working set. Passes wait until the guard is
  /// dropped.
  pub async fn working_set(&self) -> MappedMutexGuard<'_, WorkingSet> {
    MutexGuard::map(self.state.lock().await, |s| &mut s.working)
  }

  /// The catalog currently in force.
  pub async fn catalog(&self) -> Catalog { self.state.lock().await.catalog.clone() }

  /// Run a full reconciliation pass: catalog kinds, then the
  /// database-governed kinds.
  pub async fn synchronize_all(&self) -> Result<SyncReport> {
    self.synchronize_with(self.options).await
  }

  /// [`Engine::synchronize_all`] with `options` in place of the engine's
  /// own.
  pub async fn synchronize_with(&self, options: SyncOptions) -> Result<SyncReport> {
    let mut state = self.state.lock().await;
    let State { working, catalog } = &mut *state;
    reconcile::synchronize_all(&self.store, catalog, working, options).await
  }

  /// Converge subjects and start times onto a new catalog. The new catalog
  /// is kept only if the whole pass succeeds.
  pub async fn apply_catalog(&self, catalog: Catalog) -> Result<SyncReport> {
    let mut state = self.state.lock().await;
    let report =
      reconcile::apply_catalog(&self.store, &catalog, &mut state.working).await?;
    state.catalog = catalog;
    Ok(report)
  }

  /// Flush the working set and close the store. Meant to run once, right
  /// before the process exits.
  ///
  /// The store is closed even when the flush fails; the flush error wins.
  pub async fn save_and_disconnect(&self) -> Result<SyncReport> {
    let saved = self.synchronize_all().await;
    let closed = self.store.disconnect().await.map_err(Error::connection);

    match (saved, closed) {
      (Ok(report), Ok(())) => {
        info!(%report, "saved working set and disconnected");
        Ok(report)
      }
      (Ok(_), Err(e)) => Err(e),
      (Err(e), closed) => {
        if let Err(close_err) = closed {
          warn!(error = %close_err, "disconnect after failed save also failed");
        }
        Err(e)
      }
    }
  }
}
