//! Loading and reconciliation between the working set and a [`Store`].
//!
//! - [`loader`] populates a [`WorkingSet`] from the store at startup.
//! - [`reconcile`] pushes the working set back and converges the
//!   config-governed kinds onto the [`Catalog`].
//! - [`Engine`] owns the working set and serializes every pass against the
//!   serving layer.
//!
//! [`Store`]: tutorly_core::store::Store
//! [`WorkingSet`]: tutorly_core::working_set::WorkingSet
//! [`Catalog`]: tutorly_core::catalog::Catalog

pub mod engine;
pub mod error;
pub mod loader;
pub mod reconcile;
pub mod report;

pub use engine::Engine;
pub use error::{Error, Result};
pub use reconcile::SyncOptions;
pub use report::SyncReport;
