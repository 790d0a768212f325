//! Process-level wiring for the Tutorly backend.
//!
//! Loads [`ServerConfig`], drives periodic reconciliation passes on an
//! [`Engine`], and performs the final save-and-disconnect when the shutdown
//! signal arrives. Request handling lives elsewhere and reaches the working
//! set through [`Engine::working_set`].

use std::{
  future::Future,
  path::{Path, PathBuf},
  time::Duration,
};

use serde::Deserialize;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{info, warn};
use tutorly_core::{
  catalog::Catalog,
  entity::{StartTime, Subject},
  store::Store,
};
use tutorly_sync::{Engine, SyncOptions, SyncReport};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime configuration, deserialised from `tutorly.toml` and `TUTORLY_*`
/// environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  /// Path to the provisioned SQLite database. A leading `~/` is expanded.
  pub store_path:         PathBuf,
  /// Seconds between background reconciliation passes; `0` disables them.
  #[serde(default)]
  pub sync_interval_secs: u64,
  #[serde(default)]
  pub adopt_assigned_ids: bool,
  /// Authoritative subject list.
  #[serde(default)]
  pub subjects:           Vec<Subject>,
  /// Authoritative start-time list.
  #[serde(default)]
  pub start_times:        Vec<StartTime>,
}

impl ServerConfig {
  /// Read `path` (if it exists) layered under `TUTORLY_*` variables.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("TUTORLY"))
      .build()?
      .try_deserialize()
  }

  pub fn catalog(&self) -> Catalog {
    Catalog {
      subjects:    self.subjects.clone(),
      start_times: self.start_times.clone(),
    }
  }

  pub fn sync_options(&self) -> SyncOptions {
    SyncOptions { adopt_assigned_ids: self.adopt_assigned_ids }
  }

  pub fn sync_interval(&self) -> Option<Duration> {
    (self.sync_interval_secs > 0)
      .then(|| Duration::from_secs(self.sync_interval_secs))
  }

  /// `store_path` with a leading `~` expanded.
  pub fn resolved_store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Lifecycle ────────────────────────────────────────────────────────────────

/// Run background passes every `interval` until `shutdown` resolves, then
/// save and disconnect.
///
/// A failed background pass is logged and retried on the next tick; only
/// the final save reports its error.
///
/// Background passes always adopt store-assigned identities. A new entity
/// left with its placeholder identity would be inserted again on every
/// tick.
pub async fn serve_until<S, F>(
  engine: &Engine<S>,
  interval: Option<Duration>,
  shutdown: F,
) -> tutorly_sync::Result<SyncReport>
where
  S: Store,
  F: Future<Output = ()>,
{
  tokio::pin!(shutdown);

  let background = SyncOptions { adopt_assigned_ids: true };

  match interval {
    Some(period) => {
      let mut ticker = interval_at(Instant::now() + period, period);
      ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
      loop {
        tokio::select! {
          () = &mut shutdown => break,
          _ = ticker.tick() => {
            if let Err(e) = engine.synchronize_with(background).await {
              warn!(error = %e, "background synchronization failed");
            }
          }
        }
      }
    }
    None => shutdown.await,
  }

  info!("shutting down");
  engine.save_and_disconnect().await
}

#[cfg(test)]
mod tests {
  use std::io::Write as _;

  use tutorly_core::table::EntityKind;
  use tutorly_store_sqlite::SqliteStore;

  use super::*;

  const CONFIG: &str = r#"
store_path = "~/tutorly/tutorly.db"
sync_interval_secs = 300

[[subjects]]
id = 1
name = "Mathematics"
short_code = "M"
teacher = "Huber"

[[subjects]]
id = 2
name = "English"
short_code = "E"
teacher = "Lang"
description = "Conversation practice"

[[start_times]]
id = 1
time = "07:45"
"#;

  #[test]
  fn parses_toml_config() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(CONFIG.as_bytes()).unwrap();

    let cfg = ServerConfig::load(file.path()).unwrap();

    assert_eq!(cfg.sync_interval(), Some(Duration::from_secs(300)));
    assert!(!cfg.adopt_assigned_ids);
    let catalog = cfg.catalog();
    assert_eq!(catalog.subjects.len(), 2);
    assert_eq!(catalog.subjects[1].description, "Conversation practice");
    assert_eq!(catalog.start_times[0].time, "07:45");
    assert!(catalog.validate().is_ok());
  }

  #[test]
  fn zero_interval_disables_background_passes() {
    let cfg = ServerConfig {
      store_path:         PathBuf::from("tutorly.db"),
      sync_interval_secs: 0,
      adopt_assigned_ids: false,
      subjects:           vec![],
      start_times:        vec![],
    };
    assert_eq!(cfg.sync_interval(), None);
  }

  #[test]
  fn relative_paths_are_not_expanded() {
    assert_eq!(
      expand_tilde(Path::new("data/tutorly.db")),
      PathBuf::from("data/tutorly.db")
    );
  }

  #[tokio::test]
  async fn shutdown_saves_and_disconnects() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let catalog = Catalog {
      subjects:    vec![],
      start_times: vec![StartTime { id: 1, time: "07:45".into() }],
    };
    let engine = Engine::start(store, catalog, SyncOptions::default())
      .await
      .unwrap();

    engine.working_set().await.statuses.add(tutorly_core::entity::Status {
      id:   0,
      name: "planned".into(),
    });

    let report = serve_until(
      &engine,
      Some(Duration::from_secs(3600)),
      std::future::ready(()),
    )
    .await
    .unwrap();

    assert_eq!(report.counts(EntityKind::Status).inserted, 1);
    assert!(!engine.store().is_connected().await);
  }

  #[tokio::test]
  async fn periodic_passes_insert_new_entities_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tutorly.db");
    SqliteStore::create(&path)
      .await
      .unwrap()
      .disconnect()
      .await
      .unwrap();

    let engine = Engine::start(
      SqliteStore::disconnected(&path),
      Catalog::default(),
      SyncOptions::default(),
    )
    .await
    .unwrap();

    engine.working_set().await.statuses.add(tutorly_core::entity::Status {
      id:   0,
      name: "planned".into(),
    });

    serve_until(
      &engine,
      Some(Duration::from_millis(100)),
      tokio::time::sleep(Duration::from_millis(350)),
    )
    .await
    .unwrap();

    let reopened = SqliteStore::open(&path).await.unwrap();
    let statuses: Vec<tutorly_core::entity::Status> =
      reopened.select_all().await.unwrap();
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].name, "planned");
  }
}
