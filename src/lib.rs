//! habits-combat - Habits & Adventure combat engine
//!
//! Dice pools derived from habit-driven attributes, a stateless round
//! resolver, and an encounter state machine, plus a small client for the
//! Habits backend that stores characters.

pub mod backend;
pub mod combat;
pub mod config;

use tracing::info;

use backend::BackendClient;
use combat::EnemyCatalog;

pub use backend::BackendError;
pub use combat::{
    Character, CombatEngine, CombatError, CombatPhase, CombatSession, CombatSummary, DicePool,
};
pub use config::{ConfigError, Settings};

/// Resolve the enemy catalog for a run.
///
/// A configured catalog file wins, then the backend, then the built-in table.
pub async fn load_catalog(settings: &Settings, backend: Option<&BackendClient>) -> EnemyCatalog {
    if let Some(path) = &settings.catalog_path {
        return EnemyCatalog::or_builtin(EnemyCatalog::load_file(path));
    }
    match backend {
        Some(client) => client.load_enemy_catalog().await,
        None => {
            info!("offline; using built-in enemy catalog");
            EnemyCatalog::builtin()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_load_catalog_offline() {
        let catalog = load_catalog(&Settings::default(), None).await;
        assert_eq!(catalog, EnemyCatalog::builtin());
    }

    #[tokio::test]
    async fn test_load_catalog_file_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("enemies.json");
        std::fs::write(
            &path,
            r#"[{"enemy_id": "imp", "name": "Imp", "max_hp": 4, "dice_pool": "1d6"}]"#,
        )
        .unwrap();

        let settings = Settings {
            catalog_path: Some(path),
            ..Settings::default()
        };
        let catalog = load_catalog(&settings, None).await;
        assert!(catalog.contains("imp"));
        assert!(!catalog.contains("goblin"));
    }

    #[tokio::test]
    async fn test_load_catalog_bad_file_falls_back() {
        let settings = Settings {
            catalog_path: Some(PathBuf::from("/no/such/catalog.json")),
            ..Settings::default()
        };
        let catalog = load_catalog(&settings, None).await;
        assert_eq!(catalog, EnemyCatalog::builtin());
    }
}
