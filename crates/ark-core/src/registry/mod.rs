//! Server registry.
//!
//! An ordered, read-mostly table of [`ServerDefinition`]s. On first run the
//! table is seeded from [`DEFAULT_CATALOG`] and written back through the
//! [`RegistryStore`]. A store that cannot be parsed is left untouched and the
//! defaults are served instead.

pub mod catalog;
pub mod store;

pub use catalog::{default_definitions, CatalogEntry, DEFAULT_CATALOG};
pub use store::{JsonFileStore, MemoryStore, RegistryStore};

use crate::config::PathsConfig;
use crate::{ArkError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Static description of one managed server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerDefinition {
    pub id: u32,
    pub name: String,
    pub map: String,
    pub ip: String,
    #[serde(alias = "game_port")]
    pub game_port: u16,
    #[serde(alias = "query_port")]
    pub query_port: u16,
    #[serde(alias = "rcon_port")]
    pub rcon_port: u16,
    pub path: PathBuf,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl ServerDefinition {
    pub fn installed_marker(&self) -> PathBuf {
        self.path.join(PathsConfig::INSTALLED_MARKER)
    }

    pub fn version_marker(&self) -> PathBuf {
        self.path.join(PathsConfig::VERSION_MARKER)
    }

    pub fn pid_file(&self) -> PathBuf {
        self.path.join(PathsConfig::PID_FILENAME)
    }

    pub fn launch_script(&self) -> PathBuf {
        self.path.join(PathsConfig::LAUNCH_SCRIPT)
    }

    pub fn settings_sidecar(&self) -> PathBuf {
        self.path.join(PathsConfig::SETTINGS_SIDECAR)
    }

    /// Executable after relocation to the installation root.
    pub fn executable(&self) -> PathBuf {
        self.path.join(PathsConfig::EXECUTABLE_NAME)
    }

    /// Directory SteamCMD drops the Linux binaries into.
    pub fn platform_binaries_dir(&self) -> PathBuf {
        self.path.join(PathsConfig::PLATFORM_BINARIES_DIR)
    }

    pub fn runtime_config_dir(&self) -> PathBuf {
        self.path.join(PathsConfig::RUNTIME_CONFIG_DIR)
    }

    /// Command-line fragment identifying this server's process.
    pub fn process_signature(&self) -> String {
        format!("{} {}", PathsConfig::EXECUTABLE_NAME, self.map)
    }
}

/// In-memory table of server definitions backed by a store.
pub struct Registry {
    servers: Vec<ServerDefinition>,
}

impl Registry {
    /// Load the registry from `store`, seeding defaults under `servers_base`
    /// when the store is empty.
    pub fn open(store: &dyn RegistryStore, servers_base: &Path) -> Result<Self> {
        let servers = match store.load() {
            Ok(Some(servers)) if !servers.is_empty() => {
                debug!("Loaded {} server definitions", servers.len());
                servers
            }
            Ok(_) => {
                let defaults = default_definitions(servers_base);
                info!(
                    "Seeding registry with {} default servers under {}",
                    defaults.len(),
                    servers_base.display()
                );
                store.save(&defaults)?;
                defaults
            }
            Err(e) => {
                warn!("Registry store unreadable, serving defaults: {}", e);
                default_definitions(servers_base)
            }
        };

        Ok(Self { servers })
    }

    /// All definitions in configured order.
    pub fn list(&self) -> &[ServerDefinition] {
        &self.servers
    }

    pub fn get(&self, id: u32) -> Result<&ServerDefinition> {
        self.servers
            .iter()
            .find(|s| s.id == id)
            .ok_or(ArkError::ServerNotFound { id })
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_open_seeds_and_persists_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(temp_dir.path().join("servers.json"));

        let registry = Registry::open(&store, Path::new("/srv/ark")).unwrap();
        assert_eq!(registry.len(), 9);
        assert_eq!(registry.list()[0].map, "TheIsland");
        assert_eq!(store.load().unwrap().unwrap().len(), 9);
    }

    #[test]
    fn test_open_keeps_stored_order() {
        let mut defs = default_definitions(Path::new("/srv/ark"));
        defs.reverse();
        let store = MemoryStore::with_servers(defs.clone());

        let registry = Registry::open(&store, Path::new("/other")).unwrap();
        assert_eq!(registry.list(), defs.as_slice());
    }

    #[test]
    fn test_corrupt_store_serves_defaults_without_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("servers.json");
        fs::write(&path, "{ broken").unwrap();

        let registry = Registry::open(&JsonFileStore::new(&path), Path::new("/srv/ark")).unwrap();
        assert_eq!(registry.len(), 9);
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ broken");
    }

    #[test]
    fn test_get_unknown_id_is_not_found() {
        let registry = Registry::open(&MemoryStore::new(), Path::new("/srv")).unwrap();
        assert!(registry.get(3).is_ok());
        assert!(matches!(
            registry.get(42),
            Err(ArkError::ServerNotFound { id: 42 })
        ));
    }

    #[test]
    fn test_definition_paths() {
        let def = DEFAULT_CATALOG[0].to_definition(Path::new("/srv/ark"));
        assert_eq!(
            def.installed_marker(),
            PathBuf::from("/srv/ark/the-island/.ark_installed")
        );
        assert_eq!(
            def.platform_binaries_dir(),
            PathBuf::from("/srv/ark/the-island/ShooterGame/Binaries/Linux")
        );
        assert_eq!(def.process_signature(), "ShooterGameServer TheIsland");
    }
}
