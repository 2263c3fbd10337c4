//! Persistence backends for the server registry.

use super::ServerDefinition;
use crate::atomic::{atomic_read_json, atomic_write_json};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Key-value persistence for server definitions.
pub trait RegistryStore: Send + Sync {
    /// Load stored definitions. `Ok(None)` means nothing has been stored yet.
    fn load(&self) -> Result<Option<Vec<ServerDefinition>>>;

    /// Replace the stored definitions.
    fn save(&self, servers: &[ServerDefinition]) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct RegistryDocument {
    servers: Vec<ServerDefinition>,
}

/// JSON file store: `{"servers": [...]}`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RegistryStore for JsonFileStore {
    fn load(&self) -> Result<Option<Vec<ServerDefinition>>> {
        let doc: Option<RegistryDocument> = atomic_read_json(&self.path)?;
        Ok(doc.map(|d| d.servers))
    }

    fn save(&self, servers: &[ServerDefinition]) -> Result<()> {
        let doc = RegistryDocument {
            servers: servers.to_vec(),
        };
        atomic_write_json(&self.path, &doc, true)
    }
}

/// In-memory store, handy for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    servers: Mutex<Option<Vec<ServerDefinition>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_servers(servers: Vec<ServerDefinition>) -> Self {
        Self {
            servers: Mutex::new(Some(servers)),
        }
    }
}

impl RegistryStore for MemoryStore {
    fn load(&self) -> Result<Option<Vec<ServerDefinition>>> {
        Ok(self
            .servers
            .lock()
            .map_err(|_| crate::ArkError::Other("registry store lock poisoned".into()))?
            .clone())
    }

    fn save(&self, servers: &[ServerDefinition]) -> Result<()> {
        *self
            .servers
            .lock()
            .map_err(|_| crate::ArkError::Other("registry store lock poisoned".into()))? =
            Some(servers.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::catalog::default_definitions;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_json_store_roundtrip_uses_camel_case() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(temp_dir.path().join("config/servers.json"));
        assert!(store.load().unwrap().is_none());

        let defs = default_definitions(Path::new("/srv/ark"));
        store.save(&defs).unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"gamePort\": 7777"));
        assert!(raw.contains("\"servers\""));
        assert_eq!(store.load().unwrap(), Some(defs));
    }

    #[test]
    fn test_json_store_accepts_snake_case() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("servers.json");
        fs::write(
            &path,
            r#"{"servers": [{"id": 1, "name": "ARK - The Island", "map": "TheIsland",
                "ip": "127.0.0.1", "game_port": 7777, "query_port": 27015,
                "rcon_port": 32330, "path": "/srv/ark/the-island", "enabled": true,
                "status": "offline", "players": 0}]}"#,
        )
        .unwrap();

        let servers = JsonFileStore::new(&path).load().unwrap().unwrap();
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].game_port, 7777);
        assert_eq!(servers[0].rcon_port, 32330);
    }
}
