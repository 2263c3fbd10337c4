//! Built-in server catalog used to seed a fresh registry.

use super::ServerDefinition;
use std::path::Path;

/// One row of the default catalog.
#[derive(Debug, Clone, Copy)]
pub struct CatalogEntry {
    pub id: u32,
    pub name: &'static str,
    pub map: &'static str,
    pub dir_name: &'static str,
}

pub const BASE_GAME_PORT: u16 = 7777;
pub const BASE_QUERY_PORT: u16 = 27015;
pub const BASE_RCON_PORT: u16 = 32330;
pub const PORT_STRIDE: u16 = 10;
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";

/// The nine official maps, in configured order.
pub const DEFAULT_CATALOG: [CatalogEntry; 9] = [
    CatalogEntry {
        id: 1,
        name: "ARK - The Island",
        map: "TheIsland",
        dir_name: "the-island",
    },
    CatalogEntry {
        id: 2,
        name: "ARK - The Center",
        map: "TheCenter",
        dir_name: "the-center",
    },
    CatalogEntry {
        id: 3,
        name: "ARK - Ragnarok",
        map: "Ragnarok",
        dir_name: "ragnarok",
    },
    CatalogEntry {
        id: 4,
        name: "ARK - Aberration",
        map: "Aberration",
        dir_name: "aberration",
    },
    CatalogEntry {
        id: 5,
        name: "ARK - Extinction",
        map: "Extinction",
        dir_name: "extinction",
    },
    CatalogEntry {
        id: 6,
        name: "ARK - Genesis",
        map: "Genesis",
        dir_name: "genesis",
    },
    CatalogEntry {
        id: 7,
        name: "ARK - Genesis 2",
        map: "Genesis2",
        dir_name: "genesis2",
    },
    CatalogEntry {
        id: 8,
        name: "ARK - Lost Island",
        map: "LostIsland",
        dir_name: "lost-island",
    },
    CatalogEntry {
        id: 9,
        name: "ARK - Fjordur",
        map: "Fjordur",
        dir_name: "fjordur",
    },
];

impl CatalogEntry {
    /// Expand the entry into a full definition rooted at `base_dir`.
    pub fn to_definition(&self, base_dir: &Path) -> ServerDefinition {
        let offset = PORT_STRIDE * (self.id as u16 - 1);
        ServerDefinition {
            id: self.id,
            name: self.name.to_string(),
            map: self.map.to_string(),
            ip: DEFAULT_BIND_ADDRESS.to_string(),
            game_port: BASE_GAME_PORT + offset,
            query_port: BASE_QUERY_PORT + offset,
            rcon_port: BASE_RCON_PORT + offset,
            path: base_dir.join(self.dir_name),
            enabled: true,
        }
    }
}

/// Build the default definitions under `base_dir`.
pub fn default_definitions(base_dir: &Path) -> Vec<ServerDefinition> {
    DEFAULT_CATALOG
        .iter()
        .map(|entry| entry.to_definition(base_dir))
        .collect()
}
