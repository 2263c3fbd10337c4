//! ARK Core - headless library for running a fleet of ARK dedicated servers
//! on one host.
//!
//! This crate covers the registry of servers, installation markers, process
//! supervision, launch scripts, runtime settings, status snapshots and log
//! access. Driving SteamCMD lives in the `ark-installer` crate; the HTTP
//! surface lives in `ark-rpc`.
//!
//! # Example
//!
//! ```rust,ignore
//! use ark_core::ArkPanel;
//!
//! #[tokio::main]
//! async fn main() -> ark_core::Result<()> {
//!     let panel = ArkPanel::builder("/var/lib/ark-panel")
//!         .auto_create_dirs(true)
//!         .build()?;
//!
//!     for status in panel.status_all().await {
//!         println!("{}: {}", status.server.name, status.status);
//!     }
//!     Ok(())
//! }
//! ```

pub mod atomic;
pub mod config;
pub mod error;
pub mod install_state;
pub mod logs;
pub mod platform;
pub mod process;
pub mod query;
pub mod registry;
pub mod settings;
pub mod status;

pub use config::PanelPaths;
pub use error::{ArkError, Result};
pub use install_state::InstallationState;
pub use logs::{LogFileInfo, LogFilter, LogKind, LogQuery, LogSink, LogStore, LogStream};
pub use process::{LaunchResult, ProcessMetrics, ProcessProbe, ServerLauncher};
pub use query::{A2sClient, QueryClient, QueryInfo};
pub use registry::{JsonFileStore, MemoryStore, Registry, RegistryStore, ServerDefinition};
pub use settings::{ServerSettings, SettingsPatch};
pub use status::{compose_status, DashboardStats, RuntimeStatus, ServerStatus};

use config::{LogConfig, PathsConfig};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Builder for [`ArkPanel`].
pub struct ArkPanelBuilder {
    data_root: PathBuf,
    servers_base: PathBuf,
    auto_create_dirs: bool,
    store: Option<Box<dyn RegistryStore>>,
    query: Option<Arc<dyn QueryClient>>,
}

impl ArkPanelBuilder {
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
            servers_base: PathBuf::from(PathsConfig::DEFAULT_SERVERS_BASE),
            auto_create_dirs: false,
            store: None,
            query: None,
        }
    }

    /// Base directory for the default catalog's installation paths.
    ///
    /// Only used when the registry is seeded. Default:
    /// `/home/arkserver/ark-servers`.
    pub fn servers_base(mut self, dir: impl Into<PathBuf>) -> Self {
        self.servers_base = dir.into();
        self
    }

    /// Create `config/` and `logs/` under the data root.
    ///
    /// Default: `false`
    pub fn auto_create_dirs(mut self, enable: bool) -> Self {
        self.auto_create_dirs = enable;
        self
    }

    /// Replace the JSON file store.
    pub fn with_store(mut self, store: impl RegistryStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    /// Replace the A2S query client.
    pub fn with_query_client(mut self, client: impl QueryClient + 'static) -> Self {
        self.query = Some(Arc::new(client));
        self
    }

    pub fn build(self) -> Result<ArkPanel> {
        let paths = PanelPaths::new(self.data_root);

        if self.auto_create_dirs {
            for dir in [paths.config_dir(), paths.logs_dir()] {
                fs::create_dir_all(&dir).map_err(|e| ArkError::Io {
                    message: format!("Failed to create directory: {}", dir.display()),
                    path: Some(dir.clone()),
                    source: Some(e),
                })?;
            }
        }

        let store = self
            .store
            .unwrap_or_else(|| Box::new(JsonFileStore::new(paths.registry_file())));
        let registry = Registry::open(store.as_ref(), &self.servers_base)?;
        let query = self
            .query
            .unwrap_or_else(|| Arc::new(A2sClient::new()));

        info!(
            "Panel ready: {} servers, data root {}",
            registry.len(),
            paths.root().display()
        );

        Ok(ArkPanel {
            inner: Arc::new(PanelInner {
                logs: LogStore::new(paths.logs_dir()),
                paths,
                registry,
                query,
            }),
        })
    }
}

struct PanelInner {
    paths: PanelPaths,
    registry: Registry,
    logs: LogStore,
    query: Arc<dyn QueryClient>,
}

/// Entry point composing registry, probe, launcher, settings and logs.
///
/// Every operation taking an id resolves it through the registry first and
/// fails with [`ArkError::ServerNotFound`] before touching anything else.
#[derive(Clone)]
pub struct ArkPanel {
    inner: Arc<PanelInner>,
}

impl ArkPanel {
    pub fn builder(data_root: impl Into<PathBuf>) -> ArkPanelBuilder {
        ArkPanelBuilder::new(data_root)
    }

    pub fn paths(&self) -> &PanelPaths {
        &self.inner.paths
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub fn logs(&self) -> &LogStore {
        &self.inner.logs
    }

    pub fn list_servers(&self) -> &[ServerDefinition] {
        self.inner.registry.list()
    }

    pub fn server(&self, id: u32) -> Result<&ServerDefinition> {
        self.inner.registry.get(id)
    }

    pub fn installation_state(&self, id: u32) -> Result<InstallationState> {
        Ok(InstallationState::detect(self.server(id)?))
    }

    // ========================================
    // Status
    // ========================================

    /// Snapshot of one server.
    pub async fn status(&self, id: u32) -> Result<ServerStatus> {
        let def = self.server(id)?.clone();
        Ok(self.status_of(def).await)
    }

    /// Snapshots of every server, in registry order. Servers are probed in
    /// parallel; a fault in one never affects the others.
    pub async fn status_all(&self) -> Vec<ServerStatus> {
        let defs = self.list_servers().to_vec();
        let mut set = JoinSet::new();
        for (index, def) in defs.iter().cloned().enumerate() {
            let panel = self.clone();
            set.spawn(async move { (index, panel.status_of(def).await) });
        }

        let mut slots: Vec<Option<ServerStatus>> = vec![None; defs.len()];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, status)) => slots[index] = Some(status),
                Err(e) => warn!("Status task failed: {}", e),
            }
        }

        slots
            .into_iter()
            .zip(defs)
            .map(|(slot, def)| {
                slot.unwrap_or_else(|| {
                    let state = InstallationState::detect(&def);
                    compose_status(
                        &def,
                        &state,
                        None,
                        Err(ArkError::ProbeFault {
                            message: "status task aborted".into(),
                        }),
                        None,
                    )
                })
            })
            .collect()
    }

    pub async fn dashboard(&self) -> DashboardStats {
        DashboardStats::from_statuses(&self.status_all().await)
    }

    async fn status_of(&self, def: ServerDefinition) -> ServerStatus {
        let state = InstallationState::detect(&def);
        if !state.is_installed() {
            return compose_status(&def, &state, None, Ok(None), None);
        }
        let version = install_state::read_version(&def);

        let probe_def = def.clone();
        let probe = tokio::task::spawn_blocking(move || ProcessProbe::new(&probe_def).probe())
            .await
            .map_err(|e| ArkError::ProbeFault {
                message: format!("probe task failed: {}", e),
            })
            .and_then(|r| r);

        let query = match &probe {
            Ok(Some(_)) => Some(self.inner.query.query(&def.ip, def.query_port).await),
            _ => None,
        };
        if let Some(Err(e)) = &query {
            debug!("Query for server {} degraded: {}", def.id, e);
        }

        compose_status(&def, &state, version, probe, query)
    }

    // ========================================
    // Process probe
    // ========================================

    pub fn is_running(&self, id: u32) -> Result<bool> {
        Ok(ProcessProbe::new(self.server(id)?).is_running())
    }

    pub fn metrics(&self, id: u32) -> Result<ProcessMetrics> {
        ProcessProbe::new(self.server(id)?).metrics()
    }

    // ========================================
    // Lifecycle
    // ========================================

    /// Start server `id` with its saved settings.
    pub fn start(&self, id: u32) -> Result<LaunchResult> {
        let def = self.server(id)?;
        let state = InstallationState::detect(def);
        let settings = settings::load_settings(def);
        ServerLauncher::start(
            def,
            &state,
            &settings,
            &self.inner.logs.path(&LogStream::Run(id)),
        )
    }

    /// Stop server `id`. Returns the number of processes signalled.
    pub fn stop(&self, id: u32) -> Result<usize> {
        ServerLauncher::stop(self.server(id)?)
    }

    // ========================================
    // Settings
    // ========================================

    pub fn load_settings(&self, id: u32) -> Result<ServerSettings> {
        Ok(settings::load_settings(self.server(id)?))
    }

    /// Merge `patch` over the current settings and save. Takes effect on the
    /// next start.
    pub fn save_settings(&self, id: u32, patch: SettingsPatch) -> Result<ServerSettings> {
        let def = self.server(id)?;
        let merged = patch.apply(settings::load_settings(def));
        settings::save_settings(def, &merged)?;
        Ok(merged)
    }

    // ========================================
    // Logs
    // ========================================

    /// Game server output, filtered then capped.
    pub fn server_logs(&self, id: u32, query: &LogQuery) -> Result<Vec<String>> {
        self.server(id)?;
        self.inner.logs.query(&LogStream::Run(id), query)
    }

    pub fn install_logs(&self, id: u32) -> Result<Vec<String>> {
        self.server(id)?;
        self.inner
            .logs
            .tail(&LogStream::Install(id), LogConfig::DEFAULT_TAIL_LINES)
    }

    pub fn update_logs(&self, id: u32) -> Result<Vec<String>> {
        self.server(id)?;
        self.inner
            .logs
            .tail(&LogStream::Update(id), LogConfig::DEFAULT_TAIL_LINES)
    }

    pub fn specific_log(&self, id: u32, file_name: &str) -> Result<Vec<String>> {
        self.server(id)?;
        self.inner
            .logs
            .specific_log(id, file_name, LogConfig::SPECIFIC_LOG_TAIL_LINES)
    }

    pub fn available_logs(&self, id: u32) -> Result<Vec<LogFileInfo>> {
        self.server(id)?;
        Ok(self.inner.logs.available_logs(id))
    }

    /// The shared installer log.
    pub fn installation_log(&self) -> Result<Vec<String>> {
        self.inner
            .logs
            .tail(&LogStream::Installation, LogConfig::DEFAULT_TAIL_LINES)
    }
}
