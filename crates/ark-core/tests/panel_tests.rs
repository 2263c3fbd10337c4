//! Integration tests for the ArkPanel public interface.
//!
//! These drive a real child process: a shell script named
//! `ShooterGameServer` that loops forever, launched through the generated
//! `start_server.sh`.

use ark_core::install_state::write_markers;
use ark_core::{
    ArkError, ArkPanel, LogQuery, LogStream, MemoryStore, QueryClient, QueryInfo, RuntimeStatus,
    ServerDefinition,
};
use async_trait::async_trait;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::time::{Duration, Instant};
use tempfile::TempDir;

struct FixedQuery;

#[async_trait]
impl QueryClient for FixedQuery {
    async fn query(&self, _host: &str, _port: u16) -> ark_core::Result<QueryInfo> {
        Ok(QueryInfo {
            name: "ARK - The Island".into(),
            map: "TheIsland".into(),
            players: 4,
            max_players: 70,
        })
    }
}

fn island(temp: &TempDir) -> ServerDefinition {
    ServerDefinition {
        id: 1,
        name: "ARK - The Island".into(),
        map: "TheIsland".into(),
        ip: "127.0.0.1".into(),
        game_port: 7777,
        query_port: 27015,
        rcon_port: 32330,
        path: temp.path().join("servers/the-island"),
        enabled: true,
    }
}

fn create_test_panel(temp: &TempDir) -> ArkPanel {
    ArkPanel::builder(temp.path().join("data"))
        .auto_create_dirs(true)
        .with_store(MemoryStore::with_servers(vec![island(temp)]))
        .with_query_client(FixedQuery)
        .build()
        .expect("panel")
}

fn install_fake_server(def: &ServerDefinition) {
    fs::create_dir_all(&def.path).unwrap();
    let exe = def.executable();
    fs::write(&exe, "#!/bin/sh\nwhile true; do sleep 1; done\n").unwrap();
    fs::set_permissions(&exe, fs::Permissions::from_mode(0o755)).unwrap();
    write_markers(def, "preaquatica").unwrap();
}

async fn wait_for_status(panel: &ArkPanel, id: u32, want: RuntimeStatus) -> RuntimeStatus {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let status = panel.status(id).await.unwrap().status;
        if status == want || Instant::now() > deadline {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status_follows_install_start_stop() {
    let temp = TempDir::new().unwrap();
    let panel = create_test_panel(&temp);
    let def = panel.server(1).unwrap().clone();

    assert_eq!(
        panel.status(1).await.unwrap().status,
        RuntimeStatus::NotInstalled
    );

    install_fake_server(&def);
    let offline = panel.status(1).await.unwrap();
    assert_eq!(offline.status, RuntimeStatus::Offline);
    assert!(offline.version.contains("Branch: preaquatica"));
    assert_ne!(offline.install_date, "N/A");

    let launch = panel.start(1).unwrap();
    assert!(launch.script_path.ends_with("start_server.sh"));
    assert!(def.pid_file().exists());

    assert_eq!(
        wait_for_status(&panel, 1, RuntimeStatus::Online).await,
        RuntimeStatus::Online
    );
    let online = panel.status(1).await.unwrap();
    assert_eq!(online.players, 4);
    assert_eq!(online.max_players, 70);
    assert!(panel.is_running(1).unwrap());
    assert!(panel.metrics(1).is_ok());

    let run_log = panel.logs().tail(&LogStream::Run(1), 50).unwrap();
    assert!(run_log.iter().any(|l| l.contains("Game port: 7777")));

    assert!(panel.stop(1).unwrap() >= 1);
    assert!(!def.pid_file().exists());
    assert_eq!(
        wait_for_status(&panel, 1, RuntimeStatus::Offline).await,
        RuntimeStatus::Offline
    );
}

#[tokio::test]
async fn test_start_without_install_is_rejected() {
    let temp = TempDir::new().unwrap();
    let panel = create_test_panel(&temp);

    assert!(matches!(
        panel.start(1),
        Err(ArkError::NotInstalled { id: 1 })
    ));
    assert!(matches!(
        panel.server_logs(1, &LogQuery::default()),
        Err(ArkError::LogNotFound { .. })
    ));
}

#[tokio::test]
async fn test_specific_log_never_leaks_files() {
    let temp = TempDir::new().unwrap();
    let panel = create_test_panel(&temp);
    panel
        .logs()
        .append(&LogStream::Install(1), "Preparing")
        .unwrap();

    assert!(matches!(
        panel.specific_log(1, "../../etc/passwd"),
        Err(ArkError::Forbidden { .. })
    ));
    assert_eq!(panel.specific_log(1, "install_server_1.log").unwrap().len(), 1);
    assert_eq!(panel.available_logs(1).unwrap().len(), 1);
}
