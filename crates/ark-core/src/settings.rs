//! Runtime settings for a server.
//!
//! Settings are stored twice: as `GameUserSettings.ini`, which the game
//! reads, and as a JSON sidecar, which the panel reads back when it
//! regenerates the launch script. The INI is write-only from the panel's
//! point of view.

use crate::atomic::{atomic_read_json, atomic_write_json};
use crate::config::PathsConfig;
use crate::registry::ServerDefinition;
use crate::{ArkError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";
pub const DEFAULT_MAX_PLAYERS: u32 = 70;

/// Session, difficulty and multiplier settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServerSettings {
    pub session_name: String,
    pub server_password: String,
    pub server_admin_password: String,
    pub max_players: u32,
    pub difficulty_offset: f64,
    pub day_cycle_speed_scale: f64,
    pub night_time_speed_scale: f64,
    pub dino_damage_multiplier: f64,
    pub player_damage_multiplier: f64,
    pub structure_damage_multiplier: f64,
    pub player_resistance_multiplier: f64,
    pub dino_resistance_multiplier: f64,
}

impl ServerSettings {
    pub fn defaults_for(def: &ServerDefinition) -> Self {
        Self {
            session_name: def.name.clone(),
            server_password: String::new(),
            server_admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
            max_players: DEFAULT_MAX_PLAYERS,
            difficulty_offset: 1.0,
            day_cycle_speed_scale: 1.0,
            night_time_speed_scale: 1.0,
            dino_damage_multiplier: 1.0,
            player_damage_multiplier: 1.0,
            structure_damage_multiplier: 1.0,
            player_resistance_multiplier: 1.0,
            dino_resistance_multiplier: 1.0,
        }
    }

    /// Reject values that would break the INI or launch URL.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("SessionName", &self.session_name),
            ("ServerPassword", &self.server_password),
            ("ServerAdminPassword", &self.server_admin_password),
        ] {
            if value.contains(['\n', '\r', '?']) {
                return Err(ArkError::Validation {
                    field: field.to_string(),
                    message: "must not contain line breaks or '?'".to_string(),
                });
            }
        }
        if self.max_players == 0 {
            return Err(ArkError::Validation {
                field: "MaxPlayers".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Render `GameUserSettings.ini`.
    pub fn render_ini(&self) -> String {
        let mut out = String::from("[ServerSettings]\n");
        let _ = writeln!(out, "SessionName={}", self.session_name);
        let _ = writeln!(out, "ServerPassword={}", self.server_password);
        let _ = writeln!(out, "ServerAdminPassword={}", self.server_admin_password);
        let _ = writeln!(out, "MaxPlayers={}", self.max_players);
        for (key, value) in [
            ("DifficultyOffset", self.difficulty_offset),
            ("DayCycleSpeedScale", self.day_cycle_speed_scale),
            ("NightTimeSpeedScale", self.night_time_speed_scale),
            ("DinoDamageMultiplier", self.dino_damage_multiplier),
            ("PlayerDamageMultiplier", self.player_damage_multiplier),
            ("StructureDamageMultiplier", self.structure_damage_multiplier),
            ("PlayerResistanceMultiplier", self.player_resistance_multiplier),
            ("DinoResistanceMultiplier", self.dino_resistance_multiplier),
        ] {
            let _ = writeln!(out, "{}={:?}", key, value);
        }
        out.push_str("[/Script/ShooterGame.ShooterGameMode]\n");
        out.push_str("bAllowUnlimitedRespecs=true\n");
        out
    }
}

/// Partial update; absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SettingsPatch {
    pub session_name: Option<String>,
    pub server_password: Option<String>,
    pub server_admin_password: Option<String>,
    pub max_players: Option<u32>,
    pub difficulty_offset: Option<f64>,
    pub day_cycle_speed_scale: Option<f64>,
    pub night_time_speed_scale: Option<f64>,
    pub dino_damage_multiplier: Option<f64>,
    pub player_damage_multiplier: Option<f64>,
    pub structure_damage_multiplier: Option<f64>,
    pub player_resistance_multiplier: Option<f64>,
    pub dino_resistance_multiplier: Option<f64>,
}

impl SettingsPatch {
    pub fn apply(self, base: ServerSettings) -> ServerSettings {
        ServerSettings {
            session_name: self.session_name.unwrap_or(base.session_name),
            server_password: self.server_password.unwrap_or(base.server_password),
            server_admin_password: self
                .server_admin_password
                .unwrap_or(base.server_admin_password),
            max_players: self.max_players.unwrap_or(base.max_players),
            difficulty_offset: self.difficulty_offset.unwrap_or(base.difficulty_offset),
            day_cycle_speed_scale: self
                .day_cycle_speed_scale
                .unwrap_or(base.day_cycle_speed_scale),
            night_time_speed_scale: self
                .night_time_speed_scale
                .unwrap_or(base.night_time_speed_scale),
            dino_damage_multiplier: self
                .dino_damage_multiplier
                .unwrap_or(base.dino_damage_multiplier),
            player_damage_multiplier: self
                .player_damage_multiplier
                .unwrap_or(base.player_damage_multiplier),
            structure_damage_multiplier: self
                .structure_damage_multiplier
                .unwrap_or(base.structure_damage_multiplier),
            player_resistance_multiplier: self
                .player_resistance_multiplier
                .unwrap_or(base.player_resistance_multiplier),
            dino_resistance_multiplier: self
                .dino_resistance_multiplier
                .unwrap_or(base.dino_resistance_multiplier),
        }
    }
}

/// Saved settings, or defaults when none were saved or the sidecar is
/// unreadable.
pub fn load_settings(def: &ServerDefinition) -> ServerSettings {
    let sidecar = def.settings_sidecar();
    match atomic_read_json::<ServerSettings>(&sidecar) {
        Ok(Some(settings)) => settings,
        Ok(None) => ServerSettings::defaults_for(def),
        Err(e) => {
            warn!(
                "Ignoring unreadable settings for server {} at {}: {}",
                def.id,
                sidecar.display(),
                e
            );
            ServerSettings::defaults_for(def)
        }
    }
}

/// Write the INI and the sidecar. Returns the INI path.
pub fn save_settings(def: &ServerDefinition, settings: &ServerSettings) -> Result<PathBuf> {
    settings.validate()?;

    let config_dir = def.runtime_config_dir();
    fs::create_dir_all(&config_dir).map_err(|e| ArkError::io_with_path(e, &config_dir))?;

    let ini_path = config_dir.join(PathsConfig::GAME_USER_SETTINGS);
    fs::write(&ini_path, settings.render_ini()).map_err(|e| ArkError::io_with_path(e, &ini_path))?;
    debug!("Wrote {}", ini_path.display());

    atomic_write_json(&def.settings_sidecar(), settings, false)?;
    info!("Saved settings for server {}", def.id);
    Ok(ini_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::DEFAULT_CATALOG;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_follow_server_name() {
        let def = DEFAULT_CATALOG[2].to_definition(std::path::Path::new("/srv"));
        let settings = ServerSettings::defaults_for(&def);
        assert_eq!(settings.session_name, "ARK - Ragnarok");
        assert_eq!(settings.server_admin_password, "admin123");
        assert_eq!(settings.max_players, 70);
    }

    #[test]
    fn test_render_ini() {
        let def = DEFAULT_CATALOG[0].to_definition(std::path::Path::new("/srv"));
        let mut settings = ServerSettings::defaults_for(&def);
        settings.dino_damage_multiplier = 2.5;

        let ini = settings.render_ini();
        assert!(ini.starts_with("[ServerSettings]\nSessionName=ARK - The Island\n"));
        assert!(ini.contains("MaxPlayers=70\n"));
        assert!(ini.contains("DifficultyOffset=1.0\n"));
        assert!(ini.contains("DinoDamageMultiplier=2.5\n"));
        assert!(ini.ends_with("[/Script/ShooterGame.ShooterGameMode]\nbAllowUnlimitedRespecs=true\n"));
    }

    #[test]
    fn test_patch_keeps_unset_fields() {
        let def = DEFAULT_CATALOG[0].to_definition(std::path::Path::new("/srv"));
        let patch: SettingsPatch =
            serde_json::from_str(r#"{"MaxPlayers": 20, "ServerPassword": "secret"}"#).unwrap();
        let merged = patch.apply(ServerSettings::defaults_for(&def));
        assert_eq!(merged.max_players, 20);
        assert_eq!(merged.server_password, "secret");
        assert_eq!(merged.session_name, "ARK - The Island");
    }

    #[test]
    fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let def = DEFAULT_CATALOG[0].to_definition(temp.path());
        assert_eq!(load_settings(&def), ServerSettings::defaults_for(&def));

        let mut settings = ServerSettings::defaults_for(&def);
        settings.session_name = "Tribe Night".into();
        let ini = save_settings(&def, &settings).unwrap();

        assert!(ini.ends_with("ShooterGame/Saved/Config/LinuxServer/GameUserSettings.ini"));
        assert!(fs::read_to_string(&ini).unwrap().contains("SessionName=Tribe Night"));
        assert_eq!(load_settings(&def), settings);
    }

    #[test]
    fn test_validation_rejects_line_breaks() {
        let def = DEFAULT_CATALOG[0].to_definition(std::path::Path::new("/srv"));
        let mut settings = ServerSettings::defaults_for(&def);
        settings.session_name = "evil\n[ServerSettings]".into();
        assert!(matches!(
            settings.validate(),
            Err(ArkError::Validation { .. })
        ));
    }
}
