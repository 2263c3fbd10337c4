//! Launch script generation.

use crate::error::{ArkError, Result};
use crate::platform;
use crate::registry::ServerDefinition;
use crate::settings::ServerSettings;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Generator for `<path>/start_server.sh`.
pub struct LaunchScriptGenerator<'a> {
    def: &'a ServerDefinition,
    settings: &'a ServerSettings,
}

impl<'a> LaunchScriptGenerator<'a> {
    pub fn new(def: &'a ServerDefinition, settings: &'a ServerSettings) -> Self {
        Self { def, settings }
    }

    /// Write the script and mark it executable.
    pub fn generate(&self) -> Result<PathBuf> {
        let script_path = self.def.launch_script();
        fs::write(&script_path, self.render()).map_err(|e| ArkError::Io {
            message: "write launch script".to_string(),
            path: Some(script_path.clone()),
            source: Some(e),
        })?;
        platform::set_executable(&script_path)?;

        debug!("Generated launch script: {}", script_path.display());
        Ok(script_path)
    }

    /// The game URL: `<map>?listen?SessionName=..?ServerPassword=..?...`.
    pub fn launch_url(&self) -> String {
        format!(
            "{}?listen?SessionName={}?ServerPassword={}?ServerAdminPassword={}?MaxPlayers={}",
            self.def.map,
            self.settings.session_name,
            self.settings.server_password,
            self.settings.server_admin_password,
            self.settings.max_players
        )
    }

    pub fn render(&self) -> String {
        let def = self.def;
        let dir = shell_quote(&def.path.to_string_lossy());
        let exe = shell_quote(&def.executable().to_string_lossy());
        let name = shell_quote(&def.name);

        format!(
            r#"#!/bin/bash
# Generated by the ARK server panel. Regenerated on every start.

cd {dir} || {{
    echo "ERROR: cannot enter directory "{dir}
    exit 1
}}

if [ ! -f {exe} ]; then
    echo "ERROR: executable not found at "{exe}
    echo "Check that the server was installed for Linux."
    exit 1
fi

chmod +x {exe}

echo "Starting ARK server: "{name}
echo "Map: "{map}
echo "Game port: {game_port}"
echo "Query port: {query_port}"
echo "RCON port: {rcon_port}"

exec {exe} {url} \
  -server \
  -log \
  -Port={game_port} \
  -QueryPort={query_port} \
  -RCONPort={rcon_port}
"#,
            dir = dir,
            exe = exe,
            name = name,
            map = shell_quote(&def.map),
            game_port = def.game_port,
            query_port = def.query_port,
            rcon_port = def.rcon_port,
            url = shell_quote(&self.launch_url()),
        )
    }
}

/// Quote for a double-quoted bash word.
pub fn shell_quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if matches!(c, '\\' | '"' | '$' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::DEFAULT_CATALOG;
    use tempfile::TempDir;

    #[test]
    fn test_shell_quote_escapes_specials() {
        assert_eq!(shell_quote("plain"), "\"plain\"");
        assert_eq!(shell_quote("a\"b$c`d\\e"), "\"a\\\"b\\$c\\`d\\\\e\"");
    }

    #[test]
    fn test_render_script() {
        let def = DEFAULT_CATALOG[0].to_definition(std::path::Path::new("/srv/ark"));
        let settings = ServerSettings::defaults_for(&def);
        let script = LaunchScriptGenerator::new(&def, &settings).render();

        assert!(script.starts_with("#!/bin/bash\n"));
        assert!(script.contains("cd \"/srv/ark/the-island\" || {"));
        assert!(script.contains("exit 1"));
        assert!(script.contains(
            "exec \"/srv/ark/the-island/ShooterGameServer\" \"TheIsland?listen?SessionName=ARK - The Island?ServerPassword=?ServerAdminPassword=admin123?MaxPlayers=70\""
        ));
        assert!(script.contains("-Port=7777"));
        assert!(script.contains("-QueryPort=27015"));
        assert!(script.contains("-RCONPort=32330"));
        assert!(script.contains("echo \"Map: \"\"TheIsland\""));
    }

    #[test]
    fn test_render_quotes_map() {
        let mut def = DEFAULT_CATALOG[0].to_definition(std::path::Path::new("/srv/ark"));
        def.map = "Island\"; rm -rf $HOME; \"".into();
        let settings = ServerSettings::defaults_for(&def);
        let script = LaunchScriptGenerator::new(&def, &settings).render();

        assert!(script.contains("echo \"Map: \"\"Island\\\"; rm -rf \\$HOME; \\\"\""));
        assert!(!script.contains("Map: Island\"; rm"));
    }

    #[test]
    fn test_generate_writes_executable() {
        let temp = TempDir::new().unwrap();
        let def = DEFAULT_CATALOG[1].to_definition(temp.path());
        fs::create_dir_all(&def.path).unwrap();
        let settings = ServerSettings::defaults_for(&def);

        let path = LaunchScriptGenerator::new(&def, &settings).generate().unwrap();
        assert_eq!(path, def.launch_script());
        assert!(platform::is_executable(&path));
    }
}
