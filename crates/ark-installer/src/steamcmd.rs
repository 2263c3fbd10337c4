//! SteamCMD invocation.

use ark_core::config::InstallerConfig;
use ark_core::{ArkError, Result, ServerDefinition};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};

pub const TOOL_NAME: &str = "SteamCMD";

/// How to run SteamCMD.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchToolConfig {
    /// Path to `steamcmd.sh`.
    pub steamcmd_path: PathBuf,
    pub app_id: u32,
    /// Branch used when a request names none. Empty or `public` means the
    /// default channel.
    pub default_branch: String,
    /// Run through `sudo -u <user>` when set.
    pub run_as: Option<String>,
    /// Working directory of the tool.
    pub working_dir: PathBuf,
    /// Pause after wiping a directory for force install.
    pub settle_delay: Duration,
    /// Pause after signalling a running server during uninstall.
    pub stop_settle_delay: Duration,
}

impl Default for FetchToolConfig {
    fn default() -> Self {
        Self {
            steamcmd_path: PathBuf::from(InstallerConfig::STEAMCMD_PATH),
            app_id: InstallerConfig::APP_ID,
            default_branch: InstallerConfig::DEFAULT_BRANCH.to_string(),
            run_as: Some(InstallerConfig::RUN_AS_USER.to_string()),
            working_dir: std::env::temp_dir(),
            settle_delay: InstallerConfig::SETTLE_DELAY,
            stop_settle_delay: InstallerConfig::STOP_SETTLE_DELAY,
        }
    }
}

impl FetchToolConfig {
    pub fn new(steamcmd_path: impl Into<PathBuf>) -> Self {
        Self {
            steamcmd_path: steamcmd_path.into(),
            ..Self::default()
        }
    }

    pub fn with_app_id(mut self, app_id: u32) -> Self {
        self.app_id = app_id;
        self
    }

    pub fn with_default_branch(mut self, branch: impl Into<String>) -> Self {
        self.default_branch = branch.into();
        self
    }

    pub fn with_run_as(mut self, user: Option<String>) -> Self {
        self.run_as = user.filter(|u| !u.is_empty());
        self
    }

    pub fn with_working_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_stop_settle_delay(mut self, delay: Duration) -> Self {
        self.stop_settle_delay = delay;
        self
    }

    /// Resolve a requested branch against the default.
    pub fn resolve_branch(&self, requested: Option<&str>) -> String {
        match requested.map(str::trim) {
            Some(branch) if !branch.is_empty() => branch.to_string(),
            _ => self.default_branch.clone(),
        }
    }

    /// SteamCMD arguments for installing or updating into `install_dir`.
    pub fn steamcmd_args(&self, install_dir: &Path, branch: &str) -> Vec<String> {
        let mut args = vec![
            "+@sSteamCmdForcePlatformType".to_string(),
            "linux".to_string(),
            "+force_install_dir".to_string(),
            install_dir.to_string_lossy().into_owned(),
            "+login".to_string(),
            "anonymous".to_string(),
            "+app_update".to_string(),
            self.app_id.to_string(),
        ];
        if !branch.is_empty() && branch != "public" {
            args.push("-beta".to_string());
            args.push(branch.to_string());
        }
        args.push("validate".to_string());
        args.push("+quit".to_string());
        args
    }

    /// Fail early when the tool is not where the config says.
    pub fn ensure_tool(&self) -> Result<()> {
        if self.steamcmd_path.is_file() {
            Ok(())
        } else {
            Err(ArkError::ExternalToolFailure {
                tool: TOOL_NAME.to_string(),
                message: format!("not found at {}", self.steamcmd_path.display()),
            })
        }
    }

    /// Full command for `def`, with stdout and stderr piped.
    pub fn command(&self, def: &ServerDefinition, branch: &str) -> Command {
        let args = self.steamcmd_args(&def.path, branch);
        let mut cmd = match &self.run_as {
            Some(user) => {
                let mut cmd = Command::new("sudo");
                cmd.arg("-u").arg(user).arg(&self.steamcmd_path);
                cmd
            }
            None => Command::new(&self.steamcmd_path),
        };
        cmd.args(args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Printable form of the command, for the operation log.
    pub fn display_command(&self, def: &ServerDefinition, branch: &str) -> String {
        let mut parts = Vec::new();
        if let Some(user) = &self.run_as {
            parts.push(format!("sudo -u {}", user));
        }
        parts.push(self.steamcmd_path.display().to_string());
        parts.extend(self.steamcmd_args(&def.path, branch));
        parts.join(" ")
    }
}

struct LineSource<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> LineSource<R> {
    fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
            buf: Vec::new(),
        }
    }

    /// Cancel safe: partial reads stay in `buf` until the line completes.
    async fn next_line(&mut self) -> io::Result<Option<String>> {
        let n = self.reader.read_until(b'\n', &mut self.buf).await?;
        if n == 0 && self.buf.is_empty() {
            return Ok(None);
        }
        let line = String::from_utf8_lossy(&self.buf)
            .trim_end_matches(['\n', '\r'])
            .to_string();
        self.buf.clear();
        Ok(Some(line))
    }
}

enum Source {
    Stdout,
    Stderr,
}

/// A child's stdout and stderr as one stream of lines, in arrival order.
///
/// Invalid UTF-8 is replaced rather than treated as an error.
pub struct CombinedLines {
    stdout: Option<LineSource<ChildStdout>>,
    stderr: Option<LineSource<ChildStderr>>,
}

impl CombinedLines {
    /// Take the child's pipes.
    pub fn from_child(child: &mut Child) -> Self {
        Self {
            stdout: child.stdout.take().map(LineSource::new),
            stderr: child.stderr.take().map(LineSource::new),
        }
    }

    /// The next line from either pipe; `None` once both are closed.
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        loop {
            let (source, result) = match (self.stdout.as_mut(), self.stderr.as_mut()) {
                (None, None) => return Ok(None),
                (Some(out), None) => (Source::Stdout, out.next_line().await),
                (None, Some(err)) => (Source::Stderr, err.next_line().await),
                (Some(out), Some(err)) => tokio::select! {
                    r = out.next_line() => (Source::Stdout, r),
                    r = err.next_line() => (Source::Stderr, r),
                },
            };

            match result? {
                Some(line) => return Ok(Some(line)),
                None => match source {
                    Source::Stdout => self.stdout = None,
                    Source::Stderr => self.stderr = None,
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_core::registry::DEFAULT_CATALOG;

    fn def() -> ServerDefinition {
        DEFAULT_CATALOG[0].to_definition(Path::new("/srv/ark"))
    }

    #[test]
    fn test_args_with_beta_branch() {
        let config = FetchToolConfig::default();
        let args = config.steamcmd_args(&def().path, "preaquatica");
        assert_eq!(
            args.join(" "),
            "+@sSteamCmdForcePlatformType linux +force_install_dir /srv/ark/the-island \
             +login anonymous +app_update 376030 -beta preaquatica validate +quit"
        );
    }

    #[test]
    fn test_args_without_beta() {
        let config = FetchToolConfig::default();
        for branch in ["", "public"] {
            let args = config.steamcmd_args(&def().path, branch);
            assert!(!args.contains(&"-beta".to_string()));
            assert_eq!(args.last().map(String::as_str), Some("+quit"));
        }
    }

    #[test]
    fn test_resolve_branch() {
        let config = FetchToolConfig::default().with_default_branch("preaquatica");
        assert_eq!(config.resolve_branch(None), "preaquatica");
        assert_eq!(config.resolve_branch(Some("  ")), "preaquatica");
        assert_eq!(config.resolve_branch(Some("public")), "public");
    }

    #[test]
    fn test_display_command_with_sudo() {
        let config = FetchToolConfig::new("/opt/steamcmd/steamcmd.sh")
            .with_run_as(Some("arkserver".into()));
        let shown = config.display_command(&def(), "");
        assert!(shown.starts_with("sudo -u arkserver /opt/steamcmd/steamcmd.sh +@sSteamCmdForcePlatformType"));
    }

    #[test]
    fn test_missing_tool_is_external_failure() {
        let config = FetchToolConfig::new("/nonexistent/steamcmd.sh");
        assert!(matches!(
            config.ensure_tool(),
            Err(ArkError::ExternalToolFailure { .. })
        ));
    }

    #[tokio::test]
    async fn test_combined_lines_reads_both_pipes() {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg("echo out1; echo err1 1>&2; printf 'no-newline'")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();

        let mut lines = CombinedLines::from_child(&mut child);
        let mut seen = Vec::new();
        while let Some(line) = lines.next_line().await.unwrap() {
            seen.push(line);
        }
        child.wait().await.unwrap();

        seen.sort();
        assert_eq!(seen, vec!["err1", "no-newline", "out1"]);
    }
}
