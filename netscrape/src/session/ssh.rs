//! SSH-backed device sessions.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, trace, warn};
use secrecy::{ExposeSecret, SecretString};

use super::platform::DevicePlatform;
use super::response::Response;
use super::transcript::SessionLog;
use super::{DeviceSession, SessionConnector};
use crate::channel::ShellChannel;
use crate::error::{Result, SessionError};
use crate::inventory::DeviceTarget;
use crate::transport::{AuthMethod, HostKeyPolicy, SshConfig, SshTransport};

/// Connection parameters shared by every device in a run.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub port: u16,
    pub username: String,
    pub auth: AuthMethod,
    /// Secret for the enable prompt; the login password is tried when unset.
    pub enable_password: Option<SecretString>,
    pub connect_timeout: Duration,
    pub command_timeout: Duration,
    pub host_key_policy: HostKeyPolicy,
    /// Bytes from the end of the output searched for the prompt.
    pub search_depth: usize,
    pub platform: DevicePlatform,
    /// Directory for per-device `log_<host>.txt` transcripts.
    pub session_log_dir: Option<PathBuf>,
}

impl SessionSettings {
    /// Settings with the defaults used by the CLI.
    pub fn new(username: impl Into<String>, auth: AuthMethod) -> Self {
        Self {
            port: 22,
            username: username.into(),
            auth,
            enable_password: None,
            connect_timeout: Duration::from_secs(30),
            command_timeout: Duration::from_secs(60),
            host_key_policy: HostKeyPolicy::default(),
            search_depth: 1000,
            platform: DevicePlatform::default(),
            session_log_dir: None,
        }
    }

    fn ssh_config(&self, host: &str) -> SshConfig {
        SshConfig {
            host: host.to_string(),
            port: self.port,
            username: self.username.clone(),
            auth: self.auth.clone(),
            connect_timeout: self.connect_timeout,
            terminal_width: 511,
            terminal_height: 24,
            host_key_policy: self.host_key_policy,
        }
    }

    fn session_log(&self, host: &str) -> Option<SessionLog> {
        let dir = self.session_log_dir.as_deref()?;
        match SessionLog::create(dir, host) {
            Ok(log) => {
                debug!("{}: session log at {}", host, log.path().display());
                Some(log)
            }
            Err(e) => {
                warn!("{}: cannot create session log in {}: {}", host, dir.display(), e);
                None
            }
        }
    }

    fn enable_secret(&self) -> Option<&SecretString> {
        self.enable_password.as_ref().or(match &self.auth {
            AuthMethod::Password(password) => Some(password),
            AuthMethod::PrivateKey { .. } => None,
        })
    }
}

/// Opens [`SshSession`]s using shared [`SessionSettings`].
#[derive(Debug, Clone)]
pub struct SshConnector {
    settings: Arc<SessionSettings>,
}

impl SshConnector {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            settings: Arc::new(settings),
        }
    }
}

impl SessionConnector for SshConnector {
    type Session = SshSession;

    async fn connect(&self, target: &DeviceTarget) -> Result<SshSession> {
        let settings = self.settings.clone();
        let transport = SshTransport::connect(settings.ssh_config(&target.host)).await?;
        let channel = transport.open_shell().await?;

        let mut session = SshSession {
            host: target.host.clone(),
            transport,
            shell: ShellChannel::new(channel, settings.search_depth),
            transcript: settings.session_log(&target.host),
            settings,
            prompt: String::new(),
        };

        // Login banner and first prompt
        let banner = session
            .shell
            .read_until(&session.settings.platform.prompt, session.settings.command_timeout)
            .await?;
        session.log(&banner);
        session.prompt = last_line(&banner);
        debug!("{}: initial prompt {:?}", session.host, session.prompt);

        Ok(session)
    }
}

/// An interactive SSH shell on one device.
pub struct SshSession {
    host: String,
    transport: SshTransport,
    shell: ShellChannel,
    settings: Arc<SessionSettings>,
    transcript: Option<SessionLog>,
    /// Most recently seen prompt.
    prompt: String,
}

impl SshSession {
    fn platform(&self) -> &DevicePlatform {
        &self.settings.platform
    }

    fn log(&mut self, data: &[u8]) {
        if let Some(transcript) = self.transcript.as_mut() {
            transcript.record(data);
        }
    }

    fn is_privileged(&self) -> bool {
        self.platform()
            .privileged_prompt
            .is_match(self.prompt.as_bytes())
    }
}

impl DeviceSession for SshSession {
    async fn enable(&mut self) -> Result<()> {
        if self.is_privileged() {
            return Ok(());
        }

        let timeout = self.settings.command_timeout;
        let settings = self.settings.clone();
        let platform = &settings.platform;

        self.shell.discard_pending();
        self.shell.write_line(&platform.enable_command).await?;

        let password_or_prompt = regex::bytes::Regex::new(&format!(
            "(?:{})|(?:{})",
            platform.enable_password_prompt.as_str(),
            platform.prompt.as_str()
        ))
        .map_err(|e| SessionError::InvalidConfig {
            message: e.to_string(),
        })?;

        let mut output = self.shell.read_until(&password_or_prompt, timeout).await?;
        self.log(&output);
        if platform.enable_password_prompt.is_match(&output)
            && !platform.prompt.is_match(&output)
        {
            let secret = settings.enable_secret().map(|s| s.expose_secret()).unwrap_or("");
            self.shell.write_line(secret).await?;
            output = self.shell.read_until(&platform.prompt, timeout).await?;
            self.log(&output);
        }

        self.prompt = last_line(&output);
        if !self.is_privileged() {
            return Err(SessionError::EnableFailed {
                host: self.host.clone(),
                prompt: self.prompt.clone(),
            }
            .into());
        }

        debug!("{}: privileged prompt {:?}", self.host, self.prompt);
        Ok(())
    }

    fn prime_commands(&self) -> Vec<String> {
        self.platform().prime_commands.clone()
    }

    async fn send_command(&mut self, command: &str) -> Result<Response> {
        let start = Instant::now();

        self.shell.discard_pending();
        self.shell.write_line(command).await?;
        let data = self
            .shell
            .read_until(&self.settings.platform.prompt, self.settings.command_timeout)
            .await?;

        let elapsed = start.elapsed();
        self.log(&data);
        let raw = String::from_utf8_lossy(&data);
        trace!("{}: raw output of {:?}:\n{}", self.host, command, raw);

        self.prompt = last_line(&data);
        let result = self.platform().normalize_output(&raw, command);
        let response = Response::new(command, result, self.prompt.clone(), elapsed);

        match self.platform().detect_failure(&response.result) {
            Some(pattern) => {
                let pattern = pattern.to_string();
                Ok(response.with_failure(pattern))
            }
            None => Ok(response),
        }
    }

    async fn disconnect(mut self) -> Result<()> {
        debug!("{}: disconnecting", self.host);
        if let Some(transcript) = self.transcript.as_mut() {
            transcript.flush();
        }
        // Some ERS releases drop the TCP connection as soon as the channel
        // closes, so a channel-close failure is not worth reporting.
        let _ = self.shell.close().await;
        self.transport.close().await
    }
}

/// The last non-empty line of shell output, trimmed.
fn last_line(data: &[u8]) -> String {
    String::from_utf8_lossy(data)
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_line() {
        assert_eq!(last_line(b"banner\r\n\r\nERS-4850GTS-PWR+> "), "ERS-4850GTS-PWR+>");
        assert_eq!(last_line(b""), "");
    }

    #[test]
    fn test_enable_secret_falls_back_to_login_password() {
        let settings = SessionSettings::new(
            "admin",
            AuthMethod::Password(SecretString::from("login".to_string())),
        );
        assert_eq!(settings.enable_secret().map(|s| s.expose_secret()), Some("login"));

        let settings = SessionSettings {
            enable_password: Some(SecretString::from("enable".to_string())),
            ..settings
        };
        assert_eq!(settings.enable_secret().map(|s| s.expose_secret()), Some("enable"));
    }

    #[test]
    fn test_session_log_only_when_configured() {
        let settings = SessionSettings::new(
            "admin",
            AuthMethod::Password(SecretString::from("pw".to_string())),
        );
        assert!(settings.session_log("sw-1").is_none());

        let dir = tempfile::tempdir().unwrap();
        let settings = SessionSettings {
            session_log_dir: Some(dir.path().to_path_buf()),
            ..settings
        };
        let log = settings.session_log("sw-1").unwrap();
        assert!(log.path().is_file());

        let settings = SessionSettings {
            session_log_dir: Some(dir.path().join("absent")),
            ..settings
        };
        assert!(settings.session_log("sw-1").is_none());
    }

    #[test]
    fn test_ssh_config_uses_host() {
        let settings = SessionSettings::new(
            "admin",
            AuthMethod::Password(SecretString::from("pw".to_string())),
        );
        let config = settings.ssh_config("10.1.1.1");
        assert_eq!(config.host, "10.1.1.1");
        assert_eq!(config.port, 22);
        assert_eq!(config.username, "admin");
    }
}
