//! Run configuration: an optional TOML file overlaid by command-line flags.
//!
//! ```toml
//! routers = "Router.txt"
//! switches = "Switch.txt"
//! username = "admin"
//! password = "secret"
//! format = "xlsx"
//! concurrency = 50
//! ping = false
//! command_timeout = 90
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};

use crate::cli::Cli;
use crate::coordinator::DEFAULT_CONCURRENCY;
use crate::error::ConfigError;
use crate::export::ExportFormat;
use crate::liveness::DEFAULT_PROBE_CONCURRENCY;
use crate::session::SessionSettings;
use crate::transport::{AuthMethod, HostKeyPolicy};

const DEFAULT_ROUTERS: &str = "Router.txt";
const DEFAULT_SWITCHES: &str = "Switch.txt";

/// Settings read from the TOML file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub routers: Option<PathBuf>,
    pub switches: Option<PathBuf>,
    pub username: Option<String>,
    #[serde(deserialize_with = "secret")]
    pub password: Option<SecretString>,
    #[serde(deserialize_with = "secret")]
    pub enable_password: Option<SecretString>,
    pub private_key: Option<PathBuf>,
    #[serde(deserialize_with = "secret")]
    pub private_key_passphrase: Option<SecretString>,
    pub port: Option<u16>,
    pub output: Option<PathBuf>,
    pub format: Option<ExportFormat>,
    pub concurrency: Option<usize>,
    pub probe_concurrency: Option<usize>,
    pub ping: Option<bool>,
    pub template_dir: Option<PathBuf>,
    pub vrf_snapshot: Option<PathBuf>,
    pub session_log_dir: Option<PathBuf>,
    /// Seconds.
    pub command_timeout: Option<u64>,
    /// Seconds.
    pub connect_timeout: Option<u64>,
    pub strict_host_keys: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub routers: PathBuf,
    pub switches: PathBuf,
    pub session: SessionSettings,
    /// `None` picks a timestamped name in the working directory.
    pub output: Option<PathBuf>,
    pub format: ExportFormat,
    pub concurrency: usize,
    pub probe_concurrency: usize,
    pub ping: bool,
    pub template_dir: Option<PathBuf>,
    pub vrf_snapshot: Option<PathBuf>,
}

impl Settings {
    /// Load the file named by `--config`, if any, and overlay the flags.
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::resolve(cli, file)
    }

    /// Flags win over file values; defaults fill the rest.
    pub fn resolve(cli: Cli, file: FileConfig) -> Result<Self, ConfigError> {
        let username = cli
            .username
            .or(file.username)
            .filter(|u| !u.is_empty())
            .ok_or(ConfigError::Missing("username"))?;

        let password = cli.password.map(SecretString::from).or(file.password);
        let auth = match (cli.private_key.or(file.private_key), password) {
            (Some(path), _) => AuthMethod::PrivateKey {
                path,
                passphrase: file.private_key_passphrase,
            },
            (None, Some(password)) => AuthMethod::Password(password),
            (None, None) => return Err(ConfigError::Missing("password")),
        };

        let mut session = SessionSettings::new(username, auth);
        session.enable_password = cli
            .enable_password
            .map(SecretString::from)
            .or(file.enable_password);
        if let Some(port) = cli.port.or(file.port) {
            session.port = port;
        }
        if let Some(secs) = cli.command_timeout.or(file.command_timeout) {
            session.command_timeout = positive_secs("command_timeout", secs)?;
        }
        if let Some(secs) = cli.connect_timeout.or(file.connect_timeout) {
            session.connect_timeout = positive_secs("connect_timeout", secs)?;
        }
        if cli.strict_host_keys || file.strict_host_keys.unwrap_or(false) {
            session.host_key_policy = HostKeyPolicy::KnownHosts;
        }
        session.session_log_dir = cli.session_log_dir.or(file.session_log_dir);

        Ok(Self {
            routers: cli
                .routers
                .or(file.routers)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ROUTERS)),
            switches: cli
                .switches
                .or(file.switches)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SWITCHES)),
            session,
            output: cli.output.or(file.output),
            format: cli.format.or(file.format).unwrap_or_default(),
            concurrency: positive(
                "concurrency",
                cli.concurrency.or(file.concurrency).unwrap_or(DEFAULT_CONCURRENCY),
            )?,
            probe_concurrency: positive(
                "probe_concurrency",
                cli.probe_concurrency
                    .or(file.probe_concurrency)
                    .unwrap_or(DEFAULT_PROBE_CONCURRENCY),
            )?,
            ping: !cli.no_ping && file.ping.unwrap_or(true),
            template_dir: cli.template_dir.or(file.template_dir),
            vrf_snapshot: cli.vrf_snapshot.or(file.vrf_snapshot),
        })
    }
}

/// Secrets are wrapped as soon as they are read.
fn secret<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<SecretString>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
}

fn positive(field: &'static str, value: usize) -> Result<usize, ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            field,
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(value)
}

fn positive_secs(field: &'static str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::Invalid {
            field,
            reason: "must be at least 1 second".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}
