//! SSH transport implementation using russh.

use std::sync::{Arc, Mutex, PoisonError};

use log::debug;
use russh::Channel;
use russh::client::{self, Handle, Msg};
use russh::keys::{PrivateKeyWithHashAlg, PublicKey, load_secret_key};
use secrecy::ExposeSecret;

use super::config::{AuthMethod, HostKeyPolicy, SshConfig};
use crate::error::{Result, TransportError};

/// An authenticated SSH connection to one device.
pub struct SshTransport {
    session: Handle<DeviceHandler>,
    config: SshConfig,
}

impl SshTransport {
    /// Connect to the device and authenticate.
    ///
    /// Both the TCP/SSH handshake and authentication share
    /// `config.connect_timeout`.
    pub async fn connect(config: SshConfig) -> Result<Self> {
        let timeout = config.connect_timeout;
        tokio::time::timeout(timeout, Self::establish(config))
            .await
            .map_err(|_| TransportError::Timeout(timeout))?
    }

    async fn establish(config: SshConfig) -> Result<Self> {
        let russh_config = Arc::new(client::Config {
            inactivity_timeout: None,
            keepalive_interval: Some(std::time::Duration::from_secs(15)),
            ..Default::default()
        });

        let rejection: Arc<Mutex<Option<TransportError>>> = Arc::new(Mutex::new(None));
        let handler = DeviceHandler {
            host: config.host.clone(),
            port: config.port,
            policy: config.host_key_policy,
            rejection: rejection.clone(),
        };

        debug!("{}: opening SSH connection on port {}", config.host, config.port);
        let address = (config.host.as_str(), config.port);
        let mut session = client::connect(russh_config, address, handler)
            .await
            .map_err(|e| {
                rejection
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take()
                    .unwrap_or(TransportError::Ssh(e))
            })?;

        Self::authenticate(&mut session, &config).await?;
        debug!("{}: authenticated as '{}'", config.host, config.username);

        Ok(Self { session, config })
    }

    /// Open an interactive shell channel with a PTY.
    pub async fn open_shell(&self) -> Result<Channel<Msg>> {
        let channel = self
            .session
            .channel_open_session()
            .await
            .map_err(TransportError::Ssh)?;

        channel
            .request_pty(
                true,
                "vt100",
                self.config.terminal_width,
                self.config.terminal_height,
                0,
                0,
                &[],
            )
            .await
            .map_err(TransportError::Ssh)?;

        channel
            .request_shell(true)
            .await
            .map_err(TransportError::Ssh)?;

        Ok(channel)
    }

    async fn authenticate(session: &mut Handle<DeviceHandler>, config: &SshConfig) -> Result<()> {
        let success = match &config.auth {
            AuthMethod::Password(password) => session
                .authenticate_password(&config.username, password.expose_secret())
                .await
                .map_err(TransportError::Ssh)?
                .success(),
            AuthMethod::PrivateKey { path, passphrase } => {
                let key = load_secret_key(path, passphrase.as_ref().map(|p| p.expose_secret()))
                    .map_err(|e| TransportError::Key(e.to_string()))?;

                let hash_alg = session
                    .best_supported_rsa_hash()
                    .await
                    .map_err(TransportError::Ssh)?
                    .flatten();

                session
                    .authenticate_publickey(
                        &config.username,
                        PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg),
                    )
                    .await
                    .map_err(TransportError::Ssh)?
                    .success()
            }
        };

        if !success {
            return Err(TransportError::AuthenticationFailed {
                user: config.username.clone(),
            }
            .into());
        }

        Ok(())
    }

    /// Disconnect from the device.
    pub async fn close(self) -> Result<()> {
        self.session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
            .map_err(TransportError::Ssh)?;
        Ok(())
    }
}

/// russh client handler; only host key checking is customised.
struct DeviceHandler {
    host: String,
    port: u16,
    policy: HostKeyPolicy,
    /// Detailed rejection reason, surfaced by `connect` in place of the
    /// generic `russh::Error::UnknownKey`.
    rejection: Arc<Mutex<Option<TransportError>>>,
}

impl DeviceHandler {
    fn reject(&self, reason: String) -> bool {
        *self.rejection.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(TransportError::HostKeyRejected {
                host: self.host.clone(),
                port: self.port,
                reason,
            });
        false
    }
}

impl client::Handler for DeviceHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        match self.policy {
            HostKeyPolicy::AcceptAny => Ok(true),
            HostKeyPolicy::KnownHosts => {
                match russh::keys::check_known_hosts(&self.host, self.port, server_public_key) {
                    Ok(true) => Ok(true),
                    Ok(false) => Ok(self.reject("host not in known_hosts".to_string())),
                    Err(e) => Ok(self.reject(e.to_string())),
                }
            }
        }
    }
}
