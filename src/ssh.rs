use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use russh::client::{self, AuthResult, Config, Handle, Handler};
use russh::keys::{HashAlg, PrivateKeyWithHashAlg, PublicKey, decode_secret_key};
use russh::{Disconnect, Preferred, kex};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::client::SftpClient;
use crate::config::{AuthMethod, SessionConfig};
use crate::error::SftpError;
use crate::transport::{Connector, Transport};

/// Key-exchange algorithms that may be named in a session config
const SUPPORTED_KEX: &[kex::Name] = &[
    kex::CURVE25519,
    kex::CURVE25519_PRE_RFC_8731,
    kex::ECDH_SHA2_NISTP256,
    kex::ECDH_SHA2_NISTP384,
    kex::ECDH_SHA2_NISTP521,
    kex::DH_G16_SHA512,
    kex::DH_G14_SHA256,
    kex::DH_GEX_SHA256,
    kex::DH_GEX_SHA1,
    kex::DH_G14_SHA1,
    kex::DH_G1_SHA1,
];

/// Maps configured algorithm names onto russh identifiers, keeping their order.
///
/// An empty list resolves to an empty list, meaning "use the russh defaults".
pub fn resolve_key_exchanges(names: &[String]) -> Result<Vec<kex::Name>, SftpError> {
    names
        .iter()
        .map(|name| {
            SUPPORTED_KEX
                .iter()
                .find(|kex| AsRef::<str>::as_ref(*kex) == name.as_str())
                .copied()
                .ok_or_else(|| SftpError::Config(format!("unsupported key exchange algorithm '{name}'")))
        })
        .collect()
}

fn client_config(config: &SessionConfig) -> Result<Config, SftpError> {
    let mut algorithms = resolve_key_exchanges(config.key_exchanges())?;
    let preferred = if algorithms.is_empty() {
        Preferred::default()
    } else {
        // extension negotiation markers are not real algorithms and must stay advertised
        algorithms.push(kex::EXTENSION_SUPPORT_AS_CLIENT);
        algorithms.push(kex::EXTENSION_OPENSSH_STRICT_KEX_AS_CLIENT);
        Preferred {
            kex: Cow::Owned(algorithms),
            ..Preferred::default()
        }
    };

    Ok(Config {
        preferred,
        inactivity_timeout: None,
        ..Default::default()
    })
}

/// Parses the configured credentials into something russh can authenticate with
enum Credentials {
    Key(PrivateKeyWithHashAlg),
    Password(String),
}

impl Credentials {
    fn resolve(config: &SessionConfig) -> Result<Self, SftpError> {
        match config.auth_method() {
            AuthMethod::PrivateKey(key) => {
                let key = decode_secret_key(key.pem(), key.passphrase())
                    .map_err(|e| SftpError::Auth(format!("cannot parse private key: {e}")))?;
                // ED25519 and ECDSA keys use their native signing algorithms
                let hash_alg = if key.algorithm().is_rsa() {
                    Some(HashAlg::Sha512)
                } else {
                    None
                };
                Ok(Credentials::Key(PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg)))
            }
            AuthMethod::Password(password) => Ok(Credentials::Password(password.to_string())),
        }
    }

    fn method_name(&self) -> &'static str {
        match self {
            Credentials::Key(_) => "publickey",
            Credentials::Password(_) => "password",
        }
    }
}

/// russh callbacks for one connection
pub(crate) struct SessionHandler {
    address: String,
    expected_fingerprint: Option<String>,
}

impl Handler for SessionHandler {
    type Error = russh::Error;

    fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send {
        let fingerprint = server_public_key.fingerprint(HashAlg::Sha256).to_string();
        let accepted = match &self.expected_fingerprint {
            Some(expected) if *expected == fingerprint => {
                debug!("Host key for {} matches pinned fingerprint", self.address);
                true
            }
            Some(expected) => {
                warn!(
                    "Host key mismatch for {}: expected {}, got {}",
                    self.address, expected, fingerprint
                );
                false
            }
            None => {
                warn!(
                    "Accepting unpinned host key for {} ({})",
                    self.address, fingerprint
                );
                true
            }
        };
        async move { Ok(accepted) }
    }
}

/// Dials SSH servers with russh
#[derive(Debug, Default, Clone, Copy)]
pub struct SshConnector;

impl SshConnector {
    async fn handshake(
        config: &SessionConfig,
        ssh_config: Arc<Config>,
        credentials: Credentials,
    ) -> Result<Handle<SessionHandler>, SftpError> {
        let address = config.address();
        let stream = TcpStream::connect(address)
            .await
            .map_err(|e| SftpError::dial(address, e))?;

        let handler = SessionHandler {
            address: address.to_string(),
            expected_fingerprint: config.host_key_fingerprint().map(str::to_string),
        };
        let mut handle = client::connect_stream(ssh_config, stream, handler)
            .await
            .map_err(|e| SftpError::dial(address, format!("SSH handshake failed: {e}")))?;

        let method = credentials.method_name();
        let result = match credentials {
            Credentials::Key(key) => handle.authenticate_publickey(config.username(), key).await,
            Credentials::Password(password) => {
                handle.authenticate_password(config.username(), password).await
            }
        }
        .map_err(|e| SftpError::Auth(format!("{method} authentication error: {e}")))?;

        match result {
            AuthResult::Success => Ok(handle),
            AuthResult::Failure { .. } => Err(SftpError::Auth(format!(
                "{method} authentication rejected for user {}",
                config.username()
            ))),
        }
    }
}

impl Connector for SshConnector {
    type Transport = SshTransport;

    async fn dial(&self, config: &SessionConfig) -> Result<SshTransport, SftpError> {
        let credentials = Credentials::resolve(config)?;
        let ssh_config = Arc::new(client_config(config)?);
        let address = config.address();

        info!(
            "Connecting to {}@{} using {} auth",
            config.username(),
            address,
            credentials.method_name()
        );
        let handle = timeout(
            config.connect_timeout(),
            Self::handshake(config, ssh_config, credentials),
        )
        .await
        .map_err(|_| {
            SftpError::dial(
                address,
                format!("timed out after {:?}", config.connect_timeout()),
            )
        })??;
        info!("SSH session established with {}", address);

        Ok(SshTransport {
            handle,
            address: address.to_string(),
            probe_timeout: config.connect_timeout(),
        })
    }
}

/// Authenticated russh session
pub struct SshTransport {
    handle: Handle<SessionHandler>,
    address: String,
    probe_timeout: Duration,
}

/// Waits for the server's answer to a keepalive request for at most `limit`
async fn await_pong<F>(pong: F, limit: Duration, address: &str) -> Result<(), SftpError>
where
    F: Future<Output = Result<(), russh::Error>>,
{
    match timeout(limit, pong).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(SftpError::Protocol(format!(
            "keepalive to {address} failed: {e}"
        ))),
        Err(_) => Err(SftpError::Protocol(format!(
            "no keepalive reply from {address} within {limit:?}"
        ))),
    }
}

impl Transport for SshTransport {
    type Transfer = SftpClient;

    async fn probe(&mut self) -> Result<(), SftpError> {
        if self.handle.is_closed() {
            return Err(SftpError::Protocol(format!(
                "transport to {} is closed",
                self.address
            )));
        }
        // send_ping resolves once the server answers the global request
        await_pong(self.handle.send_ping(), self.probe_timeout, &self.address).await?;
        // a session task that died mid-wait also resolves the ping
        if self.handle.is_closed() {
            return Err(SftpError::Protocol(format!(
                "transport to {} closed during keepalive",
                self.address
            )));
        }
        Ok(())
    }

    async fn open_transfer(&mut self) -> Result<SftpClient, SftpError> {
        debug!("Opening SFTP subsystem on {}", self.address);
        let channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| SftpError::ProtocolInit(format!("cannot open session channel: {e}")))?;
        channel
            .request_subsystem(true, "sftp")
            .await
            .map_err(|e| SftpError::ProtocolInit(format!("sftp subsystem request failed: {e}")))?;

        let (reader, writer) = tokio::io::split(channel.into_stream());
        SftpClient::start(writer, reader).await
    }

    async fn close(self) -> Result<(), SftpError> {
        debug!("Disconnecting from {}", self.address);
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(|e| SftpError::Protocol(format!("disconnect from {} failed: {e}", self.address)))
    }
}
