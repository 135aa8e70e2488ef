use std::fmt;
use std::path::Path;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};

use crate::error::SftpError;
use crate::ssh::resolve_key_exchanges;

/// Connect timeout used when none is configured
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Copy buffer size for uploads and downloads (64KB)
pub const DEFAULT_BUFFER_SIZE: usize = 65_536;

const DEFAULT_PORT: u16 = 22;
const PEM_PREFIX: &str = "-----BEGIN";

fn secret(value: impl Into<String>) -> SecretString {
    SecretString::new(value.into().into_boxed_str())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Private key material held in memory
pub struct PrivateKey {
    pem: SecretString,
    passphrase: Option<SecretString>,
}

impl PrivateKey {
    pub fn pem(&self) -> &str {
        self.pem.expose_secret()
    }

    pub fn passphrase(&self) -> Option<&str> {
        self.passphrase.as_ref().map(|p| p.expose_secret())
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("pem", &"[REDACTED]")
            .field("has_passphrase", &self.passphrase.is_some())
            .finish()
    }
}

/// Authentication method selected from the configured credentials.
/// A private key always wins over a password.
#[derive(Debug, Clone, Copy)]
pub enum AuthMethod<'a> {
    PrivateKey(&'a PrivateKey),
    Password(&'a str),
}

/// Immutable, validated parameters for one remote session
#[derive(Debug)]
pub struct SessionConfig {
    address: String,
    username: String,
    password: Option<SecretString>,
    private_key: Option<PrivateKey>,
    connect_timeout: Duration,
    key_exchanges: Vec<String>,
    host_key_fingerprint: Option<String>,
    buffer_size: usize,
}

impl SessionConfig {
    /// Starts a configuration for `address` (`host:port`) and `username`
    ///
    /// # Example
    ///
    /// ```ignore
    /// let config = SessionConfig::builder("sftp.example.com:22", "deploy")
    ///     .password("hunter2")
    ///     .connect_timeout(Duration::from_secs(5))
    ///     .build()?;
    /// ```
    pub fn builder(address: impl Into<String>, username: impl Into<String>) -> SessionConfigBuilder {
        SessionConfigBuilder {
            address: address.into(),
            username: username.into(),
            password: None,
            private_key: None,
            private_key_passphrase: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            key_exchanges: Vec::new(),
            host_key_fingerprint: None,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Accepted key-exchange algorithm names; empty means the transport defaults
    pub fn key_exchanges(&self) -> &[String] {
        &self.key_exchanges
    }

    /// Expected `SHA256:` host key fingerprint, if pinned
    pub fn host_key_fingerprint(&self) -> Option<&str> {
        self.host_key_fingerprint.as_deref()
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    pub fn auth_method(&self) -> AuthMethod<'_> {
        match (&self.private_key, &self.password) {
            (Some(key), _) => AuthMethod::PrivateKey(key),
            (None, Some(password)) => AuthMethod::Password(password.expose_secret()),
            // build() rejects configs without credentials
            (None, None) => AuthMethod::Password(""),
        }
    }
}

/// Builder for [`SessionConfig`]; validation happens in [`build`](Self::build)
pub struct SessionConfigBuilder {
    address: String,
    username: String,
    password: Option<String>,
    private_key: Option<String>,
    private_key_passphrase: Option<String>,
    connect_timeout: Duration,
    key_exchanges: Vec<String>,
    host_key_fingerprint: Option<String>,
    buffer_size: usize,
}

impl SessionConfigBuilder {
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Private key in PEM / OpenSSH text form
    pub fn private_key(mut self, pem: impl Into<String>) -> Self {
        self.private_key = Some(pem.into());
        self
    }

    pub fn private_key_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.private_key_passphrase = Some(passphrase.into());
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn key_exchanges<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key_exchanges = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn host_key_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.host_key_fingerprint = Some(fingerprint.into());
        self
    }

    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    pub fn build(self) -> Result<SessionConfig, SftpError> {
        validate_address(&self.address)?;
        if self.username.trim().is_empty() {
            return Err(SftpError::Config("username must not be empty".into()));
        }

        let password = non_empty(self.password);
        let private_key = non_empty(self.private_key);
        if password.is_none() && private_key.is_none() {
            return Err(SftpError::Config(
                "either a password or a private key is required".into(),
            ));
        }
        if self.connect_timeout.is_zero() {
            return Err(SftpError::Config("connect timeout must be positive".into()));
        }
        if self.buffer_size == 0 {
            return Err(SftpError::Config("buffer size must be positive".into()));
        }

        let key_exchanges: Vec<String> = self
            .key_exchanges
            .into_iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();
        resolve_key_exchanges(&key_exchanges)?;

        Ok(SessionConfig {
            address: self.address,
            username: self.username,
            password: password.map(secret),
            private_key: private_key.map(|pem| PrivateKey {
                pem: secret(pem),
                passphrase: non_empty(self.private_key_passphrase).map(secret),
            }),
            connect_timeout: self.connect_timeout,
            key_exchanges,
            host_key_fingerprint: non_empty(self.host_key_fingerprint),
            buffer_size: self.buffer_size,
        })
    }
}

fn validate_address(address: &str) -> Result<(), SftpError> {
    let Some((host, port)) = address.rsplit_once(':') else {
        return Err(SftpError::Config(format!(
            "server address '{address}' must be in host:port form"
        )));
    };
    if host.trim().is_empty() {
        return Err(SftpError::Config("server host must not be empty".into()));
    }
    port.parse::<u16>()
        .map_err(|_| SftpError::Config(format!("invalid port '{port}' in '{address}'")))?;
    Ok(())
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(non_empty(Option::<String>::deserialize(deserializer)?).map(secret))
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_remote_path() -> String {
    ".".to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT.as_secs()
}

/// Application settings: where to connect and which remote directory to work in.
///
/// `private_key` may hold either inline PEM text or a path to a key file.
#[derive(Debug, Deserialize)]
pub struct Settings {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub username: String,
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub password: Option<SecretString>,
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub private_key: Option<SecretString>,
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub private_key_passphrase: Option<SecretString>,
    #[serde(default = "default_remote_path")]
    pub remote_path: String,
    #[serde(default = "default_timeout_secs")]
    pub connection_timeout: u64,
    #[serde(default)]
    pub key_exchanges: Vec<String>,
    #[serde(default)]
    pub host_key_fingerprint: Option<String>,
}

impl Settings {
    /// Reads `SFTP_*` variables from the process environment
    pub fn from_env() -> Result<Self, SftpError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads `SFTP_*` variables through `lookup`; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SftpError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| non_empty(lookup(key));
        let required = |key: &str| {
            get(key).ok_or_else(|| SftpError::Config(format!("{key} is not set")))
        };

        let port = match get("SFTP_PORT") {
            Some(port) => port
                .trim()
                .parse()
                .map_err(|_| SftpError::Config(format!("SFTP_PORT '{port}' is not a valid port")))?,
            None => DEFAULT_PORT,
        };
        let connection_timeout = match get("SFTP_CONNECTION_TIMEOUT") {
            Some(secs) => secs.trim().parse().map_err(|_| {
                SftpError::Config(format!("SFTP_CONNECTION_TIMEOUT '{secs}' is not a number of seconds"))
            })?,
            None => default_timeout_secs(),
        };
        let key_exchanges = get("SFTP_KEY_EXCHANGES")
            .map(|list| {
                list.split(',')
                    .map(|name| name.trim().to_string())
                    .filter(|name| !name.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            host: required("SFTP_HOST")?,
            port,
            username: required("SFTP_USERNAME")?,
            password: get("SFTP_PASSWORD").map(secret),
            private_key: get("SFTP_PRIVATE_KEY").map(secret),
            private_key_passphrase: get("SFTP_PRIVATE_KEY_PASSPHRASE").map(secret),
            remote_path: get("SFTP_REMOTE_PATH").unwrap_or_else(default_remote_path),
            connection_timeout,
            key_exchanges,
            host_key_fingerprint: get("SFTP_HOST_KEY_FINGERPRINT"),
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self, SftpError> {
        serde_json::from_str(json).map_err(|e| SftpError::Config(format!("invalid settings JSON: {e}")))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SftpError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| SftpError::local(path, e))?;
        Self::from_json_str(&json)
    }

    /// Server address in `host:port` form
    pub fn address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Builds the validated session configuration, loading the key file if needed
    pub fn session_config(&self) -> Result<SessionConfig, SftpError> {
        let mut builder = SessionConfig::builder(self.address(), self.username.clone())
            .connect_timeout(Duration::from_secs(self.connection_timeout))
            .key_exchanges(self.key_exchanges.iter().cloned());

        if let Some(password) = &self.password {
            builder = builder.password(password.expose_secret());
        }
        if let Some(key) = &self.private_key {
            builder = builder.private_key(load_private_key(key.expose_secret())?);
        }
        if let Some(passphrase) = &self.private_key_passphrase {
            builder = builder.private_key_passphrase(passphrase.expose_secret());
        }
        if let Some(fingerprint) = &self.host_key_fingerprint {
            builder = builder.host_key_fingerprint(fingerprint.clone());
        }
        builder.build()
    }
}

/// Returns inline PEM text unchanged, otherwise reads the key file at `value`
fn load_private_key(value: &str) -> Result<String, SftpError> {
    let trimmed = value.trim_start();
    if trimmed.starts_with(PEM_PREFIX) {
        return Ok(trimmed.to_string());
    }
    std::fs::read_to_string(value)
        .map_err(|e| SftpError::Config(format!("cannot read private key file '{value}': {e}")))
}
