use std::io;

use openssh_sftp_client::error::SftpErrorKind;
use thiserror::Error;

/// Errors surfaced by the connection manager and its backends
#[derive(Error, Debug)]
pub enum SftpError {
    /// The session configuration is incomplete or inconsistent
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Credentials were rejected or the private key could not be parsed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The server could not be reached within the connect timeout
    #[error("Failed to dial {address}: {reason}")]
    Dial { address: String, reason: String },

    /// The SFTP subsystem could not be started on top of the transport
    #[error("Failed to start SFTP subsystem: {0}")]
    ProtocolInit(String),

    #[error("Remote path not found: {0}")]
    NotFound(String),

    #[error("SFTP protocol error: {0}")]
    Protocol(String),

    /// Copying bytes into a remote file was interrupted
    #[error("Write to {path} failed after {bytes_copied} bytes: {source}")]
    Write {
        path: String,
        bytes_copied: u64,
        source: io::Error,
    },

    /// Copying bytes out of a remote file was interrupted
    #[error("Read from {path} failed: {source}")]
    Read { path: String, source: io::Error },

    #[error("Local I/O error on {path}: {source}")]
    LocalIo { path: String, source: io::Error },

    /// The manager was closed and will not reconnect
    #[error("Connection manager is closed")]
    Closed,
}

impl SftpError {
    /// Maps an SFTP client error for `path` onto the taxonomy.
    pub(crate) fn from_sftp(path: &str, err: openssh_sftp_client::Error) -> Self {
        match err {
            openssh_sftp_client::Error::SftpError(SftpErrorKind::NoSuchFile, _) => {
                SftpError::NotFound(path.to_string())
            }
            other => SftpError::Protocol(format!("{path}: {other}")),
        }
    }

    pub(crate) fn dial(address: &str, reason: impl ToString) -> Self {
        SftpError::Dial {
            address: address.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn local(path: impl AsRef<std::path::Path>, source: io::Error) -> Self {
        SftpError::LocalIo {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// True for errors raised while establishing a session
    pub fn is_connect_error(&self) -> bool {
        matches!(
            self,
            SftpError::Auth(_) | SftpError::Dial { .. } | SftpError::ProtocolInit(_)
        )
    }
}
