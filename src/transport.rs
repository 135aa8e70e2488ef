//! Backend seams used by the connection manager.
//!
//! A [`Connector`] dials and authenticates a [`Transport`]; the transport opens
//! the [`RemoteFs`] transfer sub-session that file operations run against.
//! The SSH/SFTP implementations live in [`crate::ssh`] and [`crate::client`].

use std::future::Future;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::config::SessionConfig;
use crate::error::SftpError;
use crate::types::RemoteFileInfo;

/// Establishes authenticated transport sessions
pub trait Connector: Send + Sync {
    type Transport: Transport;

    /// Selects the auth method, dials within the configured timeout and authenticates.
    ///
    /// Fails with [`SftpError::Auth`] for unusable credentials and
    /// [`SftpError::Dial`] for network failures or timeouts.
    fn dial(
        &self,
        config: &SessionConfig,
    ) -> impl Future<Output = Result<Self::Transport, SftpError>> + Send;
}

/// An authenticated, encrypted connection to the remote host
pub trait Transport: Send {
    type Transfer: RemoteFs;

    /// Lightweight no-op request that fails when the session has silently dropped
    fn probe(&mut self) -> impl Future<Output = Result<(), SftpError>> + Send;

    /// Starts the file-transfer sub-session on top of this transport
    fn open_transfer(&mut self) -> impl Future<Output = Result<Self::Transfer, SftpError>> + Send;

    fn close(self) -> impl Future<Output = Result<(), SftpError>> + Send;
}

/// File operations offered by a transfer sub-session
pub trait RemoteFs: Send {
    type Reader: AsyncRead + Unpin + Send;
    type Writer: AsyncWrite + Unpin + Send;

    /// Lists `path`, sorted by name, without `.` and `..`
    fn read_dir(&mut self, path: &str) -> impl Future<Output = Result<Vec<RemoteFileInfo>, SftpError>> + Send;

    /// Metadata of `path` itself (symlinks are not followed)
    fn stat(&mut self, path: &str) -> impl Future<Output = Result<RemoteFileInfo, SftpError>> + Send;

    /// Opens `path` for reading from offset 0
    fn open_read(&mut self, path: &str) -> impl Future<Output = Result<Self::Reader, SftpError>> + Send;

    /// Creates a single directory; fails if it already exists
    fn create_dir(&mut self, path: &str) -> impl Future<Output = Result<(), SftpError>> + Send;

    /// Opens `path` for writing with create + truncate semantics
    fn create(&mut self, path: &str) -> impl Future<Output = Result<Self::Writer, SftpError>> + Send;

    fn close(self) -> impl Future<Output = Result<(), SftpError>> + Send;
}
