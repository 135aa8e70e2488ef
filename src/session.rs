use std::path::Path;

use tokio::io::AsyncRead;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::SftpError;
use crate::operations::{download, upload};
use crate::ssh::SshConnector;
use crate::transport::{Connector, RemoteFs, Transport};
use crate::types::{RemoteFileInfo, TransferSummary};

type TransferOf<C> = <<C as Connector>::Transport as Transport>::Transfer;

/// Stream returned by [`ConnectionManager::open_for_read`]
pub type ReaderOf<C> = <TransferOf<C> as RemoteFs>::Reader;

/// Owns one remote session and keeps it alive across file operations.
///
/// The transport and the SFTP sub-session are dialed lazily on the first
/// operation. Before each operation the transport is probed; a dead session is
/// released and redialed transparently. After [`close`](Self::close) the manager
/// stays closed and every operation fails with [`SftpError::Closed`].
pub struct ConnectionManager<C: Connector = SshConnector> {
    config: SessionConfig,
    connector: C,
    transport: Option<C::Transport>,
    // only ever Some while `transport` is Some and was opened from it
    transfer: Option<TransferOf<C>>,
    closed: bool,
}

impl ConnectionManager<SshConnector> {
    /// Creates a manager that connects over SSH; nothing is dialed yet
    ///
    /// # Example
    ///
    /// ```ignore
    /// let config = SessionConfig::builder("example.com:22", "user")
    ///     .private_key(std::fs::read_to_string("/home/user/.ssh/id_ed25519")?)
    ///     .build()?;
    /// let mut manager = ConnectionManager::new(config);
    /// for file in manager.list_directory("/upload").await? {
    ///     println!("{} ({} bytes)", file.name, file.size);
    /// }
    /// manager.close().await;
    /// ```
    pub fn new(config: SessionConfig) -> Self {
        Self::with_connector(config, SshConnector)
    }
}

impl<C: Connector> ConnectionManager<C> {
    /// Creates a manager on top of a custom backend
    pub fn with_connector(config: SessionConfig, connector: C) -> Self {
        Self {
            config,
            connector,
            transport: None,
            transfer: None,
            closed: false,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// True when both handles are held. No probe is sent.
    pub fn is_connected(&self) -> bool {
        self.transport.is_some() && self.transfer.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Makes sure a live, authenticated session with an SFTP sub-session exists
    ///
    /// An existing transport is probed first. If the probe fails, or there is no
    /// session yet, the stale handles are released and a full dial, authenticate
    /// and SFTP handshake is performed.
    ///
    /// # Errors
    ///
    /// - `Closed` after [`close`](Self::close)
    /// - `Auth` if the private key cannot be parsed or credentials are rejected
    /// - `Dial` if the server cannot be reached within the connect timeout
    /// - `ProtocolInit` if the SFTP sub-session cannot start
    ///
    /// On error no handles are left populated.
    pub async fn ensure_connected(&mut self) -> Result<(), SftpError> {
        if self.closed {
            return Err(SftpError::Closed);
        }

        if let Some(transport) = self.transport.as_mut() {
            match transport.probe().await {
                Ok(()) if self.transfer.is_some() => {
                    debug!("Liveness probe to {} succeeded", self.config.address());
                    return Ok(());
                }
                Ok(()) => warn!("SFTP sub-session missing on {}, reconnecting", self.config.address()),
                Err(e) => warn!("Liveness probe to {} failed, reconnecting: {}", self.config.address(), e),
            }
        }

        self.release().await;

        let mut transport = self.connector.dial(&self.config).await?;
        let transfer = match transport.open_transfer().await {
            Ok(transfer) => transfer,
            Err(e) => {
                if let Err(close_err) = transport.close().await {
                    debug!("Ignoring error while closing transport: {}", close_err);
                }
                return Err(e);
            }
        };

        self.transport = Some(transport);
        self.transfer = Some(transfer);
        info!("SFTP session ready on {}", self.config.address());
        Ok(())
    }

    /// Returns the live transfer sub-session, connecting first if needed
    async fn transfer(&mut self) -> Result<&mut TransferOf<C>, SftpError> {
        self.ensure_connected().await?;
        self.transfer
            .as_mut()
            .ok_or_else(|| SftpError::Protocol("sftp sub-session unavailable".into()))
    }

    /// Drops both handles, sub-session first. Errors are logged and swallowed.
    async fn release(&mut self) {
        if let Some(transfer) = self.transfer.take() {
            if let Err(e) = transfer.close().await {
                debug!("Ignoring error while closing sftp sub-session: {}", e);
            }
        }
        if let Some(transport) = self.transport.take() {
            if let Err(e) = transport.close().await {
                debug!("Ignoring error while closing transport: {}", e);
            }
        }
    }

    /// Lists a remote directory, sorted by name
    ///
    /// An empty directory yields an empty vector. A missing one fails with `NotFound`.
    pub async fn list_directory(&mut self, path: &str) -> Result<Vec<RemoteFileInfo>, SftpError> {
        info!("Listing [{}]", path);
        self.transfer().await?.read_dir(path).await
    }

    /// Opens a remote file for reading from offset 0
    ///
    /// The caller owns the returned stream; dropping it releases the remote handle.
    pub async fn open_for_read(&mut self, path: &str) -> Result<ReaderOf<C>, SftpError> {
        self.transfer().await?.open_read(path).await
    }

    /// Returns metadata of a remote path without following symlinks
    pub async fn stat_file(&mut self, path: &str) -> Result<RemoteFileInfo, SftpError> {
        self.transfer().await?.stat(path).await
    }

    /// Copies everything from `reader` into `remote_path`
    ///
    /// Missing parent directories are created one component at a time; ones that
    /// already exist are not an error. The target is created or truncated.
    ///
    /// # Returns
    ///
    /// Returns the number of bytes copied
    ///
    /// # Errors
    ///
    /// Connection errors from [`ensure_connected`](Self::ensure_connected),
    /// `NotFound` / `Protocol` if the target cannot be opened, and `Write` if the
    /// copy is interrupted.
    pub async fn write_file<R>(&mut self, reader: &mut R, remote_path: &str) -> Result<u64, SftpError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let buffer_size = self.config.buffer_size();
        let fs = self.transfer().await?;
        upload::write_file(fs, reader, remote_path, buffer_size).await
    }

    /// Downloads `remote_path` into `local_path`, creating local directories as needed
    pub async fn download_to_file(
        &mut self,
        remote_path: &str,
        local_path: impl AsRef<Path>,
    ) -> Result<TransferSummary, SftpError> {
        let local_path = local_path.as_ref();
        info!("Downloading [{}] to [{}]", remote_path, local_path.display());

        let buffer_size = self.config.buffer_size();
        let mut remote_file = self.open_for_read(remote_path).await?;
        let bytes_copied =
            download::copy_to_local(&mut remote_file, remote_path, local_path, buffer_size).await?;

        Ok(TransferSummary {
            src_file: remote_path.to_string(),
            dest_file: local_path.display().to_string(),
            bytes_copied,
        })
    }

    /// Uploads a local file to `remote_path`
    pub async fn upload_from_file(
        &mut self,
        local_path: impl AsRef<Path>,
        remote_path: &str,
    ) -> Result<TransferSummary, SftpError> {
        let local_path = local_path.as_ref();
        info!("Uploading [{}] to [{}]", local_path.display(), remote_path);

        self.ensure_connected().await?;
        let mut local_file = tokio::fs::File::open(local_path)
            .await
            .map_err(|e| SftpError::local(local_path, e))?;
        let bytes_copied = self.write_file(&mut local_file, remote_path).await?;

        Ok(TransferSummary {
            src_file: local_path.display().to_string(),
            dest_file: remote_path.to_string(),
            bytes_copied,
        })
    }

    /// Releases the SFTP sub-session, then the transport
    ///
    /// Safe to call repeatedly and when nothing is connected. Close errors from
    /// the server are swallowed. The manager does not reconnect afterwards.
    pub async fn close(&mut self) {
        self.release().await;
        if !self.closed {
            info!("Connection manager for {} closed", self.config.address());
        }
        self.closed = true;
    }
}
