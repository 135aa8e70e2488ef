use std::pin::Pin;

use openssh_sftp_client::file::TokioCompatFile;
use openssh_sftp_client::{Sftp, SftpOptions};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use crate::error::SftpError;
use crate::operations::list;
use crate::transport::RemoteFs;
use crate::types::RemoteFileInfo;
use crate::utils;

/// Remote file handle usable with tokio's `AsyncRead` / `AsyncWrite` helpers.
///
/// The remote handle is released when the value is dropped.
pub type RemoteFile = Pin<Box<TokioCompatFile>>;

/// SFTP client for performing file operations on a remote server
#[derive(Debug)]
pub struct SftpClient {
    pub(crate) sftp: Sftp,
}

impl SftpClient {
    /// Runs the SFTP handshake over an already requested `sftp` subsystem stream
    pub(crate) async fn start<W, R>(writer: W, reader: R) -> Result<Self, SftpError>
    where
        W: AsyncWrite + Send + 'static,
        R: AsyncRead + Send + 'static,
    {
        let sftp = Sftp::new(writer, reader, SftpOptions::default())
            .await
            .map_err(|e| SftpError::ProtocolInit(e.to_string()))?;
        debug!("sftp client created successfully");
        Ok(Self { sftp })
    }
}

impl RemoteFs for SftpClient {
    type Reader = RemoteFile;
    type Writer = RemoteFile;

    async fn read_dir(&mut self, path: &str) -> Result<Vec<RemoteFileInfo>, SftpError> {
        list::read_dir(&self.sftp, path).await
    }

    async fn stat(&mut self, path: &str) -> Result<RemoteFileInfo, SftpError> {
        let mut fs = self.sftp.fs();
        let metadata = fs
            .symlink_metadata(path)
            .await
            .map_err(|e| SftpError::from_sftp(path, e))?;
        Ok(list::to_file_info(utils::file_name(path), &metadata))
    }

    async fn open_read(&mut self, path: &str) -> Result<RemoteFile, SftpError> {
        let file = self
            .sftp
            .open(path)
            .await
            .map_err(|e| SftpError::from_sftp(path, e))?;
        debug!("Remote file opened: {:?}", path);
        Ok(Box::pin(TokioCompatFile::new(file)))
    }

    async fn create_dir(&mut self, path: &str) -> Result<(), SftpError> {
        let mut fs = self.sftp.fs();
        fs.create_dir(path)
            .await
            .map_err(|e| SftpError::from_sftp(path, e))
    }

    async fn create(&mut self, path: &str) -> Result<RemoteFile, SftpError> {
        let file = self
            .sftp
            .create(path)
            .await
            .map_err(|e| SftpError::from_sftp(path, e))?;
        debug!("Remote file created path: {:?}", path);
        Ok(Box::pin(TokioCompatFile::new(file)))
    }

    async fn close(self) -> Result<(), SftpError> {
        self.sftp
            .close()
            .await
            .map_err(|e| SftpError::Protocol(format!("closing sftp session: {e}")))
    }
}
