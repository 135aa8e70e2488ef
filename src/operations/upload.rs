use std::time::Instant;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::{debug, error, info};

use crate::error::SftpError;
use crate::transport::RemoteFs;
use crate::utils;

/// Creates every ancestor of `remote_path`, top down.
///
/// Failures are ignored per component: a directory that already exists is not an
/// error, and a real problem resurfaces when the target file is created.
pub(crate) async fn create_parent_dirs<F: RemoteFs>(fs: &mut F, remote_path: &str) {
    for dir in utils::parent_dirs(remote_path) {
        if let Err(e) = fs.create_dir(&dir).await {
            debug!("create_dir {:?} skipped: {}", dir, e);
        }
    }
}

/// Streams `reader` into a remote file
///
/// The steps are:
/// 1. Creates missing parent directories of `remote_path`
/// 2. Opens the remote file with create + truncate semantics
/// 3. Copies chunks of `buffer_size` bytes until the reader is exhausted
/// 4. Flushes and shuts down the remote handle
///
/// # Returns
///
/// Returns the number of bytes copied
///
/// # Errors
///
/// Returns an error if:
/// - The remote file cannot be created (`NotFound` / `Protocol`)
/// - Reading the source or writing the remote file fails midway (`Write`)
pub(crate) async fn write_file<F, R>(
    fs: &mut F,
    reader: &mut R,
    remote_path: &str,
    buffer_size: usize,
) -> Result<u64, SftpError>
where
    F: RemoteFs,
    R: AsyncRead + Unpin + ?Sized,
{
    let upload_time = Instant::now();
    create_parent_dirs(fs, remote_path).await;

    let mut remote_file = fs.create(remote_path).await?;
    let mut buffer = vec![0; buffer_size];
    let mut bytes_copied: u64 = 0;

    let interrupted = |bytes_copied: u64, source: std::io::Error| {
        error!("Upload to {:?} interrupted: {:?}", remote_path, source);
        SftpError::Write {
            path: remote_path.to_string(),
            bytes_copied,
            source,
        }
    };

    loop {
        let bytes_read = match reader.read(&mut buffer[..]).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => return Err(interrupted(bytes_copied, e)),
        };
        remote_file
            .write_all(&buffer[..bytes_read])
            .await
            .map_err(|e| interrupted(bytes_copied, e))?;
        bytes_copied += bytes_read as u64;
    }
    remote_file
        .shutdown()
        .await
        .map_err(|e| interrupted(bytes_copied, e))?;

    info!(
        "{} bytes copied to {:?}. Time taken {:?}",
        bytes_copied,
        remote_path,
        upload_time.elapsed()
    );
    Ok(bytes_copied)
}
