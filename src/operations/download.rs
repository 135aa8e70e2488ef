use std::path::Path;
use std::time::Instant;

use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::{error, info};

use crate::error::SftpError;

/// Copies an open remote file into a local file
///
/// Parent directories of `local_path` are created first and an existing local
/// file is truncated.
///
/// # Returns
///
/// Returns the number of bytes copied
///
/// # Errors
///
/// Returns an error if:
/// - The local parent directories or file cannot be created (`LocalIo`)
/// - Reading the remote file fails midway (`Read`)
/// - Writing the local file fails (`LocalIo`)
pub(crate) async fn copy_to_local<R>(
    reader: &mut R,
    remote_path: &str,
    local_path: &Path,
    buffer_size: usize,
) -> Result<u64, SftpError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let download_time = Instant::now();
    if let Some(parent) = local_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| SftpError::local(parent, e))?;
    }
    let mut local_file = fs::File::create(local_path)
        .await
        .map_err(|e| SftpError::local(local_path, e))?;
    info!("Local file created: {:?}", local_path);

    let mut buffer = vec![0; buffer_size];
    let mut bytes_copied: u64 = 0;
    loop {
        let bytes_read = match reader.read(&mut buffer[..]).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                error!("Error reading remote file {:?}: {:?}", remote_path, e);
                return Err(SftpError::Read {
                    path: remote_path.to_string(),
                    source: e,
                });
            }
        };
        local_file
            .write_all(&buffer[..bytes_read])
            .await
            .map_err(|e| SftpError::local(local_path, e))?;
        bytes_copied += bytes_read as u64;
    }
    local_file
        .flush()
        .await
        .map_err(|e| SftpError::local(local_path, e))?;

    info!(
        "File {:?} downloaded ({} bytes). Time taken {:?}",
        remote_path,
        bytes_copied,
        download_time.elapsed()
    );
    Ok(bytes_copied)
}
