use futures::stream::StreamExt;
use openssh_sftp_client::Sftp;
use openssh_sftp_client::metadata::MetaData;
use tracing::debug;

use crate::error::SftpError;
use crate::types::RemoteFileInfo;

/// Builds a [`RemoteFileInfo`] from SFTP attributes
pub(crate) fn to_file_info(name: &str, metadata: &MetaData) -> RemoteFileInfo {
    RemoteFileInfo {
        name: name.to_string(),
        size: metadata.len().unwrap_or(0),
        modified: metadata.modified().map(|t| t.as_system_time()),
        is_dir: metadata.file_type().is_some_and(|t| t.is_dir()),
    }
}

/// Lists the contents of a remote directory
///
/// # Arguments
///
/// * `sftp` - The SFTP session
/// * `remote_dir` - Path to the remote directory
///
/// # Returns
///
/// Returns all entries (files, directories, links) sorted by name.
/// `.` and `..` are skipped; an empty directory yields an empty vector.
///
/// # Errors
///
/// Returns an error if:
/// - The remote directory does not exist (`NotFound`)
/// - The directory cannot be opened or an entry cannot be read (`Protocol`)
pub(crate) async fn read_dir(sftp: &Sftp, remote_dir: &str) -> Result<Vec<RemoteFileInfo>, SftpError> {
    let mut file_list = Vec::new();
    let dir = sftp
        .fs()
        .open_dir(remote_dir)
        .await
        .map_err(|e| SftpError::from_sftp(remote_dir, e))?;

    let dir_stream = dir.read_dir();
    futures::pin_mut!(dir_stream);

    while let Some(entry) = dir_stream.next().await {
        let entry = entry.map_err(|e| SftpError::from_sftp(remote_dir, e))?;
        // file_name() is None for `.` and `..`
        let Some(file_name) = entry.filename().file_name() else {
            continue;
        };
        let file_name = file_name.to_string_lossy();
        let mut info = to_file_info(&file_name, &entry.metadata());
        if let Some(file_type) = entry.file_type() {
            info.is_dir = file_type.is_dir();
        }
        file_list.push(info);
    }

    file_list.sort_by(|a, b| a.name.cmp(&b.name));
    debug!("Listed {} entries in {:?}", file_list.len(), remote_dir);
    Ok(file_list)
}
