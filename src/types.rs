use std::time::SystemTime;

/// Metadata for one remote filesystem entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFileInfo {
    /// Final path component of the entry
    pub name: String,
    /// Size in bytes, 0 when the server does not report it
    pub size: u64,
    /// Last modification time, if the server reports one
    pub modified: Option<SystemTime>,
    /// True for directories
    pub is_dir: bool,
}

impl RemoteFileInfo {
    pub fn new(name: impl Into<String>, size: u64, modified: Option<SystemTime>, is_dir: bool) -> Self {
        Self {
            name: name.into(),
            size,
            modified,
            is_dir,
        }
    }
}

/// Result of a completed file transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSummary {
    /// Source file path
    pub src_file: String,
    /// Destination file path
    pub dest_file: String,
    /// Number of bytes copied
    pub bytes_copied: u64,
}
