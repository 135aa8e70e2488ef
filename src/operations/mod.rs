/// Module for downloading remote files to local storage
pub(crate) mod download;

/// Module for listing remote directory contents
pub(crate) mod list;

/// Module for uploading data to the remote server
pub(crate) mod upload;
