// Module declarations
mod client;
mod config;
mod error;
mod operations;
mod session;
mod ssh;
mod transport;
mod types;
pub mod utils;

// Public API exports
pub use client::{RemoteFile, SftpClient};
pub use config::{
    AuthMethod, DEFAULT_BUFFER_SIZE, DEFAULT_CONNECT_TIMEOUT, PrivateKey, SessionConfig,
    SessionConfigBuilder, Settings,
};
pub use error::SftpError;
pub use session::{ConnectionManager, ReaderOf};
pub use ssh::{SshConnector, SshTransport, resolve_key_exchanges};
pub use transport::{Connector, RemoteFs, Transport};
pub use types::{RemoteFileInfo, TransferSummary};
