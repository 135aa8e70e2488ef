//! In-memory SFTP backend for exercising the connection manager without a server.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};
use std::time::{Duration, SystemTime};

use sftp_session::{
    Connector, RemoteFileInfo, RemoteFs, SessionConfig, SftpError, Transport,
};
use tokio::io::AsyncWrite;

pub fn test_config() -> SessionConfig {
    SessionConfig::builder("mock.example.com:22", "tester")
        .password("secret")
        .connect_timeout(Duration::from_secs(1))
        .buffer_size(7)
        .build()
        .unwrap()
}

#[derive(Default)]
pub struct State {
    pub files: BTreeMap<String, Vec<u8>>,
    pub dirs: BTreeSet<String>,
    pub dials: usize,
    pub probes: usize,
    pub live_transports: usize,
    pub live_transfers: usize,
    pub max_live_transports: usize,
    pub max_live_transfers: usize,
    pub transport_closes: usize,
    pub transfer_closes: usize,
    pub failing_dials: usize,
    pub fail_transfer_init: bool,
    pub ops_on_dead_session: usize,
    pub mkdir_attempts: Vec<String>,
    connections: Vec<Arc<AtomicBool>>,
}

/// Shared view of the fake server; clones observe the same state
#[derive(Clone)]
pub struct MockServer {
    state: Arc<Mutex<State>>,
}

impl MockServer {
    pub fn new() -> Self {
        let mut state = State::default();
        state.dirs.insert("/".to_string());
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn connector(&self) -> MockConnector {
        MockConnector {
            server: self.clone(),
        }
    }

    pub fn add_dir(&self, path: &str) {
        self.state().dirs.insert(path.to_string());
    }

    pub fn add_file(&self, path: &str, contents: &[u8]) {
        self.state().files.insert(path.to_string(), contents.to_vec());
    }

    /// Silently drops every live connection, like a NAT timeout would
    pub fn drop_connections(&self) {
        for alive in &self.state().connections {
            alive.store(false, Ordering::SeqCst);
        }
    }
}

fn parent_of(path: &str) -> String {
    match path.trim_end_matches('/').rsplit_once('/') {
        Some(("", _)) => "/".to_string(),
        Some((parent, _)) => parent.to_string(),
        None => ".".to_string(),
    }
}

fn name_of(path: &str) -> String {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(path)
        .to_string()
}

pub struct MockConnector {
    server: MockServer,
}

impl Connector for MockConnector {
    type Transport = MockTransport;

    async fn dial(&self, _config: &SessionConfig) -> Result<MockTransport, SftpError> {
        let mut state = self.server.state();
        state.dials += 1;
        if state.failing_dials > 0 {
            state.failing_dials -= 1;
            return Err(SftpError::Dial {
                address: "mock.example.com:22".into(),
                reason: "connection refused".into(),
            });
        }
        let alive = Arc::new(AtomicBool::new(true));
        state.connections.push(alive.clone());
        state.live_transports += 1;
        state.max_live_transports = state.max_live_transports.max(state.live_transports);
        Ok(MockTransport {
            server: self.server.clone(),
            alive,
        })
    }
}

pub struct MockTransport {
    server: MockServer,
    alive: Arc<AtomicBool>,
}

impl Drop for MockTransport {
    fn drop(&mut self) {
        self.server.state().live_transports -= 1;
    }
}

impl Transport for MockTransport {
    type Transfer = MockFs;

    async fn probe(&mut self) -> Result<(), SftpError> {
        self.server.state().probes += 1;
        if self.alive.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SftpError::Protocol("connection lost".into()))
        }
    }

    async fn open_transfer(&mut self) -> Result<MockFs, SftpError> {
        let mut state = self.server.state();
        if state.fail_transfer_init {
            return Err(SftpError::ProtocolInit("subsystem request refused".into()));
        }
        state.live_transfers += 1;
        state.max_live_transfers = state.max_live_transfers.max(state.live_transfers);
        Ok(MockFs {
            server: self.server.clone(),
            alive: self.alive.clone(),
        })
    }

    async fn close(self) -> Result<(), SftpError> {
        self.server.state().transport_closes += 1;
        if self.alive.swap(false, Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SftpError::Protocol("already disconnected".into()))
        }
    }
}

pub struct MockFs {
    server: MockServer,
    alive: Arc<AtomicBool>,
}

impl MockFs {
    fn live_state(&self) -> Result<MutexGuard<'_, State>, SftpError> {
        let mut state = self.server.state();
        if !self.alive.load(Ordering::SeqCst) {
            state.ops_on_dead_session += 1;
            return Err(SftpError::Protocol("connection lost".into()));
        }
        Ok(state)
    }
}

impl Drop for MockFs {
    fn drop(&mut self) {
        self.server.state().live_transfers -= 1;
    }
}

impl RemoteFs for MockFs {
    type Reader = Cursor<Vec<u8>>;
    type Writer = MockWriter;

    async fn read_dir(&mut self, path: &str) -> Result<Vec<RemoteFileInfo>, SftpError> {
        let state = self.live_state()?;
        let dir = if path.len() > 1 { path.trim_end_matches('/') } else { path };
        if !state.dirs.contains(dir) {
            return Err(SftpError::NotFound(path.to_string()));
        }
        let mut entries: Vec<RemoteFileInfo> = state
            .dirs
            .iter()
            .filter(|d| d.as_str() != "/" && parent_of(d) == dir)
            .map(|d| RemoteFileInfo::new(name_of(d), 0, None, true))
            .chain(
                state
                    .files
                    .iter()
                    .filter(|(f, _)| parent_of(f) == dir)
                    .map(|(f, data)| {
                        RemoteFileInfo::new(name_of(f), data.len() as u64, Some(SystemTime::UNIX_EPOCH), false)
                    }),
            )
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn stat(&mut self, path: &str) -> Result<RemoteFileInfo, SftpError> {
        let state = self.live_state()?;
        if let Some(data) = state.files.get(path) {
            return Ok(RemoteFileInfo::new(name_of(path), data.len() as u64, Some(SystemTime::UNIX_EPOCH), false));
        }
        if state.dirs.contains(path) {
            return Ok(RemoteFileInfo::new(name_of(path), 0, None, true));
        }
        Err(SftpError::NotFound(path.to_string()))
    }

    async fn open_read(&mut self, path: &str) -> Result<Cursor<Vec<u8>>, SftpError> {
        let state = self.live_state()?;
        state
            .files
            .get(path)
            .map(|data| Cursor::new(data.clone()))
            .ok_or_else(|| SftpError::NotFound(path.to_string()))
    }

    async fn create_dir(&mut self, path: &str) -> Result<(), SftpError> {
        let mut state = self.live_state()?;
        state.mkdir_attempts.push(path.to_string());
        if state.dirs.contains(path) || state.files.contains_key(path) {
            return Err(SftpError::Protocol(format!("{path}: failure (already exists)")));
        }
        if !state.dirs.contains(&parent_of(path)) {
            return Err(SftpError::NotFound(path.to_string()));
        }
        state.dirs.insert(path.to_string());
        Ok(())
    }

    async fn create(&mut self, path: &str) -> Result<MockWriter, SftpError> {
        let mut state = self.live_state()?;
        if !state.dirs.contains(&parent_of(path)) || state.dirs.contains(path) {
            return Err(SftpError::NotFound(path.to_string()));
        }
        state.files.insert(path.to_string(), Vec::new());
        Ok(MockWriter {
            server: self.server.clone(),
            path: path.to_string(),
        })
    }

    async fn close(self) -> Result<(), SftpError> {
        self.server.state().transfer_closes += 1;
        Ok(())
    }
}

/// Appends straight into the fake server's file table
pub struct MockWriter {
    server: MockServer,
    path: String,
}

impl AsyncWrite for MockWriter {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        let mut state = self.server.state();
        match state.files.get_mut(&self.path) {
            Some(data) => {
                data.extend_from_slice(buf);
                Poll::Ready(Ok(buf.len()))
            }
            None => Poll::Ready(Err(io::Error::new(io::ErrorKind::NotFound, "file vanished"))),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
