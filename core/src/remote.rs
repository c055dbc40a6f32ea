//! Remote sessions over SSH
//!
//! A [`Session`] owns one transport to one cluster. The transport is a trait
//! so the executor can be driven by scripted transports; the production
//! implementation is [`SshTransport`] on top of russh.

use async_trait::async_trait;
use russh::client::{self, Msg};
use russh::{Channel, ChannelMsg, Disconnect};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::{ConnectError, Error, Result};

/// SSH connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SshSettings {
    pub port: u16,
    pub connect_timeout_secs: u64,
}

impl Default for SshSettings {
    fn default() -> Self {
        Self {
            port: 22,
            connect_timeout_secs: 30,
        }
    }
}

impl SshSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// One event observed on a running command's stdout
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A complete line, without its trailing newline
    Line(String),
    /// The read timeout elapsed with no complete line available
    Idle,
    /// Stdout is exhausted and the channel is gone
    Closed,
}

/// Output side of one command started on a transport
#[async_trait]
pub trait CommandStream: Send {
    /// Wait at most `timeout` for the next stdout line.
    async fn next_line(&mut self, timeout: Duration) -> Result<StreamEvent>;

    /// True once the remote side has signaled completion and every buffered
    /// stdout line has been handed out.
    fn is_finished(&self) -> bool;

    /// Stderr lines received so far plus whatever is immediately available.
    /// Never blocks.
    async fn drain_stderr(&mut self) -> Vec<String>;
}

/// A connection able to run commands and write files on one host
#[async_trait]
pub trait Transport: Send {
    /// Start `command` and return its output stream
    async fn exec(&mut self, command: &str) -> Result<Box<dyn CommandStream>>;

    /// Write `contents` to `path` on the remote host and set its mode
    async fn upload(&mut self, path: &str, contents: &[u8], mode: u32) -> Result<()>;

    /// Close the underlying connection
    async fn close(&mut self) -> Result<()>;
}

/// An SSH session to one cluster
pub struct Session {
    host: String,
    transport: Option<Box<dyn Transport>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.host)
            .field("open", &self.is_open())
            .finish()
    }
}

impl Session {
    /// Wrap an already established transport
    pub fn new(host: impl Into<String>, transport: Box<dyn Transport>) -> Self {
        Self {
            host: host.into(),
            transport: Some(transport),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    pub(crate) fn transport_mut(&mut self) -> Result<&mut (dyn Transport + 'static)> {
        self.transport.as_deref_mut().ok_or_else(|| {
            Error::InvalidState("SSH session not established. Connect first.".to_string())
        })
    }

    /// Write a file on the remote host
    #[instrument(skip(self, contents), fields(host = %self.host))]
    pub async fn upload(&mut self, path: &str, contents: &[u8], mode: u32) -> Result<()> {
        self.transport_mut()?.upload(path, contents, mode).await
    }

    /// Close the session.
    ///
    /// Idempotent: a session that is already closed reports so instead of
    /// failing. Returns a status line for the operator.
    #[instrument(skip(self), fields(host = %self.host))]
    pub async fn disconnect(&mut self) -> String {
        match self.transport.take() {
            Some(mut transport) => {
                if let Err(e) = transport.close().await {
                    warn!(error = %e, "Error while closing SSH session");
                }
                info!("Disconnected");
                format!("Disconnected from {}", self.host)
            }
            None => "No active SSH session to disconnect.".to_string(),
        }
    }
}

/// Open an SSH session with password authentication.
///
/// Any host key is accepted.
#[instrument(skip(password, settings))]
pub async fn connect(
    host: &str,
    username: &str,
    password: &str,
    settings: &SshSettings,
) -> std::result::Result<Session, ConnectError> {
    info!(port = settings.port, "Connecting to cluster");

    let transport = match tokio::time::timeout(
        settings.connect_timeout(),
        SshTransport::connect(host, settings.port, username, password),
    )
    .await
    {
        Err(_) => {
            return Err(ConnectError::new(format!(
                "Connection to {} timed out after {} seconds",
                host, settings.connect_timeout_secs
            )));
        }
        Ok(result) => result?,
    };

    info!("Successfully connected to {} via SSH", host);
    Ok(Session::new(host, Box::new(transport)))
}

/// SSH client handler for russh
struct ClientHandler;

impl client::Handler for ClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &russh::keys::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        Ok(true)
    }
}

/// russh-backed transport
pub struct SshTransport {
    handle: client::Handle<ClientHandler>,
}

impl SshTransport {
    async fn connect(
        host: &str,
        port: u16,
        username: &str,
        password: &str,
    ) -> std::result::Result<Self, ConnectError> {
        let config = Arc::new(client::Config::default());

        let mut handle = client::connect(config, (host, port), ClientHandler)
            .await
            .map_err(|e| ConnectError::new(format!("Failed to connect to {}:{}: {}", host, port, e)))?;

        let auth = handle
            .authenticate_password(username, password)
            .await
            .map_err(|e| ConnectError::new(format!("Authentication error: {}", e)))?;

        match auth {
            client::AuthResult::Success => Ok(Self { handle }),
            _ => Err(ConnectError::new(format!(
                "Authentication failed for {}@{}",
                username, host
            ))),
        }
    }
}

#[async_trait]
impl Transport for SshTransport {
    async fn exec(&mut self, command: &str) -> Result<Box<dyn CommandStream>> {
        let channel = self.handle.channel_open_session().await?;
        channel.exec(true, command).await?;
        Ok(Box::new(ChannelStream::new(channel)))
    }

    async fn upload(&mut self, path: &str, contents: &[u8], mode: u32) -> Result<()> {
        let quoted = shell_quote(path);
        let command = format!("cat > {quoted} && chmod {mode:o} {quoted}");
        debug!(path, mode = %format!("{:o}", mode), bytes = contents.len(), "Uploading file");

        let mut channel = self.handle.channel_open_session().await?;
        channel.exec(true, command).await?;
        channel.data(contents).await?;
        channel.eof().await?;

        let mut exit_status = None;
        let mut stderr = Vec::new();
        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::ExitStatus { exit_status: code } => exit_status = Some(code),
                ChannelMsg::ExtendedData { data, .. } => stderr.extend_from_slice(&data),
                ChannelMsg::Close => break,
                _ => {}
            }
        }

        match exit_status {
            Some(0) => Ok(()),
            Some(code) => Err(Error::RemoteExecution(format!(
                "Upload to {} failed with exit code {}: {}",
                path,
                code,
                String::from_utf8_lossy(&stderr).trim()
            ))),
            None => Err(Error::RemoteExecution(format!(
                "Upload to {} ended without an exit status",
                path
            ))),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await?;
        Ok(())
    }
}

/// One message observed on a command channel
#[derive(Debug, Clone, PartialEq, Eq)]
enum ChannelEvent {
    Stdout(Vec<u8>),
    Stderr(Vec<u8>),
    Exited,
    Closed,
    Other,
}

/// Where a [`ChannelStream`] gets its messages from
#[async_trait]
trait EventSource: Send {
    async fn next_event(&mut self) -> ChannelEvent;
}

#[async_trait]
impl EventSource for Channel<Msg> {
    async fn next_event(&mut self) -> ChannelEvent {
        match self.wait().await {
            Some(ChannelMsg::Data { data }) => ChannelEvent::Stdout(data.to_vec()),
            Some(ChannelMsg::ExtendedData { data, ext: 1 }) => ChannelEvent::Stderr(data.to_vec()),
            Some(ChannelMsg::ExitStatus { exit_status }) => {
                debug!(exit_status, "Remote command exited");
                ChannelEvent::Exited
            }
            Some(ChannelMsg::ExitSignal { signal_name, .. }) => {
                debug!(signal = ?signal_name, "Remote command killed by signal");
                ChannelEvent::Exited
            }
            Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => ChannelEvent::Closed,
            Some(_) => ChannelEvent::Other,
        }
    }
}

/// Reassembles stdout into lines and collects stderr
#[derive(Debug, Default)]
struct LineBuffer {
    pending: VecDeque<String>,
    partial: Vec<u8>,
    stderr: Vec<u8>,
    exited: bool,
    closed: bool,
}

impl LineBuffer {
    fn apply(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::Stdout(data) => self.push_stdout(&data),
            ChannelEvent::Stderr(data) => self.stderr.extend_from_slice(&data),
            ChannelEvent::Exited => self.exited = true,
            ChannelEvent::Closed => {
                self.closed = true;
                self.flush_partial();
            }
            ChannelEvent::Other => {}
        }
    }

    fn push_stdout(&mut self, data: &[u8]) {
        self.partial.extend_from_slice(data);
        while let Some(pos) = self.partial.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.partial.drain(..=pos).collect();
            self.pending.push_back(decode_line(&line));
        }
    }

    fn flush_partial(&mut self) {
        if !self.partial.is_empty() {
            let rest = std::mem::take(&mut self.partial);
            self.pending.push_back(decode_line(&rest));
        }
    }

    fn pop_line(&mut self) -> Option<String> {
        self.pending.pop_front()
    }

    fn is_finished(&self) -> bool {
        (self.exited || self.closed) && self.pending.is_empty() && self.partial.is_empty()
    }

    fn take_stderr(&mut self) -> Vec<String> {
        let text = String::from_utf8_lossy(&std::mem::take(&mut self.stderr)).into_owned();
        text.lines().map(str::to_string).collect()
    }
}

/// Line-oriented reader over one command channel
struct ChannelStream<S> {
    source: S,
    buffer: LineBuffer,
}

impl<S: EventSource> ChannelStream<S> {
    fn new(source: S) -> Self {
        Self {
            source,
            buffer: LineBuffer::default(),
        }
    }
}

#[async_trait]
impl<S: EventSource> CommandStream for ChannelStream<S> {
    async fn next_line(&mut self, timeout: Duration) -> Result<StreamEvent> {
        // One deadline for the whole call, however many messages arrive
        let until = Instant::now() + timeout;
        loop {
            if let Some(line) = self.buffer.pop_line() {
                return Ok(StreamEvent::Line(line));
            }
            if self.buffer.closed {
                return Ok(StreamEvent::Closed);
            }
            match tokio::time::timeout_at(until, self.source.next_event()).await {
                Err(_) => return Ok(StreamEvent::Idle),
                Ok(event) => self.buffer.apply(event),
            }
        }
    }

    fn is_finished(&self) -> bool {
        self.buffer.is_finished()
    }

    async fn drain_stderr(&mut self) -> Vec<String> {
        // A zero timeout still polls the channel once before giving up.
        while !self.buffer.closed {
            match tokio::time::timeout(Duration::ZERO, self.source.next_event()).await {
                Ok(event) => self.buffer.apply(event),
                Err(_) => break,
            }
        }
        self.buffer.take_stderr()
    }
}

fn decode_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches(['\r', '\n'])
        .to_string()
}

/// Single-quote a word for a POSIX shell
fn shell_quote(word: &str) -> String {
    format!("'{}'", word.replace('\'', r"'\''"))
}
