//! Command execution over an open session
//!
//! Two read strategies:
//! - Standard commands are read until the remote side closes the channel,
//!   then stdout lines are followed by stderr lines.
//! - Long-running commands (the audit-rate script) are read line by line
//!   with a short per-read timeout and stop as soon as the script prints its
//!   own completion marker, since channel teardown after that can take far
//!   longer than the script itself.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::remote::{CommandStream, Session, StreamEvent};
use crate::{Error, Result};

/// Default command timeout in seconds
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 300;

/// Timeout for commands matching a long-running marker
pub const EXTENDED_TIMEOUT_SECONDS: u64 = 3600;

/// Per-read timeout on the bounded-wait path
pub const READ_TIMEOUT_SECONDS: u64 = 5;

/// Line printed by the audit-rate script when it is done
pub const COMPLETION_SENTINEL: &str = "Total average:";

/// Executor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub default_timeout_secs: u64,
    pub extended_timeout_secs: u64,
    pub read_timeout_secs: u64,
    /// Substrings marking a command as long-running
    pub long_running_markers: Vec<String>,
    pub sentinel: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: DEFAULT_TIMEOUT_SECONDS,
            extended_timeout_secs: EXTENDED_TIMEOUT_SECONDS,
            read_timeout_secs: READ_TIMEOUT_SECONDS,
            long_running_markers: vec!["auditrates.sh".to_string(), "isi_audit_viewer".to_string()],
            sentinel: COMPLETION_SENTINEL.to_string(),
        }
    }
}

/// State of the bounded-wait read loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadState {
    Reading,
    /// A line containing the sentinel was read
    SentinelFound,
    /// The remote side finished and stdout is exhausted
    RemoteClosed,
    /// The command-level deadline passed
    TimedOut,
    /// Reading failed; carries the error message
    Failed(String),
}

/// Runs commands on a session
#[derive(Debug, Clone, Default)]
pub struct CommandExecutor {
    config: ExecutorConfig,
}

impl CommandExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    /// Does `command` need the bounded-wait path?
    pub fn is_long_running(&self, command: &str) -> bool {
        self.config
            .long_running_markers
            .iter()
            .any(|marker| command.contains(marker.as_str()))
    }

    /// Timeout applied to `command`
    pub fn timeout_for(&self, command: &str) -> Duration {
        if self.is_long_running(command) {
            Duration::from_secs(self.config.extended_timeout_secs)
        } else {
            Duration::from_secs(self.config.default_timeout_secs)
        }
    }

    /// Run `command` and return its output lines, stdout first, then stderr.
    ///
    /// Fails with [`Error::InvalidState`] when the session is closed.
    #[instrument(skip(self, session), fields(host = %session.host()))]
    pub async fn execute(&self, session: &mut Session, command: &str) -> Result<Vec<String>> {
        let transport = session.transport_mut()?;
        let timeout = self.timeout_for(command);
        let long_running = self.is_long_running(command);

        if long_running {
            debug!(
                timeout_secs = timeout.as_secs(),
                "Detected a potentially long-running command"
            );
        }

        let mut stream = transport.exec(command).await?;

        if long_running {
            Ok(self.read_until_sentinel(stream.as_mut(), timeout).await)
        } else {
            self.read_to_completion(stream.as_mut(), timeout).await
        }
    }

    async fn read_to_completion(
        &self,
        stream: &mut dyn CommandStream,
        timeout: Duration,
    ) -> Result<Vec<String>> {
        let deadline = Instant::now() + timeout;
        let mut lines = Vec::new();

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(Error::Timeout(timeout.as_secs()));
            }
            match stream.next_line(remaining).await? {
                StreamEvent::Line(line) => lines.push(line),
                StreamEvent::Idle => {
                    if stream.is_finished() {
                        break;
                    }
                }
                StreamEvent::Closed => break,
            }
        }

        lines.extend(stream.drain_stderr().await);
        Ok(lines)
    }

    /// Bounded-wait read loop. Never fails: read errors and the command
    /// deadline become `[WARN]` lines after whatever was already collected.
    async fn read_until_sentinel(
        &self,
        stream: &mut dyn CommandStream,
        timeout: Duration,
    ) -> Vec<String> {
        let deadline = Instant::now() + timeout;
        let mut lines = Vec::new();
        let mut state = ReadState::Reading;

        while state == ReadState::Reading {
            state = self.advance(stream, &mut lines, deadline).await;
        }

        debug!(?state, lines = lines.len(), "Bounded read finished");

        match state {
            ReadState::TimedOut => {
                warn!(timeout_secs = timeout.as_secs(), "Long-running command hit its timeout");
                lines.push(format!(
                    "[WARN] Command did not finish within {} seconds",
                    timeout.as_secs()
                ));
            }
            ReadState::Failed(message) => {
                warn!(error = %message, "Bounded read failed");
                lines.push(format!("[WARN] {}", message));
            }
            _ => {}
        }

        lines.extend(stream.drain_stderr().await);
        lines
    }

    /// One transition of the read loop.
    ///
    /// Precedence: remote completion, then the command deadline, then one
    /// read. The sentinel is checked on the line just read; an idle read
    /// re-checks remote completion before reading again.
    async fn advance(
        &self,
        stream: &mut dyn CommandStream,
        lines: &mut Vec<String>,
        deadline: Instant,
    ) -> ReadState {
        if stream.is_finished() {
            return ReadState::RemoteClosed;
        }
        if Instant::now() >= deadline {
            return ReadState::TimedOut;
        }

        let read_timeout = Duration::from_secs(self.config.read_timeout_secs);
        match stream.next_line(read_timeout).await {
            Ok(StreamEvent::Line(line)) => {
                let done = line.contains(self.config.sentinel.as_str());
                lines.push(line);
                if done {
                    ReadState::SentinelFound
                } else {
                    ReadState::Reading
                }
            }
            Ok(StreamEvent::Idle) if stream.is_finished() => ReadState::RemoteClosed,
            Ok(StreamEvent::Idle) => ReadState::Reading,
            Ok(StreamEvent::Closed) => ReadState::RemoteClosed,
            Err(e) => ReadState::Failed(e.to_string()),
        }
    }
}
