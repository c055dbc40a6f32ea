//! Scripted transports for unit tests

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::remote::{CommandStream, StreamEvent, Transport};
use crate::{Error, Result};

/// One step a scripted command plays back
#[derive(Debug, Clone)]
pub enum Step {
    Line(String),
    Idle,
    Fail(String),
    /// Remote side signals completion; reported as `Idle` to the reader
    Finish,
}

pub fn line(text: &str) -> Step {
    Step::Line(text.to_string())
}

#[derive(Debug, Clone, Default)]
pub struct Script {
    pub steps: Vec<Step>,
    pub stderr: Vec<String>,
}

impl Script {
    pub fn lines(lines: &[&str]) -> Self {
        Self {
            steps: lines.iter().map(|l| line(l)).collect(),
            stderr: Vec::new(),
        }
    }

    pub fn with_stderr(mut self, lines: &[&str]) -> Self {
        self.stderr = lines.iter().map(|l| l.to_string()).collect();
        self
    }
}

type Uploads = Arc<Mutex<Vec<(String, Vec<u8>, u32)>>>;

/// Transport answering commands from a fixed table
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: HashMap<String, Script>,
    commands: Arc<Mutex<Vec<String>>>,
    uploads: Uploads,
    consumed: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    pub fn with_script(mut self, command: &str, script: Script) -> Self {
        self.scripts.insert(command.to_string(), script);
        self
    }

    pub fn commands(&self) -> Arc<Mutex<Vec<String>>> {
        self.commands.clone()
    }

    pub fn uploads(&self) -> Uploads {
        self.uploads.clone()
    }

    /// Number of steps read by all streams so far
    pub fn consumed(&self) -> Arc<AtomicUsize> {
        self.consumed.clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn exec(&mut self, command: &str) -> Result<Box<dyn CommandStream>> {
        self.commands.lock().unwrap().push(command.to_string());
        let script = self.scripts.get(command).cloned().unwrap_or_default();
        Ok(Box::new(ScriptedStream {
            steps: script.steps.into(),
            stderr: script.stderr,
            finished: false,
            consumed: self.consumed.clone(),
        }))
    }

    async fn upload(&mut self, path: &str, contents: &[u8], mode: u32) -> Result<()> {
        self.uploads
            .lock()
            .unwrap()
            .push((path.to_string(), contents.to_vec(), mode));
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

struct ScriptedStream {
    steps: VecDeque<Step>,
    stderr: Vec<String>,
    finished: bool,
    consumed: Arc<AtomicUsize>,
}

#[async_trait]
impl CommandStream for ScriptedStream {
    async fn next_line(&mut self, _timeout: Duration) -> Result<StreamEvent> {
        let Some(step) = self.steps.pop_front() else {
            self.finished = true;
            return Ok(StreamEvent::Closed);
        };
        self.consumed.fetch_add(1, Ordering::SeqCst);
        match step {
            Step::Line(text) => Ok(StreamEvent::Line(text)),
            Step::Idle => Ok(StreamEvent::Idle),
            Step::Fail(message) => Err(Error::RemoteExecution(message)),
            Step::Finish => {
                self.finished = true;
                Ok(StreamEvent::Idle)
            }
        }
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    async fn drain_stderr(&mut self) -> Vec<String> {
        std::mem::take(&mut self.stderr)
    }
}
