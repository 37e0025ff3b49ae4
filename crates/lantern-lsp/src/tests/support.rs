//! Doubles shared by the bootstrap and lifecycle suites.

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use lantern_config::{Config, ConfigError};
use serde_json::Value;

use crate::bootstrap::{BootstrapError, ConfigLoader};
use crate::exit::ExitStatus;
use crate::health::HealthReporter;

/// Health events in the order they were reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded,
    BootstrapFailed(String),
    Serving,
    Stopped(ExitStatus),
}

/// Reporter that records events for later assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events.lock().expect("reporter mutex poisoned").clone()
    }

    fn push(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.push(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.push(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.push(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn serving(&self) {
        self.push(HealthEvent::Serving);
    }

    fn stopped(&self, status: ExitStatus) {
        self.push(HealthEvent::Stopped(status));
    }
}

/// Loader that parses a fixed argument list, as if given on the command line.
#[derive(Debug, Clone)]
pub struct ArgsConfigLoader {
    args: Vec<String>,
}

impl ArgsConfigLoader {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl ConfigLoader for ArgsConfigLoader {
    fn load(&self) -> Result<Config, ConfigError> {
        let args = self.args.iter().map(String::as_str);
        Config::load_from_iter(std::iter::once("lantern-lsp").chain(args))
    }
}

/// Everything observable after [`crate::run`] returns.
#[derive(Debug)]
pub struct RunReport {
    pub status: ExitStatus,
    pub output: Vec<u8>,
    pub stderr: String,
    pub events: Vec<HealthEvent>,
}

impl RunReport {
    pub fn responses(&self) -> Vec<Value> {
        parse_frames(&self.output)
    }
}

/// Runs the whole server against in-memory streams.
pub fn run_server(loader: &dyn ConfigLoader, input: Vec<u8>) -> RunReport {
    let reporter = Arc::new(RecordingHealthReporter::default());
    let mut output = Vec::new();
    let mut stderr = Vec::new();

    let status = crate::run(
        loader,
        reporter.clone(),
        Cursor::new(input),
        &mut output,
        &mut stderr,
    );

    RunReport {
        status,
        output,
        stderr: String::from_utf8(stderr).expect("utf8 stderr"),
        events: reporter.events(),
    }
}

/// Frames a JSON body with a `Content-Length` header.
pub fn frame(body: &str) -> Vec<u8> {
    format!("Content-Length: {}\r\n\r\n{body}", body.len()).into_bytes()
}

/// Builds a framed request.
pub fn request(id: i64, method: &str, params: &Value) -> Vec<u8> {
    frame(
        &serde_json::json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params})
            .to_string(),
    )
}

/// Builds a framed notification.
pub fn notification(method: &str) -> Vec<u8> {
    frame(&serde_json::json!({"jsonrpc": "2.0", "method": method}).to_string())
}

/// Splits framed output into parsed JSON bodies.
pub fn parse_frames(mut bytes: &[u8]) -> Vec<Value> {
    let mut frames = Vec::new();
    while !bytes.is_empty() {
        let text = std::str::from_utf8(bytes).expect("utf8 output");
        let (header, rest) = text.split_once("\r\n\r\n").expect("header separator");
        let length: usize = header
            .strip_prefix("Content-Length: ")
            .and_then(|value| value.parse().ok())
            .expect("content length header");
        let (body, tail) = rest.as_bytes().split_at(length);
        frames.push(serde_json::from_slice(body).expect("json body"));
        bytes = tail;
    }
    frames
}
