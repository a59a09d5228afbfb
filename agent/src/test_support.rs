//! Test helpers: scripted model callers, temporary workspaces, and a tiny
//! local HTTP stub.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tempfile::TempDir;

use crate::core::call_parser::{CALL_END, CALL_START};
use crate::core::types::ModelReply;
use crate::io::model::{ModelBackend, ModelCaller};
use crate::io::workspace::Workspace;
use crate::tools::{ToolContext, ToolLimits};

pub const SCRIPTED_MODEL: &str = "scripted-model";

/// Wrap a call expression in the tool call markers.
pub fn call_block(expression: &str) -> String {
    format!("{CALL_START}{expression}{CALL_END}")
}

/// Model caller that replays queued replies and records every prompt.
///
/// A `None` entry simulates total provider failure for that call. Once the
/// queue is empty the caller keeps failing, unless a repeating reply is set.
pub struct ScriptedModel {
    replies: RefCell<VecDeque<Option<String>>>,
    repeat: Option<String>,
    model: String,
    prompts: RefCell<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Option<&str>>) -> Self {
        Self {
            replies: RefCell::new(
                replies
                    .into_iter()
                    .map(|reply| reply.map(str::to_string))
                    .collect(),
            ),
            repeat: None,
            model: SCRIPTED_MODEL.to_string(),
            prompts: RefCell::new(Vec::new()),
        }
    }

    pub fn answering(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|reply| Some(*reply)).collect())
    }

    /// Every call returns `reply`.
    pub fn repeating(reply: &str) -> Self {
        Self {
            repeat: Some(reply.to_string()),
            ..Self::new(Vec::new())
        }
    }

    pub fn failing() -> Self {
        Self::new(Vec::new())
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.borrow().len()
    }
}

impl ModelCaller for ScriptedModel {
    fn call(&self, prompt: &str) -> Option<ModelReply> {
        self.prompts.borrow_mut().push(prompt.to_string());
        let next = self
            .replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| self.repeat.clone());
        next.map(|text| ModelReply::new(text, self.model.clone()))
    }
}

/// Backend with a fixed outcome per model name.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    outcomes: HashMap<String, Result<String, String>>,
    calls: RefCell<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, model: &str, text: &str) -> Self {
        self.outcomes
            .insert(model.to_string(), Ok(text.to_string()));
        self
    }

    pub fn fail(mut self, model: &str, reason: &str) -> Self {
        self.outcomes
            .insert(model.to_string(), Err(reason.to_string()));
        self
    }

    /// Models asked so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl ModelBackend for ScriptedBackend {
    fn generate(&self, model: &str, _prompt: &str) -> Result<String> {
        self.calls.borrow_mut().push(model.to_string());
        match self.outcomes.get(model) {
            Some(Ok(text)) => Ok(text.clone()),
            Some(Err(reason)) => Err(anyhow!("{reason}")),
            None => Err(anyhow!("unknown model {model}")),
        }
    }
}

/// Workspace under a temp dir with a ready tool context.
pub struct TestWorkspace {
    _temp: TempDir,
    ctx: ToolContext,
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self::with_limits(ToolLimits::default())
    }

    pub fn with_limits(limits: ToolLimits) -> Self {
        let temp = tempfile::tempdir().expect("tempdir");
        let workspace = Workspace::open(&temp.path().join("workspace")).expect("open workspace");
        Self {
            _temp: temp,
            ctx: ToolContext::new(workspace, limits),
        }
    }

    pub fn ctx(&self) -> &ToolContext {
        &self.ctx
    }

    pub fn root(&self) -> &Path {
        self.ctx.workspace().root()
    }

    pub fn write(&self, relative: &str, contents: &str) {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(path, contents).expect("write file");
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.root().join(relative)).expect("read file")
    }
}

/// Serves canned `(status, body)` responses, one per connection, on localhost.
pub struct StubHttpServer {
    base_url: String,
    handle: thread::JoinHandle<Vec<String>>,
}

impl StubHttpServer {
    pub fn serve(responses: Vec<(u16, String)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub server");
        let addr = listener.local_addr().expect("local addr");
        let handle = thread::spawn(move || {
            let mut requests = Vec::new();
            for (status, body) in responses {
                let (mut stream, _) = listener.accept().expect("accept");
                requests.push(read_request(&mut stream));
                let reason = if status < 400 { "OK" } else { "Error" };
                let response = format!(
                    "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                // Clients may hang up once they have read what they need.
                let _ = stream.write_all(response.as_bytes());
            }
            requests
        });
        Self {
            base_url: format!("http://{addr}"),
            handle,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Wait for every canned response to be served; returns the raw requests.
    pub fn finish(self) -> Vec<String> {
        self.handle.join().expect("stub server thread")
    }
}

fn read_request(stream: &mut TcpStream) -> String {
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("read timeout");
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let mut wanted = None;
    loop {
        if wanted.is_none()
            && let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n")
        {
            let headers = String::from_utf8_lossy(&buf[..end]).into_owned();
            let length = headers
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            wanted = Some(end + 4 + length);
        }
        if wanted.is_some_and(|total| buf.len() >= total) {
            break;
        }
        let n = stream.read(&mut chunk).expect("read request");
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    String::from_utf8_lossy(&buf).into_owned()
}
