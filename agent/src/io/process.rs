//! Child process execution for the code and shell tools.

use std::io::{ErrorKind, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

/// Captured child process output.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
    pub timed_out: bool,
}

impl CommandOutput {
    /// Lossy UTF-8 stdout, with a marker when bytes were dropped.
    pub fn stdout_text(&self) -> String {
        render_stream(&self.stdout, self.stdout_truncated)
    }

    pub fn stderr_text(&self) -> String {
        render_stream(&self.stderr, self.stderr_truncated)
    }

    /// Exit code, or `None` when the child was killed by a signal.
    pub fn exit_code(&self) -> Option<i32> {
        self.status.code()
    }
}

fn render_stream(bytes: &[u8], truncated: usize) -> String {
    let mut text = String::from_utf8_lossy(bytes).into_owned();
    if truncated > 0 {
        text.push_str(&format!("\n[output truncated: {truncated} more bytes]"));
    }
    text
}

/// Time allowed for output pipes to close once the child is gone.
const PIPE_GRACE: Duration = Duration::from_millis(500);

/// Run a command with stdin closed, a wall-clock timeout, and bounded output capture.
///
/// Both pipes are drained on reader threads while the child runs, so a chatty child
/// cannot block on a full pipe. Bytes beyond `output_limit_bytes` per stream are
/// counted and discarded. On timeout the child's process group is killed and
/// `timed_out` is set.
///
/// Processes the child leaves behind may hold its pipes open. Output is collected
/// until the pipes close or the deadline passes, whichever comes first; after that
/// the group is killed and whatever was captured is returned.
#[instrument(skip_all, fields(timeout_secs = timeout.as_secs(), output_limit_bytes))]
pub fn run_command_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    output_limit_bytes: usize,
) -> Result<CommandOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    let deadline = Instant::now() + timeout;
    debug!(program = ?cmd.get_program(), "spawning child process");
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, program = ?cmd.get_program(), "failed to spawn command");
            return Err(e).with_context(|| format!("spawn {:?}", cmd.get_program()));
        }
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let mut readers = Readers::new();
    let stdout_capture = readers.spawn("stdout", stdout, output_limit_bytes);
    let stderr_capture = readers.spawn("stderr", stderr, output_limit_bytes);

    let mut timed_out = false;
    let status = match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => status,
        None => {
            warn!(
                timeout_secs = timeout.as_secs(),
                "command timed out, killing"
            );
            timed_out = true;
            kill_group(&mut child)?;
            child.wait().context("wait command after kill")?
        }
    };

    let wait = deadline
        .saturating_duration_since(Instant::now())
        .max(PIPE_GRACE);
    if !readers.wait(wait)? {
        warn!("output pipes held open past the deadline, killing process group");
        signal_group(child.id());
        if !readers.wait(PIPE_GRACE)? {
            warn!("output pipes still open, returning partial output");
        }
    }

    let (stdout, stdout_truncated) = take_capture(&stdout_capture);
    let (stderr, stderr_truncated) = take_capture(&stderr_capture);

    if stdout_truncated > 0 || stderr_truncated > 0 {
        warn!(stdout_truncated, stderr_truncated, "output truncated");
    }

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(CommandOutput {
        status,
        stdout,
        stderr,
        stdout_truncated,
        stderr_truncated,
        timed_out,
    })
}

#[derive(Debug, Default)]
struct Capture {
    bytes: Vec<u8>,
    truncated: usize,
}

type SharedCapture = Arc<Mutex<Capture>>;

/// Pipe reader threads and the channel they report completion on.
struct Readers {
    done_tx: mpsc::Sender<Result<()>>,
    done_rx: mpsc::Receiver<Result<()>>,
    pending: usize,
}

impl Readers {
    fn new() -> Self {
        let (done_tx, done_rx) = mpsc::channel();
        Self {
            done_tx,
            done_rx,
            pending: 0,
        }
    }

    /// Drain `reader` on its own thread into the returned capture.
    fn spawn<R: Read + Send + 'static>(
        &mut self,
        stream: &'static str,
        reader: R,
        limit: usize,
    ) -> SharedCapture {
        let capture = SharedCapture::default();
        let sink = Arc::clone(&capture);
        let done = self.done_tx.clone();
        thread::spawn(move || {
            let result =
                read_stream_limited(reader, limit, &sink).with_context(|| format!("read {stream}"));
            // The receiver is gone once the caller stopped waiting.
            let _ = done.send(result);
        });
        self.pending += 1;
        capture
    }

    /// Wait for every reader to hit end of stream. `Ok(false)` means `wait` ran out first.
    fn wait(&mut self, wait: Duration) -> Result<bool> {
        let deadline = Instant::now() + wait;
        while self.pending > 0 {
            match self
                .done_rx
                .recv_timeout(deadline.saturating_duration_since(Instant::now()))
            {
                Ok(result) => {
                    self.pending -= 1;
                    result?;
                }
                Err(RecvTimeoutError::Timeout) => return Ok(false),
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(anyhow!("output readers stopped without reporting"));
                }
            }
        }
        Ok(true)
    }
}

fn read_stream_limited<R: Read>(mut reader: R, limit: usize, sink: &Mutex<Capture>) -> Result<()> {
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            return Ok(());
        }
        let mut capture = sink.lock().unwrap_or_else(PoisonError::into_inner);
        let keep = n.min(limit.saturating_sub(capture.bytes.len()));
        capture.bytes.extend_from_slice(&chunk[..keep]);
        capture.truncated += n - keep;
    }
}

fn take_capture(capture: &Mutex<Capture>) -> (Vec<u8>, usize) {
    let mut capture = capture.lock().unwrap_or_else(PoisonError::into_inner);
    let capture = std::mem::take(&mut *capture);
    (capture.bytes, capture.truncated)
}

/// Kill the child and everything it started.
fn kill_group(child: &mut Child) -> Result<()> {
    signal_group(child.id());
    match child.kill() {
        Ok(()) => Ok(()),
        // Already gone, e.g. taken down with its group.
        Err(err) if err.kind() == ErrorKind::InvalidInput => Ok(()),
        Err(err) => Err(err).context("kill command"),
    }
}

/// Send SIGKILL to the process group led by `pid`. Best effort.
#[cfg(unix)]
fn signal_group(pid: u32) {
    let status = Command::new("kill")
        .args(["-KILL", "--", &format!("-{pid}")])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    match status {
        Ok(status) if status.success() => debug!(pgid = pid, "process group killed"),
        Ok(status) => debug!(pgid = pid, exit_code = ?status.code(), "process group kill failed"),
        Err(err) => debug!(pgid = pid, err = %err, "could not run kill"),
    }
}

#[cfg(not(unix))]
fn signal_group(_pid: u32) {}
