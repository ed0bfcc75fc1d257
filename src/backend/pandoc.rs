//! Subprocess backend: stream the fragment through `pandoc`.
//!
//! ## Pipe protocol
//!
//! ```text
//!   caller thread                 pandoc                 reader thread
//!   ─────────────                 ──────                 ─────────────
//!   render node 1 ──▶ stdin ──▶  (converts)  ──▶ stdout ──▶ read_to_end
//!   render node 2 ──▶   …                         …
//!   close stdin   ──▶  EOF                        EOF   ──▶ send(buffer)
//!   recv(buffer)  ◀──────────────────────────────────────────────┘
//! ```
//!
//! Both pipe ends are taken and the reader is running before the first byte
//! is written. Pipe buffers are bounded, and pandoc may start emitting output
//! before it has read all input; without a concurrent reader a large page
//! would block pandoc on stdout while we block on stdin.
//!
//! ## Timeout
//!
//! The limit counts from spawn and covers the child's whole lifetime,
//! writing stdin included. A watchdog thread kills the child when it
//! expires; the pending write then fails, the reader sees end-of-stream, and
//! the call fails with an [`io::ErrorKind::TimedOut`] error.

use super::{BackendError, MarkdownBackend};
use crate::config::PandocConfig;
use crate::html::{Fragment, write_fragment};
use std::io::{self, BufWriter, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// External filter backend. Defaults to `pandoc -r html -w markdown`.
#[derive(Debug, Clone)]
pub struct PandocBackend {
    program: String,
    args: Vec<String>,
    /// `Duration::ZERO` disables the limit.
    timeout: Duration,
}

impl PandocBackend {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: Duration::ZERO,
        }
    }

    pub fn from_config(config: &PandocConfig) -> Self {
        Self::new(config.program.clone(), config.args()).with_timeout(config.timeout())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn timed_out(&self) -> BackendError {
        BackendError::io(
            format!(
                "{} did not finish within {}s",
                self.program,
                self.timeout.as_secs_f64()
            ),
            io::ErrorKind::TimedOut.into(),
        )
    }

    /// Block until the reader reports, honouring the time limit.
    fn wait_for_output(
        &self,
        done: &Receiver<io::Result<Vec<u8>>>,
        started: Instant,
    ) -> Result<io::Result<Vec<u8>>, BackendError> {
        let disconnected = || {
            BackendError::io(
                format!("output reader for {} exited without a result", self.program),
                io::Error::other("reader thread disconnected"),
            )
        };
        if self.timeout.is_zero() {
            return done.recv().map_err(|_| disconnected());
        }
        let remaining = self.timeout.saturating_sub(started.elapsed());
        match done.recv_timeout(remaining) {
            Ok(result) => Ok(result),
            Err(RecvTimeoutError::Timeout) => Err(self.timed_out()),
            Err(RecvTimeoutError::Disconnected) => Err(disconnected()),
        }
    }
}

impl MarkdownBackend for PandocBackend {
    fn convert(&self, fragment: &Fragment) -> Result<String, BackendError> {
        let started = Instant::now();
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                BackendError::io(
                    format!("could not start command: {}", self.command_line()),
                    e,
                )
            })?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let mut child = ChildGuard::new(child);
        let stdin = stdin.ok_or_else(|| missing_pipe(&self.program, "stdin"))?;
        let mut stdout = stdout.ok_or_else(|| missing_pipe(&self.program, "stdout"))?;

        let (done_tx, done_rx) = mpsc::channel();
        thread::Builder::new()
            .name("pandoc-output".into())
            .spawn(move || {
                let mut buf = Vec::new();
                let result = stdout.read_to_end(&mut buf).map(|_| buf);
                // The receiver is gone only after a timeout; nothing to report to.
                let _ = done_tx.send(result);
            })
            .map_err(|e| BackendError::io("could not start output reader", e))?;

        let watchdog = if self.timeout.is_zero() {
            None
        } else {
            Some(Watchdog::start(&child, self.timeout)?)
        };

        let mut input = BufWriter::new(stdin);
        let failures = write_fragment(fragment, &mut input);
        if failures > 0 {
            log::debug!(
                "{failures} of {} nodes not written to {}",
                fragment.len(),
                self.program
            );
        }
        // Dropping the handle closes stdin, which is pandoc's end-of-input.
        if let Err(err) = input.into_inner() {
            log::warn!("failed to flush input to {}: {}", self.program, err.error());
        }
        if watchdog.as_ref().is_some_and(Watchdog::fired) {
            return Err(self.timed_out());
        }

        let output = self.wait_for_output(&done_rx, started)?;
        if let Some(watchdog) = watchdog
            && watchdog.stop()
        {
            return Err(self.timed_out());
        }
        let output = output.map_err(|e| {
            BackendError::io(format!("failed reading from {} output", self.program), e)
        })?;

        let status = child
            .wait()
            .map_err(|e| BackendError::io(format!("failed waiting for {}", self.program), e))?;
        if !status.success() {
            log::warn!("{} exited with {status}", self.command_line());
        }

        Ok(String::from_utf8_lossy(&output).into_owned())
    }
}

fn missing_pipe(program: &str, which: &str) -> BackendError {
    BackendError::io(
        format!("failed to open pipe to {which} of {program}"),
        io::Error::other(format!("{which} not captured")),
    )
}

/// Kills the child once the deadline passes unless stopped first.
struct Watchdog {
    cancel: Sender<()>,
    fired: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl Watchdog {
    fn start(child: &ChildGuard, timeout: Duration) -> Result<Self, BackendError> {
        let (cancel, cancelled) = mpsc::channel::<()>();
        let fired = Arc::new(AtomicBool::new(false));
        let target = Arc::clone(&child.inner);
        let flag = Arc::clone(&fired);
        let handle = thread::Builder::new()
            .name("pandoc-watchdog".into())
            .spawn(move || {
                if let Err(RecvTimeoutError::Timeout) = cancelled.recv_timeout(timeout) {
                    flag.store(true, Ordering::SeqCst);
                    let _ = lock(&target).kill();
                }
            })
            .map_err(|e| BackendError::io("could not start watchdog", e))?;
        Ok(Self {
            cancel,
            fired,
            handle,
        })
    }

    fn fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Cancel the deadline. Returns whether it had already fired.
    fn stop(self) -> bool {
        drop(self.cancel);
        let _ = self.handle.join();
        self.fired.load(Ordering::SeqCst)
    }
}

fn lock(child: &Mutex<Child>) -> MutexGuard<'_, Child> {
    child.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Kills and reaps the child on every exit path that did not wait on it.
struct ChildGuard {
    inner: Arc<Mutex<Child>>,
    reaped: bool,
}

impl ChildGuard {
    fn new(inner: Child) -> Self {
        Self {
            inner: Arc::new(Mutex::new(inner)),
            reaped: false,
        }
    }

    fn wait(&mut self) -> io::Result<ExitStatus> {
        let status = lock(&self.inner).wait()?;
        self.reaped = true;
        Ok(status)
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if !self.reaped {
            let mut child = lock(&self.inner);
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::html::{extract, parse_str, render_fragment};

    fn fragment_of(html: &str) -> Fragment {
        extract(&parse_str(html))
    }

    fn cat() -> PandocBackend {
        PandocBackend::new("cat", vec![])
    }

    #[test]
    fn default_command_line() {
        let backend = PandocBackend::from_config(&PandocConfig::default());
        assert_eq!(backend.command_line(), "pandoc -r html -w markdown");
        assert_eq!(backend.timeout, Duration::from_secs(120));
    }

    #[test]
    fn streams_fragment_through_filter() {
        let fragment = fragment_of(r#"<div id="main-content"><h1>Title</h1><p>Hello</p></div>"#);
        let out = cat().convert(&fragment).unwrap();
        assert_eq!(out, "<h1>Title</h1><p>Hello</p>");
    }

    #[test]
    fn empty_fragment_completes_without_hanging() {
        let fragment = fragment_of("<p>no content container</p>");
        assert!(fragment.is_empty());
        let out = cat()
            .with_timeout(Duration::from_secs(10))
            .convert(&fragment)
            .unwrap();
        assert_eq!(out, "");
    }

    #[test]
    fn output_larger_than_pipe_buffer_does_not_deadlock() {
        let paragraph = format!("<p>{}</p>", "lorem ipsum ".repeat(20));
        let html = format!(
            r#"<div id="main-content">{}</div>"#,
            paragraph.repeat(5_000)
        );
        let fragment = fragment_of(&html);
        let expected = render_fragment(&fragment);
        assert!(expected.len() > 1_000_000);

        let out = cat()
            .with_timeout(Duration::from_secs(30))
            .convert(&fragment)
            .unwrap();
        assert_eq!(out.len(), expected.len());
        assert_eq!(out, expected);
    }

    #[test]
    fn missing_program_is_io_error() {
        let backend = PandocBackend::new("wikidown-no-such-filter", vec!["-r".into()]);
        let err = backend.convert(&Fragment::default()).unwrap_err();
        match err {
            BackendError::Io { context, source } => {
                assert!(context.contains("wikidown-no-such-filter -r"));
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("expected Io error, got {other:?}"),
        }
    }

    #[test]
    fn hung_filter_times_out() {
        let backend =
            PandocBackend::new("sleep", vec!["5".into()]).with_timeout(Duration::from_millis(200));
        let fragment = fragment_of(r#"<div id="main-content"><p>x</p></div>"#);

        let started = Instant::now();
        let err = backend.convert(&fragment).unwrap_err();
        assert!(err.is_timeout(), "expected timeout, got {err}");
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn timeout_covers_blocked_stdin_writes() {
        // Far more than a pipe buffer, fed to a filter that never reads.
        let html = format!(
            r#"<div id="main-content">{}</div>"#,
            format!("<p>{}</p>", "x".repeat(200)).repeat(6_000)
        );
        let fragment = fragment_of(&html);
        assert!(render_fragment(&fragment).len() > 1_048_576);
        let backend =
            PandocBackend::new("sleep", vec!["6".into()]).with_timeout(Duration::from_millis(200));

        let started = Instant::now();
        let err = backend.convert(&fragment).unwrap_err();

        assert!(err.is_timeout(), "expected timeout, got {err}");
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn nonzero_exit_still_returns_output() {
        let backend = PandocBackend::new("sh", vec!["-c".into(), "cat; exit 3".into()]);
        let fragment = fragment_of(r#"<div id="main-content"><p>kept</p></div>"#);
        assert_eq!(backend.convert(&fragment).unwrap(), "<p>kept</p>");
    }

    #[test]
    fn filter_that_ignores_input_still_completes() {
        let backend = PandocBackend::new("true", vec![]).with_timeout(Duration::from_secs(10));
        let fragment = fragment_of(r#"<div id="main-content"><p>ignored</p></div>"#);
        assert_eq!(backend.convert(&fragment).unwrap(), "");
    }

    #[test]
    #[ignore] // Requires pandoc
    fn real_pandoc_converts_heading() {
        let backend = PandocBackend::from_config(&PandocConfig::default());
        let fragment = fragment_of(r#"<div id="main-content"><h1>Title</h1><p>Body</p></div>"#);
        let out = backend.convert(&fragment).unwrap();
        assert!(out.contains("Title"));
        assert!(out.contains("Body"));
    }
}
