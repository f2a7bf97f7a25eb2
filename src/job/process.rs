/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! This module contains [`ProcessJob`], the subprocess-wrapping specialisation of a job
//! backed by `tokio::process`.

use std::{
	pin::Pin,
	process::Stdio as StdStdio,
	task::{Context, Poll, Waker},
};

use non_non_full::NonEmptyVec;
use tap::TapOptional as _;
use tokio::{
	io::{AsyncRead, ReadBuf},
	process::{Child, ChildStderr, ChildStdout, Command},
};

use crate::{
	StaticStr,
	error::{BoxError, ProcessFailedError},
	job::{JobPoll, OpaqueJob},
	outcome::Outcome,
};

/// One read's worth of non-blocking drain: large enough to drain
/// chatty processes quickly, small enough to never block waiting for a full buffer.
const DRAIN_CHUNK: usize = 10 * 1024;

/// Where a [`ProcessJob`]'s stdout/stderr should go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Disposition {
	/// Captured via a pipe and drained into this job's buffer (the default).
	#[default]
	Piped,

	/// Inherited from this process -- not captured.
	Inherit,

	/// Folded into `stdout` once the process terminates (stderr only).
	///
	/// stdout and stderr remain two independent OS pipes throughout the run (tokio's
	/// `Command` has no portable, safe way to dup2 one fd onto the other ahead of `spawn`
	/// without `unsafe`, which this crate forbids), so bytes are not interleaved the way a
	/// real shell `2>&1` would interleave them -- stderr's full captured text is appended
	/// after stdout's once both pipes are drained and the process has exited.
	RedirectToStdout,
}

impl Disposition {
	fn into_stdio(self) -> StdStdio {
		match self {
			Self::Piped => StdStdio::piped(),
			Self::Inherit => StdStdio::inherit(),
			Self::RedirectToStdout => StdStdio::piped(),
		}
	}
}

/// The terminal outcome of a finished [`ProcessJob`], handed to its `callback` (if any).
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
	/// The process's exit code, or `None` if terminated by a signal.
	pub exit_code: Option<i32>,

	/// Captured stdout, decoded as UTF-8 with replacement.
	pub stdout: String,

	/// Captured stderr, decoded as UTF-8 with replacement (empty if redirected to stdout).
	pub stderr: String,
}

impl ProcessOutcome {
	#[must_use]
	pub const fn was_successful(&self) -> bool {
		matches!(self.exit_code, Some(0))
	}
}

/// A callback invoked once a [`ProcessJob`] terminates, matching a job's `callback`
/// attribute.
type Callback = Box<dyn FnMut(&ProcessOutcome) + Send>;

/// A decoder that buffers a possible split multi-byte UTF-8 sequence across reads.
///
/// `original_source` decodes each chunk eagerly and independently; naively porting that would
/// corrupt output whenever a multi-byte character straddles two reads (resolved here, per
/// this detail is otherwise unspecified).
#[derive(Default)]
struct Utf8Decoder {
	text: String,
	tail: Vec<u8>,
}

impl Utf8Decoder {
	fn feed(&mut self, chunk: &[u8]) {
		self.tail.extend_from_slice(chunk);

		match std::str::from_utf8(&self.tail) {
			Ok(valid) => {
				self.text.push_str(valid);
				self.tail.clear();
			}
			Err(e) => {
				let valid_len = e.valid_up_to();
				// SAFETY-free: this is only ever a `.to_owned()`d, not actually unsafe; kept
				// simple via `from_utf8_lossy` on the valid prefix.
				let (valid, rest) = self.tail.split_at(valid_len);
				self.text.push_str(&String::from_utf8_lossy(valid));

				// if the remainder is too long to ever become valid (more than the longest
				// possible UTF-8 sequence), it's genuinely invalid: flush it lossily and drop it
				// rather than buffering forever.
				if rest.len() >= 4 {
					self.text.push_str(&String::from_utf8_lossy(rest));
					self.tail.clear();
				} else {
					self.tail = rest.to_vec();
				}
			}
		}
	}

	fn finish(mut self) -> String {
		if !self.tail.is_empty() {
			self.text.push_str(&String::from_utf8_lossy(&self.tail));
		}
		self.text
	}
}

enum State {
	NotStarted,
	Running {
		child: Child,
		stdout: Option<ChildStdout>,
		stderr: Option<ChildStderr>,
		stdout_buf: Utf8Decoder,
		stderr_buf: Utf8Decoder,
	},
	Terminal,
}

/// A specialised [`OpaqueJob`] whose single attempt is exactly one OS process execution
/// Does not use the [`Job`](crate::job::Job)/[`JobBody`](crate::job::JobBody)
/// machinery -- it has its own small state machine.
///
/// `poll` needs a `tokio` reactor in scope to register the child's pipes, so driving one to
/// completion outside an already-running `tokio` task (as in this doctest) requires entering a
/// runtime first:
///
/// ```rust
/// # tokio_test::block_on(async {
/// use boreworks::{job::process::ProcessJob, OpaqueJob, JobPoll};
///
/// let mut job = ProcessJob::builder("echo").argv(vec!["echo".to_owned(), "hi".to_owned()]).build();
/// while job.poll() != JobPoll::Terminal {
///     tokio::task::yield_now().await;
/// }
/// assert!(job.was_successful());
/// # });
/// ```
#[derive(bon::Builder)]
pub struct ProcessJob {
	#[builder(start_fn, into)]
	name: StaticStr,

	/// The argv to execute: `argv[0]` is the program, the rest are its arguments.
	argv: Vec<String>,

	#[builder(default)]
	stdout_disposition: Disposition,

	#[builder(default)]
	stderr_disposition: Disposition,

	/// Extra environment variables merged over the inherited environment.
	#[builder(default)]
	env: Vec<(String, String)>,

	callback: Option<Callback>,

	#[builder(skip)]
	state: StateCell,

	#[builder(skip)]
	exit_code: Option<i32>,

	#[builder(skip)]
	stdout: String,

	#[builder(skip)]
	stderr: String,

	#[builder(skip)]
	captured_exception: Option<BoxError>,

	#[builder(skip)]
	outcome: Option<Outcome>,
}

/// `Child`/`ChildStdout` aren't `Default`; wrap the state machine so `#[builder(skip)]` can
/// still zero-initialise the field.
struct StateCell(State);
impl Default for StateCell {
	fn default() -> Self {
		Self(State::NotStarted)
	}
}

/// Polls a child pipe for whatever is immediately available without blocking, reusing its
/// cached reactor readiness rather than awaiting a fresh one. `tokio::process::ChildStdout`/
/// `ChildStderr` give only `AsyncRead`, not the `try_read` that `TcpStream`/`UnixStream`/
/// `unix::pipe::Receiver` expose, so this drives `poll_read` once with a no-op waker and maps
/// `Pending` to `WouldBlock`, matching `try_read`'s contract without actually registering for
/// a wakeup.
fn try_read_once(stream: &mut (impl AsyncRead + Unpin), buf: &mut [u8]) -> std::io::Result<usize> {
	let waker = Waker::noop();
	let mut cx = Context::from_waker(waker);
	let mut read_buf = ReadBuf::new(buf);
	match Pin::new(stream).poll_read(&mut cx, &mut read_buf) {
		Poll::Ready(Ok(())) => Ok(read_buf.filled().len()),
		Poll::Ready(Err(e)) => Err(e),
		Poll::Pending => Err(std::io::ErrorKind::WouldBlock.into()),
	}
}

impl ProcessJob {
	/// The process's exit code, once terminated.
	#[must_use]
	pub const fn exit_code(&self) -> Option<i32> {
		self.exit_code
	}

	/// Captured stdout so far (frozen once the job is terminal).
	#[must_use]
	pub fn stdout(&self) -> &str {
		&self.stdout
	}

	/// Captured stderr so far (frozen once the job is terminal). When stderr is redirected to
	/// stdout, this is always empty once the job is terminal -- its text has been appended to
	/// [`Self::stdout`] instead.
	#[must_use]
	pub fn stderr(&self) -> &str {
		&self.stderr
	}

	fn spawn(&mut self) {
		let Some(argv) = NonEmptyVec::new(self.argv.clone()).tap_none(|| {
			tracing::error!(job = %self.name, "ProcessJob constructed with an empty argv");
		}) else {
			self.captured_exception = Some(Box::from("ProcessJob argv must not be empty"));
			self.state = StateCell(State::Terminal);
			return;
		};

		let mut command = Command::new(argv.first());
		command.args(&argv.as_vec()[1..]);
		command.envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
		command.stdout(self.stdout_disposition.into_stdio());
		command.stderr(match self.stderr_disposition {
			Disposition::RedirectToStdout => StdStdio::piped(),
			other => other.into_stdio(),
		});

		match command.spawn() {
			Ok(mut child) => {
				let stdout = child.stdout.take();
				let stderr = child.stderr.take();
				self.state = StateCell(State::Running {
					child,
					stdout,
					stderr,
					stdout_buf: Utf8Decoder::default(),
					stderr_buf: Utf8Decoder::default(),
				});
			}
			Err(e) => {
				self.captured_exception = Some(Box::new(e));
				self.state = StateCell(State::Terminal);
			}
		}
	}

	/// Non-blocking drain of every open pipe: read up to [`DRAIN_CHUNK`]
	/// bytes at a time while any pipe is readable, stop once a full sweep reads nothing.
	fn drain(&mut self) {
		let State::Running {
			stdout,
			stderr,
			stdout_buf,
			stderr_buf,
			..
		} = &mut self.state.0
		else {
			return;
		};

		let mut buf = [0_u8; DRAIN_CHUNK];
		loop {
			let mut progressed = false;

			if let Some(out) = stdout.as_mut() {
				match try_read_once(out, &mut buf) {
					Ok(0) => {}
					Ok(n) => {
						stdout_buf.feed(&buf[..n]);
						progressed = true;
					}
					Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
					Err(_) => {}
				}
			}

			if let Some(err) = stderr.as_mut() {
				match try_read_once(err, &mut buf) {
					Ok(0) => {}
					Ok(n) => {
						stderr_buf.feed(&buf[..n]);
						progressed = true;
					}
					Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
					Err(_) => {}
				}
			}

			if !progressed {
				break;
			}
		}
	}

	fn finish(&mut self, exit_code: Option<i32>) {
		self.drain();

		let State::Running { stdout_buf, stderr_buf, .. } =
			std::mem::replace(&mut self.state.0, State::Terminal)
		else {
			unreachable!("finish is only called from the Running state");
		};

		let mut stdout = stdout_buf.finish();
		let mut stderr = stderr_buf.finish();

		if matches!(self.stderr_disposition, Disposition::RedirectToStdout) {
			stdout.push_str(&stderr);
			stderr.clear();
		}

		self.stdout = stdout;
		self.stderr = stderr;
		self.exit_code = exit_code;

		let outcome = ProcessOutcome {
			exit_code,
			stdout: self.stdout.clone(),
			stderr: self.stderr.clone(),
		};

		if let Some(callback) = self.callback.as_mut() {
			callback(&outcome);
		}

		self.outcome = Some(if outcome.was_successful() {
			Outcome::ok()
		} else {
			Outcome::Err(Box::new(ProcessFailedError {
				argv: self.argv.clone(),
				exit_code,
				stdout: self.stdout.clone(),
			}))
		});
	}
}

impl OpaqueJob for ProcessJob {
	fn start(&mut self) {
		if matches!(self.state.0, State::NotStarted) {
			self.spawn();
		}
	}

	fn poll(&mut self) -> JobPoll {
		if matches!(self.state.0, State::NotStarted) {
			self.spawn();
			return JobPoll::Pending;
		}

		if !matches!(self.state.0, State::Running { .. }) {
			return JobPoll::Terminal;
		}

		self.drain();

		let State::Running { child, .. } = &mut self.state.0 else {
			unreachable!("checked above");
		};

		match child.try_wait() {
			Ok(Some(status)) => {
				self.finish(status.code());
				JobPoll::Terminal
			}
			Ok(None) => JobPoll::Pending,
			Err(e) => {
				self.captured_exception = Some(Box::new(e));
				self.state = StateCell(State::Terminal);
				JobPoll::Terminal
			}
		}
	}

	fn is_terminal(&self) -> bool {
		matches!(self.state.0, State::Terminal)
	}

	fn outcome(&self) -> Option<&Outcome> {
		self.outcome.as_ref()
	}

	fn captured_exception(&self) -> Option<&BoxError> {
		self.captured_exception.as_ref()
	}

	fn name(&self) -> &str {
		&self.name
	}
}

#[cfg(test)]
mod tests {
	use super::{Disposition, ProcessJob};
	use crate::job::{JobPoll, OpaqueJob};

	#[tokio::test]
	async fn successful_process_completes_with_exit_zero() {
		let mut job = ProcessJob::builder("echo")
			.argv(vec!["echo".to_owned(), "hello".to_owned()])
			.build();

		while job.poll() == JobPoll::Pending {
			tokio::task::yield_now().await;
		}

		assert!(job.was_successful());
		assert_eq!(job.exit_code(), Some(0));
		assert!(job.stdout().contains("hello"));
	}

	#[tokio::test]
	async fn nonzero_exit_is_unsuccessful() {
		let mut job = ProcessJob::builder("false")
			.argv(vec!["sh".to_owned(), "-c".to_owned(), "exit 3".to_owned()])
			.build();

		while job.poll() == JobPoll::Pending {
			tokio::task::yield_now().await;
		}

		assert!(!job.was_successful());
		assert_eq!(job.exit_code(), Some(3));
	}

	#[tokio::test]
	async fn huge_stdout_does_not_deadlock_on_pipe_backpressure() {
		let mut job = ProcessJob::builder("big")
			.argv(vec![
				"sh".to_owned(),
				"-c".to_owned(),
				"i=0; while [ $i -lt 10000 ]; do echo \"line $i\"; i=$((i+1)); done".to_owned(),
			])
			.stdout_disposition(Disposition::Piped)
			.build();

		while job.poll() == JobPoll::Pending {
			tokio::task::yield_now().await;
		}

		assert!(job.was_successful());
		assert_eq!(job.stdout().lines().count(), 10_000);
	}

	#[tokio::test]
	async fn callback_observes_final_outcome() {
		use std::sync::{Arc, Mutex};

		let seen = Arc::new(Mutex::new(None));
		let seen_clone = Arc::clone(&seen);

		let mut job = ProcessJob::builder("echo")
			.argv(vec!["echo".to_owned(), "hi".to_owned()])
			.callback(Box::new(move |outcome| {
				*seen_clone.lock().expect("not poisoned") = Some(outcome.exit_code);
			}))
			.build();

		while job.poll() == JobPoll::Pending {
			tokio::task::yield_now().await;
		}

		assert_eq!(*seen.lock().expect("not poisoned"), Some(Some(0)));
	}
}
