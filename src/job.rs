/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! This module contains the cooperative [`Job`] state machine, the [`OpaqueJob`] trait the rest
//! of the scheduler (`Pool`, `Stage`, `Executor`) drives jobs through, and the [`JobBody`]/
//! [`StepSeq`] protocol a caller implements to describe a job's actual work.

pub mod process;

use std::fmt;

use crate::{StaticStr, cancellation_token::CancellationToken, error::BoxError, outcome::Outcome};

/// The return value of [`OpaqueJob::poll`]: whether the job needs at least one more tick, or
/// has reached a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPoll {
	/// The job has not yet reached a terminal state; call `poll` again on a future tick.
	Pending,

	/// The job is done: `outcome()`/`captured_exception()` will not change again.
	Terminal,
}

/// A single value produced by a [`JobBody`] between suspensions.
///
/// An explicit recast of a dynamic `isinstance`-style dispatch on a
/// yielded value: `Child` for a nested sub-job, `Done` for the attempt's terminal outcome, and
/// `Progress` for anything else (an opaque marker the scheduler does not interpret).
pub enum Step<P> {
	/// A nested job to run to completion before the next step is produced.
	Child(Box<dyn OpaqueJob>),

	/// The current attempt's terminal outcome.
	Done(Outcome),

	/// An opaque progress marker; the scheduler advances past it without interpreting it.
	Progress(P),
}

/// What a [`StepSeq`] is handed back on the call following a [`Step::Child`]: the just-finished
/// child, so the body can inspect its outcome (a `subtask_result()`-style helper, realised
/// here by literally handing the finished job back rather than a side-channel getter).
pub enum StepInput {
	/// This is the first call for the current attempt.
	Start,

	/// The previously yielded child job has reached a terminal state.
	ChildFinished(Box<dyn OpaqueJob>),
}

/// A restartable, stateful sequence of [`Step`]s: the recast of the source's generator-style
/// job body. A fresh `StepSeq` is produced by [`JobBody::produce_steps`] for every
/// attempt, so retries re-enter the body from the beginning rather than resuming it.
pub trait StepSeq<P> {
	/// Advances the sequence by one step.
	///
	/// `input` carries the outcome of the previously yielded child job (or `Start` on the very
	/// first call of an attempt). Returns `Ok(None)` when the sequence is exhausted without a
	/// recorded [`Step::Done`], and `Err` when producing this step raised -- both terminate the
	/// current attempt and consume one unit of retry budget.
	fn next(&mut self, input: StepInput) -> Result<Option<Step<P>>, BoxError>;
}

/// Describes a job's actual work: what to do, yielded lazily as a [`StepSeq`].
///
/// Implementations override `produce_steps`; everything else (retries, sub-job composition,
/// exception capture) is handled by the generic [`Job`] wrapper.
pub trait JobBody {
	/// The type of opaque progress markers this body's steps may yield.
	type Progress;

	/// Produces a fresh step sequence for a new attempt. Called once per attempt, never
	/// resumed across attempts -- see the [`StepSeq`] docs.
	fn produce_steps(&mut self) -> Box<dyn StepSeq<Self::Progress>>;
}

/// The scheduler-facing surface every job (concrete [`Job`], [`process::ProcessJob`], or a
/// caller's own specialisation) exposes to `Pool`/`Stage`/`Executor`.
///
/// Generalised from an `async fn run` to the
/// non-blocking `poll` protocol.
pub trait OpaqueJob {
	/// Initialises internal state for the first attempt. A no-op if already started (the first
	/// `poll()` lazily starts the job regardless).
	fn start(&mut self);

	/// Advances the job by at most one scheduling tick.
	fn poll(&mut self) -> JobPoll;

	/// `true` once the job has reached a terminal state (`poll` is a no-op from here on).
	fn is_terminal(&self) -> bool;

	/// The recorded terminal outcome, once terminal. `None` before termination, or if the job
	/// terminated purely via a captured exception with no recorded [`Outcome`].
	fn outcome(&self) -> Option<&Outcome>;

	/// The exception captured while producing a step or from an unhandled sub-job failure, if
	/// any.
	fn captured_exception(&self) -> Option<&BoxError>;

	/// A human-readable name for logging, matching the `runner.stage.job[.idx]` logger-name hierarchy.
	fn name(&self) -> &str;

	/// `true` iff the job terminated with no captured exception and a truthy (`Ok`/`Skip`)
	/// outcome.
	fn was_successful(&self) -> bool {
		self.captured_exception().is_none() && self.outcome().is_some_and(Outcome::is_success)
	}

	/// Busy-polls until the job is terminal, then returns its outcome.
	///
	/// If `can_fail` is `false` and a `captured_exception` is set, that exception is returned as
	/// an error instead -- the sole re-raise point in the propagation policy.
	fn get_result(&mut self, can_fail: bool) -> Result<Option<&Outcome>, &BoxError> {
		while !self.is_terminal() {
			self.poll();
		}

		if !can_fail {
			if let Some(e) = self.captured_exception() {
				return Err(e);
			}
		}

		Ok(self.outcome())
	}
}

impl fmt::Debug for dyn OpaqueJob {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("OpaqueJob")
			.field("name", &self.name())
			.field("terminal", &self.is_terminal())
			.finish()
	}
}

impl OpaqueJob for () {
	fn start(&mut self) {}
	fn poll(&mut self) -> JobPoll {
		JobPoll::Terminal
	}
	fn is_terminal(&self) -> bool {
		true
	}
	fn outcome(&self) -> Option<&Outcome> {
		None
	}
	fn captured_exception(&self) -> Option<&BoxError> {
		None
	}
	fn name(&self) -> &str {
		"<noop>"
	}
}

impl<J> OpaqueJob for Option<J>
where
	J: OpaqueJob,
{
	fn start(&mut self) {
		if let Some(job) = self {
			job.start();
		}
	}

	fn poll(&mut self) -> JobPoll {
		self.as_mut().map_or(JobPoll::Terminal, OpaqueJob::poll)
	}

	fn is_terminal(&self) -> bool {
		self.as_ref().is_none_or(OpaqueJob::is_terminal)
	}

	fn outcome(&self) -> Option<&Outcome> {
		self.as_ref().and_then(OpaqueJob::outcome)
	}

	fn captured_exception(&self) -> Option<&BoxError> {
		self.as_ref().and_then(OpaqueJob::captured_exception)
	}

	fn name(&self) -> &str {
		self.as_ref().map_or("<none>", OpaqueJob::name)
	}
}

/// Internal record of what a [`Job`] is currently waiting on between ticks.
enum SubTask<P> {
	/// A nested job is running; delegate polls to it.
	Child(Box<dyn OpaqueJob>),

	/// The body yielded an opaque progress marker; kept only for callers that want to inspect
	/// it (e.g. via [`Job::progress`]).
	Progress(P),
}

/// The generic cooperative job: advances a [`JobBody`]'s step
/// sequence, owns the retry loop, and composes recursively with nested sub-jobs.
#[derive(bon::Builder)]
pub struct Job<B: JobBody> {
	/// The job's name, used for logging and reported via [`OpaqueJob::name`].
	#[builder(start_fn, into)]
	name: StaticStr,

	/// How many attempts this job gets in total (≥ 1).
	#[builder(default = 1)]
	max_retries: u32,

	/// The user-supplied step producer.
	body: B,

	/// An ambient convenience a body may check (via [`Job::cancel_token`], threaded into the
	/// body by its own constructor) to bail out of a long-running step early. The scheduler
	/// itself never consults this -- there is no pre-emptive cancellation of an in-flight
	/// attempt.
	cancel_token: Option<CancellationToken>,

	#[builder(skip)]
	started: bool,

	#[builder(skip)]
	current_attempt: u32,

	#[builder(skip)]
	step_iterator: Option<Box<dyn StepSeq<B::Progress>>>,

	#[builder(skip)]
	current_sub_task: Option<SubTask<B::Progress>>,

	#[builder(skip)]
	outcome: Option<Outcome>,

	#[builder(skip)]
	captured_exception: Option<BoxError>,

	#[builder(skip)]
	failed_finally: bool,
}

impl<B: JobBody> Job<B> {
	/// The most recent opaque progress marker the body yielded, if the job is currently
	/// suspended on one rather than a child job.
	pub fn progress(&self) -> Option<&B::Progress> {
		match &self.current_sub_task {
			Some(SubTask::Progress(p)) => Some(p),
			_ => None,
		}
	}

	/// `true` once all `max_retries` attempts have been exhausted without success.
	#[must_use]
	pub const fn failed_finally(&self) -> bool {
		self.failed_finally
	}

	/// The 1-indexed attempt currently in progress (or the last one attempted, once terminal).
	#[must_use]
	pub const fn current_attempt(&self) -> u32 {
		self.current_attempt
	}

	/// The cancellation token this job was built with, if any. A body's `produce_steps`
	/// closure over this value (or a clone handed to it at construction time) is how it
	/// actually observes cancellation; the scheduler does not consult it.
	#[must_use]
	pub const fn cancel_token(&self) -> Option<&CancellationToken> {
		self.cancel_token.as_ref()
	}

	fn begin_attempt(&mut self) {
		self.current_sub_task = None;
		self.outcome = None;
		self.captured_exception = None;
		self.step_iterator = Some(self.body.produce_steps());
	}

	/// Runs one `(step iterator, attempt)` advance. Invoked once per tick, after any pending
	/// child has already been confirmed terminal by the caller.
	fn advance(&mut self) {
		let input = match self.current_sub_task.take() {
			Some(SubTask::Child(child)) => StepInput::ChildFinished(child),
			Some(SubTask::Progress(_)) | None => StepInput::Start,
		};

		let iter = self
			.step_iterator
			.as_mut()
			.expect("advance is only called once a step iterator has been produced");

		match iter.next(input) {
			Ok(Some(Step::Child(child))) => {
				self.current_sub_task = Some(SubTask::Child(child));
			}
			Ok(Some(Step::Progress(progress))) => {
				self.current_sub_task = Some(SubTask::Progress(progress));
			}
			Ok(Some(Step::Done(outcome))) => {
				self.complete_attempt(Ok(outcome));
			}
			Ok(None) => {
				// step iterator exhausted without a recorded Done: an unsuccessful attempt.
				self.complete_attempt(Err(None));
			}
			Err(exception) => {
				self.complete_attempt(Err(Some(exception)));
			}
		}
	}

	/// Records the result of a just-finished attempt and either retries or finalises.
	fn complete_attempt(&mut self, result: Result<Outcome, Option<BoxError>>) {
		let success = matches!(&result, Ok(o) if o.is_success());

		match result {
			Ok(outcome) => self.outcome = Some(outcome),
			Err(Some(exception)) => self.captured_exception = Some(exception),
			Err(None) => {}
		}

		if success {
			self.step_iterator = None;
			return;
		}

		if self.current_attempt < self.max_retries {
			self.current_attempt += 1;
			self.begin_attempt();
		} else {
			self.failed_finally = true;
			self.step_iterator = None;
		}
	}
}

impl<B: JobBody> OpaqueJob for Job<B> {
	fn start(&mut self) {
		if self.started {
			return;
		}
		self.started = true;
		self.current_attempt = 1;
		self.begin_attempt();
	}

	fn poll(&mut self) -> JobPoll {
		if self.is_terminal() {
			return JobPoll::Terminal;
		}

		if !self.started {
			self.start();
			return JobPoll::Pending;
		}

		if let Some(SubTask::Child(child)) = self.current_sub_task.as_mut() {
			if child.poll() == JobPoll::Pending {
				return JobPoll::Pending;
			}
		}

		self.advance();

		if self.is_terminal() { JobPoll::Terminal } else { JobPoll::Pending }
	}

	fn is_terminal(&self) -> bool {
		self.outcome.is_some() || self.failed_finally
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
pub(crate) mod test_support {
	//! Small fixtures shared by this module's and the integration tests: a [`JobBody`] backed
	//! by a fixed `Vec<Step>`, ignoring any child results (i.e. it never yields `Step::Child`
	//! followed by inspecting it -- see `propagating_body` in `tests/` for that case).

	use super::{JobBody, Step, StepInput, StepSeq};
	use crate::error::BoxError;

	pub struct VecBody<P> {
		steps: Vec<StepFactory<P>>,
	}

	type StepFactory<P> = Box<dyn FnMut() -> Result<Step<P>, BoxError> + Send>;

	impl<P> VecBody<P> {
		pub fn new(steps: Vec<StepFactory<P>>) -> Self {
			Self { steps }
		}
	}

	pub struct VecStepSeq<P> {
		steps: Vec<StepFactory<P>>,
		index: usize,
	}

	impl<P> JobBody for VecBody<P>
	where
		P: Send + 'static,
	{
		type Progress = P;

		fn produce_steps(&mut self) -> Box<dyn StepSeq<Self::Progress>> {
			Box::new(VecStepSeq {
				steps: std::mem::take(&mut self.steps),
				index: 0,
			})
		}
	}

	impl<P> StepSeq<P> for VecStepSeq<P>
	where
		P: Send + 'static,
	{
		fn next(&mut self, _input: StepInput) -> Result<Option<Step<P>>, BoxError> {
			let Some(factory) = self.steps.get_mut(self.index) else {
				return Ok(None);
			};
			self.index += 1;
			factory().map(Some)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::{
		JobPoll, OpaqueJob,
		test_support::{VecBody, VecStepSeq},
	};
	use crate::{
		job::{Job, Step, StepInput, StepSeq},
		outcome::Outcome,
	};

	fn ok_step() -> Step<()> {
		Step::Done(Outcome::ok())
	}

	#[test]
	fn sequential_ok_steps_succeed_on_first_attempt() {
		let body = VecBody::new(vec![Box::new(|| Ok(ok_step()))]);
		let mut job = Job::builder("t").body(body).build();

		while job.poll() == JobPoll::Pending {}

		assert!(job.was_successful());
		assert_eq!(job.current_attempt(), 1);
	}

	#[test]
	fn empty_step_iterator_is_an_unsuccessful_attempt() {
		let body = VecBody::<()>::new(vec![]);
		let mut job = Job::builder("empty").max_retries(2).body(body).build();

		while job.poll() == JobPoll::Pending {}

		assert!(job.failed_finally());
		assert!(!job.was_successful());
	}

	#[test]
	fn retry_then_succeed() {
		let mut attempt = 0_u32;
		let body = VecBody::new(vec![Box::new(move || {
			attempt += 1;
			if attempt == 1 {
				let err: crate::error::BoxError = Box::from("x");
				Ok(Step::Done(Outcome::Err(err)))
			} else {
				Ok(ok_step())
			}
		})]);
		let mut job = Job::builder("retry").max_retries(3).body(body).build();

		while job.poll() == JobPoll::Pending {}

		assert!(job.was_successful());
		assert_eq!(job.current_attempt(), 2);
	}

	#[test]
	fn retry_then_fail_finally() {
		struct RaisingSeq;
		impl StepSeq<()> for RaisingSeq {
			fn next(&mut self, _input: StepInput) -> Result<Option<Step<()>>, crate::error::BoxError> {
				Err(Box::from("boom"))
			}
		}

		struct RaisingBody;
		impl super::JobBody for RaisingBody {
			type Progress = ();
			fn produce_steps(&mut self) -> Box<dyn StepSeq<()>> {
				Box::new(RaisingSeq)
			}
		}

		let mut job = Job::builder("raises").max_retries(5).body(RaisingBody).build();

		while job.poll() == JobPoll::Pending {}

		assert!(job.failed_finally());
		assert_eq!(job.current_attempt(), 5);
		assert!(job.get_result(false).is_err());
	}

	#[test]
	fn terminal_job_poll_is_idempotent() {
		let body = VecBody::new(vec![Box::new(|| Ok(ok_step()))]);
		let mut job = Job::builder("idempotent").body(body).build();

		while job.poll() == JobPoll::Pending {}
		assert_eq!(job.poll(), JobPoll::Terminal);
		assert_eq!(job.poll(), JobPoll::Terminal);
	}

	#[test]
	fn cold_poll_without_explicit_start_reaches_the_same_terminal_state() {
		let body = VecBody::new(vec![Box::new(|| Ok(ok_step()))]);
		let mut job = Job::builder("cold").body(body).build();

		// no explicit start() call: the first poll() lazily starts it.
		while job.poll() == JobPoll::Pending {}
		assert!(job.was_successful());
	}

	#[test]
	fn sub_job_propagation_surfaces_child_exception_on_parent() {
		struct FailingChildSeq(bool);
		impl StepSeq<()> for FailingChildSeq {
			fn next(&mut self, _input: StepInput) -> Result<Option<Step<()>>, crate::error::BoxError> {
				if self.0 {
					self.0 = false;
					Ok(None)
				} else {
					Err(Box::from("child blew up"))
				}
			}
		}
		struct FailingChildBody;
		impl super::JobBody for FailingChildBody {
			type Progress = ();
			fn produce_steps(&mut self) -> Box<dyn StepSeq<()>> {
				Box::new(FailingChildSeq(false))
			}
		}

		struct ParentSeq(bool);
		impl StepSeq<()> for ParentSeq {
			fn next(&mut self, input: StepInput) -> Result<Option<Step<()>>, crate::error::BoxError> {
				match input {
					StepInput::Start => {
						let child = Job::builder("child").max_retries(1).body(FailingChildBody).build();
						Ok(Some(Step::Child(Box::new(child))))
					}
					StepInput::ChildFinished(child) => {
						// propagate: re-raise the child's captured exception in the parent.
						if let Some(_e) = child.captured_exception() {
							Err(Box::from("child failed"))
						} else {
							Ok(Some(Step::Done(Outcome::ok())))
						}
					}
				}
			}
		}
		struct ParentBody;
		impl super::JobBody for ParentBody {
			type Progress = ();
			fn produce_steps(&mut self) -> Box<dyn StepSeq<()>> {
				Box::new(ParentSeq(false))
			}
		}

		let mut parent = Job::builder("parent").max_retries(1).body(ParentBody).build();
		while parent.poll() == JobPoll::Pending {}

		assert!(parent.captured_exception().is_some());
		assert!(!parent.was_successful());
	}

	#[allow(dead_code)]
	fn _assert_vec_step_seq_is_object_safe(_: &dyn StepSeq<()>) {}
	#[allow(dead_code)]
	fn _type_check(_: VecStepSeq<()>) {}
}
