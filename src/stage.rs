/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! This module contains [`Stage`] and the [`StageDef`]/[`StageHooks`] traits a caller
//! implements to describe one stage's jobs and policy.

use crate::{StaticStr, job::OpaqueJob};

/// Lifecycle hooks a stage may override. Default no-ops, so a caller only implements what it
/// actually needs -- following the common pattern of default trait-method bodies (e.g.
/// `Trigger::wait_start`).
pub trait StageHooks {
	/// Called exactly once before job enumeration.
	fn setup(&mut self) {}

	/// Called exactly once after execution, regardless of outcome (including when the job
	/// sequence yielded zero jobs, or the stage was aborted by a failing canary).
	fn cleanup(&mut self, errors: bool) {
		let _ = errors;
	}
}

/// What a caller implements to describe one stage: its jobs (as a lazy sequence) plus its
/// lifecycle hooks.
pub trait StageDef: StageHooks {
	/// Lazily enumerates this stage's jobs. Called exactly once per stage run.
	fn jobs(&mut self) -> Box<dyn Iterator<Item = Box<dyn OpaqueJob>> + '_>;
}

/// Default pool capacity a parallel stage uses when none is given, matching
/// [`Pool`](crate::pool::Pool)'s own default.
const DEFAULT_POOL_CAPACITY: usize = 10;

/// A bounded batch of jobs sharing an execution policy.
#[derive(bon::Builder)]
pub struct Stage {
	/// Used for logging and in [`crate::executor::StageReport`].
	#[builder(start_fn, into)]
	pub name: StaticStr,

	/// Before running the bulk job sequence, take the first job, run it to completion
	/// synchronously, and abort the stage if it fails. Default `true`.
	#[builder(default = true)]
	pub is_canary: bool,

	/// Feed the remaining jobs into a [`Pool`](crate::pool::Pool) rather than running them
	/// strictly sequentially. Default `true`.
	#[builder(default = true)]
	pub allow_parallel: bool,

	/// If `true`, this stage's failures do not abort the pipeline. Default `false`.
	#[builder(default = false)]
	pub can_fail: bool,

	/// The `Pool` capacity used when `allow_parallel` is set.
	#[builder(default = DEFAULT_POOL_CAPACITY)]
	pub pool_capacity: usize,

	/// The stage's job provider and lifecycle hooks.
	pub def: Box<dyn StageDef>,
}

impl Stage {
	/// `should_continue(errors) = can_fail ∨ ¬errors` -- whether the executor proceeds to the
	/// next stage after this one.
	#[must_use]
	pub const fn should_continue(&self, errors: bool) -> bool {
		self.can_fail || !errors
	}
}

#[cfg(test)]
mod tests {
	use super::{Stage, StageDef, StageHooks};
	use crate::job::{Job, OpaqueJob, Step, test_support::VecBody};
	use crate::outcome::Outcome;

	struct Counting {
		cleanups: std::rc::Rc<std::cell::Cell<u32>>,
	}

	impl StageHooks for Counting {
		fn cleanup(&mut self, _errors: bool) {
			self.cleanups.set(self.cleanups.get() + 1);
		}
	}

	impl StageDef for Counting {
		fn jobs(&mut self) -> Box<dyn Iterator<Item = Box<dyn OpaqueJob>> + '_> {
			Box::new(std::iter::empty())
		}
	}

	#[test]
	fn cleanup_runs_once_even_for_an_empty_job_sequence() {
		let cleanups = std::rc::Rc::new(std::cell::Cell::new(0));
		let mut stage = Stage::builder("empty")
			.def(Box::new(Counting { cleanups: std::rc::Rc::clone(&cleanups) }))
			.build();

		stage.def.setup();
		let job_count = stage.def.jobs().count();
		stage.def.cleanup(job_count == 0);

		assert_eq!(cleanups.get(), 1);
	}

	#[test]
	fn should_continue_matches_can_fail_or_not_errors() {
		struct Empty;
		impl StageHooks for Empty {}
		impl StageDef for Empty {
			fn jobs(&mut self) -> Box<dyn Iterator<Item = Box<dyn OpaqueJob>> + '_> {
				Box::new(std::iter::empty())
			}
		}

		let tolerant = Stage::builder("t").can_fail(true).def(Box::new(Empty)).build();
		let strict = Stage::builder("s").can_fail(false).def(Box::new(Empty)).build();

		assert!(tolerant.should_continue(true));
		assert!(strict.should_continue(false));
		assert!(!strict.should_continue(true));
	}

	#[test]
	fn stage_def_yields_jobs_lazily() {
		struct OneJob;
		impl StageHooks for OneJob {}
		impl StageDef for OneJob {
			fn jobs(&mut self) -> Box<dyn Iterator<Item = Box<dyn OpaqueJob>> + '_> {
				let body = VecBody::<()>::new(vec![Box::new(|| Ok(Step::Done(Outcome::ok())))]);
				let job: Box<dyn OpaqueJob> = Box::new(Job::builder("j").body(body).build());
				Box::new(std::iter::once(job))
			}
		}

		let mut stage = Stage::builder("one").def(Box::new(OneJob)).build();
		assert_eq!(stage.def.jobs().count(), 1);
	}
}
