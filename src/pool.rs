/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! This module contains [`Pool`], the bounded cooperative multiplexer.

use std::{collections::VecDeque, time::Duration};

use crate::job::{JobPoll, OpaqueJob};

/// Default pool capacity.
const DEFAULT_CAPACITY: usize = 10;

/// A bounded, work-stealing-free pool: advances up to `capacity` jobs concurrently by
/// round-robin polling, one tick per cycle, with no fairness guarantee beyond that.
///
/// `pending ∪ running ∪ finished` is a partition of every job ever added (`Pool`
/// invariant); `running.len() <= capacity` at every tick.
#[derive(bon::Builder)]
pub struct Pool {
	#[builder(default = DEFAULT_CAPACITY)]
	capacity: usize,

	/// Optional pause between ticks when nothing in `running` changed state, to avoid spinning
	/// at 100% CPU (an allowed refinement, not a semantics change). Zero means
	/// spin, matching the literal source.
	#[builder(default)]
	tick_backoff: Duration,

	#[builder(skip)]
	pending: VecDeque<Box<dyn OpaqueJob>>,

	#[builder(skip)]
	running: Vec<Box<dyn OpaqueJob>>,

	#[builder(skip)]
	finished: VecDeque<Box<dyn OpaqueJob>>,
}

impl Pool {
	/// Queues a job. Adding once `run()` has returned control is unsupported
	/// by the core contract -- callers should build a fresh `Pool` per stage instead.
	pub fn add(&mut self, job: Box<dyn OpaqueJob>) {
		self.pending.push_back(job);
	}

	/// The pool's configured capacity.
	#[must_use]
	pub const fn capacity(&self) -> usize {
		self.capacity
	}

	/// Total jobs across all three queues.
	#[must_use]
	pub fn len(&self) -> usize {
		self.pending.len() + self.running.len() + self.finished.len()
	}

	/// `true` iff no job has ever been added.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// How many jobs are currently admitted and not yet terminal. Never exceeds `capacity`.
	#[must_use]
	pub fn running_len(&self) -> usize {
		self.running.len()
	}

	/// Drives every queued job to completion: admits up to `capacity` jobs from `pending` into
	/// `running`, polls each running job exactly once per cycle, and repeats until both
	/// `pending` and `running` are empty.
	///
	/// Completion order in `finished` is by completion time, not submission time; admission
	/// order into `running` follows submission order.
	///
	/// Yields to the runtime every cycle rather than busy-spinning: a tick that makes progress
	/// still `yield_now`s so a single-threaded reactor gets a chance to refresh pipe readiness
	/// between polls, and a stalled tick sleeps `tick_backoff` instead.
	pub async fn run(&mut self) {
		while !self.pending.is_empty() || !self.running.is_empty() {
			while self.running.len() < self.capacity {
				let Some(mut job) = self.pending.pop_front() else {
					break;
				};
				job.start();
				self.running.push(job);
			}

			let mut still_running = Vec::with_capacity(self.running.len());
			let mut progressed = false;
			for mut job in self.running.drain(..) {
				if job.poll() == JobPoll::Terminal {
					progressed = true;
					self.finished.push_back(job);
				} else {
					still_running.push(job);
				}
			}
			self.running = still_running;

			let more_work = !self.pending.is_empty() || !self.running.is_empty();
			if more_work {
				if progressed || self.tick_backoff.is_zero() {
					tokio::task::yield_now().await;
				} else {
					tokio::time::sleep(self.tick_backoff).await;
				}
			}
		}
	}

	/// The jobs that have reached a terminal state, in completion order.
	pub fn finished(&self) -> impl Iterator<Item = &dyn OpaqueJob> {
		self.finished.iter().map(AsRef::as_ref)
	}

	/// A lazy sequence over `finished`, yielding `false` for a job with a captured exception or
	/// an unsuccessful outcome, `true` otherwise. Jobs in `finished` are
	/// guaranteed terminal, so reading this never blocks.
	pub fn results(&self) -> impl Iterator<Item = bool> + '_ {
		self.finished().map(OpaqueJob::was_successful)
	}
}

#[cfg(test)]
mod tests {
	use super::Pool;
	use crate::{
		job::{Job, Step, StepInput, StepSeq, test_support::VecBody},
		outcome::Outcome,
	};

	fn ok_job(name: &'static str) -> Box<dyn crate::job::OpaqueJob> {
		let body = VecBody::<()>::new(vec![Box::new(|| Ok(Step::Done(Outcome::ok())))]);
		Box::new(Job::builder(name).body(body).build())
	}

	fn err_job(name: &'static str) -> Box<dyn crate::job::OpaqueJob> {
		struct AlwaysErr;
		impl StepSeq<()> for AlwaysErr {
			fn next(&mut self, _input: StepInput) -> Result<Option<Step<()>>, crate::error::BoxError> {
				Ok(Some(Step::Done(Outcome::Err(Box::from("nope")))))
			}
		}
		struct AlwaysErrBody;
		impl crate::job::JobBody for AlwaysErrBody {
			type Progress = ();
			fn produce_steps(&mut self) -> Box<dyn StepSeq<()>> {
				Box::new(AlwaysErr)
			}
		}
		Box::new(Job::builder(name).max_retries(1).body(AlwaysErrBody).build())
	}

	#[tokio::test]
	async fn capacity_is_never_exceeded_and_all_jobs_finish() {
		let mut pool = Pool::builder().capacity(3).build();
		for i in 0..10 {
			pool.add(ok_job(Box::leak(format!("job-{i}").into_boxed_str())));
		}
		pool.run().await;

		assert_eq!(pool.finished().count(), 10);
		assert!(pool.results().all(|ok| ok));
	}

	#[tokio::test]
	async fn mixed_results_are_reported_individually() {
		let mut pool = Pool::builder().build();
		pool.add(ok_job("a"));
		pool.add(err_job("b"));
		pool.add(ok_job("c"));
		pool.run().await;

		let results: Vec<bool> = pool.results().collect();
		assert_eq!(results.iter().filter(|&&ok| ok).count(), 2);
		assert_eq!(results.iter().filter(|&&ok| !ok).count(), 1);
	}

	#[tokio::test]
	async fn empty_pool_runs_and_finishes_immediately() {
		let mut pool = Pool::builder().build();
		pool.run().await;
		assert!(pool.is_empty());
	}
}
