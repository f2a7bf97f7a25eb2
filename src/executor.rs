/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! This module contains [`Executor`], the top-level driver: it
//! iterates stages, honours the global job limit, runs the canary, then either a [`Pool`] or a
//! sequential loop, and aggregates errors.

use either::Either;

use crate::{
	StaticStr,
	job::{JobPoll, OpaqueJob},
	notice,
	pool::Pool,
	stage::Stage,
};

/// What an external collaborator implements to enumerate stages: the sole input the
/// [`Executor`] consumes beyond the jobs themselves.
pub trait StageProvider {
	/// Lazily enumerates this run's stages, in the order they must execute.
	fn stages(&mut self) -> Box<dyn Iterator<Item = Stage> + '_>;
}

/// A [`StageProvider`] that additionally knows how to set itself up before any stage runs and
/// has a name for the CLI's subcommand dispatch.
pub trait Runner: StageProvider {
	/// The runner's name, used as its CLI subcommand when more than one runner is registered.
	fn name(&self) -> &'static str;

	/// Runner-wide setup, run once before the first stage. Returning `false` aborts the
	/// pipeline immediately, before any stage runs.
	fn setup(&mut self) -> bool {
		true
	}
}

/// Per-stage outcome, reported alongside the overall [`ExecutorReport`].
#[derive(Debug, Clone)]
pub struct StageReport {
	/// The stage's name.
	pub name: StaticStr,

	/// Whether any job in this stage failed (a stage that never ran, e.g. after an earlier
	/// abort, is never reported).
	pub errors: bool,

	/// Total jobs this stage ran, canary included.
	pub job_count: usize,

	/// Jobs whose outcome was `Outcome::Skip`, counted separately from plain successes so
	/// callers can tell "ran and skipped" apart from "ran and succeeded" (the resolved
	/// Open Question on `Skip`'s stage-level meaning).
	pub skipped: usize,
}

/// The overall result of an [`Executor::run`]: `true` iff no stage produced errors.
#[derive(Debug, Clone)]
pub struct ExecutorReport {
	/// `true` iff every stage that ran completed with no errors (or tolerated its own via
	/// `can_fail`).
	pub success: bool,

	/// One entry per stage that actually ran, in execution order.
	pub stages: Vec<StageReport>,
}

/// The top-level driver owning the ordered stage list.
#[derive(bon::Builder)]
pub struct Executor<R> {
	#[builder(start_fn)]
	runner: R,

	/// A pipeline-wide cap on jobs taken from each stage's lazy provider. `None` means
	/// unbounded, matching the CLI's `--limit` default.
	#[builder(default)]
	global_limit: Option<usize>,
}

impl<R: Runner> Executor<R> {
	/// Runs every stage in order. Returns immediately with a failing report if `runner.setup()`
	/// returns `false`, before any stage is built or run.
	pub async fn run(&mut self) -> ExecutorReport {
		if !self.runner.setup() {
			tracing::error!("runner setup failed; aborting before any stage runs");
			return ExecutorReport { success: false, stages: Vec::new() };
		}

		let mut reports = Vec::new();
		let mut success = true;

		for mut stage in collect_stages(&mut self.runner) {
			stage.def.setup();

			let (errors, job_count, skipped) = run_stage(&mut stage, self.global_limit).await;

			stage.def.cleanup(errors);

			let should_continue = stage.should_continue(errors);
			reports.push(StageReport { name: stage.name.clone(), errors, job_count, skipped });

			if errors {
				success = false;
			}
			if !should_continue {
				tracing::warn!("stage {} failed and is not tolerated; aborting pipeline", reports.last().expect("just pushed").name);
				break;
			}
		}

		ExecutorReport { success, stages: reports }
	}
}

/// `StageProvider::stages` returns an iterator borrowing `&mut self`, which can't outlive this
/// helper call; collecting eagerly into a `Vec<Stage>` up front keeps the borrow checker happy
/// since `Stage` itself owns everything it needs (its `Box<dyn StageDef>`).
fn collect_stages<R: StageProvider>(runner: &mut R) -> Vec<Stage> {
	runner.stages().collect()
}

/// Runs one stage to completion: canary (if enabled), then the remainder in parallel or
/// sequentially. Returns `(errors, job_count, skipped)`.
async fn run_stage(stage: &mut Stage, global_limit: Option<usize>) -> (bool, usize, usize) {
	let mut job_count = 0_usize;
	let mut skipped = 0_usize;
	let mut errors = false;

	let jobs = stage.def.jobs();
	let mut jobs = match global_limit {
		Some(n) => Either::Left(jobs.take(n)),
		None => Either::Right(jobs),
	};

	if stage.is_canary {
		match jobs.next() {
			Some(mut canary) => {
				job_count += 1;
				let (ok, skip) = drive_to_completion(canary.as_mut()).await;
				if skip {
					skipped += 1;
				}
				if !ok {
					tracing::error!("canary job {} failed for stage {}", canary.name(), stage.name);
					return (true, job_count, skipped);
				}
			}
			None => {
				notice!("stage {} produced no jobs (canary expected one)", stage.name);
				return (errors, job_count, skipped);
			}
		}
	}

	let remaining: Vec<Box<dyn OpaqueJob>> = jobs.collect();
	job_count += remaining.len();

	if job_count == 0 {
		notice!("stage {} produced no jobs", stage.name);
		return (errors, job_count, skipped);
	}

	if stage.allow_parallel {
		let mut pool = Pool::builder().capacity(stage.pool_capacity).build();
		for job in remaining {
			pool.add(job);
		}
		pool.run().await;

		for job in pool.finished() {
			if job.outcome().is_some_and(crate::outcome::Outcome::is_skip) {
				skipped += 1;
			}
			if !job.was_successful() {
				errors = true;
			}
		}
	} else {
		for mut job in remaining {
			let (ok, skip) = drive_to_completion(job.as_mut()).await;
			if skip {
				skipped += 1;
			}
			if !ok {
				errors = true;
			}
		}
	}

	(errors, job_count, skipped)
}

/// Polls a job to completion, yielding to the runtime between polls so a single-threaded
/// reactor gets a chance to drive any pipe I/O the job depends on.
async fn drive_to_completion(job: &mut dyn OpaqueJob) -> (bool, bool) {
	while job.poll() != JobPoll::Terminal {
		tokio::task::yield_now().await;
	}
	let skip = job.outcome().is_some_and(crate::outcome::Outcome::is_skip);
	(job.was_successful(), skip)
}

#[cfg(test)]
mod tests {
	use super::{Executor, ExecutorReport, Runner, StageProvider};
	use crate::{
		job::{Job, Step, test_support::VecBody},
		outcome::Outcome,
		stage::{Stage, StageDef, StageHooks},
	};

	fn ok_job(name: &'static str) -> Box<dyn crate::job::OpaqueJob> {
		let body = VecBody::<()>::new(vec![Box::new(|| Ok(Step::Done(Outcome::ok())))]);
		Box::new(Job::builder(name).body(body).build())
	}

	struct SequentialThree;
	impl StageHooks for SequentialThree {}
	impl StageDef for SequentialThree {
		fn jobs(&mut self) -> Box<dyn Iterator<Item = Box<dyn crate::job::OpaqueJob>> + '_> {
			Box::new([ok_job("one"), ok_job("two"), ok_job("three")].into_iter())
		}
	}

	struct OneStageRunner;
	impl StageProvider for OneStageRunner {
		fn stages(&mut self) -> Box<dyn Iterator<Item = Stage> + '_> {
			let stage = Stage::builder("seq")
				.allow_parallel(false)
				.is_canary(false)
				.def(Box::new(SequentialThree))
				.build();
			Box::new(std::iter::once(stage))
		}
	}
	impl Runner for OneStageRunner {
		fn name(&self) -> &'static str {
			"one-stage"
		}
	}

	#[tokio::test]
	async fn sequential_success_runs_all_jobs_in_order() {
		let mut executor = Executor::builder(OneStageRunner).build();
		let report = executor.run().await;

		assert!(report.success);
		assert_eq!(report.stages.len(), 1);
		assert!(!report.stages[0].errors);
		assert_eq!(report.stages[0].job_count, 3);
	}

	struct FailingSetupRunner;
	impl StageProvider for FailingSetupRunner {
		fn stages(&mut self) -> Box<dyn Iterator<Item = Stage> + '_> {
			Box::new(std::iter::empty())
		}
	}
	impl Runner for FailingSetupRunner {
		fn name(&self) -> &'static str {
			"broken"
		}
		fn setup(&mut self) -> bool {
			false
		}
	}

	#[tokio::test]
	async fn failing_setup_aborts_before_any_stage_runs() {
		let mut executor = Executor::builder(FailingSetupRunner).build();
		let ExecutorReport { success, stages } = executor.run().await;

		assert!(!success);
		assert!(stages.is_empty());
	}

	struct LimitProbe {
		yielded: std::rc::Rc<std::cell::Cell<usize>>,
	}
	impl StageHooks for LimitProbe {}
	impl StageDef for LimitProbe {
		fn jobs(&mut self) -> Box<dyn Iterator<Item = Box<dyn crate::job::OpaqueJob>> + '_> {
			let counter = std::rc::Rc::clone(&self.yielded);
			Box::new((0..5).map(move |i| {
				counter.set(i + 1);
				ok_job(Box::leak(format!("job-{i}").into_boxed_str()))
			}))
		}
	}

	struct LimitRunner {
		yielded: std::rc::Rc<std::cell::Cell<usize>>,
	}
	impl StageProvider for LimitRunner {
		fn stages(&mut self) -> Box<dyn Iterator<Item = Stage> + '_> {
			let stage = Stage::builder("limited")
				.is_canary(false)
				.allow_parallel(false)
				.def(Box::new(LimitProbe { yielded: std::rc::Rc::clone(&self.yielded) }))
				.build();
			Box::new(std::iter::once(stage))
		}
	}
	impl Runner for LimitRunner {
		fn name(&self) -> &'static str {
			"limited"
		}
	}

	#[tokio::test]
	async fn global_limit_caps_jobs_taken_from_the_provider() {
		let yielded = std::rc::Rc::new(std::cell::Cell::new(0));
		let mut executor = Executor::builder(LimitRunner { yielded: std::rc::Rc::clone(&yielded) })
			.global_limit(Some(2))
			.build();

		let report = executor.run().await;

		assert_eq!(report.stages[0].job_count, 2);
		assert_eq!(yielded.get(), 2);
	}
}
