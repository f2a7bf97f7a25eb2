/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! `boreworks` is a cooperative, staged job/pipeline executor for operations pipelines.
//!
//! A caller implements [`StageProvider`] to describe an ordered list of [`Stage`]s, each yielding
//! a sequence of [`OpaqueJob`]s. The [`Executor`] then drives every stage in order: a canary job
//! first (if enabled), followed by the remaining jobs either through a bounded [`Pool`] or
//! sequentially, one poll tick at a time.
//!
//! The scheduler itself never blocks a thread waiting on a job: every job is driven forward by
//! repeated, non-blocking [`OpaqueJob::poll`] calls, composed recursively for nested sub-jobs.
//! This is what makes it "cooperative" rather than preemptive. Argument parsing of a concrete
//! pipeline's own flags, the job catalogue itself and logging sinks are left to callers; this
//! crate only consumes a [`StageProvider`] and (for [`job::process::ProcessJob`]) the OS process
//! primitives it needs to run shell/SSH-style jobs.

pub mod cancellation_token;
#[cfg(feature = "cli")]
pub mod cli;
pub mod error;
pub mod executor;
pub mod job;
pub mod logging;
pub mod maybe_send;
pub mod outcome;
pub mod pool;
pub mod stage;
pub mod utils;

pub use self::{
	error::{BoxError, SchedulerError},
	executor::{Executor, ExecutorReport, Runner, StageProvider, StageReport},
	job::{Job, JobBody, JobPoll, OpaqueJob, Step, StepInput, StepSeq, process::ProcessJob},
	outcome::Outcome,
	pool::Pool,
	stage::{Stage, StageDef, StageHooks},
};

pub use staticstr::StaticStr;
