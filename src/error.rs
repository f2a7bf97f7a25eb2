/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! This module contains the crate's error types.

use std::fmt::Write as _;

/// An opaque, type-erased cause. This is what a [`JobBody`](crate::job::JobBody) raises when it
/// fails to produce its next step, and what a parent job's captured exception is stored as.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type surfaced by [`OpaqueJob::get_result`](crate::job::OpaqueJob::get_result)
/// and by a [`Runner`](crate::executor::Runner) whose setup failed.
#[derive(thiserror::Error, Debug)]
pub enum SchedulerError {
	/// A job body raised while producing a step, or a sub-job's captured exception propagated
	/// into its parent unhandled.
	#[error("job step production failed")]
	StepProduction(#[source] BoxError),

	/// A [`ProcessJob`](crate::job::process::ProcessJob) exited with a non-zero status and
	/// `get_result` was called with `can_fail = false`.
	#[error(transparent)]
	ProcessFailed(#[from] ProcessFailedError),

	/// A [`Runner::setup`](crate::executor::Runner::setup) returned `false`; the pipeline is
	/// aborted before any stage runs.
	#[error("runner setup failed")]
	SetupFailed,
}

/// The structured failure raised when a [`ProcessJob`](crate::job::process::ProcessJob) exits
/// non-zero and its caller asked not to tolerate failure.
#[derive(thiserror::Error, Debug)]
#[error("process {argv:?} exited with {exit_code:?}")]
pub struct ProcessFailedError {
	/// The argv the process was started with.
	pub argv: Vec<String>,

	/// The process's exit code, or `None` if it was terminated by a signal.
	pub exit_code: Option<i32>,

	/// The process's captured stdout, for diagnostics.
	pub stdout: String,
}

/// Formats an error together with its full `source()` chain, one cause per line.
///
/// Useful for logging a
/// [`SchedulerError`] (or any boxed cause) at its full depth without pulling in a backtrace.
pub trait ErrorChainExt {
	/// Renders `self` and every `source()` in its chain.
	fn display_chain(&self) -> String;
}

impl<T: std::error::Error> ErrorChainExt for T {
	fn display_chain(&self) -> String {
		let mut current: &dyn std::error::Error = self;
		let mut output = format!("{current}");
		let mut depth = 0_u32;

		while let Some(source) = current.source() {
			current = source;
			depth += 1;
			if depth == 1 {
				let _ = write!(output, "\n\nCaused by:");
			}
			let _ = write!(output, "\n\t{depth}: {current}");
		}

		output
	}
}
