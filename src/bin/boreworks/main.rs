/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! The `boreworks` binary: wires the scheduler's CLI surface up to a small demo runner.
//!
//! The concrete job catalogue a real pipeline author writes is an external-collaborator
//! concern; this binary ships a single trivial "echo" runner so the crate has
//! something concrete to run end to end.

use boreworks::{
	cli,
	executor::{Runner, StageProvider},
	job::process::ProcessJob,
	stage::{Stage, StageDef, StageHooks},
};

/// A one-stage runner that shells out a handful of `echo` jobs, purely to demonstrate the
/// scheduler wired up to a real `StageProvider`.
struct EchoRunner;

struct EchoStage;

impl StageHooks for EchoStage {
	fn setup(&mut self) {
		tracing::debug!("setting up the echo stage");
	}
}

impl StageDef for EchoStage {
	fn jobs(&mut self) -> Box<dyn Iterator<Item = Box<dyn boreworks::OpaqueJob>> + '_> {
		let jobs = (1..=3).map(|i| {
			let job: Box<dyn boreworks::OpaqueJob> = Box::new(
				ProcessJob::builder(format!("echo-{i}"))
					.argv(vec!["echo".to_owned(), format!("job {i}")])
					.build(),
			);
			job
		});

		Box::new(jobs)
	}
}

impl StageProvider for EchoRunner {
	fn stages(&mut self) -> Box<dyn Iterator<Item = Stage> + '_> {
		let stage = Stage::builder("echo").is_canary(true).allow_parallel(true).def(Box::new(EchoStage)).build();

		Box::new(std::iter::once(stage))
	}
}

impl Runner for EchoRunner {
	fn name(&self) -> &'static str {
		"echo"
	}
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::process::ExitCode {
	let success = cli::run(vec![Box::new(EchoRunner)]).await;

	if success { std::process::ExitCode::SUCCESS } else { std::process::ExitCode::FAILURE }
}
