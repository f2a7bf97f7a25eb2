/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! The CLI surface: `--version`, repeatable `-v`/`--verbose`,
//! `--limit`, and runner subcommand dispatch. Argument parsing of a concrete pipeline's *own*
//! flags is left to the runner; this crate only
//! ships the scheduler-facing flags above it.

use clap::{ArgAction, Args, Command, FromArgMatches as _};

use crate::{
	executor::{Executor, Runner},
	logging,
};

/// The identifying banner printed by `--version`: `{name} {version} ({git_sha})`, populated at
/// build time by `vergen`/`vergen-gitcl` (via `build.rs` +
/// `VERGEN_GIT_SHA` usage in its `main.rs`).
pub fn version_banner() -> String {
	format!(
		"{} {} ({})",
		env!("CARGO_PKG_NAME"),
		env!("CARGO_PKG_VERSION"),
		option_env!("VERGEN_GIT_SHA").unwrap_or("unknown")
	)
}

/// The scheduler-owned flags every runner gets for free, independent of whichever runner ends
/// up selected.
#[derive(Args, Debug, Clone)]
pub struct SchedulerArgs {
	/// Increase log verbosity; repeatable. Each occurrence lowers the threshold by one level
	/// from the NOTICE baseline, floored at TRACE.
	#[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
	pub verbose: u8,

	/// Cap the total number of jobs taken from each stage's lazy provider.
	#[arg(long = "limit", value_name = "N", global = true)]
	pub limit: Option<usize>,
}

#[cfg(feature = "send")]
type BoxedRunFuture = std::pin::Pin<Box<dyn std::future::Future<Output = bool> + Send>>;
#[cfg(not(feature = "send"))]
type BoxedRunFuture = std::pin::Pin<Box<dyn std::future::Future<Output = bool>>>;

/// A type-erased, named runner registered with the CLI, so more than one pipeline can share a
/// single binary and be selected by subcommand.
pub trait BoxedRunner {
	/// The subcommand name this runner is selected by.
	fn name(&self) -> &'static str;

	/// Runs this runner to completion with the given scheduler-owned flags already applied.
	fn run(self: Box<Self>, args: &SchedulerArgs) -> BoxedRunFuture;
}

impl<R: Runner + 'static> BoxedRunner for R {
	fn name(&self) -> &'static str {
		Runner::name(self)
	}

	fn run(self: Box<Self>, args: &SchedulerArgs) -> BoxedRunFuture {
		let limit = args.limit;
		Box::pin(async move {
			let mut executor = Executor::builder(*self).global_limit(limit).build();
			executor.run().await.success
		})
	}
}

/// Builds the `clap::Command` for a set of registered runners: with exactly one, its subcommand
/// is the default and may be omitted; with more than one, a subcommand selects it.
fn build_command(runner_names: &[&'static str]) -> Command {
	let mut command = Command::new(env!("CARGO_PKG_NAME")).version(version_banner());
	command = SchedulerArgs::augment_args(command);

	if runner_names.len() > 1 {
		for name in runner_names {
			command = command.subcommand(Command::new(*name));
		}
		command = command.subcommand_required(false);
	}

	command
}

/// Parses CLI arguments and runs whichever registered runner was selected (or the sole one, if
/// only one was registered), initialising logging first. Returns `true` on pipeline success,
/// matching the process's eventual exit code.
#[must_use]
pub async fn run(runners: Vec<Box<dyn BoxedRunner>>) -> bool {
	assert!(!runners.is_empty(), "at least one runner must be registered");

	let names: Vec<&'static str> = runners.iter().map(|r| r.name()).collect();
	let command = build_command(&names);
	let matches = command.get_matches();

	let args = SchedulerArgs::from_arg_matches(&matches).expect("scheduler args always parse");
	logging::init(args.verbose);

	let selected_name = matches.subcommand_name().unwrap_or(names[0]);

	let Some(runner) = runners.into_iter().find(|r| r.name() == selected_name) else {
		tracing::error!("no runner named {selected_name} is registered");
		return false;
	};

	runner.run(&args).await
}
