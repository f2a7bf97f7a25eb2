/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Logging setup for the scheduler.
//!
//! `tracing::Level` is a closed four-variant enum with no room for an extra NOTICE level
//! (numeric 25, between INFO's 20 and WARN's 30), so NOTICE is layered on top instead of
//! being a real `Level`: [`notice!`] emits an `INFO`-level event tagged `target = "notice"`,
//! and [`init`] installs an `EnvFilter` that special-cases that target so it prints whenever
//! the effective verbosity is NOTICE or louder, and is hidden otherwise.
//!
//! Logger names (`runner.stage.job[.idx]`) are carried as an explicit
//! `%path` field on each job's span rather than as distinct logger objects -- idiomatic
//! `tracing` has no per-name logger instances the way `logging.getLogger` does.

use tracing_subscriber::{EnvFilter, filter::LevelFilter};

/// Emits a log event at NOTICE severity (between INFO and WARNING).
///
/// Implemented as an INFO-level event tagged `target = "notice"`; see the module docs for why.
#[macro_export]
macro_rules! notice {
	($($arg:tt)+) => {
		tracing::info!(target: "notice", $($arg)+)
	};
}

/// Baseline verbosity before any `-v` flags: NOTICE (via the `notice=info` directive below) and
/// above are visible, plain INFO and below are not.
const BASELINE: LevelFilter = LevelFilter::WARN;

/// Builds the path-style logger name for a job/stage, e.g. `runner.stage.job.2`, as described
/// an explicit path string built during enumeration, not object-graph
/// introspection.
#[must_use]
pub fn logger_path(parent: &str, segment: &str, index: Option<usize>) -> String {
	match (parent.is_empty(), index) {
		(true, None) => segment.to_owned(),
		(true, Some(i)) => format!("{segment}.{i}"),
		(false, None) => format!("{parent}.{segment}"),
		(false, Some(i)) => format!("{parent}.{segment}.{i}"),
	}
}

/// Initialises the global `tracing` subscriber, honouring the CLI's `-v`/`--verbose` count.
///
/// Each occurrence of `-v` steps the threshold down one standard level, NOTICE -> INFO -> DEBUG
/// -> TRACE. Note `notice!` events always pass through the directive below because they carry
/// their own `target = "notice"`, printed regardless of the numeric threshold as long as it is
/// NOTICE or looser (i.e. `verbose_count >= 0`, which is always true -- NOTICE can only be
/// silenced by filtering strictly above WARN, which this crate never does).
pub fn init(verbose_count: u8) {
	let level = match verbose_count {
		0 => BASELINE,
		1 => LevelFilter::INFO,
		2 => LevelFilter::DEBUG,
		_ => LevelFilter::TRACE,
	};

	let filter = EnvFilter::builder()
		.with_default_directive(level.into())
		.from_env_lossy()
		.add_directive("notice=info".parse().expect("static directive is valid"));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_ansi(true)
		.init();
}
