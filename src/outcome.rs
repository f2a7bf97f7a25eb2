/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! This module contains the [`Outcome`] type.

use crate::error::BoxError;

/// A tri-valued outcome of a single job attempt.
///
/// Named `Outcome` rather than `Result` to avoid clashing with [`std::result::Result`]:
/// [`Outcome::Ok`] and [`Outcome::Skip`] both coerce to success, [`Outcome::Err`] to failure.
/// [`Outcome`] is never itself polled by the scheduler; it's only ever a step a
/// [`JobBody`](crate::job::JobBody) yields to mark the end of the current attempt.
#[derive(Debug)]
pub enum Outcome<T = (), E = BoxError> {
	/// The attempt succeeded.
	Ok(T),

	/// The attempt failed with the given cause.
	Err(E),

	/// The attempt was deliberately skipped. Treated as success for `Pool`/`Stage`/`Executor`
	/// aggregation, but kept distinct from `Ok` so callers can tell "ran and skipped" apart
	/// from "ran and succeeded" when reporting.
	Skip(T),
}

impl<T, E> Outcome<T, E> {
	/// Constructs a successful outcome carrying the default payload (`true`, in the usual
	/// terms, though this crate uses `T::default()`).
	pub fn ok() -> Self
	where
		T: Default,
	{
		Self::Ok(T::default())
	}

	/// Constructs a skipped outcome carrying the default payload.
	pub fn skip() -> Self
	where
		T: Default,
	{
		Self::Skip(T::default())
	}

	/// `true` for [`Outcome::Ok`] and [`Outcome::Skip`], `false` for [`Outcome::Err`].
	#[must_use]
	pub const fn is_success(&self) -> bool {
		!matches!(self, Self::Err(_))
	}

	/// `true` only for [`Outcome::Skip`].
	#[must_use]
	pub const fn is_skip(&self) -> bool {
		matches!(self, Self::Skip(_))
	}

	/// `true` only for [`Outcome::Err`].
	#[must_use]
	pub const fn is_err(&self) -> bool {
		matches!(self, Self::Err(_))
	}

	/// Returns the error, if this is an [`Outcome::Err`].
	pub fn err(&self) -> Option<&E> {
		match self {
			Self::Err(e) => Some(e),
			Self::Ok(_) | Self::Skip(_) => None,
		}
	}

	/// Maps the success/skip payload, leaving an `Err` untouched.
	pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U, E> {
		match self {
			Self::Ok(v) => Outcome::Ok(f(v)),
			Self::Skip(v) => Outcome::Skip(f(v)),
			Self::Err(e) => Outcome::Err(e),
		}
	}

	/// Maps the error, leaving `Ok`/`Skip` untouched.
	pub fn map_err<F>(self, f: impl FnOnce(E) -> F) -> Outcome<T, F> {
		match self {
			Self::Ok(v) => Outcome::Ok(v),
			Self::Skip(v) => Outcome::Skip(v),
			Self::Err(e) => Outcome::Err(f(e)),
		}
	}
}

impl<T, E> From<std::result::Result<T, E>> for Outcome<T, E> {
	fn from(value: std::result::Result<T, E>) -> Self {
		match value {
			Ok(v) => Self::Ok(v),
			Err(e) => Self::Err(e),
		}
	}
}

#[cfg(test)]
mod tests {
	use assert_matches::assert_matches;

	use super::Outcome;

	#[test]
	fn ok_and_skip_are_truthy() {
		assert!(Outcome::<(), ()>::Ok(()).is_success());
		assert!(Outcome::<(), ()>::Skip(()).is_success());
		assert!(!Outcome::<(), ()>::Err(()).is_success());
	}

	#[test]
	fn skip_is_distinct_from_ok() {
		assert!(Outcome::<(), ()>::Skip(()).is_skip());
		assert!(!Outcome::<(), ()>::Ok(()).is_skip());
	}

	#[test]
	fn map_leaves_err_untouched() {
		let mapped = Outcome::<i32, &str>::Err("boom").map(|v| v + 1);
		assert_matches!(mapped, Outcome::Err("boom"));
	}
}
