/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Miscellaneous small extension traits.

use std::fmt;

/// A combined trait for types that implement both `Display` and `Debug` -- convenient as a
/// trait-object bound where logging code wants either representation without picking ahead of
/// time.
pub trait DisplayDebug: fmt::Display + fmt::Debug {}

impl<T: fmt::Display + fmt::Debug> DisplayDebug for T {}
