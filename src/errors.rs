// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The ways a render can fail.  The recurrence itself cannot fail;
//! everything here is about the buffer, the configuration, or the
//! workers driving the recurrence.

use failure::Fail;

/// Errors produced by the engine and its collaborators.
#[derive(Debug, Fail, PartialEq)]
pub enum MandelError {
    /// The iteration buffer could not be obtained.  Nothing was
    /// computed and nothing was written.
    #[fail(display = "could not allocate a {}x{} iteration buffer", width, height)]
    AllocationFailure {
        /// Requested grid width.
        width: usize,
        /// Requested grid height.
        height: usize,
    },

    /// The grid or viewport cannot describe a render.
    #[fail(display = "invalid configuration: {}", _0)]
    InvalidConfiguration(String),

    /// The engine was asked to run zero passes.  Callers normalize the
    /// run count before calling in.
    #[fail(display = "run count must be at least 1")]
    InvalidRunCount,

    /// A row worker panicked; the buffer contents are unspecified.
    #[fail(display = "a row worker panicked")]
    WorkerPanic,

    /// Presenting the result failed.
    #[fail(display = "could not write output: {}", _0)]
    Output(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MandelError>;
