#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Mandelbrot escape-time engine
//!
//! The Mandelbrot set is the set of points c on the complex plane for
//! which repeatedly squaring z and adding c, starting from z = c,
//! never carries z off to infinity.  The classic picture colors each
//! point by how many steps it took to get past some fixed radius: its
//! "escape time."  Points that are still within the radius after the
//! iteration budget is spent are taken to be in the set.
//!
//! This crate computes those escape times over a rectangular grid of
//! pixels.  The expensive part is the inner recurrence, and the crate
//! carries several ways of running it: one pixel at a time, or several
//! adjacent pixels in lock-step as lanes of a group (in software, or
//! in a hardware vector register).  All of them produce exactly the
//! same counts; they differ only in speed.  The grid can be repeated
//! several times per call to get a stable timing, and rows can be
//! shared among worker threads.
//!
//! ```
//! use mandelbrot::{Engine, Strategy, Viewport, MAX_ITER};
//!
//! let frame = Engine::new(Strategy::Wide)
//!     .render(80, 60, &Viewport::new(-0.5, 0.0, 0.05), 1)
//!     .unwrap();
//! assert_eq!(frame.buffer.get(40, 30), Some(MAX_ITER));
//! ```

extern crate crossbeam;
extern crate failure;
extern crate itertools;
extern crate num;

pub mod config;
pub mod engine;
pub mod errors;
pub mod lanes;
pub mod palette;
pub mod planes;

pub use config::RenderConfig;
pub use engine::{Engine, Frame, IterationBuffer};
pub use errors::MandelError;
pub use lanes::{escape, Strategy, ESCAPE_RADIUS_SQUARED, MAX_ITER};
pub use palette::{color_of, paint, Rgb};
pub use planes::{Direction, Pixel, PlaneMapper, Viewport};
