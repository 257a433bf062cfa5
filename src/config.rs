// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Everything a run needs to know, gathered in one place and handed
//! down explicitly.

use std::path::PathBuf;

use crate::lanes::Strategy;
use crate::planes::{Direction, Viewport};

/// Default grid width.
pub const WIDTH: usize = 800;
/// Default grid height.
pub const HEIGHT: usize = 600;

/// One run of the renderer.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderConfig {
    /// Grid width in pixels.
    pub width: usize,
    /// Grid height in pixels.
    pub height: usize,
    /// Where to look.
    pub viewport: Viewport,
    /// How many times to repeat the grid pass.  Always at least one.
    pub run_count: usize,
    /// Whether to color and present the result at all.
    pub graphics: bool,
    /// Which kernel to use.
    pub strategy: Strategy,
    /// How many workers share each pass.
    pub threads: usize,
    /// Where the presented image goes.
    pub output: PathBuf,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            width: WIDTH,
            height: HEIGHT,
            viewport: Viewport::default(),
            run_count: 1,
            graphics: true,
            strategy: Strategy::default(),
            threads: 1,
            output: PathBuf::from("mandelbrot.png"),
        }
    }
}

/// Requests for fewer than one run get one.
pub fn normalize_run_count(requested: i64) -> usize {
    if requested < 1 {
        1
    } else {
        requested as usize
    }
}

/// Read a `--runs` value the forgiving way: anything that is not a
/// positive integer means a single run.
pub fn parse_run_count(s: &str) -> usize {
    normalize_run_count(s.trim().parse::<i64>().unwrap_or(0))
}

/// One navigation keypress.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Move {
    /// Halve the scale.
    ZoomIn,
    /// Double the scale.
    ZoomOut,
    /// Slide the view.
    Pan(Direction),
}

impl Move {
    /// Map a key to a move: `z` and `x` zoom, `h` `l` `k` `j` pan left,
    /// right, up and down.
    pub fn from_key(key: char) -> Option<Move> {
        match key {
            'z' => Some(Move::ZoomIn),
            'x' => Some(Move::ZoomOut),
            'h' => Some(Move::Pan(Direction::Left)),
            'l' => Some(Move::Pan(Direction::Right)),
            'k' => Some(Move::Pan(Direction::Up)),
            'j' => Some(Move::Pan(Direction::Down)),
            _ => None,
        }
    }

    /// Apply this move to `viewport`.
    pub fn apply(self, viewport: &mut Viewport) {
        match self {
            Move::ZoomIn => viewport.zoom_in(),
            Move::ZoomOut => viewport.zoom_out(),
            Move::Pan(direction) => viewport.pan(direction),
        }
    }
}

/// Parse a whole key string, failing on the first unknown key.
pub fn parse_moves(keys: &str) -> Result<Vec<Move>, String> {
    keys.chars()
        .map(|key| Move::from_key(key).ok_or_else(|| format!("Unknown move key '{}'", key)))
        .collect()
}

impl RenderConfig {
    /// Replay `moves` against the starting viewport, as a user at the
    /// keyboard would have.
    pub fn navigate(&mut self, moves: &[Move]) {
        for step in moves {
            step.apply(&mut self.viewport);
        }
        tracing::debug!(viewport = ?self.viewport, "navigation replayed");
    }
}
