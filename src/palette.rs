// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Turns iteration counts into colors.  Points in the set are black;
//! everything else takes its color from three Bernstein-style
//! polynomials in t = count / MAX_ITER.

use num::clamp;

use crate::engine::IterationBuffer;
use crate::lanes::MAX_ITER;

/// An 8-bit red, green, blue triple.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Black, the color of the set itself.
    pub const BLACK: Rgb = Rgb(0, 0, 0);
}

fn channel(value: f64) -> u8 {
    clamp((value * 255.0).round(), 0.0, 255.0) as u8
}

/// The color of a pixel whose point took `iter` steps to escape.
pub fn color_of(iter: u32) -> Rgb {
    if iter >= MAX_ITER {
        return Rgb::BLACK;
    }
    let t = f64::from(iter) / f64::from(MAX_ITER);
    let u = 1.0 - t;
    Rgb(
        channel(9.0 * u * t * t * t),
        channel(15.0 * u * u * t * t),
        channel(8.5 * u * u * u * t),
    )
}

/// Paint a whole buffer as RGBA bytes, four per pixel, fully opaque.
pub fn paint(buffer: &IterationBuffer) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(buffer.len() * 4);
    for &iter in buffer.as_slice() {
        let Rgb(r, g, b) = color_of(iter);
        pixels.extend_from_slice(&[r, g, b, 255]);
    }
    pixels
}
