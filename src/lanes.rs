// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The escape-time recurrence, z <- z*z + c, and the several ways of
//! running it over a row of pixels.
//!
//! Every kernel follows one rule.  Start from z = c with a count of
//! zero.  At each step, square the current z; if its magnitude is
//! already past the escape radius, stop without counting the step.
//! Otherwise advance z and count the step.  A point that survives
//! `MAX_ITER` steps reports `MAX_ITER` and is taken to be in the set.
//!
//! The lane-group kernels run that rule over several adjacent pixels
//! at once.  Each lane carries an "active" flag which, once cleared,
//! stays cleared; only active lanes have their count advanced, so an
//! escaped lane's count freezes at the step where it escaped.  The
//! group keeps stepping until every lane has escaped or the budget
//! runs out.  Because every kernel uses the same arithmetic in the
//! same order, all of them report the same count for the same pixel.

use std::fmt;
use std::str::FromStr;

use num::Complex;

use crate::planes::PlaneMapper;

/// The iteration budget.  A pixel that reaches it is in the set.
pub const MAX_ITER: u32 = 256;

/// The square of the escape radius (10.0).
pub const ESCAPE_RADIUS_SQUARED: f64 = 100.0;

/// The one escape test.  A NaN magnitude is treated as escaped.
#[inline(always)]
fn bounded(norm: f64) -> bool {
    norm <= ESCAPE_RADIUS_SQUARED
}

/// Iterate a single point and return the number of steps it took to
/// escape, or `MAX_ITER` if it never did.
#[inline]
pub fn escape(c: Complex<f64>) -> u32 {
    let (mut zx, mut zy) = (c.re, c.im);
    let mut iter = 0;
    while iter < MAX_ITER {
        let zx2 = zx * zx;
        let zy2 = zy * zy;
        if !bounded(zx2 + zy2) {
            break;
        }
        zy = 2.0 * zx * zy + c.im;
        zx = zx2 - zy2 + c.re;
        iter += 1;
    }
    iter
}

/// Iterate `N` points sharing an imaginary part as one lane group.
pub fn escape_lanes<const N: usize>(cx: [f64; N], cy: f64) -> [u32; N] {
    let mut zx = cx;
    let mut zy = [cy; N];
    let mut counts = [0u32; N];
    let mut active = [true; N];

    for _ in 0..MAX_ITER {
        let mut any = false;
        for k in 0..N {
            let zx2 = zx[k] * zx[k];
            let zy2 = zy[k] * zy[k];
            active[k] = active[k] && bounded(zx2 + zy2);
            if active[k] {
                any = true;
                counts[k] += 1;
                zy[k] = 2.0 * zx[k] * zy[k] + cy;
                zx[k] = zx2 - zy2 + cx[k];
            }
        }
        if !any {
            break;
        }
    }
    counts
}

#[cfg(target_arch = "x86_64")]
mod avx {
    use std::arch::x86_64::*;

    use super::{ESCAPE_RADIUS_SQUARED, MAX_ITER};

    /// Four lanes in one 256-bit register.  The counts live in a
    /// double-precision register and grow by a masked add of 1.0.
    ///
    /// # Safety
    ///
    /// The caller must have confirmed the CPU supports AVX.
    #[target_feature(enable = "avx")]
    pub unsafe fn escape4(cx: [f64; 4], cy: f64) -> [u32; 4] {
        let cxv = _mm256_loadu_pd(cx.as_ptr());
        let cyv = _mm256_set1_pd(cy);
        let limit = _mm256_set1_pd(ESCAPE_RADIUS_SQUARED);
        let two = _mm256_set1_pd(2.0);
        let one = _mm256_set1_pd(1.0);

        let mut zx = cxv;
        let mut zy = cyv;
        let mut counts = _mm256_setzero_pd();
        let mut active = _mm256_castsi256_pd(_mm256_set1_epi64x(-1));

        for _ in 0..MAX_ITER {
            let zx2 = _mm256_mul_pd(zx, zx);
            let zy2 = _mm256_mul_pd(zy, zy);
            let norm = _mm256_add_pd(zx2, zy2);
            active = _mm256_and_pd(active, _mm256_cmp_pd(norm, limit, _CMP_LE_OQ));
            if _mm256_movemask_pd(active) == 0 {
                break;
            }
            counts = _mm256_add_pd(counts, _mm256_and_pd(active, one));
            // Escaped lanes keep moving but are never counted again.
            zy = _mm256_add_pd(_mm256_mul_pd(_mm256_mul_pd(two, zx), zy), cyv);
            zx = _mm256_add_pd(_mm256_sub_pd(zx2, zy2), cxv);
        }

        let mut out = [0.0f64; 4];
        _mm256_storeu_pd(out.as_mut_ptr(), counts);
        [out[0] as u32, out[1] as u32, out[2] as u32, out[3] as u32]
    }
}

/// True when the hardware four-lane kernel can run on this machine.
pub fn vector_supported() -> bool {
    #[cfg(target_arch = "x86_64")]
    {
        is_x86_feature_detected!("avx")
    }
    #[cfg(not(target_arch = "x86_64"))]
    {
        false
    }
}

/// Fills one row of the iteration buffer.  Implementations differ
/// only in how many pixels they carry through the recurrence at
/// once; their output is identical.
pub trait RowKernel: Sync {
    /// Pixels per group.
    fn lanes(&self) -> usize;

    /// Fill `row`, which is row `y` of the grid described by `plane`,
    /// left to right.
    fn fill_row(&self, plane: &PlaneMapper, y: usize, row: &mut [u32]);
}

/// One pixel at a time.
#[derive(Copy, Clone, Debug)]
pub struct Scalar;

impl RowKernel for Scalar {
    fn lanes(&self) -> usize {
        1
    }

    fn fill_row(&self, plane: &PlaneMapper, y: usize, row: &mut [u32]) {
        let cy = plane.im(y);
        for (x, slot) in row.iter_mut().enumerate() {
            *slot = escape(Complex::new(plane.re(x), cy));
        }
    }
}

/// `N` adjacent pixels per group, with explicit per-lane loops.
#[derive(Copy, Clone, Debug)]
pub struct Lanes<const N: usize>;

impl<const N: usize> RowKernel for Lanes<N> {
    fn lanes(&self) -> usize {
        N
    }

    fn fill_row(&self, plane: &PlaneMapper, y: usize, row: &mut [u32]) {
        fill_groups(plane, y, row, escape_lanes::<N>);
    }
}

/// Four adjacent pixels per group in one AVX register.  Falls back to
/// `Lanes<4>` where AVX is missing.
#[derive(Copy, Clone, Debug)]
pub struct Vector;

impl RowKernel for Vector {
    fn lanes(&self) -> usize {
        4
    }

    #[cfg(target_arch = "x86_64")]
    fn fill_row(&self, plane: &PlaneMapper, y: usize, row: &mut [u32]) {
        if vector_supported() {
            // Safe: AVX support was just checked.
            fill_groups::<4, _>(plane, y, row, |cx, cy| unsafe { avx::escape4(cx, cy) });
        } else {
            Lanes::<4>.fill_row(plane, y, row);
        }
    }

    #[cfg(not(target_arch = "x86_64"))]
    fn fill_row(&self, plane: &PlaneMapper, y: usize, row: &mut [u32]) {
        Lanes::<4>.fill_row(plane, y, row);
    }
}

/// Walk a row in groups of `N`, handing each group to `group`; the
/// pixels left over at the end of the row go through `escape` one at
/// a time.
fn fill_groups<const N: usize, F>(plane: &PlaneMapper, y: usize, row: &mut [u32], group: F)
where
    F: Fn([f64; N], f64) -> [u32; N],
{
    let cy = plane.im(y);
    let mut chunks = row.chunks_exact_mut(N);
    let mut x = 0;
    for chunk in &mut chunks {
        let mut cx = [0.0; N];
        for (k, re) in cx.iter_mut().enumerate() {
            *re = plane.re(x + k);
        }
        chunk.copy_from_slice(&group(cx, cy));
        x += N;
    }
    for (k, slot) in chunks.into_remainder().iter_mut().enumerate() {
        *slot = escape(Complex::new(plane.re(x + k), cy));
    }
}

/// The available kernels, by name.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// One pixel at a time.
    Scalar,
    /// Two pixels per group.
    Narrow,
    /// Four pixels per group, unrolled in software.
    Wide,
    /// Four pixels per group in a hardware vector register.
    Vector,
}

impl Strategy {
    /// Every strategy, narrowest first.
    pub const ALL: [Strategy; 4] = [
        Strategy::Scalar,
        Strategy::Narrow,
        Strategy::Wide,
        Strategy::Vector,
    ];

    /// The kernel that implements this strategy.
    pub fn kernel(self) -> &'static dyn RowKernel {
        match self {
            Strategy::Scalar => &Scalar,
            Strategy::Narrow => &Lanes::<2>,
            Strategy::Wide => &Lanes::<4>,
            Strategy::Vector => &Vector,
        }
    }

    /// The name accepted on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Strategy::Scalar => "scalar",
            Strategy::Narrow => "narrow",
            Strategy::Wide => "wide",
            Strategy::Vector => "vector",
        }
    }
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::Scalar
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Strategy::ALL
            .iter()
            .copied()
            .find(|strategy| strategy.name() == s)
            .ok_or_else(|| format!("Unknown strategy '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planes::Viewport;

    #[test]
    fn origin_never_escapes() {
        assert_eq!(escape(Complex::new(0.0, 0.0)), MAX_ITER);
    }

    #[test]
    fn two_plus_two_i_escapes_after_one_step() {
        // |c|^2 = 8 passes the first test; the first step lands on
        // 2 + 10i, whose magnitude is past the radius.
        assert_eq!(escape(Complex::new(2.0, 2.0)), 1);
    }

    #[test]
    fn points_outside_the_radius_count_zero() {
        assert_eq!(escape(Complex::new(11.0, 0.0)), 0);
        assert_eq!(escape(Complex::new(std::f64::NAN, 0.0)), 0);
    }

    #[test]
    fn the_radius_itself_is_bounded() {
        // |c|^2 == 100 is not past the radius, so one step is taken.
        assert_eq!(escape(Complex::new(10.0, 0.0)), 1);
    }

    #[test]
    fn lane_groups_match_scalar() {
        let cx = [-2.1, -0.75, 0.25, 0.3];
        let cy = 0.01;
        let wide = escape_lanes(cx, cy);
        for k in 0..4 {
            assert_eq!(wide[k], escape(Complex::new(cx[k], cy)));
        }
        let narrow = escape_lanes([cx[0], cx[1]], cy);
        assert_eq!(&narrow[..], &wide[..2]);
    }

    #[test]
    fn escaped_lanes_freeze() {
        let counts = escape_lanes([2.0, 0.0], 2.0);
        assert_eq!(counts[0], escape(Complex::new(2.0, 2.0)));
        assert_eq!(counts[1], escape(Complex::new(0.0, 2.0)));
        assert!(counts[0] < counts[1]);
    }

    #[test]
    fn every_kernel_fills_rows_identically() {
        // Seven columns leaves a remainder for both the two- and
        // four-lane kernels.
        let plane = PlaneMapper::new(7, 5, Viewport::new(-0.6, 0.1, 0.4)).unwrap();
        for y in 0..plane.height() {
            let mut reference = vec![0; plane.width()];
            Scalar.fill_row(&plane, y, &mut reference);
            for strategy in &Strategy::ALL {
                let mut row = vec![u32::max_value(); plane.width()];
                strategy.kernel().fill_row(&plane, y, &mut row);
                assert_eq!(row, reference, "{} differs on row {}", strategy, y);
            }
        }
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn hardware_lanes_match_scalar() {
        if !vector_supported() {
            return;
        }
        let cx = [-1.25, -0.1, 0.35, 2.0];
        let counts = unsafe { avx::escape4(cx, 0.05) };
        for k in 0..4 {
            assert_eq!(counts[k], escape(Complex::new(cx[k], 0.05)));
        }
    }

    #[test]
    fn strategies_parse_by_name() {
        for strategy in &Strategy::ALL {
            assert_eq!(strategy.name().parse::<Strategy>(), Ok(*strategy));
        }
        assert!("sse".parse::<Strategy>().is_err());
        assert_eq!(Strategy::Narrow.kernel().lanes(), 2);
        assert_eq!(Strategy::Vector.kernel().lanes(), 4);
    }
}
