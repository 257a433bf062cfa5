// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Contains the PlaneMapper struct, which describes a relationship
//! between a rectangle on the integral plane with an origin at 0,0,
//! and a window onto the complex plane described by a Viewport: the
//! complex point under the middle of the grid, and how much of the
//! complex plane each pixel covers.
use itertools::iproduct;
use num::Complex;

use crate::errors::{MandelError, Result};

/// How far one arrow-key press moves the view, in pixels.
pub const PAN_PIXELS: f64 = 50.0;

/// Describes the width and height of an integral plane that is assumed to start at
/// 0,0 and all values are assumed to be non-negative integers.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct IntegralPlane(pub usize, pub usize);

/// Describes the x, y of a pixel in the integral plane.  x runs left
/// to right, y runs top to bottom.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Pixel(pub usize, pub usize);

/// Which way to move the view.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Direction {
    /// Toward smaller real values.
    Left,
    /// Toward larger real values.
    Right,
    /// Toward smaller imaginary values (the top of the grid).
    Up,
    /// Toward larger imaginary values.
    Down,
}

/// The window onto the complex plane.  `scale` is plane units per
/// pixel and is expected to be positive; the engine reads a Viewport
/// but never changes one.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Viewport {
    /// Real part of the point under the middle of the grid.
    pub center_x: f64,
    /// Imaginary part of the point under the middle of the grid.
    pub center_y: f64,
    /// Plane units per pixel.
    pub scale: f64,
    /// Selects a coloring scheme.  Only scheme 0 exists.
    pub color_formula: i32,
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport {
            center_x: -0.5,
            center_y: 0.0,
            scale: 0.005,
            color_formula: 0,
        }
    }
}

impl Viewport {
    /// A viewport centered on `center_x + center_y i` at `scale`
    /// plane units per pixel.
    pub fn new(center_x: f64, center_y: f64, scale: f64) -> Self {
        Viewport {
            center_x,
            center_y,
            scale,
            color_formula: 0,
        }
    }

    /// True if `scale` is a usable, positive, finite number.
    pub fn is_valid(&self) -> bool {
        self.scale.is_finite()
            && self.scale > 0.0
            && self.center_x.is_finite()
            && self.center_y.is_finite()
    }

    /// Halve the plane units per pixel.
    pub fn zoom_in(&mut self) {
        self.scale *= 0.5;
    }

    /// Double the plane units per pixel.
    pub fn zoom_out(&mut self) {
        self.scale *= 2.0;
    }

    /// Slide the view fifty pixels' worth in `direction`.
    pub fn pan(&mut self, direction: Direction) {
        let step = PAN_PIXELS * self.scale;
        match direction {
            Direction::Left => self.center_x -= step,
            Direction::Right => self.center_x += step,
            Direction::Up => self.center_y -= step,
            Direction::Down => self.center_y += step,
        }
    }
}

/// Contains the definitions of two planes: an integral cartesian
/// plane, and the viewport onto the complex plane.  Maps points from
/// one to the other.
#[derive(Debug, Clone)]
pub struct PlaneMapper {
    /// The right-lower corner of the integral cartesian plane.  The
    /// left-upper is assumed to be at 0,0
    pub integral_plane: IntegralPlane,
    /// The window onto the complex plane.
    pub viewport: Viewport,
    // Half the width and height of the grid, as the mapping uses them.
    half: (f64, f64),
}

impl PlaneMapper {
    /// Constructor.  Takes the size of the integral plane and the
    /// viewport onto the complex plane.  A degenerate viewport is
    /// allowed through; the result is useless but harmless.
    pub fn new(width: usize, height: usize, viewport: Viewport) -> Result<PlaneMapper> {
        if width == 0 || height == 0 {
            return Err(MandelError::InvalidConfiguration(format!(
                "grid must be at least 1x1, got {}x{}",
                width, height
            )));
        }

        if !viewport.is_valid() {
            tracing::warn!(?viewport, "degenerate viewport; output will be meaningless");
        }

        Ok(PlaneMapper {
            integral_plane: IntegralPlane(width, height),
            viewport,
            half: ((width as f64) / 2.0, (height as f64) / 2.0),
        })
    }

    /// Grid width in pixels.
    pub fn width(&self) -> usize {
        self.integral_plane.0
    }

    /// Grid height in pixels.
    pub fn height(&self) -> usize {
        self.integral_plane.1
    }

    /// The total number of points in the integral grid.  Used to
    /// calculate memory needs.
    pub fn len(&self) -> usize {
        self.integral_plane.0 * self.integral_plane.1
    }

    /// Describes that the integral plane is of a size.
    pub fn is_empty(&self) -> bool {
        self.integral_plane.0 == 0 || self.integral_plane.1 == 0
    }

    /// The real part of every point in column `x`.
    #[inline]
    pub fn re(&self, x: usize) -> f64 {
        self.viewport.center_x + ((x as f64) - self.half.0) * self.viewport.scale
    }

    /// The imaginary part of every point in row `y`.
    #[inline]
    pub fn im(&self, y: usize) -> f64 {
        self.viewport.center_y + ((y as f64) - self.half.1) * self.viewport.scale
    }

    /// Given a pixel on the integral cartesian plane, map that to a
    /// point on the complex cartesian plane.
    pub fn pixel_to_point(&self, pixel: &Pixel) -> Complex<f64> {
        Complex::new(self.re(pixel.0), self.im(pixel.1))
    }

    /// Given a complex number, find the pixel whose point lies
    /// nearest to it, or None if that pixel is off the grid.
    pub fn point_to_pixel(&self, point: &Complex<f64>) -> Option<Pixel> {
        let left = ((point.re - self.viewport.center_x) / self.viewport.scale + self.half.0).round();
        let top = ((point.im - self.viewport.center_y) / self.viewport.scale + self.half.1).round();
        if !(left >= 0.0 && top >= 0.0) {
            return None;
        }
        if left >= (self.width() as f64) || top >= (self.height() as f64) {
            return None;
        }
        Some(Pixel(left as usize, top as usize))
    }

    /// Every pixel of the grid, top row first, left to right within a row.
    pub fn pixels(&self) -> impl Iterator<Item = Pixel> {
        iproduct!(0..self.height(), 0..self.width()).map(|(y, x)| Pixel(x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planemapper_fails_on_empty_grid() {
        assert!(PlaneMapper::new(0, 4, Viewport::default()).is_err());
        assert!(PlaneMapper::new(4, 0, Viewport::default()).is_err());
    }

    #[test]
    fn planemapper_tolerates_bad_scale() {
        let pm = PlaneMapper::new(4, 4, Viewport::new(0.0, 0.0, -1.0));
        assert!(pm.is_ok());
        let pm = PlaneMapper::new(4, 4, Viewport::new(0.0, 0.0, 0.0)).unwrap();
        assert_eq!(pm.pixel_to_point(&Pixel(3, 1)), Complex::new(0.0, 0.0));
    }

    #[test]
    fn grid_center_maps_to_viewport_center() {
        let pm = PlaneMapper::new(800, 600, Viewport::default()).unwrap();
        assert_eq!(pm.pixel_to_point(&Pixel(400, 300)), Complex::new(-0.5, 0.0));
    }

    #[test]
    fn pixel_to_point_follows_scale() {
        let pm = PlaneMapper::new(4, 4, Viewport::new(0.0, 0.0, 1.0)).unwrap();
        assert_eq!(pm.pixel_to_point(&Pixel(0, 0)), Complex::new(-2.0, -2.0));
        assert_eq!(pm.pixel_to_point(&Pixel(3, 1)), Complex::new(1.0, -1.0));
    }

    #[test]
    fn odd_grids_use_fractional_half() {
        let pm = PlaneMapper::new(5, 3, Viewport::new(0.0, 0.0, 1.0)).unwrap();
        assert_eq!(pm.pixel_to_point(&Pixel(0, 0)), Complex::new(-2.5, -1.5));
    }

    #[test]
    fn point_to_pixel_inverts_pixel_to_point() {
        let pm = PlaneMapper::new(640, 480, Viewport::new(-0.75, 0.1, 0.003)).unwrap();
        for pixel in &[Pixel(0, 0), Pixel(320, 240), Pixel(639, 479), Pixel(17, 400)] {
            let point = pm.pixel_to_point(pixel);
            assert_eq!(pm.point_to_pixel(&point), Some(*pixel));
        }
    }

    #[test]
    fn point_to_pixel_rejects_points_off_the_grid() {
        let pm = PlaneMapper::new(4, 4, Viewport::new(0.0, 0.0, 1.0)).unwrap();
        assert_eq!(pm.point_to_pixel(&Complex::new(-3.0, 0.0)), None);
        assert_eq!(pm.point_to_pixel(&Complex::new(0.0, 2.0)), None);
        assert_eq!(pm.point_to_pixel(&Complex::new(std::f64::NAN, 0.0)), None);
    }

    #[test]
    fn pixels_are_row_major() {
        let pm = PlaneMapper::new(3, 2, Viewport::default()).unwrap();
        let pixels: Vec<Pixel> = pm.pixels().collect();
        assert_eq!(pixels.len(), pm.len());
        assert_eq!(pixels[0], Pixel(0, 0));
        assert_eq!(pixels[1], Pixel(1, 0));
        assert_eq!(pixels[3], Pixel(0, 1));
    }

    #[test]
    fn navigation_moves_the_view() {
        let mut vp = Viewport::default();
        vp.zoom_in();
        assert_eq!(vp.scale, 0.0025);
        vp.zoom_out();
        vp.zoom_out();
        assert_eq!(vp.scale, 0.01);
        vp.pan(Direction::Right);
        assert_eq!(vp.center_x, 0.0);
        vp.pan(Direction::Up);
        assert_eq!(vp.center_y, -0.5);
        vp.pan(Direction::Down);
        vp.pan(Direction::Left);
        assert_eq!((vp.center_x, vp.center_y), (-0.5, 0.0));
    }
}
