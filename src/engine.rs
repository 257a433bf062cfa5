// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The compute engine: runs a row kernel over every row of the grid,
//! optionally several times over for the sake of a stable timing, and
//! reports how long the numeric work took.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::errors::{MandelError, Result};
use crate::lanes::{RowKernel, Strategy};
use crate::planes::{PlaneMapper, Viewport};

/// Per-pixel iteration counts, row-major, `width * height` long.
#[derive(Clone, Debug, PartialEq)]
pub struct IterationBuffer {
    width: usize,
    height: usize,
    counts: Vec<u32>,
}

impl IterationBuffer {
    /// Allocate a zeroed buffer without aborting on failure.
    pub fn try_new(width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(MandelError::InvalidConfiguration(format!(
                "grid must be at least 1x1, got {}x{}",
                width, height
            )));
        }
        let failure = MandelError::AllocationFailure { width, height };
        let len = match width.checked_mul(height) {
            Some(len) => len,
            None => return Err(failure),
        };
        let mut counts = Vec::new();
        if counts.try_reserve_exact(len).is_err() {
            return Err(failure);
        }
        counts.resize(len, 0);
        Ok(IterationBuffer {
            width,
            height,
            counts,
        })
    }

    /// Grid width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Grid height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of pixels.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Never true for a buffer built by `try_new`.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// The count at column `x`, row `y`.
    pub fn get(&self, x: usize, y: usize) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.counts.get(y * self.width + x).copied()
    }

    /// Every count, row-major.
    pub fn as_slice(&self) -> &[u32] {
        &self.counts
    }

    /// Rows, top first.
    pub fn rows(&self) -> std::slice::Chunks<u32> {
        self.counts.chunks(self.width)
    }

    fn rows_mut(&mut self) -> std::slice::ChunksMut<u32> {
        self.counts.chunks_mut(self.width)
    }
}

/// A freshly computed buffer and the time the computation took.
#[derive(Debug)]
pub struct Frame {
    /// The counts.
    pub buffer: IterationBuffer,
    /// Seconds spent in the numeric passes only.
    pub elapsed: f64,
}

/// Runs one strategy's kernel over whole grids.
#[derive(Copy, Clone, Debug)]
pub struct Engine {
    strategy: Strategy,
    threads: usize,
}

impl Engine {
    /// A single-threaded engine using `strategy`.
    pub fn new(strategy: Strategy) -> Self {
        Engine {
            strategy,
            threads: 1,
        }
    }

    /// Share each pass among `threads` workers; values below one mean one.
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// The strategy in use.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Fill `buffer` with the counts for `viewport`, `run_count`
    /// times over, and return the seconds that took.  Every pass
    /// starts from scratch; only the last one's counts remain.
    ///
    /// `run_count` must be at least one; zero is refused with
    /// `InvalidRunCount` before anything is touched.
    #[tracing::instrument(
        skip(self, buffer),
        fields(strategy = %self.strategy, threads = self.threads)
    )]
    pub fn compute(
        &self,
        buffer: &mut IterationBuffer,
        viewport: &Viewport,
        run_count: usize,
    ) -> Result<f64> {
        if run_count < 1 {
            return Err(MandelError::InvalidRunCount);
        }
        let plane = PlaneMapper::new(buffer.width(), buffer.height(), *viewport)?;
        let kernel = self.strategy.kernel();

        let start = Instant::now();
        for pass in 0..run_count {
            self.pass(kernel, &plane, buffer)?;
            tracing::trace!(pass, "grid pass done");
        }
        let elapsed = start.elapsed().as_secs_f64();

        tracing::debug!(elapsed, run_count, "compute finished");
        Ok(elapsed)
    }

    /// Allocate a buffer for a `width` by `height` grid, then compute
    /// into it.  The allocation is not part of the reported time.
    pub fn render(
        &self,
        width: usize,
        height: usize,
        viewport: &Viewport,
        run_count: usize,
    ) -> Result<Frame> {
        let mut buffer = IterationBuffer::try_new(width, height)?;
        let elapsed = self.compute(&mut buffer, viewport, run_count)?;
        Ok(Frame { buffer, elapsed })
    }

    fn pass(
        &self,
        kernel: &'static dyn RowKernel,
        plane: &PlaneMapper,
        buffer: &mut IterationBuffer,
    ) -> Result<()> {
        if self.threads == 1 {
            for (y, row) in buffer.rows_mut().enumerate() {
                kernel.fill_row(plane, y, row);
            }
            return Ok(());
        }

        // Workers take rows off a shared queue; each row slice is
        // handed to exactly one worker.
        let rows = Arc::new(Mutex::new(buffer.rows_mut().enumerate()));
        crossbeam::scope(|spawner| {
            for _ in 0..self.threads {
                let rows = rows.clone();
                spawner.spawn(move |_| loop {
                    let row = { rows.lock().ok().and_then(|mut rows| rows.next()) };
                    match row {
                        Some((y, row)) => kernel.fill_row(plane, y, row),
                        None => {
                            break;
                        }
                    }
                });
            }
        })
        .map_err(|_| MandelError::WorkerPanic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lanes::MAX_ITER;

    #[test]
    fn buffer_refuses_empty_grids() {
        match IterationBuffer::try_new(0, 10) {
            Err(MandelError::InvalidConfiguration(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn buffer_reports_allocation_failure() {
        let huge = std::usize::MAX / 2;
        assert_eq!(
            IterationBuffer::try_new(huge, 1),
            Err(MandelError::AllocationFailure {
                width: huge,
                height: 1
            })
        );
        assert_eq!(
            IterationBuffer::try_new(huge, 4),
            Err(MandelError::AllocationFailure {
                width: huge,
                height: 4
            })
        );
    }

    #[test]
    fn render_passes_allocation_failure_through() {
        let huge = std::usize::MAX / 2;
        let result = Engine::new(Strategy::Wide).render(huge, 1, &Viewport::default(), 1);
        assert!(result.is_err());
    }

    #[test]
    fn buffer_indexing() {
        let buffer = IterationBuffer::try_new(3, 2).unwrap();
        assert_eq!(buffer.len(), 6);
        assert_eq!(buffer.get(2, 1), Some(0));
        assert_eq!(buffer.get(3, 0), None);
        assert_eq!(buffer.get(0, 2), None);
        assert_eq!(buffer.rows().count(), 2);
    }

    #[test]
    fn zero_runs_are_refused_untouched() {
        let mut buffer = IterationBuffer::try_new(8, 8).unwrap();
        let result = Engine::new(Strategy::Scalar).compute(&mut buffer, &Viewport::default(), 0);
        assert_eq!(result, Err(MandelError::InvalidRunCount));
        assert!(buffer.as_slice().iter().all(|&count| count == 0));
    }

    #[test]
    fn grid_center_is_in_the_set() {
        let frame = Engine::new(Strategy::Vector)
            .render(800, 600, &Viewport::default(), 1)
            .unwrap();
        assert_eq!(frame.buffer.get(400, 300), Some(MAX_ITER));
        assert!(frame.elapsed >= 0.0);
    }

    #[test]
    fn every_pass_overwrites_stale_counts() {
        let mut buffer = IterationBuffer::try_new(16, 12).unwrap();
        let engine = Engine::new(Strategy::Narrow);
        engine
            .compute(&mut buffer, &Viewport::new(3.0, 3.0, 0.01), 1)
            .unwrap();
        let viewport = Viewport::new(-0.5, 0.0, 0.2);
        engine.compute(&mut buffer, &viewport, 2).unwrap();
        let fresh = engine.render(16, 12, &viewport, 1).unwrap();
        assert_eq!(buffer, fresh.buffer);
    }

    #[test]
    fn threaded_passes_match_single_threaded() {
        let viewport = Viewport::new(-0.7, 0.2, 0.01);
        for strategy in &Strategy::ALL {
            let single = Engine::new(*strategy).render(61, 37, &viewport, 1).unwrap();
            let threaded = Engine::new(*strategy)
                .threads(4)
                .render(61, 37, &viewport, 2)
                .unwrap();
            assert_eq!(single.buffer, threaded.buffer, "{}", strategy);
        }
    }

    #[test]
    fn degenerate_viewports_do_not_crash() {
        for scale in &[0.0, -0.01, std::f64::NAN, std::f64::INFINITY] {
            let viewport = Viewport::new(-0.5, 0.0, *scale);
            for strategy in &Strategy::ALL {
                let frame = Engine::new(*strategy).render(9, 5, &viewport, 1).unwrap();
                assert!(frame.buffer.as_slice().iter().all(|&c| c <= MAX_ITER));
            }
        }
    }

    #[test]
    fn zero_threads_means_one() {
        let engine = Engine::new(Strategy::Scalar).threads(0);
        assert!(engine.render(4, 4, &Viewport::default(), 1).is_ok());
    }
}
