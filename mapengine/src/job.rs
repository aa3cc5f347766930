//! Chunked execution for full-raster passes.
//!
//! A pass owns a [`RowCursor`] and processes one band of rows per call, so
//! the caller can interleave input handling and rendering between bands.
//! A pass made stale by a newer mutation is dropped and started again.

use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Pending { done: u32, total: u32 },
    Complete,
}

impl Progress {
    pub fn is_complete(self) -> bool {
        matches!(self, Progress::Complete)
    }
}

/// Number of whole rows that fit in `budget` pixels, never less than one.
pub fn rows_for_budget(width: u32, budget: usize) -> u32 {
    let rows = budget / (width.max(1) as usize);
    rows.clamp(1, u32::MAX as usize) as u32
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowCursor {
    next: u32,
    height: u32,
}

impl RowCursor {
    pub fn new(height: u32) -> Self {
        Self { next: 0, height }
    }

    /// Hands out the next band of rows, or `None` once the raster is done.
    pub fn next_band(&mut self, width: u32, budget: usize) -> Option<Range<u32>> {
        if self.next >= self.height {
            return None;
        }
        let start = self.next;
        let end = start
            .saturating_add(rows_for_budget(width, budget))
            .min(self.height);
        self.next = end;
        Some(start..end)
    }

    pub fn progress(&self) -> Progress {
        if self.is_done() {
            Progress::Complete
        } else {
            Progress::Pending {
                done: self.next,
                total: self.height,
            }
        }
    }

    pub fn is_done(&self) -> bool {
        self.next >= self.height
    }
}
