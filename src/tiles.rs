//! Tile partitioning and the atomic work counter.
//!
//! A frame's canvas is cut into equal square tiles, indexed row-major.
//! Handing out work is nothing more than a fetch-and-increment on a
//! single shared counter: whichever thread bumps the counter first
//! owns that tile, every index is handed out exactly once, and the
//! whole scheme is lock-free, allocation-free, and O(1) per claim.

use errors::EngineError;
use std::sync::atomic::{AtomicU32, Ordering};

/// The pixel rectangle covered by one tile.  `x1`/`y1` are exclusive.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TileBounds {
    /// Leftmost pixel column.
    pub x0: u32,
    /// Topmost pixel row.
    pub y0: u32,
    /// One past the rightmost pixel column.
    pub x1: u32,
    /// One past the bottommost pixel row.
    pub y1: u32,
}

/// Hands out tile indices exactly once per frame.
///
/// `reset` belongs to the orchestrator alone and must never run while
/// a claim is in flight; `claim_next` may be hammered from any number
/// of threads at once.
#[derive(Debug)]
pub struct TileScheduler {
    tiles_x: u32,
    tiles_y: u32,
    tile_size: u32,
    next: AtomicU32,
}

impl TileScheduler {
    /// Constructor.  The canvas dimensions must be exact multiples of
    /// the tile size so that the tiles partition the canvas: every
    /// pixel in exactly one tile, no overlaps, no ragged edges.
    pub fn new(width: u32, height: u32, tile_size: u32) -> Result<TileScheduler, EngineError> {
        if width == 0 || height == 0 || tile_size == 0 {
            return Err(EngineError::EmptyCanvas);
        }
        if width % tile_size != 0 || height % tile_size != 0 {
            return Err(EngineError::UnevenTiling {
                width,
                height,
                tile_size,
            });
        }
        Ok(TileScheduler {
            tiles_x: width / tile_size,
            tiles_y: height / tile_size,
            tile_size,
            next: AtomicU32::new(0),
        })
    }

    /// Number of tiles in one frame.
    pub fn total_tiles(&self) -> u32 {
        self.tiles_x * self.tiles_y
    }

    /// Rewind the counter for a new frame.  Orchestrator only.
    pub fn reset(&self) {
        // Relaxed is enough: the begin-channel send that follows the
        // reset is what publishes it to the workers.
        self.next.store(0, Ordering::Relaxed);
    }

    /// Claim the next unrendered tile, or `None` once the frame's
    /// tiles are exhausted.  The atomic fetch-and-increment is the
    /// whole guarantee: under any number of concurrent callers each
    /// index is returned to exactly one of them.
    pub fn claim_next(&self) -> Option<u32> {
        let index = self.next.fetch_add(1, Ordering::Relaxed);
        if index < self.total_tiles() {
            Some(index)
        } else {
            None
        }
    }

    /// The pixel rectangle of the given tile index.
    pub fn bounds(&self, index: u32) -> TileBounds {
        let x0 = (index % self.tiles_x) * self.tile_size;
        let y0 = (index / self.tiles_x) * self.tile_size;
        TileBounds {
            x0,
            y0,
            x1: x0 + self.tile_size,
            y1: y0 + self.tile_size,
        }
    }
}
