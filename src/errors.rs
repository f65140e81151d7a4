//! Engine setup failures.  Everything here is fatal: the renderer
//! cannot limp along without its full worker pool or with a canvas
//! that does not tile evenly, so construction aborts and the host is
//! expected to report and exit.  The per-frame hot loop has no
//! recoverable error paths at all.

use std::io;

/// The ways engine construction or a frame handoff can fail.
#[derive(Debug, Fail)]
pub enum EngineError {
    /// The canvas dimensions are not exact multiples of the tile size,
    /// so the tiles would not partition the framebuffer.
    #[fail(
        display = "canvas {}x{} cannot be partitioned into {}-pixel tiles",
        width, height, tile_size
    )]
    UnevenTiling {
        /// Canvas width in pixels.
        width: u32,
        /// Canvas height in pixels.
        height: u32,
        /// Requested tile edge length.
        tile_size: u32,
    },

    /// A zero canvas dimension or tile size.
    #[fail(display = "canvas dimensions and tile size must be nonzero")]
    EmptyCanvas,

    /// A bailout of zero would classify every point as interior.
    #[fail(display = "iteration bailout must be at least 1")]
    ZeroBailout,

    /// The caller's framebuffer does not match the configured canvas.
    #[fail(display = "framebuffer is {} bytes, expected {}", actual, expected)]
    FrameSize {
        /// Length of the buffer the caller handed in.
        actual: usize,
        /// Required length, `width * height * 4`.
        expected: usize,
    },

    /// The OS refused to start a worker thread at construction time.
    #[fail(display = "could not spawn worker thread: {}", _0)]
    WorkerSpawn(#[cause] io::Error),

    /// A worker thread died, leaving the frame barrier unsatisfiable.
    #[fail(display = "worker thread disappeared mid-frame")]
    WorkerLost,
}
