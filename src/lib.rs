#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Real-time Mandelbrot renderer
//!
//! This crate renders a zoomable, pannable view of the Mandelbrot set
//! at interactive frame rates on the CPU alone.  Instead of coloring
//! by raw escape iteration count, each exterior point is shaded by an
//! estimate of its geometric distance to the set's boundary, computed
//! from the escape recurrence and its derivative, which produces a
//! smooth gradient rather than the familiar hard banding.
//!
//! A frame is cut into fixed-size square tiles, and a persistent pool
//! of worker threads races to claim tiles off a single atomic counter.
//! Because tiles never overlap, the workers can all write into the
//! same framebuffer without any further synchronization.  The calling
//! thread joins the race too, then waits at a barrier until every
//! worker has drained its last tile before handing the finished frame
//! back to whoever wants to present it.
//!
//! The inner kernel iterates a whole batch of complex coordinates in
//! lockstep, freezing lanes as they escape, so the compiler is free to
//! keep the arithmetic in vector registers.

extern crate crossbeam;
#[macro_use]
extern crate failure;
extern crate image;
#[macro_use]
extern crate itertools;
extern crate num;
extern crate num_cpus;

pub mod errors;
pub mod frame;
pub mod kernel;
pub mod planes;
pub mod renderer;
pub mod tiles;

pub use errors::EngineError;
pub use planes::{Camera, Pixel, PlaneMapper};
pub use renderer::TiledRenderer;
pub use tiles::TileScheduler;
