// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The tiled frame renderer: a persistent worker pool plus the
//! per-frame orchestration that drives it.
//!
//! Workers are spawned once, when the renderer is built, and spend
//! their lives in a loop: block until a frame begins, race the other
//! threads to claim and render tiles, signal completion, block again.
//! The begin/end signals are a pair of one-slot channels per worker,
//! reused every frame; at most one outstanding begin is ever
//! meaningful because a worker never starts a frame before finishing
//! the previous one.
//!
//! `render_frame` fans out the begin signals, then the calling thread
//! drains tiles exactly like a worker, so the core that would
//! otherwise idle at the barrier does useful work instead.  It then
//! waits, without a timeout, for every end signal before returning.
//! Tiles carry no ordering requirement, so the finished framebuffer is
//! identical no matter which thread rendered which tile.

use crossbeam::channel::{bounded, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use errors::EngineError;
use frame::{shade, SharedFrame, BYTES_PER_PIXEL};
use kernel::{distance_batch, ComplexBatch, LANES};
use num::Complex;
use num_cpus;
use planes::{Camera, PlaneMapper};
use tiles::{TileBounds, TileScheduler};

/// Everything a thread needs to render its share of one frame.
#[derive(Copy, Clone)]
struct FrameJob {
    frame: SharedFrame,
    camera: Camera,
}

/// The orchestrator's handles to one worker: its begin and end signal.
struct WorkerLink {
    begin: Sender<FrameJob>,
    end: Receiver<()>,
}

/// A complete rendering engine: plane mapping, tile scheduling, and a
/// pool of persistent worker threads, configured once at construction.
///
/// The camera is the only per-frame input; canvas size, tile size, and
/// bailout are fixed for the life of the renderer.  Dropping the
/// renderer disconnects the begin channels and the idle workers exit.
pub struct TiledRenderer {
    plane: Arc<PlaneMapper>,
    scheduler: Arc<TileScheduler>,
    bailout: u32,
    workers: Vec<WorkerLink>,
}

impl TiledRenderer {
    /// Build the engine and spawn `workers` pool threads.  The canvas
    /// must divide evenly into `tile_size` squares and `bailout` must
    /// be at least 1.  Any resource failure here is fatal; there is no
    /// point retrying one-shot startup allocation.
    pub fn new(
        width: u32,
        height: u32,
        tile_size: u32,
        bailout: u32,
        workers: usize,
    ) -> Result<TiledRenderer, EngineError> {
        if bailout == 0 {
            return Err(EngineError::ZeroBailout);
        }
        let plane = Arc::new(PlaneMapper::new(width, height)?);
        let scheduler = Arc::new(TileScheduler::new(width, height, tile_size)?);

        let mut links = Vec::with_capacity(workers);
        for i in 0..workers {
            let (begin_tx, begin_rx) = bounded::<FrameJob>(1);
            let (end_tx, end_rx) = bounded::<()>(1);
            let plane = Arc::clone(&plane);
            let scheduler = Arc::clone(&scheduler);
            thread::Builder::new()
                .name(format!("tile-worker-{}", i))
                .spawn(move || worker_loop(&plane, &scheduler, bailout, &begin_rx, &end_tx))
                .map_err(EngineError::WorkerSpawn)?;
            links.push(WorkerLink {
                begin: begin_tx,
                end: end_rx,
            });
        }

        Ok(TiledRenderer {
            plane,
            scheduler,
            bailout,
            workers: links,
        })
    }

    /// The default pool size: every hardware thread but one, the one
    /// reserved for the caller, which participates in every frame
    /// anyway.
    pub fn default_workers() -> usize {
        num_cpus::get().saturating_sub(1)
    }

    /// Required framebuffer length in bytes.
    pub fn frame_len(&self) -> usize {
        self.plane.width() as usize * self.plane.height() as usize * BYTES_PER_PIXEL
    }

    /// Render one frame into `framebuffer` under the given camera.
    ///
    /// The camera is snapshotted once; the caller must not mutate it
    /// elsewhere while this call is in flight.  Returns only after
    /// every tile has been rendered and every pool worker has signaled
    /// completion, at which point the caller owns the buffer again and
    /// may present it.
    ///
    /// Takes the renderer by exclusive borrow: a second in-flight
    /// frame would race the counter reset against live claims and
    /// alias tile writes, so the borrow checker rules it out.
    pub fn render_frame(
        &mut self,
        camera: &Camera,
        framebuffer: &mut [u8],
    ) -> Result<(), EngineError> {
        if framebuffer.len() != self.frame_len() {
            return Err(EngineError::FrameSize {
                actual: framebuffer.len(),
                expected: self.frame_len(),
            });
        }

        self.scheduler.reset();
        let job = FrameJob {
            frame: SharedFrame::new(framebuffer, self.plane.width()),
            camera: *camera,
        };

        // Fan out: wake every worker.  A dead worker is fatal, but the
        // ones already woken hold the frame pointer, so fall through
        // to the barrier either way.
        let mut woken = 0;
        for link in &self.workers {
            if link.begin.send(job).is_err() {
                break;
            }
            woken += 1;
        }
        let mut lost = woken < self.workers.len();

        // The calling thread is one more claimant.
        drain_tiles(&self.plane, &self.scheduler, self.bailout, &job);

        // Fan in: hard barrier, no timeout.  A hung worker hangs the
        // frame, which is the documented trade for this domain.  Every
        // woken worker must arrive before the borrowed framebuffer can
        // be handed back, even once a loss is already known.
        for link in self.workers.iter().take(woken) {
            if link.end.recv().is_err() {
                lost = true;
            }
        }
        if lost {
            return Err(EngineError::WorkerLost);
        }
        Ok(())
    }
}

/// Body of a pool thread.  Idle (blocked on begin) -> rendering ->
/// idle, forever; the loop only breaks when the renderer is dropped
/// and the channels disconnect.
fn worker_loop(
    plane: &PlaneMapper,
    scheduler: &TileScheduler,
    bailout: u32,
    begin: &Receiver<FrameJob>,
    end: &Sender<()>,
) {
    while let Ok(job) = begin.recv() {
        drain_tiles(plane, scheduler, bailout, &job);
        if end.send(()).is_err() {
            break;
        }
    }
}

/// Claim and render tiles until the frame is exhausted.
fn drain_tiles(plane: &PlaneMapper, scheduler: &TileScheduler, bailout: u32, job: &FrameJob) {
    while let Some(index) = scheduler.claim_next() {
        render_tile(plane, scheduler.bounds(index), bailout, job);
    }
}

/// Render one tile: march each row a batch of lanes at a time through
/// the distance kernel and shade the results into the framebuffer.
fn render_tile(plane: &PlaneMapper, bounds: TileBounds, bailout: u32, job: &FrameJob) {
    let camera = &job.camera;
    let mut shades = [0u8; LANES];
    for y in bounds.y0..bounds.y1 {
        let im = plane.row_im(y, camera);
        let mut x = bounds.x0;
        while x < bounds.x1 {
            let mut c = ComplexBatch::splat(Complex::new(0.0, im));
            for l in 0..LANES {
                c.re[l] = plane.col_re(x + l as u32, camera);
            }
            let distance = distance_batch(&c, bailout);

            // A tile narrower than the batch writes only the prefix
            // that lies inside its bounds.
            let span = ((bounds.x1 - x) as usize).min(LANES);
            for l in 0..span {
                shades[l] = shade(distance[l], camera.zoom);
            }
            // Safety: this span is inside the tile this thread claimed,
            // and tiles are disjoint.
            unsafe { job.frame.write_span(x, y, &shades[..span]) };
            x += span as u32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BAILOUT: u32 = 64;

    fn demo_camera() -> Camera {
        Camera {
            zoom: 0.8,
            offset: Complex::new(0.5, 0.1),
        }
    }

    fn render(width: u32, height: u32, tile_size: u32, workers: usize) -> Vec<u8> {
        let mut renderer = TiledRenderer::new(width, height, tile_size, BAILOUT, workers).unwrap();
        let mut frame = vec![0u8; renderer.frame_len()];
        renderer.render_frame(&demo_camera(), &mut frame).unwrap();
        frame
    }

    #[test]
    fn construction_rejects_bad_configuration() {
        assert!(TiledRenderer::new(100, 100, 7, BAILOUT, 0).is_err());
        assert!(TiledRenderer::new(0, 100, 10, BAILOUT, 0).is_err());
        assert!(TiledRenderer::new(100, 100, 10, 0, 0).is_err());
    }

    #[test]
    fn render_frame_rejects_wrong_buffer_size() {
        let mut renderer = TiledRenderer::new(64, 64, 16, BAILOUT, 0).unwrap();
        let mut short = vec![0u8; 64 * 64];
        assert!(renderer.render_frame(&demo_camera(), &mut short).is_err());
    }

    #[test]
    fn every_pixel_is_written_opaque() {
        let frame = render(1280, 720, 20, 3);
        assert_eq!(frame.len(), 1280 * 720 * 4);
        for pixel in frame.chunks(4) {
            assert_eq!(pixel[3], 255);
            // Grayscale: all three color channels agree.
            assert_eq!(pixel[0], pixel[1]);
            assert_eq!(pixel[1], pixel[2]);
        }
    }

    #[test]
    fn demo_camera_classifies_interior_and_exterior() {
        let (width, height) = (1280u32, 720u32);
        let frame = render(width, height, 20, 2);
        let at = |x: u32, y: u32| frame[((y * width + x) * 4) as usize];

        // The demo camera centers the view near the main cardioid;
        // the screen center is interior and renders black.
        assert_eq!(at(width / 2, height / 2), 0);
        // The far upper-left corner is deep exterior, near-white.
        assert!(at(0, 0) > 200);
    }

    #[test]
    fn pool_size_does_not_change_the_image() {
        let alone = render(320, 240, 16, 0);
        for workers in &[1usize, 2, 7] {
            let pooled = render(320, 240, 16, *workers);
            assert_eq!(alone, pooled, "worker count {}", workers);
        }
    }

    #[test]
    fn barrier_holds_until_every_tile_is_written() {
        // An all-exterior camera shades every pixel white, so a zeroed
        // buffer directly exposes any tile the frame returned without
        // rendering.
        let camera = Camera {
            zoom: 0.8,
            offset: Complex::new(-10.0, -10.0),
        };
        let mut renderer = TiledRenderer::new(320, 320, 16, BAILOUT, 2).unwrap();
        for _ in 0..2 {
            let mut frame = vec![0u8; renderer.frame_len()];
            renderer.render_frame(&camera, &mut frame).unwrap();
            let unwritten = frame.chunks(4).filter(|p| p[3] != 255).count();
            assert_eq!(unwritten, 0);
            assert!(frame.chunks(4).all(|p| p[0] == 255));
        }
    }

    #[test]
    fn renderer_is_reusable_across_frames() {
        let mut renderer = TiledRenderer::new(160, 120, 8, BAILOUT, 2).unwrap();
        let mut camera = demo_camera();
        let mut frame = vec![0u8; renderer.frame_len()];
        let mut last = Vec::new();
        for _ in 0..3 {
            renderer.render_frame(&camera, &mut frame).unwrap();
            assert_ne!(frame, last);
            last = frame.clone();
            camera.zoom *= 0.5;
        }
    }

    #[test]
    fn odd_tile_width_against_the_batch_stays_in_bounds() {
        // 20 is not a multiple of the lane count, so every tile row
        // ends with a partial batch.
        let frame = render(100, 100, 20, 1);
        for pixel in frame.chunks(4) {
            assert_eq!(pixel[3], 255);
        }
    }
}
