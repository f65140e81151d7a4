//! Shading and framebuffer access.
//!
//! The presentation collaborator owns the pixel buffer; during a frame
//! the renderer is its only writer.  Tiles partition the canvas, so
//! two threads never touch the same byte, and that disjointness is the
//! entire justification for handing every worker the same pointer.

/// Bytes per framebuffer pixel: B, G, R, A.
pub const BYTES_PER_PIXEL: usize = 4;

/// Map a raw distance estimate to an 8-bit grayscale intensity.
///
/// The raw estimate spans a huge dynamic range, so it is normalized by
/// the current zoom and compressed through a double square root before
/// clamping.  Interior points (distance 0) come out black; anything at
/// or beyond one zoom-width of the boundary saturates to white.  The
/// mapping is monotone in `distance`.
#[inline]
pub fn shade(distance: f64, zoom: f64) -> u8 {
    let intensity = (distance / zoom).sqrt().sqrt().min(1.0);
    (255.0 * intensity) as u8
}

/// An unsynchronized view of the caller's framebuffer, shared with
/// every worker for the duration of one frame.
///
/// Safety rests on the tile partition invariant: each claimed tile
/// covers a distinct pixel rectangle, so concurrent `write_span` calls
/// from different threads never alias.  At most one frame is ever in
/// flight, because `render_frame` borrows the renderer exclusively,
/// and its end-of-frame barrier guarantees no worker holds this view
/// after it returns; that is what makes borrowing from a `&mut [u8]`
/// sound.
#[derive(Copy, Clone)]
pub(crate) struct SharedFrame {
    ptr: *mut u8,
    len: usize,
    width: usize,
}

unsafe impl Send for SharedFrame {}
unsafe impl Sync for SharedFrame {}

impl SharedFrame {
    /// Wrap the caller's buffer for one frame.  `width` is the canvas
    /// width in pixels.
    pub fn new(buffer: &mut [u8], width: u32) -> SharedFrame {
        SharedFrame {
            ptr: buffer.as_mut_ptr(),
            len: buffer.len(),
            width: width as usize,
        }
    }

    /// Overwrite a horizontal run of pixels starting at `(x, y)` with
    /// the given grayscale values, alpha fully opaque.  Never blends.
    ///
    /// # Safety
    ///
    /// The run must lie inside the tile the calling thread claimed for
    /// this frame, and the underlying buffer must still be alive.
    pub unsafe fn write_span(&self, x: u32, y: u32, shades: &[u8]) {
        let mut idx = (x as usize + y as usize * self.width) * BYTES_PER_PIXEL;
        debug_assert!(idx + shades.len() * BYTES_PER_PIXEL <= self.len);
        for &v in shades {
            let p = self.ptr.add(idx);
            *p = v;
            *p.add(1) = v;
            *p.add(2) = v;
            *p.add(3) = 255;
            idx += BYTES_PER_PIXEL;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interior_shades_black() {
        assert_eq!(shade(0.0, 0.8), 0);
    }

    #[test]
    fn shade_is_monotone() {
        let zoom = 0.8;
        let mut last = 0;
        for step in 0..1000 {
            let d = f64::from(step) * 0.001;
            let v = shade(d, zoom);
            assert!(v >= last);
            last = v;
        }
    }

    #[test]
    fn shade_saturates_at_one_zoom_width() {
        assert_eq!(shade(1.0, 1.0), 255);
        assert_eq!(shade(7.5, 0.3), 255);
        assert_eq!(shade(1e300, 1.0), 255);
    }

    #[test]
    fn write_span_is_grayscale_opaque() {
        let mut buffer = vec![0u8; 4 * 2 * BYTES_PER_PIXEL];
        {
            let frame = SharedFrame::new(&mut buffer, 4);
            unsafe { frame.write_span(1, 1, &[7, 200]) };
        }
        let base = (1 + 4) * BYTES_PER_PIXEL;
        assert_eq!(&buffer[base..base + 8], &[7, 7, 7, 255, 200, 200, 200, 255]);
        // Nothing outside the span was touched.
        assert!(buffer[..base].iter().all(|&b| b == 0));
    }
}
