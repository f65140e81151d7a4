//! Contains the PlaneMapper struct, which describes the relationship
//! between the integral pixel plane of the framebuffer, with its
//! origin at 0,0, and the region of the complex plane currently in
//! view, as selected by a Camera's zoom and offset.

use errors::EngineError;
use num::Complex;

/// The view the user has steered to: a zoom factor and the complex
/// point at the center of the screen.  The input collaborator mutates
/// this between frames; the renderer snapshots it once per frame and
/// never sees it change mid-flight.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Camera {
    /// Half-width scale factor of the viewport.  Smaller is deeper.
    pub zoom: f64,
    /// Pan offset; the view is centered on `(-offset.re, -offset.im)`.
    pub offset: Complex<f64>,
}

impl Default for Camera {
    fn default() -> Camera {
        Camera {
            zoom: 1.0,
            offset: Complex::new(0.0, 0.0),
        }
    }
}

/// Describes the x, y of a point on the pixel plane.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Pixel(pub u32, pub u32);

/// Maps pixel coordinates to complex coordinates for a given camera.
/// The Y axis is the reference dimension; the X axis is stretched by
/// the aspect ratio so that circles stay circular on wide canvases.
#[derive(Debug)]
pub struct PlaneMapper {
    width: u32,
    height: u32,
    rcp_width: f64,
    rcp_height: f64,
    aspect: f64,
}

impl PlaneMapper {
    /// Constructor.  Takes the canvas dimensions in pixels; both must
    /// be nonzero.
    pub fn new(width: u32, height: u32) -> Result<PlaneMapper, EngineError> {
        if width == 0 || height == 0 {
            return Err(EngineError::EmptyCanvas);
        }
        Ok(PlaneMapper {
            width,
            height,
            rcp_width: 1.0 / f64::from(width),
            rcp_height: 1.0 / f64::from(height),
            aspect: f64::from(width) / f64::from(height),
        })
    }

    /// Canvas width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Canvas height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The real component of the complex point under pixel column `x`.
    #[inline]
    pub fn col_re(&self, x: u32, camera: &Camera) -> f64 {
        let raw = 2.0 * (f64::from(x) * self.rcp_width - 0.5) * self.aspect;
        raw * camera.zoom - camera.offset.re
    }

    /// The imaginary component of the complex point under pixel row `y`.
    #[inline]
    pub fn row_im(&self, y: u32, camera: &Camera) -> f64 {
        let raw = 2.0 * (f64::from(y) * self.rcp_height - 0.5);
        raw * camera.zoom - camera.offset.im
    }

    /// Given the column and row of a pixel on the integral plane,
    /// return the complex number at the equivalent location on the
    /// complex plane, under the given camera.
    pub fn pixel_to_point(&self, pixel: Pixel, camera: &Camera) -> Complex<f64> {
        Complex::new(self.col_re(pixel.0, camera), self.row_im(pixel.1, camera))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planemapper_fails_on_empty_canvas() {
        assert!(PlaneMapper::new(0, 720).is_err());
        assert!(PlaneMapper::new(1280, 0).is_err());
    }

    #[test]
    fn identity_camera_centers_the_origin() {
        let pm = PlaneMapper::new(200, 100).unwrap();
        let camera = Camera::default();
        let center = pm.pixel_to_point(Pixel(100, 50), &camera);
        assert_eq!(center, Complex::new(0.0, 0.0));
    }

    #[test]
    fn identity_camera_spans_two_units_vertically() {
        let pm = PlaneMapper::new(200, 100).unwrap();
        let camera = Camera::default();
        assert_eq!(pm.row_im(0, &camera), -1.0);
        assert_eq!(pm.row_im(100, &camera), 1.0);
    }

    #[test]
    fn aspect_ratio_stretches_the_real_axis_only() {
        let pm = PlaneMapper::new(200, 100).unwrap();
        let camera = Camera::default();
        // Twice as wide as tall, so the real axis spans four units.
        assert_eq!(pm.col_re(0, &camera), -2.0);
        assert_eq!(pm.col_re(200, &camera), 2.0);
    }

    #[test]
    fn offset_pans_and_zoom_scales() {
        let pm = PlaneMapper::new(100, 100).unwrap();
        let camera = Camera {
            zoom: 0.5,
            offset: Complex::new(0.25, -0.75),
        };
        let p = pm.pixel_to_point(Pixel(50, 50), &camera);
        assert_eq!(p, Complex::new(-0.25, 0.75));
        let corner = pm.pixel_to_point(Pixel(0, 0), &camera);
        assert_eq!(corner, Complex::new(-0.75, 0.25));
    }
}
