use crate::bbox::{BBox, Ltrb};
use ndarray::prelude::*;

/// A decoded video frame, `(height, width, channel)` RGB pixels.
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: usize,
    pub image: Array3<u8>,
}

impl Frame {
    pub fn new(index: usize, image: Array3<u8>) -> Self {
        Self { index, image }
    }

    /// Black frame of `(width, height)` pixels.
    pub fn blank(index: usize, dims: (u32, u32)) -> Self {
        Self {
            index,
            image: Array3::zeros((dims.1 as usize, dims.0 as usize, 3)),
        }
    }

    /// `(width, height)` in pixels
    #[inline]
    pub fn dims(&self) -> (u32, u32) {
        let shape = self.image.shape();
        (shape[1] as u32, shape[0] as u32)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.image.is_empty()
    }

    /// Copies the pixels under `bbox`, clamped to the frame. Boxes that fall
    /// completely outside yield an empty crop.
    pub fn crop(&self, bbox: &BBox<Ltrb>) -> Array3<u8> {
        let b = bbox.clamp(self.dims());
        let (x0, y0) = (b.left().floor() as usize, b.top().floor() as usize);
        let (x1, y1) = (b.right().ceil() as usize, b.bottom().ceil() as usize);

        if x1 <= x0 || y1 <= y0 {
            return Array3::zeros((0, 0, self.image.shape()[2]));
        }

        self.image.slice(s![y0..y1, x0..x1, ..]).to_owned()
    }

    /// Paints the pixels under `bbox`, clamped to the frame.
    pub fn fill(&mut self, bbox: &BBox<Ltrb>, rgb: [u8; 3]) {
        let b = bbox.clamp(self.dims());
        let (x0, y0) = (b.left().floor() as usize, b.top().floor() as usize);
        let (x1, y1) = (b.right().ceil() as usize, b.bottom().ceil() as usize);

        if x1 <= x0 || y1 <= y0 {
            return;
        }

        for (c, v) in rgb.iter().enumerate() {
            self.image.slice_mut(s![y0..y1, x0..x1, c]).fill(*v);
        }
    }
}
