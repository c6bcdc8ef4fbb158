use nalgebra as na;
use serde_derive::{Deserialize, Serialize};
use std::marker::PhantomData;

pub trait BBoxFormat: std::fmt::Debug {}

/// Left-top-right-bottom format, contains left top and right bottom corners
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct Ltrb;
impl BBoxFormat for Ltrb {}

/// X-y-width-height format, contains coordinates of the center of bbox and width-height
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct Xywh;
impl BBoxFormat for Xywh {}

/// Representative point of a box used when an extended object has to be
/// reduced to a single pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Center,
    BottomCenter,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(transparent, bound = "")]
pub struct BBox<F: BBoxFormat>([f32; 4], PhantomData<F>);

impl<F: BBoxFormat> From<BBox<F>> for [f32; 4] {
    fn from(bbox: BBox<F>) -> Self {
        bbox.0
    }
}

impl<F: BBoxFormat> BBox<F> {
    #[inline]
    pub fn as_slice(&self) -> &[f32; 4] {
        &self.0
    }
}

impl BBox<Ltrb> {
    #[inline]
    pub fn ltrb(x1: f32, x2: f32, x3: f32, x4: f32) -> Self {
        BBox([x1, x2, x3, x4], PhantomData)
    }

    #[inline]
    pub fn as_xywh(&self) -> BBox<Xywh> {
        self.into()
    }

    #[inline(always)]
    pub fn left(&self) -> f32 {
        self.0[0]
    }

    #[inline(always)]
    pub fn top(&self) -> f32 {
        self.0[1]
    }

    #[inline(always)]
    pub fn right(&self) -> f32 {
        self.0[2]
    }

    #[inline(always)]
    pub fn bottom(&self) -> f32 {
        self.0[3]
    }

    #[inline(always)]
    pub fn width(&self) -> f32 {
        self.0[2] - self.0[0]
    }

    #[inline(always)]
    pub fn height(&self) -> f32 {
        self.0[3] - self.0[1]
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    pub fn anchor(&self, anchor: Anchor) -> na::Point2<f32> {
        let cx = (self.left() + self.right()) / 2.0;

        match anchor {
            Anchor::Center => na::Point2::new(cx, (self.top() + self.bottom()) / 2.0),
            Anchor::BottomCenter => na::Point2::new(cx, self.bottom()),
        }
    }

    /// Grows the box by `px` on every side.
    #[inline]
    pub fn pad(&self, px: f32) -> Self {
        Self::ltrb(
            self.left() - px,
            self.top() - px,
            self.right() + px,
            self.bottom() + px,
        )
    }

    /// Clamps the box to an image of `(width, height)` pixels.
    pub fn clamp(&self, dims: (u32, u32)) -> Self {
        let (w, h) = (dims.0 as f32, dims.1 as f32);

        Self::ltrb(
            self.left().clamp(0.0, w),
            self.top().clamp(0.0, h),
            self.right().clamp(0.0, w),
            self.bottom().clamp(0.0, h),
        )
    }

    pub fn iou(&self, other: &BBox<Ltrb>) -> f32 {
        let i_xmin = self.left().max(other.left());
        let i_xmax = self.right().min(other.right());
        let i_ymin = self.top().max(other.top());
        let i_ymax = self.bottom().min(other.bottom());
        let i_area = (i_xmax - i_xmin).max(0.) * (i_ymax - i_ymin).max(0.);

        let union = self.area() + other.area() - i_area;
        if union <= f32::EPSILON {
            return 0.0;
        }

        i_area / union
    }
}

impl BBox<Xywh> {
    #[inline]
    pub fn xywh(x1: f32, x2: f32, x3: f32, x4: f32) -> Self {
        BBox([x1, x2, x3, x4], PhantomData)
    }

    #[inline(always)]
    pub fn as_ltrb(&self) -> BBox<Ltrb> {
        self.into()
    }

    #[inline(always)]
    pub fn cx(&self) -> f32 {
        self.0[0]
    }

    #[inline(always)]
    pub fn cy(&self) -> f32 {
        self.0[1]
    }

    #[inline(always)]
    pub fn width(&self) -> f32 {
        self.0[2]
    }

    #[inline(always)]
    pub fn height(&self) -> f32 {
        self.0[3]
    }
}

impl<'a> From<&'a BBox<Ltrb>> for BBox<Xywh> {
    #[inline]
    fn from(v: &'a BBox<Ltrb>) -> Self {
        Self(
            [
                (v.0[0] + v.0[2]) / 2.0,
                (v.0[1] + v.0[3]) / 2.0,
                v.0[2] - v.0[0],
                v.0[3] - v.0[1],
            ],
            PhantomData,
        )
    }
}

impl<'a> From<&'a BBox<Xywh>> for BBox<Ltrb> {
    #[inline]
    fn from(v: &'a BBox<Xywh>) -> Self {
        Self(
            [
                v.0[0] - v.0[2] / 2.0,
                v.0[1] - v.0[3] / 2.0,
                v.0[0] + v.0[2] / 2.0,
                v.0[1] + v.0[3] / 2.0,
            ],
            PhantomData,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bottom_center_anchor() {
        let b = BBox::ltrb(10.0, 20.0, 30.0, 60.0);
        let p = b.anchor(Anchor::BottomCenter);

        assert_eq!(p, na::Point2::new(20.0, 60.0));
        assert_eq!(b.anchor(Anchor::Center), na::Point2::new(20.0, 40.0));
    }

    #[test]
    fn padding_moves_every_side() {
        let b = BBox::ltrb(10.0, 10.0, 20.0, 20.0).pad(10.0);

        assert_eq!(b.as_slice(), &[0.0, 0.0, 30.0, 30.0]);
    }

    #[test]
    fn iou_of_half_overlap() {
        let a = BBox::ltrb(0.0, 0.0, 10.0, 10.0);
        let b = BBox::ltrb(5.0, 0.0, 15.0, 10.0);

        assert!((a.iou(&b) - 50.0 / 150.0).abs() < 1e-6);
        assert_eq!(a.iou(&BBox::ltrb(20.0, 20.0, 30.0, 30.0)), 0.0);
    }

    #[test]
    fn xywh_conversion() {
        let b = BBox::ltrb(0.0, 10.0, 40.0, 30.0);
        let c = b.as_xywh();

        assert_eq!(c.as_slice(), &[20.0, 20.0, 40.0, 20.0]);
        assert_eq!(c.as_ltrb(), b);
    }

    #[test]
    fn clamp_to_frame() {
        let b = BBox::ltrb(-5.0, -5.0, 120.0, 50.0).clamp((100, 40));

        assert_eq!(b.as_slice(), &[0.0, 0.0, 100.0, 40.0]);
    }
}
