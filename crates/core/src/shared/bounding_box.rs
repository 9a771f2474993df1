use serde::Serialize;

/// Face location as `(top, right, bottom, left)` pixel edges.
///
/// Published boxes are always in the coordinate space of the original,
/// unscaled capture frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub left: i32,
}

impl BoundingBox {
    pub fn new(top: i32, right: i32, bottom: i32, left: i32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// Builds a box from corner coordinates `[x1, y1, x2, y2]`.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self::new(
            y1.round() as i32,
            x2.round() as i32,
            y2.round() as i32,
            x1.round() as i32,
        )
    }

    pub fn width(&self) -> i32 {
        (self.right - self.left).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.bottom - self.top).max(0)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Maps a box found on a frame downscaled by `factor` back onto the
    /// original frame.
    pub fn unscaled(&self, factor: f64) -> Self {
        if factor <= 0.0 {
            return *self;
        }
        let up = |v: i32| (v as f64 / factor).round() as i32;
        Self::new(up(self.top), up(self.right), up(self.bottom), up(self.left))
    }

    /// Clamps every edge into `[0, width] x [0, height]`.
    pub fn clamped(&self, width: u32, height: u32) -> Self {
        let w = width as i32;
        let h = height as i32;
        Self::new(
            self.top.clamp(0, h),
            self.right.clamp(0, w),
            self.bottom.clamp(0, h),
            self.left.clamp(0, w),
        )
    }
}
