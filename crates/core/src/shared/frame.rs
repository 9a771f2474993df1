use std::time::SystemTime;

use image::imageops::FilterType;
use image::RgbImage;
use ndarray::ArrayView3;

/// A single captured frame: contiguous RGB bytes in row-major order.
///
/// Format conversion happens at I/O boundaries only; the pipeline treats
/// pixel data as opaque apart from overlay drawing and resizing.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    index: u64,
    captured_at: SystemTime,
}

pub const CHANNELS: usize = 3;

impl Frame {
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        index: u64,
        captured_at: SystemTime,
    ) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * CHANNELS,
            "data length must equal width * height * 3"
        );
        Self {
            data,
            width,
            height,
            index,
            captured_at,
        }
    }

    /// All-black frame, used when the camera yields nothing.
    pub fn blank(width: u32, height: u32) -> Self {
        let len = (width as usize) * (height as usize) * CHANNELS;
        Self::new(vec![0u8; len], width, height, 0, SystemTime::now())
    }

    pub fn from_rgb_image(image: RgbImage, index: u64, captured_at: SystemTime) -> Self {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height, index, captured_at)
    }

    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.data.clone())
    }

    /// Returns a copy scaled by `factor`, keeping index and capture time.
    ///
    /// A factor of 1.0 (or anything that rounds to the same size) clones.
    pub fn scaled(&self, factor: f64) -> Frame {
        let new_w = ((self.width as f64 * factor).round() as u32).max(1);
        let new_h = ((self.height as f64 * factor).round() as u32).max(1);
        if new_w == self.width && new_h == self.height {
            return self.clone();
        }
        match self.to_rgb_image() {
            Some(img) => {
                let resized = image::imageops::resize(&img, new_w, new_h, FilterType::Triangle);
                Frame::from_rgb_image(resized, self.index, self.captured_at)
            }
            None => self.clone(),
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn captured_at(&self) -> SystemTime {
        self.captured_at
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    fn shape(&self) -> (usize, usize, usize) {
        (self.height as usize, self.width as usize, CHANNELS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(width: u32, height: u32, value: u8) -> Frame {
        let data = vec![value; (width * height) as usize * CHANNELS];
        Frame::new(data, width, height, 7, SystemTime::UNIX_EPOCH)
    }

    #[test]
    fn test_construction_and_accessors() {
        let f = frame(2, 2, 9);
        assert_eq!(f.width(), 2);
        assert_eq!(f.height(), 2);
        assert_eq!(f.index(), 7);
        assert_eq!(f.captured_at(), SystemTime::UNIX_EPOCH);
        assert_eq!(f.data().len(), 12);
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * 3")]
    fn test_mismatched_data_length_panics_in_debug() {
        Frame::new(vec![0u8; 10], 2, 2, 0, SystemTime::now());
    }

    #[test]
    fn test_blank_is_all_zero() {
        let f = Frame::blank(4, 3);
        assert_eq!(f.data().len(), 36);
        assert!(f.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_scaled_halves_dimensions_and_keeps_identity() {
        let f = frame(8, 6, 200);
        let small = f.scaled(0.5);
        assert_eq!((small.width(), small.height()), (4, 3));
        assert_eq!(small.index(), 7);
        assert_eq!(small.captured_at(), SystemTime::UNIX_EPOCH);
        assert!(small.data().iter().all(|&b| b == 200));
    }

    #[test]
    fn test_scaled_identity_factor_clones() {
        let f = frame(5, 5, 1);
        let same = f.scaled(1.0);
        assert_eq!(same.data(), f.data());
    }

    #[test]
    fn test_rgb_image_roundtrip_preserves_pixels() {
        let mut f = frame(3, 2, 0);
        f.data_mut()[4] = 255;
        let img = f.to_rgb_image().unwrap();
        let back = Frame::from_rgb_image(img, 1, SystemTime::UNIX_EPOCH);
        assert_eq!(back.data(), f.data());
    }

    #[test]
    fn test_as_ndarray_pixel_access() {
        let mut f = frame(2, 2, 0);
        f.data_mut()[6] = 255; // row=1, col=0, R
        let arr = f.as_ndarray();
        assert_eq!(arr.shape(), &[2, 2, 3]);
        assert_eq!(arr[[1, 0, 0]], 255);
        assert_eq!(arr[[1, 0, 1]], 0);
    }
}
