//! Image preprocessing for OCR.
//!
//! Scans and phone photos of identity documents have speckle noise and uneven
//! lighting. Every image goes through the same fixed pipeline before
//! recognition: grayscale, median blur, CLAHE, then adaptive Gaussian
//! binarization.

use std::path::Path;

use image::{DynamicImage, GrayImage, Luma};
use imageproc::filter::{gaussian_blur_f32, median_filter};
use tracing::debug;

use crate::error::ReadError;
use crate::models::PreprocessingConfig;

/// Image preprocessor for the OCR pipeline.
#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    /// Side of the median filter window.
    median_kernel: u32,
    /// CLAHE clip limit.
    clip_limit: f32,
    /// CLAHE tiles per axis.
    tiles: u32,
    /// Adaptive threshold neighborhood size.
    block_size: u32,
    /// Adaptive threshold offset.
    offset: i32,
}

impl ImagePreprocessor {
    /// Create a new preprocessor with default settings.
    pub fn new() -> Self {
        Self::from_config(&PreprocessingConfig::default())
    }

    pub fn from_config(config: &PreprocessingConfig) -> Self {
        Self {
            median_kernel: config.median_kernel.max(1),
            clip_limit: config.clahe_clip_limit,
            tiles: config.clahe_tiles.max(1),
            block_size: config.threshold_block_size.max(3) | 1,
            offset: config.threshold_offset,
        }
    }

    /// Decode an image file and preprocess it.
    pub fn open(&self, path: &Path) -> Result<GrayImage, ReadError> {
        let image = image::open(path).map_err(|e| ReadError::decode(path, e))?;
        Ok(self.preprocess(&image))
    }

    /// Run the full pipeline. The input is left untouched.
    pub fn preprocess(&self, image: &DynamicImage) -> GrayImage {
        let gray = image.to_luma8();
        debug!("Preprocessing {}x{} image", gray.width(), gray.height());

        let denoised = median_blur(&gray, self.median_kernel);
        let enhanced = clahe(&denoised, self.clip_limit, self.tiles);
        adaptive_gaussian_threshold(&enhanced, self.block_size, self.offset)
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Median filter over a `kernel`×`kernel` window.
pub fn median_blur(image: &GrayImage, kernel: u32) -> GrayImage {
    let radius = kernel / 2;
    median_filter(image, radius, radius)
}

/// Contrast-limited adaptive histogram equalization.
///
/// The image is split into `tiles`×`tiles` regions, each region's histogram
/// is clipped at `clip_limit` times the uniform bin height with the excess
/// spread over all bins, and every pixel is mapped by bilinear interpolation
/// between the four nearest tile mappings.
pub fn clahe(image: &GrayImage, clip_limit: f32, tiles: u32) -> GrayImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }

    let tiles_x = tiles.clamp(1, width);
    let tiles_y = tiles.clamp(1, height);

    let bounds = |tile: u32, count: u32, size: u32| {
        let start = (tile as u64 * size as u64 / count as u64) as u32;
        let end = ((tile as u64 + 1) * size as u64 / count as u64) as u32;
        (start, end)
    };

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        let (y0, y1) = bounds(ty, tiles_y, height);
        for tx in 0..tiles_x {
            let (x0, x1) = bounds(tx, tiles_x, width);

            let mut histogram = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    histogram[image.get_pixel(x, y)[0] as usize] += 1;
                }
            }

            let area = (x1 - x0) * (y1 - y0);
            luts.push(tile_lut(&mut histogram, area, clip_limit));
        }
    }

    let tile_w = width as f32 / tiles_x as f32;
    let tile_h = height as f32 / tiles_y as f32;
    let mut result = GrayImage::new(width, height);

    for y in 0..height {
        let fy = y as f32 / tile_h - 0.5;
        let ty1 = fy.floor();
        let ya = fy - ty1;
        let ty2 = ((ty1 as i64) + 1).min(tiles_y as i64 - 1).max(0) as usize;
        let ty1 = (ty1 as i64).max(0) as usize;

        for x in 0..width {
            let fx = x as f32 / tile_w - 0.5;
            let tx1 = fx.floor();
            let xa = fx - tx1;
            let tx2 = ((tx1 as i64) + 1).min(tiles_x as i64 - 1).max(0) as usize;
            let tx1 = (tx1 as i64).max(0) as usize;

            let v = image.get_pixel(x, y)[0] as usize;
            let lut = |ty: usize, tx: usize| luts[ty * tiles_x as usize + tx][v] as f32;

            let value = (lut(ty1, tx1) * (1.0 - xa) + lut(ty1, tx2) * xa) * (1.0 - ya)
                + (lut(ty2, tx1) * (1.0 - xa) + lut(ty2, tx2) * xa) * ya;

            result.put_pixel(x, y, Luma([value.round().clamp(0.0, 255.0) as u8]));
        }
    }

    result
}

/// Clip a tile histogram and turn it into an equalization lookup table.
fn tile_lut(histogram: &mut [u32; 256], area: u32, clip_limit: f32) -> [u8; 256] {
    if clip_limit > 0.0 {
        let limit = ((clip_limit * area as f32 / 256.0) as u32).max(1);

        let mut excess = 0u32;
        for bin in histogram.iter_mut() {
            if *bin > limit {
                excess += *bin - limit;
                *bin = limit;
            }
        }

        let batch = excess / 256;
        let residual = excess % 256;
        for bin in histogram.iter_mut() {
            *bin += batch;
        }
        if residual > 0 {
            let step = (256 / residual).max(1) as usize;
            for bin in histogram.iter_mut().step_by(step).take(residual as usize) {
                *bin += 1;
            }
        }
    }

    let scale = 255.0 / area.max(1) as f32;
    let mut lut = [0u8; 256];
    let mut sum = 0u32;
    for (value, count) in histogram.iter().enumerate() {
        sum += count;
        lut[value] = (sum as f32 * scale).round().min(255.0) as u8;
    }
    lut
}

/// Binarize against a Gaussian-weighted local mean.
///
/// A pixel becomes white when it is brighter than the weighted mean of its
/// `block_size`×`block_size` neighborhood minus `offset`, black otherwise.
pub fn adaptive_gaussian_threshold(image: &GrayImage, block_size: u32, offset: i32) -> GrayImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }

    // Same sigma OpenCV derives for a kernel of this size.
    let sigma = 0.3 * ((block_size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let mean = gaussian_blur_f32(image, sigma.max(0.1));

    let mut result = GrayImage::new(width, height);
    for (x, y, pixel) in image.enumerate_pixels() {
        let threshold = mean.get_pixel(x, y)[0] as i32 - offset;
        let output = if pixel[0] as i32 > threshold { 255 } else { 0 };
        result.put_pixel(x, y, Luma([output]));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn filled(width: u32, height: u32, value: u8) -> GrayImage {
        GrayImage::from_pixel(width, height, Luma([value]))
    }

    #[test]
    fn test_median_blur_removes_speck() {
        let mut image = filled(9, 9, 255);
        image.put_pixel(4, 4, Luma([0]));

        let blurred = median_blur(&image, 5);
        assert!(blurred.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn test_clahe_keeps_uniform_image_uniform() {
        let image = filled(64, 48, 120);
        let enhanced = clahe(&image, 2.0, 8);

        let first = enhanced.get_pixel(0, 0)[0];
        assert!(enhanced.pixels().all(|p| p[0] == first));
        assert_eq!(enhanced.dimensions(), (64, 48));
    }

    #[test]
    fn test_clahe_handles_images_smaller_than_grid() {
        let image = filled(3, 2, 90);
        let enhanced = clahe(&image, 2.0, 8);
        assert_eq!(enhanced.dimensions(), (3, 2));
    }

    #[test]
    fn test_clahe_stretches_low_contrast() {
        let mut image = GrayImage::new(32, 32);
        for (x, _, pixel) in image.enumerate_pixels_mut() {
            *pixel = Luma([if x < 16 { 100 } else { 110 }]);
        }

        let enhanced = clahe(&image, 40.0, 1);
        let dark = enhanced.get_pixel(0, 0)[0] as i32;
        let light = enhanced.get_pixel(31, 0)[0] as i32;
        assert!(light - dark > 10);
    }

    #[test]
    fn test_threshold_marks_dark_blob() {
        let mut image = filled(21, 21, 255);
        for y in 9..12 {
            for x in 9..12 {
                image.put_pixel(x, y, Luma([0]));
            }
        }

        let binary = adaptive_gaussian_threshold(&image, 11, 2);
        assert_eq!(binary.get_pixel(10, 10)[0], 0);
        assert_eq!(binary.get_pixel(0, 0)[0], 255);
    }

    #[test]
    fn test_preprocess_output_is_binary() {
        let mut rgb = image::RgbImage::new(40, 30);
        for (x, y, pixel) in rgb.enumerate_pixels_mut() {
            let v = ((x * 7 + y * 13) % 256) as u8;
            *pixel = image::Rgb([v, v / 2, 255 - v]);
        }
        let source = DynamicImage::ImageRgb8(rgb);

        let binary = ImagePreprocessor::new().preprocess(&source);

        assert_eq!(binary.dimensions(), (40, 30));
        assert!(binary.pixels().all(|p| p[0] == 0 || p[0] == 255));
    }

    #[test]
    fn test_open_rejects_non_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        std::fs::write(&path, b"not an image").unwrap();

        let result = ImagePreprocessor::new().open(&path);
        assert!(matches!(result, Err(ReadError::Decode { .. })));
    }
}
