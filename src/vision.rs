//! Computer-vision primitives used by the card detector and sharpness scoring.
//!
//! Thin wrappers over `image` and `imageproc` so the rest of the crate speaks
//! in `GrayImage`, contour point lists and [`Boundary`] values.

use crate::types::Boundary;
use image::{GrayImage, Luma, RgbaImage};
use imageproc::contours::{find_contours, BorderType};
use imageproc::distance_transform::Norm;
use imageproc::point::Point;

/// A closed contour as traced from an edge map.
pub type Contour = Vec<Point<i32>>;

pub fn grayscale(image: &RgbaImage) -> GrayImage {
    image::imageops::grayscale(image)
}

/// Gaussian blur. A non-positive sigma returns the input unchanged.
pub fn gaussian_blur(gray: &GrayImage, sigma: f32) -> GrayImage {
    if sigma <= 0.0 || gray.width() == 0 || gray.height() == 0 {
        return gray.clone();
    }
    imageproc::filter::gaussian_blur_f32(gray, sigma)
}

/// Gaussian sigma matching an odd `ksize` x `ksize` kernel with automatic sigma.
pub fn sigma_for_kernel(ksize: u32) -> f32 {
    0.3 * ((ksize as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Inverted adaptive mean threshold.
///
/// A pixel becomes foreground (255) when it is at least `offset` darker than
/// the mean of its `block_size` x `block_size` neighbourhood. Flat regions
/// become background regardless of their absolute brightness.
///
/// Around a bright card on a darker background the foreground is a band of
/// up to `block_size / 2` pixels just outside the card edge, so contours
/// traced from it enclose the card with that margin.
pub fn adaptive_threshold_inv(gray: &GrayImage, block_size: u32, offset: i32) -> GrayImage {
    let (width, height) = gray.dimensions();
    let mut output = GrayImage::new(width, height);
    if width == 0 || height == 0 {
        return output;
    }

    let radius = (block_size.max(3) / 2) as i64;
    let integral = integral_image(gray);
    let stride = width as usize + 1;

    for y in 0..height {
        let y0 = (y as i64 - radius).max(0) as usize;
        let y1 = (y as i64 + radius + 1).min(height as i64) as usize;
        for x in 0..width {
            let x0 = (x as i64 - radius).max(0) as usize;
            let x1 = (x as i64 + radius + 1).min(width as i64) as usize;

            let sum = integral[y1 * stride + x1] + integral[y0 * stride + x0]
                - integral[y0 * stride + x1]
                - integral[y1 * stride + x0];
            let count = ((x1 - x0) * (y1 - y0)) as u64;
            let mean = (sum / count) as i32;

            let value = gray.get_pixel(x, y).0[0] as i32;
            if value <= mean - offset {
                output.put_pixel(x, y, Luma([255]));
            }
        }
    }

    output
}

/// Summed-area table with one row and column of zero padding.
fn integral_image(gray: &GrayImage) -> Vec<u64> {
    let (width, height) = gray.dimensions();
    let stride = width as usize + 1;
    let mut table = vec![0u64; stride * (height as usize + 1)];

    for y in 0..height as usize {
        let mut row_sum = 0u64;
        for x in 0..width as usize {
            row_sum += gray.get_pixel(x as u32, y as u32).0[0] as u64;
            table[(y + 1) * stride + x + 1] = table[y * stride + x + 1] + row_sum;
        }
    }

    table
}

/// Morphological closing with a square structuring element of `radius`.
pub fn close(binary: &GrayImage, radius: u8) -> GrayImage {
    if radius == 0 {
        return binary.clone();
    }
    imageproc::morphology::close(binary, Norm::LInf, radius)
}

pub fn dilate(binary: &GrayImage, radius: u8) -> GrayImage {
    if radius == 0 {
        return binary.clone();
    }
    imageproc::morphology::dilate(binary, Norm::LInf, radius)
}

pub fn canny(gray: &GrayImage, low: f32, high: f32) -> GrayImage {
    imageproc::edges::canny(gray, low, high)
}

/// Outermost contours of the foreground in `edges`.
///
/// Contours nested inside another contour are dropped, as are traces too
/// short to enclose any area.
pub fn external_contours(edges: &GrayImage) -> Vec<Contour> {
    if edges.width() == 0 || edges.height() == 0 {
        return Vec::new();
    }
    find_contours::<i32>(edges)
        .into_iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
        .filter(|c| c.points.len() >= 3)
        .map(|c| c.points)
        .collect()
}

/// Shoelace area of a closed polygon.
pub fn contour_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice_area = 0i64;
    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        twice_area += p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64;
    }
    (twice_area as f64 / 2.0).abs()
}

/// Closed perimeter length.
pub fn perimeter(points: &[Point<i32>]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    imageproc::geometry::arc_length(points, true)
}

/// Douglas-Peucker approximation of a closed contour.
///
/// Repeated points (including the closing repeat of the first vertex) are
/// removed so the result length is the vertex count.
pub fn approximate_polygon(points: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    if points.len() < 3 || epsilon.is_nan() || epsilon <= 0.0 {
        return points.to_vec();
    }
    let mut approx = imageproc::geometry::approximate_polygon_dp(points, epsilon, true);
    approx.dedup();
    while approx.len() > 1 && approx.first() == approx.last() {
        approx.pop();
    }
    approx
}

/// Inclusive pixel bounding box of a point set.
pub fn bounding_rect(points: &[Point<i32>]) -> Option<Boundary> {
    let min_x = points.iter().map(|p| p.x).min()?;
    let max_x = points.iter().map(|p| p.x).max()?;
    let min_y = points.iter().map(|p| p.y).min()?;
    let max_y = points.iter().map(|p| p.y).max()?;
    if min_x < 0 || min_y < 0 {
        return None;
    }
    Some(Boundary::new(
        min_x as u32,
        min_y as u32,
        (max_x - min_x + 1) as u32,
        (max_y - min_y + 1) as u32,
    ))
}

/// Variance of the 3x3 Laplacian response. `None` for an empty image.
pub fn laplacian_variance(gray: &GrayImage) -> Option<f64> {
    if gray.width() == 0 || gray.height() == 0 {
        return None;
    }
    let response = imageproc::filter::laplacian_filter(gray);
    let count = gray.width() as f64 * gray.height() as f64;

    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for pixel in response.pixels() {
        let v = pixel.0[0] as f64;
        sum += v;
        sum_sq += v * v;
    }
    let mean = sum / count;
    Some((sum_sq / count - mean * mean).max(0.0))
}
