/// Card candidate scoring
///
/// Turns traced contours into validated card candidates and picks the best.
/// Every eligible contour is scored; the winner is the maximum, not the first
/// match.
use super::DetectionProfile;
use crate::types::Boundary;
use crate::vision::{self, Contour};
use std::f64::consts::PI;

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub boundary: Boundary,
    pub area: f64,
    pub perimeter: f64,
    pub vertices: usize,
    pub fill_ratio: f64,
    pub aspect_ratio: f64,
    pub area_ratio: f64,
    pub compactness: f64,
    pub score: f64,
}

/// `4π·area / perimeter²`; 1.0 for a circle, about 0.76 for an ID card.
pub fn compactness(area: f64, perimeter: f64) -> f64 {
    if perimeter <= 0.0 {
        return 0.0;
    }
    4.0 * PI * area / (perimeter * perimeter)
}

/// Score one contour against `profile`. `None` if it is not card-like.
pub fn evaluate(
    contour: &[imageproc::point::Point<i32>],
    frame_width: u32,
    frame_height: u32,
    profile: &DetectionProfile,
) -> Option<Candidate> {
    let frame_area = frame_width as f64 * frame_height as f64;
    if contour.len() < 3 || frame_area <= 0.0 {
        return None;
    }

    let area = vision::contour_area(contour);
    let area_ratio = area / frame_area;
    if area_ratio < profile.min_area_ratio || area_ratio > profile.max_area_ratio {
        return None;
    }

    let perimeter = vision::perimeter(contour);
    if perimeter <= 0.0 {
        return None;
    }

    let polygon = profile.approx_tolerances.iter().find_map(|tolerance| {
        let approx = vision::approximate_polygon(contour, tolerance * perimeter);
        (profile.min_vertices..=profile.max_vertices)
            .contains(&approx.len())
            .then_some(approx)
    })?;

    // Box of the traced outline: the approximation cuts corners, so its own
    // box can be smaller than the area it encloses
    let boundary = vision::bounding_rect(contour)?.clamped_to(frame_width, frame_height)?;
    let rect_area = boundary.area() as f64;
    if rect_area <= 0.0 {
        return None;
    }

    let fill_ratio = area / rect_area;
    if fill_ratio < profile.min_fill_ratio || fill_ratio > profile.max_fill_ratio {
        return None;
    }

    let aspect_ratio = boundary.aspect_ratio();
    if aspect_ratio < profile.min_aspect_ratio || aspect_ratio > profile.max_aspect_ratio {
        return None;
    }

    let compactness = compactness(area, perimeter);
    Some(Candidate {
        boundary,
        area,
        perimeter,
        vertices: polygon.len(),
        fill_ratio,
        aspect_ratio,
        area_ratio,
        compactness,
        score: area * compactness,
    })
}

/// Highest-scoring valid candidate among `contours`.
pub fn select_best(
    contours: &[Contour],
    frame_width: u32,
    frame_height: u32,
    profile: &DetectionProfile,
) -> Option<Candidate> {
    let mut best: Option<Candidate> = None;
    for contour in contours {
        let Some(candidate) = evaluate(contour, frame_width, frame_height, profile) else {
            continue;
        };
        log::trace!(
            "Candidate {:?}: fill={:.2} aspect={:.2} area={:.2} score={:.0}",
            candidate.boundary,
            candidate.fill_ratio,
            candidate.aspect_ratio,
            candidate.area_ratio,
            candidate.score
        );
        if best.as_ref().map_or(true, |b| candidate.score > b.score) {
            best = Some(candidate);
        }
    }
    best
}
