//! Collinear run collapsing for traced contours.
//!
//! Border following emits one point per boundary pixel. Long horizontal,
//! vertical and diagonal runs can be represented by their two end points
//! alone; dropping the interior points makes each stroke event cover more
//! of the boundary, so the sketch is drawn in fewer, longer lines.

use crate::types::{Contour, Point};

/// Remove every point that continues the previous step in the same
/// direction.
///
/// A point is dropped when the segments on either side of it are
/// collinear and point the same way. First and last points are always
/// kept. Contours with fewer than 3 points are returned unchanged.
#[must_use = "returns the collapsed contour"]
pub fn collapse_collinear(contour: &Contour) -> Contour {
    let points = contour.points();
    if points.len() < 3 {
        return contour.clone();
    }

    let mut kept = Vec::with_capacity(points.len());
    kept.push(points[0]);
    for window in points.windows(3) {
        let [prev, current, next] = [window[0], window[1], window[2]];
        if !continues_straight(prev, current, next) {
            kept.push(current);
        }
    }
    kept.push(points[points.len() - 1]);

    Contour::new(kept)
}

/// Whether `current -> next` continues `prev -> current` without turning.
fn continues_straight(prev: Point, current: Point, next: Point) -> bool {
    let (ax, ay) = (
        i64::from(current.x) - i64::from(prev.x),
        i64::from(current.y) - i64::from(prev.y),
    );
    let (bx, by) = (
        i64::from(next.x) - i64::from(current.x),
        i64::from(next.y) - i64::from(current.y),
    );
    let cross = ax * by - ay * bx;
    let dot = ax * bx + ay * by;
    cross == 0 && dot > 0
}
