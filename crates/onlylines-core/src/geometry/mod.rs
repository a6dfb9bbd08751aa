//! Geometric primitives and their pairwise intersection.

mod line;

pub use line::{Coordinate, Line};

use crate::error::{ValidationError, finite};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Divisor used for the slope when a line is exactly vertical.
pub const SLOPE_FALLBACK_DIVISOR: f64 = 0.001;
/// Determinants below this magnitude are treated as parallel lines.
pub const PARALLEL_TOLERANCE: f64 = 0.001;
/// Slope and intercept are truncated to this many steps per unit when
/// testing two lines for coincidence.
pub const EQUALITY_PRECISION: f64 = 1000.0;

/// Viewport rectangle centered on the origin, spanning
/// `[-w/2, w/2] x [-h/2, h/2]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub w: f64,
    pub h: f64,
    pub diagonal: f64,
}

impl Bounds {
    /// Create bounds of `w` x `h`. Both must be positive and finite.
    pub fn new(w: f64, h: f64) -> Result<Self, ValidationError> {
        if !(w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0) {
            return Err(ValidationError::InvalidBounds {
                width: w,
                height: h,
            });
        }
        Ok(Self {
            w,
            h,
            diagonal: w.hypot(h),
        })
    }

    /// Distance from the center to the left and right edges.
    pub fn half_width(&self) -> f64 {
        self.w / 2.0
    }

    /// Distance from the center to the top and bottom edges.
    pub fn half_height(&self) -> f64 {
        self.h / 2.0
    }

    /// Whether `point` lies inside the rectangle, widened by `tolerance`.
    pub fn contains(&self, point: Point, tolerance: f64) -> bool {
        point.x.abs() <= self.half_width() + tolerance
            && point.y.abs() <= self.half_height() + tolerance
    }
}

/// Discriminant of [`Primitive`], used to key the intersection table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveKind {
    Line,
}

/// A shape that can take part in a relation.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Primitive {
    Line(Line),
}

impl Primitive {
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Primitive::Line(_) => PrimitiveKind::Line,
        }
    }

    /// The line, if this primitive is one.
    pub fn as_line(&self) -> Option<&Line> {
        match self {
            Primitive::Line(line) => Some(line),
        }
    }

    pub fn as_line_mut(&mut self) -> Option<&mut Line> {
        match self {
            Primitive::Line(line) => Some(line),
        }
    }
}

/// Intersection routine for one ordered pair of primitive kinds.
pub type IntersectFn = fn(&Primitive, &Primitive) -> Option<Point>;

fn line_line(a: &Primitive, b: &Primitive) -> Option<Point> {
    match (a, b) {
        (Primitive::Line(a), Primitive::Line(b)) => a.intersect_with_line(b),
    }
}

/// Looks up the intersection routine for a pair of kinds.
pub fn intersection_for(a: PrimitiveKind, b: PrimitiveKind) -> Option<IntersectFn> {
    match (a, b) {
        (PrimitiveKind::Line, PrimitiveKind::Line) => Some(line_line),
    }
}

/// Validate a point, naming its coordinates `x_field`/`y_field` on failure.
pub(crate) fn finite_point(
    x_field: &'static str,
    y_field: &'static str,
    point: Point,
) -> Result<Point, ValidationError> {
    Ok(Point::new(finite(x_field, point.x)?, finite(y_field, point.y)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::LineId;

    #[test]
    fn test_bounds_diagonal() {
        let bounds = Bounds::new(300.0, 400.0).unwrap();
        assert!((bounds.diagonal - 500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_bounds_rejects_invalid_sizes() {
        assert!(Bounds::new(0.0, 10.0).is_err());
        assert!(Bounds::new(10.0, -1.0).is_err());
        assert!(Bounds::new(f64::NAN, 10.0).is_err());
        assert!(Bounds::new(f64::INFINITY, 10.0).is_err());
    }

    #[test]
    fn test_intersect_dispatch_line_line() {
        let a = Line::new(LineId::new("a"), Point::new(-10.0, -10.0), Point::new(10.0, 10.0)).unwrap();
        let b = Line::new(LineId::new("b"), Point::new(-10.0, 10.0), Point::new(10.0, -10.0)).unwrap();
        let intersect = intersection_for(PrimitiveKind::Line, PrimitiveKind::Line).unwrap();
        let p = intersect(&Primitive::Line(a), &Primitive::Line(b)).unwrap();
        assert!(p.x.abs() < 1e-9);
        assert!(p.y.abs() < 1e-9);
    }
}
