//! Infinite line through two points.

use super::{Bounds, EQUALITY_PRECISION, PARALLEL_TOLERANCE, SLOPE_FALLBACK_DIVISOR, finite_point};
use crate::error::{ValidationError, finite};
use crate::ids::LineId;
use kurbo::{Point, Vec2};

/// One of the four stored coordinates of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coordinate {
    X1,
    Y1,
    X2,
    Y2,
}

/// An infinite line defined by two points.
///
/// `start` and `end` only pick the line; nothing here treats them as
/// segment bounds. Slope and intercept are derived on every mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    id: LineId,
    start: Point,
    end: Point,
    slope: f64,
    intercept: f64,
}

impl Line {
    /// Create a line, rejecting non-finite coordinates.
    pub fn new(id: LineId, start: Point, end: Point) -> Result<Self, ValidationError> {
        let start = finite_point("x1", "y1", start)?;
        let end = finite_point("x2", "y2", end)?;
        let mut line = Self {
            id,
            start,
            end,
            slope: 0.0,
            intercept: 0.0,
        };
        line.rederive();
        Ok(line)
    }

    /// Get the line's document id.
    pub fn id(&self) -> &LineId {
        &self.id
    }

    /// First defining point.
    pub fn start(&self) -> Point {
        self.start
    }

    /// Second defining point.
    pub fn end(&self) -> Point {
        self.end
    }

    /// Slope `m`. A zero run is replaced by [`SLOPE_FALLBACK_DIVISOR`],
    /// so vertical lines get a very steep but finite slope.
    pub fn slope(&self) -> f64 {
        self.slope
    }

    /// Intercept `b` in `y = m·x + b`.
    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    fn rederive(&mut self) {
        let run = self.end.x - self.start.x;
        let run = if run == 0.0 { SLOPE_FALLBACK_DIVISOR } else { run };
        self.slope = (self.end.y - self.start.y) / run;
        self.intercept = self.start.y - self.slope * self.start.x;
    }

    /// Set a single coordinate and rederive slope and intercept.
    pub fn set_coordinate(&mut self, coordinate: Coordinate, value: f64) -> Result<(), ValidationError> {
        match coordinate {
            Coordinate::X1 => self.start.x = finite("x1", value)?,
            Coordinate::Y1 => self.start.y = finite("y1", value)?,
            Coordinate::X2 => self.end.x = finite("x2", value)?,
            Coordinate::Y2 => self.end.y = finite("y2", value)?,
        }
        self.rederive();
        Ok(())
    }

    /// Move the first defining point.
    pub fn set_start(&mut self, start: Point) -> Result<(), ValidationError> {
        self.start = finite_point("x1", "y1", start)?;
        self.rederive();
        Ok(())
    }

    /// Move the second defining point.
    pub fn set_end(&mut self, end: Point) -> Result<(), ValidationError> {
        self.end = finite_point("x2", "y2", end)?;
        self.rederive();
        Ok(())
    }

    /// Replace both points. Nothing changes if either is invalid.
    pub fn set_points(&mut self, start: Point, end: Point) -> Result<(), ValidationError> {
        let start = finite_point("x1", "y1", start)?;
        let end = finite_point("x2", "y2", end)?;
        self.start = start;
        self.end = end;
        self.rederive();
        Ok(())
    }

    /// Shift both points by `delta`.
    pub fn translate(&mut self, delta: Vec2) -> Result<(), ValidationError> {
        self.set_points(self.start + delta, self.end + delta)
    }

    /// `y` on the line at `x`.
    pub fn y_for(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    /// `x` on the line at `y`. Horizontal lines give an infinite or NaN
    /// result; callers handle that case first.
    pub fn x_for(&self, y: f64) -> f64 {
        (y - self.intercept) / self.slope
    }

    /// The two points where the line crosses the border of the
    /// `w` x `h` rectangle centered on the origin.
    ///
    /// The first point is the crossing of the bottom edge, or of the
    /// nearest vertical edge when the bottom crossing falls outside the
    /// rectangle; the second is the same for the top edge.
    pub fn edges_for(&self, w: f64, h: f64) -> Result<[Point; 2], ValidationError> {
        if !(w.is_finite() && h.is_finite() && w >= 0.0 && h >= 0.0) {
            return Err(ValidationError::InvalidBounds {
                width: w,
                height: h,
            });
        }
        let half_w = w / 2.0;
        let half_h = h / 2.0;

        // Never crosses the horizontal edges.
        if self.slope == 0.0 {
            return Ok([
                Point::new(-half_w, self.intercept),
                Point::new(half_w, self.intercept),
            ]);
        }

        let clamp = |y: f64| {
            let x = self.x_for(y);
            if x.abs() <= half_w {
                Point::new(x, y)
            } else {
                let edge = half_w.copysign(x);
                Point::new(edge, self.y_for(edge))
            }
        };

        Ok([clamp(-half_h), clamp(half_h)])
    }

    /// A segment starting at the leftmost crossing of `bounds` and
    /// running `bounds.diagonal` along the line, so it spans the whole
    /// viewport whatever the rounding at the edges.
    pub fn create_full_line(&self, bounds: &Bounds) -> [Point; 2] {
        let half_w = bounds.half_width();
        let half_h = bounds.half_height();

        let origin = if self.slope == 0.0 {
            Point::new(-half_w, self.intercept)
        } else {
            let y = self.y_for(-half_w);
            if y > half_h {
                let x = self.x_for(half_h);
                Point::new(x, self.y_for(x))
            } else if y < -half_h {
                let x = self.x_for(-half_h);
                Point::new(x, self.y_for(x))
            } else {
                Point::new(-half_w, y)
            }
        };

        let angle = self.slope.atan();
        let end = Point::new(
            origin.x + bounds.diagonal * angle.cos(),
            origin.y + bounds.diagonal * angle.sin(),
        );
        [origin, end]
    }

    /// Perpendicular distance from `point` to the infinite line. A
    /// zero-length line measures from its single point.
    pub fn distance_to_point(&self, point: Point) -> f64 {
        let Point { x: x0, y: y0 } = point;
        let Point { x: x1, y: y1 } = self.start;
        let Point { x: x2, y: y2 } = self.end;

        let length = (x2 - x1).hypot(y2 - y1);
        if length == 0.0 {
            return self.start.distance(point);
        }
        ((x2 - x1) * (y1 - y0) - (x1 - x0) * (y2 - y1)).abs() / length
    }

    /// Foot of the perpendicular from `point` onto the line.
    pub fn nearest_point_to(&self, point: Point) -> Point {
        let direction = self.end - self.start;
        let length_sq = direction.hypot2();
        if length_sq == 0.0 {
            return self.start;
        }
        let t = (point - self.start).dot(direction) / length_sq;
        self.start + direction * t
    }

    /// The unique point shared with `other`, or `None` for parallel and
    /// coincident lines.
    pub fn intersect_with_line(&self, other: &Line) -> Option<Point> {
        let Point { x: x1, y: y1 } = self.start;
        let Point { x: x2, y: y2 } = self.end;
        let Point { x: x3, y: y3 } = other.start;
        let Point { x: x4, y: y4 } = other.end;

        let d = (x1 - x2) * (y3 - y4) - (y1 - y2) * (x3 - x4);
        if d.abs() < PARALLEL_TOLERANCE || self.is_equal(other) {
            return None;
        }

        let a = x1 * y2 - y1 * x2;
        let b = x3 * y4 - y3 * x4;
        Some(Point::new(
            (a * (x3 - x4) - (x1 - x2) * b) / d,
            (a * (y3 - y4) - (y1 - y2) * b) / d,
        ))
    }

    /// Coincidence test at [`EQUALITY_PRECISION`].
    pub fn is_equal(&self, other: &Line) -> bool {
        self.is_equal_with_precision(other, EQUALITY_PRECISION)
    }

    /// Whether slope and intercept agree once truncated to `precision`
    /// steps per unit.
    pub fn is_equal_with_precision(&self, other: &Line, precision: f64) -> bool {
        let truncate = |v: f64| (v * precision).floor() / precision;
        truncate(self.slope) == truncate(other.slope)
            && truncate(self.intercept) == truncate(other.intercept)
    }
}
