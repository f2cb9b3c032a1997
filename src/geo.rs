// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2023 lacklustr@protonmail.com https://github.com/eadf
// This file is part of the wallr crate.

//! Integer 2D geometry primitives.
//!
//! All coordinates are signed integers in micrometers. Predicates that square
//! or multiply coordinates are evaluated in `i128` so that inputs up to
//! ±2^31 µm never overflow.

#[cfg(test)]
mod tests;

use crate::WallrError;

/// One micrometer per unit.
pub type Coord = i64;

/// An integer 2D coordinate.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Point {
    pub x: Coord,
    pub y: Coord,
}

impl Point {
    #[inline(always)]
    pub const fn new(x: Coord, y: Coord) -> Self {
        Self { x, y }
    }
}

impl std::ops::Add for Point {
    type Output = Point;
    #[inline(always)]
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Point {
    type Output = Point;
    #[inline(always)]
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Neg for Point {
    type Output = Point;
    #[inline(always)]
    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

impl std::ops::Mul<Coord> for Point {
    type Output = Point;
    #[inline(always)]
    fn mul(self, rhs: Coord) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl std::ops::Div<Coord> for Point {
    type Output = Point;
    #[inline(always)]
    fn div(self, rhs: Coord) -> Point {
        Point::new(self.x / rhs, self.y / rhs)
    }
}

/// Dot product, widened so coordinates up to ±2^31 cannot overflow.
#[inline(always)]
pub fn dot(a: Point, b: Point) -> i128 {
    a.x as i128 * b.x as i128 + a.y as i128 * b.y as i128
}

/// Z component of the cross product, widened.
#[inline(always)]
pub fn cross(a: Point, b: Point) -> i128 {
    a.x as i128 * b.y as i128 - a.y as i128 * b.x as i128
}

/// Squared length of the vector, widened.
#[inline(always)]
pub fn vsize2(a: Point) -> i128 {
    dot(a, a)
}

/// Length of the vector, rounded to the nearest integer.
#[inline(always)]
pub fn vsize(a: Point) -> Coord {
    (vsize2(a) as f64).sqrt().round() as Coord
}

/// `|a| < b`, avoiding the square root.
#[inline(always)]
pub fn shorter_than(a: Point, b: Coord) -> bool {
    if a.x.abs() >= b || a.y.abs() >= b {
        return false;
    }
    vsize2(a) < b as i128 * b as i128
}

/// Rotate 90° counter-clockwise.
#[inline(always)]
pub fn turn90_ccw(a: Point) -> Point {
    Point::new(-a.y, a.x)
}

/// Division that rounds to the nearest integer instead of toward zero.
#[inline(always)]
fn round_div(a: i128, b: i128) -> i128 {
    debug_assert!(b > 0);
    if a >= 0 { (a + b / 2) / b } else { (a - b / 2) / b }
}

/// Interpolate between `a` and `b` at the ratio `num / den`, widened so
/// large coordinates cannot overflow.
pub fn lerp(a: Point, b: Point, num: Coord, den: Coord) -> Point {
    debug_assert!(den > 0);
    Point::new(
        a.x + round_div((b.x - a.x) as i128 * num as i128, den as i128) as Coord,
        a.y + round_div((b.y - a.y) as i128 * num as i128, den as i128) as Coord,
    )
}

/// The point on the infinite line through `a` and `b` closest to `p`.
pub fn closest_on_line(p: Point, a: Point, b: Point) -> Point {
    let ab = b - a;
    let ab2 = vsize2(ab);
    if ab2 == 0 {
        return a;
    }
    let t = dot(p - a, ab);
    Point::new(
        a.x + round_div(ab.x as i128 * t, ab2) as Coord,
        a.y + round_div(ab.y as i128 * t, ab2) as Coord,
    )
}

/// The point on segment `a`..`b` closest to `p`.
pub fn closest_on_segment(p: Point, a: Point, b: Point) -> Point {
    let ab = b - a;
    let ab2 = vsize2(ab);
    if ab2 == 0 {
        return a;
    }
    let ap = p - a;
    let t = dot(ap, ab).clamp(0, ab2);
    Point::new(
        a.x + round_div(ab.x as i128 * t, ab2) as Coord,
        a.y + round_div(ab.y as i128 * t, ab2) as Coord,
    )
}

/// Squared distance from `p` to segment `a`..`b`, widened.
pub fn dist2_to_segment(p: Point, a: Point, b: Point) -> i128 {
    let x = closest_on_segment(p, a, b);
    vsize2(p - x)
}

/// Whether `query` lies inside the corner formed at `here` between the
/// incoming edge `prev`..`here` and the outgoing edge `here`..`next` of a
/// counter-clockwise polygon (interior on the left).
pub fn is_inside_corner(prev: Point, here: Point, next: Point, query: Point) -> bool {
    let in_dir = here - prev;
    let out_dir = next - here;
    let q = query - here;
    let left_of_in = cross(in_dir, q) > 0;
    let left_of_out = cross(out_dir, q) > 0;
    if cross(in_dir, out_dir) >= 0 {
        // convex corner: the interior wedge is the intersection of both half planes
        left_of_in && left_of_out
    } else {
        // reflex corner: the interior wedge is the union
        left_of_in || left_of_out
    }
}

/// A closed loop of integer points. The closing edge from the last point back
/// to the first is implicit.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Polygon {
    pub points: Vec<Point>,
}

impl Polygon {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Twice the signed area; positive for counter-clockwise winding.
    pub fn area2(&self) -> i128 {
        let mut sum = 0i128;
        for i in 0..self.points.len() {
            let a = self.points[i];
            let b = self.points[(i + 1) % self.points.len()];
            sum += cross(a, b);
        }
        sum
    }

    #[inline(always)]
    pub fn is_ccw(&self) -> bool {
        self.area2() > 0
    }

    /// Total circumference.
    pub fn perimeter(&self) -> Coord {
        let mut sum = 0;
        for i in 0..self.points.len() {
            let a = self.points[i];
            let b = self.points[(i + 1) % self.points.len()];
            sum += vsize(b - a);
        }
        sum
    }
}

impl From<Vec<(Coord, Coord)>> for Polygon {
    fn from(points: Vec<(Coord, Coord)>) -> Self {
        Self::new(points.into_iter().map(|(x, y)| Point::new(x, y)).collect())
    }
}

/// A multiply connected 2D domain: one outer loop (counter-clockwise)
/// followed by any number of hole loops (clockwise).
#[derive(Debug, Default, Clone)]
pub struct Region {
    pub polygons: Vec<Polygon>,
}

impl Region {
    pub fn new(polygons: Vec<Polygon>) -> Self {
        Self { polygons }
    }

    pub fn from_outline(outline: Polygon) -> Self {
        Self {
            polygons: vec![outline],
        }
    }

    /// Number of vertices over all loops.
    pub fn vertex_count(&self) -> usize {
        self.polygons.iter().map(|p| p.len()).sum()
    }

    /// Signed doubled area of the whole region (holes subtract).
    pub fn area2(&self) -> i128 {
        self.polygons.iter().map(|p| p.area2()).sum()
    }

    /// Reject regions the wall generator cannot process: degenerate loops,
    /// zero length edges, wrong winding or self intersections.
    pub fn validate(&self) -> Result<(), WallrError> {
        if self.polygons.is_empty() {
            return Err(WallrError::InvalidInput("empty region".to_string()));
        }
        for (poly_idx, poly) in self.polygons.iter().enumerate() {
            if poly.len() < 3 {
                return Err(WallrError::InvalidInput(format!(
                    "polygon {} has fewer than 3 vertices",
                    poly_idx
                )));
            }
            for i in 0..poly.len() {
                let a = poly.points[i];
                let b = poly.points[(i + 1) % poly.len()];
                if a == b {
                    return Err(WallrError::InvalidInput(format!(
                        "polygon {} has a zero length edge at vertex {}",
                        poly_idx, i
                    )));
                }
            }
            let ccw = poly.is_ccw();
            if poly_idx == 0 && !ccw {
                return Err(WallrError::InvalidInput(
                    "outer polygon must be counter-clockwise".to_string(),
                ));
            }
            if poly_idx > 0 && ccw {
                return Err(WallrError::InvalidInput(format!(
                    "hole polygon {} must be clockwise",
                    poly_idx
                )));
            }
        }
        self.check_simple()
    }

    /// Best-effort simplicity test: no two non-adjacent edges of the region
    /// may properly intersect.
    fn check_simple(&self) -> Result<(), WallrError> {
        let mut segments = Vec::with_capacity(self.vertex_count());
        for (poly_idx, poly) in self.polygons.iter().enumerate() {
            for i in 0..poly.len() {
                let a = poly.points[i];
                let b = poly.points[(i + 1) % poly.len()];
                segments.push((poly_idx, i, a, b));
            }
        }
        for (si, &(pa, ia, a0, a1)) in segments.iter().enumerate() {
            for &(pb, ib, b0, b1) in segments.iter().skip(si + 1) {
                if pa == pb {
                    let n = self.polygons[pa].len();
                    let adjacent = (ia + 1) % n == ib || (ib + 1) % n == ia;
                    if adjacent {
                        continue;
                    }
                }
                if segments_properly_intersect(a0, a1, b0, b1) {
                    return Err(WallrError::InvalidInput(format!(
                        "self intersection between edge {} of polygon {} and edge {} of polygon {}",
                        ia, pa, ib, pb
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Proper (interior) intersection of two segments. Shared endpoints and
/// collinear touching do not count.
fn segments_properly_intersect(a0: Point, a1: Point, b0: Point, b1: Point) -> bool {
    // quick aabb reject
    if a0.x.max(a1.x) < b0.x.min(b1.x)
        || b0.x.max(b1.x) < a0.x.min(a1.x)
        || a0.y.max(a1.y) < b0.y.min(b1.y)
        || b0.y.max(b1.y) < a0.y.min(a1.y)
    {
        return false;
    }
    let d1 = cross(a1 - a0, b0 - a0);
    let d2 = cross(a1 - a0, b1 - a0);
    let d3 = cross(b1 - b0, a0 - b0);
    let d4 = cross(b1 - b0, a1 - b0);
    ((d1 > 0 && d2 < 0) || (d1 < 0 && d2 > 0)) && ((d3 > 0 && d4 < 0) || (d3 < 0 && d4 > 0))
}
