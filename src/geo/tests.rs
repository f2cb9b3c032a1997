// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2023 lacklustr@protonmail.com https://github.com/eadf
// This file is part of the wallr crate.

use super::*;

#[test]
fn test_vector_ops() {
    let a = Point::new(3, 4);
    assert_eq!(vsize(a), 5);
    assert_eq!(vsize2(a), 25);
    assert_eq!(turn90_ccw(Point::new(1, 0)), Point::new(0, 1));
    assert_eq!(dot(Point::new(2, 3), Point::new(4, 5)), 23);
    assert_eq!(cross(Point::new(1, 0), Point::new(0, 1)), 1);
    assert!(shorter_than(Point::new(3, 4), 6));
    assert!(!shorter_than(Point::new(3, 4), 5));
}

#[test]
fn test_no_overflow_for_large_coordinates() {
    let big = Point::new(2_000_000_000, -2_000_000_000);
    assert_eq!(vsize2(big), 2 * 2_000_000_000i128 * 2_000_000_000i128);
    assert!(vsize(big) > 2_000_000_000);
    let _ = cross(big, -big);
}

#[test]
fn test_closest_on_segment() {
    let a = Point::new(0, 0);
    let b = Point::new(100, 0);
    assert_eq!(closest_on_segment(Point::new(50, 70), a, b), Point::new(50, 0));
    assert_eq!(closest_on_segment(Point::new(-10, 5), a, b), a);
    assert_eq!(closest_on_segment(Point::new(110, 5), a, b), b);
    // degenerate segment
    assert_eq!(closest_on_segment(Point::new(7, 7), a, a), a);
}

#[test]
fn test_dist2_to_segment() {
    let a = Point::new(0, 0);
    let b = Point::new(100, 0);
    assert_eq!(dist2_to_segment(Point::new(50, 30), a, b), 900);
    assert_eq!(dist2_to_segment(Point::new(-30, 40), a, b), 2500);
}

#[test]
fn test_inside_corner() {
    // convex 90° corner of a ccw square at the origin
    let prev = Point::new(0, 100);
    let here = Point::new(0, 0);
    let next = Point::new(100, 0);
    assert!(is_inside_corner(prev, here, next, Point::new(10, 10)));
    assert!(!is_inside_corner(prev, here, next, Point::new(-10, -10)));
    // reflex corner (same geometry walked the other way)
    assert!(is_inside_corner(next, here, prev, Point::new(-10, -10)));
    assert!(is_inside_corner(next, here, prev, Point::new(-10, 10)));
    assert!(!is_inside_corner(next, here, prev, Point::new(10, 10)));
}

#[test]
fn test_polygon_area_and_winding() {
    let square: Polygon = vec![(0, 0), (100, 0), (100, 100), (0, 100)].into();
    assert_eq!(square.area2(), 2 * 100 * 100);
    assert!(square.is_ccw());
    assert_eq!(square.perimeter(), 400);

    let mut rev = square.clone();
    rev.points.reverse();
    assert!(!rev.is_ccw());
}

#[test]
fn test_region_validation() {
    let outer: Polygon = vec![(0, 0), (1000, 0), (1000, 1000), (0, 1000)].into();
    let hole: Polygon = vec![(200, 200), (200, 800), (800, 800), (800, 200)].into();
    let region = Region::new(vec![outer.clone(), hole.clone()]);
    assert!(region.validate().is_ok());

    // winding errors
    let mut bad_outer = outer.clone();
    bad_outer.points.reverse();
    assert!(Region::from_outline(bad_outer).validate().is_err());
    let mut bad_hole = hole;
    bad_hole.points.reverse();
    assert!(Region::new(vec![outer.clone(), bad_hole]).validate().is_err());

    // zero length edge
    let degenerate = Polygon::from(vec![(0, 0), (1000, 0), (1000, 0), (0, 1000)]);
    assert!(Region::from_outline(degenerate).validate().is_err());

    // bow tie
    let bow_tie = Polygon::from(vec![(0, 0), (1000, 1000), (1000, 0), (0, 1000)]);
    assert!(Region::from_outline(bow_tie).validate().is_err());
}

#[test]
fn test_segments_properly_intersect() {
    let a0 = Point::new(0, 0);
    let a1 = Point::new(100, 100);
    assert!(segments_properly_intersect(
        a0,
        a1,
        Point::new(0, 100),
        Point::new(100, 0)
    ));
    // shared endpoint is not a proper intersection
    assert!(!segments_properly_intersect(
        a0,
        a1,
        a1,
        Point::new(200, 0)
    ));
    // disjoint
    assert!(!segments_properly_intersect(
        a0,
        a1,
        Point::new(200, 200),
        Point::new(300, 200)
    ));
}
