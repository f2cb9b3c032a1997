// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2023 lacklustr@protonmail.com https://github.com/eadf
// This file is part of the wallr crate.

use super::*;
use crate::geo::Polygon;
use std::f64::consts::PI;

fn square_10mm() -> Region {
    Region::from_outline(Polygon::from(vec![
        (0, 0),
        (10_000, 0),
        (10_000, 10_000),
        (0, 10_000),
    ]))
}

#[test]
fn test_import_square() -> Result<(), WallrError> {
    let graph = build_skeleton_graph(&square_10mm(), PI / 3.0, 200, 10)?;
    assert!(graph.live_edge_count() > 0);
    assert!(graph.live_node_count() > 0);
    graph.check_consistency()?;

    // every quad starts on the outline
    for e in graph.edge_ids() {
        let edge = graph.edge(e);
        if edge.prev.is_none() {
            assert_eq!(graph.node(edge.from).distance_to_boundary, 0);
        }
        if edge.next.is_none() {
            assert_eq!(graph.node(edge.to).distance_to_boundary, 0);
        }
    }
    // the center of a 10 mm square is 5 mm from the boundary
    let max_r = graph
        .node_ids()
        .map(|n| graph.node(n).distance_to_boundary)
        .max()
        .unwrap();
    assert!((max_r - 5000).abs() <= 10, "max_r={}", max_r);
    Ok(())
}

#[test]
fn test_import_square_with_hole() -> Result<(), WallrError> {
    let outer = Polygon::from(vec![(0, 0), (10_000, 0), (10_000, 10_000), (0, 10_000)]);
    let hole = Polygon::from(vec![
        (2_000, 2_000),
        (2_000, 8_000),
        (8_000, 8_000),
        (8_000, 2_000),
    ]);
    let region = Region::new(vec![outer, hole]);
    let graph = build_skeleton_graph(&region, PI / 3.0, 200, 10)?;
    graph.check_consistency()?;

    // the ring between outline and hole is 2 mm wide, so the skeleton ridge
    // sits at 1 mm
    let max_r = graph
        .node_ids()
        .map(|n| graph.node(n).distance_to_boundary)
        .max()
        .unwrap();
    assert!((max_r - 1000).abs() <= 10, "max_r={}", max_r);
    Ok(())
}

#[test]
fn test_import_triangle_wedge() -> Result<(), WallrError> {
    let region = Region::from_outline(Polygon::from(vec![
        (0, 0),
        (16_920, 0),
        (16_920, 16_920),
    ]));
    let graph = build_skeleton_graph(&region, PI / 3.0, 200, 10)?;
    graph.check_consistency()?;
    // distances never exceed the inradius
    for n in graph.node_ids() {
        assert!(graph.node(n).distance_to_boundary <= 16_920 / 2);
    }
    Ok(())
}

#[test]
fn test_every_rib_touches_the_outline_once() -> Result<(), WallrError> {
    let graph = build_skeleton_graph(&square_10mm(), PI / 3.0, 200, 10)?;
    for e in graph.edge_ids() {
        let edge = graph.edge(e);
        if edge.kind == EdgeKind::ExtraVd {
            let from_r = graph.node(edge.from).distance_to_boundary;
            let to_r = graph.node(edge.to).distance_to_boundary;
            assert!((from_r == 0) != (to_r == 0));
        }
    }
    Ok(())
}

#[test]
fn test_discretize_parabola_samples_the_arc() {
    let p = Point::new(0, 1000);
    let s0 = Point::new(-10_000, 0);
    let s1 = Point::new(10_000, 0);
    let start = Point::new(-3000, 5000);
    let end = Point::new(3000, 5000);
    let result = discretize_parabola(p, s0, s1, start, end, 200, PI / 3.0, 10);

    assert_eq!(*result.first().unwrap(), start);
    assert_eq!(*result.last().unwrap(), end);
    assert!(result.len() > 10);
    // x advances monotonically
    for w in result.windows(2) {
        assert!(w[0].x < w[1].x, "{:?} -> {:?}", w[0], w[1]);
    }
    // the apex vertex is present
    assert!(result.contains(&Point::new(0, 500)));
    // the breakpoints where the central classification flips sit at
    // ±atan(α/2)·d = ±482 for α = 60°, d = 1000
    assert!(result.iter().any(|pt| (pt.x + 482).abs() <= 1));
    assert!(result.iter().any(|pt| (pt.x - 482).abs() <= 1));
    // all samples are equidistant from point and segment
    for pt in &result {
        let to_line = pt.y as f64;
        let to_p = (((pt.x - p.x) as f64).powi(2) + ((pt.y - p.y) as f64).powi(2)).sqrt();
        assert!(
            (to_line - to_p).abs() < 3.0,
            "sample {:?} not on the parabola",
            pt
        );
    }
}

#[test]
fn test_discretize_parabola_degenerate_focus_on_line() {
    let result = discretize_parabola(
        Point::new(0, 0),
        Point::new(-1000, 0),
        Point::new(1000, 0),
        Point::new(-500, 0),
        Point::new(500, 0),
        200,
        PI / 3.0,
        10,
    );
    assert_eq!(result, vec![Point::new(-500, 0), Point::new(500, 0)]);
}

#[test]
fn test_discretize_point_point_markings() {
    let left = Point::new(0, -500);
    let right = Point::new(0, 500);
    let start = Point::new(-2000, 0);
    let end = Point::new(2000, 0);
    let result = discretize_point_point(left, right, start, end, 200, PI / 3.0);

    assert_eq!(*result.first().unwrap(), start);
    assert_eq!(*result.last().unwrap(), end);
    // breakpoints at ±(d/2)/tan((π−α)/2) = ±288 for α = 60°, d = 1000
    assert!(result.iter().any(|pt| (pt.x + 288).abs() <= 1 && pt.y == 0));
    assert!(result.iter().any(|pt| (pt.x - 288).abs() <= 1 && pt.y == 0));
    // no duplicate consecutive vertices
    for w in result.windows(2) {
        assert_ne!(w[0], w[1]);
    }
}

#[test]
fn test_import_is_deterministic() -> Result<(), WallrError> {
    let a = build_skeleton_graph(&square_10mm(), PI / 3.0, 200, 10)?;
    let b = build_skeleton_graph(&square_10mm(), PI / 3.0, 200, 10)?;
    assert_eq!(a.live_node_count(), b.live_node_count());
    assert_eq!(a.live_edge_count(), b.live_edge_count());
    let points_a: Vec<Point> = a.node_ids().map(|n| a.node(n).p).collect();
    let points_b: Vec<Point> = b.node_ids().map(|n| b.node(n).p).collect();
    assert_eq!(points_a, points_b);
    Ok(())
}
