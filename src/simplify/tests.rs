// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2023 lacklustr@protonmail.com https://github.com/eadf
// This file is part of the wallr crate.

use super::*;
use crate::{
    geo::Point,
    walls::{ExtrusionJunction, ExtrusionLine},
};

fn line_from(points: &[(i64, i64, i64)], is_closed: bool) -> ExtrusionLine {
    ExtrusionLine {
        inset_idx: 0,
        is_odd: false,
        is_closed,
        junctions: points
            .iter()
            .map(|&(x, y, w)| ExtrusionJunction {
                p: Point::new(x, y),
                w,
                inset_idx: 0,
            })
            .collect(),
    }
}

#[test]
fn test_collinear_short_segments_collapse() {
    let mut line = line_from(
        &[(0, 0, 400), (100, 0, 400), (200, 0, 400), (10_000, 0, 400)],
        false,
    );
    simplify_line(&mut line, &SimplifyConfig::default());
    assert_eq!(line.junctions.len(), 2);
    assert_eq!(line.junctions[0].p, Point::new(0, 0));
    assert_eq!(line.junctions[1].p, Point::new(10_000, 0));
}

#[test]
fn test_endpoints_are_never_removed() {
    let mut line = line_from(&[(0, 0, 400), (5, 0, 400), (10, 0, 400)], false);
    simplify_line(&mut line, &SimplifyConfig::default());
    assert_eq!(*line.junctions.first().unwrap(), line_from(&[(0, 0, 400)], false).junctions[0]);
    assert_eq!(line.junctions.last().unwrap().p, Point::new(10, 0));
}

#[test]
fn test_large_deviation_is_kept() {
    let mut line = line_from(&[(0, 0, 400), (100, 90, 400), (200, 0, 400)], false);
    simplify_line(&mut line, &SimplifyConfig::default());
    assert_eq!(line.junctions.len(), 3);
}

#[test]
fn test_long_segments_are_kept() {
    let mut line = line_from(&[(0, 0, 400), (5000, 1, 400), (10_000, 0, 400)], false);
    simplify_line(&mut line, &SimplifyConfig::default());
    // both segments exceed the resolution limit, the vertex stays
    assert_eq!(line.junctions.len(), 3);
}

#[test]
fn test_area_deviation_blocks_removal() {
    // collinear, but the middle junction carries a very different width, so
    // removing it would change the extruded area too much
    let mut line = line_from(&[(0, 0, 100), (200, 0, 1500), (400, 0, 100)], false);
    simplify_line(&mut line, &SimplifyConfig::default());
    assert_eq!(line.junctions.len(), 3);
}

#[test]
fn test_closed_line_stays_closed() {
    let mut line = line_from(
        &[
            (0, 0, 400),
            (100, 0, 400),
            (200, 0, 400),
            (200, 200, 400),
            (0, 200, 400),
            (0, 0, 400),
        ],
        true,
    );
    simplify_line(&mut line, &SimplifyConfig::default());
    assert!(line.junctions.len() >= 4);
    assert_eq!(line.junctions.first(), line.junctions.last());
}
