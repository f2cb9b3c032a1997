// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2023 lacklustr@protonmail.com https://github.com/eadf
// This file is part of the wallr crate.

use super::*;

fn junction(x: i64, y: i64, w: i64, inset_idx: usize) -> ExtrusionJunction {
    ExtrusionJunction {
        p: Point::new(x, y),
        w,
        inset_idx,
    }
}

fn segment(from: ExtrusionJunction, to: ExtrusionJunction) -> Segment {
    Segment {
        from,
        to,
        is_odd: false,
    }
}

#[test]
fn test_stitch_closes_a_square_loop() {
    let corners = [
        junction(0, 0, 400, 0),
        junction(1000, 0, 400, 0),
        junction(1000, 1000, 400, 0),
        junction(0, 1000, 400, 0),
    ];
    let segments = vec![
        segment(corners[0], corners[1]),
        segment(corners[1], corners[2]),
        segment(corners[2], corners[3]),
        segment(corners[3], corners[0]),
    ];
    let lines = stitch_segments(segments, 10);
    assert_eq!(lines.len(), 1);
    let line = &lines[0];
    assert!(line.is_closed);
    assert!(!line.is_odd);
    assert_eq!(line.junctions.first(), line.junctions.last());
    // four distinct corners plus the closing junction
    assert_eq!(line.junctions.len(), 5);
}

#[test]
fn test_stitch_connects_within_snap_distance() {
    // endpoints jittered by a few µm still chain up
    let segments = vec![
        segment(junction(0, 0, 400, 0), junction(1000, 2, 400, 0)),
        segment(junction(1003, 0, 400, 0), junction(2000, 0, 400, 0)),
    ];
    let lines = stitch_segments(segments, 10);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].junctions.len(), 3);
    assert!(!lines[0].is_closed);
}

#[test]
fn test_stitch_separates_insets_and_oddness() {
    let segments = vec![
        segment(junction(0, 0, 400, 0), junction(1000, 0, 400, 0)),
        segment(junction(0, 100, 400, 1), junction(1000, 100, 400, 1)),
        Segment {
            from: junction(0, 200, 400, 1),
            to: junction(1000, 200, 400, 1),
            is_odd: true,
        },
    ];
    let lines = stitch_segments(segments, 10);
    assert_eq!(lines.len(), 3);
    assert!(lines.iter().any(|l| l.inset_idx == 0 && !l.is_odd));
    assert!(lines.iter().any(|l| l.inset_idx == 1 && !l.is_odd));
    assert!(lines.iter().any(|l| l.inset_idx == 1 && l.is_odd));
}

#[test]
fn test_stitch_is_deterministic() {
    let make = || {
        vec![
            segment(junction(0, 0, 400, 0), junction(500, 0, 400, 0)),
            segment(junction(500, 0, 400, 0), junction(1000, 0, 400, 0)),
            segment(junction(2000, 0, 400, 0), junction(3000, 0, 400, 0)),
        ]
    };
    let a = stitch_segments(make(), 10);
    let b = stitch_segments(make(), 10);
    assert_eq!(a.len(), b.len());
    for (la, lb) in a.iter().zip(b.iter()) {
        assert_eq!(la.junctions, lb.junctions);
        assert_eq!(la.is_closed, lb.is_closed);
    }
}

#[test]
fn test_shorten_line_end() {
    let mut line = ExtrusionLine {
        inset_idx: 0,
        is_odd: true,
        is_closed: false,
        junctions: vec![
            junction(0, 0, 400, 0),
            junction(1000, 0, 400, 0),
            junction(2000, 0, 200, 0),
        ],
    };
    shorten_line_end(&mut line, false, 500, 10);
    assert_eq!(line.junctions.len(), 3);
    let last = line.junctions.last().unwrap();
    assert_eq!(last.p, Point::new(1500, 0));
    // the width interpolates toward the cut
    assert_eq!(last.w, 300);
    // the head is untouched
    assert_eq!(line.junctions[0].p, Point::new(0, 0));
}

#[test]
fn test_reduce_overlaps_trims_an_odd_line_inside_a_loop() {
    let loop_line = ExtrusionLine {
        inset_idx: 0,
        is_odd: false,
        is_closed: true,
        junctions: vec![
            junction(0, -2000, 400, 0),
            junction(0, 2000, 400, 0),
            junction(4000, 2000, 400, 0),
            junction(4000, -2000, 400, 0),
            junction(0, -2000, 400, 0),
        ],
    };
    let odd_line = ExtrusionLine {
        inset_idx: 0,
        is_odd: true,
        is_closed: false,
        junctions: vec![junction(5000, 0, 400, 0), junction(100, 0, 400, 0)],
    };
    let untrimmed_length = odd_line.length();
    let mut lines = vec![loop_line.clone(), odd_line];
    reduce_overlaps(&mut lines, 0.25, 10);
    // the odd line's tail pokes into the loop wall and gets shortened
    assert!(lines[1].length() < untrimmed_length);
    // the loop itself is untouched
    assert_eq!(lines[0].junctions, loop_line.junctions);
}
