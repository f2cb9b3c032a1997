// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2023 lacklustr@protonmail.com https://github.com/eadf
// This file is part of the wallr crate.

use super::*;

/// A star of `spokes` bidirectional edges around one center node, wired so
/// that `e = e.twin.next` enumerates the outgoing edges of the center.
fn build_fan(center_r: Coord, spoke_r: Coord, spokes: usize) -> (HalfEdgeGraph, NodeId, Vec<EdgeId>) {
    let mut graph = HalfEdgeGraph::default();
    let center = graph.add_node(Point::new(0, 0));
    graph.node_mut(center).distance_to_boundary = center_r;

    let mut outgoing = Vec::new();
    let mut incoming = Vec::new();
    for i in 0..spokes {
        let p = Point::new(100 * (i as Coord + 1), 100);
        let tip = graph.add_node(p);
        graph.node_mut(tip).distance_to_boundary = spoke_r;
        let out = graph.add_edge(center, tip, EdgeKind::Normal);
        let back = graph.add_edge(tip, center, EdgeKind::Normal);
        graph.set_twins(out, back);
        graph.node_mut(tip).incident_edge = Some(back);
        outgoing.push(out);
        incoming.push(back);
    }
    for i in 0..spokes {
        let next_out = outgoing[(i + 1) % spokes];
        graph.edge_mut(incoming[i]).next = Some(next_out);
        graph.edge_mut(next_out).prev = Some(incoming[i]);
    }
    graph.node_mut(center).incident_edge = Some(outgoing[0]);
    (graph, center, outgoing)
}

#[test]
fn test_arena_basics() {
    let mut graph = HalfEdgeGraph::with_capacity(4, 4);
    let a = graph.add_node(Point::new(0, 0));
    let b = graph.add_node(Point::new(30, 40));
    let e = graph.add_edge(a, b, EdgeKind::Normal);
    assert_eq!(graph.edge_length(e), 50);
    assert_eq!(graph.live_node_count(), 2);
    assert_eq!(graph.live_edge_count(), 1);

    graph.kill_edge(e);
    assert!(!graph.is_live_edge(e));
    assert_eq!(graph.live_edge_count(), 0);
    // indices stay stable after a kill
    let c = graph.add_node(Point::new(7, 7));
    assert_eq!(graph.node(b).p, Point::new(30, 40));
    assert_eq!(graph.node(c).p, Point::new(7, 7));
}

#[test]
fn test_outgoing_edges_enumerates_the_fan() {
    let (graph, center, outgoing) = build_fan(100, 100, 4);
    let enumerated = graph.outgoing_edges(center);
    assert_eq!(enumerated.len(), 4);
    for e in &outgoing {
        assert!(enumerated.contains(e));
    }
    assert!(graph.check_consistency().is_ok());
}

#[test]
fn test_make_rib() {
    let mut graph = HalfEdgeGraph::default();
    let o = graph.add_node(Point::new(0, 0));
    graph.node_mut(o).distance_to_boundary = 0;
    let a = graph.add_node(Point::new(40, 100));
    let e = graph.add_edge(o, a, EdgeKind::Normal);
    graph.node_mut(o).incident_edge = Some(e);

    let mut prev_edge = e;
    graph.make_rib(&mut prev_edge, Point::new(-1000, 0), Point::new(1000, 0));

    // the skeleton node got its distance and a perpendicular outline foot
    assert_eq!(graph.node(a).distance_to_boundary, 100);
    let back = prev_edge;
    let back_edge = graph.edge(back);
    assert_eq!(back_edge.kind, EdgeKind::ExtraVd);
    assert_eq!(back_edge.to, a);
    let foot = graph.edge(back).from;
    assert_eq!(graph.node(foot).p, Point::new(40, 0));
    assert_eq!(graph.node(foot).distance_to_boundary, 0);
    // forth and back are twins and chained after the input edge
    let forth = graph.edge(back).twin.unwrap();
    assert_eq!(graph.edge(forth).prev, Some(e));
    assert_eq!(graph.edge(e).next, Some(forth));
    assert_eq!(graph.edge(forth).twin, Some(back));
}

#[test]
fn test_is_upward_prefers_higher_distance() {
    let (graph, _center, outgoing) = build_fan(100, 300, 3);
    for e in &outgoing {
        assert!(graph.is_upward(*e, TieBreak::default()));
        let twin = graph.edge(*e).twin.unwrap();
        assert!(!graph.is_upward(twin, TieBreak::default()));
    }
}

#[test]
fn test_is_upward_tie_break_is_antisymmetric() {
    // all nodes equidistant, the decision falls through to the tie break
    let (graph, _center, outgoing) = build_fan(200, 200, 3);
    for tie in [TieBreak::PreferInner, TieBreak::PreferOuter] {
        for e in &outgoing {
            let twin = graph.edge(*e).twin.unwrap();
            assert_ne!(graph.is_upward(*e, tie), graph.is_upward(twin, tie));
        }
    }
}

#[test]
fn test_local_maximum() {
    let (graph, center, _outgoing) = build_fan(300, 100, 4);
    assert!(graph.is_local_maximum(center, false));
    let (graph, center, _outgoing) = build_fan(100, 300, 4);
    assert!(!graph.is_local_maximum(center, false));
    // outline nodes are never local maxima
    let (mut graph, center, _outgoing) = build_fan(300, 100, 4);
    graph.node_mut(center).distance_to_boundary = 0;
    assert!(!graph.is_local_maximum(center, false));
}

#[test]
fn test_check_consistency_detects_broken_twins() {
    let (mut graph, center, outgoing) = build_fan(100, 100, 3);
    let _ = center;
    graph.edge_mut(outgoing[0]).twin = None;
    assert!(matches!(
        graph.check_consistency(),
        Err(WallrError::GraphInconsistency(_))
    ));
}

#[test]
fn test_check_consistency_detects_bad_rib() {
    let mut graph = HalfEdgeGraph::default();
    let a = graph.add_node(Point::new(0, 0));
    let b = graph.add_node(Point::new(100, 0));
    graph.node_mut(a).distance_to_boundary = 50;
    graph.node_mut(b).distance_to_boundary = 50;
    let e = graph.add_edge(a, b, EdgeKind::ExtraVd);
    let t = graph.add_edge(b, a, EdgeKind::ExtraVd);
    graph.set_twins(e, t);
    // a rib must touch the outline
    assert!(matches!(
        graph.check_consistency(),
        Err(WallrError::GraphInconsistency(_))
    ));
}
