// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2023 lacklustr@protonmail.com https://github.com/eadf
// This file is part of the wallr crate.

use super::*;
use crate::{
    beading::standard_stack,
    geo::Point,
    graph::{EdgeKind, HalfEdgeGraph},
    walls::{WallConfig, WallSkeleton},
};

/// One central edge rising from radius 100 to radius 500 over 800 µm.
fn rising_edge_skeleton() -> (HalfEdgeGraph, EdgeId, EdgeId) {
    let mut graph = HalfEdgeGraph::default();
    let a = graph.add_node(Point::new(0, 0));
    let b = graph.add_node(Point::new(800, 0));
    graph.node_mut(a).distance_to_boundary = 100;
    graph.node_mut(b).distance_to_boundary = 500;
    graph.node_mut(a).bead_count = 1;
    graph.node_mut(b).bead_count = 3;
    let e = graph.add_edge(a, b, EdgeKind::Normal);
    let t = graph.add_edge(b, a, EdgeKind::Normal);
    graph.set_twins(e, t);
    graph.edge_mut(e).is_central = Some(true);
    graph.edge_mut(t).is_central = Some(true);
    graph.node_mut(a).incident_edge = Some(e);
    graph.node_mut(b).incident_edge = Some(t);
    (graph, e, t)
}

#[test]
fn test_transition_mids_on_a_rising_edge() {
    let cfg = WallConfig::default();
    let strategy = standard_stack(400, 200, 600);
    let (graph, e, t) = rising_edge_skeleton();
    let skeleton = WallSkeleton {
        graph,
        cfg: &cfg,
        strategy: &strategy,
    };
    let mids = skeleton.generate_transition_mids();

    // counts 1 -> 3 cross the thresholds at radius 300 (1 -> 2 beads) and
    // radius 500 (2 -> 3 beads)
    let mids_on_e = &mids[&e];
    assert_eq!(mids_on_e.len(), 2);
    assert_eq!(
        mids_on_e[0],
        TransitionMiddle {
            pos: 400,
            lower_bead_count: 1
        }
    );
    assert_eq!(
        mids_on_e[1],
        TransitionMiddle {
            pos: 800,
            lower_bead_count: 2
        }
    );
    // only the upward half carries the transitions
    assert!(!mids.contains_key(&t));
}

#[test]
fn test_no_mids_without_count_change() {
    let cfg = WallConfig::default();
    let strategy = standard_stack(400, 200, 600);
    let (mut graph, _e, _t) = rising_edge_skeleton();
    for n in graph.node_ids().collect::<Vec<_>>() {
        graph.node_mut(n).bead_count = 2;
    }
    let skeleton = WallSkeleton {
        graph,
        cfg: &cfg,
        strategy: &strategy,
    };
    assert!(skeleton.generate_transition_mids().is_empty());
}

#[test]
fn test_fold_deviation_shrinks_with_the_count() {
    let cfg = WallConfig::default();
    let strategy = standard_stack(400, 200, 600);
    let (graph, _e, _t) = rising_edge_skeleton();
    let skeleton = WallSkeleton {
        graph,
        cfg: &cfg,
        strategy: &strategy,
    };
    // folding a one-bead plateau widens the remaining bead by a lot; folding
    // a five-bead plateau barely changes anything
    assert_eq!(skeleton.fold_deviation(0), 200);
    assert_eq!(skeleton.fold_deviation(1), 300);
    assert_eq!(skeleton.fold_deviation(4), 90);
    assert!(skeleton.fold_deviation(4) < cfg.allowed_filter_deviation);
    assert!(skeleton.fold_deviation(1) > cfg.allowed_filter_deviation);
}
