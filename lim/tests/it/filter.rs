// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2021, stack-graphs authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

use lim::arena::NodeId;
use lim::factory::Factory;
use lim::filter::FilterState;
use lim::nodes::LanguageKind;
use lim::LimError;

use crate::util::create_sample_graph;

#[test]
fn filtering_a_node_filters_its_subtree() {
    let mut factory = Factory::new(LanguageKind::Java);
    let sample = create_sample_graph(&mut factory);
    factory.set_filtered(sample.class).unwrap();
    assert!(factory.get_is_filtered(sample.class));
    assert!(factory.get_is_filtered(sample.method));
    assert!(factory.get_is_filtered(sample.parameter));
    assert!(factory.get_is_filtered(sample.attribute));
    assert!(!factory.get_is_filtered(sample.package));
    assert!(!factory.get_is_filtered(factory.get_root()));
    // Cross edge targets are not part of the subtree.
    assert!(!factory.get_is_filtered(sample.call));
    assert!(!factory.get_is_filtered(sample.int_type));
    assert!(!factory.get_is_filtered(sample.file));
}

#[test]
fn unfiltering_a_node_unfilters_its_ancestors() {
    let mut factory = Factory::new(LanguageKind::Java);
    let sample = create_sample_graph(&mut factory);
    factory.set_filtered(factory.get_root()).unwrap();
    assert!(factory.get_is_filtered(sample.package));

    factory.set_not_filtered(sample.method).unwrap();
    assert!(!factory.get_is_filtered(sample.method));
    assert!(!factory.get_is_filtered(sample.parameter));
    assert!(!factory.get_is_filtered(sample.class));
    assert!(!factory.get_is_filtered(sample.package));
    assert!(!factory.get_is_filtered(factory.get_root()));
    // Siblings stay filtered.
    assert!(factory.get_is_filtered(sample.attribute));
}

#[test]
fn can_filter_single_nodes() {
    let mut factory = Factory::new(LanguageKind::Java);
    let sample = create_sample_graph(&mut factory);
    factory.set_filtered_this_node_only(sample.class).unwrap();
    assert!(factory.get_is_filtered(sample.class));
    assert!(!factory.get_is_filtered(sample.method));

    factory.set_filtered(sample.class).unwrap();
    factory.set_not_filtered_this_node_only(sample.class).unwrap();
    assert!(!factory.get_is_filtered(sample.class));
    assert!(factory.get_is_filtered(sample.method));
    assert!(!factory.get_is_filtered(sample.package));

    assert!(matches!(
        factory.set_filtered_this_node_only(NodeId::new(9999).unwrap()),
        Err(LimError::InvalidNodeId { id: 9999, .. })
    ));
    assert!(factory.set_filtered(NodeId::new(9999).unwrap()).is_err());
}

#[test]
fn turning_the_filter_off_hides_filter_states() {
    let mut factory = Factory::new(LanguageKind::Java);
    let sample = create_sample_graph(&mut factory);
    factory.set_filtered(sample.class).unwrap();

    factory.turn_filter_off();
    assert!(!factory.get_filter_is_on());
    assert!(!factory.get_is_filtered(sample.class));
    // The states themselves are kept.
    assert_eq!(
        factory.get_filter_state(sample.class),
        Some(FilterState::Filtered)
    );
    factory.turn_filter_on();
    assert!(factory.get_is_filtered(sample.class));

    {
        let guard = factory.turn_filter_off_safely();
        assert!(!guard.get_filter_is_on());
        assert!(!guard.get_is_filtered(sample.method));
    }
    assert!(factory.get_filter_is_on());
    assert!(factory.get_is_filtered(sample.method));

    // The guard restores whatever state it found.
    factory.turn_filter_off();
    drop(factory.turn_filter_off_safely());
    assert!(!factory.get_filter_is_on());
}

#[test]
fn can_reset_the_filter() {
    let mut factory = Factory::new(LanguageKind::Java);
    let sample = create_sample_graph(&mut factory);
    factory.set_filtered(factory.get_root()).unwrap();
    factory.initialize_filter();
    assert!(factory.iter().all(|node| !factory.get_is_filtered(node.id())));
    assert_eq!(
        factory.get_filter_state(sample.method),
        Some(FilterState::NotFiltered)
    );
    assert_eq!(factory.filter().len(), factory.size());
}

#[test]
fn nodes_beyond_the_filter_have_no_state() {
    let factory = Factory::new(LanguageKind::Java);
    let beyond = NodeId::new(factory.size() as u32 + 10).unwrap();
    assert_eq!(factory.get_filter_state(beyond), None);
    assert!(!factory.get_is_filtered(beyond));
}

#[test]
fn can_save_and_load_filters() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.flt");

    let mut factory = Factory::new(LanguageKind::Java);
    let sample = create_sample_graph(&mut factory);
    factory.set_filtered(sample.class).unwrap();
    factory.save_filter(&path).unwrap();

    factory.initialize_filter();
    assert!(!factory.get_is_filtered(sample.method));
    factory.load_filter(&path).unwrap();
    assert!(factory.get_is_filtered(sample.class));
    assert!(factory.get_is_filtered(sample.method));
    assert!(factory.get_is_filtered(sample.attribute));
    assert!(!factory.get_is_filtered(sample.package));
}

#[test]
fn filters_only_load_into_graphs_of_the_same_size() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.flt");

    let mut factory = Factory::new(LanguageKind::Java);
    let sample = create_sample_graph(&mut factory);
    factory.save_filter(&path).unwrap();

    factory.create_class_node();
    factory.set_filtered(sample.class).unwrap();
    let result = factory.load_filter(&path);
    assert!(matches!(result, Err(LimError::FilterSizeMismatch { .. })));
    // A failed load leaves the filter alone.
    assert!(factory.get_is_filtered(sample.class));
}
