// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2021, stack-graphs authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

use enumset::EnumSet;
use lim::arena::NodeId;
use lim::edges::EdgeKind;
use lim::factory::Factory;
use lim::nodes::LanguageKind;
use lim::nodes::NodeKind;
use lim::nodes::SimpleTypeKind;
use lim::reverse_edges::ReverseEdges;
use pretty_assertions::assert_eq;

use crate::util::add_member;
use crate::util::create_named;
use crate::util::create_sample_graph;

#[test]
fn can_find_incoming_edges() {
    let mut factory = Factory::new(LanguageKind::Java);
    let sample = create_sample_graph(&mut factory);
    let root = factory.get_root();
    let reverse_edges = factory.reverse_edges(None);
    assert_eq!(
        reverse_edges
            .iter(sample.method, EdgeKind::Scope_HasMember)
            .collect::<Vec<_>>(),
        vec![sample.class]
    );
    let mut users = reverse_edges
        .iter(sample.int_type, EdgeKind::Parameter_HasType)
        .chain(reverse_edges.iter(sample.int_type, EdgeKind::Attribute_HasType))
        .collect::<Vec<_>>();
    users.sort();
    assert_eq!(users, vec![sample.attribute, sample.parameter]);
    assert_eq!(
        reverse_edges.edge_kinds(sample.int_type),
        EdgeKind::Parameter_HasType | EdgeKind::Attribute_HasType
    );
    // The call points back at its method, and the method calls it.
    assert_eq!(
        reverse_edges
            .iter(sample.method, EdgeKind::MethodCall_Method)
            .collect::<Vec<_>>(),
        vec![sample.call]
    );
    assert_eq!(reverse_edges.count(sample.call, EdgeKind::Method_Calls), 1);
    assert_eq!(reverse_edges.count(root, EdgeKind::Scope_HasMember), 0);
    assert!(reverse_edges.edge_kinds(root).is_empty());
}

#[test]
fn selectors_restrict_the_recorded_edge_kinds() {
    let mut factory = Factory::new(LanguageKind::Java);
    let sample = create_sample_graph(&mut factory);
    let selector = Some(EdgeKind::Scope_HasMember | EdgeKind::Method_HasParameter);
    let reverse_edges = factory.reverse_edges(selector);
    assert_eq!(reverse_edges.selector(), selector);
    assert!(reverse_edges.selects(EdgeKind::Scope_HasMember));
    assert!(!reverse_edges.selects(EdgeKind::Method_Calls));
    assert_eq!(reverse_edges.count(sample.method, EdgeKind::Scope_HasMember), 1);
    assert_eq!(reverse_edges.count(sample.parameter, EdgeKind::Method_HasParameter), 1);
    assert_eq!(reverse_edges.count(sample.call, EdgeKind::Method_Calls), 0);
    assert_eq!(reverse_edges.edge_kinds(sample.int_type), EnumSet::new());
    // Every node is known, even without selected incoming edges.
    assert!(reverse_edges.contains(sample.int_type));

    // Asking for a different selector rebuilds the index.
    let reverse_edges = factory.reverse_edges(None);
    assert_eq!(reverse_edges.selector(), None);
    assert_eq!(reverse_edges.count(sample.call, EdgeKind::Method_Calls), 1);
}

#[test]
fn reverse_edges_follow_graph_changes() {
    let mut factory = Factory::new(LanguageKind::Java);
    let sample = create_sample_graph(&mut factory);
    factory.reverse_edges(None);

    let helper = create_named(&mut factory, NodeKind::Method, "helper");
    add_member(&mut factory, sample.class, helper);
    let reverse_edges = factory.cached_reverse_edges().unwrap();
    assert!(reverse_edges.contains(helper));
    assert_eq!(
        reverse_edges
            .iter(helper, EdgeKind::Scope_HasMember)
            .collect::<Vec<_>>(),
        vec![sample.class]
    );

    factory
        .remove_edge(EdgeKind::Scope_HasMember, sample.class, helper)
        .unwrap();
    let reverse_edges = factory.cached_reverse_edges().unwrap();
    assert_eq!(reverse_edges.count(helper, EdgeKind::Scope_HasMember), 0);

    // Replacing a single-valued edge moves the incoming edge.
    let long = factory.create_simple_type(SimpleTypeKind::Long);
    let long_former = factory.create_type_former_type(Some(long)).unwrap();
    let mut builder = factory.begin_type();
    builder.add_type_former(long_former);
    let long_type = factory.end_type(builder).unwrap();
    factory
        .set_edge(EdgeKind::Parameter_HasType, sample.parameter, Some(long_type))
        .unwrap();
    let reverse_edges = factory.cached_reverse_edges().unwrap();
    assert_eq!(reverse_edges.count(sample.int_type, EdgeKind::Parameter_HasType), 0);
    assert_eq!(reverse_edges.count(long_type, EdgeKind::Parameter_HasType), 1);
}

#[test]
fn unknown_nodes_have_no_incoming_edges() {
    let mut factory = Factory::new(LanguageKind::Java);
    create_sample_graph(&mut factory);
    let unknown = NodeId::new(9999).unwrap();
    let reverse_edges = ReverseEdges::build(factory.iter(), None);
    assert!(!reverse_edges.contains(unknown));
    assert!(!reverse_edges.contains(NodeId::new(50).unwrap()));
    assert_eq!(reverse_edges.iter(unknown, EdgeKind::Scope_HasMember).count(), 0);
    assert!(reverse_edges.edge_kinds(unknown).is_empty());
}
