// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2021, stack-graphs authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

use lim::arena::get_is_valid;
use lim::arena::NodeId;
use lim::arena::NodeSet;
use lim::arena::NodeVec;

fn id(value: u32) -> NodeId {
    NodeId::new(value).unwrap()
}

#[test]
fn zero_is_not_a_node_id() {
    assert_eq!(NodeId::new(0), None);
    assert_eq!(NodeId::new(7).map(NodeId::as_u32), Some(7));
}

#[test]
fn reserved_ids_are_invalid() {
    assert!(!get_is_valid(0));
    assert!(!get_is_valid(1));
    assert!(get_is_valid(2));
    assert!(!id(1).is_valid());
    assert!(id(100).is_valid());
}

#[test]
fn can_add_to_node_sets() {
    let mut set = NodeSet::new();
    assert!(set.is_empty());
    assert!(set.add(id(5)));
    assert!(!set.add(id(5)));
    assert!(set.add(id(130)));
    assert!(set.add(id(2)));
    assert!(set.contains(id(5)));
    assert!(!set.contains(id(6)));
    assert!(!set.contains(id(1000)));
    assert_eq!(set.len(), 3);
    assert_eq!(set.iter().collect::<Vec<_>>(), vec![id(2), id(5), id(130)]);
    set.remove(id(5));
    set.remove(id(1000));
    assert_eq!(set.iter().collect::<Vec<_>>(), vec![id(2), id(130)]);
    set.clear();
    assert!(set.is_empty());
}

#[test]
fn can_store_supplemental_node_data() {
    let mut data = NodeVec::new(0u32);
    assert_eq!(data.get(id(3)), None);
    assert_eq!(data[id(3)], 0);
    data[id(3)] = 42;
    assert_eq!(data.get(id(3)), Some(&42));
    assert_eq!(data.get(id(2)), Some(&0));
    assert_eq!(data.len(), 4);
    data.resize(10);
    assert_eq!(data.len(), 10);
    data.fill_with(7);
    assert_eq!(data[id(3)], 7);
    assert_eq!(data[id(9)], 7);
}
