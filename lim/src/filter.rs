// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2021, stack-graphs authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

//! Hides nodes of a graph without deleting them.
//!
//! A [`Filter`][] stores one [`FilterState`][] per node id.  Filtering a node filters its whole
//! containment subtree, and un-filtering a node un-filters the chain of ancestors leading to it,
//! so that a visible node is always reachable from a visible root.
//!
//! The filter is owned by the [`Factory`][], which also decides whether the filter is currently
//! _on_.  While it is off, every node counts as visible, whatever its state.
//!
//! [`Factory`]: ../factory/struct.Factory.html
//! [`Filter`]: struct.Filter.html
//! [`FilterState`]: enum.FilterState.html

use std::io::Read;
use std::io::Write;

use crate::arena::NodeId;
use crate::arena::NodeSet;
use crate::arena::NodeVec;
use crate::io::BinaryReader;
use crate::io::BinaryWriter;
use crate::nodes::Node;
use crate::LimError;
use crate::Result;

const FILTER_MAGIC: &[u8; 4] = b"flt\0";

/// The filter state of a single node.  Ids the filter does not cover have no state at all
/// ([`Filter::get_filter_state`][] returns `None`); they are never reported as filtered.
///
/// [`Filter::get_filter_state`]: struct.Filter.html#method.get_filter_state
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FilterState {
    NotFiltered,
    Filtered,
}

impl FilterState {
    fn as_u8(self) -> u8 {
        self as u8
    }

    fn from_u8(value: u8) -> Option<FilterState> {
        match value {
            0 => Some(FilterState::NotFiltered),
            1 => Some(FilterState::Filtered),
            _ => None,
        }
    }
}

/// Per-node filter states, stored in a flat vector indexed by node id.
#[derive(Clone, Debug)]
pub struct Filter {
    states: NodeVec<FilterState>,
}

impl Filter {
    pub fn new() -> Filter {
        Filter {
            states: NodeVec::new(FilterState::NotFiltered),
        }
    }

    /// Returns the number of node ids covered by this filter.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Grows or shrinks the filter to cover `len` node ids.  New ids are not filtered.
    pub fn resize_to(&mut self, len: usize) {
        self.states.resize(len);
    }

    /// Marks every node as not filtered.
    pub fn initialize_filter(&mut self) {
        self.states.fill_with(FilterState::NotFiltered);
    }

    /// Returns the state of a node, or `None` if the filter does not cover it.
    pub fn get_filter_state(&self, id: NodeId) -> Option<FilterState> {
        self.states.get(id).copied()
    }

    pub fn get_is_filtered(&self, id: NodeId) -> bool {
        self.get_filter_state(id) == Some(FilterState::Filtered)
    }

    /// Sets the state of a single node, growing the filter if needed.
    pub fn set(&mut self, id: NodeId, state: FilterState) {
        self.states[id] = state;
    }

    pub fn set_filtered_this_node_only(&mut self, id: NodeId) {
        self.set(id, FilterState::Filtered);
    }

    pub fn set_not_filtered_this_node_only(&mut self, id: NodeId) {
        self.set(id, FilterState::NotFiltered);
    }

    /// Filters a node and every node reachable from it through containment edges.
    pub fn set_filtered(&mut self, nodes: &[Option<Node>], id: NodeId) -> Result<()> {
        self.set_subtree(nodes, id, FilterState::Filtered, "Filter::set_filtered")
    }

    /// Un-filters a node, every node reachable from it through containment edges, and every
    /// ancestor of it.
    pub fn set_not_filtered(&mut self, nodes: &[Option<Node>], id: NodeId) -> Result<()> {
        let location = "Filter::set_not_filtered";
        self.set_subtree(nodes, id, FilterState::NotFiltered, location)?;
        let mut current = lookup(nodes, id, location)?.parent();
        while let Some(parent) = current {
            self.set_not_filtered_this_node_only(parent);
            current = lookup(nodes, parent, location)?.parent();
        }
        Ok(())
    }

    fn set_subtree(
        &mut self,
        nodes: &[Option<Node>],
        id: NodeId,
        state: FilterState,
        location: &'static str,
    ) -> Result<()> {
        lookup(nodes, id, location)?;
        let mut seen = NodeSet::new();
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            if !seen.add(id) {
                continue;
            }
            self.set(id, state);
            let node = match nodes.get(id.as_usize()).and_then(Option::as_ref) {
                Some(node) => node,
                None => continue,
            };
            stack.extend(
                node.iter_edges()
                    .filter(|edge| edge.kind.is_containment())
                    .map(|edge| edge.target),
            );
        }
        Ok(())
    }

    /// Writes the state of every node id covered by this filter.
    pub fn save<W: Write>(&self, writer: &mut BinaryWriter<W>) -> Result<()> {
        writer.write_bytes(FILTER_MAGIC)?;
        writer.write_u32(self.states.len() as u32)?;
        for (_, state) in self.states.iter() {
            writer.write_u8(state.as_u8())?;
        }
        Ok(())
    }

    /// Reads states written by [`save`][].  The saved filter must cover exactly `graph_size` node
    /// ids; otherwise this filter is left unchanged and an error is returned.
    ///
    /// [`save`]: #method.save
    pub fn load<R: Read>(&mut self, reader: &mut BinaryReader<R>, graph_size: usize) -> Result<()> {
        let magic = reader.read_bytes(FILTER_MAGIC.len())?;
        if magic != FILTER_MAGIC {
            return Err(LimError::lim("Filter::load", "missing filter header"));
        }
        let len = reader.read_u32()? as usize;
        if len != graph_size {
            return Err(LimError::FilterSizeMismatch {
                filter: len,
                graph: graph_size,
            });
        }
        let mut states = NodeVec::new(FilterState::NotFiltered);
        states.resize(len);
        for index in 0..len {
            let value = reader.read_u8()?;
            let state = FilterState::from_u8(value).ok_or_else(|| {
                LimError::lim("Filter::load", format!("invalid filter state ({})", value))
            })?;
            if let Some(id) = NodeId::new(index as u32) {
                states[id] = state;
            }
        }
        self.states = states;
        Ok(())
    }
}

impl Default for Filter {
    fn default() -> Filter {
        Filter::new()
    }
}

fn lookup<'a>(nodes: &'a [Option<Node>], id: NodeId, location: &'static str) -> Result<&'a Node> {
    nodes
        .get(id.as_usize())
        .and_then(Option::as_ref)
        .ok_or_else(|| LimError::invalid_id(location, id))
}
