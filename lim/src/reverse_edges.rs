// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2021, stack-graphs authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

//! An index of incoming edges.
//!
//! Edges are stored with their source node, so "which nodes point to this one" cannot be answered
//! from the graph itself.  A [`ReverseEdges`][] index answers it, for the edge kinds picked by its
//! _selector_.  The [`Factory`][] builds the index on demand, caches it, and keeps the cached
//! index up to date as nodes and edges are added.
//!
//! [`Factory`]: ../factory/struct.Factory.html
//! [`ReverseEdges`]: struct.ReverseEdges.html

use either::Either;

use crate::arena::NodeId;
use crate::arena::NodeVec;
use crate::edges::EdgeKind;
use crate::edges::EdgeKindSet;
use crate::nodes::Node;

/// Picks the edge kinds recorded by a reverse edge index.  `None` records every kind.
pub type EdgeSelector = Option<EdgeKindSet>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct IncomingEdge {
    kind: EdgeKind,
    source: NodeId,
}

/// The incoming edges of every node, for a selection of edge kinds.
#[derive(Clone, Debug)]
pub struct ReverseEdges {
    selector: EdgeSelector,
    // `None` for ids that don't hold a node
    incoming: NodeVec<Option<Vec<IncomingEdge>>>,
}

impl ReverseEdges {
    /// Builds the index with a single scan over the forward edges of `nodes`.
    pub fn build<'a, I>(nodes: I, selector: EdgeSelector) -> ReverseEdges
    where
        I: IntoIterator<Item = &'a Node>,
    {
        let mut result = ReverseEdges {
            selector,
            incoming: NodeVec::new(None),
        };
        let nodes = nodes.into_iter().collect::<Vec<_>>();
        for node in &nodes {
            result.insert_node(node.id());
        }
        for node in &nodes {
            for edge in node.iter_edges() {
                result.insert_edge(edge.kind, edge.source, edge.target);
            }
        }
        result
    }

    pub fn selector(&self) -> EdgeSelector {
        self.selector
    }

    /// Returns whether edges of the given kind are recorded.
    pub fn selects(&self, kind: EdgeKind) -> bool {
        self.selector.map(|set| set.contains(kind)).unwrap_or(true)
    }

    /// Registers a node with no incoming edges.
    pub(crate) fn insert_node(&mut self, id: NodeId) {
        let entry = self.incoming.get_mut_or_fill(id);
        if entry.is_none() {
            *entry = Some(Vec::new());
        }
    }

    pub(crate) fn insert_edge(&mut self, kind: EdgeKind, source: NodeId, target: NodeId) {
        if !self.selects(kind) {
            return;
        }
        self.incoming
            .get_mut_or_fill(target)
            .get_or_insert_with(Vec::new)
            .push(IncomingEdge { kind, source });
    }

    pub(crate) fn remove_edge(&mut self, kind: EdgeKind, source: NodeId, target: NodeId) {
        if !self.contains(target) {
            return;
        }
        if let Some(incoming) = self.incoming.get_mut_or_fill(target) {
            if let Some(index) = incoming
                .iter()
                .position(|edge| edge.kind == kind && edge.source == source)
            {
                incoming.remove(index);
            }
        }
    }

    /// Returns whether the index knows about a node.
    pub fn contains(&self, id: NodeId) -> bool {
        matches!(self.incoming.get(id), Some(Some(_)))
    }

    /// Returns the sources of every edge of the given kind that points to `target`, in the order
    /// the edges were recorded.  Unknown nodes have no incoming edges.
    pub fn iter(&self, target: NodeId, kind: EdgeKind) -> impl Iterator<Item = NodeId> + '_ {
        match self.incoming.get(target) {
            Some(Some(incoming)) => Either::Left(
                incoming
                    .iter()
                    .filter(move |edge| edge.kind == kind)
                    .map(|edge| edge.source),
            ),
            _ => Either::Right(std::iter::empty()),
        }
    }

    /// Returns the number of edges of the given kind that point to `target`.
    pub fn count(&self, target: NodeId, kind: EdgeKind) -> usize {
        self.iter(target, kind).count()
    }

    /// Returns every edge kind with at least one edge pointing to `target`, in declaration order.
    pub fn edge_kinds(&self, target: NodeId) -> EdgeKindSet {
        match self.incoming.get(target) {
            Some(Some(incoming)) => incoming.iter().map(|edge| edge.kind).collect(),
            _ => EdgeKindSet::new(),
        }
    }
}
