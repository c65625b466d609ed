// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2021, stack-graphs authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

//! Walks a graph in preorder.
//!
//! [`AlgorithmPreorder`][] visits a node, then each of its edges in the order given by the node's
//! kind, recursing into the targets of containment edges and of any cross edge kinds that you ask
//! it to follow.  Every step is reported to a list of [`Visitor`s][`Visitor`].
//!
//! A run starts either from a root node, or (with no root) from every unfiltered node that has no
//! parent.  Starting from a root, a run can also:
//!
//!   - visit every _special_ node (see [`NodeKind::is_ap_spec`][]) that the walk from the root
//!     didn't reach, since those nodes are shared values rather than part of the containment tree
//!   - collect the targets of cross edges as it goes, and then keep visiting the collected nodes
//!     until no new ones turn up, either for every cross edge (_cross edge tree_ mode) or only for
//!     edges to special nodes (_used only_ mode)
//!
//! In _safe mode_, every node is visited at most once, which makes it safe to follow cross edges
//! on graphs that contain cycles.
//!
//! [`AlgorithmPreorder`]: struct.AlgorithmPreorder.html
//! [`NodeKind::is_ap_spec`]: ../nodes/enum.NodeKind.html#method.is_ap_spec
//! [`Visitor`]: trait.Visitor.html

use std::ops::ControlFlow;

use smallvec::SmallVec;

use crate::arena::NodeId;
use crate::arena::NodeSet;
use crate::edges::Edge;
use crate::edges::EdgeKind;
use crate::edges::EdgeKindSet;
use crate::factory::Factory;
use crate::nodes::Node;
use crate::LimError;
use crate::Result;

//-------------------------------------------------------------------------------------------------
// Visitors

/// Receives the events of a preorder traversal.
///
/// Every method has a default implementation that does nothing, so a visitor only needs to
/// implement the events it cares about.  Returning `ControlFlow::Break` from any event stops this
/// visitor; the traversal as a whole stops once every visitor has stopped.
pub trait Visitor {
    fn visit(&mut self, _node: &Node) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn visit_end(&mut self, _node: &Node) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn visit_edge(&mut self, _edge: &Edge) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn visit_end_edge(&mut self, _edge: &Edge) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    /// Called after a node has been visited, before any of its edges.
    fn inc_depth(&mut self) {}

    /// Called after the last edge of a node, before `visit_end`.
    fn dec_depth(&mut self) {}
}

//-------------------------------------------------------------------------------------------------
// Algorithm

/// A configurable preorder traversal.
#[derive(Clone, Debug)]
pub struct AlgorithmPreorder {
    safe_mode: bool,
    visit_cross_edge_tree: bool,
    traversed_cross_edges: EdgeKindSet,
    visit_filtered_edges: bool,
    visit_special_nodes: bool,
    used_only: bool,
}

impl AlgorithmPreorder {
    pub fn new() -> AlgorithmPreorder {
        AlgorithmPreorder {
            safe_mode: false,
            visit_cross_edge_tree: false,
            traversed_cross_edges: EdgeKindSet::new(),
            visit_filtered_edges: false,
            visit_special_nodes: true,
            used_only: false,
        }
    }

    /// Visits every node at most once.
    pub fn set_safe_mode(&mut self) -> &mut Self {
        self.safe_mode = true;
        self
    }

    pub fn set_unsafe_mode(&mut self) -> &mut Self {
        self.safe_mode = false;
        self
    }

    /// Collects the targets of every cross edge, and visits them once the walk from the root is
    /// done.
    pub fn set_visit_cross_edge_tree(&mut self, enabled: bool) -> &mut Self {
        self.visit_cross_edge_tree = enabled;
        self
    }

    /// Recurses into the targets of edges of the given cross edge kind, as if they were
    /// containment edges.
    pub fn set_cross_edge_to_traversal(&mut self, kind: EdgeKind) -> &mut Self {
        self.traversed_cross_edges.insert(kind);
        self
    }

    /// Suspends filtering for the duration of a run: filtered nodes are visited from every pass,
    /// and edges to them are reported and followed.
    pub fn set_visit_filtered_edges(&mut self, enabled: bool) -> &mut Self {
        self.visit_filtered_edges = enabled;
        self
    }

    /// Controls the visiting of special nodes.  With `used_only`, only the special nodes that
    /// are the targets of cross edges from visited nodes are visited.
    pub fn set_visit_special_nodes(&mut self, enabled: bool, used_only: bool) -> &mut Self {
        self.visit_special_nodes = enabled;
        self.used_only = used_only;
        self
    }

    fn tracks_visited(&self) -> bool {
        self.safe_mode || self.visit_cross_edge_tree || self.visit_special_nodes
    }

    /// Runs the traversal, reporting every event to each visitor in turn.
    pub fn run(
        &self,
        factory: &Factory,
        visitors: &mut [&mut dyn Visitor],
        root: Option<NodeId>,
    ) -> Result<()> {
        if let Some(root) = root {
            if factory.get_ref(root).is_none() {
                return Err(LimError::invalid_id("AlgorithmPreorder::run", root));
            }
        }
        let mut run = Run {
            config: self,
            factory,
            active: (0..visitors.len()).collect(),
            visitors,
            visited: NodeSet::with_len(factory.size()),
            unvisited: NodeSet::new(),
            has_root: root.is_some(),
        };
        // Stopping early is not an error.
        let _ = run.start(root);
        Ok(())
    }

    /// Breadth-first traversal is not supported.
    pub fn breadth_first_visit(
        &self,
        _factory: &Factory,
        _visitors: &mut [&mut dyn Visitor],
        _root: Option<NodeId>,
    ) -> Result<()> {
        Err(LimError::NotImplemented(
            "AlgorithmPreorder::breadth_first_visit",
        ))
    }
}

impl Default for AlgorithmPreorder {
    fn default() -> AlgorithmPreorder {
        AlgorithmPreorder::new()
    }
}

struct Run<'a, 'v> {
    config: &'a AlgorithmPreorder,
    factory: &'a Factory,
    visitors: &'a mut [&'v mut dyn Visitor],
    active: SmallVec<[usize; 8]>,
    visited: NodeSet,
    unvisited: NodeSet,
    has_root: bool,
}

impl<'a, 'v> Run<'a, 'v> {
    fn start(&mut self, root: Option<NodeId>) -> ControlFlow<()> {
        if self.active.is_empty() {
            return ControlFlow::Break(());
        }
        let factory = self.factory;
        let root = match root {
            Some(root) => root,
            None => {
                for node in factory.iter() {
                    if node.parent().is_none() && !self.is_filtered(node.id()) {
                        self.visit_node(node)?;
                    }
                }
                return ControlFlow::Continue(());
            }
        };

        if let Some(node) = factory.get_ref(root) {
            self.visit_node(node)?;
        }

        if self.config.visit_special_nodes && !self.config.used_only {
            for node in factory.iter() {
                if node.is_ap_spec()
                    && !self.is_filtered(node.id())
                    && !self.visited.contains(node.id())
                {
                    self.visit_node(node)?;
                }
            }
        }

        if self.config.visit_cross_edge_tree || self.config.used_only {
            while !self.unvisited.is_empty() {
                let pending = self.unvisited.iter().collect::<Vec<_>>();
                for id in pending {
                    self.unvisited.remove(id);
                    if self.visited.contains(id) || self.is_filtered(id) {
                        continue;
                    }
                    if let Some(node) = factory.get_ref(id) {
                        self.visit_node(node)?;
                    }
                }
            }
        }
        ControlFlow::Continue(())
    }

    fn visit_node(&mut self, node: &'a Node) -> ControlFlow<()> {
        let id = node.id();
        if self.config.tracks_visited() {
            if self.config.safe_mode && self.visited.contains(id) {
                return ControlFlow::Continue(());
            }
            self.visited.add(id);
        }
        copious_debugging!("visit {} {:?}", id, node.kind());

        self.dispatch(|visitor| {
            let flow = visitor.visit(node);
            if flow.is_continue() {
                visitor.inc_depth();
            }
            flow
        })?;

        for edge in node.iter_edges() {
            let target = edge.target;
            if self.is_filtered(target) {
                continue;
            }
            let target_node = match self.factory.get_ref(target) {
                Some(target_node) => target_node,
                None => continue,
            };
            let is_special = target_node.is_ap_spec();

            let recurse = if edge.kind.is_containment() {
                if self.has_root && self.config.used_only && is_special {
                    self.mark_unvisited(target);
                    false
                } else {
                    true
                }
            } else {
                if self.has_root
                    && (self.config.visit_cross_edge_tree || (self.config.used_only && is_special))
                {
                    self.mark_unvisited(target);
                }
                self.config.traversed_cross_edges.contains(edge.kind)
            };

            copious_debugging!(" edge {:?} {} -> {}", edge.kind, id, target);
            self.dispatch(|visitor| visitor.visit_edge(&edge))?;
            if recurse {
                self.visit_node(target_node)?;
            }
            self.dispatch(|visitor| visitor.visit_end_edge(&edge))?;
        }

        self.dispatch(|visitor| {
            visitor.dec_depth();
            visitor.visit_end(node)
        })
    }

    // Filtering is suspended for the whole run when filtered edges are visited.
    fn is_filtered(&self, id: NodeId) -> bool {
        !self.config.visit_filtered_edges && self.factory.get_is_filtered(id)
    }

    fn mark_unvisited(&mut self, id: NodeId) {
        if !self.visited.contains(id) {
            self.unvisited.add(id);
        }
    }

    /// Sends an event to every active visitor, and drops the visitors that stop.  Breaks once no
    /// active visitor remains.
    fn dispatch<F>(&mut self, mut event: F) -> ControlFlow<()>
    where
        F: FnMut(&mut dyn Visitor) -> ControlFlow<()>,
    {
        let visitors = &mut *self.visitors;
        self.active
            .retain(|index| event(&mut *visitors[*index]).is_continue());
        if self.active.is_empty() {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }
}
