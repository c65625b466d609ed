// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2021, stack-graphs authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

//! Storage and traversal engine for the Language Independent Model (LIM).
//!
//! A LIM graph is an abstract semantic graph describing the facts of an analyzed program (its
//! packages, classes, methods, types, calls, files and comments) in a form that does not depend on
//! the source language.  This crate owns the graph substrate: it allocates nodes, stores their
//! typed edges, filters them, walks them and persists them.  Populating a graph from a particular
//! language, and computing metrics over it, is left to the crates that use this one.
//!
//! # Overview
//!
//! All nodes live in a [`Factory`][], which hands out dense [`NodeId`s][`NodeId`] and is the only
//! place where nodes are created or edges are added.  Every node has a [`NodeKind`][] drawn from a
//! closed, single-inheritance kind hierarchy (a `Method` is a `Scope` is a `Member` is a `Named`
//! is a `Base`), and every edge has an [`EdgeKind`][] whose source kind, target kind and
//! associated value are described by a static [edge table][`EdgeKind::descriptor`].
//!
//! Names and other strings are interned in a [`StrTable`][] owned by the factory.  Some node kinds
//! are _singletons_: the factory guarantees that there is at most one `SimpleType` per simple type
//! kind, one `MethodCall` per called method, one `Comment` per comment text, and so on.  Composite
//! `Type` nodes are built from their type formers with a [`TypeBuilder`][].
//!
//! Nodes can be hidden without deleting them using the factory's [`Filter`][].  Filtering a node
//! hides its whole containment subtree.
//!
//! Graphs are walked with [`AlgorithmPreorder`][], which drives any number of [`Visitor`s][`Visitor`]
//! through the graph in a deterministic order.  The same machinery saves graphs to and loads them
//! from the binary format implemented in [`io`][], and builds the [`ReverseEdges`][] index that
//! answers "which nodes point to this one" queries.
//!
//! Override relations between methods are stored outside of the graph proper, in
//! [`OverrideRelations`][], which is persisted as one of the graph file's headers.
//!
//! [`AlgorithmPreorder`]: preorder/struct.AlgorithmPreorder.html
//! [`EdgeKind`]: edges/enum.EdgeKind.html
//! [`EdgeKind::descriptor`]: edges/enum.EdgeKind.html#method.descriptor
//! [`Factory`]: factory/struct.Factory.html
//! [`Filter`]: filter/struct.Filter.html
//! [`NodeId`]: arena/struct.NodeId.html
//! [`NodeKind`]: nodes/enum.NodeKind.html
//! [`OverrideRelations`]: overrides/struct.OverrideRelations.html
//! [`ReverseEdges`]: reverse_edges/struct.ReverseEdges.html
//! [`StrTable`]: strtable/struct.StrTable.html
//! [`TypeBuilder`]: factory/struct.TypeBuilder.html
//! [`Visitor`]: preorder/trait.Visitor.html
//! [`io`]: io/index.html

use thiserror::Error;

pub mod arena;
#[macro_use]
mod debugging;
pub mod edges;
pub mod factory;
pub mod filter;
pub mod io;
pub mod nodes;
pub mod overrides;
pub mod preorder;
pub mod reverse_edges;
pub mod strtable;
pub mod visitors;

use crate::arena::NodeId;
use crate::edges::EdgeKind;
use crate::nodes::NodeKind;
use crate::strtable::StrKey;

/// An error that can occur while building, walking or persisting a LIM graph.
///
/// Every structural error carries the name of the operation that detected it.
#[derive(Debug, Error)]
pub enum LimError {
    #[error("{location}: empty folder name")]
    EmptyFolderName { location: &'static str },
    #[error("{location}: stack is empty")]
    EmptyStack { location: &'static str },
    #[error("filter size ({filter}) does not match the graph size ({graph})")]
    FilterSizeMismatch { filter: usize, graph: usize },
    #[error("{location}: edge {edge:?} cannot start at a node of kind {kind:?}")]
    InvalidEdge {
        location: &'static str,
        edge: EdgeKind,
        kind: NodeKind,
    },
    #[error("{location}: invalid node id ({id})")]
    InvalidNodeId { location: &'static str, id: u32 },
    #[error("{location}: invalid node kind ({kind:?})")]
    InvalidNodeKind {
        location: &'static str,
        kind: NodeKind,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("string table key not found ({0})")]
    KeyNotFound(StrKey),
    #[error("{location}: {message}")]
    Lim {
        location: &'static str,
        message: String,
    },
    #[error("{0} is not implemented")]
    NotImplemented(&'static str),
}

impl LimError {
    pub(crate) fn lim<S: Into<String>>(location: &'static str, message: S) -> LimError {
        LimError::Lim {
            location,
            message: message.into(),
        }
    }

    pub(crate) fn invalid_id(location: &'static str, id: NodeId) -> LimError {
        LimError::InvalidNodeId {
            location,
            id: id.as_u32(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LimError>;
