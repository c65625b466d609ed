// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2021, stack-graphs authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

//! Dense id-indexed storage for graph data.
//!
//! Every node of a LIM graph is identified by a dense integer id.  The [`Factory`][] owns a single
//! vector of nodes indexed by that id, and every derived structure (visited sets, filter states,
//! reverse edges) is likewise a flat vector indexed by the same id.  Ids `0` and `1` are reserved,
//! and the container may contain deliberate holes: ids that were never assigned a node.
//!
//! This module provides the small set of building blocks that all of those structures share:
//!
//!   - [`NodeId`][], a non-zero node identifier that packs into a single `u32` even when wrapped
//!     in an `Option` or a [`ControlledOption`][]
//!   - [`NodeSet`][], a set of node ids encoded as a bit set
//!   - [`NodeVec<T>`][`NodeVec`], supplemental data keyed by node id that grows on demand
//!
//! [`ControlledOption`]: https://docs.rs/controlled-option/
//! [`Factory`]: ../factory/struct.Factory.html
//! [`NodeId`]: struct.NodeId.html
//! [`NodeSet`]: struct.NodeSet.html
//! [`NodeVec`]: struct.NodeVec.html

use std::fmt::Debug;
use std::fmt::Display;
use std::num::NonZeroU32;
use std::ops::Index;
use std::ops::IndexMut;

use bitvec::vec::BitVec;
use controlled_option::Niche;

//-------------------------------------------------------------------------------------------------
// Node ids

/// The identifier of a node in a LIM graph.
///
/// Ids are dense and stable for the lifetime of the graph.  The value `0` is used on the wire as
/// the "no node" sentinel, which is why a `NodeId` can never be zero; use `Option<NodeId>` (or
/// `ControlledOption<NodeId>` inside of node records) wherever a reference might be missing.
#[repr(transparent)]
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(NonZeroU32);

impl NodeId {
    /// Creates a node id from its raw value.  Returns `None` for the `0` sentinel.
    #[inline(always)]
    pub fn new(id: u32) -> Option<NodeId> {
        NonZeroU32::new(id).map(NodeId)
    }

    #[inline(always)]
    pub const fn from_nonzero(id: NonZeroU32) -> NodeId {
        NodeId(id)
    }

    #[inline(always)]
    pub fn as_u32(self) -> u32 {
        self.0.get()
    }

    #[inline(always)]
    pub fn as_usize(self) -> usize {
        self.0.get() as usize
    }

    /// Returns whether this id can refer to a real node.  Ids `0` and `1` are reserved.
    #[inline(always)]
    pub fn is_valid(self) -> bool {
        get_is_valid(self.as_u32())
    }
}

/// Returns whether a raw id can refer to a real node.
#[inline(always)]
pub fn get_is_valid(id: u32) -> bool {
    id > 1
}

impl Niche for NodeId {
    type Output = u32;

    #[inline]
    fn none() -> Self::Output {
        0
    }

    #[inline]
    fn is_none(value: &Self::Output) -> bool {
        *value == 0
    }

    #[inline]
    fn into_some(value: Self) -> Self::Output {
        value.0.get()
    }

    #[inline]
    fn from_some(value: Self::Output) -> Self {
        Self(unsafe { NonZeroU32::new_unchecked(value) })
    }
}

impl Debug for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<NodeId> for u32 {
    fn from(id: NodeId) -> u32 {
        id.as_u32()
    }
}

//-------------------------------------------------------------------------------------------------
// Node sets

/// Contains a set of node ids, encoded efficiently using a bit set.
#[derive(Clone, Default)]
pub struct NodeSet {
    elements: BitVec<u32, bitvec::order::Lsb0>,
}

impl NodeSet {
    /// Creates a new, empty node set.
    pub fn new() -> NodeSet {
        NodeSet::default()
    }

    /// Creates a new, empty node set with room for ids below `len`.
    pub fn with_len(len: usize) -> NodeSet {
        NodeSet {
            elements: BitVec::repeat(false, len),
        }
    }

    /// Removes all elements from this node set.
    pub fn clear(&mut self) {
        self.elements.clear();
    }

    /// Returns whether this set contains a particular node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.elements
            .get(id.as_usize())
            .map(|bit| *bit)
            .unwrap_or(false)
    }

    /// Adds a node to this set.  Returns `true` if it was not already present.
    pub fn add(&mut self, id: NodeId) -> bool {
        let index = id.as_usize();
        if self.elements.len() <= index {
            self.elements.resize(index + 1, false);
        }
        !self.elements.replace(index, true)
    }

    /// Removes a node from this set.
    pub fn remove(&mut self, id: NodeId) {
        if let Some(mut bit) = self.elements.get_mut(id.as_usize()) {
            *bit = false;
        }
    }

    /// Returns whether this set is empty.
    pub fn is_empty(&self) -> bool {
        self.elements.not_any()
    }

    /// Returns the number of nodes in this set.
    pub fn len(&self) -> usize {
        self.elements.count_ones()
    }

    /// Returns an iterator of all of the nodes in this set, in id order.
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.elements
            .iter_ones()
            .filter_map(|index| NodeId::new(index as u32))
    }
}

impl Debug for NodeSet {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

//-------------------------------------------------------------------------------------------------
// Supplemental node data

/// Stores additional data about some of the nodes of a graph, keyed by node id.
///
/// We implement `Index` and `IndexMut` for a more ergonomic syntax.  When indexing in an
/// _immutable_ context, a node that has no data yet yields the value given to [`new`][]; in a
/// _mutable_ context, the storage is grown with that same value as needed.
///
/// ```
/// # use lim::arena::NodeId;
/// # use lim::arena::NodeVec;
/// let id = NodeId::new(7).unwrap();
/// let mut names = NodeVec::new(String::new());
/// assert_eq!(names.get(id), None);
/// assert_eq!(names[id], "");
/// names[id].push_str("hello");
/// assert_eq!(names.get(id).map(String::as_str), Some("hello"));
/// ```
///
/// [`new`]: #method.new
#[derive(Clone, Debug)]
pub struct NodeVec<T> {
    items: Vec<T>,
    fill: T,
}

impl<T: Clone> NodeVec<T> {
    /// Creates a new, empty supplemental vector.  Missing entries read as `fill`.
    pub fn new(fill: T) -> NodeVec<T> {
        NodeVec {
            items: Vec::new(),
            fill,
        }
    }

    /// Removes all entries, keeping the underlying allocation.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Returns the data belonging to a particular node, if it has been stored.
    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.items.get(id.as_usize())
    }

    /// Returns a mutable reference to the data belonging to a node, growing the storage first if
    /// needed.
    pub fn get_mut_or_fill(&mut self, id: NodeId) -> &mut T {
        let index = id.as_usize();
        if self.items.len() <= index {
            self.items.resize(index + 1, self.fill.clone());
        }
        &mut self.items[index]
    }

    /// Grows or shrinks the storage to exactly `len` entries.
    pub fn resize(&mut self, len: usize) {
        self.items.resize(len, self.fill.clone());
    }

    /// Returns the number of entries (including holes) in this vector.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns whether there are no entries in this vector.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates over all entries together with their raw indexes.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.items.iter().enumerate()
    }

    /// Overwrites every entry with `value`.
    pub fn fill_with(&mut self, value: T) {
        for item in self.items.iter_mut() {
            *item = value.clone();
        }
    }
}

impl<T: Clone> Index<NodeId> for NodeVec<T> {
    type Output = T;
    fn index(&self, id: NodeId) -> &T {
        self.items.get(id.as_usize()).unwrap_or(&self.fill)
    }
}

impl<T: Clone> IndexMut<NodeId> for NodeVec<T> {
    fn index_mut(&mut self, id: NodeId) -> &mut T {
        self.get_mut_or_fill(id)
    }
}
