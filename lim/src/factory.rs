// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2021, stack-graphs authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

//! Creates, owns and persists the nodes of a LIM graph.
//!
//! A [`Factory`][] is the single owner of every node of a graph.  It hands out node ids, interns
//! strings, keeps the _singleton_ nodes unique, maintains node parents and the reverse edge index
//! as edges are added, and saves and loads the whole graph.
//!
//! A new factory already contains three nodes: the root `Package` (named `global namespace`), the
//! `FileSystem` that every `File` and `Folder` lives under, and the `<System>` `Component`.
//!
//! ```
//! # use lim::factory::Factory;
//! # use lim::nodes::LanguageKind;
//! # use lim::nodes::SimpleTypeKind;
//! let mut factory = Factory::new(LanguageKind::Java);
//! let int = factory.create_simple_type(SimpleTypeKind::Integer);
//! assert_eq!(int, factory.create_simple_type(SimpleTypeKind::Integer));
//!
//! let file = factory.create_file("src\\Main.java").unwrap();
//! assert_eq!(factory.full_path(file, "/").unwrap(), "src/Main.java");
//! ```
//!
//! [`Factory`]: struct.Factory.html

use std::convert::TryFrom;
use std::fs::File;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Read;
use std::io::Write;
use std::num::NonZeroU32;
use std::ops::Deref;
use std::ops::DerefMut;
use std::path::Path;

use enumset::EnumSet;
use fxhash::FxHashMap;
use itertools::Itertools;
use log::debug;
use log::trace;
use smallvec::SmallVec;

use crate::arena::NodeId;
use crate::edges::AssocKind;
use crate::edges::AssocValue;
use crate::edges::EdgeKind;
use crate::edges::EdgeTarget;
use crate::filter::Filter;
use crate::filter::FilterState;
use crate::io::check_property_data;
use crate::io::AsgValidationKind;
use crate::io::BinaryReader;
use crate::io::BinaryWriter;
use crate::io::HeaderData;
use crate::io::HeaderKind;
use crate::io::PropertyData;
use crate::io::API_VERSION;
use crate::io::BINARY_VERSION;
use crate::io::FILE_TYPE;
use crate::io::MAGIC;
use crate::io::PROPERTY_API_VERSION;
use crate::io::PROPERTY_BINARY_VERSION;
use crate::io::PROPERTY_LANGUAGE;
use crate::io::PROPERTY_TYPE;
use crate::nodes::LanguageKind;
use crate::nodes::Node;
use crate::nodes::NodeData;
use crate::nodes::NodeKind;
use crate::nodes::PointerKind;
use crate::nodes::SimpleTypeKind;
use crate::preorder::AlgorithmPreorder;
use crate::preorder::Visitor;
use crate::reverse_edges::EdgeSelector;
use crate::reverse_edges::ReverseEdges;
use crate::strtable::StrKey;
use crate::strtable::StrTable;
use crate::visitors::VisitorSave;
use crate::LimError;
use crate::Result;

const fn reserved_id(id: u32) -> NodeId {
    match NonZeroU32::new(id) {
        Some(id) => NodeId::from_nonzero(id),
        None => panic!("reserved node ids cannot be zero"),
    }
}

/// The id of the root `Package` of a new graph.
pub const ROOT_ID: NodeId = reserved_id(100);
/// The id of the `FileSystem` of a new graph.
pub const FILE_SYSTEM_ID: NodeId = reserved_id(101);
/// The id of the `<System>` `Component` of a new graph.
pub const SYSTEM_COMPONENT_ID: NodeId = reserved_id(102);

const FIRST_VALID_ID: NodeId = reserved_id(2);

pub const ROOT_NAME: &str = "global namespace";
pub const FILE_SYSTEM_NAME: &str = "FileSystem";
pub const SYSTEM_COMPONENT_NAME: &str = "<System>";

/// The kinds that `create_node` knows how to create.  Every other concrete kind has a dedicated
/// creation method.
const CREATABLE_KINDS: [NodeKind; 15] = [
    NodeKind::ControlFlowBlock,
    NodeKind::Attribute,
    NodeKind::Class,
    NodeKind::ClassGeneric,
    NodeKind::ClassGenericInstance,
    NodeKind::ClassGenericSpec,
    NodeKind::GenericParameter,
    NodeKind::Method,
    NodeKind::MethodGeneric,
    NodeKind::MethodGenericInstance,
    NodeKind::MethodGenericSpec,
    NodeKind::Package,
    NodeKind::Parameter,
    NodeKind::File,
    NodeKind::Folder,
];

//-------------------------------------------------------------------------------------------------
// Factory

/// Owns every node of a LIM graph.
pub struct Factory {
    nodes: Vec<Option<Node>>,
    strings: StrTable,
    filter: Filter,
    filter_on: bool,
    reverse_edges: Option<ReverseEdges>,
    language: LanguageKind,
    root: NodeId,
    file_system: NodeId,
    system_component: NodeId,
    singletons: Singletons,
}

/// Lookup maps that keep singleton nodes unique.
#[derive(Default)]
struct Singletons {
    simple_types: FxHashMap<SimpleTypeKind, NodeId>,
    pointers: FxHashMap<PointerKind, NodeId>,
    array: Option<NodeId>,
    non_type: Option<NodeId>,
    type_references: FxHashMap<Option<NodeId>, NodeId>,
    types: FxHashMap<StrKey, NodeId>,
    attribute_accesses: FxHashMap<NodeId, NodeId>,
    method_calls: FxHashMap<NodeId, NodeId>,
    comments: FxHashMap<StrKey, NodeId>,
    components: FxHashMap<StrKey, NodeId>,
}

impl Factory {
    /// Creates a new graph for the given source language, containing the root package, the file
    /// system and the system component.
    pub fn new(language: LanguageKind) -> Factory {
        let mut factory = Factory {
            nodes: Vec::new(),
            strings: StrTable::new(),
            filter: Filter::new(),
            filter_on: true,
            reverse_edges: None,
            language,
            root: ROOT_ID,
            file_system: FILE_SYSTEM_ID,
            system_component: SYSTEM_COMPONENT_ID,
            singletons: Singletons::default(),
        };
        factory.create_reserved_nodes();
        factory
    }

    fn create_reserved_nodes(&mut self) {
        let name = self.strings.set(ROOT_NAME);
        self.insert_node(NodeKind::Package, ROOT_ID).set_name(name);
        let name = self.strings.set(FILE_SYSTEM_NAME);
        self.insert_node(NodeKind::FileSystem, FILE_SYSTEM_ID)
            .set_name(name);
        let name = self.strings.set(SYSTEM_COMPONENT_NAME);
        self.insert_node(NodeKind::Component, SYSTEM_COMPONENT_ID)
            .set_name(name);
        self.singletons.components.insert(name, SYSTEM_COMPONENT_ID);
    }

    /// Removes every node and string, leaving an empty graph without even the reserved nodes.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.strings = StrTable::new();
        self.filter = Filter::new();
        self.reverse_edges = None;
        self.root = ROOT_ID;
        self.file_system = FILE_SYSTEM_ID;
        self.system_component = SYSTEM_COMPONENT_ID;
        self.singletons = Singletons::default();
    }

    pub fn language(&self) -> LanguageKind {
        self.language
    }

    pub fn set_language(&mut self, language: LanguageKind) {
        self.language = language;
    }

    /// Returns the id of the root package.
    pub fn get_root(&self) -> NodeId {
        self.root
    }

    pub fn get_file_system(&self) -> NodeId {
        self.file_system
    }

    pub fn get_system_component(&self) -> NodeId {
        self.system_component
    }

    pub fn strings(&self) -> &StrTable {
        &self.strings
    }

    pub fn strings_mut(&mut self) -> &mut StrTable {
        &mut self.strings
    }

    /// Returns one more than the largest node id in the graph.  Every smaller id either holds a
    /// node or is a hole.
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the node with the given id, if there is one.
    pub fn get_ref(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.as_usize()).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.as_usize()).and_then(Option::as_mut)
    }

    pub fn get_exist(&self, id: NodeId) -> bool {
        self.get_ref(id).is_some()
    }

    /// Returns the node with the given id, or an error naming `location` if there is none.
    pub fn node(&self, location: &'static str, id: NodeId) -> Result<&Node> {
        self.get_ref(id)
            .ok_or_else(|| LimError::invalid_id(location, id))
    }

    fn node_mut(&mut self, location: &'static str, id: NodeId) -> Result<&mut Node> {
        self.get_mut(id)
            .ok_or_else(|| LimError::invalid_id(location, id))
    }

    /// Returns an iterator over every node, in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.iter().filter_map(Option::as_ref)
    }

    /// Returns the name of a node.  Nodes that are not `Named` have the empty name.
    pub fn get_name(&self, id: NodeId) -> Result<&str> {
        let node = self.node("Factory::get_name", id)?;
        self.strings.get(node.name())
    }

    /// Sets the name of a `Named` node.
    pub fn set_name(&mut self, id: NodeId, name: &str) -> Result<()> {
        let location = "Factory::set_name";
        let kind = self.node(location, id)?.kind();
        if !kind.is_kind_of(NodeKind::Named) {
            return Err(LimError::InvalidNodeKind { location, kind });
        }
        let key = self.strings.set(name);
        self.node_mut(location, id)?.set_name(key);
        Ok(())
    }

    //---------------------------------------------------------------------------------------------
    // Node creation

    fn next_id(&self) -> NodeId {
        NodeId::new(self.nodes.len() as u32)
            .filter(|id| id.is_valid())
            .unwrap_or(FIRST_VALID_ID)
    }

    fn insert_node(&mut self, kind: NodeKind, id: NodeId) -> &mut Node {
        let index = id.as_usize();
        if self.nodes.len() <= index {
            self.nodes.resize_with(index + 1, || None);
        }
        self.filter.resize_to(self.nodes.len());
        self.filter.set(id, FilterState::NotFiltered);
        if let Some(reverse_edges) = &mut self.reverse_edges {
            reverse_edges.insert_node(id);
        }
        self.nodes[index].insert(Node::new(id, kind))
    }

    fn new_node(&mut self, kind: NodeKind) -> NodeId {
        let id = self.next_id();
        self.insert_node(kind, id);
        id
    }

    /// Creates a node of one of the kinds that need no identifying value.
    pub fn create_node(&mut self, kind: NodeKind) -> Result<NodeId> {
        if !CREATABLE_KINDS.contains(&kind) {
            return Err(LimError::InvalidNodeKind {
                location: "Factory::create_node",
                kind,
            });
        }
        Ok(self.new_node(kind))
    }

    /// Creates a node with a specific id.  Any concrete kind can be created this way, but the id
    /// must be valid and unused.  Singleton nodes created this way are not deduplicated.
    pub fn create_node_with_id(&mut self, kind: NodeKind, id: NodeId) -> Result<NodeId> {
        let location = "Factory::create_node_with_id";
        if kind.is_abstract() {
            return Err(LimError::InvalidNodeKind { location, kind });
        }
        if !id.is_valid() {
            return Err(LimError::invalid_id(location, id));
        }
        if self.get_exist(id) {
            return Err(LimError::lim(
                location,
                format!("node {} already exists", id),
            ));
        }
        self.insert_node(kind, id);
        Ok(id)
    }

    /// Widens the kind of a node in place, keeping its id, attributes and edges.  Only
    /// `Class` to `ClassGeneric` and `Method` to `MethodGeneric` are supported.
    pub fn replace_node(&mut self, id: NodeId, kind: NodeKind) -> Result<()> {
        let location = "Factory::replace_node";
        let node = self.node_mut(location, id)?;
        match (node.kind(), kind) {
            (NodeKind::Class, NodeKind::ClassGeneric)
            | (NodeKind::Method, NodeKind::MethodGeneric) => {
                node.promote(kind);
                Ok(())
            }
            _ => Err(LimError::InvalidNodeKind { location, kind }),
        }
    }

    //---------------------------------------------------------------------------------------------
    // Singleton nodes

    /// Returns the `SimpleType` node of the given kind, creating it if needed.
    pub fn create_simple_type(&mut self, kind: SimpleTypeKind) -> NodeId {
        if let Some(id) = self.singletons.simple_types.get(&kind) {
            return *id;
        }
        let id = self.new_node(NodeKind::SimpleType);
        if let Some(node) = self.get_mut(id) {
            *node.data_mut() = NodeData::SimpleType { kind };
        }
        self.singletons.simple_types.insert(kind, id);
        id
    }

    pub fn create_type_former_pointer(&mut self, kind: PointerKind) -> NodeId {
        if let Some(id) = self.singletons.pointers.get(&kind) {
            return *id;
        }
        let id = self.new_node(NodeKind::TypeFormerPointer);
        if let Some(node) = self.get_mut(id) {
            *node.data_mut() = NodeData::TypeFormerPointer { kind };
        }
        self.singletons.pointers.insert(kind, id);
        id
    }

    pub fn create_type_former_array(&mut self) -> NodeId {
        if let Some(id) = self.singletons.array {
            return id;
        }
        let id = self.new_node(NodeKind::TypeFormerArray);
        self.singletons.array = Some(id);
        id
    }

    pub fn create_type_former_non_type(&mut self) -> NodeId {
        if let Some(id) = self.singletons.non_type {
            return id;
        }
        let id = self.new_node(NodeKind::TypeFormerNonType);
        self.singletons.non_type = Some(id);
        id
    }

    /// Returns the `TypeFormerType` node referring to the given node, creating it if needed.
    pub fn create_type_former_type(&mut self, refers_to: Option<NodeId>) -> Result<NodeId> {
        if let Some(id) = self.singletons.type_references.get(&refers_to) {
            return Ok(*id);
        }
        if let Some(target) = refers_to {
            self.node("Factory::create_type_former_type", target)?;
        }
        let id = self.new_node(NodeKind::TypeFormerType);
        self.set_edge(EdgeKind::TypeFormerType_RefersTo, id, refers_to)?;
        self.singletons.type_references.insert(refers_to, id);
        Ok(id)
    }

    /// Returns the `AttributeAccess` node for the given attribute, creating it if needed.
    pub fn create_attribute_access(&mut self, attribute: NodeId) -> Result<NodeId> {
        if let Some(id) = self.singletons.attribute_accesses.get(&attribute) {
            return Ok(*id);
        }
        self.check_target(
            "Factory::create_attribute_access",
            EdgeKind::AttributeAccess_Attribute,
            attribute,
        )?;
        let id = self.new_node(NodeKind::AttributeAccess);
        self.set_edge(EdgeKind::AttributeAccess_Attribute, id, Some(attribute))?;
        self.singletons.attribute_accesses.insert(attribute, id);
        Ok(id)
    }

    /// Returns the `MethodCall` node for the given method, creating it if needed.
    pub fn create_method_call(&mut self, method: NodeId) -> Result<NodeId> {
        if let Some(id) = self.singletons.method_calls.get(&method) {
            return Ok(*id);
        }
        self.check_target(
            "Factory::create_method_call",
            EdgeKind::MethodCall_Method,
            method,
        )?;
        let id = self.new_node(NodeKind::MethodCall);
        self.set_edge(EdgeKind::MethodCall_Method, id, Some(method))?;
        self.singletons.method_calls.insert(method, id);
        Ok(id)
    }

    /// Returns the `Comment` node with the given text, creating it if needed.
    pub fn create_comment(&mut self, text: &str) -> NodeId {
        let text = self.strings.set(text);
        if let Some(id) = self.singletons.comments.get(&text) {
            return *id;
        }
        let id = self.new_node(NodeKind::Comment);
        if let Some(node) = self.get_mut(id) {
            *node.data_mut() = NodeData::Comment { text };
        }
        self.singletons.comments.insert(text, id);
        id
    }

    /// Returns the `Component` node with the given name, creating it if needed.
    pub fn create_component(&mut self, name: &str) -> NodeId {
        let name = self.strings.set(name);
        if let Some(id) = self.singletons.components.get(&name) {
            return *id;
        }
        let id = self.new_node(NodeKind::Component);
        if let Some(node) = self.get_mut(id) {
            node.set_name(name);
        }
        self.singletons.components.insert(name, id);
        id
    }

    /// Creates a `Friendship` node.  Friendships are not deduplicated.
    pub fn create_friendship(&mut self, grantee: &str) -> NodeId {
        let grantee = self.strings.set(grantee);
        let id = self.new_node(NodeKind::Friendship);
        if let Some(node) = self.get_mut(id) {
            *node.data_mut() = NodeData::Friendship { grantee };
        }
        id
    }

    /// Creates a `TypeFormerMethod` node.  Method type formers are not deduplicated.
    pub fn create_type_former_method(&mut self) -> NodeId {
        self.new_node(NodeKind::TypeFormerMethod)
    }

    //---------------------------------------------------------------------------------------------
    // Types

    /// Starts building a composite type.
    pub fn begin_type(&self) -> TypeBuilder {
        TypeBuilder::default()
    }

    /// Finishes building a composite type, returning the `Type` node made of the builder's type
    /// formers.  Building the same sequence of formers twice yields the same node.
    pub fn end_type(&mut self, builder: TypeBuilder) -> Result<NodeId> {
        let location = "Factory::end_type";
        if builder.formers.is_empty() {
            return Err(LimError::EmptyStack { location });
        }
        for former in &builder.formers {
            let kind = self.node(location, *former)?.kind();
            if !kind.is_kind_of(NodeKind::TypeFormer) {
                return Err(LimError::InvalidNodeKind { location, kind });
            }
        }

        let key = format!("[{}]", builder.formers.iter().rev().join(","));
        let key = self.strings.set(&key);
        if let Some(id) = self.singletons.types.get(&key) {
            return Ok(*id);
        }

        let id = self.new_node(NodeKind::Type);
        for former in builder.formers.into_iter().rev() {
            self.add_edge(EdgeKind::Type_HasTypeFormer, id, former)?;
        }
        self.singletons.types.insert(key, id);
        Ok(id)
    }

    //---------------------------------------------------------------------------------------------
    // Files

    /// Returns the `File` node for a `\`-separated path under the file system, creating it and
    /// any missing folders along the way.
    pub fn create_file(&mut self, path: &str) -> Result<NodeId> {
        self.create_file_from(path, self.file_system)
    }

    /// Returns the `File` node for a `\`-separated path relative to `start`, which must be a
    /// `Folder` or the `FileSystem`.  A path that starts with `\` is placed under a `\` folder.
    pub fn create_file_from(&mut self, path: &str, start: NodeId) -> Result<NodeId> {
        let location = "Factory::create_file";
        let kind = self.node(location, start)?.kind();
        if kind != NodeKind::Folder && kind != NodeKind::FileSystem {
            return Err(LimError::InvalidNodeKind { location, kind });
        }

        let mut current = start;
        let mut segments = path.split('\\').collect::<SmallVec<[&str; 8]>>();
        if path.starts_with('\\') {
            current = self.find_or_create_entry(current, "\\", NodeKind::Folder)?;
            segments.remove(0);
        }
        let (file_name, folders) = match segments.split_last() {
            Some(split) => split,
            None => return Err(LimError::lim(location, "empty path")),
        };
        for folder in folders {
            if folder.is_empty() {
                return Err(LimError::EmptyFolderName { location });
            }
            current = self.find_or_create_entry(current, folder, NodeKind::Folder)?;
        }
        if file_name.is_empty() {
            return Err(LimError::lim(location, "empty file name"));
        }
        self.find_or_create_entry(current, file_name, NodeKind::File)
    }

    fn find_or_create_entry(
        &mut self,
        container: NodeId,
        name: &str,
        kind: NodeKind,
    ) -> Result<NodeId> {
        let edge = match self.node("Factory::create_file", container)?.kind() {
            NodeKind::FileSystem => EdgeKind::FileSystem_HasFSEntry,
            _ => EdgeKind::Folder_Contains,
        };
        if let Some(key) = self.strings.lookup(name) {
            let existing = self.get_ref(container).and_then(|node| {
                node.edges(edge)
                    .iter()
                    .filter_map(|target| self.get_ref(target.id))
                    .find(|child| child.kind() == kind && child.name() == key)
                    .map(Node::id)
            });
            if let Some(existing) = existing {
                return Ok(existing);
            }
        }
        let name = self.strings.set(name);
        let id = self.new_node(kind);
        if let Some(node) = self.get_mut(id) {
            node.set_name(name);
        }
        self.add_edge(edge, container, id)?;
        Ok(id)
    }

    /// Returns the path of a `File` or `Folder`, joining the names of its file system ancestors
    /// with `separator`.
    pub fn full_path(&self, id: NodeId, separator: &str) -> Result<String> {
        let location = "Factory::full_path";
        let node = self.node(location, id)?;
        if !node.is_fs_entry() {
            return Err(LimError::InvalidNodeKind {
                location,
                kind: node.kind(),
            });
        }
        let mut names = Vec::new();
        let mut current = Some(node);
        while let Some(node) = current.filter(|node| node.is_fs_entry()) {
            names.push(self.strings.get(node.name())?);
            current = node.parent().and_then(|parent| self.get_ref(parent));
        }
        let mut result = String::new();
        let mut previous: Option<&str> = None;
        for name in names.into_iter().rev() {
            if let Some(previous) = previous {
                if previous != "/" && previous != "\\" {
                    result.push_str(separator);
                }
            }
            result.push_str(name);
            previous = Some(name);
        }
        Ok(result)
    }

    //---------------------------------------------------------------------------------------------
    // Edges

    fn check_target(&self, location: &'static str, kind: EdgeKind, target: NodeId) -> Result<()> {
        let target = self.node(location, target)?;
        if !target.is(kind.target_kind()) {
            return Err(LimError::InvalidNodeKind {
                location,
                kind: target.kind(),
            });
        }
        Ok(())
    }

    fn check_edge(
        &self,
        location: &'static str,
        kind: EdgeKind,
        source: NodeId,
        target: NodeId,
        assoc: Option<&AssocValue>,
    ) -> Result<()> {
        let source = self.node(location, source)?;
        if !source.has_edge_kind(kind) {
            return Err(LimError::InvalidEdge {
                location,
                edge: kind,
                kind: source.kind(),
            });
        }
        self.check_target(location, kind, target)?;
        match (kind.assoc(), assoc) {
            (AssocKind::None, None) => Ok(()),
            (expected, Some(value)) if expected == value.kind() => Ok(()),
            (expected, _) => Err(LimError::lim(
                location,
                format!("{} edges carry {:?} values", kind.name(), expected),
            )),
        }
    }

    fn insert_edge(&mut self, kind: EdgeKind, source: NodeId, target: EdgeTarget) -> Result<()> {
        let location = "Factory::add_edge";
        let previous = self.node_mut(location, source)?.push_edge(kind, target);
        if let Some(previous) = previous {
            self.unlink(kind, source, previous.id);
        }
        if kind.is_containment() {
            self.node_mut(location, target.id)?
                .set_parent(Some((source, kind)));
        }
        if let Some(reverse_edges) = &mut self.reverse_edges {
            reverse_edges.insert_edge(kind, source, target.id);
        }
        Ok(())
    }

    // Undoes the side effects of an edge that has been removed from its source.
    fn unlink(&mut self, kind: EdgeKind, source: NodeId, target: NodeId) {
        if kind.is_containment() {
            if let Some(node) = self.get_mut(target) {
                if node.parent() == Some(source) {
                    node.set_parent(None);
                }
            }
        }
        if let Some(reverse_edges) = &mut self.reverse_edges {
            reverse_edges.remove_edge(kind, source, target);
        }
    }

    /// Adds an edge that carries no value.  Adding an edge of a single-valued kind replaces the
    /// previous target.
    pub fn add_edge(&mut self, kind: EdgeKind, source: NodeId, target: NodeId) -> Result<()> {
        self.check_edge("Factory::add_edge", kind, source, target, None)?;
        self.insert_edge(kind, source, EdgeTarget::new(target))
    }

    /// Adds an edge carrying a value.  The value must be of the kind the edge kind expects.
    pub fn add_assoc_edge(
        &mut self,
        kind: EdgeKind,
        source: NodeId,
        target: NodeId,
        assoc: AssocValue,
    ) -> Result<()> {
        self.check_edge("Factory::add_assoc_edge", kind, source, target, Some(&assoc))?;
        self.insert_edge(kind, source, EdgeTarget::with_assoc(target, assoc))
    }

    /// Sets or clears the target of a single-valued edge kind.
    pub fn set_edge(&mut self, kind: EdgeKind, source: NodeId, target: Option<NodeId>) -> Result<()> {
        let location = "Factory::set_edge";
        if !kind.is_single() {
            return Err(LimError::lim(
                location,
                format!("{} is not a single-valued edge kind", kind.name()),
            ));
        }
        match target {
            Some(target) => {
                self.check_edge(location, kind, source, target, None)?;
                self.insert_edge(kind, source, EdgeTarget::new(target))
            }
            None => {
                let previous = self.node(location, source)?.single_edge(kind);
                if let Some(previous) = previous {
                    self.remove_edge(kind, source, previous)?;
                }
                Ok(())
            }
        }
    }

    /// Removes the first edge of the given kind from `source` to `target`.  Returns whether there
    /// was such an edge.
    pub fn remove_edge(&mut self, kind: EdgeKind, source: NodeId, target: NodeId) -> Result<bool> {
        let removed = self
            .node_mut("Factory::remove_edge", source)?
            .remove_edge(kind, target);
        if removed.is_some() {
            self.unlink(kind, source, target);
        }
        Ok(removed.is_some())
    }

    //---------------------------------------------------------------------------------------------
    // Reverse edges

    /// Returns the reverse edge index for the given selector, building it if it hasn't been built
    /// yet or was built for a different selector.  The index is kept up to date as the graph
    /// changes.
    pub fn reverse_edges(&mut self, selector: EdgeSelector) -> &ReverseEdges {
        if let Some(reverse_edges) = &self.reverse_edges {
            if reverse_edges.selector() != selector {
                debug!(
                    "Reverse edge selector changed from {:?} to {:?}",
                    reverse_edges.selector(),
                    selector
                );
                self.reverse_edges = None;
            }
        }
        let nodes = &self.nodes;
        self.reverse_edges.get_or_insert_with(|| {
            debug!("Building reverse edges");
            ReverseEdges::build(nodes.iter().filter_map(Option::as_ref), selector)
        })
    }

    /// Returns the cached reverse edge index, if one has been built.
    pub fn cached_reverse_edges(&self) -> Option<&ReverseEdges> {
        self.reverse_edges.as_ref()
    }

    //---------------------------------------------------------------------------------------------
    // Filter

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn turn_filter_on(&mut self) {
        self.filter_on = true;
    }

    pub fn turn_filter_off(&mut self) {
        self.filter_on = false;
    }

    pub fn get_filter_is_on(&self) -> bool {
        self.filter_on
    }

    /// Turns the filter off until the returned guard is dropped.
    pub fn turn_filter_off_safely(&mut self) -> FilterOffGuard<'_> {
        let was_on = self.filter_on;
        self.filter_on = false;
        FilterOffGuard {
            factory: self,
            was_on,
        }
    }

    /// Returns whether a node is hidden.  While the filter is off, no node is.
    pub fn get_is_filtered(&self, id: NodeId) -> bool {
        self.filter_on && self.filter.get_is_filtered(id)
    }

    pub fn get_filter_state(&self, id: NodeId) -> Option<FilterState> {
        self.filter.get_filter_state(id)
    }

    pub fn set_filtered(&mut self, id: NodeId) -> Result<()> {
        self.filter.set_filtered(&self.nodes, id)
    }

    pub fn set_not_filtered(&mut self, id: NodeId) -> Result<()> {
        self.filter.set_not_filtered(&self.nodes, id)
    }

    pub fn set_filtered_this_node_only(&mut self, id: NodeId) -> Result<()> {
        self.node("Factory::set_filtered_this_node_only", id)?;
        self.filter.set_filtered_this_node_only(id);
        Ok(())
    }

    pub fn set_not_filtered_this_node_only(&mut self, id: NodeId) -> Result<()> {
        self.node("Factory::set_not_filtered_this_node_only", id)?;
        self.filter.set_not_filtered_this_node_only(id);
        Ok(())
    }

    /// Marks every node as not filtered.
    pub fn initialize_filter(&mut self) {
        self.filter.resize_to(self.nodes.len());
        self.filter.initialize_filter();
    }

    pub fn save_filter<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BinaryWriter::new(BufWriter::new(File::create(path)?));
        self.filter.save(&mut writer)?;
        writer.flush()
    }

    /// Loads a filter saved by [`save_filter`][].  Fails if the filter was saved for a graph of a
    /// different size.
    ///
    /// [`save_filter`]: #method.save_filter
    pub fn load_filter<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let mut reader = BinaryReader::new(BufReader::new(File::open(path)?));
        self.filter.load(&mut reader, self.nodes.len())
    }

    //---------------------------------------------------------------------------------------------
    // Saving and loading

    /// Saves the graph and the given headers to a file.
    pub fn save<P: AsRef<Path>>(
        &mut self,
        path: P,
        headers: &mut [&mut dyn HeaderData],
    ) -> Result<()> {
        let file = BufWriter::new(File::create(path)?);
        self.save_to(file, headers)
    }

    /// Saves the graph and the given headers.  The `PropertyData` header is always written first;
    /// it is created if `headers` does not contain one, and its file type, version and language
    /// properties are filled in.  Filtered nodes are saved too.
    pub fn save_to<W: Write>(
        &mut self,
        writer: W,
        headers: &mut [&mut dyn HeaderData],
    ) -> Result<()> {
        let mut writer = BinaryWriter::new(writer);
        writer.write_bytes(MAGIC)?;

        let mut own_properties = PropertyData::new();
        let has_properties = headers
            .iter()
            .any(|header| header.kind() == HeaderKind::PropertyData);
        let count = headers.len() + if has_properties { 0 } else { 1 };
        writer.write_u32(count as u32)?;
        if has_properties {
            for header in headers.iter_mut() {
                if header.kind() != HeaderKind::PropertyData {
                    continue;
                }
                if let Some(properties) = header.as_property_data_mut() {
                    self.fill_property_data(properties);
                }
                write_header(&mut writer, &**header)?;
            }
        } else {
            self.fill_property_data(&mut own_properties);
            write_header(&mut writer, &own_properties)?;
        }
        for header in headers.iter() {
            if header.kind() != HeaderKind::PropertyData {
                write_header(&mut writer, &**header)?;
            }
        }

        let count = {
            let guard = self.turn_filter_off_safely();
            let mut visitor = VisitorSave::new(&mut writer);
            let mut preorder = AlgorithmPreorder::new();
            preorder.set_safe_mode();
            preorder.run(&guard, &mut [&mut visitor as &mut dyn Visitor], None)?;
            visitor.finish()?
        };
        writer.write_u32(0)?;
        writer.write_u16(0)?;
        self.strings.save(&mut writer)?;
        writer.flush()?;
        debug!("Saved {} nodes", count);
        Ok(())
    }

    fn fill_property_data(&self, properties: &mut PropertyData) {
        properties.set(PROPERTY_TYPE, FILE_TYPE);
        properties.set(PROPERTY_API_VERSION, API_VERSION);
        properties.set(PROPERTY_BINARY_VERSION, BINARY_VERSION);
        properties.set(
            PROPERTY_LANGUAGE,
            (self.language.as_u8() as i32).to_string(),
        );
    }

    /// Loads a graph from a file, replacing the current content of this factory.
    pub fn load<P: AsRef<Path>>(
        &mut self,
        path: P,
        headers: &mut [&mut dyn HeaderData],
    ) -> Result<()> {
        let file = BufReader::new(File::open(path)?);
        self.load_from(file, headers)
    }

    /// Loads a graph, replacing the current content of this factory.  Headers are loaded into the
    /// element of `headers` with the same kind; headers with no counterpart are skipped.  If the
    /// data does not start with the graph file magic, nothing is loaded and this factory is left
    /// unchanged.
    pub fn load_from<R: Read>(
        &mut self,
        reader: R,
        headers: &mut [&mut dyn HeaderData],
    ) -> Result<()> {
        let location = "Factory::load";
        let mut reader = BinaryReader::new(reader);
        let magic = reader.read_bytes(MAGIC.len())?;
        if magic != MAGIC {
            debug!("Not a graph file (magic {:?})", magic);
            return Ok(());
        }

        let properties = read_headers(&mut reader, headers)?
            .ok_or_else(|| LimError::lim(location, "missing property data header"))?;
        let problems = check_property_data(&properties);
        if !problems.is_empty() {
            return Err(LimError::lim(
                location,
                format!("invalid graph file properties {:?}", problems),
            ));
        }
        let language = properties
            .get_int(PROPERTY_LANGUAGE)
            .and_then(|value| u8::try_from(value).ok())
            .and_then(LanguageKind::from_u8)
            .ok_or_else(|| LimError::lim(location, "missing or invalid language property"))?;

        self.clear();
        self.language = language;
        let mut root = None;
        loop {
            let raw_id = reader.read_u32()?;
            let raw_kind = reader.read_u16()?;
            if raw_id == 0 && raw_kind == 0 {
                break;
            }
            let kind = NodeKind::from_u16(raw_kind)
                .filter(|kind| !kind.is_abstract())
                .ok_or_else(|| {
                    LimError::lim(location, format!("invalid node kind ({})", raw_kind))
                })?;
            let id = NodeId::new(raw_id)
                .filter(|id| id.is_valid())
                .ok_or(LimError::InvalidNodeId {
                    location,
                    id: raw_id,
                })?;
            trace!("Loading node {} {:?}", id, kind);
            self.create_node_with_id(kind, id)?;
            self.node_mut(location, id)?.load(&mut reader)?;
            root.get_or_insert(id);
        }
        self.strings.load(&mut reader)?;
        if let Some(root) = root {
            self.root = root;
        }
        self.link_loaded_nodes();
        debug!("Loaded {} nodes", self.iter().count());
        Ok(())
    }

    // Restores everything that is derived from the loaded edges: parents, singleton maps and the
    // reserved nodes.
    fn link_loaded_nodes(&mut self) {
        let mut children = Vec::new();
        for node in self.iter() {
            for edge in node.iter_edges() {
                if edge.kind.is_containment() {
                    children.push((edge.target, edge.source, edge.kind));
                }
            }
        }
        for (child, parent, kind) in children {
            if let Some(node) = self.get_mut(child) {
                node.set_parent(Some((parent, kind)));
            }
        }

        let mut singletons = Singletons::default();
        let mut type_keys = Vec::new();
        let mut file_system = None;
        let mut system_component = None;
        let system_component_name = self.strings.lookup(SYSTEM_COMPONENT_NAME);
        for node in self.iter() {
            let id = node.id();
            match node.data() {
                NodeData::SimpleType { kind } => {
                    singletons.simple_types.entry(*kind).or_insert(id);
                }
                NodeData::TypeFormerPointer { kind } => {
                    singletons.pointers.entry(*kind).or_insert(id);
                }
                NodeData::Comment { text } => {
                    singletons.comments.entry(*text).or_insert(id);
                }
                _ => {}
            }
            match node.kind() {
                NodeKind::TypeFormerArray => {
                    singletons.array.get_or_insert(id);
                }
                NodeKind::TypeFormerNonType => {
                    singletons.non_type.get_or_insert(id);
                }
                NodeKind::TypeFormerType => {
                    let refers_to = node.single_edge(EdgeKind::TypeFormerType_RefersTo);
                    singletons.type_references.entry(refers_to).or_insert(id);
                }
                NodeKind::Type => {
                    let formers = node.edges(EdgeKind::Type_HasTypeFormer);
                    let key = format!("[{}]", formers.iter().map(|target| target.id).join(","));
                    type_keys.push((key, id));
                }
                NodeKind::AttributeAccess => {
                    if let Some(attribute) = node.single_edge(EdgeKind::AttributeAccess_Attribute) {
                        singletons.attribute_accesses.entry(attribute).or_insert(id);
                    }
                }
                NodeKind::MethodCall => {
                    if let Some(method) = node.single_edge(EdgeKind::MethodCall_Method) {
                        singletons.method_calls.entry(method).or_insert(id);
                    }
                }
                NodeKind::Component => {
                    singletons.components.entry(node.name()).or_insert(id);
                    if Some(node.name()) == system_component_name {
                        system_component.get_or_insert(id);
                    }
                }
                NodeKind::FileSystem => {
                    file_system.get_or_insert(id);
                }
                _ => {}
            }
        }
        for (key, id) in type_keys {
            let key = self.strings.set(&key);
            singletons.types.entry(key).or_insert(id);
        }
        self.singletons = singletons;
        if let Some(file_system) = file_system {
            self.file_system = file_system;
        }
        if let Some(system_component) = system_component {
            self.system_component = system_component;
        }
    }

    /// Checks whether a file holds a graph that this crate can load, without loading its nodes.
    /// Returns `{Valid}` for a loadable file, and the set of problems found otherwise.
    pub fn check_asg<P: AsRef<Path>>(path: P) -> EnumSet<AsgValidationKind> {
        let result = File::open(path)
            .map_err(LimError::from)
            .and_then(|file| check_asg_from(BufReader::new(file)));
        match result {
            Ok(problems) if problems.is_empty() => AsgValidationKind::Valid.into(),
            Ok(problems) => problems,
            Err(_) => AsgValidationKind::UnknownError.into(),
        }
    }
}

fn write_header<W: Write>(writer: &mut BinaryWriter<W>, header: &dyn HeaderData) -> Result<()> {
    writer.write_u16(header.kind().as_u16())?;
    writer.write_block(|block| header.save(block))
}

// Reads every header record, loading each one into the matching element of `headers`.  Returns
// the property data header, if there was one.
fn read_headers<R: Read>(
    reader: &mut BinaryReader<R>,
    headers: &mut [&mut dyn HeaderData],
) -> Result<Option<PropertyData>> {
    let mut properties = None;
    let count = reader.read_u32()?;
    for _ in 0..count {
        let raw_kind = reader.read_u16()?;
        let block = reader.read_block()?;
        let kind = match HeaderKind::from_u16(raw_kind) {
            Some(kind) => kind,
            None => {
                debug!("Skipping header of unknown kind {}", raw_kind);
                continue;
            }
        };
        if kind == HeaderKind::PropertyData {
            let mut data = PropertyData::new();
            data.load(&mut BinaryReader::new(&block[..]))?;
            properties = Some(data);
        }
        match headers.iter_mut().find(|header| header.kind() == kind) {
            Some(header) => header.load(&mut BinaryReader::new(&block[..]))?,
            None if kind != HeaderKind::PropertyData => {
                debug!("Skipping {:?} header", kind);
            }
            None => {}
        }
    }
    Ok(properties)
}

fn check_asg_from<R: Read>(reader: R) -> Result<EnumSet<AsgValidationKind>> {
    let mut reader = BinaryReader::new(reader);
    if reader.read_bytes(MAGIC.len())? != MAGIC {
        return Ok(AsgValidationKind::WrongFileType.into());
    }
    match read_headers(&mut reader, &mut [])? {
        Some(properties) => Ok(check_property_data(&properties)),
        None => Ok(AsgValidationKind::MissingFileType
            | AsgValidationKind::MissingApiVersion
            | AsgValidationKind::MissingBinaryVersion),
    }
}

impl Default for Factory {
    fn default() -> Factory {
        Factory::new(LanguageKind::default())
    }
}

//-------------------------------------------------------------------------------------------------
// Convenience constructors

macro_rules! node_creators {
    ($($name:ident => $kind:ident,)*) => {
        impl Factory {
            $(
                pub fn $name(&mut self) -> NodeId {
                    self.new_node(NodeKind::$kind)
                }
            )*
        }
    };
}

node_creators! {
    create_attribute_node => Attribute,
    create_class_node => Class,
    create_class_generic_node => ClassGeneric,
    create_class_generic_instance_node => ClassGenericInstance,
    create_class_generic_spec_node => ClassGenericSpec,
    create_control_flow_block_node => ControlFlowBlock,
    create_file_node => File,
    create_folder_node => Folder,
    create_generic_parameter_node => GenericParameter,
    create_method_node => Method,
    create_method_generic_node => MethodGeneric,
    create_method_generic_instance_node => MethodGenericInstance,
    create_method_generic_spec_node => MethodGenericSpec,
    create_package_node => Package,
    create_parameter_node => Parameter,
}

//-------------------------------------------------------------------------------------------------
// Type builder

/// A stack of type formers that [`Factory::end_type`][] turns into a `Type` node.
///
/// [`Factory::end_type`]: struct.Factory.html#method.end_type
#[derive(Clone, Debug, Default)]
pub struct TypeBuilder {
    formers: SmallVec<[NodeId; 4]>,
}

impl TypeBuilder {
    /// Pushes a type former onto the stack.
    pub fn add_type_former(&mut self, former: NodeId) -> &mut Self {
        self.formers.push(former);
        self
    }

    pub fn len(&self) -> usize {
        self.formers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formers.is_empty()
    }
}

//-------------------------------------------------------------------------------------------------
// Filter guard

/// Keeps the filter of a factory turned off, and restores it when dropped.  Derefs to the
/// factory.
pub struct FilterOffGuard<'a> {
    factory: &'a mut Factory,
    was_on: bool,
}

impl Deref for FilterOffGuard<'_> {
    type Target = Factory;

    fn deref(&self) -> &Factory {
        self.factory
    }
}

impl DerefMut for FilterOffGuard<'_> {
    fn deref_mut(&mut self) -> &mut Factory {
        self.factory
    }
}

impl Drop for FilterOffGuard<'_> {
    fn drop(&mut self) {
        if self.was_on {
            self.factory.filter_on = true;
        }
    }
}
