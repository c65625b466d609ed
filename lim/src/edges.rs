// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2021, stack-graphs authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

//! Defines the edges of a LIM graph.
//!
//! Edges are typed and directed, and are owned by their source node as an ordered list per
//! [`EdgeKind`][].  Every edge kind is described by an [`EdgeDescriptor`][] in a single static
//! table, which records:
//!
//!   - the kind of node the edge starts from (the edge is available on that kind and all of its
//!     descendants in the kind hierarchy)
//!   - the kind of node the edge must point to
//!   - the kind of value, if any, that each edge carries alongside its target (an _assoc edge_)
//!   - whether the edge is a _containment_ edge, which makes the source the parent of the target
//!     and is followed by default during traversal
//!   - whether the edge holds at most one target
//!
//! Everything else in the crate (storage, serialization, traversal, reverse edges) is driven by
//! that table rather than by per-kind code.
//!
//! [`EdgeDescriptor`]: struct.EdgeDescriptor.html
//! [`EdgeKind`]: enum.EdgeKind.html

use enumset::EnumSet;
use enumset::EnumSetType;

use crate::arena::NodeId;
use crate::io::BinaryReader;
use crate::io::BinaryWriter;
use crate::nodes::NodeKind;
use crate::nodes::ParameterKind;
use crate::nodes::SourcePosition;
use crate::nodes::TypeArgumentConstraintKind;
use crate::strtable::StrKey;
use crate::LimError;
use crate::Result;

//-------------------------------------------------------------------------------------------------
// Edge kinds

/// The closed catalogue of edge kinds.  The declaration order is significant: it is the order in
/// which a node's edges are walked and serialized.
#[allow(non_camel_case_types)]
#[derive(Debug, EnumSetType, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EdgeKind {
    Component_Contains,
    Component_HasFiles,
    ControlFlowBlock_Calls,
    ControlFlowBlock_Pred,
    Named_DependsOn,
    Attribute_Calls,
    Attribute_HasType,
    AttributeAccess_Attribute,
    Class_GrantsFriendship,
    Class_IsSubclass,
    ClassGeneric_HasGenericParameter,
    ClassGenericInstance_HasArguments,
    ClassGenericSpec_HasArguments,
    ClassGenericSpec_Specialize,
    Friendship_Friend,
    GenericParameter_HasParameterConstraint,
    Member_Aggregated,
    Member_BelongsTo,
    Member_CompilationUnit,
    Member_Declares,
    Member_HasComment,
    Member_Instance,
    Member_IsContainedIn,
    Member_LanguageVariant,
    Member_Uses,
    Member_Variant,
    Method_AccessesAttribute,
    Method_Calls,
    Method_CanThrow,
    Method_HasControlFlowBlock,
    Method_HasParameter,
    Method_Instantiates,
    Method_Returns,
    Method_Throws,
    MethodCall_Method,
    MethodGeneric_HasGenericParameter,
    MethodGenericInstance_HasArguments,
    MethodGenericSpec_HasArguments,
    MethodGenericSpec_Specialize,
    Parameter_HasType,
    Scope_HasMember,
    File_HasComment,
    File_Includes,
    FileSystem_HasFSEntry,
    Folder_Contains,
    Type_HasTypeFormer,
    TypeFormerMethod_HasParameterType,
    TypeFormerMethod_HasReturnType,
    TypeFormerType_RefersTo,
}

/// A set of edge kinds.  Used to select which cross edges a traversal follows, and which edges a
/// reverse edge index records.
pub type EdgeKindSet = EnumSet<EdgeKind>;

impl EdgeKind {
    /// Returns the static description of this edge kind.
    #[inline]
    pub fn descriptor(self) -> &'static EdgeDescriptor {
        &EDGE_TABLE[self as usize]
    }

    pub fn source_kind(self) -> NodeKind {
        self.descriptor().source
    }

    pub fn target_kind(self) -> NodeKind {
        self.descriptor().target
    }

    pub fn assoc(self) -> AssocKind {
        self.descriptor().assoc
    }

    pub fn is_containment(self) -> bool {
        self.descriptor().containment
    }

    pub fn is_single(self) -> bool {
        self.descriptor().single
    }

    /// Returns every edge kind, in declaration order.
    pub fn all() -> impl Iterator<Item = EdgeKind> {
        EDGE_TABLE.iter().map(|descriptor| descriptor.kind)
    }

    pub fn from_u16(value: u16) -> Option<EdgeKind> {
        EDGE_TABLE.get(value as usize).map(|descriptor| descriptor.kind)
    }

    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Returns the name of this edge kind, as used in dumps.
    pub fn name(self) -> &'static str {
        self.descriptor().name
    }
}

//-------------------------------------------------------------------------------------------------
// Edge descriptors

/// The kind of value carried by each edge of an assoc edge kind.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum AssocKind {
    None,
    String,
    SourcePosition,
    TypeArgumentConstraint,
    Parameter,
}

/// The static description of an edge kind.
#[derive(Clone, Copy, Debug)]
pub struct EdgeDescriptor {
    pub kind: EdgeKind,
    pub name: &'static str,
    pub source: NodeKind,
    pub target: NodeKind,
    pub assoc: AssocKind,
    pub containment: bool,
    pub single: bool,
}

const fn edge(
    kind: EdgeKind,
    name: &'static str,
    source: NodeKind,
    target: NodeKind,
    assoc: AssocKind,
    containment: bool,
    single: bool,
) -> EdgeDescriptor {
    EdgeDescriptor {
        kind,
        name,
        source,
        target,
        assoc,
        containment,
        single,
    }
}

use AssocKind as A;
use EdgeKind as E;
use NodeKind as N;

const TREE: bool = true;
const CROSS: bool = false;
const ONE: bool = true;
const MANY: bool = false;

#[rustfmt::skip]
static EDGE_TABLE: [EdgeDescriptor; 49] = [
    edge(E::Component_Contains, "Component_Contains", N::Component, N::Component, A::None, CROSS, MANY),
    edge(E::Component_HasFiles, "Component_HasFiles", N::Component, N::File, A::None, CROSS, MANY),
    edge(E::ControlFlowBlock_Calls, "ControlFlowBlock_Calls", N::ControlFlowBlock, N::Method, A::None, CROSS, MANY),
    edge(E::ControlFlowBlock_Pred, "ControlFlowBlock_Pred", N::ControlFlowBlock, N::ControlFlowBlock, A::None, CROSS, MANY),
    edge(E::Named_DependsOn, "Named_DependsOn", N::Named, N::Named, A::String, CROSS, MANY),
    edge(E::Attribute_Calls, "Attribute_Calls", N::Attribute, N::MethodCall, A::None, CROSS, MANY),
    edge(E::Attribute_HasType, "Attribute_HasType", N::Attribute, N::Type, A::None, CROSS, MANY),
    edge(E::AttributeAccess_Attribute, "AttributeAccess_Attribute", N::AttributeAccess, N::Attribute, A::None, CROSS, ONE),
    edge(E::Class_GrantsFriendship, "Class_GrantsFriendship", N::Class, N::Friendship, A::None, CROSS, MANY),
    edge(E::Class_IsSubclass, "Class_IsSubclass", N::Class, N::Type, A::None, CROSS, MANY),
    edge(E::ClassGeneric_HasGenericParameter, "ClassGeneric_HasGenericParameter", N::ClassGeneric, N::GenericParameter, A::None, TREE, MANY),
    edge(E::ClassGenericInstance_HasArguments, "ClassGenericInstance_HasArguments", N::ClassGenericInstance, N::Type, A::TypeArgumentConstraint, CROSS, MANY),
    edge(E::ClassGenericSpec_HasArguments, "ClassGenericSpec_HasArguments", N::ClassGenericSpec, N::Type, A::TypeArgumentConstraint, CROSS, MANY),
    edge(E::ClassGenericSpec_Specialize, "ClassGenericSpec_Specialize", N::ClassGenericSpec, N::ClassGeneric, A::None, CROSS, ONE),
    edge(E::Friendship_Friend, "Friendship_Friend", N::Friendship, N::Scope, A::None, CROSS, ONE),
    edge(E::GenericParameter_HasParameterConstraint, "GenericParameter_HasParameterConstraint", N::GenericParameter, N::Type, A::None, CROSS, MANY),
    edge(E::Member_Aggregated, "Member_Aggregated", N::Member, N::Member, A::None, CROSS, ONE),
    edge(E::Member_BelongsTo, "Member_BelongsTo", N::Member, N::Component, A::None, CROSS, MANY),
    edge(E::Member_CompilationUnit, "Member_CompilationUnit", N::Member, N::File, A::None, CROSS, MANY),
    edge(E::Member_Declares, "Member_Declares", N::Member, N::Member, A::None, CROSS, ONE),
    edge(E::Member_HasComment, "Member_HasComment", N::Member, N::Comment, A::None, CROSS, MANY),
    edge(E::Member_Instance, "Member_Instance", N::Member, N::Member, A::None, CROSS, MANY),
    edge(E::Member_IsContainedIn, "Member_IsContainedIn", N::Member, N::File, A::SourcePosition, CROSS, MANY),
    edge(E::Member_LanguageVariant, "Member_LanguageVariant", N::Member, N::Member, A::None, CROSS, ONE),
    edge(E::Member_Uses, "Member_Uses", N::Member, N::Type, A::None, CROSS, MANY),
    edge(E::Member_Variant, "Member_Variant", N::Member, N::Member, A::None, CROSS, MANY),
    edge(E::Method_AccessesAttribute, "Method_AccessesAttribute", N::Method, N::AttributeAccess, A::None, CROSS, MANY),
    edge(E::Method_Calls, "Method_Calls", N::Method, N::MethodCall, A::None, CROSS, MANY),
    edge(E::Method_CanThrow, "Method_CanThrow", N::Method, N::Type, A::None, CROSS, MANY),
    edge(E::Method_HasControlFlowBlock, "Method_HasControlFlowBlock", N::Method, N::ControlFlowBlock, A::None, TREE, MANY),
    edge(E::Method_HasParameter, "Method_HasParameter", N::Method, N::Parameter, A::None, TREE, MANY),
    edge(E::Method_Instantiates, "Method_Instantiates", N::Method, N::Type, A::None, CROSS, MANY),
    edge(E::Method_Returns, "Method_Returns", N::Method, N::Type, A::None, CROSS, MANY),
    edge(E::Method_Throws, "Method_Throws", N::Method, N::Type, A::None, CROSS, MANY),
    edge(E::MethodCall_Method, "MethodCall_Method", N::MethodCall, N::Method, A::None, CROSS, ONE),
    edge(E::MethodGeneric_HasGenericParameter, "MethodGeneric_HasGenericParameter", N::MethodGeneric, N::GenericParameter, A::None, TREE, MANY),
    edge(E::MethodGenericInstance_HasArguments, "MethodGenericInstance_HasArguments", N::MethodGenericInstance, N::Type, A::TypeArgumentConstraint, CROSS, MANY),
    edge(E::MethodGenericSpec_HasArguments, "MethodGenericSpec_HasArguments", N::MethodGenericSpec, N::Type, A::TypeArgumentConstraint, CROSS, MANY),
    edge(E::MethodGenericSpec_Specialize, "MethodGenericSpec_Specialize", N::MethodGenericSpec, N::MethodGeneric, A::None, CROSS, ONE),
    edge(E::Parameter_HasType, "Parameter_HasType", N::Parameter, N::Type, A::None, CROSS, ONE),
    edge(E::Scope_HasMember, "Scope_HasMember", N::Scope, N::Member, A::None, TREE, MANY),
    edge(E::File_HasComment, "File_HasComment", N::File, N::Comment, A::None, CROSS, MANY),
    edge(E::File_Includes, "File_Includes", N::File, N::File, A::None, CROSS, MANY),
    edge(E::FileSystem_HasFSEntry, "FileSystem_HasFSEntry", N::FileSystem, N::FSEntry, A::None, TREE, MANY),
    edge(E::Folder_Contains, "Folder_Contains", N::Folder, N::FSEntry, A::None, TREE, MANY),
    edge(E::Type_HasTypeFormer, "Type_HasTypeFormer", N::Type, N::TypeFormer, A::None, CROSS, MANY),
    edge(E::TypeFormerMethod_HasParameterType, "TypeFormerMethod_HasParameterType", N::TypeFormerMethod, N::Type, A::Parameter, CROSS, MANY),
    edge(E::TypeFormerMethod_HasReturnType, "TypeFormerMethod_HasReturnType", N::TypeFormerMethod, N::Type, A::None, CROSS, ONE),
    edge(E::TypeFormerType_RefersTo, "TypeFormerType_RefersTo", N::TypeFormerType, N::Base, A::None, CROSS, ONE),
];

//-------------------------------------------------------------------------------------------------
// Edge values

/// The value carried alongside the target of an assoc edge.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AssocValue {
    String(StrKey),
    SourcePosition(SourcePosition),
    TypeArgumentConstraint(TypeArgumentConstraintKind),
    Parameter(ParameterKind),
}

impl AssocValue {
    pub fn kind(&self) -> AssocKind {
        match self {
            AssocValue::String(_) => AssocKind::String,
            AssocValue::SourcePosition(_) => AssocKind::SourcePosition,
            AssocValue::TypeArgumentConstraint(_) => AssocKind::TypeArgumentConstraint,
            AssocValue::Parameter(_) => AssocKind::Parameter,
        }
    }

    pub(crate) fn save<W: std::io::Write>(&self, writer: &mut BinaryWriter<W>) -> Result<()> {
        match self {
            AssocValue::String(key) => writer.write_u32(key.as_u32()),
            AssocValue::SourcePosition(position) => position.save(writer),
            AssocValue::TypeArgumentConstraint(kind) => writer.write_u8(kind.as_u8()),
            AssocValue::Parameter(kind) => writer.write_u8(kind.as_u8()),
        }
    }

    pub(crate) fn load<R: std::io::Read>(
        assoc: AssocKind,
        reader: &mut BinaryReader<R>,
    ) -> Result<Option<AssocValue>> {
        Ok(match assoc {
            AssocKind::None => None,
            AssocKind::String => Some(AssocValue::String(StrKey::from_u32(reader.read_u32()?))),
            AssocKind::SourcePosition => {
                Some(AssocValue::SourcePosition(SourcePosition::load(reader)?))
            }
            AssocKind::TypeArgumentConstraint => {
                let value = reader.read_u8()?;
                let kind = TypeArgumentConstraintKind::from_u8(value)
                    .ok_or_else(|| invalid_enum("TypeArgumentConstraintKind", value))?;
                Some(AssocValue::TypeArgumentConstraint(kind))
            }
            AssocKind::Parameter => {
                let value = reader.read_u8()?;
                let kind = ParameterKind::from_u8(value)
                    .ok_or_else(|| invalid_enum("ParameterKind", value))?;
                Some(AssocValue::Parameter(kind))
            }
        })
    }
}

pub(crate) fn invalid_enum(name: &'static str, value: u8) -> LimError {
    LimError::lim("load", format!("invalid {} value ({})", name, value))
}

/// One outgoing edge of a node: its target, plus the assoc value for assoc edge kinds.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct EdgeTarget {
    pub id: NodeId,
    pub assoc: Option<AssocValue>,
}

impl EdgeTarget {
    pub fn new(id: NodeId) -> EdgeTarget {
        EdgeTarget { id, assoc: None }
    }

    pub fn with_assoc(id: NodeId, assoc: AssocValue) -> EdgeTarget {
        EdgeTarget {
            id,
            assoc: Some(assoc),
        }
    }
}

/// A fully resolved edge, as reported by iterators over a node's edges.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Edge {
    pub kind: EdgeKind,
    pub source: NodeId,
    pub target: NodeId,
    pub assoc: Option<AssocValue>,
}
