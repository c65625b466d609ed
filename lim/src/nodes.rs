// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2021, stack-graphs authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

//! Defines the nodes of a LIM graph.
//!
//! Every node has a [`NodeKind`][], drawn from a closed, single-inheritance kind hierarchy:
//!
//!   - `Base`, the root of the hierarchy
//!     - `Comment`, `ControlFlowBlock`, `AttributeAccess`, `Friendship`, `MethodCall`,
//!       `SimpleType`, `Type`
//!     - `Named`, for everything that has a name
//!       - `Component`, `GenericParameter`, `Parameter`, `FileSystem`
//!       - `Member`, for the logical members of a program
//!         - `Attribute`
//!         - `Scope`, for members that contain other members: `Class` (with its generic
//!           variants), `Method` (with its generic variants) and `Package`
//!       - `FSEntry`, for file system entries: `File` and `Folder`
//!     - `TypeFormer`, the building blocks of composite types: `TypeFormerArray`,
//!       `TypeFormerMethod`, `TypeFormerNonType`, `TypeFormerPointer` and `TypeFormerType`
//!
//! The hierarchy is stored as a static table, so that asking whether a node "is a Scope" is a
//! handful of table lookups.  Abstract kinds (`Base`, `Named`, `Member`, `Scope`, `FSEntry`,
//! `TypeFormer`) never appear as the kind of a real node.
//!
//! A [`Node`][] stores the attributes of every layer of its kind (its name if it is `Named`, its
//! accessibility if it is a `Member`, and so on), and its outgoing edges, grouped by
//! [`EdgeKind`][].
//!
//! [`EdgeKind`]: ../edges/enum.EdgeKind.html
//! [`Node`]: struct.Node.html
//! [`NodeKind`]: enum.NodeKind.html

use std::io::Read;
use std::io::Write;

use controlled_option::ControlledOption;
use smallvec::SmallVec;

use crate::arena::NodeId;
use crate::edges::invalid_enum;
use crate::edges::AssocValue;
use crate::edges::Edge;
use crate::edges::EdgeKind;
use crate::edges::EdgeTarget;
use crate::io::BinaryReader;
use crate::io::BinaryWriter;
use crate::strtable::StrKey;
use crate::Result;

//-------------------------------------------------------------------------------------------------
// Value enums

macro_rules! value_enum {
    (
        $(#[$attr:meta])*
        pub enum $name:ident {
            $($variant:ident),+ $(,)?
        }
        default $default:ident;
    ) => {
        $(#[$attr])*
        #[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Every value, in the order of their binary encoding.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn from_u8(value: u8) -> Option<$name> {
                Self::ALL.get(value as usize).copied()
            }

            pub fn as_u8(self) -> u8 {
                self as u8
            }

            pub(crate) fn load<R: Read>(reader: &mut BinaryReader<R>) -> Result<$name> {
                let value = reader.read_u8()?;
                Self::from_u8(value).ok_or_else(|| invalid_enum(stringify!($name), value))
            }
        }

        impl Default for $name {
            fn default() -> $name {
                $name::$default
            }
        }
    };
}

value_enum! {
    pub enum AccessibilityKind {
        Internal,
        InternalProtected,
        None,
        PackagePrivate,
        Private,
        Protected,
        ProtectedInternal,
        Public,
    }
    default None;
}

value_enum! {
    pub enum AnalysisTimeKind {
        Now,
        Before,
        Never,
    }
    default Now;
}

value_enum! {
    pub enum ClassKind {
        Annotation,
        Class,
        Delegate,
        Enum,
        Interface,
        Struct,
        Union,
    }
    default Class;
}

value_enum! {
    pub enum GenericParameterKind {
        Constraint,
        NonType,
        NonTypePack,
        Template,
        TemplatePack,
        Type,
        TypePack,
    }
    default Type;
}

value_enum! {
    /// The source language a graph, or a member of it, was built from.
    pub enum LanguageKind {
        NotSet,
        C,
        Cpp,
        Java,
        Csharp,
        Sql,
        Magic,
        Rpg,
        Python,
        Javascript,
    }
    default NotSet;
}

value_enum! {
    pub enum MethodKind {
        Add,
        Constructor,
        Destructor,
        Get,
        Menu,
        Normal,
        Operator,
        Remove,
        Set,
        Subroutine,
    }
    default Normal;
}

value_enum! {
    pub enum PackageKind {
        Package,
        Module,
    }
    default Package;
}

value_enum! {
    pub enum ParameterKind {
        In,
        InOut,
        Out,
    }
    default In;
}

value_enum! {
    pub enum PointerKind {
        Pointer,
        Reference,
    }
    default Pointer;
}

value_enum! {
    pub enum RealizationLevel {
        Declares,
        Defines,
    }
    default Declares;
}

value_enum! {
    pub enum SimpleTypeKind {
        Boolean,
        Byte,
        Character,
        Decimal,
        Double,
        Float,
        Integer,
        Long,
        Object,
        Short,
        Single,
        String,
        Unicode,
        Unknown,
        UnsignedCharacter,
        UnsignedInteger,
        UnsignedLong,
        UnsignedShort,
        Void,
    }
    default Unknown;
}

value_enum! {
    pub enum TypeArgumentConstraintKind {
        LowerBounded,
        None,
        Unbounded,
        UpperBounded,
    }
    default None;
}

//-------------------------------------------------------------------------------------------------
// Source positions

/// A range of source code, attached to `Member_IsContainedIn` edges.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourcePosition {
    pub realization_level: RealizationLevel,
    pub line: u32,
    pub column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl SourcePosition {
    pub(crate) fn save<W: Write>(&self, writer: &mut BinaryWriter<W>) -> Result<()> {
        writer.write_u8(self.realization_level.as_u8())?;
        writer.write_u32(self.line)?;
        writer.write_u32(self.column)?;
        writer.write_u32(self.end_line)?;
        writer.write_u32(self.end_column)
    }

    pub(crate) fn load<R: Read>(reader: &mut BinaryReader<R>) -> Result<SourcePosition> {
        Ok(SourcePosition {
            realization_level: RealizationLevel::load(reader)?,
            line: reader.read_u32()?,
            column: reader.read_u32()?,
            end_line: reader.read_u32()?,
            end_column: reader.read_u32()?,
        })
    }
}

//-------------------------------------------------------------------------------------------------
// Node kinds

/// The kind of a node.  The declaration order is the binary encoding of the kind.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeKind {
    Base,
    Comment,
    Component,
    ControlFlowBlock,
    Named,
    Attribute,
    AttributeAccess,
    Class,
    ClassGeneric,
    ClassGenericInstance,
    ClassGenericSpec,
    Friendship,
    GenericParameter,
    Member,
    Method,
    MethodCall,
    MethodGeneric,
    MethodGenericInstance,
    MethodGenericSpec,
    Package,
    Parameter,
    Scope,
    FSEntry,
    File,
    FileSystem,
    Folder,
    SimpleType,
    Type,
    TypeFormer,
    TypeFormerArray,
    TypeFormerMethod,
    TypeFormerNonType,
    TypeFormerPointer,
    TypeFormerType,
}

struct KindInfo {
    kind: NodeKind,
    name: &'static str,
    base: Option<NodeKind>,
    is_abstract: bool,
    is_ap_spec: bool,
    is_composite: bool,
}

const fn kind(
    kind: NodeKind,
    name: &'static str,
    base: Option<NodeKind>,
    is_abstract: bool,
    is_ap_spec: bool,
    is_composite: bool,
) -> KindInfo {
    KindInfo {
        kind,
        name,
        base,
        is_abstract,
        is_ap_spec,
        is_composite,
    }
}

use NodeKind as K;

const ABSTRACT: bool = true;
const CONCRETE: bool = false;
const SPEC: bool = true;
const PLAIN: bool = false;
const COMPOSITE: bool = true;
const ATOMIC: bool = false;

#[rustfmt::skip]
static KIND_TABLE: [KindInfo; 34] = [
    kind(K::Base, "Base", None, ABSTRACT, PLAIN, ATOMIC),
    kind(K::Comment, "Comment", Some(K::Base), CONCRETE, SPEC, ATOMIC),
    kind(K::Component, "Component", Some(K::Named), CONCRETE, SPEC, ATOMIC),
    kind(K::ControlFlowBlock, "ControlFlowBlock", Some(K::Base), CONCRETE, PLAIN, ATOMIC),
    kind(K::Named, "Named", Some(K::Base), ABSTRACT, PLAIN, ATOMIC),
    kind(K::Attribute, "Attribute", Some(K::Member), CONCRETE, PLAIN, ATOMIC),
    kind(K::AttributeAccess, "AttributeAccess", Some(K::Base), CONCRETE, SPEC, ATOMIC),
    kind(K::Class, "Class", Some(K::Scope), CONCRETE, PLAIN, ATOMIC),
    kind(K::ClassGeneric, "ClassGeneric", Some(K::Class), CONCRETE, PLAIN, COMPOSITE),
    kind(K::ClassGenericInstance, "ClassGenericInstance", Some(K::Class), CONCRETE, PLAIN, ATOMIC),
    kind(K::ClassGenericSpec, "ClassGenericSpec", Some(K::ClassGeneric), CONCRETE, PLAIN, COMPOSITE),
    kind(K::Friendship, "Friendship", Some(K::Base), CONCRETE, SPEC, ATOMIC),
    kind(K::GenericParameter, "GenericParameter", Some(K::Named), CONCRETE, PLAIN, ATOMIC),
    kind(K::Member, "Member", Some(K::Named), ABSTRACT, PLAIN, ATOMIC),
    kind(K::Method, "Method", Some(K::Scope), CONCRETE, PLAIN, COMPOSITE),
    kind(K::MethodCall, "MethodCall", Some(K::Base), CONCRETE, SPEC, ATOMIC),
    kind(K::MethodGeneric, "MethodGeneric", Some(K::Method), CONCRETE, PLAIN, COMPOSITE),
    kind(K::MethodGenericInstance, "MethodGenericInstance", Some(K::Method), CONCRETE, PLAIN, COMPOSITE),
    kind(K::MethodGenericSpec, "MethodGenericSpec", Some(K::MethodGeneric), CONCRETE, PLAIN, COMPOSITE),
    kind(K::Package, "Package", Some(K::Scope), CONCRETE, PLAIN, ATOMIC),
    kind(K::Parameter, "Parameter", Some(K::Named), CONCRETE, PLAIN, ATOMIC),
    kind(K::Scope, "Scope", Some(K::Member), ABSTRACT, PLAIN, ATOMIC),
    kind(K::FSEntry, "FSEntry", Some(K::Named), ABSTRACT, PLAIN, ATOMIC),
    kind(K::File, "File", Some(K::FSEntry), CONCRETE, PLAIN, ATOMIC),
    kind(K::FileSystem, "FileSystem", Some(K::Named), CONCRETE, SPEC, COMPOSITE),
    kind(K::Folder, "Folder", Some(K::FSEntry), CONCRETE, PLAIN, COMPOSITE),
    kind(K::SimpleType, "SimpleType", Some(K::Base), CONCRETE, SPEC, ATOMIC),
    kind(K::Type, "Type", Some(K::Base), CONCRETE, SPEC, ATOMIC),
    kind(K::TypeFormer, "TypeFormer", Some(K::Base), ABSTRACT, PLAIN, ATOMIC),
    kind(K::TypeFormerArray, "TypeFormerArray", Some(K::TypeFormer), CONCRETE, SPEC, ATOMIC),
    kind(K::TypeFormerMethod, "TypeFormerMethod", Some(K::TypeFormer), CONCRETE, SPEC, ATOMIC),
    kind(K::TypeFormerNonType, "TypeFormerNonType", Some(K::TypeFormer), CONCRETE, SPEC, ATOMIC),
    kind(K::TypeFormerPointer, "TypeFormerPointer", Some(K::TypeFormer), CONCRETE, SPEC, ATOMIC),
    kind(K::TypeFormerType, "TypeFormerType", Some(K::TypeFormer), CONCRETE, SPEC, ATOMIC),
];

/// The edge kinds available on a node of some kind, in the order they are walked.
pub type EdgeKindList = SmallVec<[EdgeKind; 24]>;

impl NodeKind {
    fn info(self) -> &'static KindInfo {
        &KIND_TABLE[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }

    /// Returns the direct base kind of this kind, or `None` for `Base`.
    pub fn base_kind(self) -> Option<NodeKind> {
        self.info().base
    }

    /// Returns whether `self` is `base`, or inherits from it.
    pub fn is_kind_of(self, base: NodeKind) -> bool {
        let mut current = Some(self);
        while let Some(kind) = current {
            if kind == base {
                return true;
            }
            current = kind.info().base;
        }
        false
    }

    /// Returns whether `self` is a proper ancestor of `what`.
    pub fn is_base_kind_of(self, what: NodeKind) -> bool {
        self != what && what.is_kind_of(self)
    }

    /// Abstract kinds only exist as layers of the hierarchy; no node ever has one of them as its
    /// kind.
    pub fn is_abstract(self) -> bool {
        self.info().is_abstract
    }

    /// Returns whether nodes of this kind are _special_: auxiliary value-like nodes that are not
    /// always reachable through containment, and which traversals visit in a dedicated pass.
    pub fn is_ap_spec(self) -> bool {
        self.info().is_ap_spec
    }

    pub fn is_composite(self) -> bool {
        self.info().is_composite
    }

    pub fn is_not_composite(self) -> bool {
        !self.is_composite()
    }

    /// Returns the depth of this kind in the hierarchy (`Base` has depth 0).
    pub fn depth(self) -> usize {
        let mut depth = 0;
        let mut current = self.info().base;
        while let Some(kind) = current {
            depth += 1;
            current = kind.info().base;
        }
        depth
    }

    /// Returns every edge kind available on nodes of this kind.  Edges inherited from base kinds
    /// come first, and edges of the same layer come in declaration order.
    pub fn edge_kinds(self) -> EdgeKindList {
        let mut result = EdgeKind::all()
            .filter(|edge| self.is_kind_of(edge.source_kind()))
            .collect::<EdgeKindList>();
        result.sort_by_key(|edge| (edge.source_kind().depth(), *edge));
        result
    }

    pub fn all() -> impl Iterator<Item = NodeKind> {
        KIND_TABLE.iter().map(|info| info.kind)
    }

    pub fn from_u16(value: u16) -> Option<NodeKind> {
        KIND_TABLE.get(value as usize).map(|info| info.kind)
    }

    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

//-------------------------------------------------------------------------------------------------
// Node attributes

/// Attributes of `Member` nodes.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemberData {
    pub accessibility: AccessibilityKind,
    pub comment_lines: u32,
    pub demangled_name: StrKey,
    pub is_compiler_generated: bool,
    pub is_static: bool,
    pub language: LanguageKind,
    pub mangled_name: StrKey,
}

/// Attributes of `Scope` nodes.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScopeData {
    pub lloc: u32,
    pub loc: u32,
    pub tlloc: u32,
    pub tloc: u32,
    pub is_anonymous: bool,
}

/// Attributes of `Class` nodes and their generic variants.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClassData {
    pub class_kind: ClassKind,
    pub is_abstract: bool,
    pub object_size: u32,
}

/// Attributes of `Method` nodes and their generic variants.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MethodData {
    pub method_kind: MethodKind,
    pub is_abstract: bool,
    pub is_virtual: bool,
    pub nesting_level: u32,
    pub nesting_level_else_if: u32,
    pub number_of_branches: u32,
    pub number_of_statements: u32,
    pub distinct_operands: u32,
    pub distinct_operators: u32,
    pub total_operands: u32,
    pub total_operators: u32,
}

/// Attributes of `Component` nodes.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComponentData {
    pub tlloc: u32,
    pub tloc: u32,
    pub analysis_time: AnalysisTimeKind,
    pub changeset_id: StrKey,
    pub short_name: StrKey,
}

/// Attributes of `File` nodes.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FileData {
    pub cloc: u32,
    pub lloc: u32,
    pub loc: u32,
    pub number_of_branches: u32,
}

/// The kind-specific attributes of a node.  Layers shared by several kinds (such as the `Member`
/// and `Scope` attributes of every class, method and package) are stored in the variant of the
/// most derived kind that needs them.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeData {
    Empty,
    Comment { text: StrKey },
    Component(ComponentData),
    Friendship { grantee: StrKey },
    GenericParameter { kind: GenericParameterKind },
    Parameter { kind: ParameterKind },
    File(FileData),
    Attribute(MemberData),
    Class(MemberData, ScopeData, ClassData),
    Method(MemberData, ScopeData, MethodData),
    Package(MemberData, ScopeData, PackageKind),
    SimpleType { kind: SimpleTypeKind },
    TypeFormerPointer { kind: PointerKind },
}

impl NodeData {
    /// Returns the default attributes of a node of the given kind.
    pub fn for_kind(kind: NodeKind) -> NodeData {
        if kind.is_kind_of(NodeKind::Class) {
            return NodeData::Class(Default::default(), Default::default(), Default::default());
        }
        if kind.is_kind_of(NodeKind::Method) {
            return NodeData::Method(Default::default(), Default::default(), Default::default());
        }
        match kind {
            NodeKind::Comment => NodeData::Comment {
                text: StrKey::EMPTY,
            },
            NodeKind::Component => NodeData::Component(Default::default()),
            NodeKind::Friendship => NodeData::Friendship {
                grantee: StrKey::EMPTY,
            },
            NodeKind::GenericParameter => NodeData::GenericParameter {
                kind: Default::default(),
            },
            NodeKind::Parameter => NodeData::Parameter {
                kind: Default::default(),
            },
            NodeKind::File => NodeData::File(Default::default()),
            NodeKind::Attribute => NodeData::Attribute(Default::default()),
            NodeKind::Package => {
                NodeData::Package(Default::default(), Default::default(), Default::default())
            }
            NodeKind::SimpleType => NodeData::SimpleType {
                kind: Default::default(),
            },
            NodeKind::TypeFormerPointer => NodeData::TypeFormerPointer {
                kind: Default::default(),
            },
            _ => NodeData::Empty,
        }
    }

    fn save<W: Write>(&self, writer: &mut BinaryWriter<W>) -> Result<()> {
        match self {
            NodeData::Empty => Ok(()),
            NodeData::Comment { text } => writer.write_u32(text.as_u32()),
            NodeData::Component(data) => {
                writer.write_u32(data.tlloc)?;
                writer.write_u32(data.tloc)?;
                writer.write_u8(data.analysis_time.as_u8())?;
                writer.write_u32(data.changeset_id.as_u32())?;
                writer.write_u32(data.short_name.as_u32())
            }
            NodeData::Friendship { grantee } => writer.write_u32(grantee.as_u32()),
            NodeData::GenericParameter { kind } => writer.write_u8(kind.as_u8()),
            NodeData::Parameter { kind } => writer.write_u8(kind.as_u8()),
            NodeData::File(data) => {
                writer.write_u32(data.cloc)?;
                writer.write_u32(data.lloc)?;
                writer.write_u32(data.loc)?;
                writer.write_u32(data.number_of_branches)
            }
            NodeData::Attribute(member) => save_member(member, writer),
            NodeData::Class(member, scope, class) => {
                save_member(member, writer)?;
                save_scope(scope, writer)?;
                writer.write_u8(bits(&[class.is_abstract]))?;
                writer.write_u8(class.class_kind.as_u8())?;
                writer.write_u32(class.object_size)
            }
            NodeData::Method(member, scope, method) => {
                save_member(member, writer)?;
                save_scope(scope, writer)?;
                writer.write_u8(bits(&[method.is_abstract, method.is_virtual]))?;
                writer.write_u8(method.method_kind.as_u8())?;
                writer.write_u32(method.nesting_level)?;
                writer.write_u32(method.nesting_level_else_if)?;
                writer.write_u32(method.number_of_branches)?;
                writer.write_u32(method.number_of_statements)?;
                writer.write_u32(method.distinct_operands)?;
                writer.write_u32(method.distinct_operators)?;
                writer.write_u32(method.total_operands)?;
                writer.write_u32(method.total_operators)
            }
            NodeData::Package(member, scope, kind) => {
                save_member(member, writer)?;
                save_scope(scope, writer)?;
                writer.write_u8(kind.as_u8())
            }
            NodeData::SimpleType { kind } => writer.write_u8(kind.as_u8()),
            NodeData::TypeFormerPointer { kind } => writer.write_u8(kind.as_u8()),
        }
    }

    fn load<R: Read>(&mut self, reader: &mut BinaryReader<R>) -> Result<()> {
        match self {
            NodeData::Empty => {}
            NodeData::Comment { text } => *text = read_key(reader)?,
            NodeData::Component(data) => {
                data.tlloc = reader.read_u32()?;
                data.tloc = reader.read_u32()?;
                data.analysis_time = AnalysisTimeKind::load(reader)?;
                data.changeset_id = read_key(reader)?;
                data.short_name = read_key(reader)?;
            }
            NodeData::Friendship { grantee } => *grantee = read_key(reader)?,
            NodeData::GenericParameter { kind } => *kind = GenericParameterKind::load(reader)?,
            NodeData::Parameter { kind } => *kind = ParameterKind::load(reader)?,
            NodeData::File(data) => {
                data.cloc = reader.read_u32()?;
                data.lloc = reader.read_u32()?;
                data.loc = reader.read_u32()?;
                data.number_of_branches = reader.read_u32()?;
            }
            NodeData::Attribute(member) => load_member(member, reader)?,
            NodeData::Class(member, scope, class) => {
                load_member(member, reader)?;
                load_scope(scope, reader)?;
                let flags = reader.read_u8()?;
                class.is_abstract = flags & 1 != 0;
                class.class_kind = ClassKind::load(reader)?;
                class.object_size = reader.read_u32()?;
            }
            NodeData::Method(member, scope, method) => {
                load_member(member, reader)?;
                load_scope(scope, reader)?;
                let flags = reader.read_u8()?;
                method.is_abstract = flags & 2 != 0;
                method.is_virtual = flags & 1 != 0;
                method.method_kind = MethodKind::load(reader)?;
                method.nesting_level = reader.read_u32()?;
                method.nesting_level_else_if = reader.read_u32()?;
                method.number_of_branches = reader.read_u32()?;
                method.number_of_statements = reader.read_u32()?;
                method.distinct_operands = reader.read_u32()?;
                method.distinct_operators = reader.read_u32()?;
                method.total_operands = reader.read_u32()?;
                method.total_operators = reader.read_u32()?;
            }
            NodeData::Package(member, scope, kind) => {
                load_member(member, reader)?;
                load_scope(scope, reader)?;
                *kind = PackageKind::load(reader)?;
            }
            NodeData::SimpleType { kind } => *kind = SimpleTypeKind::load(reader)?,
            NodeData::TypeFormerPointer { kind } => *kind = PointerKind::load(reader)?,
        }
        Ok(())
    }
}

// Packs boolean attributes into one byte, first flag in the highest used bit.
fn bits(flags: &[bool]) -> u8 {
    flags
        .iter()
        .fold(0u8, |acc, flag| (acc << 1) | (*flag as u8))
}

fn read_key<R: Read>(reader: &mut BinaryReader<R>) -> Result<StrKey> {
    Ok(StrKey::from_u32(reader.read_u32()?))
}

fn save_member<W: Write>(member: &MemberData, writer: &mut BinaryWriter<W>) -> Result<()> {
    writer.write_u8(bits(&[member.is_compiler_generated, member.is_static]))?;
    writer.write_u8(member.accessibility.as_u8())?;
    writer.write_u32(member.comment_lines)?;
    writer.write_u32(member.demangled_name.as_u32())?;
    writer.write_u8(member.language.as_u8())?;
    writer.write_u32(member.mangled_name.as_u32())
}

fn load_member<R: Read>(member: &mut MemberData, reader: &mut BinaryReader<R>) -> Result<()> {
    let flags = reader.read_u8()?;
    member.is_static = flags & 1 != 0;
    member.is_compiler_generated = flags & 2 != 0;
    member.accessibility = AccessibilityKind::load(reader)?;
    member.comment_lines = reader.read_u32()?;
    member.demangled_name = read_key(reader)?;
    member.language = LanguageKind::load(reader)?;
    member.mangled_name = read_key(reader)?;
    Ok(())
}

fn save_scope<W: Write>(scope: &ScopeData, writer: &mut BinaryWriter<W>) -> Result<()> {
    writer.write_u32(scope.lloc)?;
    writer.write_u32(scope.loc)?;
    writer.write_u32(scope.tlloc)?;
    writer.write_u32(scope.tloc)?;
    writer.write_bool(scope.is_anonymous)
}

fn load_scope<R: Read>(scope: &mut ScopeData, reader: &mut BinaryReader<R>) -> Result<()> {
    scope.lloc = reader.read_u32()?;
    scope.loc = reader.read_u32()?;
    scope.tlloc = reader.read_u32()?;
    scope.tloc = reader.read_u32()?;
    scope.is_anonymous = reader.read_bool()?;
    Ok(())
}

//-------------------------------------------------------------------------------------------------
// Nodes

#[derive(Clone, Debug)]
struct EdgeSlot {
    kind: EdgeKind,
    targets: Vec<EdgeTarget>,
}

/// A node of a LIM graph.
///
/// Nodes are created and owned by the [`Factory`][]; you can read a node's attributes and edges
/// through a shared reference, and change its attributes through a mutable one.  Edges can only
/// be changed through the factory, which keeps parents and the reverse edge index in sync.
///
/// [`Factory`]: ../factory/struct.Factory.html
#[derive(Clone, Debug)]
pub struct Node {
    id: NodeId,
    kind: NodeKind,
    parent: ControlledOption<NodeId>,
    parent_edge: Option<EdgeKind>,
    name: StrKey,
    data: NodeData,
    edges: Vec<EdgeSlot>,
}

impl Node {
    pub(crate) fn new(id: NodeId, kind: NodeKind) -> Node {
        Node {
            id,
            kind,
            parent: ControlledOption::none(),
            parent_edge: None,
            name: StrKey::EMPTY,
            data: NodeData::for_kind(kind),
            edges: edge_slots(kind),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Returns whether this node's kind is `kind` or inherits from it.
    pub fn is(&self, kind: NodeKind) -> bool {
        self.kind.is_kind_of(kind)
    }

    pub fn is_named(&self) -> bool {
        self.is(NodeKind::Named)
    }

    pub fn is_member(&self) -> bool {
        self.is(NodeKind::Member)
    }

    pub fn is_scope(&self) -> bool {
        self.is(NodeKind::Scope)
    }

    pub fn is_class(&self) -> bool {
        self.is(NodeKind::Class)
    }

    pub fn is_method(&self) -> bool {
        self.is(NodeKind::Method)
    }

    pub fn is_fs_entry(&self) -> bool {
        self.is(NodeKind::FSEntry)
    }

    pub fn is_type_former(&self) -> bool {
        self.is(NodeKind::TypeFormer)
    }

    pub fn is_ap_spec(&self) -> bool {
        self.kind.is_ap_spec()
    }

    /// Returns the node that contains this one, if any.  Nodes without a parent are _individually
    /// rooted_.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent.into_option()
    }

    /// Returns the containment edge kind through which the parent reaches this node.
    pub fn parent_edge(&self) -> Option<EdgeKind> {
        self.parent_edge
    }

    pub(crate) fn set_parent(&mut self, parent: Option<(NodeId, EdgeKind)>) {
        match parent {
            Some((id, edge)) => {
                self.parent = ControlledOption::some(id);
                self.parent_edge = Some(edge);
            }
            None => {
                self.parent = ControlledOption::none();
                self.parent_edge = None;
            }
        }
    }

    /// Returns the name of a `Named` node.  Other nodes have the empty name.
    pub fn name(&self) -> StrKey {
        self.name
    }

    /// Sets the name of a `Named` node.  Setting the name of any other kind of node has no effect.
    pub fn set_name(&mut self, name: StrKey) {
        if self.is_named() {
            self.name = name;
        }
    }

    pub fn data(&self) -> &NodeData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut NodeData {
        &mut self.data
    }

    pub fn member(&self) -> Option<&MemberData> {
        match &self.data {
            NodeData::Attribute(member)
            | NodeData::Class(member, _, _)
            | NodeData::Method(member, _, _)
            | NodeData::Package(member, _, _) => Some(member),
            _ => None,
        }
    }

    pub fn member_mut(&mut self) -> Option<&mut MemberData> {
        match &mut self.data {
            NodeData::Attribute(member)
            | NodeData::Class(member, _, _)
            | NodeData::Method(member, _, _)
            | NodeData::Package(member, _, _) => Some(member),
            _ => None,
        }
    }

    pub fn scope(&self) -> Option<&ScopeData> {
        match &self.data {
            NodeData::Class(_, scope, _)
            | NodeData::Method(_, scope, _)
            | NodeData::Package(_, scope, _) => Some(scope),
            _ => None,
        }
    }

    pub fn scope_mut(&mut self) -> Option<&mut ScopeData> {
        match &mut self.data {
            NodeData::Class(_, scope, _)
            | NodeData::Method(_, scope, _)
            | NodeData::Package(_, scope, _) => Some(scope),
            _ => None,
        }
    }

    pub fn class(&self) -> Option<&ClassData> {
        match &self.data {
            NodeData::Class(_, _, class) => Some(class),
            _ => None,
        }
    }

    pub fn class_mut(&mut self) -> Option<&mut ClassData> {
        match &mut self.data {
            NodeData::Class(_, _, class) => Some(class),
            _ => None,
        }
    }

    pub fn method(&self) -> Option<&MethodData> {
        match &self.data {
            NodeData::Method(_, _, method) => Some(method),
            _ => None,
        }
    }

    pub fn method_mut(&mut self) -> Option<&mut MethodData> {
        match &mut self.data {
            NodeData::Method(_, _, method) => Some(method),
            _ => None,
        }
    }

    pub fn component(&self) -> Option<&ComponentData> {
        match &self.data {
            NodeData::Component(component) => Some(component),
            _ => None,
        }
    }

    pub fn component_mut(&mut self) -> Option<&mut ComponentData> {
        match &mut self.data {
            NodeData::Component(component) => Some(component),
            _ => None,
        }
    }

    pub fn file(&self) -> Option<&FileData> {
        match &self.data {
            NodeData::File(file) => Some(file),
            _ => None,
        }
    }

    pub fn file_mut(&mut self) -> Option<&mut FileData> {
        match &mut self.data {
            NodeData::File(file) => Some(file),
            _ => None,
        }
    }

    /// Returns the text of a `Comment` node.
    pub fn comment_text(&self) -> Option<StrKey> {
        match &self.data {
            NodeData::Comment { text } => Some(*text),
            _ => None,
        }
    }

    pub fn simple_type_kind(&self) -> Option<SimpleTypeKind> {
        match &self.data {
            NodeData::SimpleType { kind } => Some(*kind),
            _ => None,
        }
    }

    pub fn pointer_kind(&self) -> Option<PointerKind> {
        match &self.data {
            NodeData::TypeFormerPointer { kind } => Some(*kind),
            _ => None,
        }
    }

    //---------------------------------------------------------------------------------------------
    // Edges

    /// Returns the edge kinds available on this node, in the order they are walked.
    pub fn edge_kinds(&self) -> impl Iterator<Item = EdgeKind> + '_ {
        self.edges.iter().map(|slot| slot.kind)
    }

    /// Returns whether edges of the given kind can start at this node.
    pub fn has_edge_kind(&self, kind: EdgeKind) -> bool {
        self.slot(kind).is_some()
    }

    /// Returns the targets of this node's edges of the given kind, in insertion order.  Nodes
    /// that cannot have edges of that kind return an empty slice.
    pub fn edges(&self, kind: EdgeKind) -> &[EdgeTarget] {
        match self.slot(kind) {
            Some(slot) => &slot.targets,
            None => &[],
        }
    }

    /// Returns the target of a single-valued edge kind.
    pub fn single_edge(&self, kind: EdgeKind) -> Option<NodeId> {
        self.edges(kind).first().map(|target| target.id)
    }

    /// Returns an iterator over all of this node's outgoing edges, in the order they are walked.
    pub fn iter_edges(&self) -> impl Iterator<Item = Edge> + '_ {
        let source = self.id;
        self.edges.iter().flat_map(move |slot| {
            slot.targets.iter().map(move |target| Edge {
                kind: slot.kind,
                source,
                target: target.id,
                assoc: target.assoc,
            })
        })
    }

    fn slot(&self, kind: EdgeKind) -> Option<&EdgeSlot> {
        self.edges.iter().find(|slot| slot.kind == kind)
    }

    fn slot_mut(&mut self, kind: EdgeKind) -> Option<&mut EdgeSlot> {
        self.edges.iter_mut().find(|slot| slot.kind == kind)
    }

    /// Appends an edge.  For single-valued edge kinds the previous target is replaced, and is
    /// returned.
    pub(crate) fn push_edge(&mut self, kind: EdgeKind, target: EdgeTarget) -> Option<EdgeTarget> {
        let slot = self.slot_mut(kind)?;
        if kind.is_single() {
            let previous = slot.targets.pop();
            slot.targets.push(target);
            previous
        } else {
            slot.targets.push(target);
            None
        }
    }

    /// Removes the first edge of the given kind pointing to `target`.
    pub(crate) fn remove_edge(&mut self, kind: EdgeKind, target: NodeId) -> Option<EdgeTarget> {
        let slot = self.slot_mut(kind)?;
        let index = slot.targets.iter().position(|t| t.id == target)?;
        Some(slot.targets.remove(index))
    }

    /// Changes the kind of this node, keeping its id, attributes and edges.  The caller is
    /// responsible for only widening kinds along the hierarchy.
    pub(crate) fn promote(&mut self, kind: NodeKind) {
        let mut slots = edge_slots(kind);
        for slot in slots.iter_mut() {
            if let Some(old) = self.slot_mut(slot.kind) {
                slot.targets = std::mem::take(&mut old.targets);
            }
        }
        self.kind = kind;
        self.edges = slots;
    }

    //---------------------------------------------------------------------------------------------
    // Serialization

    /// Writes the kind-specific payload of this node: its attributes, layer by layer, followed by
    /// its edges.  Multi-valued edge lists are terminated by a `0` id.
    pub(crate) fn save<W: Write>(&self, writer: &mut BinaryWriter<W>) -> Result<()> {
        if self.is_named() {
            writer.write_u32(self.name.as_u32())?;
        }
        self.data.save(writer)?;
        for slot in &self.edges {
            if slot.kind.is_single() {
                writer.write_node_id(slot.targets.first().map(|target| target.id))?;
                continue;
            }
            for target in &slot.targets {
                writer.write_u32(target.id.as_u32())?;
                if let Some(assoc) = target.assoc {
                    assoc.save(writer)?;
                }
            }
            writer.write_u32(0)?;
        }
        Ok(())
    }

    /// Reads a payload written by [`save`][].  Edge targets are stored as they are read; they may
    /// refer to nodes that have not been loaded yet.
    ///
    /// [`save`]: #method.save
    pub(crate) fn load<R: Read>(&mut self, reader: &mut BinaryReader<R>) -> Result<()> {
        if self.is_named() {
            self.name = read_key(reader)?;
        }
        self.data.load(reader)?;
        for slot in self.edges.iter_mut() {
            if slot.kind.is_single() {
                if let Some(id) = reader.read_node_id()? {
                    slot.targets.push(EdgeTarget::new(id));
                }
                continue;
            }
            while let Some(id) = reader.read_node_id()? {
                let assoc = AssocValue::load(slot.kind.assoc(), reader)?;
                slot.targets.push(EdgeTarget { id, assoc });
            }
        }
        Ok(())
    }
}

fn edge_slots(kind: NodeKind) -> Vec<EdgeSlot> {
    kind.edge_kinds()
        .into_iter()
        .map(|kind| EdgeSlot {
            kind,
            targets: Vec::new(),
        })
        .collect()
}
