// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2021, stack-graphs authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

use lim::arena::NodeId;
use lim::edges::AssocValue;
use lim::edges::EdgeKind;
use lim::factory::Factory;
use lim::factory::FILE_SYSTEM_ID;
use lim::factory::ROOT_ID;
use lim::factory::SYSTEM_COMPONENT_ID;
use lim::nodes::LanguageKind;
use lim::nodes::NodeKind;
use lim::nodes::PointerKind;
use lim::nodes::SimpleTypeKind;
use lim::LimError;
use pretty_assertions::assert_eq;

use crate::util::add_member;
use crate::util::create_named;
use crate::util::create_sample_graph;

fn children(factory: &Factory, id: NodeId, edge: EdgeKind) -> Vec<String> {
    factory
        .get_ref(id)
        .unwrap()
        .edges(edge)
        .iter()
        .map(|target| factory.get_name(target.id).unwrap().to_string())
        .collect()
}

#[test]
fn new_factories_contain_the_reserved_nodes() {
    let factory = Factory::new(LanguageKind::Cpp);
    assert_eq!(factory.get_root(), ROOT_ID);
    assert_eq!(factory.get_file_system(), FILE_SYSTEM_ID);
    assert_eq!(factory.get_system_component(), SYSTEM_COMPONENT_ID);
    assert_eq!(factory.get_ref(ROOT_ID).unwrap().kind(), NodeKind::Package);
    assert_eq!(factory.get_name(ROOT_ID).unwrap(), "global namespace");
    assert_eq!(factory.get_name(FILE_SYSTEM_ID).unwrap(), "FileSystem");
    assert_eq!(factory.get_name(SYSTEM_COMPONENT_ID).unwrap(), "<System>");
    assert_eq!(factory.size(), 103);
    assert_eq!(factory.iter().count(), 3);
    // Ids below the reserved nodes are holes.
    assert!(factory.get_ref(NodeId::new(50).unwrap()).is_none());
    assert_eq!(factory.language(), LanguageKind::Cpp);
}

#[test]
fn can_create_nodes() {
    let mut factory = Factory::new(LanguageKind::Java);
    let class = factory.create_node(NodeKind::Class).unwrap();
    let method = factory.create_method_node();
    assert_eq!(class.as_u32(), 103);
    assert_eq!(method.as_u32(), 104);
    assert_eq!(factory.size(), 105);
    assert_eq!(factory.get_ref(class).unwrap().kind(), NodeKind::Class);
    assert_eq!(factory.get_ref(method).unwrap().parent(), None);
    assert!(!factory.get_is_filtered(class));
}

#[test]
fn cannot_create_nodes_of_unsupported_kinds() {
    let mut factory = Factory::new(LanguageKind::Java);
    for kind in [NodeKind::Named, NodeKind::SimpleType, NodeKind::Comment, NodeKind::Type] {
        assert!(matches!(
            factory.create_node(kind),
            Err(LimError::InvalidNodeKind { .. })
        ));
    }
    assert_eq!(factory.size(), 103);
}

#[test]
fn can_create_nodes_with_specific_ids() {
    let mut factory = Factory::new(LanguageKind::Java);
    let id = NodeId::new(500).unwrap();
    factory.create_node_with_id(NodeKind::Type, id).unwrap();
    assert_eq!(factory.size(), 501);
    assert_eq!(factory.get_ref(id).unwrap().kind(), NodeKind::Type);
    // The next automatically assigned id follows the largest one.
    assert_eq!(factory.create_class_node().as_u32(), 501);

    assert!(factory.create_node_with_id(NodeKind::Type, id).is_err());
    assert!(matches!(
        factory.create_node_with_id(NodeKind::Scope, NodeId::new(600).unwrap()),
        Err(LimError::InvalidNodeKind { .. })
    ));
    assert!(matches!(
        factory.create_node_with_id(NodeKind::Class, NodeId::new(1).unwrap()),
        Err(LimError::InvalidNodeId { id: 1, .. })
    ));
}

#[test]
fn can_create_singleton_nodes() {
    let mut factory = Factory::new(LanguageKind::Java);
    let int1 = factory.create_simple_type(SimpleTypeKind::Integer);
    let int2 = factory.create_simple_type(SimpleTypeKind::Integer);
    let long = factory.create_simple_type(SimpleTypeKind::Long);
    assert_eq!(int1, int2);
    assert_ne!(int1, long);

    let pointer = factory.create_type_former_pointer(PointerKind::Pointer);
    let reference = factory.create_type_former_pointer(PointerKind::Reference);
    assert_ne!(pointer, reference);
    assert_eq!(pointer, factory.create_type_former_pointer(PointerKind::Pointer));
    assert_eq!(
        factory.get_ref(reference).unwrap().pointer_kind(),
        Some(PointerKind::Reference)
    );

    let array = factory.create_type_former_array();
    assert_eq!(array, factory.create_type_former_array());
    let non_type = factory.create_type_former_non_type();
    assert_eq!(non_type, factory.create_type_former_non_type());

    let refers_to_int = factory.create_type_former_type(Some(int1)).unwrap();
    assert_eq!(refers_to_int, factory.create_type_former_type(Some(int1)).unwrap());
    assert_ne!(refers_to_int, factory.create_type_former_type(Some(long)).unwrap());
    assert_eq!(
        factory
            .get_ref(refers_to_int)
            .unwrap()
            .single_edge(EdgeKind::TypeFormerType_RefersTo),
        Some(int1)
    );

    let comment = factory.create_comment("hello");
    assert_eq!(comment, factory.create_comment("hello"));
    assert_ne!(comment, factory.create_comment("there"));

    let component = factory.create_component("app.jar");
    assert_eq!(component, factory.create_component("app.jar"));
    assert_eq!(factory.create_component("<System>"), SYSTEM_COMPONENT_ID);

    let method = factory.create_method_node();
    let call = factory.create_method_call(method).unwrap();
    assert_eq!(call, factory.create_method_call(method).unwrap());
    let attribute = factory.create_attribute_node();
    let access = factory.create_attribute_access(attribute).unwrap();
    assert_eq!(access, factory.create_attribute_access(attribute).unwrap());
    assert_ne!(call, access);
}

#[test]
fn singleton_targets_must_have_the_right_kind() {
    let mut factory = Factory::new(LanguageKind::Java);
    let class = factory.create_class_node();
    let size = factory.size();
    assert!(matches!(
        factory.create_method_call(class),
        Err(LimError::InvalidNodeKind { .. })
    ));
    assert!(factory.create_attribute_access(class).is_err());
    assert_eq!(factory.size(), size);
}

#[test]
fn can_build_types() {
    let mut factory = Factory::new(LanguageKind::Java);
    let array = factory.create_type_former_array();
    let pointer = factory.create_type_former_pointer(PointerKind::Pointer);

    let mut builder = factory.begin_type();
    builder.add_type_former(array).add_type_former(pointer);
    let array_pointer = factory.end_type(builder).unwrap();

    let mut builder = factory.begin_type();
    builder.add_type_former(array).add_type_former(pointer);
    assert_eq!(factory.end_type(builder).unwrap(), array_pointer);

    let mut builder = factory.begin_type();
    builder.add_type_former(pointer).add_type_former(array);
    let pointer_array = factory.end_type(builder).unwrap();
    assert_ne!(pointer_array, array_pointer);

    // Type formers are owned in the order they are popped off the stack.
    let formers = factory
        .get_ref(array_pointer)
        .unwrap()
        .edges(EdgeKind::Type_HasTypeFormer)
        .iter()
        .map(|target| target.id)
        .collect::<Vec<_>>();
    assert_eq!(formers, vec![pointer, array]);
}

#[test]
fn cannot_build_types_from_nothing() {
    let mut factory = Factory::new(LanguageKind::Java);
    let builder = factory.begin_type();
    assert!(matches!(
        factory.end_type(builder),
        Err(LimError::EmptyStack { .. })
    ));

    let class = factory.create_class_node();
    let mut builder = factory.begin_type();
    builder.add_type_former(class);
    assert!(matches!(
        factory.end_type(builder),
        Err(LimError::InvalidNodeKind {
            kind: NodeKind::Class,
            ..
        })
    ));
}

#[test]
fn can_create_files() {
    let mut factory = Factory::new(LanguageKind::Csharp);
    let c = factory.create_file("a\\b\\c.cs").unwrap();
    let d = factory.create_file("a\\b\\d.cs").unwrap();
    assert_ne!(c, d);
    assert_eq!(c, factory.create_file("a\\b\\c.cs").unwrap());

    let file_system = factory.get_file_system();
    assert_eq!(
        children(&factory, file_system, EdgeKind::FileSystem_HasFSEntry),
        vec!["a"]
    );
    let a = factory.get_ref(file_system).unwrap().edges(EdgeKind::FileSystem_HasFSEntry)[0].id;
    assert_eq!(children(&factory, a, EdgeKind::Folder_Contains), vec!["b"]);
    let b = factory.get_ref(c).unwrap().parent().unwrap();
    assert_eq!(factory.get_ref(d).unwrap().parent(), Some(b));
    assert_eq!(
        children(&factory, b, EdgeKind::Folder_Contains),
        vec!["c.cs", "d.cs"]
    );
    assert_eq!(factory.get_ref(c).unwrap().kind(), NodeKind::File);
    assert_eq!(factory.get_ref(b).unwrap().kind(), NodeKind::Folder);

    assert_eq!(factory.full_path(d, "\\").unwrap(), "a\\b\\d.cs");
    assert_eq!(factory.full_path(b, "/").unwrap(), "a/b");
}

#[test]
fn can_create_files_with_rooted_paths() {
    let mut factory = Factory::new(LanguageKind::Csharp);
    let file = factory.create_file("\\src\\main.c").unwrap();
    assert_eq!(factory.full_path(file, "\\").unwrap(), "\\src\\main.c");
    let bare = factory.create_file("main.c").unwrap();
    assert_ne!(bare, file);
    assert_eq!(factory.full_path(bare, "/").unwrap(), "main.c");
}

#[test]
fn can_create_files_relative_to_a_folder() {
    let mut factory = Factory::new(LanguageKind::Csharp);
    let file = factory.create_file("a\\b.cs").unwrap();
    let a = factory.get_ref(file).unwrap().parent().unwrap();
    let nested = factory.create_file_from("c\\d.cs", a).unwrap();
    assert_eq!(factory.full_path(nested, "/").unwrap(), "a/c/d.cs");
}

#[test]
fn cannot_create_files_with_invalid_paths() {
    let mut factory = Factory::new(LanguageKind::Csharp);
    assert!(matches!(
        factory.create_file("a\\\\b.cs"),
        Err(LimError::EmptyFolderName { .. })
    ));
    let file = factory.create_file("a\\b.cs").unwrap();
    assert!(matches!(
        factory.create_file_from("c.cs", file),
        Err(LimError::InvalidNodeKind {
            kind: NodeKind::File,
            ..
        })
    ));
    assert!(matches!(
        factory.create_file_from("c.cs", NodeId::new(9999).unwrap()),
        Err(LimError::InvalidNodeId { id: 9999, .. })
    ));
}

#[test]
fn containment_edges_set_parents() {
    let mut factory = Factory::new(LanguageKind::Java);
    let sample = create_sample_graph(&mut factory);
    assert_eq!(
        factory.get_ref(sample.package).unwrap().parent(),
        Some(factory.get_root())
    );
    let method = factory.get_ref(sample.method).unwrap();
    assert_eq!(method.parent(), Some(sample.class));
    assert_eq!(method.parent_edge(), Some(EdgeKind::Scope_HasMember));
    let parameter = factory.get_ref(sample.parameter).unwrap();
    assert_eq!(parameter.parent(), Some(sample.method));
    // Cross edges don't.
    assert_eq!(factory.get_ref(sample.call).unwrap().parent(), None);

    assert!(factory
        .remove_edge(EdgeKind::Scope_HasMember, sample.class, sample.method)
        .unwrap());
    assert_eq!(factory.get_ref(sample.method).unwrap().parent(), None);
    assert!(!factory
        .remove_edge(EdgeKind::Scope_HasMember, sample.class, sample.method)
        .unwrap());
}

#[test]
fn edges_are_validated() {
    let mut factory = Factory::new(LanguageKind::Java);
    let sample = create_sample_graph(&mut factory);
    assert!(matches!(
        factory.add_edge(EdgeKind::Scope_HasMember, sample.parameter, sample.class),
        Err(LimError::InvalidEdge {
            edge: EdgeKind::Scope_HasMember,
            kind: NodeKind::Parameter,
            ..
        })
    ));
    assert!(matches!(
        factory.add_edge(EdgeKind::Method_Calls, sample.method, sample.class),
        Err(LimError::InvalidNodeKind {
            kind: NodeKind::Class,
            ..
        })
    ));
    assert!(matches!(
        factory.add_edge(EdgeKind::Method_Calls, sample.method, NodeId::new(9999).unwrap()),
        Err(LimError::InvalidNodeId { .. })
    ));
    // Assoc edges need a value of the right kind.
    assert!(factory
        .add_edge(EdgeKind::Member_IsContainedIn, sample.class, sample.file)
        .is_err());
    let app = factory.strings().lookup("app").unwrap();
    assert!(factory
        .add_assoc_edge(
            EdgeKind::Member_IsContainedIn,
            sample.class,
            sample.file,
            AssocValue::String(app),
        )
        .is_err());
    assert!(factory
        .set_edge(EdgeKind::Method_Calls, sample.method, Some(sample.call))
        .is_err());
}

#[test]
fn edge_lists_keep_insertion_order() {
    let mut factory = Factory::new(LanguageKind::Java);
    let class = create_named(&mut factory, NodeKind::Class, "C");
    let names = ["z", "a", "m"];
    for name in &names {
        let member = create_named(&mut factory, NodeKind::Attribute, name);
        add_member(&mut factory, class, member);
    }
    assert_eq!(children(&factory, class, EdgeKind::Scope_HasMember), names);
}

#[test]
fn single_edges_replace_their_target() {
    let mut factory = Factory::new(LanguageKind::Java);
    let sample = create_sample_graph(&mut factory);
    let long = factory.create_simple_type(SimpleTypeKind::Long);
    let long_former = factory.create_type_former_type(Some(long)).unwrap();
    let mut builder = factory.begin_type();
    builder.add_type_former(long_former);
    let long_type = factory.end_type(builder).unwrap();

    factory
        .set_edge(EdgeKind::Parameter_HasType, sample.parameter, Some(long_type))
        .unwrap();
    let parameter = factory.get_ref(sample.parameter).unwrap();
    assert_eq!(parameter.edges(EdgeKind::Parameter_HasType).len(), 1);
    assert_eq!(
        parameter.single_edge(EdgeKind::Parameter_HasType),
        Some(long_type)
    );

    factory
        .set_edge(EdgeKind::Parameter_HasType, sample.parameter, None)
        .unwrap();
    assert_eq!(
        factory
            .get_ref(sample.parameter)
            .unwrap()
            .single_edge(EdgeKind::Parameter_HasType),
        None
    );
}

#[test]
fn can_replace_nodes_with_generic_ones() {
    let mut factory = Factory::new(LanguageKind::Java);
    let sample = create_sample_graph(&mut factory);
    factory
        .get_mut(sample.class)
        .unwrap()
        .scope_mut()
        .unwrap()
        .loc = 10;

    factory
        .replace_node(sample.class, NodeKind::ClassGeneric)
        .unwrap();
    let class = factory.get_ref(sample.class).unwrap();
    assert_eq!(class.kind(), NodeKind::ClassGeneric);
    assert_eq!(class.scope().unwrap().loc, 10);
    assert_eq!(class.parent(), Some(sample.package));
    assert_eq!(children(&factory, sample.class, EdgeKind::Scope_HasMember), vec!["run", "count"]);

    let parameter = create_named(&mut factory, NodeKind::GenericParameter, "T");
    factory
        .add_edge(
            EdgeKind::ClassGeneric_HasGenericParameter,
            sample.class,
            parameter,
        )
        .unwrap();

    factory
        .replace_node(sample.method, NodeKind::MethodGeneric)
        .unwrap();
    assert!(matches!(
        factory.replace_node(sample.package, NodeKind::ClassGeneric),
        Err(LimError::InvalidNodeKind { .. })
    ));
    assert_eq!(
        factory.get_ref(sample.package).unwrap().kind(),
        NodeKind::Package
    );
}

#[test]
fn only_named_nodes_have_names() {
    let mut factory = Factory::new(LanguageKind::Java);
    let block = factory.create_control_flow_block_node();
    assert!(matches!(
        factory.set_name(block, "block"),
        Err(LimError::InvalidNodeKind { .. })
    ));
    assert_eq!(factory.get_name(block).unwrap(), "");
}
