// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2021, stack-graphs authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

use std::fs;
use std::path::Path;

use enumset::EnumSet;
use lim::edges::Edge;
use lim::factory::Factory;
use lim::factory::ROOT_ID;
use lim::io::AsgValidationKind;
use lim::io::BinaryWriter;
use lim::io::HeaderData;
use lim::io::HeaderKind;
use lim::io::PropertyData;
use lim::io::API_VERSION;
use lim::io::BINARY_VERSION;
use lim::io::FILE_TYPE;
use lim::io::MAGIC;
use lim::io::PROPERTY_API_VERSION;
use lim::io::PROPERTY_BINARY_VERSION;
use lim::io::PROPERTY_LANGUAGE;
use lim::io::PROPERTY_TYPE;
use lim::nodes::LanguageKind;
use lim::nodes::NodeKind;
use lim::nodes::SimpleTypeKind;
use lim::overrides::OverrideRelations;
use lim::LimError;
use pretty_assertions::assert_eq;

use crate::util::create_named;
use crate::util::create_sample_graph;
use crate::util::init_logging;

fn write_properties_only(path: &Path, properties: &PropertyData) {
    let mut writer = BinaryWriter::new(Vec::new());
    writer.write_bytes(MAGIC).unwrap();
    writer.write_u32(1).unwrap();
    writer
        .write_u16(HeaderKind::PropertyData.as_u16())
        .unwrap();
    writer.write_block(|block| properties.save(block)).unwrap();
    writer.write_u32(0).unwrap();
    writer.write_u16(0).unwrap();
    fs::write(path, writer.into_inner()).unwrap();
}

fn valid_properties() -> PropertyData {
    let mut properties = PropertyData::new();
    properties.add(PROPERTY_TYPE, FILE_TYPE);
    properties.add(PROPERTY_API_VERSION, API_VERSION);
    properties.add(PROPERTY_BINARY_VERSION, BINARY_VERSION);
    properties.add_int(PROPERTY_LANGUAGE, LanguageKind::Java.as_u8() as i32);
    properties
}

#[test]
fn can_save_and_load_graphs() -> anyhow::Result<()> {
    init_logging();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("graph.lim");

    let mut factory = Factory::new(LanguageKind::Java);
    create_sample_graph(&mut factory);
    factory.save(&path, &mut [])?;

    let mut loaded = Factory::new(LanguageKind::Cpp);
    loaded.load(&path, &mut [])?;
    assert_eq!(loaded.language(), LanguageKind::Java);
    assert_eq!(loaded.size(), factory.size());
    assert_eq!(loaded.iter().count(), factory.iter().count());
    assert_eq!(loaded.get_root(), ROOT_ID);
    assert_eq!(loaded.get_file_system(), factory.get_file_system());
    assert_eq!(loaded.get_system_component(), factory.get_system_component());
    for node in factory.iter() {
        let id = node.id();
        let copy = loaded.node("test", id)?;
        assert_eq!(copy.kind(), node.kind());
        assert_eq!(copy.parent(), node.parent());
        assert_eq!(copy.parent_edge(), node.parent_edge());
        assert_eq!(copy.data(), node.data());
        assert_eq!(loaded.get_name(id)?, factory.get_name(id)?);
        assert_eq!(
            copy.iter_edges().collect::<Vec<Edge>>(),
            node.iter_edges().collect::<Vec<Edge>>()
        );
    }
    for (key, value) in factory.strings().iter() {
        assert_eq!(loaded.strings().get(key)?, value);
    }
    Ok(())
}

#[test]
fn loaded_graphs_keep_their_singletons_unique() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.lim");

    let mut factory = Factory::new(LanguageKind::Java);
    let sample = create_sample_graph(&mut factory);
    factory.save(&path, &mut []).unwrap();

    let mut loaded = Factory::new(LanguageKind::Java);
    loaded.load(&path, &mut []).unwrap();
    let size = loaded.size();
    assert_eq!(loaded.create_simple_type(SimpleTypeKind::Integer), sample.int);
    assert_eq!(
        loaded.create_type_former_type(Some(sample.int)).unwrap(),
        sample.int_former
    );
    let mut builder = loaded.begin_type();
    builder.add_type_former(sample.int_former);
    assert_eq!(loaded.end_type(builder).unwrap(), sample.int_type);
    assert_eq!(loaded.create_method_call(sample.method).unwrap(), sample.call);
    assert_eq!(loaded.create_comment("entry point"), sample.comment);
    assert_eq!(loaded.create_file("src\\Main.java").unwrap(), sample.file);
    assert_eq!(
        loaded.create_component("<System>"),
        loaded.get_system_component()
    );
    assert_eq!(loaded.size(), size);

    // New nodes continue after the loaded ones.
    let class = loaded.create_class_node();
    assert_eq!(class.as_usize(), size);
}

#[test]
fn headers_are_saved_with_the_graph() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.lim");

    let mut factory = Factory::new(LanguageKind::Java);
    let base = create_named(&mut factory, NodeKind::Method, "run");
    let derived = create_named(&mut factory, NodeKind::Method, "run");
    let mut overrides = OverrideRelations::new();
    overrides.add_override(&factory, derived, base).unwrap();
    let mut properties = PropertyData::new();
    properties.add("Tool", "lim-tests");
    properties.add(PROPERTY_API_VERSION, "0.0.1");
    factory
        .save(
            &path,
            &mut [
                &mut overrides as &mut dyn HeaderData,
                &mut properties as &mut dyn HeaderData,
            ],
        )
        .unwrap();
    // The writer fills in the standard properties.
    assert_eq!(properties.get(PROPERTY_API_VERSION), Some(API_VERSION));
    assert_eq!(properties.get(PROPERTY_TYPE), Some(FILE_TYPE));

    let mut loaded = Factory::new(LanguageKind::Java);
    let mut loaded_overrides = OverrideRelations::new();
    let mut loaded_properties = PropertyData::new();
    loaded
        .load(
            &path,
            &mut [
                &mut loaded_properties as &mut dyn HeaderData,
                &mut loaded_overrides as &mut dyn HeaderData,
            ],
        )
        .unwrap();
    assert_eq!(loaded_properties.get("Tool"), Some("lim-tests"));
    assert_eq!(
        loaded_properties.get_int(PROPERTY_LANGUAGE),
        Some(LanguageKind::Java.as_u8() as i32)
    );
    assert_eq!(
        loaded_overrides.get_override_list(derived).collect::<Vec<_>>(),
        vec![base]
    );
}

#[test]
fn filtered_nodes_are_saved() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.lim");

    let mut factory = Factory::new(LanguageKind::Java);
    let sample = create_sample_graph(&mut factory);
    factory.set_filtered(sample.class).unwrap();
    factory.save(&path, &mut []).unwrap();
    assert!(factory.get_filter_is_on());
    assert!(factory.get_is_filtered(sample.method));

    let mut loaded = Factory::new(LanguageKind::Java);
    loaded.load(&path, &mut []).unwrap();
    assert_eq!(loaded.iter().count(), factory.iter().count());
    assert_eq!(loaded.get_name(sample.method).unwrap(), "run");
    assert!(!loaded.get_is_filtered(sample.method));
}

#[test]
fn other_files_are_not_loaded() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    fs::write(&path, b"just some text, not a graph").unwrap();

    let mut factory = Factory::new(LanguageKind::Java);
    let sample = create_sample_graph(&mut factory);
    let size = factory.size();
    factory.load(&path, &mut []).unwrap();
    assert_eq!(factory.size(), size);
    assert_eq!(factory.get_name(sample.class).unwrap(), "Main");

    assert_eq!(
        Factory::check_asg(&path),
        EnumSet::only(AsgValidationKind::WrongFileType)
    );
}

#[test]
fn can_check_graph_files() {
    let dir = tempfile::tempdir().unwrap();

    let valid = dir.path().join("valid.lim");
    let mut factory = Factory::new(LanguageKind::Java);
    create_sample_graph(&mut factory);
    factory.save(&valid, &mut []).unwrap();
    assert_eq!(
        Factory::check_asg(&valid),
        EnumSet::only(AsgValidationKind::Valid)
    );

    let hand_written = dir.path().join("hand_written.lim");
    write_properties_only(&hand_written, &valid_properties());
    assert_eq!(
        Factory::check_asg(&hand_written),
        EnumSet::only(AsgValidationKind::Valid)
    );

    let missing = dir.path().join("missing.lim");
    assert_eq!(
        Factory::check_asg(&missing),
        EnumSet::only(AsgValidationKind::UnknownError)
    );
}

#[test]
fn graphs_from_other_versions_are_rejected() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("old.lim");
    let mut properties = valid_properties();
    properties.set(PROPERTY_API_VERSION, "1.0.0");
    properties.set(PROPERTY_BINARY_VERSION, "1.0.0");
    write_properties_only(&path, &properties);

    assert_eq!(
        Factory::check_asg(&path),
        AsgValidationKind::WrongApiVersion | AsgValidationKind::WrongBinaryVersion
    );
    let mut factory = Factory::new(LanguageKind::Java);
    let size = factory.size();
    assert!(matches!(
        factory.load(&path, &mut []),
        Err(LimError::Lim { .. })
    ));
    assert_eq!(factory.size(), size);

    let path = dir.path().join("anonymous.lim");
    write_properties_only(&path, &PropertyData::new());
    assert_eq!(
        Factory::check_asg(&path),
        AsgValidationKind::MissingFileType
            | AsgValidationKind::MissingApiVersion
            | AsgValidationKind::MissingBinaryVersion
    );
}

#[test]
fn hand_written_graphs_can_be_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.lim");
    let mut writer = BinaryWriter::new(Vec::new());
    writer.write_bytes(MAGIC).unwrap();
    writer.write_u32(1).unwrap();
    writer
        .write_u16(HeaderKind::PropertyData.as_u16())
        .unwrap();
    let properties = valid_properties();
    writer.write_block(|block| properties.save(block)).unwrap();
    writer.write_u32(0).unwrap();
    writer.write_u16(0).unwrap();
    lim::strtable::StrTable::new().save(&mut writer).unwrap();
    fs::write(&path, writer.into_inner()).unwrap();

    let mut factory = Factory::new(LanguageKind::Cpp);
    factory.load(&path, &mut []).unwrap();
    assert_eq!(factory.language(), LanguageKind::Java);
    assert_eq!(factory.iter().count(), 0);
}

#[test]
fn corrupt_block_sizes_are_errors() {
    let dir = tempfile::tempdir().unwrap();
    for (name, size, content) in vec![
        ("oversized.lim", u64::MAX, &b"abc"[..]),
        ("truncated.lim", 100, &b"abc"[..]),
        ("too_small.lim", 4, &b""[..]),
    ] {
        let mut writer = BinaryWriter::new(Vec::new());
        writer.write_bytes(MAGIC).unwrap();
        writer.write_u32(1).unwrap();
        writer
            .write_u16(HeaderKind::PropertyData.as_u16())
            .unwrap();
        writer.write_u64(size).unwrap();
        writer.write_bytes(content).unwrap();
        let bytes = writer.into_inner();

        let mut factory = Factory::new(LanguageKind::Java);
        let nodes = factory.size();
        assert!(factory.load_from(&bytes[..], &mut []).is_err(), "{}", name);
        assert_eq!(factory.size(), nodes);

        let path = dir.path().join(name);
        fs::write(&path, &bytes).unwrap();
        assert_eq!(
            Factory::check_asg(&path),
            EnumSet::only(AsgValidationKind::UnknownError)
        );
    }
}

#[test]
fn corrupt_string_lengths_are_errors() {
    let mut writer = BinaryWriter::new(Vec::new());
    writer.write_bytes(b"STRTBL").unwrap();
    writer.write_u32(1).unwrap();
    writer.write_u32(u32::MAX).unwrap();
    writer.write_bytes(b"short").unwrap();
    let bytes = writer.into_inner();

    let mut strings = lim::strtable::StrTable::new();
    assert!(strings
        .load(&mut lim::io::BinaryReader::new(&bytes[..]))
        .is_err());
}
