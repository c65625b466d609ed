// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2021, stack-graphs authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

use lim::io::BinaryReader;
use lim::io::BinaryWriter;
use lim::strtable::StrKey;
use lim::strtable::StrTable;
use lim::LimError;
use pretty_assertions::assert_eq;

#[test]
fn can_intern_strings() {
    let mut strings = StrTable::new();
    let a1 = strings.set("a");
    let a2 = strings.set("a");
    let b = strings.set("b");
    let empty = strings.set("");
    // We deduplicate strings, so equal content gives equal keys.
    assert_eq!(a1, a2);
    assert_ne!(a1, b);
    assert_eq!(empty, StrKey::EMPTY);
    assert_eq!(strings.get(a1).unwrap(), "a");
    assert_eq!(strings.get(b).unwrap(), "b");
    assert_eq!(strings.get(empty).unwrap(), "");
    assert_eq!(strings.len(), 2);
}

#[test]
fn can_look_up_strings_without_interning() {
    let mut strings = StrTable::new();
    let a = strings.set("a");
    assert_eq!(strings.lookup("a"), Some(a));
    assert_eq!(strings.lookup("b"), None);
    assert_eq!(strings.len(), 1);
}

#[test]
fn unknown_keys_are_errors() {
    let strings = StrTable::new();
    let result = strings.get(StrKey::from_u32(17));
    assert!(matches!(result, Err(LimError::KeyNotFound(key)) if key.as_u32() == 17));
}

#[test]
fn can_save_and_load_string_tables() {
    let mut strings = StrTable::new();
    let hello = strings.set("hello");
    let there = strings.set("there");
    let unicode = strings.set("Grüße");

    let mut writer = BinaryWriter::new(Vec::new());
    strings.save(&mut writer).unwrap();
    let bytes = writer.into_inner();

    let mut loaded = StrTable::new();
    loaded.load(&mut BinaryReader::new(&bytes[..])).unwrap();
    assert_eq!(
        loaded.iter().collect::<Vec<_>>(),
        strings.iter().collect::<Vec<_>>()
    );
    assert_eq!(loaded.get(hello).unwrap(), "hello");
    assert_eq!(loaded.get(there).unwrap(), "there");
    assert_eq!(loaded.get(unicode).unwrap(), "Grüße");
    // New strings never reuse a loaded key.
    let fresh = loaded.set("fresh");
    assert!(fresh > unicode);
}

#[test]
fn loading_requires_a_string_table() {
    let mut strings = StrTable::new();
    let result = strings.load(&mut BinaryReader::new(&b"garbage!"[..]));
    assert!(result.is_err());
}
