// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2021, stack-graphs authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

//! Interned strings.
//!
//! Node names, comment texts, file paths and every other string in a LIM graph are stored once in
//! a [`StrTable`][] and referred to by a compact [`StrKey`][].  We deduplicate strings, so you can
//! compare keys with simple equality instead of comparing string content.  The table only ever
//! grows; keys stay valid for as long as the table lives, and are preserved when the table is
//! saved and loaded again.
//!
//! [`StrKey`]: struct.StrKey.html
//! [`StrTable`]: struct.StrTable.html

use std::fmt::Display;
use std::io::Read;
use std::io::Write;

use fxhash::FxHashMap;

use crate::io::BinaryReader;
use crate::io::BinaryWriter;
use crate::LimError;
use crate::Result;

const STRTABLE_MAGIC: &[u8; 6] = b"STRTBL";

/// A key identifying a string in a [`StrTable`][].  The key `0` always stands for the empty
/// string, which is also the value of an unset name.
///
/// [`StrTable`]: struct.StrTable.html
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StrKey(u32);

impl StrKey {
    pub const EMPTY: StrKey = StrKey(0);

    pub fn from_u32(value: u32) -> StrKey {
        StrKey(value)
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl Display for StrKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An append-only string intern table.
#[derive(Clone, Debug)]
pub struct StrTable {
    strings: FxHashMap<StrKey, Box<str>>,
    keys: FxHashMap<Box<str>, StrKey>,
    next_key: u32,
}

impl StrTable {
    pub fn new() -> StrTable {
        StrTable {
            strings: FxHashMap::default(),
            keys: FxHashMap::default(),
            next_key: 1,
        }
    }

    /// Interns a string, returning its key.  Interning the same content twice yields the same key.
    pub fn set<S: AsRef<str> + ?Sized>(&mut self, value: &S) -> StrKey {
        let value = value.as_ref();
        if value.is_empty() {
            return StrKey::EMPTY;
        }
        if let Some(key) = self.keys.get(value) {
            return *key;
        }
        let key = StrKey(self.next_key);
        self.next_key += 1;
        self.insert(key, value.into());
        key
    }

    /// Returns the content of a string.
    pub fn get(&self, key: StrKey) -> Result<&str> {
        if key.is_empty() {
            return Ok("");
        }
        self.strings
            .get(&key)
            .map(|value| &**value)
            .ok_or(LimError::KeyNotFound(key))
    }

    /// Returns the key of a string if it has been interned, without interning it.
    pub fn lookup(&self, value: &str) -> Option<StrKey> {
        if value.is_empty() {
            return Some(StrKey::EMPTY);
        }
        self.keys.get(value).copied()
    }

    /// Returns the number of non-empty strings in this table.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Returns an iterator over every interned string and its key, in key order.
    pub fn iter(&self) -> impl Iterator<Item = (StrKey, &str)> {
        let mut entries = self
            .strings
            .iter()
            .map(|(key, value)| (*key, &**value))
            .collect::<Vec<_>>();
        entries.sort_by_key(|(key, _)| *key);
        entries.into_iter()
    }

    fn insert(&mut self, key: StrKey, value: Box<str>) {
        if let Some(previous) = self.strings.insert(key, value.clone()) {
            self.keys.remove(&previous);
        }
        self.keys.insert(value, key);
        if key.0 >= self.next_key {
            self.next_key = key.0 + 1;
        }
    }

    /// Writes every string of the table, in key order.
    pub fn save<W: Write>(&self, writer: &mut BinaryWriter<W>) -> Result<()> {
        writer.write_bytes(STRTABLE_MAGIC)?;
        for (key, value) in self.iter() {
            writer.write_u32(key.0)?;
            writer.write_u32(value.len() as u32)?;
            writer.write_bytes(value.as_bytes())?;
        }
        writer.write_u32(0)
    }

    /// Reads strings written by [`save`][], keeping their original keys.
    ///
    /// [`save`]: #method.save
    pub fn load<R: Read>(&mut self, reader: &mut BinaryReader<R>) -> Result<()> {
        let magic = reader.read_bytes(STRTABLE_MAGIC.len())?;
        if magic != STRTABLE_MAGIC {
            return Err(LimError::lim("StrTable::load", "missing string table"));
        }
        loop {
            let key = reader.read_u32()?;
            if key == 0 {
                break;
            }
            let len = reader.read_u32()? as usize;
            let value = reader.read_string(len)?;
            self.insert(StrKey(key), value.into_boxed_str());
        }
        Ok(())
    }
}

impl Default for StrTable {
    fn default() -> StrTable {
        StrTable::new()
    }
}
