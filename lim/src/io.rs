// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2021, stack-graphs authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

//! Binary encoding primitives and file headers.
//!
//! Graph files, filter files and string tables all use the same little-endian encoding of fixed
//! width integers.  A graph file starts with the magic bytes `csi\0`, followed by a list of
//! _header records_.  Each header record is a `u16` [kind tag][`HeaderKind`] followed by a block
//! whose `u64` size prefix counts the prefix itself, so that readers can skip any header they don't
//! understand.
//!
//! [`HeaderKind`]: enum.HeaderKind.html

use std::collections::BTreeMap;
use std::convert::TryFrom;
use std::io::Read;
use std::io::Write;

use enumset::EnumSet;
use enumset::EnumSetType;

use crate::arena::NodeId;
use crate::LimError;
use crate::Result;

/// The magic bytes at the start of every graph file.
pub const MAGIC: &[u8; 4] = b"csi\0";

/// The value of the `Type` property of every graph file.
pub const FILE_TYPE: &str = "LanguageIndependentModel";
/// The API version written to, and required from, graph files.
pub const API_VERSION: &str = "2.0.21";
/// The binary layout version written to, and required from, graph files.
pub const BINARY_VERSION: &str = "2.0.21";

pub const PROPERTY_TYPE: &str = "Type";
pub const PROPERTY_API_VERSION: &str = "APIVersion";
pub const PROPERTY_BINARY_VERSION: &str = "BinaryVersion";
pub const PROPERTY_LANGUAGE: &str = "Language";

const PROPERTY_TRUE: &str = "1";
const PROPERTY_FALSE: &str = "0";

//-------------------------------------------------------------------------------------------------
// Writers

/// Writes little-endian binary data to an underlying writer.
pub struct BinaryWriter<W> {
    inner: W,
}

impl<W: Write> BinaryWriter<W> {
    pub fn new(inner: W) -> BinaryWriter<W> {
        BinaryWriter { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.inner.write_all(&[value])?;
        Ok(())
    }

    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_u8(value as u8)
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.inner.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.inner.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.inner.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        Ok(())
    }

    /// Writes an optional node reference, using `0` for a missing one.
    pub fn write_node_id(&mut self, id: Option<NodeId>) -> Result<()> {
        self.write_u32(id.map(NodeId::as_u32).unwrap_or(0))
    }

    /// Writes a string of at most 65535 bytes, prefixed by its `u16` length.
    pub fn write_short_string(&mut self, value: &str) -> Result<()> {
        if value.len() > u16::MAX as usize {
            return Err(LimError::lim(
                "BinaryWriter::write_short_string",
                "the string length is greater than 65535",
            ));
        }
        self.write_u16(value.len() as u16)?;
        self.write_bytes(value.as_bytes())
    }

    /// Writes a block whose content is produced by `body`, prefixed by its `u64` size.  The size
    /// includes the eight bytes of the prefix itself.
    pub fn write_block<F>(&mut self, body: F) -> Result<()>
    where
        F: FnOnce(&mut BinaryWriter<Vec<u8>>) -> Result<()>,
    {
        let mut block = BinaryWriter::new(Vec::new());
        body(&mut block)?;
        let block = block.into_inner();
        self.write_u64(block.len() as u64 + 8)?;
        self.write_bytes(&block)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}

//-------------------------------------------------------------------------------------------------
// Readers

/// Reads little-endian binary data from an underlying reader.
pub struct BinaryReader<R> {
    inner: R,
}

impl<R: Read> BinaryReader<R> {
    pub fn new(inner: R) -> BinaryReader<R> {
        BinaryReader { inner }
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buffer = [0u8; N];
        self.inner.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Reads exactly `len` bytes.  Lengths usually come from the data being read, so the buffer
    /// only grows with the bytes that actually arrive.
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        (&mut self.inner)
            .take(len as u64)
            .read_to_end(&mut buffer)?;
        if buffer.len() != len {
            return Err(LimError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("expected {} bytes, found {}", len, buffer.len()),
            )));
        }
        Ok(buffer)
    }

    /// Reads an optional node reference written by [`BinaryWriter::write_node_id`][].
    ///
    /// [`BinaryWriter::write_node_id`]: struct.BinaryWriter.html#method.write_node_id
    pub fn read_node_id(&mut self) -> Result<Option<NodeId>> {
        Ok(NodeId::new(self.read_u32()?))
    }

    pub fn read_short_string(&mut self) -> Result<String> {
        let len = self.read_u16()? as usize;
        self.read_string(len)
    }

    pub fn read_string(&mut self, len: usize) -> Result<String> {
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes).map_err(|err| {
            LimError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err))
        })
    }

    /// Reads a size-prefixed block written by [`BinaryWriter::write_block`][], returning its
    /// content.
    ///
    /// [`BinaryWriter::write_block`]: struct.BinaryWriter.html#method.write_block
    pub fn read_block(&mut self) -> Result<Vec<u8>> {
        let size = self.read_u64()?;
        if size < 8 {
            return Err(LimError::lim(
                "BinaryReader::read_block",
                format!("invalid block size ({})", size),
            ));
        }
        let len = usize::try_from(size - 8).map_err(|_| {
            LimError::lim(
                "BinaryReader::read_block",
                format!("invalid block size ({})", size),
            )
        })?;
        self.read_bytes(len)
    }
}

//-------------------------------------------------------------------------------------------------
// Headers

/// The kinds of header record that can appear in a graph file.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HeaderKind {
    PropertyData,
    IntervalData,
    AnalysisData,
    LinkerCompilationData,
    LimOrigin,
    Override,
}

impl HeaderKind {
    pub fn from_u16(value: u16) -> Option<HeaderKind> {
        Some(match value {
            0 => HeaderKind::PropertyData,
            1 => HeaderKind::IntervalData,
            2 => HeaderKind::AnalysisData,
            3 => HeaderKind::LinkerCompilationData,
            4 => HeaderKind::LimOrigin,
            5 => HeaderKind::Override,
            _ => return None,
        })
    }

    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

/// A header record that can be stored in a graph file alongside the graph itself.
pub trait HeaderData {
    fn kind(&self) -> HeaderKind;

    fn save(&self, writer: &mut BinaryWriter<Vec<u8>>) -> Result<()>;

    fn load(&mut self, reader: &mut BinaryReader<&[u8]>) -> Result<()>;

    /// Gives the graph writer access to the mandatory property header, so that it can fill in the
    /// file type and version properties.
    fn as_property_data_mut(&mut self) -> Option<&mut PropertyData> {
        None
    }
}

/// A string-to-string property map.  Every graph file carries one, describing the file type and
/// the versions of the code that wrote it.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PropertyData {
    properties: BTreeMap<String, String>,
}

impl PropertyData {
    pub fn new() -> PropertyData {
        PropertyData::default()
    }

    /// Adds a property.  Returns `false`, leaving the existing value alone, if the key is already
    /// present.
    pub fn add<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) -> bool {
        let key = key.into();
        if self.properties.contains_key(&key) {
            return false;
        }
        self.properties.insert(key, value.into());
        true
    }

    /// Sets a property, overwriting any existing value.
    pub fn set<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn add_bool<K: Into<String>>(&mut self, key: K, value: bool) -> bool {
        self.add(key, if value { PROPERTY_TRUE } else { PROPERTY_FALSE })
    }

    pub fn add_int<K: Into<String>>(&mut self, key: K, value: i32) -> bool {
        self.add(key, value.to_string())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).map(|value| value == PROPERTY_TRUE)
    }

    pub fn get_int(&self, key: &str) -> Option<i32> {
        self.get(key).and_then(|value| value.parse().ok())
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

impl HeaderData for PropertyData {
    fn kind(&self) -> HeaderKind {
        HeaderKind::PropertyData
    }

    fn save(&self, writer: &mut BinaryWriter<Vec<u8>>) -> Result<()> {
        writer.write_u32(self.properties.len() as u32)?;
        for (key, value) in &self.properties {
            writer.write_short_string(key)?;
            writer.write_short_string(value)?;
        }
        Ok(())
    }

    fn load(&mut self, reader: &mut BinaryReader<&[u8]>) -> Result<()> {
        let count = reader.read_u32()?;
        for _ in 0..count {
            let key = reader.read_short_string()?;
            let value = reader.read_short_string()?;
            self.properties.insert(key, value);
        }
        Ok(())
    }

    fn as_property_data_mut(&mut self) -> Option<&mut PropertyData> {
        Some(self)
    }
}

//-------------------------------------------------------------------------------------------------
// Validation

/// A problem found while checking whether a file holds a graph this crate can load.
#[derive(Debug, EnumSetType, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AsgValidationKind {
    Valid,
    MissingFileType,
    WrongFileType,
    MissingApiVersion,
    WrongApiVersion,
    MissingBinaryVersion,
    WrongBinaryVersion,
    UnknownError,
}

/// Checks the mandatory properties of a graph file.  Returns the empty set if they are all
/// present and match the values this crate writes.
pub fn check_property_data(properties: &PropertyData) -> EnumSet<AsgValidationKind> {
    let mut problems = EnumSet::new();
    let mut check = |key: &str,
                     expected: &str,
                     missing: AsgValidationKind,
                     wrong: AsgValidationKind| match properties.get(key) {
        None => problems.insert(missing),
        Some(value) if value != expected => problems.insert(wrong),
        Some(_) => false,
    };
    check(
        PROPERTY_TYPE,
        FILE_TYPE,
        AsgValidationKind::MissingFileType,
        AsgValidationKind::WrongFileType,
    );
    check(
        PROPERTY_API_VERSION,
        API_VERSION,
        AsgValidationKind::MissingApiVersion,
        AsgValidationKind::WrongApiVersion,
    );
    check(
        PROPERTY_BINARY_VERSION,
        BINARY_VERSION,
        AsgValidationKind::MissingBinaryVersion,
        AsgValidationKind::WrongBinaryVersion,
    );
    problems
}
