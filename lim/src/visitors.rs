// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2021, stack-graphs authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

//! Visitors that come with the crate.

use std::io::Write;
use std::ops::ControlFlow;

use serde_json::json;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::edges::AssocValue;
use crate::io::BinaryWriter;
use crate::nodes::Node;
use crate::preorder::Visitor;
use crate::strtable::StrKey;
use crate::strtable::StrTable;
use crate::LimError;

//-------------------------------------------------------------------------------------------------
// Saving

/// Writes every visited node to a graph file's node stream: its id, its kind and its payload.
///
/// The first write error stops the visitor; retrieve it with [`finish`][].
///
/// [`finish`]: #method.finish
pub struct VisitorSave<'w, W> {
    writer: &'w mut BinaryWriter<W>,
    error: Option<LimError>,
    count: usize,
}

impl<'w, W: Write> VisitorSave<'w, W> {
    pub fn new(writer: &'w mut BinaryWriter<W>) -> VisitorSave<'w, W> {
        VisitorSave {
            writer,
            error: None,
            count: 0,
        }
    }

    /// Returns the number of nodes written, or the error that stopped the visitor.
    pub fn finish(self) -> crate::Result<usize> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.count),
        }
    }

    fn write(&mut self, node: &Node) -> crate::Result<()> {
        self.writer.write_u32(node.id().as_u32())?;
        self.writer.write_u16(node.kind().as_u16())?;
        node.save(&mut *self.writer)
    }
}

impl<W: Write> Visitor for VisitorSave<'_, W> {
    fn visit(&mut self, node: &Node) -> ControlFlow<()> {
        match self.write(node) {
            Ok(()) => {
                self.count += 1;
                ControlFlow::Continue(())
            }
            Err(error) => {
                self.error = Some(error);
                ControlFlow::Break(())
            }
        }
    }
}

//-------------------------------------------------------------------------------------------------
// JSON

#[derive(Debug, Error)]
#[error(transparent)]
pub struct JsonError(#[from] serde_json::error::Error);

/// Builds a JSON description of every visited node, with its name, parent and outgoing edges.
/// Strings are resolved through the string table, so the dump can be read on its own.
pub struct VisitorJson<'a> {
    strings: &'a StrTable,
    nodes: Vec<Value>,
    depth: usize,
}

impl<'a> VisitorJson<'a> {
    pub fn new(strings: &'a StrTable) -> VisitorJson<'a> {
        VisitorJson {
            strings,
            nodes: Vec::new(),
            depth: 0,
        }
    }

    pub fn to_value(&self) -> Value {
        json!({ "nodes": self.nodes })
    }

    pub fn to_string_pretty(&self) -> Result<String, JsonError> {
        Ok(serde_json::to_string_pretty(&self.to_value())?)
    }

    fn string(&self, key: StrKey) -> Value {
        match self.strings.get(key) {
            Ok(value) => Value::String(value.to_string()),
            Err(_) => Value::Null,
        }
    }

    fn assoc(&self, assoc: &AssocValue) -> Value {
        match assoc {
            AssocValue::String(key) => self.string(*key),
            AssocValue::SourcePosition(position) => json!({
                "realization_level": format!("{:?}", position.realization_level),
                "line": position.line,
                "column": position.column,
                "end_line": position.end_line,
                "end_column": position.end_column,
            }),
            AssocValue::TypeArgumentConstraint(kind) => Value::String(format!("{:?}", kind)),
            AssocValue::Parameter(kind) => Value::String(format!("{:?}", kind)),
        }
    }
}

impl Visitor for VisitorJson<'_> {
    fn visit(&mut self, node: &Node) -> ControlFlow<()> {
        let mut object = Map::new();
        object.insert("id".into(), json!(node.id().as_u32()));
        object.insert("kind".into(), json!(node.kind().name()));
        object.insert("depth".into(), json!(self.depth));
        if node.is_named() {
            object.insert("name".into(), self.string(node.name()));
        }
        if let Some(parent) = node.parent() {
            object.insert("parent".into(), json!(parent.as_u32()));
        }
        let edges = node
            .iter_edges()
            .map(|edge| {
                let mut value = json!({
                    "kind": edge.kind.name(),
                    "target": edge.target.as_u32(),
                });
                if let Some(assoc) = &edge.assoc {
                    value["assoc"] = self.assoc(assoc);
                }
                value
            })
            .collect::<Vec<_>>();
        if !edges.is_empty() {
            object.insert("edges".into(), Value::Array(edges));
        }
        self.nodes.push(Value::Object(object));
        ControlFlow::Continue(())
    }

    fn inc_depth(&mut self) {
        self.depth += 1;
    }

    fn dec_depth(&mut self) {
        self.depth -= 1;
    }
}
