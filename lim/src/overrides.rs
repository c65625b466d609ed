// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2021, stack-graphs authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

//! Records which methods override which.
//!
//! Override relations are not edges of the graph.  They are computed after the graph has been
//! built, and are stored in a graph file as an `Override` header.

use either::Either;
use fxhash::FxHashMap;

use crate::arena::NodeId;
use crate::factory::Factory;
use crate::io::BinaryReader;
use crate::io::BinaryWriter;
use crate::io::HeaderData;
use crate::io::HeaderKind;
use crate::nodes::NodeKind;
use crate::LimError;
use crate::Result;

/// The methods overridden by one method.  Most methods override at most one other method, so we
/// only allocate a list for the ones that override several.
#[derive(Clone, Debug, Eq, PartialEq)]
enum Overrides {
    Single(NodeId),
    Multi(Vec<NodeId>),
}

/// Maps a method to the methods it overrides.
#[derive(Clone, Debug, Default)]
pub struct OverrideRelations {
    overrides: FxHashMap<NodeId, Overrides>,
}

impl OverrideRelations {
    pub fn new() -> OverrideRelations {
        OverrideRelations::default()
    }

    /// Records that method `method` overrides method `overridden`.  Both must be existing
    /// `Method` nodes; otherwise the relations are left unchanged.
    pub fn add_override(
        &mut self,
        factory: &Factory,
        method: NodeId,
        overridden: NodeId,
    ) -> Result<()> {
        let location = "OverrideRelations::add_override";
        for id in [method, overridden] {
            let node = factory.get_ref(id).ok_or_else(|| {
                LimError::lim(location, format!("node {} does not exist", id))
            })?;
            if !node.is(NodeKind::Method) {
                return Err(LimError::lim(
                    location,
                    format!("node {} is a {}, not a method", id, node.kind().name()),
                ));
            }
        }
        self.insert(method, overridden);
        Ok(())
    }

    fn insert(&mut self, method: NodeId, overridden: NodeId) {
        match self.overrides.get_mut(&method) {
            None => {
                self.overrides.insert(method, Overrides::Single(overridden));
            }
            Some(Overrides::Single(first)) => {
                let first = *first;
                self.overrides
                    .insert(method, Overrides::Multi(vec![first, overridden]));
            }
            Some(Overrides::Multi(list)) => list.push(overridden),
        }
    }

    /// Returns the number of methods that `method` overrides.
    pub fn get_number_of_overrides(&self, method: NodeId) -> usize {
        match self.overrides.get(&method) {
            None => 0,
            Some(Overrides::Single(_)) => 1,
            Some(Overrides::Multi(list)) => list.len(),
        }
    }

    /// Returns the methods that `method` overrides, in the order they were added.
    pub fn get_override_list(&self, method: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        match self.overrides.get(&method) {
            None => Either::Left(None.into_iter()),
            Some(Overrides::Single(id)) => Either::Left(Some(*id).into_iter()),
            Some(Overrides::Multi(list)) => Either::Right(list.iter().copied()),
        }
    }

    /// Returns the number of methods that override at least one other method.
    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }

    pub fn clear(&mut self) {
        self.overrides.clear();
    }
}

impl HeaderData for OverrideRelations {
    fn kind(&self) -> HeaderKind {
        HeaderKind::Override
    }

    fn save(&self, writer: &mut BinaryWriter<Vec<u8>>) -> Result<()> {
        let mut methods = self.overrides.keys().copied().collect::<Vec<_>>();
        methods.sort();
        writer.write_u32(methods.len() as u32)?;
        for method in methods {
            writer.write_u32(method.as_u32())?;
            writer.write_u32(self.get_number_of_overrides(method) as u32)?;
            for overridden in self.get_override_list(method) {
                writer.write_u32(overridden.as_u32())?;
            }
        }
        Ok(())
    }

    fn load(&mut self, reader: &mut BinaryReader<&[u8]>) -> Result<()> {
        let location = "OverrideRelations::load";
        self.overrides.clear();
        let count = reader.read_u32()?;
        for _ in 0..count {
            let method = reader
                .read_node_id()?
                .ok_or_else(|| LimError::lim(location, "missing method id"))?;
            let len = reader.read_u32()?;
            for _ in 0..len {
                let overridden = reader
                    .read_node_id()?
                    .ok_or_else(|| LimError::lim(location, "missing overridden method id"))?;
                self.insert(method, overridden);
            }
        }
        Ok(())
    }
}
