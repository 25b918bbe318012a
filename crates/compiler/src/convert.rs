// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

/// Turns the untyped raw tree into typed nodes, steered entirely by the schema registry:
/// a child's token decides which field of its parent it lands in.
use tracing::trace;

use crate::ast::{Element, Node, Shape, VALUE_FIELD};
use crate::cst::RawNode;
use crate::errors::CompileError;
use crate::schema::{SchemaRegistry, Vocabulary};

pub struct TreeTransformer<'a, T> {
    registry: &'a SchemaRegistry<T>,
}

impl<T: Vocabulary> TreeTransformer<'static, T> {
    pub fn for_vocabulary() -> Self {
        Self::new(T::registry())
    }
}

impl<'a, T: Vocabulary> TreeTransformer<'a, T> {
    pub fn new(registry: &'a SchemaRegistry<T>) -> Self {
        Self { registry }
    }

    pub fn convert(&self, raw: &RawNode<T>) -> Result<Element, CompileError> {
        let Some(kind) = self.registry.kind_for(raw.token) else {
            return self.pass_through(raw);
        };

        let mut node = kind.instantiate();
        let mut overflow = vec![];
        for child in &raw.children {
            let field = self.registry.field_name(child.token);
            if field.ends_with('s') && node.has_field(&field, Shape::List) {
                let values = child
                    .children
                    .iter()
                    .map(|grandchild| self.convert(grandchild))
                    .collect::<Result<Vec<_>, _>>()?;
                node.set_list(&field, values)?;
                continue;
            }

            let value = self.convert(child)?;
            if node.has_field(&field, Shape::Single) {
                node.set(&field, value)?;
            } else if node.has_field(VALUE_FIELD, Shape::Single) {
                node.set(VALUE_FIELD, value)?;
            } else {
                overflow.push(value);
            }
        }

        if node.accepts_overflow() {
            node.set_overflow(overflow)?;
        } else if !overflow.is_empty() {
            return Err(CompileError::DiscardedSubtree {
                kind,
                count: overflow.len(),
                text: raw.text.clone(),
            });
        }
        trace!(%kind, token = ?raw.token, "converted node");
        Ok(node.into())
    }

    /// Tokens with no variant of their own: leaves become their text, single-child wrappers
    /// become their child.
    fn pass_through(&self, raw: &RawNode<T>) -> Result<Element, CompileError> {
        match raw.children.as_slice() {
            [] => Ok(Element::Text(raw.text.clone())),
            [only] => self.convert(only),
            children => Err(CompileError::MalformedTree {
                token: raw.token.symbol(),
                children: children.len(),
                text: raw.text.clone(),
            }),
        }
    }

    /// Convert a raw tree whose root must be a typed node.
    pub fn convert_node(&self, raw: &RawNode<T>) -> Result<Node, CompileError> {
        match self.convert(raw)? {
            Element::Node(node) => Ok(*node),
            Element::Text(text) => Err(CompileError::MalformedTree {
                token: raw.token.symbol(),
                children: 0,
                text,
            }),
        }
    }
}

pub fn convert<T: Vocabulary>(raw: &RawNode<T>) -> Result<Element, CompileError> {
    TreeTransformer::for_vocabulary().convert(raw)
}
