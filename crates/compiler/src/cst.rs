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

use pest::RuleType;
use pest::iterators::{Pair, Pairs};

/// Untyped parse tree as the grammar produced it: one node per matched rule, labelled with
/// that rule, holding the exact source text it covered.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RawNode<T> {
    /// The grammar rule that generated this node
    pub token: T,
    /// The source text this node covers
    pub text: String,
    pub children: Vec<RawNode<T>>,
}

impl<T: Copy> RawNode<T> {
    pub fn leaf(token: T, text: impl Into<String>) -> Self {
        Self {
            token,
            text: text.into(),
            children: vec![],
        }
    }

    pub fn branch(token: T, text: impl Into<String>, children: Vec<RawNode<T>>) -> Self {
        Self {
            token,
            text: text.into(),
            children,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Depth-first, pre-order walk of this node and all its descendants.
    pub fn walk(&self) -> Vec<&RawNode<T>> {
        let mut nodes = vec![self];
        for child in &self.children {
            nodes.extend(child.walk());
        }
        nodes
    }
}

/// Builds [`RawNode`]s from pest pairs. Silent rules never show up here; `EOI` is dropped.
pub struct PestToRawConverter<R> {
    end_of_input: Option<R>,
}

impl<R: RuleType> PestToRawConverter<R> {
    pub fn new(end_of_input: Option<R>) -> Self {
        Self { end_of_input }
    }

    pub fn convert_pair(&self, pair: Pair<R>) -> RawNode<R> {
        let token = pair.as_rule();
        let text = pair.as_str().to_string();
        let children = self.convert_pairs(pair.into_inner());
        RawNode {
            token,
            text,
            children,
        }
    }

    pub fn convert_pairs(&self, pairs: Pairs<R>) -> Vec<RawNode<R>> {
        pairs
            .filter(|pair| Some(pair.as_rule()) != self.end_of_input)
            .map(|pair| self.convert_pair(pair))
            .collect()
    }
}
