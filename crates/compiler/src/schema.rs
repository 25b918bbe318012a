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

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::str::FromStr;

use tracing::debug;

use crate::ast::NodeKind;

/// The closed set of token kinds a parser can label raw nodes with.
///
/// Symbols are UPPER_SNAKE names such as `STATE_CHANGE`. Each vocabulary owns exactly one
/// registry, built on first use and shared for the rest of the process.
pub trait Vocabulary: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    fn all() -> Vec<Self>;

    fn symbol(self) -> String;

    fn registry() -> &'static SchemaRegistry<Self>;
}

/// Maps each token kind to the field name it fills in a parent, and to the node variant it
/// instantiates, if there is one.
#[derive(Debug)]
pub struct SchemaRegistry<T> {
    kinds: HashMap<T, NodeKind>,
    fields: HashMap<T, String>,
}

impl<T: Vocabulary> SchemaRegistry<T> {
    pub fn build() -> Self {
        let mut kinds = HashMap::new();
        let mut fields = HashMap::new();
        for token in T::all() {
            let symbol = token.symbol();
            if let Ok(kind) = NodeKind::from_str(&pascal_case(&symbol)) {
                kinds.insert(token, kind);
            }
            fields.insert(token, snake_case(&symbol));
        }
        debug!(
            tokens = fields.len(),
            variants = kinds.len(),
            "built schema registry"
        );
        Self { kinds, fields }
    }

    pub fn kind_for(&self, token: T) -> Option<NodeKind> {
        self.kinds.get(&token).copied()
    }

    /// Field name for a token. Falls back to the snake-cased symbol for tokens the registry
    /// was not built with.
    pub fn field_name(&self, token: T) -> String {
        self.fields
            .get(&token)
            .cloned()
            .unwrap_or_else(|| snake_case(&token.symbol()))
    }
}

/// `STATE_CHANGE` -> `state_change`
pub fn snake_case(symbol: &str) -> String {
    symbol.to_lowercase()
}

/// `STATE_CHANGE` -> `StateChange`
pub fn pascal_case(symbol: &str) -> String {
    symbol
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}
