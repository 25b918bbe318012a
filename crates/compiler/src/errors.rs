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

use thiserror::Error;

use crate::ast::NodeKind;

/// Everything that can go wrong between source text and a typed tree.
/// All of these are fatal for the program being compiled; there is no partial output.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum CompileError {
    #[error("Failure to parse program @ {line}/{column}: {message}\n  {context}")]
    ParseError {
        line: usize,
        column: usize,
        context: String,
        message: String,
    },
    #[error("Collection of {children} child nodes inside unknown node {token}: `{text}`")]
    MalformedTree {
        token: String,
        children: usize,
        text: String,
    },
    #[error("{kind} does not accept a values list; would discard {count} converted nodes: `{text}`")]
    DiscardedSubtree {
        kind: NodeKind,
        count: usize,
        text: String,
    },
    #[error("Unknown type: {0}")]
    UnknownType(String),
    #[error("Empty expression (grammar gap)")]
    EmptyExpression,
    #[error("Partial expression (grammar gap): {0}")]
    PartialExpression(String),
    #[error("{kind} needs exactly {expected} components, got {found}")]
    WrongArity {
        kind: NodeKind,
        expected: usize,
        found: usize,
    },
    #[error("Field `{field}` of {kind} cannot hold {found}")]
    FieldMismatch {
        kind: NodeKind,
        field: String,
        found: String,
    },
    #[error("Cannot insert at position {index} of a body with {len} statements")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("Program did not convert to a script, got {0}")]
    NotAScript(String),
}
