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

#[macro_use]
extern crate pest_derive;

mod ast;
mod convert;
mod cst;
mod errors;
mod parse;
mod passes;
mod precedence;
mod schema;
mod unparse;

pub use crate::ast::{
    Body, Call, Cast, Components, Element, Field, For, Function, If, List, Loop, Modifier, Node,
    NodeKind, Operation, Param, PrimitiveType, Quaternion, Return, Schema, Script, Shape, State,
    Target, Type, VALUE_FIELD, Variable, Vector, default_value_for,
};
pub use crate::convert::{TreeTransformer, convert};
pub use crate::cst::{PestToRawConverter, RawNode};
pub use crate::errors::CompileError;
pub use crate::parse::lsl::{LslParser, Rule};
pub use crate::parse::{parse_program, parse_raw};
pub use crate::passes::trace_entry;
pub use crate::precedence::{Precedence, assemble};
pub use crate::schema::{SchemaRegistry, Vocabulary, pascal_case, snake_case};
pub use crate::unparse::{UnparseOptions, unparse, unparse_with};
