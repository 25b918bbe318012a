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

//! Transformations over a converted script.

use tracing::debug;

use crate::ast::{Body, Call, Element, Node, Operation, Script};
use crate::errors::CompileError;

/// `diagnostic_fn("<name>");`
fn entry_call(diagnostic_fn: &str, name: &str) -> Node {
    let argument = Node::Value(Operation::leaf(Element::text(format!("\"{name}\""))));
    let call = Call::new(diagnostic_fn, vec![argument.into()]);
    Node::Expression(Operation::leaf(Node::Call(call).into()))
}

/// Make every function announce itself on entry by calling `diagnostic_fn` with its own name.
/// Returns how many functions were instrumented.
pub fn trace_entry(script: &mut Script, diagnostic_fn: &str) -> Result<usize, CompileError> {
    let mut count = 0;
    for function in script.functions_mut() {
        let name = function.name.clone().unwrap_or_default();
        let body = function.body.get_or_insert_with(Body::default);
        body.insert(0, entry_call(diagnostic_fn, &name))?;
        debug!(function = %name, "instrumented function entry");
        count += 1;
    }
    Ok(count)
}
