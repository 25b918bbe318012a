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

use std::fmt::Display;

use itertools::Itertools;

use crate::ast::{
    Body, Call, Cast, Components, Element, For, Function, If, Loop, Modifier, Node, NodeKind,
    Operation, Param, Return, Script, State, Target, Type, Variable,
};

const INDENT_LEVEL: usize = 2;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct UnparseOptions {
    /// Spaces per nesting level inside bodies and states.
    pub indent_width: usize,
}

impl Default for UnparseOptions {
    fn default() -> Self {
        Self {
            indent_width: INDENT_LEVEL,
        }
    }
}

/// Renders nodes back to source. Context flows down as the kind of the enclosing node,
/// which is all the statement terminator and parenthesization rules need.
#[derive(Debug)]
struct Unparse<'a> {
    options: &'a UnparseOptions,
}

/// Kinds whose binary operands must be wrapped so they re-parse with the same grouping.
fn groups_operands(parent: Option<NodeKind>) -> bool {
    parent.is_some_and(|kind| {
        kind.is_expression() || matches!(kind, NodeKind::Cast | NodeKind::PreMod | NodeKind::PostMod)
    })
}

impl<'a> Unparse<'a> {
    fn new(options: &'a UnparseOptions) -> Self {
        Self { options }
    }

    fn indent(&self, text: &str) -> String {
        let pad = " ".repeat(self.options.indent_width);
        text.lines()
            .map(|line| {
                if line.is_empty() {
                    String::new()
                } else {
                    format!("{pad}{line}")
                }
            })
            .join("\n")
    }

    fn unparse_element(&self, element: &Element, parent: NodeKind) -> String {
        match element {
            Element::Text(text) => text.clone(),
            Element::Node(node) => self.unparse_node(node, Some(parent)),
        }
    }

    fn unparse_elements(&self, elements: &[Element], parent: NodeKind) -> String {
        elements
            .iter()
            .map(|element| self.unparse_element(element, parent))
            .join(", ")
    }

    fn unparse_nodes(&self, nodes: &[Node], parent: NodeKind) -> String {
        nodes
            .iter()
            .map(|node| self.unparse_node(node, Some(parent)))
            .join(", ")
    }

    fn unparse_optional(&self, node: Option<&Node>, parent: NodeKind) -> String {
        node.map(|node| self.unparse_node(node, Some(parent)))
            .unwrap_or_default()
    }

    fn unparse_type(&self, ty: Option<&Type>) -> String {
        match ty {
            Some(ty) if !ty.primitive.is_void() => ty.primitive.to_string(),
            _ => String::new(),
        }
    }

    fn unparse_body(&self, body: Option<&Body>) -> String {
        match body {
            Some(body) => self.unparse_block(body),
            None => "{\n}".to_string(),
        }
    }

    fn unparse_block(&self, body: &Body) -> String {
        // A body that only wraps another body prints as that body. The tree keeps both.
        if let [inner @ Node::Body(_)] = body.statements.as_slice() {
            return self.unparse_node(inner, Some(NodeKind::Body));
        }
        if body.statements.is_empty() {
            return "{\n}".to_string();
        }
        let statements = body
            .statements
            .iter()
            .map(|statement| self.indent(&self.unparse_node(statement, Some(NodeKind::Body))))
            .join("\n");
        format!("{{\n{statements}\n}}")
    }

    fn unparse_script(&self, script: &Script) -> String {
        let globals = script
            .globals
            .iter()
            .map(|global| self.unparse_node(global, Some(NodeKind::Script)));
        let states = script.states.iter().map(|state| self.unparse_state(state));
        globals.chain(states).join("\n")
    }

    fn unparse_state(&self, state: &State) -> String {
        let header = match &state.name {
            Some(name) => format!("state {name}"),
            None => "default".to_string(),
        };
        if state.events.is_empty() {
            return format!("{header} {{\n}}");
        }
        let events = state
            .events
            .iter()
            .map(|event| self.indent(&self.unparse_function(event)))
            .join("\n");
        format!("{header} {{\n{events}\n}}")
    }

    fn unparse_function(&self, function: &Function) -> String {
        let mut buffer = String::new();
        if !function.is_void() {
            buffer.push_str(&self.unparse_type(function.ty.as_ref()));
            buffer.push(' ');
        }
        buffer.push_str(function.name.as_deref().unwrap_or_default());
        buffer.push('(');
        buffer.push_str(&self.unparse_params(&function.params));
        buffer.push_str(")\n");
        buffer.push_str(&self.unparse_body(function.body.as_ref()));
        buffer
    }

    fn unparse_params(&self, params: &[Param]) -> String {
        params.iter().map(|param| self.unparse_param(param)).join(", ")
    }

    fn unparse_param(&self, param: &Param) -> String {
        format!(
            "{} {}",
            self.unparse_type(param.ty.as_ref()),
            param.name.as_deref().unwrap_or_default()
        )
    }

    fn unparse_variable(&self, variable: &Variable) -> String {
        let ty = self.unparse_type(variable.ty.as_ref());
        let name = variable.name.as_deref().unwrap_or_default();
        let value = match &variable.value {
            Some(value) => Some(self.unparse_element(value, NodeKind::Variable)),
            None => variable
                .ty
                .as_ref()
                .and_then(|ty| ty.primitive.default_value())
                .map(str::to_string),
        };
        let declared = if ty.is_empty() {
            name.to_string()
        } else {
            format!("{ty} {name}")
        };
        match value {
            Some(value) => format!("{declared} = {value};"),
            None => format!("{declared};"),
        }
    }

    fn unparse_operation(&self, op: &Operation, kind: NodeKind, parent: Option<NodeKind>) -> String {
        let center = op
            .center
            .as_ref()
            .map(|center| self.unparse_element(center, kind))
            .unwrap_or_default();
        let left = op.left.as_deref().map(|left| self.unparse_node(left, Some(kind)));
        let right = op
            .right
            .as_deref()
            .map(|right| self.unparse_node(right, Some(kind)));
        let rendered = match (left, right) {
            (Some(left), Some(right)) if center == "." => format!("{left}.{right}"),
            (Some(left), Some(right)) => format!("{left} {center} {right}"),
            (Some(left), None) => format!("{left}{center}"),
            (None, Some(right)) => format!("{center}{right}"),
            (None, None) => center,
        };
        if op.is_binary() && groups_operands(parent) {
            format!("({rendered})")
        } else {
            rendered
        }
    }

    fn unparse_modifier(&self, modifier: &Modifier, kind: NodeKind) -> String {
        let operator = modifier.operator.as_deref().unwrap_or_default();
        let value = modifier
            .value
            .as_ref()
            .map(|value| self.unparse_element(value, kind))
            .unwrap_or_default();
        if kind == NodeKind::PostMod {
            return format!("{value}{operator}");
        }
        // Keep `- -x` from printing as a decrement.
        if value.starts_with(['-', '+', '!', '~']) {
            format!("{operator} {value}")
        } else {
            format!("{operator}{value}")
        }
    }

    fn unparse_if(&self, stmt: &If) -> String {
        let condition = self.unparse_optional(stmt.condition.as_deref(), NodeKind::If);
        let body = self.unparse_body(stmt.body.as_ref());
        let otherwise = match stmt.otherwise.as_deref() {
            Some(otherwise) => self.unparse_node(otherwise, Some(NodeKind::If)),
            None => ";".to_string(),
        };
        format!("if ({condition})\n{body}\nelse\n{otherwise}")
    }

    fn unparse_loop(&self, stmt: &Loop, kind: NodeKind) -> String {
        let condition = self.unparse_optional(stmt.condition.as_deref(), kind);
        let body = self.unparse_body(stmt.body.as_ref());
        if kind == NodeKind::Do {
            format!("do\n{body}\nwhile ({condition});")
        } else {
            format!("while ({condition})\n{body}")
        }
    }

    fn unparse_for(&self, stmt: &For) -> String {
        format!(
            "for ({}; {}; {})\n{}",
            self.unparse_nodes(&stmt.precommands, NodeKind::For),
            self.unparse_optional(stmt.condition.as_deref(), NodeKind::For),
            self.unparse_nodes(&stmt.loopcommands, NodeKind::For),
            self.unparse_body(stmt.body.as_ref())
        )
    }

    fn unparse_target(&self, target: &Target, kind: NodeKind) -> String {
        match kind {
            NodeKind::StateChange => {
                format!("state {};", target.value.as_deref().unwrap_or("default"))
            }
            NodeKind::Jump => format!("jump {};", target.value.as_deref().unwrap_or_default()),
            _ => format!("@{};", target.value.as_deref().unwrap_or_default()),
        }
    }

    fn unparse_return(&self, stmt: &Return) -> String {
        match &stmt.value {
            Some(value) => format!("return {};", self.unparse_element(value, NodeKind::Return)),
            None => "return;".to_string(),
        }
    }

    fn unparse_call(&self, call: &Call) -> String {
        format!(
            "{}({})",
            call.name.as_deref().unwrap_or_default(),
            self.unparse_elements(&call.arguments, NodeKind::Call)
        )
    }

    fn unparse_cast(&self, cast: &Cast) -> String {
        let value = cast
            .value
            .as_ref()
            .map(|value| self.unparse_element(value, NodeKind::Cast))
            .unwrap_or_default();
        format!("({}){value}", self.unparse_type(cast.ty.as_ref()))
    }

    fn unparse_components<const N: usize>(&self, components: &Components<N>) -> String {
        format!(
            "<{}>",
            self.unparse_elements(components.components(), Components::<N>::kind())
        )
    }

    fn unparse_node(&self, node: &Node, parent: Option<NodeKind>) -> String {
        let kind = node.kind();
        match node {
            Node::Script(script) => self.unparse_script(script),
            Node::Function(function) => self.unparse_function(function),
            Node::Variable(variable) => self.unparse_variable(variable),
            Node::Param(param) => self.unparse_param(param),
            Node::Type(ty) => self.unparse_type(Some(ty)),
            Node::State(state) => self.unparse_state(state),
            Node::StateChange(target) | Node::Jump(target) | Node::Label(target) => {
                self.unparse_target(target, kind)
            }
            Node::Return(stmt) => self.unparse_return(stmt),
            Node::Call(call) => self.unparse_call(call),
            Node::Cast(cast) => self.unparse_cast(cast),
            Node::Body(body) => self.unparse_block(body),
            Node::If(stmt) => self.unparse_if(stmt),
            Node::While(stmt) | Node::Do(stmt) => self.unparse_loop(stmt, kind),
            Node::For(stmt) => self.unparse_for(stmt),
            Node::List(list) => format!("[{}]", self.unparse_elements(&list.values, kind)),
            Node::Vector(vector) => self.unparse_components(vector),
            Node::Quaternion(rotation) => self.unparse_components(rotation),
            Node::Value(op) | Node::Condition(op) => self.unparse_operation(op, kind, parent),
            Node::Expression(op) => {
                let rendered = self.unparse_operation(op, kind, parent);
                if parent == Some(NodeKind::Body) {
                    format!("{rendered};")
                } else {
                    rendered
                }
            }
            Node::PreMod(modifier) | Node::PostMod(modifier) => {
                self.unparse_modifier(modifier, kind)
            }
        }
    }
}

pub fn unparse(node: &Node) -> String {
    unparse_with(node, &UnparseOptions::default())
}

pub fn unparse_with(node: &Node, options: &UnparseOptions) -> String {
    Unparse::new(options).unparse_node(node, None)
}

impl Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&unparse(self))
    }
}
