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

/// The typed syntax tree produced by the converter and consumed by `unparse`.
///
/// Every variant declares the fields it accepts up front (see [`Schema`]), so the converter
/// never has to guess whether a child has somewhere to go. Nodes own their children outright;
/// there are no parent links. Rendering context is passed down explicitly instead.
use std::fmt::Display;
use std::str::FromStr;

use strum::{EnumIter, EnumString};

use crate::errors::CompileError;
use crate::precedence::assemble;

/// The generic scalar field that variants without a better-named slot fall back to.
pub const VALUE_FIELD: &str = "value";

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, EnumString, EnumIter, strum::Display)]
pub enum NodeKind {
    Script,
    Function,
    Variable,
    Param,
    Type,
    State,
    StateChange,
    Jump,
    Label,
    Return,
    Call,
    Cast,
    Body,
    If,
    While,
    Do,
    For,
    List,
    Vector,
    Quaternion,
    Value,
    Expression,
    Condition,
    PreMod,
    PostMod,
}

impl NodeKind {
    /// Kinds built by the expression assembler.
    pub fn is_expression(self) -> bool {
        matches!(self, Self::Value | Self::Expression | Self::Condition)
    }

    /// A fresh, empty node of this kind, ready to have its fields assigned.
    pub fn instantiate(self) -> Node {
        match self {
            Self::Script => Node::Script(Script::default()),
            Self::Function => Node::Function(Function::default()),
            Self::Variable => Node::Variable(Variable::default()),
            Self::Param => Node::Param(Param::default()),
            Self::Type => Node::Type(Type::default()),
            Self::State => Node::State(State::default()),
            Self::StateChange => Node::StateChange(Target::default()),
            Self::Jump => Node::Jump(Target::default()),
            Self::Label => Node::Label(Target::default()),
            Self::Return => Node::Return(Return::default()),
            Self::Call => Node::Call(Call::default()),
            Self::Cast => Node::Cast(Cast::default()),
            Self::Body => Node::Body(Body::default()),
            Self::If => Node::If(If::default()),
            Self::While => Node::While(Loop::default()),
            Self::Do => Node::Do(Loop::default()),
            Self::For => Node::For(For::default()),
            Self::List => Node::List(List::default()),
            Self::Vector => Node::Vector(Vector::default()),
            Self::Quaternion => Node::Quaternion(Quaternion::default()),
            Self::Value => Node::Value(Operation::default()),
            Self::Expression => Node::Expression(Operation::default()),
            Self::Condition => Node::Condition(Operation::default()),
            Self::PreMod => Node::PreMod(Modifier::default()),
            Self::PostMod => Node::PostMod(Modifier::default()),
        }
    }
}

/// What a converted subtree turns into: either the literal text of a leaf token, or a node.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Element {
    Text(String),
    Node(Box<Node>),
}

impl Element {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Node(_) => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Self::Node(node) => Some(node),
            Self::Text(_) => None,
        }
    }

    pub fn kind(&self) -> Option<NodeKind> {
        self.as_node().map(Node::kind)
    }

    /// Short human description, used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Self::Text(text) => format!("`{text}`"),
            Self::Node(node) => node.kind().to_string(),
        }
    }
}

impl From<Node> for Element {
    fn from(node: Node) -> Self {
        Self::Node(Box::new(node))
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Shape {
    Single,
    List,
}

/// One declared field of a variant.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub shape: Shape,
}

const fn single(name: &'static str) -> Field {
    Field {
        name,
        shape: Shape::Single,
    }
}

const fn list(name: &'static str) -> Field {
    Field {
        name,
        shape: Shape::List,
    }
}

/// The fixed field table of a variant, and the typed setters behind it.
///
/// Setters take ownership of the new value and hand back whatever previously occupied the
/// slot, fully detached.
pub trait Schema {
    const FIELDS: &'static [Field];
    /// Whether children that match no field are gathered into an overflow list.
    const OVERFLOW: bool = false;

    fn put(
        &mut self,
        kind: NodeKind,
        field: &str,
        value: Element,
    ) -> Result<Option<Element>, CompileError>;

    fn put_list(
        &mut self,
        kind: NodeKind,
        field: &str,
        values: Vec<Element>,
    ) -> Result<Vec<Element>, CompileError> {
        Err(no_field(kind, field, values.len()))
    }

    fn put_overflow(&mut self, kind: NodeKind, values: Vec<Element>) -> Result<(), CompileError> {
        if values.is_empty() {
            return Ok(());
        }
        Err(CompileError::DiscardedSubtree {
            kind,
            count: values.len(),
            text: values.iter().map(Element::describe).collect::<Vec<_>>().join(" "),
        })
    }
}

fn no_field(kind: NodeKind, field: &str, count: usize) -> CompileError {
    CompileError::FieldMismatch {
        kind,
        field: field.to_string(),
        found: format!("{count} value(s); no such field"),
    }
}

fn mismatch(kind: NodeKind, field: &str, found: &Element) -> CompileError {
    CompileError::FieldMismatch {
        kind,
        field: field.to_string(),
        found: found.describe(),
    }
}

fn expect_text(kind: NodeKind, field: &str, value: Element) -> Result<String, CompileError> {
    match value {
        Element::Text(text) => Ok(text),
        other => Err(mismatch(kind, field, &other)),
    }
}

fn expect_node(kind: NodeKind, field: &str, value: Element) -> Result<Box<Node>, CompileError> {
    match value {
        Element::Node(node) => Ok(node),
        other => Err(mismatch(kind, field, &other)),
    }
}

fn expect_type(kind: NodeKind, field: &str, value: Element) -> Result<Type, CompileError> {
    match value {
        Element::Node(node) => match *node {
            Node::Type(ty) => Ok(ty),
            other => Err(mismatch(kind, field, &other.into())),
        },
        other => Err(mismatch(kind, field, &other)),
    }
}

fn expect_body(kind: NodeKind, field: &str, value: Element) -> Result<Body, CompileError> {
    match value {
        Element::Node(node) => match *node {
            Node::Body(body) => Ok(body),
            other => Err(mismatch(kind, field, &other.into())),
        },
        other => Err(mismatch(kind, field, &other)),
    }
}

fn expect_nodes(
    kind: NodeKind,
    field: &str,
    values: Vec<Element>,
) -> Result<Vec<Node>, CompileError> {
    values
        .into_iter()
        .map(|value| expect_node(kind, field, value).map(|node| *node))
        .collect()
}

fn text_element(text: Option<String>) -> Option<Element> {
    text.map(Element::Text)
}

fn node_element<N: Into<Node>>(node: Option<N>) -> Option<Element> {
    node.map(|node| Element::from(node.into()))
}

fn node_elements<N: Into<Node>>(nodes: Vec<N>) -> Vec<Element> {
    nodes
        .into_iter()
        .map(|node| Element::from(node.into()))
        .collect()
}

/// The primitive types of the language. Closed; anything else is a schema error.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum PrimitiveType {
    #[default]
    #[strum(serialize = "void", serialize = "VOID")]
    Void,
    Integer,
    Float,
    String,
    Key,
    Vector,
    #[strum(serialize = "rotation", serialize = "quaternion")]
    Rotation,
    List,
}

impl PrimitiveType {
    pub fn parse(name: &str) -> Result<Self, CompileError> {
        Self::from_str(name).map_err(|_| CompileError::UnknownType(name.to_string()))
    }

    /// The literal a declaration of this type is initialized with when it has no explicit value.
    pub fn default_value(self) -> Option<&'static str> {
        match self {
            Self::Void => None,
            Self::Integer => Some("0"),
            Self::Float => Some("0.0"),
            Self::String | Self::Key => Some(r#""""#),
            Self::Vector => Some("<0.0, 0.0, 0.0>"),
            Self::Rotation => Some("<0.0, 0.0, 0.0, 0.0>"),
            Self::List => Some("[]"),
        }
    }

    pub fn is_void(self) -> bool {
        self == Self::Void
    }
}

impl Display for PrimitiveType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Void => write!(f, "void"),
            Self::Integer => write!(f, "integer"),
            Self::Float => write!(f, "float"),
            Self::String => write!(f, "string"),
            Self::Key => write!(f, "key"),
            Self::Vector => write!(f, "vector"),
            Self::Rotation => write!(f, "rotation"),
            Self::List => write!(f, "list"),
        }
    }
}

/// Default literal for a type named in source. `Ok(None)` for void.
pub fn default_value_for(name: &str) -> Result<Option<&'static str>, CompileError> {
    PrimitiveType::parse(name).map(PrimitiveType::default_value)
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Type {
    pub primitive: PrimitiveType,
}

impl Type {
    pub fn new(primitive: PrimitiveType) -> Self {
        Self { primitive }
    }
}

impl Schema for Type {
    const FIELDS: &'static [Field] = &[single(VALUE_FIELD)];

    fn put(
        &mut self,
        kind: NodeKind,
        field: &str,
        value: Element,
    ) -> Result<Option<Element>, CompileError> {
        if field != VALUE_FIELD {
            return Err(no_field(kind, field, 1));
        }
        let Element::Text(name) = value else {
            return Err(CompileError::UnknownType(value.describe()));
        };
        let previous = std::mem::replace(&mut self.primitive, PrimitiveType::parse(&name)?);
        // An unset type reads as void.
        Ok((!previous.is_void()).then(|| Element::Text(previous.to_string())))
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Script {
    /// Global variables and functions, in source order.
    pub globals: Vec<Node>,
    pub states: Vec<State>,
}

impl Script {
    /// Every function in the script: global functions first, then each state's event handlers.
    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        let globals = self.globals.iter().filter_map(|global| match global {
            Node::Function(function) => Some(function),
            _ => None,
        });
        globals.chain(self.states.iter().flat_map(|state| state.events.iter()))
    }

    pub fn functions_mut(&mut self) -> impl Iterator<Item = &mut Function> {
        let globals = self.globals.iter_mut().filter_map(|global| match global {
            Node::Function(function) => Some(function),
            _ => None,
        });
        globals.chain(
            self.states
                .iter_mut()
                .flat_map(|state| state.events.iter_mut()),
        )
    }
}

impl Schema for Script {
    const FIELDS: &'static [Field] = &[list("globals"), list("states")];

    fn put(
        &mut self,
        kind: NodeKind,
        field: &str,
        _value: Element,
    ) -> Result<Option<Element>, CompileError> {
        Err(no_field(kind, field, 1))
    }

    fn put_list(
        &mut self,
        kind: NodeKind,
        field: &str,
        values: Vec<Element>,
    ) -> Result<Vec<Element>, CompileError> {
        match field {
            "globals" => {
                let globals = expect_nodes(kind, field, values)?;
                if let Some(bad) = globals
                    .iter()
                    .find(|g| !matches!(g, Node::Variable(_) | Node::Function(_)))
                {
                    return Err(CompileError::FieldMismatch {
                        kind,
                        field: field.to_string(),
                        found: bad.kind().to_string(),
                    });
                }
                Ok(node_elements(std::mem::replace(&mut self.globals, globals)))
            }
            "states" => {
                let mut states = Vec::with_capacity(values.len());
                for value in values {
                    match *expect_node(kind, field, value)? {
                        Node::State(state) => states.push(state),
                        other => return Err(mismatch(kind, field, &other.into())),
                    }
                }
                Ok(node_elements(std::mem::replace(&mut self.states, states)))
            }
            _ => Err(no_field(kind, field, values.len())),
        }
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Function {
    /// Absent for functions and event handlers that return nothing.
    pub ty: Option<Type>,
    pub name: Option<String>,
    pub params: Vec<Param>,
    pub body: Option<Body>,
}

impl Function {
    pub fn is_void(&self) -> bool {
        self.ty.as_ref().is_none_or(|ty| ty.primitive.is_void())
    }
}

impl Schema for Function {
    const FIELDS: &'static [Field] = &[
        single("type"),
        single("name"),
        list("params"),
        single("body"),
    ];

    fn put(
        &mut self,
        kind: NodeKind,
        field: &str,
        value: Element,
    ) -> Result<Option<Element>, CompileError> {
        match field {
            "type" => Ok(node_element(
                self.ty.replace(expect_type(kind, field, value)?),
            )),
            "name" => Ok(text_element(
                self.name.replace(expect_text(kind, field, value)?),
            )),
            "body" => Ok(node_element(
                self.body.replace(expect_body(kind, field, value)?),
            )),
            _ => Err(no_field(kind, field, 1)),
        }
    }

    fn put_list(
        &mut self,
        kind: NodeKind,
        field: &str,
        values: Vec<Element>,
    ) -> Result<Vec<Element>, CompileError> {
        if field != "params" {
            return Err(no_field(kind, field, values.len()));
        }
        let mut params = Vec::with_capacity(values.len());
        for value in values {
            match *expect_node(kind, field, value)? {
                Node::Param(param) => params.push(param),
                other => return Err(mismatch(kind, field, &other.into())),
            }
        }
        Ok(node_elements(std::mem::replace(&mut self.params, params)))
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Variable {
    pub ty: Option<Type>,
    pub name: Option<String>,
    pub value: Option<Element>,
}

impl Schema for Variable {
    const FIELDS: &'static [Field] = &[single("type"), single("name"), single(VALUE_FIELD)];

    fn put(
        &mut self,
        kind: NodeKind,
        field: &str,
        value: Element,
    ) -> Result<Option<Element>, CompileError> {
        match field {
            "type" => Ok(node_element(
                self.ty.replace(expect_type(kind, field, value)?),
            )),
            "name" => Ok(text_element(
                self.name.replace(expect_text(kind, field, value)?),
            )),
            VALUE_FIELD => Ok(self.value.replace(value)),
            _ => Err(no_field(kind, field, 1)),
        }
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Param {
    pub ty: Option<Type>,
    pub name: Option<String>,
}

impl Param {
    pub fn new(primitive: PrimitiveType, name: impl Into<String>) -> Self {
        Self {
            ty: Some(Type::new(primitive)),
            name: Some(name.into()),
        }
    }
}

impl Schema for Param {
    const FIELDS: &'static [Field] = &[single("type"), single("name")];

    fn put(
        &mut self,
        kind: NodeKind,
        field: &str,
        value: Element,
    ) -> Result<Option<Element>, CompileError> {
        match field {
            "type" => Ok(node_element(
                self.ty.replace(expect_type(kind, field, value)?),
            )),
            "name" => Ok(text_element(
                self.name.replace(expect_text(kind, field, value)?),
            )),
            _ => Err(no_field(kind, field, 1)),
        }
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct State {
    /// `None` is the `default` state.
    pub name: Option<String>,
    pub events: Vec<Function>,
}

impl Schema for State {
    const FIELDS: &'static [Field] = &[single("name"), list("events")];

    fn put(
        &mut self,
        kind: NodeKind,
        field: &str,
        value: Element,
    ) -> Result<Option<Element>, CompileError> {
        match field {
            "name" => Ok(text_element(
                self.name.replace(expect_text(kind, field, value)?),
            )),
            _ => Err(no_field(kind, field, 1)),
        }
    }

    fn put_list(
        &mut self,
        kind: NodeKind,
        field: &str,
        values: Vec<Element>,
    ) -> Result<Vec<Element>, CompileError> {
        if field != "events" {
            return Err(no_field(kind, field, values.len()));
        }
        let mut events = Vec::with_capacity(values.len());
        for value in values {
            match *expect_node(kind, field, value)? {
                Node::Function(function) => events.push(function),
                other => return Err(mismatch(kind, field, &other.into())),
            }
        }
        Ok(node_elements(std::mem::replace(&mut self.events, events)))
    }
}

/// A named target: the state of a `state` change, the label of a `jump`, or a label itself.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Target {
    pub value: Option<String>,
}

impl Schema for Target {
    const FIELDS: &'static [Field] = &[single(VALUE_FIELD)];

    fn put(
        &mut self,
        kind: NodeKind,
        field: &str,
        value: Element,
    ) -> Result<Option<Element>, CompileError> {
        if field != VALUE_FIELD {
            return Err(no_field(kind, field, 1));
        }
        Ok(text_element(
            self.value.replace(expect_text(kind, field, value)?),
        ))
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Return {
    pub value: Option<Element>,
}

impl Schema for Return {
    const FIELDS: &'static [Field] = &[single(VALUE_FIELD)];

    fn put(
        &mut self,
        kind: NodeKind,
        field: &str,
        value: Element,
    ) -> Result<Option<Element>, CompileError> {
        if field != VALUE_FIELD {
            return Err(no_field(kind, field, 1));
        }
        Ok(self.value.replace(value))
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Call {
    pub name: Option<String>,
    pub arguments: Vec<Element>,
}

impl Call {
    pub fn new(name: impl Into<String>, arguments: Vec<Element>) -> Self {
        Self {
            name: Some(name.into()),
            arguments,
        }
    }
}

impl Schema for Call {
    const FIELDS: &'static [Field] = &[single("name"), list("arguments")];

    fn put(
        &mut self,
        kind: NodeKind,
        field: &str,
        value: Element,
    ) -> Result<Option<Element>, CompileError> {
        match field {
            "name" => Ok(text_element(
                self.name.replace(expect_text(kind, field, value)?),
            )),
            _ => Err(no_field(kind, field, 1)),
        }
    }

    fn put_list(
        &mut self,
        kind: NodeKind,
        field: &str,
        values: Vec<Element>,
    ) -> Result<Vec<Element>, CompileError> {
        if field != "arguments" {
            return Err(no_field(kind, field, values.len()));
        }
        Ok(std::mem::replace(&mut self.arguments, values))
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Cast {
    pub ty: Option<Type>,
    pub value: Option<Element>,
}

impl Schema for Cast {
    const FIELDS: &'static [Field] = &[single("type"), single(VALUE_FIELD)];

    fn put(
        &mut self,
        kind: NodeKind,
        field: &str,
        value: Element,
    ) -> Result<Option<Element>, CompileError> {
        match field {
            "type" => Ok(node_element(
                self.ty.replace(expect_type(kind, field, value)?),
            )),
            VALUE_FIELD => Ok(self.value.replace(value)),
            _ => Err(no_field(kind, field, 1)),
        }
    }
}

/// An ordered block of statements and declarations.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Body {
    pub statements: Vec<Node>,
}

impl Body {
    pub fn new(statements: Vec<Node>) -> Self {
        Self { statements }
    }

    /// Insert `node` so that it becomes statement `index`, shifting the rest down.
    pub fn insert(&mut self, index: usize, node: Node) -> Result<(), CompileError> {
        if index > self.statements.len() {
            return Err(CompileError::IndexOutOfBounds {
                index,
                len: self.statements.len(),
            });
        }
        self.statements.insert(index, node);
        Ok(())
    }

    pub fn push(&mut self, node: Node) {
        self.statements.push(node);
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Whether this body only wraps another body. Such bodies print as their child.
    pub fn is_redundant(&self) -> bool {
        matches!(self.statements.as_slice(), [Node::Body(_)])
    }
}

impl Schema for Body {
    const FIELDS: &'static [Field] = &[];
    const OVERFLOW: bool = true;

    fn put(
        &mut self,
        kind: NodeKind,
        field: &str,
        _value: Element,
    ) -> Result<Option<Element>, CompileError> {
        Err(no_field(kind, field, 1))
    }

    fn put_overflow(&mut self, kind: NodeKind, values: Vec<Element>) -> Result<(), CompileError> {
        self.statements = expect_nodes(kind, "statements", values)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct If {
    pub condition: Option<Box<Node>>,
    pub body: Option<Body>,
    pub otherwise: Option<Box<Node>>,
}

impl Schema for If {
    const FIELDS: &'static [Field] = &[single("condition"), single("body"), single("else")];

    fn put(
        &mut self,
        kind: NodeKind,
        field: &str,
        value: Element,
    ) -> Result<Option<Element>, CompileError> {
        match field {
            "condition" => Ok(self
                .condition
                .replace(expect_node(kind, field, value)?)
                .map(Element::Node)),
            "body" => Ok(node_element(
                self.body.replace(expect_body(kind, field, value)?),
            )),
            "else" => Ok(self
                .otherwise
                .replace(expect_node(kind, field, value)?)
                .map(Element::Node)),
            _ => Err(no_field(kind, field, 1)),
        }
    }
}

/// `while` and `do ... while` share their shape; the node kind tells them apart.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Loop {
    pub condition: Option<Box<Node>>,
    pub body: Option<Body>,
}

impl Schema for Loop {
    const FIELDS: &'static [Field] = &[single("condition"), single("body")];

    fn put(
        &mut self,
        kind: NodeKind,
        field: &str,
        value: Element,
    ) -> Result<Option<Element>, CompileError> {
        match field {
            "condition" => Ok(self
                .condition
                .replace(expect_node(kind, field, value)?)
                .map(Element::Node)),
            "body" => Ok(node_element(
                self.body.replace(expect_body(kind, field, value)?),
            )),
            _ => Err(no_field(kind, field, 1)),
        }
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct For {
    pub precommands: Vec<Node>,
    pub condition: Option<Box<Node>>,
    pub loopcommands: Vec<Node>,
    pub body: Option<Body>,
}

impl Schema for For {
    const FIELDS: &'static [Field] = &[
        list("precommands"),
        single("condition"),
        list("loopcommands"),
        single("body"),
    ];

    fn put(
        &mut self,
        kind: NodeKind,
        field: &str,
        value: Element,
    ) -> Result<Option<Element>, CompileError> {
        match field {
            "condition" => Ok(self
                .condition
                .replace(expect_node(kind, field, value)?)
                .map(Element::Node)),
            "body" => Ok(node_element(
                self.body.replace(expect_body(kind, field, value)?),
            )),
            _ => Err(no_field(kind, field, 1)),
        }
    }

    fn put_list(
        &mut self,
        kind: NodeKind,
        field: &str,
        values: Vec<Element>,
    ) -> Result<Vec<Element>, CompileError> {
        let slot = match field {
            "precommands" => &mut self.precommands,
            "loopcommands" => &mut self.loopcommands,
            _ => return Err(no_field(kind, field, values.len())),
        };
        let commands = expect_nodes(kind, field, values)?;
        Ok(node_elements(std::mem::replace(slot, commands)))
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct List {
    pub values: Vec<Element>,
}

impl Schema for List {
    const FIELDS: &'static [Field] = &[];
    const OVERFLOW: bool = true;

    fn put(
        &mut self,
        kind: NodeKind,
        field: &str,
        _value: Element,
    ) -> Result<Option<Element>, CompileError> {
        Err(no_field(kind, field, 1))
    }

    fn put_overflow(&mut self, _kind: NodeKind, values: Vec<Element>) -> Result<(), CompileError> {
        self.values = values;
        Ok(())
    }
}

/// A fixed-arity literal, addressed by axis name but stored in order.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Components<const N: usize> {
    values: Vec<Element>,
}

pub type Vector = Components<3>;
pub type Quaternion = Components<4>;

impl<const N: usize> Default for Components<N> {
    /// The zero literal.
    fn default() -> Self {
        Self {
            values: vec![Element::text("0.0"); N],
        }
    }
}

impl<const N: usize> Components<N> {
    pub fn kind() -> NodeKind {
        if N == 4 {
            NodeKind::Quaternion
        } else {
            NodeKind::Vector
        }
    }

    pub fn new(values: Vec<Element>) -> Result<Self, CompileError> {
        if values.len() != N {
            return Err(CompileError::WrongArity {
                kind: Self::kind(),
                expected: N,
                found: values.len(),
            });
        }
        Ok(Self { values })
    }

    pub fn components(&self) -> &[Element] {
        &self.values
    }

    pub fn x(&self) -> &Element {
        &self.values[0]
    }

    pub fn y(&self) -> &Element {
        &self.values[1]
    }

    pub fn z(&self) -> &Element {
        &self.values[2]
    }

    pub fn set_x(&mut self, value: Element) -> Element {
        std::mem::replace(&mut self.values[0], value)
    }

    pub fn set_y(&mut self, value: Element) -> Element {
        std::mem::replace(&mut self.values[1], value)
    }

    pub fn set_z(&mut self, value: Element) -> Element {
        std::mem::replace(&mut self.values[2], value)
    }
}

impl Components<4> {
    pub fn s(&self) -> &Element {
        &self.values[3]
    }

    pub fn set_s(&mut self, value: Element) -> Element {
        std::mem::replace(&mut self.values[3], value)
    }
}

impl<const N: usize> Schema for Components<N> {
    const FIELDS: &'static [Field] = &[];
    const OVERFLOW: bool = true;

    fn put(
        &mut self,
        kind: NodeKind,
        field: &str,
        _value: Element,
    ) -> Result<Option<Element>, CompileError> {
        Err(no_field(kind, field, 1))
    }

    fn put_overflow(&mut self, _kind: NodeKind, values: Vec<Element>) -> Result<(), CompileError> {
        *self = Self::new(values)?;
        Ok(())
    }
}

/// A binary expression as rebuilt by the assembler: an operator (or a lone operand) in the
/// center, with optional sub-expressions either side.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Operation {
    pub left: Option<Box<Node>>,
    pub center: Option<Element>,
    pub right: Option<Box<Node>>,
}

impl Operation {
    pub fn leaf(center: Element) -> Self {
        Self {
            left: None,
            center: Some(center),
            right: None,
        }
    }

    pub fn is_binary(&self) -> bool {
        self.left.is_some() || self.right.is_some()
    }
}

impl Schema for Operation {
    const FIELDS: &'static [Field] = &[single("left"), single("center"), single("right")];
    const OVERFLOW: bool = true;

    fn put(
        &mut self,
        kind: NodeKind,
        field: &str,
        value: Element,
    ) -> Result<Option<Element>, CompileError> {
        match field {
            "left" => Ok(self
                .left
                .replace(expect_node(kind, field, value)?)
                .map(Element::Node)),
            "center" => Ok(self.center.replace(value)),
            "right" => Ok(self
                .right
                .replace(expect_node(kind, field, value)?)
                .map(Element::Node)),
            _ => Err(no_field(kind, field, 1)),
        }
    }

    /// The overflow of an expression is its flat operand/operator sequence.
    fn put_overflow(&mut self, _kind: NodeKind, values: Vec<Element>) -> Result<(), CompileError> {
        *self = assemble(values)?;
        Ok(())
    }
}

/// Prefix or postfix operator applied to a single operand (`++i`, `-x`, `i--`).
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Modifier {
    pub operator: Option<String>,
    pub value: Option<Element>,
}

impl Schema for Modifier {
    const FIELDS: &'static [Field] = &[single("operator"), single(VALUE_FIELD)];

    fn put(
        &mut self,
        kind: NodeKind,
        field: &str,
        value: Element,
    ) -> Result<Option<Element>, CompileError> {
        match field {
            "operator" => Ok(text_element(
                self.operator.replace(expect_text(kind, field, value)?),
            )),
            VALUE_FIELD => Ok(self.value.replace(value)),
            _ => Err(no_field(kind, field, 1)),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Node {
    Script(Script),
    Function(Function),
    Variable(Variable),
    Param(Param),
    Type(Type),
    State(State),
    StateChange(Target),
    Jump(Target),
    Label(Target),
    Return(Return),
    Call(Call),
    Cast(Cast),
    Body(Body),
    If(If),
    While(Loop),
    Do(Loop),
    For(For),
    List(List),
    Vector(Vector),
    Quaternion(Quaternion),
    Value(Operation),
    Expression(Operation),
    Condition(Operation),
    PreMod(Modifier),
    PostMod(Modifier),
}

/// Run `$body` against the variant's payload, whatever its type.
macro_rules! with_payload {
    ($node:expr, $inner:ident => $body:expr) => {
        match $node {
            Node::Script($inner) => $body,
            Node::Function($inner) => $body,
            Node::Variable($inner) => $body,
            Node::Param($inner) => $body,
            Node::Type($inner) => $body,
            Node::State($inner) => $body,
            Node::StateChange($inner) | Node::Jump($inner) | Node::Label($inner) => $body,
            Node::Return($inner) => $body,
            Node::Call($inner) => $body,
            Node::Cast($inner) => $body,
            Node::Body($inner) => $body,
            Node::If($inner) => $body,
            Node::While($inner) | Node::Do($inner) => $body,
            Node::For($inner) => $body,
            Node::List($inner) => $body,
            Node::Vector($inner) => $body,
            Node::Quaternion($inner) => $body,
            Node::Value($inner) | Node::Expression($inner) | Node::Condition($inner) => $body,
            Node::PreMod($inner) | Node::PostMod($inner) => $body,
        }
    };
}

fn fields_of<S: Schema>(_: &S) -> &'static [Field] {
    S::FIELDS
}

fn overflows<S: Schema>(_: &S) -> bool {
    S::OVERFLOW
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Script(_) => NodeKind::Script,
            Self::Function(_) => NodeKind::Function,
            Self::Variable(_) => NodeKind::Variable,
            Self::Param(_) => NodeKind::Param,
            Self::Type(_) => NodeKind::Type,
            Self::State(_) => NodeKind::State,
            Self::StateChange(_) => NodeKind::StateChange,
            Self::Jump(_) => NodeKind::Jump,
            Self::Label(_) => NodeKind::Label,
            Self::Return(_) => NodeKind::Return,
            Self::Call(_) => NodeKind::Call,
            Self::Cast(_) => NodeKind::Cast,
            Self::Body(_) => NodeKind::Body,
            Self::If(_) => NodeKind::If,
            Self::While(_) => NodeKind::While,
            Self::Do(_) => NodeKind::Do,
            Self::For(_) => NodeKind::For,
            Self::List(_) => NodeKind::List,
            Self::Vector(_) => NodeKind::Vector,
            Self::Quaternion(_) => NodeKind::Quaternion,
            Self::Value(_) => NodeKind::Value,
            Self::Expression(_) => NodeKind::Expression,
            Self::Condition(_) => NodeKind::Condition,
            Self::PreMod(_) => NodeKind::PreMod,
            Self::PostMod(_) => NodeKind::PostMod,
        }
    }

    pub fn fields(&self) -> &'static [Field] {
        with_payload!(self, inner => fields_of(inner))
    }

    pub fn has_field(&self, name: &str, shape: Shape) -> bool {
        self.fields()
            .iter()
            .any(|field| field.name == name && field.shape == shape)
    }

    pub fn accepts_overflow(&self) -> bool {
        with_payload!(self, inner => overflows(inner))
    }

    /// Assign a singular field, returning its detached previous occupant.
    pub fn set(&mut self, field: &str, value: Element) -> Result<Option<Element>, CompileError> {
        let kind = self.kind();
        with_payload!(self, inner => inner.put(kind, field, value))
    }

    /// Replace a list field wholesale, returning the detached previous elements.
    pub fn set_list(
        &mut self,
        field: &str,
        values: Vec<Element>,
    ) -> Result<Vec<Element>, CompileError> {
        let kind = self.kind();
        with_payload!(self, inner => inner.put_list(kind, field, values))
    }

    /// Install the children that matched no declared field.
    pub fn set_overflow(&mut self, values: Vec<Element>) -> Result<(), CompileError> {
        let kind = self.kind();
        with_payload!(self, inner => inner.put_overflow(kind, values))
    }

    pub fn as_operation(&self) -> Option<&Operation> {
        match self {
            Self::Value(op) | Self::Expression(op) | Self::Condition(op) => Some(op),
            _ => None,
        }
    }
}

macro_rules! into_node {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Node {
                fn from(inner: $ty) -> Self {
                    Node::$variant(inner)
                }
            }
        )*
    };
}

into_node!(
    Script => Script,
    Function => Function,
    Variable => Variable,
    Param => Param,
    Type => Type,
    State => State,
    Return => Return,
    Call => Call,
    Cast => Cast,
    Body => Body,
    If => If,
    For => For,
    List => List,
    Vector => Vector,
    Quaternion => Quaternion,
);

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use strum::IntoEnumIterator;
    use test_case::test_case;

    #[test_case("integer", Some("0"))]
    #[test_case("float", Some("0.0"))]
    #[test_case("string", Some(r#""""#))]
    #[test_case("key", Some(r#""""#))]
    #[test_case("vector", Some("<0.0, 0.0, 0.0>"))]
    #[test_case("rotation", Some("<0.0, 0.0, 0.0, 0.0>"))]
    #[test_case("quaternion", Some("<0.0, 0.0, 0.0, 0.0>"))]
    #[test_case("list", Some("[]"))]
    #[test_case("void", None)]
    fn test_default_values(name: &str, expected: Option<&str>) {
        assert_eq!(default_value_for(name), Ok(expected));
    }

    #[test]
    fn test_default_value_rejects_unknown_type() {
        assert_eq!(
            default_value_for("matrix"),
            Err(CompileError::UnknownType("matrix".to_string()))
        );
    }

    #[test]
    fn test_every_primitive_round_trips_through_its_name() {
        for primitive in PrimitiveType::iter() {
            assert_eq!(PrimitiveType::parse(&primitive.to_string()), Ok(primitive));
        }
    }

    #[test]
    fn test_type_field_rejects_unknown_names() {
        let mut ty = NodeKind::Type.instantiate();
        assert_eq!(
            ty.set(VALUE_FIELD, Element::text("bogus")),
            Err(CompileError::UnknownType("bogus".to_string()))
        );
        assert_eq!(ty, Node::Type(Type::default()));
    }

    #[test]
    fn test_first_type_assignment_has_no_previous_occupant() {
        let mut ty = NodeKind::Type.instantiate();
        assert_eq!(ty.set(VALUE_FIELD, Element::text("integer")), Ok(None));
        assert_eq!(
            ty.set(VALUE_FIELD, Element::text("quaternion")),
            Ok(Some(Element::text("integer")))
        );
        assert_eq!(ty, Node::Type(Type::new(PrimitiveType::Rotation)));
    }

    #[test]
    fn test_vector_arity() {
        let three = vec![Element::text("1.0"), Element::text("2.0"), Element::text("3.0")];
        let vector = Vector::new(three.clone()).unwrap();
        assert_eq!(vector.y(), &Element::text("2.0"));

        assert_eq!(
            Quaternion::new(three.clone()),
            Err(CompileError::WrongArity {
                kind: NodeKind::Quaternion,
                expected: 4,
                found: 3,
            })
        );

        let mut node = NodeKind::Vector.instantiate();
        let mut four = three;
        four.push(Element::text("4.0"));
        assert!(matches!(
            node.set_overflow(four.clone()),
            Err(CompileError::WrongArity { expected: 3, found: 4, .. })
        ));

        let mut rotation = Quaternion::new(four).unwrap();
        assert_eq!(rotation.set_s(Element::text("1.0")), Element::text("4.0"));
        assert_eq!(rotation.s(), &Element::text("1.0"));
    }

    #[test]
    fn test_reassigning_a_field_detaches_the_previous_child() {
        let mut variable = NodeKind::Variable.instantiate();
        let first = Element::from(Node::Value(Operation::leaf(Element::text("1"))));
        let second = Element::from(Node::Value(Operation::leaf(Element::text("2"))));

        assert_eq!(variable.set(VALUE_FIELD, first.clone()), Ok(None));
        assert_eq!(variable.set(VALUE_FIELD, second.clone()), Ok(Some(first)));

        let Node::Variable(variable) = variable else {
            panic!("expected a variable");
        };
        assert_eq!(variable.value, Some(second));
    }

    #[test]
    fn test_list_field_transfers_all_elements() {
        let mut function = NodeKind::Function.instantiate();
        let params = vec![
            Element::from(Node::Param(Param::new(PrimitiveType::Integer, "a"))),
            Element::from(Node::Param(Param::new(PrimitiveType::Key, "b"))),
        ];
        assert_eq!(function.set_list("params", params.clone()), Ok(vec![]));
        assert_eq!(function.set_list("params", vec![]), Ok(params));
    }

    #[test]
    fn test_field_shape_is_checked() {
        let mut function = NodeKind::Function.instantiate();
        assert!(matches!(
            function.set("name", Element::from(Node::Body(Body::default()))),
            Err(CompileError::FieldMismatch { .. })
        ));
        assert!(matches!(
            function.set("missing", Element::text("x")),
            Err(CompileError::FieldMismatch { .. })
        ));
    }

    #[test]
    fn test_overflow_is_rejected_by_fixed_variants() {
        let mut call = NodeKind::Call.instantiate();
        assert!(!call.accepts_overflow());
        assert!(matches!(
            call.set_overflow(vec![Element::text("stray")]),
            Err(CompileError::DiscardedSubtree { kind: NodeKind::Call, count: 1, .. })
        ));
        assert_eq!(call.set_overflow(vec![]), Ok(()));
    }

    #[test]
    fn test_body_insert() {
        let mut body = Body::new(vec![Node::Jump(Target {
            value: Some("done".to_string()),
        })]);
        let label = Node::Label(Target {
            value: Some("top".to_string()),
        });
        body.insert(0, label.clone()).unwrap();
        assert_eq!(body.statements[0], label);
        assert_eq!(body.len(), 2);
        assert_eq!(
            body.insert(5, label),
            Err(CompileError::IndexOutOfBounds { index: 5, len: 2 })
        );
    }

    #[test]
    fn test_functions_covers_globals_and_events() {
        let function = |name: &str| Function {
            name: Some(name.to_string()),
            ..Default::default()
        };
        let script = Script {
            globals: vec![
                Node::Variable(Variable::default()),
                Node::Function(function("helper")),
            ],
            states: vec![
                State {
                    name: None,
                    events: vec![function("state_entry"), function("touch_start")],
                },
                State {
                    name: Some("off".to_string()),
                    events: vec![function("state_exit")],
                },
            ],
        };
        let names: Vec<_> = script
            .functions()
            .filter_map(|f| f.name.as_deref())
            .collect();
        assert_eq!(
            names,
            vec!["helper", "state_entry", "touch_start", "state_exit"]
        );
    }

    #[test]
    fn test_kind_names_parse_back() {
        for kind in NodeKind::iter() {
            assert_eq!(NodeKind::from_str(&kind.to_string()), Ok(kind));
            assert_eq!(kind.instantiate().kind(), kind);
        }
        assert!(NodeKind::from_str("Node").is_err());
    }
}
