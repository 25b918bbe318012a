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

/// Kicks off the Pest parser and converts its output into our AST.
/// This is the main entry point for parsing.
use once_cell::sync::Lazy;
use pest::error::LineColLocation;
pub use pest::Parser as PestParser;
use tracing::debug;

use crate::ast::{Node, Script};
use crate::convert::TreeTransformer;
use crate::cst::{PestToRawConverter, RawNode};
use crate::errors::CompileError;
use crate::schema::{SchemaRegistry, Vocabulary};

pub mod lsl {
    #[derive(Parser)]
    #[grammar = "src/lsl.pest"]
    pub struct LslParser;
}

use lsl::{LslParser, Rule};

static LSL_SCHEMA: Lazy<SchemaRegistry<Rule>> = Lazy::new(SchemaRegistry::build);

impl Vocabulary for Rule {
    fn all() -> Vec<Self> {
        Rule::all_rules().to_vec()
    }

    fn symbol(self) -> String {
        format!("{self:?}")
    }

    fn registry() -> &'static SchemaRegistry<Self> {
        &LSL_SCHEMA
    }
}

fn parse_error(e: pest::error::Error<Rule>) -> CompileError {
    let (line, column) = match e.line_col {
        LineColLocation::Pos(lc) => lc,
        LineColLocation::Span(begin, _) => begin,
    };
    CompileError::ParseError {
        line,
        column,
        context: e.line().to_string(),
        message: e.variant.message().to_string(),
    }
}

/// Parse source into the untyped raw tree, rooted at `SCRIPT`.
pub fn parse_raw(program_text: &str) -> Result<RawNode<Rule>, CompileError> {
    let mut pairs = LslParser::parse(Rule::SCRIPT, program_text).map_err(parse_error)?;
    let Some(script) = pairs.next() else {
        return Err(CompileError::NotAScript("nothing".to_string()));
    };
    Ok(PestToRawConverter::new(Some(Rule::EOI)).convert_pair(script))
}

pub fn parse_program(program_text: &str) -> Result<Script, CompileError> {
    let raw = parse_raw(program_text)?;
    let node = TreeTransformer::for_vocabulary().convert_node(&raw)?;
    match node {
        Node::Script(script) => {
            debug!(
                globals = script.globals.len(),
                states = script.states.len(),
                "parsed script"
            );
            Ok(script)
        }
        other => Err(CompileError::NotAScript(other.kind().to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Body, Element, NodeKind, PrimitiveType, Target};
    use crate::unparse::unparse;
    use pretty_assertions::assert_eq;
    use unindent::unindent;

    fn handler_body(source: &str) -> Vec<Node> {
        let script = parse_program(&format!("default {{ state_entry() {{ {source} }} }}")).unwrap();
        let handler = script.functions().next().unwrap();
        handler.body.clone().unwrap().statements
    }

    fn first_statement(source: &str) -> String {
        unparse(&handler_body(source)[0])
    }

    #[test]
    fn test_globals_and_states() {
        let program = unindent(
            r#"
            integer counter;
            string label = "x";
            float half(float x) { return x / 2; }
            default { state_entry() { } }
            state running { touch_start(integer n) { } }
            "#,
        );
        let script = parse_program(&program).unwrap();
        let kinds: Vec<_> = script.globals.iter().map(Node::kind).collect();
        assert_eq!(
            kinds,
            vec![NodeKind::Variable, NodeKind::Variable, NodeKind::Function]
        );

        assert_eq!(script.states.len(), 2);
        assert_eq!(script.states[0].name, None);
        assert_eq!(script.states[1].name.as_deref(), Some("running"));

        let handler = &script.states[1].events[0];
        assert_eq!(handler.name.as_deref(), Some("touch_start"));
        assert!(handler.is_void());
        assert_eq!(handler.params[0].ty.as_ref().map(|ty| ty.primitive), Some(PrimitiveType::Integer));

        let Node::Function(half) = &script.globals[2] else {
            panic!("expected a function");
        };
        assert!(!half.is_void());
    }

    #[test]
    fn test_state_change_targets() {
        let statements = handler_body("state off; state default;");
        assert_eq!(
            statements,
            vec![
                Node::StateChange(Target {
                    value: Some("off".to_string())
                }),
                Node::StateChange(Target::default()),
            ]
        );
    }

    #[test]
    fn test_expression_grouping_follows_precedence() {
        assert_eq!(first_statement("x = a + b * c;"), "x = (a + (b * c))");
        assert_eq!(first_statement("x = (a + b) * c;"), "x = ((a + b) * c)");
        assert_eq!(first_statement("ok = a < b && c;"), "ok = ((a < b) && c)");
    }

    #[test]
    fn test_prefix_and_postfix_operators() {
        assert_eq!(first_statement("x = -y;"), "x = -y");
        assert_eq!(first_statement("++i;"), "++i");
        assert_eq!(first_statement("i--;"), "i--");
        assert_eq!(first_statement("ok = !found;"), "ok = !found");
        assert_eq!(first_statement("x = - -y;"), "x = - -y");
    }

    #[test]
    fn test_literals() {
        assert_eq!(first_statement("x = 0x1F;"), "x = 0x1F");
        assert_eq!(first_statement("f = 1.5e3;"), "f = 1.5e3");
        assert_eq!(first_statement(r#"s = "a \"quoted\" word";"#), r#"s = "a \"quoted\" word""#);
        assert_eq!(first_statement("l = [];"), "l = []");
    }

    #[test]
    fn test_closing_angle_ends_vector_literals() {
        assert_eq!(
            first_statement("v = <1.0, 2.0, 3.0> - p;"),
            "v = (<1.0, 2.0, 3.0> - p)"
        );
        assert_eq!(
            first_statement("r = <0.0, 0.0, 0.0, 1.0> * -q;"),
            "r = (<0.0, 0.0, 0.0, 1.0> * -q)"
        );
        assert_eq!(
            first_statement("v = <1, 2, f(a > b)> + <0, 0, (c > d)>;"),
            "v = (<1, 2, f(a > b)> + <0, 0, (c > d)>)"
        );
        assert_eq!(first_statement("ok = <1, 2, z >= 3>;"), "ok = <1, 2, z >= 3>");
    }

    #[test]
    fn test_quaternion_is_rotation() {
        let script = parse_program("quaternion q;").unwrap();
        let Node::Variable(variable) = &script.globals[0] else {
            panic!("expected a variable");
        };
        assert_eq!(variable.ty.as_ref().map(|ty| ty.primitive), Some(PrimitiveType::Rotation));
        assert_eq!(unparse(&Node::Script(script)), "rotation q = <0.0, 0.0, 0.0, 0.0>;");
    }

    #[test]
    fn test_postfix_on_member() {
        assert_eq!(first_statement("v.x++;"), "v.x++");
        assert_eq!(first_statement("v.x--;"), "v.x--");
    }

    #[test]
    fn test_unbraced_bodies() {
        let statements = handler_body("while (i < 3) i++; do ; while (i); if (a) { { x = 1; } }");
        let Node::While(loop_) = &statements[0] else {
            panic!("expected a while loop");
        };
        assert_eq!(loop_.body.as_ref().map(Body::len), Some(1));
        assert!(matches!(statements[1], Node::Do(_)));
        assert!(matches!(statements[2], Node::If(_)));
    }

    #[test]
    fn test_call_arguments() {
        let statements = handler_body("llSetPos(<1.0, 2.0, z + 1>);");
        let Node::Expression(op) = &statements[0] else {
            panic!("expected an expression");
        };
        let Some(Element::Node(call)) = &op.center else {
            panic!("expected a call");
        };
        let Node::Call(call) = call.as_ref() else {
            panic!("expected a call");
        };
        assert_eq!(call.name.as_deref(), Some("llSetPos"));
        assert_eq!(call.arguments.len(), 1);
        assert_eq!(unparse(&statements[0]), "llSetPos(<1.0, 2.0, z + 1>)");
    }

    #[test]
    fn test_comments_are_skipped() {
        let statements = handler_body("// leading\n x = 1; /* trailing */");
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn test_keywords_are_not_identifiers() {
        // `done` starts with `do`, `iffy` with `if`.
        assert_eq!(first_statement("done = iffy;"), "done = iffy");
        assert!(parse_program("integer if = 1;").is_err());
    }

    #[test]
    fn test_parse_error_position() {
        let program = unindent(
            "
            default {
              state_entry() {
                x = ;
              }
            }",
        );
        let Err(CompileError::ParseError { line, context, .. }) = parse_program(&program) else {
            panic!("expected a parse error");
        };
        assert_eq!(line, 3);
        assert_eq!(context.trim(), "x = ;");
    }

    #[test]
    fn test_raw_tree_keeps_source_text() {
        let raw = parse_raw("integer x = 1 + 2;").unwrap();
        let globals = &raw.children[0];
        assert_eq!(globals.token, Rule::GLOBALS);
        let variable = &globals.children[0];
        assert_eq!(variable.token, Rule::VARIABLE);
        assert_eq!(variable.text, "integer x = 1 + 2;");
    }

    #[test]
    fn test_every_vocabulary_symbol_has_a_field_name() {
        let registry = Rule::registry();
        for rule in Rule::all() {
            assert_eq!(registry.field_name(rule), format!("{rule:?}").to_lowercase());
        }
        assert_eq!(registry.kind_for(Rule::STATE_CHANGE), Some(NodeKind::StateChange));
        assert_eq!(registry.kind_for(Rule::PARAMS), None);
    }
}
