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

/// Operator precedence, and the assembler that uses it to turn the parser's flat
/// operand/operator runs into binary trees.
/// Higher numbers = higher precedence (more tightly binding)
use strum::{EnumIter, IntoEnumIterator};
use tracing::trace;

use crate::ast::{Element, Node, Operation};
use crate::errors::CompileError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, EnumIter)]
#[repr(u8)]
pub enum Precedence {
    Assign = 1,          // = += -= *= /= %= (lowest precedence)
    Or = 2,              // ||
    And = 3,             // &&
    BitOr = 4,           // |
    BitXor = 5,          // ^
    BitAnd = 6,          // &
    Equality = 7,        // == !=
    Relational = 8,      // < <= > >=
    Shift = 9,           // << >>
    Additive = 10,       // + -
    Multiplicative = 11, // * / %
    Member = 12,         // .
}

impl Precedence {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn operators(self) -> &'static [&'static str] {
        match self {
            Self::Assign => &["=", "+=", "-=", "*=", "/=", "%="],
            Self::Or => &["||"],
            Self::And => &["&&"],
            Self::BitOr => &["|"],
            Self::BitXor => &["^"],
            Self::BitAnd => &["&"],
            Self::Equality => &["==", "!="],
            Self::Relational => &["<", "<=", ">", ">="],
            Self::Shift => &["<<", ">>"],
            Self::Additive => &["+", "-"],
            Self::Multiplicative => &["*", "/", "%"],
            Self::Member => &["."],
        }
    }

    /// The group an operator symbol belongs to, if any.
    pub fn of(symbol: &str) -> Option<Self> {
        Self::iter().find(|level| level.operators().contains(&symbol))
    }

    fn matches(self, element: &Element) -> bool {
        element
            .as_text()
            .is_some_and(|text| self.operators().contains(&text))
    }
}

/// Rebuild one expression from a flat sequence of operands and operator tokens.
///
/// The loosest-binding group present in the sequence wins; within it the leftmost
/// occurrence becomes the center. Everything before it is the left operand and everything
/// strictly after it the right operand, each assembled the same way.
pub fn assemble(mut values: Vec<Element>) -> Result<Operation, CompileError> {
    if values.is_empty() {
        return Err(CompileError::EmptyExpression);
    }
    if values.len() == 1 {
        return Ok(Operation::leaf(values.remove(0)));
    }

    for level in Precedence::iter() {
        let Some(position) = values.iter().position(|element| level.matches(element)) else {
            continue;
        };
        trace!(?level, position, len = values.len(), "splitting expression");
        let right = values.split_off(position + 1);
        let center = values.pop();
        let left = values;
        return Ok(Operation {
            left: operand(left)?,
            center,
            right: operand(right)?,
        });
    }

    Err(CompileError::PartialExpression(
        values.iter().map(Element::describe).collect::<Vec<_>>().join(" "),
    ))
}

/// One side of a split. A lone, already-built expression is reused as-is; anything else is
/// assembled into a fresh sub-expression.
fn operand(mut values: Vec<Element>) -> Result<Option<Box<Node>>, CompileError> {
    if values.is_empty() {
        return Ok(None);
    }
    if values.len() == 1 && values[0].kind().is_some_and(|kind| kind.is_expression()) {
        if let Some(Element::Node(node)) = values.pop() {
            return Ok(Some(node));
        }
    }
    Ok(Some(Box::new(Node::Value(assemble(values)?))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeKind;
    use crate::unparse::unparse;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn tokens(source: &str) -> Vec<Element> {
        source.split_whitespace().map(Element::text).collect()
    }

    fn printed(source: &str) -> String {
        unparse(&Node::Value(assemble(tokens(source)).unwrap()))
    }

    #[test]
    fn test_multiplication_binds_tighter() {
        assert_eq!(printed("a + b * c"), "a + (b * c)");
        assert_eq!(printed("a * b + c"), "(a * b) + c");
    }

    #[test]
    fn test_assignment_binds_loosest() {
        assert_eq!(printed("a = b + c"), "a = (b + c)");
        assert_eq!(printed("a += b || c"), "a += (b || c)");
    }

    #[test_case("a = b", "a = b"; "assignment")]
    #[test_case("a || b && c", "a || (b && c)"; "or over and")]
    #[test_case("a && b | c", "a && (b | c)"; "and over bit or")]
    #[test_case("a | b ^ c", "a | (b ^ c)"; "bit or over bit xor")]
    #[test_case("a ^ b & c", "a ^ (b & c)"; "bit xor over bit and")]
    #[test_case("a & b == c", "a & (b == c)"; "bit and over equality")]
    #[test_case("a != b < c", "a != (b < c)"; "equality over relational")]
    #[test_case("a >= b << c", "a >= (b << c)"; "relational over shift")]
    #[test_case("a >> b - c", "a >> (b - c)"; "shift over additive")]
    #[test_case("a - b % c", "a - (b % c)"; "additive over multiplicative")]
    #[test_case("a / v . x", "a / (v.x)"; "multiplicative over member")]
    fn test_each_precedence_group(source: &str, expected: &str) {
        assert_eq!(printed(source), expected);
    }

    #[test]
    fn test_right_operand_is_everything_after_the_operator() {
        let op = assemble(tokens("a = b + c")).unwrap();
        assert_eq!(op.center, Some(Element::text("=")));

        let left = op.left.unwrap();
        assert_eq!(
            left.as_operation().unwrap(),
            &Operation::leaf(Element::text("a"))
        );

        let right = op.right.unwrap();
        let right = right.as_operation().unwrap();
        assert_eq!(right.center, Some(Element::text("+")));
        assert_eq!(
            right.left.as_deref().and_then(Node::as_operation),
            Some(&Operation::leaf(Element::text("b")))
        );
        assert_eq!(
            right.right.as_deref().and_then(Node::as_operation),
            Some(&Operation::leaf(Element::text("c")))
        );
    }

    #[test]
    fn test_same_group_splits_at_leftmost_operator() {
        // The leftmost operator of the loosest group is the root, so runs of one group
        // nest to the right.
        assert_eq!(printed("a - b - c"), "a - (b - c)");
        assert_eq!(printed("a = b = c"), "a = (b = c)");
    }

    #[test]
    fn test_single_element_is_the_center() {
        let op = assemble(vec![Element::text("x")]).unwrap();
        assert_eq!(op, Operation::leaf(Element::text("x")));
        assert!(!op.is_binary());
    }

    #[test]
    fn test_prebuilt_operand_is_reused() {
        let inner = Node::Value(assemble(tokens("b + c")).unwrap());
        let values = vec![inner.clone().into(), Element::text("*"), Element::text("d")];
        let op = assemble(values).unwrap();
        assert_eq!(op.left.as_deref(), Some(&inner));
        assert_eq!(
            unparse(&Node::Value(op)),
            "(b + c) * d"
        );
    }

    #[test]
    fn test_empty_expression() {
        assert_eq!(assemble(vec![]), Err(CompileError::EmptyExpression));
    }

    #[test]
    fn test_partial_expression() {
        let values = vec![
            Element::text("a"),
            Element::from(NodeKind::List.instantiate()),
        ];
        assert_eq!(
            assemble(values),
            Err(CompileError::PartialExpression("`a` List".to_string()))
        );
    }

    #[test]
    fn test_operator_groups() {
        assert_eq!(Precedence::of("+="), Some(Precedence::Assign));
        assert_eq!(Precedence::of("."), Some(Precedence::Member));
        assert_eq!(Precedence::of("!"), None);
        assert!(Precedence::Assign.as_u8() < Precedence::Member.as_u8());
    }
}
