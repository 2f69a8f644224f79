//! Expression AST nodes

use super::ops::{BinaryOp, UnaryOp};
use crate::symbols::SymbolId;
use crate::types::Type;
use serde::{Deserialize, Serialize};

/// A typed expression node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    pub kind: ExpressionKind,
    /// Resolved type of the whole expression
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExpressionKind {
    Literal(Literal),

    Identifier(SymbolId),

    Subscript {
        base: Box<Expression>,
        index: Box<Expression>,
    },

    Member {
        base: Box<Expression>,
        member_index: usize,
        /// true for `->`, false for `.`
        is_arrow: bool,
    },

    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },

    Binary {
        op: BinaryOp,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },

    Assignment {
        op: BinaryOp,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },

    Ternary {
        condition: Box<Expression>,
        then_expr: Box<Expression>,
        else_expr: Box<Expression>,
    },

    Call {
        callee: SymbolId,
        arguments: Vec<Expression>,
    },

    /// Conversion; the target is the node's own type
    Cast {
        operand: Box<Expression>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Boolean(bool),
    Character(char),
    Integer(i32),
    Floating(f64),
    /// Index into the translation unit's string table
    String(usize),
}

impl Expression {
    pub fn new(kind: ExpressionKind, ty: Type) -> Self {
        Self { kind, ty }
    }

    /// An expression designating a storage location
    pub fn is_lvalue(&self) -> bool {
        matches!(
            self.kind,
            ExpressionKind::Identifier(_)
                | ExpressionKind::Subscript { .. }
                | ExpressionKind::Member { .. }
                | ExpressionKind::Unary {
                    op: UnaryOp::Indirection,
                    ..
                }
        )
    }

    pub fn int_literal(value: i32) -> Self {
        Self::new(ExpressionKind::Literal(Literal::Integer(value)), Type::Integer)
    }

    pub fn float_literal(value: f64) -> Self {
        Self::new(
            ExpressionKind::Literal(Literal::Floating(value)),
            Type::Floating,
        )
    }

    pub fn string_literal(index: usize) -> Self {
        Self::new(
            ExpressionKind::Literal(Literal::String(index)),
            Type::Array(Box::new(Type::Character)),
        )
    }

    pub fn identifier(id: SymbolId, ty: Type) -> Self {
        Self::new(ExpressionKind::Identifier(id), ty)
    }

    pub fn binary(op: BinaryOp, lhs: Expression, rhs: Expression, ty: Type) -> Self {
        Self::new(
            ExpressionKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            ty,
        )
    }

    pub fn unary(op: UnaryOp, operand: Expression, ty: Type) -> Self {
        Self::new(
            ExpressionKind::Unary {
                op,
                operand: Box::new(operand),
            },
            ty,
        )
    }

    pub fn assignment(op: BinaryOp, lhs: Expression, rhs: Expression) -> Self {
        let ty = lhs.ty.clone();
        Self::new(
            ExpressionKind::Assignment {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            ty,
        )
    }

    pub fn call(callee: SymbolId, arguments: Vec<Expression>, ty: Type) -> Self {
        Self::new(ExpressionKind::Call { callee, arguments }, ty)
    }
}
