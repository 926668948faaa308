//! Expression nodes.

use enum_dispatch::enum_dispatch;

use super::{Ast, AstNode, Id, Operator};
use crate::config::StackMode;
use crate::source::InputSpan;
use crate::typing::{Type, TypeSlot};

/// Handle of any expression node.
#[enum_dispatch]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Expression {
    Integer(Id<Integer>),
    PositionalParameter(Id<PositionalParameter>),
    String(Id<StringLiteral>),
    StackMode(Id<StackModeLiteral>),
    Identifier(Id<Identifier>),
    Builtin(Id<Builtin>),
    Call(Id<Call>),
    Sizeof(Id<Sizeof>),
    Offsetof(Id<Offsetof>),
    Map(Id<Map>),
    Variable(Id<Variable>),
    Binop(Id<Binop>),
    Unop(Id<Unop>),
    FieldAccess(Id<FieldAccess>),
    ArrayAccess(Id<ArrayAccess>),
    Cast(Id<Cast>),
    Tuple(Id<Tuple>),
    Ternary(Id<Ternary>),
}

// Like in the statement module, generated methods stay private and are exposed through
// inherent methods on `Expression`.
#[enum_dispatch(Expression)]
trait ExpressionKind {
    fn info_<'a>(&self, ast: &'a Ast) -> &'a ExprInfo;
    fn info_mut_<'a>(&self, ast: &'a mut Ast) -> &'a mut ExprInfo;
}

/// Implemented by expression node types.
pub trait ExprNode: AstNode {
    fn info(&self) -> &ExprInfo;
    fn info_mut(&mut self) -> &mut ExprInfo;
}

impl<T: ExprNode + 'static> ExpressionKind for Id<T> {
    fn info_<'a>(&self, ast: &'a Ast) -> &'a ExprInfo {
        ast[*self].info()
    }

    fn info_mut_<'a>(&self, ast: &'a mut Ast) -> &'a mut ExprInfo {
        ast[*self].info_mut()
    }
}

macro_rules! impl_expr_node {
    ($($type_name:ty),* $(,)?) => {
        $(
            impl ExprNode for $type_name {
                fn info(&self) -> &ExprInfo {
                    &self.info
                }

                fn info_mut(&mut self) -> &mut ExprInfo {
                    &mut self.info
                }
            }
        )*
    };
}

impl_expr_node!(
    Integer,
    PositionalParameter,
    StringLiteral,
    StackModeLiteral,
    Identifier,
    Builtin,
    Call,
    Sizeof,
    Offsetof,
    Map,
    Variable,
    Binop,
    Unop,
    FieldAccess,
    ArrayAccess,
    Cast,
    Tuple,
    Ternary,
);

impl Expression {
    pub fn info(self, ast: &Ast) -> &ExprInfo {
        self.info_(ast)
    }

    pub fn info_mut(self, ast: &mut Ast) -> &mut ExprInfo {
        self.info_mut_(ast)
    }

    pub fn location(self, ast: &Ast) -> InputSpan {
        self.info(ast).loc
    }

    /// Literals that need no evaluation: integers, strings, stack modes and
    /// positional parameters.
    pub fn is_literal(self) -> bool {
        match self {
            Expression::Integer(_)
            | Expression::String(_)
            | Expression::StackMode(_)
            | Expression::PositionalParameter(_) => true,
            _ => false,
        }
    }

    pub fn is_map(self) -> bool {
        match self {
            Expression::Map(_) => true,
            _ => false,
        }
    }

    pub fn is_variable(self) -> bool {
        match self {
            Expression::Variable(_) => true,
            _ => false,
        }
    }
}

/// Data shared by all expression nodes.
#[derive(Debug)]
pub struct ExprInfo {
    pub loc: InputSpan,
    pub(crate) ty: TypeSlot,

    /// Map this expression is a key of.
    pub key_for_map: Option<Id<Map>>,

    /// Map this expression is assigned to.
    pub map: Option<Id<Map>>,

    /// Variable this expression is assigned to.
    pub var: Option<Id<Variable>>,
}

impl ExprInfo {
    pub(crate) fn with_slot(loc: InputSpan, ty: TypeSlot) -> ExprInfo {
        ExprInfo {
            loc,
            ty,
            key_for_map: None,
            map: None,
            var: None,
        }
    }

    /// Type known at construction.
    pub fn fixed(loc: InputSpan, type_: Type) -> ExprInfo {
        ExprInfo::with_slot(loc, TypeSlot::fixed(type_))
    }

    /// Type set later through `Ast::set_type`.
    pub fn bound(loc: InputSpan) -> ExprInfo {
        ExprInfo::with_slot(loc, TypeSlot::unbound())
    }

    /// Type computed from the types of child expressions.
    pub fn derived(loc: InputSpan) -> ExprInfo {
        ExprInfo::with_slot(loc, TypeSlot::derived())
    }
}

#[derive(Debug)]
pub struct Integer {
    pub info: ExprInfo,
    pub value: i64,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ParameterRef {
    /// `$1`, `$2`, ...
    Index(usize),

    /// `$#`
    Count,
}

#[derive(Debug)]
pub struct PositionalParameter {
    pub info: ExprInfo,
    pub param: ParameterRef,
}

#[derive(Debug)]
pub struct StringLiteral {
    pub info: ExprInfo,
    pub value: String,
}

#[derive(Debug)]
pub struct StackModeLiteral {
    pub info: ExprInfo,
    pub mode: StackMode,
}

#[derive(Debug)]
pub struct Identifier {
    pub info: ExprInfo,
    pub name: String,
}

#[derive(Debug)]
pub struct Builtin {
    pub info: ExprInfo,
    pub name: String,
}

#[derive(Debug)]
pub struct Call {
    pub info: ExprInfo,
    pub func: String,
    pub args: Vec<Expression>,
}

/// Operand of `sizeof` and `offsetof`.
#[derive(Debug, Clone)]
pub enum TypeOrExpr {
    Type(Type),
    Expr(Expression),
}

#[derive(Debug)]
pub struct Sizeof {
    pub info: ExprInfo,
    pub arg: TypeOrExpr,
}

#[derive(Debug)]
pub struct Offsetof {
    pub info: ExprInfo,
    pub record: TypeOrExpr,
    pub field: String,
}

#[derive(Debug)]
pub struct Map {
    pub info: ExprInfo,
    pub ident: String,
    pub key: Option<Expression>,
}

#[derive(Debug)]
pub struct Variable {
    pub info: ExprInfo,
    pub ident: String,
}

#[derive(Debug)]
pub struct Binop {
    pub info: ExprInfo,
    pub left: Expression,
    pub op: Operator,
    pub right: Expression,
}

#[derive(Debug)]
pub struct Unop {
    pub info: ExprInfo,
    pub op: Operator,
    pub expr: Expression,
    pub is_post_op: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldName {
    Named(String),

    /// Tuple element index.
    Index(usize),
}

#[derive(Debug)]
pub struct FieldAccess {
    pub info: ExprInfo,
    pub expr: Expression,
    pub field: FieldName,
}

#[derive(Debug)]
pub struct ArrayAccess {
    pub info: ExprInfo,
    pub expr: Expression,
    pub index: Expression,
}

#[derive(Debug)]
pub struct Cast {
    pub info: ExprInfo,
    pub cast_type: Type,
    pub expr: Expression,
}

#[derive(Debug)]
pub struct Tuple {
    pub info: ExprInfo,
    pub elems: Vec<Expression>,
}

#[derive(Debug)]
pub struct Ternary {
    pub info: ExprInfo,
    pub cond: Expression,
    pub left: Expression,
    pub right: Expression,
}
