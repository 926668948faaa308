//! Statement nodes.

use enum_dispatch::enum_dispatch;

use super::{Ast, AstNode, Expression, Id, JumpKind, Map, Variable};
use crate::source::InputSpan;
use crate::typing::Type;

/// Handle of any statement node.
#[enum_dispatch]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Statement {
    Expr(Id<ExprStatement>),
    VarDecl(Id<VarDeclStatement>),
    AssignMap(Id<AssignMapStatement>),
    AssignVar(Id<AssignVarStatement>),
    AssignConfigVar(Id<AssignConfigVarStatement>),
    Block(Id<Block>),
    If(Id<If>),
    Unroll(Id<Unroll>),
    Jump(Id<Jump>),
    While(Id<While>),
    For(Id<For>),
    Config(Id<Config>),
}

#[enum_dispatch(Statement)]
trait StatementKind {
    fn location_(&self, ast: &Ast) -> InputSpan;
}

/// Implemented by statement node types.
pub trait StmtNode: AstNode {
    fn location(&self) -> InputSpan;
}

impl<T: StmtNode> StatementKind for Id<T> {
    fn location_(&self, ast: &Ast) -> InputSpan {
        ast[*self].location()
    }
}

macro_rules! impl_stmt_node {
    ($($type_name:ty),* $(,)?) => {
        $(
            impl StmtNode for $type_name {
                fn location(&self) -> InputSpan {
                    self.loc
                }
            }
        )*
    };
}

impl_stmt_node!(
    ExprStatement,
    VarDeclStatement,
    AssignMapStatement,
    AssignVarStatement,
    AssignConfigVarStatement,
    Block,
    If,
    Unroll,
    Jump,
    While,
    For,
    Config,
);

impl Statement {
    pub fn location(self, ast: &Ast) -> InputSpan {
        self.location_(ast)
    }
}

#[derive(Debug)]
pub struct ExprStatement {
    pub loc: InputSpan,
    pub expr: Expression,
}

/// `let $x: T;`
#[derive(Debug)]
pub struct VarDeclStatement {
    pub loc: InputSpan,
    pub var: Id<Variable>,
    pub declared_type: Option<Type>,
}

#[derive(Debug)]
pub struct AssignMapStatement {
    pub loc: InputSpan,
    pub map: Id<Map>,
    pub expr: Expression,
}

#[derive(Debug)]
pub struct AssignVarStatement {
    pub loc: InputSpan,
    pub var: Id<Variable>,
    pub expr: Expression,

    /// Present for `let $x = ...;`. The declaration shares its variable node with this
    /// assignment and is not traversed separately.
    pub declaration: Option<Id<VarDeclStatement>>,
}

/// `set option = literal;`
#[derive(Debug)]
pub struct AssignConfigVarStatement {
    pub loc: InputSpan,
    pub var: String,
    pub expr: Expression,
}

#[derive(Debug)]
pub struct Block {
    pub loc: InputSpan,
    pub stmts: Vec<Statement>,
}

#[derive(Debug)]
pub struct If {
    pub loc: InputSpan,
    pub cond: Expression,
    pub if_block: Id<Block>,
    pub else_block: Option<Id<Block>>,
}

#[derive(Debug)]
pub struct Unroll {
    pub loc: InputSpan,
    pub expr: Expression,
    pub block: Id<Block>,
}

#[derive(Debug)]
pub struct Jump {
    pub loc: InputSpan,
    pub kind: JumpKind,
    pub return_value: Option<Expression>,
}

#[derive(Debug)]
pub struct While {
    pub loc: InputSpan,
    pub cond: Expression,
    pub block: Id<Block>,
}

/// `for ($kv : @map) { ... }`
#[derive(Debug)]
pub struct For {
    pub loc: InputSpan,
    pub decl: Id<Variable>,
    pub expr: Expression,
    pub block: Id<Block>,
}

/// Compile-time option assignments of a program.
#[derive(Debug)]
pub struct Config {
    pub loc: InputSpan,
    pub stmts: Vec<Statement>,
}
