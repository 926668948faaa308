//! Top-level program units.

use super::{Ast, AttachPoint, Block, Config, Expression, Id, Statement};
use crate::source::InputSpan;
use crate::typing::Type;

#[derive(Debug)]
pub struct Predicate {
    pub loc: InputSpan,
    pub expr: Expression,
}

/// Attach points sharing a predicate and a body.
#[derive(Debug)]
pub struct Probe {
    pub loc: InputSpan,
    pub attach_points: Vec<Id<AttachPoint>>,
    pub pred: Option<Id<Predicate>>,
    pub block: Id<Block>,
    pub index: usize,
}

impl Probe {
    /// Attach point names joined with ','.
    pub fn name(&self, ast: &Ast) -> String {
        self.attach_points
            .iter()
            .map(|ap| ast[*ap].name())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Name of the record type describing `args` of this probe.
    pub fn args_typename(&self, ast: &Ast) -> String {
        format!("struct {}_args", self.name(ast))
    }
}

#[derive(Debug)]
pub struct SubprogArg {
    pub loc: InputSpan,
    pub name: String,
    pub arg_type: Type,
}

/// User-defined function.
#[derive(Debug)]
pub struct Subprog {
    pub loc: InputSpan,
    pub name: String,
    pub return_type: Type,
    pub args: Vec<Id<SubprogArg>>,
    pub stmts: Vec<Statement>,
}

#[derive(Debug)]
pub struct Program {
    pub loc: InputSpan,
    pub config: Option<Id<Config>>,
    pub functions: Vec<Id<Subprog>>,
    pub probes: Vec<Id<Probe>>,
}
