//! Checks that functions returning a value do so on every path, and warns about
//! statements that can never run because a return precedes them.

use super::Pass;
use crate::ast::{Ast, Block, For, Id, If, Jump, JumpKind, Probe, Statement, Subprog, Unroll, Visitor, While};
use crate::errors::{missing_return, unreachable_code, Diagnostics, Outcome};
use crate::typing::Type;

struct ReturnPath<'a> {
    ast: &'a mut Ast,
    errors: Diagnostics,
    warnings: Diagnostics,
}

impl<'a> ReturnPath<'a> {
    /// Whether every path through `stmts` ends in a return.
    fn statements(&mut self, stmts: Vec<Statement>) -> bool {
        let mut returned_at = None;
        for stmt in stmts {
            if let Some(return_loc) = returned_at {
                let loc = stmt.location(self.ast);
                self.warnings.push(unreachable_code(loc, return_loc));
                break;
            }
            if self.visit_stmt(stmt) {
                returned_at = Some(stmt.location(self.ast));
            }
        }
        returned_at.is_some()
    }
}

impl<'a> Visitor for ReturnPath<'a> {
    type Output = bool;

    fn ast(&mut self) -> &mut Ast {
        self.ast
    }

    fn visit_block(&mut self, block: Id<Block>) -> bool {
        let stmts = self.ast[block].stmts.clone();
        self.statements(stmts)
    }

    fn visit_if(&mut self, if_: Id<If>) -> bool {
        let If {
            if_block,
            else_block,
            ..
        } = self.ast[if_];
        let then_returns = self.visit_block(if_block);
        let else_returns = else_block.map_or(false, |block| self.visit_block(block));
        then_returns && else_returns
    }

    fn visit_jump(&mut self, jump: Id<Jump>) -> bool {
        self.ast[jump].kind == JumpKind::Return
    }

    // Loop bodies may not run at all.
    fn visit_while(&mut self, while_: Id<While>) -> bool {
        let block = self.ast[while_].block;
        self.visit_block(block);
        false
    }

    fn visit_for(&mut self, for_: Id<For>) -> bool {
        let block = self.ast[for_].block;
        self.visit_block(block);
        false
    }

    fn visit_unroll(&mut self, unroll: Id<Unroll>) -> bool {
        let block = self.ast[unroll].block;
        self.visit_block(block);
        false
    }

    fn visit_probe(&mut self, probe: Id<Probe>) -> bool {
        let block = self.ast[probe].block;
        self.visit_block(block);
        false
    }

    fn visit_subprog(&mut self, subprog: Id<Subprog>) -> bool {
        let stmts = self.ast[subprog].stmts.clone();
        let returns = self.statements(stmts);
        let Subprog {
            ref name,
            ref return_type,
            loc,
            ..
        } = self.ast[subprog];
        if !returns && *return_type != Type::Void {
            self.errors.push(missing_return(name, return_type, loc));
        }
        false
    }
}

pub fn pass() -> Pass {
    Pass::analysis("ReturnPathAnalyser", |ctx| {
        let mut analyser = ReturnPath {
            ast: ctx.ast,
            errors: Vec::new(),
            warnings: Vec::new(),
        };
        analyser.visit(ctx.program);
        Outcome::from_parts((), analyser.errors, analyser.warnings)
    })
}
