use tracing::debug;

use super::Pass;
use crate::ast::{Ast, NodeRef, Visitor};
use crate::errors::{node_count_exceeded, Outcome};

/// Number of nodes reachable from the program root.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct NodeCount(pub usize);

struct NodeCounter<'a> {
    ast: &'a mut Ast,
    count: usize,
}

impl<'a> Visitor for NodeCounter<'a> {
    type Output = ();

    fn ast(&mut self) -> &mut Ast {
        self.ast
    }

    fn pre_visit(&mut self, _node: NodeRef) {
        self.count += 1;
    }
}

pub fn pass() -> Pass {
    Pass::producing("NodeCounter", |ctx| {
        let mut counter = NodeCounter {
            ast: ctx.ast,
            count: 0,
        };
        counter.visit(ctx.program);

        let count = counter.count;
        let limit = ctx.options.max_ast_nodes;
        debug!(count, "AST node count");
        if count >= limit {
            Outcome::failure(vec![node_count_exceeded(count, limit)])
        } else {
            Outcome::success(NodeCount(count))
        }
    })
}
