//! Turns statements consisting of a bare value into calls to `print`.

use super::Pass;
use crate::ast::{Ast, Expression, ExprStatement, Id, Visitor};
use crate::errors::Outcome;

struct AutoPrint<'a> {
    ast: &'a mut Ast,

    /// Value of the statement being visited, if it should be printed.
    bare_value: Option<Expression>,
}

impl<'a> Visitor for AutoPrint<'a> {
    type Output = ();

    fn ast(&mut self) -> &mut Ast {
        self.ast
    }

    fn replace_expr(&mut self, original: Expression, _result: &()) -> Expression {
        if self.bare_value != Some(original) {
            return original;
        }
        self.bare_value = None;
        let loc = original.location(self.ast);
        self.ast.call("print", vec![original], loc)
    }

    fn visit_expr_statement(&mut self, stmt: Id<ExprStatement>) {
        let expr = self.ast[stmt].expr;
        self.bare_value = match expr {
            Expression::Identifier(_) | Expression::Map(_) | Expression::Variable(_) => Some(expr),
            _ => None,
        };
        self.walk_expr_statement(stmt);
        self.bare_value = None;
    }
}

pub fn pass() -> Pass {
    Pass::analysis("AutoPrint", |ctx| {
        AutoPrint {
            ast: ctx.ast,
            bare_value: None,
        }
        .visit(ctx.program);
        Outcome::success(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ToSexp;
    use crate::passes::test_utils::run_passes;

    fn rewrite(source: &str) -> String {
        let (ast, program, outcome) = run_passes(source, vec![pass()]);
        assert!(outcome.is_ok());
        program.to_sexp(&ast).pretty_print(1000)
    }

    #[test]
    fn wraps_bare_values() {
        assert_eq!(
            rewrite("BEGIN { @x; $y; @z[1]; }"),
            "(program (probe \"BEGIN\" (block (expr (call print @x)) \
             (expr (call print $y)) (expr (call print (@z 1))))))"
        );
    }

    #[test]
    fn only_the_statement_value_is_wrapped() {
        assert_eq!(
            rewrite("BEGIN { @x[@y]; }"),
            "(program (probe \"BEGIN\" (block (expr (call print (@x @y))))))"
        );
    }

    #[test]
    fn leaves_other_statements_alone() {
        assert_eq!(
            rewrite("BEGIN { @x = 1; exit(); 1 + 2; }"),
            "(program (probe \"BEGIN\" (block (= @x 1) (expr (call exit)) (expr (+ 1 2)))))"
        );
    }
}
