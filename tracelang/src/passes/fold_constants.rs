//! Evaluates expressions whose operands are known at compile time.

use super::Pass;
use crate::ast::{
    Ast, Binop, Call, Expression, Id, Operator, ParameterRef, Ternary, Unop, Visitor,
};
use crate::errors::{division_by_zero, parameter_not_numeric, Outcome};
use crate::params::{parse_int, Params};
use crate::source::InputSpan;

#[derive(Debug, Clone, PartialEq)]
enum Constant {
    Int(i64),
    Str(String),
}

struct FoldConstants<'a> {
    ast: &'a mut Ast,
    params: &'a Params,

    /// Replacement for the expression that was just visited.
    simplified: Option<Expression>,
}

fn truth(value: bool) -> Constant {
    Constant::Int(value as i64)
}

fn fold_ints(op: Operator, left: i64, right: i64) -> Option<i64> {
    let value = match op {
        Operator::Plus => left.wrapping_add(right),
        Operator::Minus => left.wrapping_sub(right),
        Operator::Mul => left.wrapping_mul(right),
        Operator::Div => left.wrapping_div(right),
        Operator::Mod => left.wrapping_rem(right),
        Operator::BAnd => left & right,
        Operator::BOr => left | right,
        Operator::BXor => left ^ right,
        Operator::Left => left.wrapping_shl(right as u32),
        Operator::Right => left.wrapping_shr(right as u32),
        Operator::Eq => (left == right) as i64,
        Operator::Ne => (left != right) as i64,
        Operator::Lt => (left < right) as i64,
        Operator::Le => (left <= right) as i64,
        Operator::Gt => (left > right) as i64,
        Operator::Ge => (left >= right) as i64,
        Operator::LAnd => (left != 0 && right != 0) as i64,
        Operator::LOr => (left != 0 || right != 0) as i64,
        _ => return None,
    };
    Some(value)
}

impl<'a> FoldConstants<'a> {
    fn constant(&self, expr: Expression) -> Option<Constant> {
        match expr {
            Expression::Integer(id) => Some(Constant::Int(self.ast[id].value)),
            Expression::String(id) => Some(Constant::Str(self.ast[id].value.clone())),
            Expression::PositionalParameter(id) => Some(match self.ast[id].param {
                ParameterRef::Count => Constant::Int(self.params.count() as i64),
                ParameterRef::Index(index) => {
                    let value = self.params.get(index, false);
                    match parse_int(value) {
                        Some(value) => Constant::Int(value),
                        None => Constant::Str(value.to_string()),
                    }
                }
            }),
            _ => None,
        }
    }

    fn make(&mut self, constant: Constant, loc: InputSpan) -> Expression {
        match constant {
            Constant::Int(value) => self.ast.integer(value, loc),
            Constant::Str(value) => self.ast.string(value, loc),
        }
    }

    /// Reports a non-numeric parameter used as an operand of `op`.
    fn check_numeric(&self, expr: Expression, other: &Constant) -> Result<(), crate::errors::Diagnostic> {
        if let (Expression::PositionalParameter(id), Constant::Int(_)) = (expr, other) {
            if let ParameterRef::Index(index) = self.ast[id].param {
                if parse_int(self.params.get(index, false)).is_none() {
                    let value = self.params.get(index, false);
                    return Err(parameter_not_numeric(index, value, self.ast[id].info.loc));
                }
            }
        }
        Ok(())
    }

    fn fold_binop(&self, binop: Id<Binop>) -> Result<Option<Constant>, crate::errors::Diagnostic> {
        let Binop { left, op, right, ref info } = self.ast[binop];
        let (lhs, rhs) = match (self.constant(left), self.constant(right)) {
            (Some(lhs), Some(rhs)) => (lhs, rhs),
            _ => return Ok(None),
        };

        match (&lhs, &rhs) {
            (Constant::Int(l), Constant::Int(r)) => {
                if (op == Operator::Div || op == Operator::Mod) && *r == 0 {
                    return Err(division_by_zero(info.loc));
                }
                Ok(fold_ints(op, *l, *r).map(Constant::Int))
            }
            (Constant::Str(l), Constant::Str(r)) => Ok(match op {
                Operator::Plus => Some(Constant::Str(format!("{}{}", l, r))),
                Operator::Eq => Some(truth(l == r)),
                Operator::Ne => Some(truth(l != r)),
                _ => None,
            }),
            _ => {
                self.check_numeric(left, &rhs)?;
                self.check_numeric(right, &lhs)?;
                Ok(None)
            }
        }
    }

    fn fold_unop(&self, unop: Id<Unop>) -> Option<Constant> {
        let Unop { op, expr, is_post_op, .. } = self.ast[unop];
        if is_post_op {
            return None;
        }
        let value = match self.constant(expr)? {
            Constant::Int(value) => value,
            Constant::Str(_) => return None,
        };
        match op {
            Operator::Minus => Some(Constant::Int(value.wrapping_neg())),
            Operator::BNot => Some(Constant::Int(!value)),
            Operator::LNot => Some(truth(value == 0)),
            _ => None,
        }
    }

    /// `str()` of a literal or a positional parameter.
    fn fold_str(&self, call: Id<Call>) -> Option<Constant> {
        let call = &self.ast[call];
        if call.func != "str" || call.args.len() != 1 {
            return None;
        }
        match call.args[0] {
            Expression::String(id) => Some(Constant::Str(self.ast[id].value.clone())),
            Expression::Integer(id) => Some(Constant::Str(self.ast[id].value.to_string())),
            Expression::PositionalParameter(id) => Some(Constant::Str(match self.ast[id].param {
                ParameterRef::Index(index) => self.params.get(index, true).to_string(),
                ParameterRef::Count => self.params.count().to_string(),
            })),
            _ => None,
        }
    }
}

impl<'a> Visitor for FoldConstants<'a> {
    type Output = Outcome<()>;

    fn ast(&mut self) -> &mut Ast {
        self.ast
    }

    fn replace_expr(&mut self, original: Expression, _result: &Outcome<()>) -> Expression {
        self.simplified.take().unwrap_or(original)
    }

    fn visit_binop(&mut self, binop: Id<Binop>) -> Outcome<()> {
        let operands = self.walk_binop(binop);
        let loc = self.ast[binop].info.loc;
        match self.fold_binop(binop) {
            Ok(Some(constant)) => {
                self.simplified = Some(self.make(constant, loc));
                operands
            }
            Ok(None) => operands,
            Err(error) => operands.merge(Outcome::failure(vec![error])),
        }
    }

    fn visit_unop(&mut self, unop: Id<Unop>) -> Outcome<()> {
        let operand = self.walk_unop(unop);
        if let Some(constant) = self.fold_unop(unop) {
            let loc = self.ast[unop].info.loc;
            self.simplified = Some(self.make(constant, loc));
        }
        operand
    }

    fn visit_ternary(&mut self, ternary: Id<Ternary>) -> Outcome<()> {
        let operands = self.walk_ternary(ternary);
        let Ternary { cond, left, right, .. } = self.ast[ternary];
        let chosen = match self.constant(cond) {
            Some(Constant::Int(0)) => Some(right),
            Some(Constant::Int(_)) => Some(left),
            Some(Constant::Str(ref value)) if value.is_empty() => Some(right),
            Some(Constant::Str(_)) => Some(left),
            None => None,
        };
        self.simplified = chosen;
        operands
    }

    fn visit_call(&mut self, call: Id<Call>) -> Outcome<()> {
        let args = self.walk_call(call);
        if let Some(constant) = self.fold_str(call) {
            let loc = self.ast[call].info.loc;
            self.simplified = Some(self.make(constant, loc));
        }
        args
    }
}

pub fn pass() -> Pass {
    Pass::analysis("FoldConstants", |ctx| {
        let mut folder = FoldConstants {
            ast: ctx.ast,
            params: ctx.params,
            simplified: None,
        };
        folder.visit(ctx.program)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ToSexp;
    use crate::options::CompilerOptions;
    use crate::passes::test_utils::{messages, run_passes_with};
    use crate::platform::StaticTypeDatabase;

    fn fold_with(source: &str, params: &[&str]) -> (String, Outcome<()>) {
        let params = Params::new(params.iter().map(|p| p.to_string()).collect());
        let (ast, program, outcome) = run_passes_with(
            &format!("BEGIN {{ {} }}", source),
            &params,
            &CompilerOptions::default(),
            &StaticTypeDatabase::new(),
            vec![pass()],
        );
        (program.to_sexp(&ast).pretty_print(1000), outcome)
    }

    fn fold(source: &str) -> String {
        let (folded, outcome) = fold_with(source, &[]);
        assert!(outcome.is_ok(), "{:?}", outcome.errors());
        let prefix = "(program (probe \"BEGIN\" (block ";
        folded[prefix.len()..folded.len() - 3].to_string()
    }

    #[test]
    fn folds_integer_arithmetic() {
        assert_eq!(fold("@x = 1 + 2 * 3;"), "(= @x 7)");
        assert_eq!(fold("@x = (10 - 4) / 3 % 2;"), "(= @x 0)");
        assert_eq!(fold("@x = 1 << 4 | 3 & 1 ^ 8;"), "(= @x 25)");
        assert_eq!(fold("@x = -5 + ~0;"), "(= @x -6)");
    }

    #[test]
    fn arithmetic_wraps() {
        assert_eq!(
            fold("@x = 9223372036854775807 + 1;"),
            "(= @x -9223372036854775808)"
        );
    }

    #[test]
    fn folds_comparisons_and_logic() {
        assert_eq!(fold("@x = 1 < 2 && 3 == 4;"), "(= @x 0)");
        assert_eq!(fold("@x = !0 || 0;"), "(= @x 1)");
        assert_eq!(fold("@x = \"a\" == \"a\";"), "(= @x 1)");
    }

    #[test]
    fn folds_string_concatenation() {
        assert_eq!(fold("@x = \"ab\" + \"cd\";"), "(= @x \"abcd\")");
        assert_eq!(fold("@x = \"a\" + str(1);"), "(= @x \"a1\")");
    }

    #[test]
    fn folds_constant_ternaries() {
        assert_eq!(fold("@x = 1 ? pid : tid;"), "(= @x pid)");
        assert_eq!(fold("@x = 2 - 2 ? pid : tid;"), "(= @x tid)");
        assert_eq!(fold("@x = @y ? 1 : 2;"), "(= @x (? @y 1 2))");
    }

    #[test]
    fn leaves_runtime_values_alone() {
        assert_eq!(fold("@x = pid + 1 * 2;"), "(= @x (+ pid 2))");
        assert_eq!(fold("$i++;"), "(expr (post++ $i))");
    }

    #[test]
    fn folds_str_of_literals() {
        assert_eq!(fold("@x = str(42);"), "(= @x \"42\")");
        assert_eq!(fold("@x = str(\"s\");"), "(= @x \"s\")");
        assert_eq!(fold("@x = str($#);"), "(= @x \"0\")");
        assert_eq!(fold("@x = str(arg0);"), "(= @x (call str arg0))");
    }

    #[test]
    fn positional_parameters_fold() {
        let (folded, outcome) = fold_with("@x = $1 + 1; @y = str($2); @z = $3 * 2;", &["41", "hi"]);
        assert!(outcome.is_ok());
        assert!(folded.contains("(= @x 42)"));
        assert!(folded.contains("(= @y \"hi\")"));
        assert!(folded.contains("(= @z 0)"));
    }

    #[test]
    fn division_by_zero_is_reported() {
        let (folded, outcome) = fold_with("@x = 1 / 0; @y = 5 % (1 - 1);", &[]);
        assert_eq!(
            messages(outcome.errors()),
            vec![
                "division by zero in constant expression",
                "division by zero in constant expression"
            ]
        );
        assert!(folded.contains("(= @x (/ 1 0))"));
        assert!(folded.contains("(= @y (% 5 0))"));
    }

    #[test]
    fn non_numeric_parameters_are_reported() {
        let (_, outcome) = fold_with("@x = $1 + 1;", &["abc"]);
        assert_eq!(
            messages(outcome.errors()),
            vec!["$1 used numerically but given \"abc\""]
        );
    }
}
