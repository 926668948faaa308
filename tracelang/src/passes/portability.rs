//! Rejects features that cannot be compiled ahead of time, when the program does not
//! yet know the system it will run on.

use std::env;

use super::Pass;
use crate::ast::{AttachPoint, Ast, Builtin, Call, Cast, Id, PositionalParameter, ProbeType, Visitor};
use crate::errors::{aot_unsupported, Outcome};

/// Environment variable asking the pass to announce failures on stdout. The announcement
/// is the name of the variable itself.
pub const NOTIFY_AOT_PORTABILITY_DISABLED: &str = "__TRACELANG_NOTIFY_AOT_PORTABILITY_DISABLED";

struct PortabilityAnalyser<'a> {
    ast: &'a mut Ast,
}

impl<'a> PortabilityAnalyser<'a> {
    fn unsupported(&self, what: impl std::fmt::Display, loc: crate::source::InputSpan) -> Outcome<()> {
        Outcome::failure(vec![aot_unsupported(what, loc)])
    }
}

impl<'a> Visitor for PortabilityAnalyser<'a> {
    type Output = Outcome<()>;

    fn ast(&mut self) -> &mut Ast {
        self.ast
    }

    fn visit_positional_parameter(&mut self, param: Id<PositionalParameter>) -> Outcome<()> {
        // Parameters are baked into the program at compile time.
        self.unsupported("positional parameters", self.ast[param].info.loc)
    }

    fn visit_builtin(&mut self, builtin: Id<Builtin>) -> Outcome<()> {
        let builtin = &self.ast[builtin];
        if builtin.name == "curtask" {
            return self.unsupported("accessing `curtask`", builtin.info.loc);
        }
        Outcome::success(())
    }

    fn visit_call(&mut self, call: Id<Call>) -> Outcome<()> {
        let args = self.walk_call(call);
        let Call { ref func, ref info, .. } = self.ast[call];
        let own = match func.as_str() {
            "kaddr" | "uaddr" | "cgroupid" => self.unsupported(format!("{}()", func), info.loc),
            _ => Outcome::success(()),
        };
        own.merge(args)
    }

    fn visit_cast(&mut self, cast: Id<Cast>) -> Outcome<()> {
        let operand = self.walk_cast(cast);
        let Cast { ref cast_type, ref info, .. } = self.ast[cast];
        let own = if cast_type.as_record().is_some() {
            self.unsupported("struct casts", info.loc)
        } else {
            Outcome::success(())
        };
        own.merge(operand)
    }

    fn visit_attach_point(&mut self, attach_point: Id<AttachPoint>) -> Outcome<()> {
        let attach_point = &self.ast[attach_point];
        match attach_point.probe_type() {
            Some(ProbeType::Usdt) => self.unsupported("USDT probes", attach_point.loc),
            Some(ProbeType::Watchpoint) | Some(ProbeType::AsyncWatchpoint) => {
                self.unsupported("watchpoint probes", attach_point.loc)
            }
            _ => Outcome::success(()),
        }
    }
}

pub fn pass() -> Pass {
    Pass::analysis("PortabilityAnalyser", |ctx| {
        let outcome = PortabilityAnalyser { ast: ctx.ast }.visit(ctx.program);
        if !outcome.is_ok() && env::var_os(NOTIFY_AOT_PORTABILITY_DISABLED).is_some() {
            println!("{}", NOTIFY_AOT_PORTABILITY_DISABLED);
        }
        outcome
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ToSexp;
    use crate::passes::test_utils::{messages, parse, run_passes};

    fn errors(source: &str) -> Vec<String> {
        let (_, _, outcome) = run_passes(source, vec![pass()]);
        messages(outcome.errors())
    }

    #[test]
    fn portable_programs_pass() {
        assert!(errors("kprobe:f { @[comm] = count(); printf(\"%d\\n\", pid); }").is_empty());
    }

    #[test]
    fn rejects_unportable_features() {
        assert_eq!(
            errors("BEGIN { print($1); }"),
            vec!["AOT does not yet support positional parameters"]
        );
        assert_eq!(
            errors("BEGIN { print(curtask); }"),
            vec!["AOT does not yet support accessing `curtask`"]
        );
        assert_eq!(
            errors("BEGIN { print(kaddr(\"x\")); }"),
            vec!["AOT does not yet support kaddr()"]
        );
        assert_eq!(
            errors("BEGIN { $t = (struct task_struct *)0; }"),
            vec!["AOT does not yet support struct casts"]
        );
        assert_eq!(
            errors("usdt:/bin/sh:probe {}"),
            vec!["AOT does not yet support USDT probes"]
        );
        assert_eq!(
            errors("watchpoint:0x1000:8:rw {}"),
            vec!["AOT does not yet support watchpoint probes"]
        );
    }

    #[test]
    fn reports_every_violation() {
        assert_eq!(
            errors("usdt:/bin/sh:probe { print($1); print(uaddr(\"x\")); }").len(),
            3
        );
    }

    #[test]
    fn rejected_programs_are_left_untouched() {
        let source = "usdt:/bin/sh:probe { @x = 1 + 2; print(curtask); }";
        let (ast, program) = parse(source);
        let before = program.to_sexp(&ast).pretty_print(1000);

        let (ast, program, outcome) = run_passes(source, vec![pass()]);
        assert_eq!(outcome.errors().len(), 2);
        assert_eq!(program.to_sexp(&ast).pretty_print(1000), before);
    }
}
