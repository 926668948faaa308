//! Front end of the tracing language compiler. A script is parsed into a syntax tree, the
//! types of its expressions are resolved, static checks are performed and the runtime
//! resources the program needs are computed. All user-facing problems are reported as
//! diagnostics.

pub mod ast;
pub mod config;
pub mod errors;
pub mod functions;
pub mod options;
pub mod params;
pub mod parser;
pub mod passes;
pub mod platform;
pub mod resources;
pub mod source;
pub mod typing;
pub mod utils;

use tracing::debug;

use crate::ast::{Ast, Id, Program};
use crate::config::Config;
use crate::errors::Outcome;
use crate::options::CompilerOptions;
use crate::params::Params;
use crate::passes::{PassContext, ScriptConfig};
use crate::platform::TypeDatabase;
use crate::resources::RequiredResources;

/// A program that passed every check.
pub struct Compilation {
    pub ast: Ast,
    pub program: Id<Program>,
    pub resources: RequiredResources,

    /// Configuration with the script's assignments applied.
    pub config: Config,
}

/// Parses `source` and runs the front-end pipeline over it.
pub fn compile(
    source: &str,
    params: &Params,
    options: &CompilerOptions,
    types: &dyn TypeDatabase,
) -> Outcome<Compilation> {
    let mut ast = Ast::new();
    parser::parse(source, params, &mut ast).and_then(|program| {
        debug!(nodes = ast.len(), "parsed program");
        analyse(ast, program, params, options, types)
    })
}

fn analyse(
    mut ast: Ast,
    program: Id<Program>,
    params: &Params,
    options: &CompilerOptions,
    types: &dyn TypeDatabase,
) -> Outcome<Compilation> {
    let manager = passes::pipeline(options);
    let (outcome, resources, config) = {
        let mut ctx = PassContext::new(&mut ast, program, params, options, types);
        let outcome = manager.run(&mut ctx);
        let resources = passes::take_resources(&mut ctx);
        (outcome, resources, ctx.take::<ScriptConfig>())
    };
    outcome.map(|()| match (resources, config) {
        (Some(resources), Some(ScriptConfig(config))) => Compilation {
            ast,
            program,
            resources,
            config,
        },
        _ => panic!("pipeline finished without producing resources and configuration"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StackMode;
    use crate::passes::test_utils::messages;
    use crate::platform::StaticTypeDatabase;
    use crate::resources::Scope;
    use crate::typing::Type;

    fn compile_str(source: &str, params: &[&str]) -> Outcome<Compilation> {
        let params = Params::new(params.iter().map(|p| p.to_string()).collect());
        compile(
            source,
            &params,
            &CompilerOptions::default(),
            &StaticTypeDatabase::new(),
        )
    }

    #[test]
    fn compiles_complete_program() {
        let outcome = compile_str(
            r#"
            config = { stack_mode = perf; max_strlen = 32 }

            fn double($x: int64): int64 { return $x * 2; }

            BEGIN { @start = nsecs; }

            kprobe:vfs_read /pid == $1/ {
                $n = double(1);
                @reads[comm] = count();
                @stacks[kstack] = count();
            }

            END { @start; }
            "#,
            &["42"],
        );
        assert!(outcome.is_ok(), "{:?}", outcome.errors());
        let compilation = outcome.into_parts().0.unwrap();

        assert_eq!(compilation.config.stack_mode(), StackMode::Perf);
        assert_eq!(compilation.config.max_strlen(), 32);

        let resources = &compilation.resources;
        let maps: Vec<_> = resources.maps.keys().cloned().collect();
        assert_eq!(maps, vec!["@start", "@reads", "@stacks"]);
        assert_eq!(
            resources.variable("$n", &Scope::Probe(1)).unwrap().type_,
            Some(Type::int64())
        );
        assert_eq!(resources.probes.len(), 3);
    }

    #[test]
    fn syntax_errors_stop_compilation() {
        let outcome = compile_str("BEGIN { @x = }", &[]);
        assert_eq!(outcome.errors().len(), 1);
        assert_eq!(outcome.errors()[0].code, "E0001");
    }

    #[test]
    fn semantic_errors_are_reported() {
        let outcome = compile_str("BEGIN { @x = 1; @x = \"s\"; }", &[]);
        assert_eq!(
            messages(outcome.errors()),
            vec!["Type mismatch for @x: trying to assign value of type 'string[2]' when map already contains a value of type 'int64'"]
        );
    }
}
