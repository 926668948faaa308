//! Analyses and rewrites run over a parsed program.

mod auto_print;
mod config_analyser;
mod field_analyser;
mod fold_constants;
mod manager;
mod node_counter;
mod portability;
mod resource_analyser;
mod return_path;

pub use config_analyser::ScriptConfig;
pub use field_analyser::UnresolvedTypes;
pub use manager::{Capability, Pass, PassContext, PassManager};
pub use node_counter::NodeCount;
pub use portability::NOTIFY_AOT_PORTABILITY_DISABLED;

use crate::options::CompilerOptions;
use crate::resources::RequiredResources;

/// The front-end pipeline, in execution order.
pub fn pipeline(options: &CompilerOptions) -> PassManager {
    let mut manager = PassManager::new();
    manager
        .add(node_counter::pass())
        .add(config_analyser::pass());
    if options.aot {
        manager.add(portability::pass());
    }
    manager
        .add(auto_print::pass())
        .add(fold_constants::pass())
        .add(field_analyser::pass())
        .add(return_path::pass())
        .add(resource_analyser::pass());
    manager
}

/// Resources computed by a successful pipeline run.
pub fn take_resources(ctx: &mut PassContext<'_>) -> Option<RequiredResources> {
    ctx.take::<RequiredResources>()
}

#[cfg(test)]
pub(crate) mod test_utils {
    use crate::ast::{Ast, Id, Program};
    use crate::errors::Outcome;
    use crate::options::CompilerOptions;
    use crate::params::Params;
    use crate::parser;
    use crate::platform::{StaticTypeDatabase, TypeDatabase};

    use super::{Pass, PassContext, PassManager};

    pub fn parse(source: &str) -> (Ast, Id<Program>) {
        parse_with(source, &Params::default())
    }

    pub fn parse_with(source: &str, params: &Params) -> (Ast, Id<Program>) {
        let mut ast = Ast::new();
        let program = parser::parse(source, params, &mut ast)
            .into_parts()
            .0
            .unwrap_or_else(|errors| panic!("cannot parse {:?}: {:?}", source, errors));
        (ast, program)
    }

    /// Parses `source` and runs `passes` over it.
    pub fn run_passes_with(
        source: &str,
        params: &Params,
        options: &CompilerOptions,
        types: &dyn TypeDatabase,
        passes: Vec<Pass>,
    ) -> (Ast, Id<Program>, Outcome<()>) {
        let (mut ast, program) = parse_with(source, params);
        let mut manager = PassManager::new();
        for pass in passes {
            manager.add(pass);
        }
        let outcome = {
            let mut ctx = PassContext::new(&mut ast, program, params, options, types);
            manager.run(&mut ctx)
        };
        (ast, program, outcome)
    }

    /// Like `run_passes`, also returning the output `T` of the pipeline.
    pub fn run_collecting<T: 'static>(
        source: &str,
        passes: Vec<Pass>,
    ) -> (Ast, Outcome<()>, Option<T>) {
        let (mut ast, program) = parse(source);
        let mut manager = PassManager::new();
        for pass in passes {
            manager.add(pass);
        }
        let params = Params::default();
        let options = CompilerOptions::default();
        let types = StaticTypeDatabase::new();
        let (outcome, output) = {
            let mut ctx = PassContext::new(&mut ast, program, &params, &options, &types);
            let outcome = manager.run(&mut ctx);
            (outcome, ctx.take::<T>())
        };
        (ast, outcome, output)
    }

    pub fn run_passes(source: &str, passes: Vec<Pass>) -> (Ast, Id<Program>, Outcome<()>) {
        run_passes_with(
            source,
            &Params::default(),
            &CompilerOptions::default(),
            &StaticTypeDatabase::new(),
            passes,
        )
    }

    pub fn messages(diagnostics: &[crate::errors::Diagnostic]) -> Vec<String> {
        diagnostics.iter().map(|d| d.message.clone()).collect()
    }
}
