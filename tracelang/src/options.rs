use crate::config::Config;

pub const DEFAULT_MAX_AST_NODES: usize = 200_000;

/// Options of a single compilation.
#[derive(Debug, Clone)]
pub struct CompilerOptions {
    /// Compile ahead of time, rejecting constructs that are resolved against the
    /// running system.
    pub aot: bool,

    pub max_ast_nodes: usize,

    /// Configuration before script `config` assignments are applied.
    pub config: Config,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        CompilerOptions {
            aot: false,
            max_ast_nodes: DEFAULT_MAX_AST_NODES,
            config: Config::default(),
        }
    }
}
